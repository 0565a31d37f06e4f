use crate::display;
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use media_duper_core::extractor::video::VideoSampler;
use media_duper_core::{ActionError, DuplicatePair, ProgressReporter, Resolution};
use std::sync::Mutex;
use std::time::Duration;

const TICK_CHARS: &str = "⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏";

/// CLI progress reporter using indicatif progress bars.
///
/// - Fingerprint phase: progress bar over files
/// - Compare phase: progress bar over pairs, hidden while a pair is shown
pub struct CliReporter {
    bar: Mutex<Option<ProgressBar>>,
    prober: VideoSampler,
}

impl CliReporter {
    pub fn new(prober: VideoSampler) -> Self {
        Self {
            bar: Mutex::new(None),
            prober,
        }
    }

    /// Run `f` with the active bar hidden, so prompts and pair details are not overdrawn.
    pub fn suspend<R>(&self, f: impl FnOnce() -> R) -> R {
        match self.current_bar() {
            Some(pb) => pb.suspend(f),
            None => f(),
        }
    }

    fn current_bar(&self) -> Option<ProgressBar> {
        self.bar
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn set_bar(&self, pb: ProgressBar) {
        let mut guard = self.bar.lock().unwrap_or_else(|p| p.into_inner());
        if let Some(old) = guard.take() {
            old.finish_and_clear();
        }
        *guard = Some(pb);
    }

    fn finish_bar(&self) {
        let mut guard = self.bar.lock().unwrap_or_else(|p| p.into_inner());
        if let Some(pb) = guard.take() {
            pb.finish_and_clear();
        }
    }

    fn start_bar(&self, total: u64, template: &str) {
        let style = ProgressStyle::with_template(template)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("━╸─")
            .tick_chars(TICK_CHARS);
        let pb = ProgressBar::new(total);
        pb.set_style(style);
        pb.enable_steady_tick(Duration::from_millis(80));
        self.set_bar(pb);
    }
}

impl ProgressReporter for CliReporter {
    fn on_discovery_complete(&self, total_files: usize, duration_secs: f64) {
        eprintln!(
            "  {} Found {} media files in {:.2}s",
            "✓".green(),
            total_files.to_string().bold(),
            duration_secs
        );
    }

    fn on_fingerprint_start(&self, total_files: usize) {
        self.start_bar(
            total_files as u64,
            "  {spinner:.cyan} Fingerprinting [{bar:30.cyan/dim}] {pos}/{len} files ({eta} remaining)",
        );
    }

    fn on_fingerprint_progress(&self, done: usize, _total: usize, _current_path: &str) {
        if let Some(pb) = self.current_bar() {
            pb.set_position(done as u64);
        }
    }

    fn on_fingerprint_complete(&self, usable: usize, unusable: usize, duration_secs: f64) {
        self.finish_bar();
        eprintln!(
            "  {} Fingerprinted {} files ({} unusable) in {:.2}s",
            "✓".green(),
            usable.to_string().bold(),
            unusable,
            duration_secs
        );
    }

    fn on_compare_start(&self, total_pairs: u64) {
        self.start_bar(
            total_pairs,
            "  {spinner:.cyan} Comparing [{bar:30.cyan/dim}] {pos}/{len} pairs",
        );
    }

    fn on_compare_progress(&self, pairs_done: u64, _total_pairs: u64) {
        if let Some(pb) = self.current_bar() {
            pb.set_position(pairs_done);
        }
    }

    fn on_compare_complete(&self, duplicates: usize, duration_secs: f64) {
        self.finish_bar();
        eprintln!(
            "  {} Comparison complete: {} duplicates in {:.2}s",
            "✓".green(),
            duplicates.to_string().bold(),
            duration_secs
        );
    }

    fn on_duplicate_found(&self, pair: &DuplicatePair) {
        self.suspend(|| display::print_pair(pair, &self.prober));
    }

    fn on_resolution(&self, _pair: &DuplicatePair, outcome: &Result<Resolution, ActionError>) {
        self.suspend(|| match outcome {
            Ok(Resolution::Deleted(path)) => {
                println!("{}", format!("❌ Deleted: {}", path.display()).red())
            }
            Ok(Resolution::Moved { to, .. }) => {
                println!("{}", format!("📦 Moved to: {}", to.display()).green())
            }
            Ok(Resolution::KeptBoth) => println!("{}", "✅ Keeping both files".green()),
            Ok(Resolution::Aborted) => {}
            Err(e) => println!("{}", format!("Error: {}", e).red()),
        });
    }
}
