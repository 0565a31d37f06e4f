mod commands;
mod display;
mod logging;
mod progress;
mod prompt;

use std::fs;
use std::process::{self, ExitCode};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use colored::*;
use commands::Cli;
use dotenv::dotenv;
use media_duper_core::extractor::video::VideoSampler;
use media_duper_core::{
    AppConfig, Decision, DecisionSource, FingerprintStore, MediaExtractor, ScanEngine,
    ScanResult,
};
use progress::CliReporter;
use prompt::{AnnouncedPolicy, InteractiveDecisions};
use tracing::{error, info, warn};

const EXIT_INTERRUPTED: u8 = 130;

fn main() -> ExitCode {
    dotenv().ok();

    let _guard = logging::init_logger();

    let args = Cli::parse();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) if is_cancelled(&err) => {
            eprintln!("\n{}", "Interrupted by user".yellow());
            ExitCode::from(EXIT_INTERRUPTED)
        }
        Err(err) => {
            error!("{:#}", err);
            eprintln!("{} {:#}", "Error:".red(), err);
            ExitCode::FAILURE
        }
    }
}

fn is_cancelled(err: &anyhow::Error) -> bool {
    matches!(
        err.downcast_ref::<media_duper_core::Error>(),
        Some(media_duper_core::Error::Cancelled)
    )
}

fn run(args: &Cli) -> Result<()> {
    let mut config = media_duper_core::config::load_configuration()
        .context("Error loading configuration")?;
    args.apply_overrides(&mut config);
    config.validate().context("Invalid settings")?;

    if !args.folder.is_dir() {
        bail!("{} is not a directory", args.folder.display());
    }
    if let Some(dir) = &args.move_to {
        fs::create_dir_all(dir)
            .with_context(|| format!("Cannot create move destination {}", dir.display()))?;
    }

    println!("\n{}", "=".repeat(60).blue());
    println!("{}", "🎬 Media Duplicate Finder".blue());
    println!("{}", "=".repeat(60).blue());

    let store = FingerprintStore::open(&config.db_path)
        .with_context(|| format!("Cannot open fingerprint cache {}", config.db_path))?;
    let engine = ScanEngine::new(config.clone(), store, MediaExtractor::new(&config))
        .with_destination(args.move_to.clone());

    let cancel_token = engine.cancel_token();
    let handler_token = cancel_token.clone();
    ctrlc::set_handler(move || {
        // A second Ctrl-C does not wait for the current file or prompt.
        if handler_token.swap(true, Ordering::SeqCst) {
            eprintln!("\nInterrupted by user");
            process::exit(EXIT_INTERRUPTED as i32);
        }
        warn!("Interrupt received, stopping after the current step");
    })
    .context("Cannot install Ctrl-C handler")?;

    let reporter = Arc::new(CliReporter::new(prober(&config)));
    let mut decisions = decision_source(args, &reporter, &cancel_token, &config);

    let result = engine.scan(&args.folder, decisions.as_mut(), reporter.as_ref())?;

    let cached = match engine.store().count() {
        Ok(count) => Some(count),
        Err(e) => {
            warn!("Could not count cache records: {}", e);
            None
        }
    };
    print_summary(&result, cached);
    println!("\n{}", "Done!".green());
    Ok(())
}

fn prober(config: &AppConfig) -> VideoSampler {
    VideoSampler::new(&config.ffmpeg_path, &config.ffprobe_path, config.frame_skip)
}

/// `--batch` wins over `--move`; with neither the operator is asked for every pair.
fn decision_source(
    args: &Cli,
    reporter: &Arc<CliReporter>,
    cancel_token: &Arc<AtomicBool>,
    config: &AppConfig,
) -> Box<dyn DecisionSource> {
    if args.batch {
        Box::new(AnnouncedPolicy::new(
            Decision::KeepFirst,
            "Batch mode: automatically keeping file 1 and removing file 2".to_string(),
            reporter.clone(),
        ))
    } else if let Some(dir) = &args.move_to {
        Box::new(AnnouncedPolicy::new(
            Decision::Relocate,
            format!("Moving duplicate to: {}", dir.display()),
            reporter.clone(),
        ))
    } else {
        info!(
            "Interactive mode, threshold {} and every {} frames",
            config.threshold, config.frame_skip
        );
        Box::new(InteractiveDecisions::new(
            reporter.clone(),
            cancel_token.clone(),
        ))
    }
}

fn print_summary(result: &ScanResult, cached: Option<i64>) {
    if result.duplicates == 0 {
        println!("{}", "✅ No duplicates found!".green());
    }
    if result.aborted {
        println!("{}", "Stopped before all pairs were checked".yellow());
    }

    println!("\n{}", "📊 Summary:".blue());
    println!("• Files processed: {}", result.files_total);
    println!("• Unusable files: {}", result.unusable);
    println!(
        "• Fingerprints from cache: {}, extracted: {}",
        result.cache_hits, result.extracted
    );
    println!("• Pairs compared: {}", result.pairs_compared);
    println!("• Duplicates found: {}", result.duplicates);
    println!("• Files deleted: {}", result.deleted());
    println!("• Files moved: {}", result.moved());
    if result.failures.is_empty() {
        println!("• Failures: 0");
    } else {
        println!(
            "• Failures: {}",
            result.failures.len().to_string().red()
        );
        for (pair, err) in &result.failures {
            println!(
                "   {} / {}: {}",
                pair.first.display(),
                pair.second.display(),
                err
            );
        }
    }
    if let Some(count) = cached {
        println!("• Cache records: {}", count);
    }
    info!(
        "Discovery {:.2}s, fingerprints {:.2}s, comparison {:.2}s",
        result.discovery_duration.as_secs_f64(),
        result.fingerprint_duration.as_secs_f64(),
        result.compare_duration.as_secs_f64()
    );
}
