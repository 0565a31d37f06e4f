use crate::error::ActionError;
use crate::resolution::{DuplicatePair, Resolution};

/// Trait for reporting scan progress.
///
/// The CLI implements it with indicatif bars. Fingerprint callbacks arrive from
/// worker threads; comparison callbacks arrive from the scanning thread.
/// All methods have default no-op implementations.
pub trait ProgressReporter: Send + Sync {
    fn on_discovery_complete(&self, _total_files: usize, _duration_secs: f64) {}
    fn on_fingerprint_start(&self, _total_files: usize) {}
    fn on_fingerprint_progress(&self, _done: usize, _total: usize, _current_path: &str) {}
    fn on_fingerprint_complete(&self, _usable: usize, _unusable: usize, _duration_secs: f64) {}
    fn on_compare_start(&self, _total_pairs: u64) {}
    fn on_compare_progress(&self, _pairs_done: u64, _total_pairs: u64) {}
    fn on_compare_complete(&self, _duplicates: usize, _duration_secs: f64) {}
    fn on_duplicate_found(&self, _pair: &DuplicatePair) {}
    fn on_resolution(&self, _pair: &DuplicatePair, _outcome: &Result<Resolution, ActionError>) {}
}

/// No-op progress reporter for silent operation.
pub struct SilentReporter;

impl ProgressReporter for SilentReporter {}
