use crate::clock::{Clock, SystemClock};
use crate::compare;
use crate::config::AppConfig;
use crate::error::{ActionError, Error};
use crate::extractor::FingerprintExtractor;
use crate::hasher::{FingerprintCache, FingerprintSource};
use crate::media::Fingerprint;
use crate::progress::ProgressReporter;
use crate::resolution::{Decision, DecisionSource, DuplicatePair, Resolution, ResolutionEngine};
use crate::scanner::{self, MediaFile};
use crate::storage::FingerprintStore;
use dashmap::DashMap;
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

pub struct ScanEngine {
    config: AppConfig,
    store: FingerprintStore,
    extractor: Box<dyn FingerprintExtractor>,
    clock: Box<dyn Clock>,
    destination: Option<PathBuf>,
    cancel_token: Arc<AtomicBool>,
}

/// Files that produced a usable fingerprint, in discovery order.
#[derive(Debug, Default)]
pub struct FingerprintSet {
    pub entries: Vec<(MediaFile, Fingerprint)>,
    pub unusable: usize,
    pub cache_hits: usize,
    pub extracted: usize,
    pub duration: Duration,
}

#[derive(Debug, Default)]
pub struct ScanResult {
    pub files_total: usize,
    pub fingerprinted: usize,
    pub unusable: usize,
    pub cache_hits: usize,
    pub extracted: usize,
    /// Pairs enumerated, including those skipped because a side had vanished.
    pub pairs_considered: u64,
    pub pairs_compared: u64,
    pub duplicates: usize,
    pub resolved: Vec<(DuplicatePair, Resolution)>,
    pub failures: Vec<(DuplicatePair, ActionError)>,
    pub aborted: bool,
    pub discovery_duration: Duration,
    pub fingerprint_duration: Duration,
    pub compare_duration: Duration,
}

impl ScanResult {
    pub fn deleted(&self) -> usize {
        self.resolved
            .iter()
            .filter(|(_, r)| matches!(r, Resolution::Deleted(_)))
            .count()
    }

    pub fn moved(&self) -> usize {
        self.resolved
            .iter()
            .filter(|(_, r)| matches!(r, Resolution::Moved { .. }))
            .count()
    }
}

impl ScanEngine {
    pub fn new(
        config: AppConfig,
        store: FingerprintStore,
        extractor: impl FingerprintExtractor + 'static,
    ) -> Self {
        Self {
            config,
            store,
            extractor: Box::new(extractor),
            clock: Box::new(SystemClock),
            destination: None,
            cancel_token: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    /// Directory that `Decision::Relocate` moves files into.
    pub fn with_destination(mut self, destination: Option<PathBuf>) -> Self {
        self.destination = destination;
        self
    }

    /// Shared flag; set it from anywhere to stop at the next file or pair.
    pub fn cancel_token(&self) -> Arc<AtomicBool> {
        self.cancel_token.clone()
    }

    pub fn store(&self) -> &FingerprintStore {
        &self.store
    }

    fn is_cancelled(&self) -> bool {
        self.cancel_token.load(Ordering::Relaxed)
    }

    /// Discover media under `root`, then fingerprint, compare and resolve it.
    pub fn scan(
        &self,
        root: &Path,
        decisions: &mut dyn DecisionSource,
        reporter: &dyn ProgressReporter,
    ) -> Result<ScanResult, Error> {
        info!("Scanning {}", root.display());
        let discovery_start = Instant::now();
        let files = scanner::find_media_files(root, &self.config)?;
        let discovery_duration = discovery_start.elapsed();
        reporter.on_discovery_complete(files.len(), discovery_duration.as_secs_f64());
        info!(
            "Found {} media files in {:.2}s",
            files.len(),
            discovery_duration.as_secs_f64()
        );

        let mut result = self.find_duplicates(&files, decisions, reporter)?;
        result.discovery_duration = discovery_duration;
        Ok(result)
    }

    /// Fingerprint every file through the cache on a bounded worker pool.
    ///
    /// Files that cannot be read or decoded are counted as unusable and left out.
    pub fn acquire_fingerprints(
        &self,
        files: &[MediaFile],
        reporter: &dyn ProgressReporter,
    ) -> Result<FingerprintSet, Error> {
        let start = Instant::now();
        reporter.on_fingerprint_start(files.len());

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.workers)
            .build()
            .map_err(|e| Error::Other(format!("Cannot build worker pool: {}", e)))?;

        let slow_warning = Some(Duration::from_secs(self.config.slow_extraction_warn_secs));
        let cache = FingerprintCache::new(&self.store, self.extractor.as_ref(), self.clock.as_ref())
            .with_slow_warning(slow_warning);

        let fingerprints: DashMap<usize, Fingerprint> = DashMap::new();
        let done = AtomicUsize::new(0);
        let unusable = AtomicUsize::new(0);
        let cache_hits = AtomicUsize::new(0);
        let extracted = AtomicUsize::new(0);

        pool.install(|| {
            files.par_iter().enumerate().for_each(|(index, file)| {
                if self.is_cancelled() {
                    return;
                }
                match cache.get_or_compute(&file.path, file.kind) {
                    Ok(acquired) => {
                        match acquired.source {
                            FingerprintSource::Extracted => extracted.fetch_add(1, Ordering::Relaxed),
                            _ => cache_hits.fetch_add(1, Ordering::Relaxed),
                        };
                        if acquired.fingerprint.is_empty() {
                            unusable.fetch_add(1, Ordering::Relaxed);
                        } else {
                            fingerprints.insert(index, acquired.fingerprint);
                        }
                    }
                    Err(e) => {
                        warn!("Skipping {}: {}", file.path.display(), e);
                        unusable.fetch_add(1, Ordering::Relaxed);
                    }
                }
                let finished = done.fetch_add(1, Ordering::Relaxed) + 1;
                reporter.on_fingerprint_progress(
                    finished,
                    files.len(),
                    &file.path.to_string_lossy(),
                );
            })
        });

        if self.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let mut indexed: Vec<(usize, Fingerprint)> = fingerprints.into_iter().collect();
        indexed.sort_by_key(|(index, _)| *index);
        let entries = indexed
            .into_iter()
            .map(|(index, fingerprint)| (files[index].clone(), fingerprint))
            .collect();

        let set = FingerprintSet {
            entries,
            unusable: unusable.into_inner(),
            cache_hits: cache_hits.into_inner(),
            extracted: extracted.into_inner(),
            duration: start.elapsed(),
        };
        reporter.on_fingerprint_complete(set.entries.len(), set.unusable, set.duration.as_secs_f64());
        debug!(
            "Fingerprinting done in {:.2}s: {} usable, {} unusable, {} cache hits, {} extracted",
            set.duration.as_secs_f64(),
            set.entries.len(),
            set.unusable,
            set.cache_hits,
            set.extracted
        );
        Ok(set)
    }

    /// Compare every unordered pair of usable files once and resolve each duplicate
    /// before moving on. `files` must already be in discovery order.
    pub fn find_duplicates(
        &self,
        files: &[MediaFile],
        decisions: &mut dyn DecisionSource,
        reporter: &dyn ProgressReporter,
    ) -> Result<ScanResult, Error> {
        let set = self.acquire_fingerprints(files, reporter)?;

        let mut result = ScanResult {
            files_total: files.len(),
            fingerprinted: set.entries.len(),
            unusable: set.unusable,
            cache_hits: set.cache_hits,
            extracted: set.extracted,
            fingerprint_duration: set.duration,
            ..ScanResult::default()
        };

        let resolver = ResolutionEngine::new(&self.store, self.clock.as_ref())
            .with_destination(self.destination.clone())
            .with_elevated_delete(self.config.elevated_delete);

        let n = set.entries.len() as u64;
        let total_pairs = n * n.saturating_sub(1) / 2;
        let threshold = self.config.threshold;
        let compare_start = Instant::now();
        reporter.on_compare_start(total_pairs);
        info!("Comparing {} pairs (threshold {})", total_pairs, threshold);

        'outer: for (i, (first, first_fp)) in set.entries.iter().enumerate() {
            for (second, second_fp) in &set.entries[i + 1..] {
                if self.is_cancelled() {
                    return Err(Error::Cancelled);
                }
                result.pairs_considered += 1;
                reporter.on_compare_progress(result.pairs_considered, total_pairs);

                // An earlier resolution may have removed or moved either side.
                if !first.path.exists() || !second.path.exists() {
                    continue;
                }
                result.pairs_compared += 1;

                let distance = compare::distance(first_fp, second_fp);
                if !compare::is_duplicate(distance, threshold) {
                    continue;
                }

                result.duplicates += 1;
                let pair = DuplicatePair {
                    first: first.path.clone(),
                    first_kind: first.kind,
                    second: second.path.clone(),
                    second_kind: second.kind,
                    distance,
                };
                debug!(
                    "Duplicate at distance {:.2}: {} / {}",
                    distance,
                    pair.first.display(),
                    pair.second.display()
                );
                reporter.on_duplicate_found(&pair);

                let decision = decisions.decide(&pair)?;
                if decision == Decision::Abort {
                    info!("Aborted by operator");
                    result.aborted = true;
                    break 'outer;
                }

                let outcome = resolver.apply(&pair, decision);
                reporter.on_resolution(&pair, &outcome);
                match outcome {
                    Ok(resolution) => result.resolved.push((pair, resolution)),
                    Err(e) => {
                        error!("{}", e);
                        result.failures.push((pair, e));
                    }
                }
            }
        }

        result.compare_duration = compare_start.elapsed();
        reporter.on_compare_complete(result.duplicates, result.compare_duration.as_secs_f64());
        info!(
            "Compared {} pairs in {:.2}s, {} duplicates",
            result.pairs_compared,
            result.compare_duration.as_secs_f64(),
            result.duplicates
        );
        Ok(result)
    }
}
