use super::identity::{self, FullId, PartialId};
use crate::clock::Clock;
use crate::error::Error;
use crate::extractor::FingerprintExtractor;
use crate::media::{Fingerprint, MediaKind};
use crate::storage::{FingerprintStore, MediaRecord};
use chrono::Utc;
use dashmap::DashMap;
use std::path::Path;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, error, trace, warn};

/// Where a fingerprint came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FingerprintSource {
    /// Partial identity matched and the full digest confirmed it.
    PartialHit,
    /// Found by full digest after the partial pre-check missed.
    FullHit,
    /// Computed by the extractor on this call.
    Extracted,
}

#[derive(Debug, Clone)]
pub struct Acquisition {
    pub fingerprint: Fingerprint,
    pub source: FingerprintSource,
}

/// Get-or-compute front end over the fingerprint store.
///
/// A partial-identity match is never trusted on its own; the full BLAKE3 digest has
/// to agree before a cached fingerprint is handed out. Empty extraction results are
/// not cached, so a file that failed to decode is retried on the next run.
///
/// Workers sharing one cache extract a given content at most once: the second file
/// with the same full digest waits for the first and then reads its record.
pub struct FingerprintCache<'a> {
    store: &'a FingerprintStore,
    extractor: &'a dyn FingerprintExtractor,
    clock: &'a dyn Clock,
    slow_warning: Option<Duration>,
    in_flight: DashMap<String, Arc<Mutex<()>>>,
}

impl<'a> FingerprintCache<'a> {
    pub fn new(
        store: &'a FingerprintStore,
        extractor: &'a dyn FingerprintExtractor,
        clock: &'a dyn Clock,
    ) -> Self {
        Self {
            store,
            extractor,
            clock,
            slow_warning: None,
            in_flight: DashMap::new(),
        }
    }

    /// Log a warning, repeating at this interval, while one extraction is still running.
    pub fn with_slow_warning(mut self, after: Option<Duration>) -> Self {
        self.slow_warning = after.filter(|d| !d.is_zero());
        self
    }

    pub fn get_or_compute(&self, path: &Path, kind: MediaKind) -> Result<Acquisition, Error> {
        let path_str = path.to_string_lossy().into_owned();
        let partial = identity::partial_identity(path)?;
        let mut full: Option<FullId> = None;

        match self.store.lookup_by_partial(&partial) {
            Ok(Some(candidate)) => {
                let computed = identity::full_identity(path)?;
                if candidate.full_identity == computed.as_str() && !candidate.fingerprint.is_empty() {
                    debug!("Cache hit (partial, confirmed) for {}", path.display());
                    self.adopt_moved_record(&candidate, &path_str);
                    return Ok(Acquisition {
                        fingerprint: candidate.fingerprint,
                        source: FingerprintSource::PartialHit,
                    });
                }
                debug!(
                    "Partial identity {} of {} matched {} but content differs",
                    partial,
                    path.display(),
                    candidate.path
                );
                full = Some(computed);
            }
            Ok(None) => trace!("No partial match for {}", path.display()),
            Err(e) => warn!("Partial lookup failed for {}: {}", path.display(), e),
        }

        let full = match full {
            Some(full) => full,
            None => identity::full_identity(path)?,
        };

        let gate = self.gate(&full);
        let _held = gate.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

        match self.store.lookup_by_full(&full) {
            Ok(Some(record)) if !record.fingerprint.is_empty() => {
                debug!("Cache hit (full) for {}", path.display());
                if record.partial_identity.is_none() {
                    self.backfill_partial(&record, &partial);
                }
                self.adopt_moved_record(&record, &path_str);
                return Ok(Acquisition {
                    fingerprint: record.fingerprint,
                    source: FingerprintSource::FullHit,
                });
            }
            Ok(_) => trace!("No full match for {}", path.display()),
            Err(e) => warn!("Full lookup failed for {}: {}", path.display(), e),
        }

        let fingerprint = self.extract(path, kind)?;
        if fingerprint.is_empty() {
            warn!("No usable frames in {}, not caching", path.display());
        } else {
            let record = MediaRecord {
                id: 0,
                path: path_str,
                full_identity: full.to_string(),
                partial_identity: Some(partial.to_string()),
                media_kind: kind,
                fingerprint: fingerprint.clone(),
                processed_at: self.clock.now().with_timezone(&Utc).to_rfc3339(),
            };
            if let Err(e) = self.store.put(&record) {
                error!(
                    "Could not cache fingerprint for {}: {} (using in-memory value)",
                    path.display(),
                    e
                );
            }
        }

        Ok(Acquisition {
            fingerprint,
            source: FingerprintSource::Extracted,
        })
    }

    fn extract(&self, path: &Path, kind: MediaKind) -> Result<Fingerprint, Error> {
        let Some(interval) = self.slow_warning else {
            return self.extractor.extract(path, kind);
        };

        let (done_tx, done_rx) = mpsc::channel::<()>();
        thread::scope(|scope| {
            scope.spawn(move || {
                let started = Instant::now();
                while let Err(RecvTimeoutError::Timeout) = done_rx.recv_timeout(interval) {
                    warn!(
                        "Still extracting {} after {}s",
                        path.display(),
                        started.elapsed().as_secs()
                    );
                }
            });
            let result = self.extractor.extract(path, kind);
            drop(done_tx);
            result
        })
    }

    fn gate(&self, full: &FullId) -> Arc<Mutex<()>> {
        self.in_flight
            .entry(full.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    fn backfill_partial(&self, record: &MediaRecord, partial: &PartialId) {
        match self.store.backfill_partial(&record.path, partial) {
            Ok(()) => debug!("Backfilled partial identity for {}", record.path),
            Err(e) => warn!("Could not backfill partial identity for {}: {}", record.path, e),
        }
    }

    // The same bytes turned up at a new path and the old path is gone: the file moved.
    fn adopt_moved_record(&self, record: &MediaRecord, path: &str) {
        if record.path == path || Path::new(&record.path).exists() {
            return;
        }
        match self.store.rename(&record.path, path) {
            Ok(()) => debug!("Record moved from {} to {}", record.path, path),
            Err(e) => debug!("Left record at {}: {}", record.path, e),
        }
    }
}
