#![allow(dead_code)]

use media_duper_core::{Error, Fingerprint, FingerprintExtractor, MediaKind, PerceptualHash};
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

/// Fake extractor that derives a one-hash fingerprint from file bytes and counts calls.
///
/// Content starting with `BAD` fails to decode; content starting with `EMPTY`
/// yields no frames.
pub struct CountingExtractor {
    calls: AtomicUsize,
    derive: fn(&[u8]) -> Fingerprint,
    delay: Duration,
}

impl CountingExtractor {
    /// Hash is the first 8 bytes of the file, zero padded.
    pub fn by_prefix() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            delay: Duration::ZERO,
            derive: |bytes| single_hash(&bytes[..bytes.len().min(8)]),
        }
    }

    /// Hash is the last 8 bytes of the file, zero padded.
    pub fn by_suffix() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            delay: Duration::ZERO,
            derive: |bytes| single_hash(&bytes[bytes.len().saturating_sub(8)..]),
        }
    }

    /// Sleep this long inside every extraction.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl FingerprintExtractor for CountingExtractor {
    fn extract(&self, path: &Path, _kind: MediaKind) -> Result<Fingerprint, Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            thread::sleep(self.delay);
        }
        let bytes = fs::read(path)?;
        if bytes.starts_with(b"BAD") {
            return Err(Error::Decode {
                path: path.to_path_buf(),
                reason: "not media".to_string(),
            });
        }
        if bytes.starts_with(b"EMPTY") {
            return Ok(Fingerprint::empty());
        }
        Ok((self.derive)(&bytes))
    }
}

fn single_hash(bytes: &[u8]) -> Fingerprint {
    let mut hash = [0u8; 8];
    hash[..bytes.len()].copy_from_slice(bytes);
    Fingerprint::new(vec![PerceptualHash::new(hash.to_vec())])
}

/// Eight bytes of `first` followed by `filler` bytes so each file has distinct content.
pub fn media_bytes(first: [u8; 8], filler: &[u8]) -> Vec<u8> {
    let mut bytes = first.to_vec();
    bytes.extend_from_slice(filler);
    bytes
}
