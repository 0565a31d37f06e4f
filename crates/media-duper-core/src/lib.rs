pub mod clock;
pub mod compare;
pub mod config;
pub mod engine;
pub mod error;
pub mod extractor;
pub mod hasher;
pub mod media;
pub mod progress;
pub mod resolution;
pub mod scanner;
pub mod storage;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::AppConfig;
pub use engine::{FingerprintSet, ScanEngine, ScanResult};
pub use error::{ActionError, Error, StoreError};
pub use extractor::{FingerprintExtractor, MediaExtractor};
pub use media::{Fingerprint, MediaKind, PerceptualHash};
pub use progress::{ProgressReporter, SilentReporter};
pub use resolution::{
    Decision, DecisionSource, DuplicatePair, FixedPolicy, Resolution, ScriptedDecisions,
};
pub use storage::FingerprintStore;
