pub mod cache;
pub mod identity;

pub use cache::{Acquisition, FingerprintCache, FingerprintSource};
pub use identity::{full_identity, partial_identity, FullId, PartialId};
