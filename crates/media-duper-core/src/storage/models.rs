use crate::media::{Fingerprint, MediaKind};

/// One cached file: where it lives, what its bytes are, and its perceptual fingerprint.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaRecord {
    pub id: i64,
    pub path: String,
    pub full_identity: String,
    pub partial_identity: Option<String>,
    pub media_kind: MediaKind,
    pub fingerprint: Fingerprint,
    pub processed_at: String,
}
