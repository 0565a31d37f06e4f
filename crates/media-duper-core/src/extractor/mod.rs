pub mod photo;
pub mod video;

use crate::config::AppConfig;
use crate::error::Error;
use crate::media::{Fingerprint, MediaKind};
use photo::PhotoHasher;
use std::path::Path;
use std::sync::Arc;
use video::VideoSampler;

/// Turns a media file into its perceptual fingerprint.
///
/// Implementations must be callable from several fingerprint workers at once.
pub trait FingerprintExtractor: Send + Sync {
    fn extract(&self, path: &Path, kind: MediaKind) -> Result<Fingerprint, Error>;
}

impl<T: FingerprintExtractor + ?Sized> FingerprintExtractor for Arc<T> {
    fn extract(&self, path: &Path, kind: MediaKind) -> Result<Fingerprint, Error> {
        (**self).extract(path, kind)
    }
}

impl<T: FingerprintExtractor + ?Sized> FingerprintExtractor for Box<T> {
    fn extract(&self, path: &Path, kind: MediaKind) -> Result<Fingerprint, Error> {
        (**self).extract(path, kind)
    }
}

/// Photos through `image_hasher`, videos through sampled `ffmpeg` frames.
pub struct MediaExtractor {
    photo: PhotoHasher,
    video: VideoSampler,
}

impl MediaExtractor {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            photo: PhotoHasher::new(),
            video: VideoSampler::new(&config.ffmpeg_path, &config.ffprobe_path, config.frame_skip),
        }
    }
}

impl FingerprintExtractor for MediaExtractor {
    fn extract(&self, path: &Path, kind: MediaKind) -> Result<Fingerprint, Error> {
        match kind {
            MediaKind::Photo => self.photo.fingerprint(path),
            MediaKind::Video => self.video.fingerprint(path),
        }
    }
}
