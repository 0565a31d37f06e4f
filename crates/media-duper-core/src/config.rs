use crate::media::MediaKind;
use config::{Config, ConfigError, Environment, File as ConfigFile};
use serde::Deserialize;
use std::path::Path;

pub const DEFAULT_THRESHOLD: f64 = 5.0;
pub const DEFAULT_FRAME_SKIP: u32 = 30;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Pairs with a fingerprint distance strictly below this are duplicates.
    pub threshold: f64,
    /// Keyframe sampling stride for video, in frames.
    pub frame_skip: u32,
    pub db_path: String,
    /// Fingerprint worker threads. 0 picks one per CPU.
    pub workers: usize,
    /// Warn when a single extraction runs longer than this. 0 disables the warning.
    pub slow_extraction_warn_secs: u64,
    /// Clear the read-only attribute and retry when a delete is refused.
    pub elevated_delete: bool,
    pub ignore_patterns: Vec<String>,
    pub video_extensions: Vec<String>,
    pub photo_extensions: Vec<String>,
    pub ffmpeg_path: String,
    pub ffprobe_path: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            frame_skip: DEFAULT_FRAME_SKIP,
            db_path: "media_duper.db".to_string(),
            workers: 0,
            slow_extraction_warn_secs: 60,
            elevated_delete: false,
            ignore_patterns: Vec::new(),
            video_extensions: ["mp4", "mov", "avi", "mkv", "webm", "flv", "m4v"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            photo_extensions: ["jpg", "jpeg", "png", "gif", "bmp", "tiff", "webp"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            ffmpeg_path: "ffmpeg".to_string(),
            ffprobe_path: "ffprobe".to_string(),
        }
    }
}

impl AppConfig {
    /// Classify a path by its extension, case-insensitively.
    pub fn media_kind(&self, path: &Path) -> Option<MediaKind> {
        let ext = path.extension()?.to_str()?.to_lowercase();
        let matches = |list: &[String]| {
            list.iter()
                .any(|e| e.trim_start_matches('.').eq_ignore_ascii_case(&ext))
        };

        if matches(&self.video_extensions) {
            Some(MediaKind::Video)
        } else if matches(&self.photo_extensions) {
            Some(MediaKind::Photo)
        } else {
            None
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.threshold.is_finite() || self.threshold < 0.0 {
            return Err(ConfigError::Message(format!(
                "threshold must be a non-negative number, got {}",
                self.threshold
            )));
        }
        if self.frame_skip == 0 {
            return Err(ConfigError::Message(
                "frame_skip must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Load `Config.toml` (optional) overlaid with `MEDIA_DUPER_*` environment variables.
pub fn load_configuration() -> Result<AppConfig, ConfigError> {
    let builder = Config::builder()
        .add_source(ConfigFile::with_name("Config").required(false))
        .add_source(Environment::with_prefix("MEDIA_DUPER").try_parsing(true))
        .build()?;
    let config = builder.try_deserialize::<AppConfig>()?;
    config.validate()?;
    Ok(config)
}
