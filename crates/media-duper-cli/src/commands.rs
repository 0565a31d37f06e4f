use clap::Parser;
use media_duper_core::AppConfig;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "media-duper")]
#[command(about = "Find and resolve near-duplicate videos and photos", long_about = None)]
pub struct Cli {
    /// Folder to scan recursively
    pub folder: PathBuf,

    /// Fingerprints closer than this are duplicates
    #[arg(long)]
    pub threshold: Option<f64>,

    /// Sample every Nth video frame
    #[arg(long)]
    pub skip: Option<u32>,

    /// Keep the first file of every duplicate pair without asking
    #[arg(long)]
    pub batch: bool,

    /// Move the second file of every duplicate pair into this folder
    #[arg(long = "move", value_name = "DIR")]
    pub move_to: Option<PathBuf>,

    /// Fingerprint cache database
    #[arg(long, value_name = "PATH")]
    pub db: Option<PathBuf>,

    /// Fingerprint worker threads (0 = one per CPU)
    #[arg(long)]
    pub workers: Option<usize>,
}

impl Cli {
    /// Flags win over `Config.toml` and `MEDIA_DUPER_*` values.
    pub fn apply_overrides(&self, config: &mut AppConfig) {
        if let Some(threshold) = self.threshold {
            config.threshold = threshold;
        }
        if let Some(skip) = self.skip {
            config.frame_skip = skip;
        }
        if let Some(db) = &self.db {
            config.db_path = db.to_string_lossy().into_owned();
        }
        if let Some(workers) = self.workers {
            config.workers = workers;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_leave_config_alone() {
        let cli = Cli::parse_from(["media-duper", "/videos"]);
        assert_eq!(cli.folder, PathBuf::from("/videos"));
        assert!(!cli.batch);
        assert!(cli.move_to.is_none());

        let mut config = AppConfig::default();
        cli.apply_overrides(&mut config);
        assert_eq!(config.threshold, 5.0);
        assert_eq!(config.frame_skip, 30);
        assert_eq!(config.db_path, "media_duper.db");
    }

    #[test]
    fn test_flags_override_config() {
        let cli = Cli::parse_from([
            "media-duper",
            "/videos",
            "--threshold",
            "2.5",
            "--skip",
            "10",
            "--move",
            "/dupes",
            "--db",
            "/tmp/cache.db",
            "--workers",
            "3",
        ]);
        assert_eq!(cli.move_to, Some(PathBuf::from("/dupes")));

        let mut config = AppConfig::default();
        cli.apply_overrides(&mut config);
        assert_eq!(config.threshold, 2.5);
        assert_eq!(config.frame_skip, 10);
        assert_eq!(config.db_path, "/tmp/cache.db");
        assert_eq!(config.workers, 3);
    }

    #[test]
    fn test_folder_is_required() {
        assert!(Cli::try_parse_from(["media-duper", "--batch"]).is_err());
    }
}
