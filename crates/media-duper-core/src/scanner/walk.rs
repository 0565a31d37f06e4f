use crate::config::AppConfig;
use crate::media::MediaKind;
use dashmap::DashMap;
use glob::Pattern;
use rayon::prelude::*;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaFile {
    pub path: PathBuf,
    pub kind: MediaKind,
}

impl MediaFile {
    pub fn new(path: impl Into<PathBuf>, kind: MediaKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }
}

/// Parallel directory traversal collecting every video and photo under `root`.
/// Skips symlinks, 0-byte files and anything matching an ignore glob.
/// The result is sorted by path so discovery order is stable between runs.
pub fn find_media_files(root: &Path, config: &AppConfig) -> io::Result<Vec<MediaFile>> {
    let map: DashMap<PathBuf, MediaKind> = DashMap::new();

    let ignore_patterns: Vec<Pattern> = config
        .ignore_patterns
        .iter()
        .filter_map(|glob| match Pattern::new(glob) {
            Ok(p) => Some(p),
            Err(e) => {
                error!("Invalid glob pattern '{}': {}", glob, e);
                None
            }
        })
        .collect();

    visit_dirs(root, &map, &ignore_patterns, config)?;

    let mut files: Vec<MediaFile> = map
        .into_iter()
        .map(|(path, kind)| MediaFile { path, kind })
        .collect();
    files.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(files)
}

fn visit_dirs(
    dir: &Path,
    map: &DashMap<PathBuf, MediaKind>,
    ignore_patterns: &[Pattern],
    config: &AppConfig,
) -> io::Result<()> {
    if !dir.is_dir() {
        return Ok(());
    }

    if ignore_patterns
        .iter()
        .any(|pattern| pattern.matches_path(dir))
    {
        return Ok(());
    }

    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) => {
            if err.kind() == io::ErrorKind::PermissionDenied {
                error!(
                    "Access denied reading directory {}: {}",
                    dir.display(),
                    err
                );
                return Ok(());
            } else {
                return Err(io::Error::new(
                    err.kind(),
                    format!("Error reading directory {}: {}", dir.display(), err),
                ));
            }
        }
    };

    entries.par_bridge().try_for_each(|entry_result| -> io::Result<()> {
        let entry = entry_result.map_err(|err| {
            io::Error::new(
                err.kind(),
                format!(
                    "Error reading entry in directory {}: {}",
                    dir.display(),
                    err
                ),
            )
        })?;

        let path = entry.path();
        let metadata = match fs::symlink_metadata(&path) {
            Ok(metadata) => metadata,
            Err(err) => {
                error!("Error getting metadata for {}: {}", path.display(), err);
                return Ok(());
            }
        };

        if metadata.file_type().is_symlink() {
            return Ok(());
        }

        if metadata.is_dir() {
            visit_dirs(&path, map, ignore_patterns, config)?;
        } else if metadata.len() > 0
            && !ignore_patterns
                .iter()
                .any(|pattern| pattern.matches_path(&path))
        {
            if let Some(kind) = config.media_kind(&path) {
                map.insert(path, kind);
            }
        }
        Ok(())
    })?;

    Ok(())
}
