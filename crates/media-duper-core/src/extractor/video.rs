use super::photo::PhotoHasher;
use crate::error::Error;
use crate::media::Fingerprint;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, trace};

/// Samples every `frame_skip`-th decoded frame through an external `ffmpeg`
/// and hashes each sample like a photo, in frame order.
pub struct VideoSampler {
    ffmpeg: PathBuf,
    ffprobe: PathBuf,
    frame_skip: u32,
    hasher: PhotoHasher,
}

impl VideoSampler {
    pub fn new(ffmpeg: impl Into<PathBuf>, ffprobe: impl Into<PathBuf>, frame_skip: u32) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
            ffprobe: ffprobe.into(),
            frame_skip: frame_skip.max(1),
            hasher: PhotoHasher::new(),
        }
    }

    pub fn frame_skip(&self) -> u32 {
        self.frame_skip
    }

    pub fn fingerprint(&self, path: &Path) -> Result<Fingerprint, Error> {
        if !path.is_file() {
            return Err(Error::Io(io::Error::new(
                io::ErrorKind::NotFound,
                format!("{} is not a readable file", path.display()),
            )));
        }

        let frames_dir = tempfile::tempdir()?;
        let output = Command::new(&self.ffmpeg)
            .args(["-hide_banner", "-loglevel", "error", "-nostdin", "-i"])
            .arg(path)
            .arg("-vf")
            .arg(select_filter(self.frame_skip))
            .args(["-vsync", "vfr"])
            .arg(frames_dir.path().join("frame_%06d.png"))
            .output()
            .map_err(|e| Error::Decode {
                path: path.to_path_buf(),
                reason: format!("could not run {}: {}", self.ffmpeg.display(), e),
            })?;

        if !output.status.success() {
            return Err(Error::Decode {
                path: path.to_path_buf(),
                reason: format!(
                    "ffmpeg exited with {}: {}",
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            });
        }

        let frames = sorted_frames(frames_dir.path())?;
        debug!("Sampled {} frame(s) from {}", frames.len(), path.display());

        frames
            .iter()
            .map(|frame| {
                trace!("Hashing {}", frame.display());
                self.hasher.hash_file(frame)
            })
            .collect::<Result<Fingerprint, Error>>()
    }

    /// Container duration in seconds, if `ffprobe` can tell.
    pub fn probe_duration(&self, path: &Path) -> Option<f64> {
        let output = Command::new(&self.ffprobe)
            .args([
                "-v",
                "error",
                "-show_entries",
                "format=duration",
                "-of",
                "default=noprint_wrappers=1:nokey=1",
            ])
            .arg(path)
            .output()
            .ok()?;
        if !output.status.success() {
            return None;
        }
        String::from_utf8_lossy(&output.stdout)
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|secs| secs.is_finite() && *secs > 0.0)
    }
}

fn select_filter(frame_skip: u32) -> String {
    format!("select=not(mod(n\\,{}))", frame_skip)
}

fn sorted_frames(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut frames: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.extension().is_some_and(|ext| ext == "png"))
        .collect();
    frames.sort();
    Ok(frames)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_select_filter_escapes_comma() {
        assert_eq!(select_filter(30), "select=not(mod(n\\,30))");
    }

    #[test]
    fn test_zero_stride_is_clamped() {
        let sampler = VideoSampler::new("ffmpeg", "ffprobe", 0);
        assert_eq!(sampler.frame_skip(), 1);
    }

    #[test]
    fn test_missing_binary_is_decode_error() {
        let dir = tempdir().unwrap();
        let clip = dir.path().join("clip.mp4");
        fs::write(&clip, b"not really a video").unwrap();

        let sampler = VideoSampler::new(
            dir.path().join("no-such-ffmpeg"),
            dir.path().join("no-such-ffprobe"),
            30,
        );
        assert!(matches!(
            sampler.fingerprint(&clip),
            Err(Error::Decode { .. })
        ));
        assert_eq!(sampler.probe_duration(&clip), None);
    }

    #[test]
    fn test_frames_sorted_in_order() {
        let dir = tempdir().unwrap();
        for name in ["frame_000003.png", "frame_000001.png", "frame_000002.png", "notes.txt"] {
            fs::write(dir.path().join(name), b"").unwrap();
        }
        let frames = sorted_frames(dir.path()).unwrap();
        let names: Vec<_> = frames
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            names,
            vec!["frame_000001.png", "frame_000002.png", "frame_000003.png"]
        );
    }
}
