use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Video,
    Photo,
}

impl MediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Video => "video",
            MediaKind::Photo => "photo",
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MediaKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "video" => Ok(MediaKind::Video),
            "photo" => Ok(MediaKind::Photo),
            other => Err(format!("unknown media kind '{}'", other)),
        }
    }
}

/// Raw bits of one perceptual hash.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PerceptualHash(Vec<u8>);

impl PerceptualHash {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Number of differing bits. Bytes past the shorter hash count as fully different.
    pub fn hamming(&self, other: &PerceptualHash) -> u32 {
        let shared: u32 = self
            .0
            .iter()
            .zip(other.0.iter())
            .map(|(a, b)| (a ^ b).count_ones())
            .sum();
        let surplus = self.0.len().abs_diff(other.0.len()) as u32;
        shared + surplus * 8
    }
}

/// Ordered perceptual hashes for one file: one per sampled frame, or exactly one for a photo.
/// An empty fingerprint means "no data" and never takes part in comparison.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(Vec<PerceptualHash>);

impl Fingerprint {
    pub fn new(hashes: Vec<PerceptualHash>) -> Self {
        Self(hashes)
    }

    pub fn empty() -> Self {
        Self(Vec::new())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn hashes(&self) -> &[PerceptualHash] {
        &self.0
    }

    /// JSON array of byte arrays, the persisted form.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

impl FromIterator<PerceptualHash> for Fingerprint {
    fn from_iter<I: IntoIterator<Item = PerceptualHash>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
