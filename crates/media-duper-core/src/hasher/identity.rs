use std::fmt;
use std::fs::File;
use std::hash::Hasher as _;
use std::io::{self, BufReader, Read};
use std::path::Path;
use std::str::FromStr;
use twox_hash::XxHash64;

pub const PARTIAL_HASH_LENGTH: usize = 64 * 1024; // 64KB
const READ_CHUNK: usize = 64 * 1024;

/// File length plus an XxHash64 of the leading chunk.
///
/// Cheap to compute but not unique: two files of equal length sharing their first
/// 64KB collide. Only ever a hint to look the file up by its [`FullId`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PartialId {
    pub size: u64,
    pub prefix_digest: u64,
}

impl fmt::Display for PartialId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{:016x}", self.size, self.prefix_digest)
    }
}

impl FromStr for PartialId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (size, digest) = s
            .split_once(':')
            .ok_or_else(|| format!("malformed partial identity '{}'", s))?;
        let size = size
            .parse::<u64>()
            .map_err(|e| format!("bad size in '{}': {}", s, e))?;
        let prefix_digest = u64::from_str_radix(digest, 16)
            .map_err(|e| format!("bad digest in '{}': {}", s, e))?;
        Ok(PartialId {
            size,
            prefix_digest,
        })
    }
}

/// BLAKE3 digest of the complete content, hex encoded. Authoritative for cache hits.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FullId(String);

impl FullId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FullId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for FullId {
    fn from(hex: String) -> Self {
        FullId(hex)
    }
}

pub fn partial_identity(file: &Path) -> io::Result<PartialId> {
    let f = File::open(file)?;
    let size = f.metadata()?.len();
    let data = read_portion(f)?;
    Ok(PartialId {
        size,
        prefix_digest: hash_data(&data),
    })
}

/// Streams the file through BLAKE3 in fixed chunks; memory use does not grow with file size.
pub fn full_identity(file: &Path) -> io::Result<FullId> {
    let mut reader = BufReader::new(File::open(file)?);
    let mut hasher = blake3::Hasher::new();
    let mut buffer = vec![0u8; READ_CHUNK];
    loop {
        let bytes_read = reader.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }
    Ok(FullId(hasher.finalize().to_hex().to_string()))
}

fn read_portion(f: File) -> io::Result<Vec<u8>> {
    let mut buffer = Vec::with_capacity(PARTIAL_HASH_LENGTH);
    f.take(PARTIAL_HASH_LENGTH as u64).read_to_end(&mut buffer)?;
    Ok(buffer)
}

fn hash_data(data: &[u8]) -> u64 {
    let mut hasher = XxHash64::with_seed(0);
    hasher.write(data);
    hasher.finish()
}
