use crate::error::Error;
use crate::media::{Fingerprint, PerceptualHash};
use image::{DynamicImage, ImageError};
use image_hasher::{HashAlg, Hasher, HasherConfig};
use std::path::Path;

/// 8x8 mean hash over DCT-preprocessed pixels: 64 bits per image.
pub struct PhotoHasher {
    hasher: Hasher,
}

impl PhotoHasher {
    pub fn new() -> Self {
        Self {
            hasher: HasherConfig::new()
                .hash_size(8, 8)
                .hash_alg(HashAlg::Mean)
                .preproc_dct()
                .to_hasher(),
        }
    }

    pub fn hash_image(&self, image: &DynamicImage) -> PerceptualHash {
        PerceptualHash::new(self.hasher.hash_image(image).as_bytes().to_vec())
    }

    pub fn hash_file(&self, path: &Path) -> Result<PerceptualHash, Error> {
        let image = image::open(path).map_err(|e| match e {
            ImageError::IoError(io) => Error::Io(io),
            other => Error::Decode {
                path: path.to_path_buf(),
                reason: other.to_string(),
            },
        })?;
        Ok(self.hash_image(&image))
    }

    /// A photo fingerprint always holds exactly one hash.
    pub fn fingerprint(&self, path: &Path) -> Result<Fingerprint, Error> {
        Ok(Fingerprint::new(vec![self.hash_file(path)?]))
    }
}

impl Default for PhotoHasher {
    fn default() -> Self {
        Self::new()
    }
}
