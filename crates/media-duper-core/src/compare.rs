use crate::media::Fingerprint;

/// Distance between two fingerprints; lower is more similar.
///
/// Single hashes compare by Hamming distance. Longer fingerprints average the
/// per-position Hamming distance over the shorter length, so frames past the end of
/// the shorter one are ignored and both are assumed to start on the same frame.
/// Trimmed or differently sampled videos are biased by this. An empty side yields
/// `f64::INFINITY`, which no finite threshold accepts.
pub fn distance(a: &Fingerprint, b: &Fingerprint) -> f64 {
    let (a, b) = (a.hashes(), b.hashes());
    if a.is_empty() || b.is_empty() {
        return f64::INFINITY;
    }

    if a.len() == 1 && b.len() == 1 {
        return a[0].hamming(&b[0]) as f64;
    }

    let positions = a.len().min(b.len());
    let total: u64 = a
        .iter()
        .zip(b.iter())
        .map(|(x, y)| x.hamming(y) as u64)
        .sum();
    total as f64 / positions as f64
}

/// Strict: a distance equal to the threshold is not a duplicate.
pub fn is_duplicate(distance: f64, threshold: f64) -> bool {
    distance < threshold
}
