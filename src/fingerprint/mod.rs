//! Line fingerprints for approximate matching
//!
//! A fingerprint is a 64-bit SimHash over the character 3-grams of a line's
//! normalized text. Each shingle is hashed with XXH3 and votes +1/-1 on every
//! bit; the sign of each tally becomes the output bit. Lines that differ by a
//! small edit share most shingles and so land a few bits apart.
//!
//! Fingerprinting is a pure function of the normalized text. There is no
//! shared cache: the [`FingerprintIndex`] built for a comparison is an
//! ordinary value owned by that comparison.

mod index;

pub use index::{CandidatePair, Candidates, FingerprintIndex, DEFAULT_SCAN_LIMIT};

use serde::{Deserialize, Serialize};
use xxhash_rust::xxh3::xxh3_64;

/// Width of a shingle in characters
pub const SHINGLE_WIDTH: usize = 3;

/// Number of bits in a fingerprint
pub const FINGERPRINT_BITS: u32 = 64;

/// Similarity-preserving hash of a line
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Fingerprint(pub u64);

impl Fingerprint {
    /// Number of differing bits between two fingerprints
    pub fn hamming(self, other: Fingerprint) -> u32 {
        (self.0 ^ other.0).count_ones()
    }

    pub fn bits(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// Overlapping character windows of `text`.
///
/// Text shorter than a full window yields itself as the only shingle;
/// empty text yields nothing.
pub fn shingles(text: &str) -> Vec<&str> {
    if text.is_empty() {
        return Vec::new();
    }

    // Byte offsets of every char boundary, so windows never split a char
    let bounds: Vec<usize> = text
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(text.len()))
        .collect();
    let chars = bounds.len() - 1;

    if chars <= SHINGLE_WIDTH {
        return vec![text];
    }

    (0..=chars - SHINGLE_WIDTH)
        .map(|start| &text[bounds[start]..bounds[start + SHINGLE_WIDTH]])
        .collect()
}

/// Compute the fingerprint of a normalized line.
///
/// Identical input always yields an identical fingerprint; the empty line
/// has fingerprint zero.
pub fn compute_fingerprint(normalized_text: &str) -> Fingerprint {
    let grams = shingles(normalized_text);
    if grams.is_empty() {
        return Fingerprint(0);
    }

    let mut tally = [0i32; FINGERPRINT_BITS as usize];
    for gram in grams {
        let h = xxh3_64(gram.as_bytes());
        for (bit, slot) in tally.iter_mut().enumerate() {
            if h & (1u64 << bit) != 0 {
                *slot += 1;
            } else {
                *slot -= 1;
            }
        }
    }

    let bits = tally
        .iter()
        .enumerate()
        .filter(|(_, &count)| count > 0)
        .fold(0u64, |acc, (bit, _)| acc | (1u64 << bit));

    Fingerprint(bits)
}
