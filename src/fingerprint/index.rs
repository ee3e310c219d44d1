//! Multi-probe LSH index over line fingerprints
//!
//! Each line is bucketed in four tables, keyed by a 16-bit prefix of its
//! fingerprint after rotating by 0, 16, 32 and 48 bits. A query probes its own
//! bucket in every table plus the 16 buckets one bit away. Two fingerprints
//! that differ in at most 7 bits share at least one band with at most one
//! differing bit, so they always meet in some probed bucket.

use super::Fingerprint;
use crate::models::{LineRecord, Side};
use rustc_hash::{FxHashMap, FxHashSet};

/// Number of permuted tables
const TABLES: u32 = 4;

/// Bits per bucket key
const PREFIX_BITS: u32 = 16;

/// Sides at or below this many lines are scanned exhaustively when the
/// probed buckets come up short
pub const DEFAULT_SCAN_LIMIT: usize = 4096;

/// A line from each version judged worth a refined comparison
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CandidatePair<'a> {
    pub old: &'a LineRecord,
    pub new: &'a LineRecord,
    /// Hamming distance between the two fingerprints
    pub estimated_distance: u32,
}

impl CandidatePair<'_> {
    pub fn displacement(&self) -> usize {
        self.old.index.abs_diff(self.new.index)
    }
}

/// Bucketed fingerprints of one version's lines
#[derive(Debug)]
pub struct FingerprintIndex<'a> {
    lines: &'a [LineRecord],
    /// Version the indexed lines belong to
    side: Side,
    tables: Vec<FxHashMap<u16, Vec<usize>>>,
    scan_limit: usize,
}

/// Bucket key of `fp` in table `table`
fn band_key(fp: Fingerprint, table: u32) -> u16 {
    (fp.0.rotate_left(table * PREFIX_BITS) >> (64 - PREFIX_BITS)) as u16
}

/// The key itself followed by every key at Hamming distance one
fn probe_keys(key: u16) -> impl Iterator<Item = u16> {
    std::iter::once(key).chain((0..PREFIX_BITS).map(move |bit| key ^ (1u16 << bit)))
}

impl<'a> FingerprintIndex<'a> {
    /// Index the lines of one version.
    ///
    /// Queries are taken to come from the opposite version, whatever their
    /// own `side` says.
    pub fn build(lines: &'a [LineRecord], side: Side) -> Self {
        let mut tables: Vec<FxHashMap<u16, Vec<usize>>> =
            (0..TABLES).map(|_| FxHashMap::default()).collect();

        for (pos, line) in lines.iter().enumerate() {
            for (t, table) in tables.iter_mut().enumerate() {
                table
                    .entry(band_key(line.fingerprint, t as u32))
                    .or_default()
                    .push(pos);
            }
        }

        Self {
            lines,
            side,
            tables,
            scan_limit: DEFAULT_SCAN_LIMIT,
        }
    }

    /// Set the exhaustive-scan fallback limit (0 disables the fallback)
    pub fn with_scan_limit(mut self, scan_limit: usize) -> Self {
        self.scan_limit = scan_limit;
        self
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Top-`k` candidates for `query` from this index.
    ///
    /// Nothing is computed until the result is iterated, and every iteration
    /// yields the same sequence.
    pub fn candidates<'i>(&'i self, query: &'a LineRecord, k: usize) -> Candidates<'i, 'a> {
        Candidates {
            index: self,
            query,
            k,
        }
    }

    /// Positions of lines sharing a probed bucket with `fp`
    fn probe(&self, fp: Fingerprint) -> FxHashSet<usize> {
        let mut hits = FxHashSet::default();
        for (t, table) in self.tables.iter().enumerate() {
            for key in probe_keys(band_key(fp, t as u32)) {
                if let Some(bucket) = table.get(&key) {
                    hits.extend(bucket.iter().copied());
                }
            }
        }
        hits
    }

    fn pair(&self, query: &'a LineRecord, line: &'a LineRecord) -> CandidatePair<'a> {
        let estimated_distance = query.fingerprint.hamming(line.fingerprint);
        match self.side.opposite() {
            Side::Old => CandidatePair {
                old: query,
                new: line,
                estimated_distance,
            },
            Side::New => CandidatePair {
                old: line,
                new: query,
                estimated_distance,
            },
        }
    }
}

/// Lazily ranked candidates for one query line
#[derive(Debug, Clone, Copy)]
pub struct Candidates<'i, 'a> {
    index: &'i FingerprintIndex<'a>,
    query: &'a LineRecord,
    k: usize,
}

impl<'i, 'a> Candidates<'i, 'a> {
    /// Candidates ordered by (distance, displacement from the query, index)
    pub fn iter(&self) -> std::vec::IntoIter<CandidatePair<'a>> {
        self.ranked().into_iter()
    }

    fn ranked(&self) -> Vec<CandidatePair<'a>> {
        if self.k == 0 || self.index.is_empty() {
            return Vec::new();
        }

        let index = self.index;
        let query = self.query;
        let mut hits = index.probe(query.fingerprint);
        if hits.len() < self.k && index.len() <= index.scan_limit {
            hits.extend(0..index.len());
        }

        let mut ranked: Vec<(u32, usize, usize)> = hits
            .into_iter()
            .map(|pos| {
                let line = &index.lines[pos];
                (
                    query.fingerprint.hamming(line.fingerprint),
                    query.index.abs_diff(line.index),
                    pos,
                )
            })
            .collect();
        ranked.sort_unstable();
        ranked.truncate(self.k);

        ranked
            .into_iter()
            .map(|(_, _, pos)| index.pair(query, &index.lines[pos]))
            .collect()
    }
}

impl<'i, 'a> IntoIterator for &Candidates<'i, 'a> {
    type Item = CandidatePair<'a>;
    type IntoIter = std::vec::IntoIter<CandidatePair<'a>>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
