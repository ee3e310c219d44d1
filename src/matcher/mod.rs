//! Candidate scoring and one-to-one mapping
//!
//! The matcher gathers candidates in both directions (old lines queried
//! against an index of the new version and vice versa), scores every unique
//! pair in parallel, and commits edges greedily in descending similarity.
//! The commit loop is the only writer to the mapping tables.
//!
//! Ties are broken by smaller displacement, then smaller old index, then
//! smaller new index, so the result never depends on thread scheduling.

pub mod similarity;

pub use similarity::{content_similarity, context_similarity, SimilarityMetric};

use crate::fingerprint::{FingerprintIndex, DEFAULT_SCAN_LIMIT};
use crate::models::{LineRecord, Side};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use tracing::debug;

/// Default number of candidates retrieved per line
pub const DEFAULT_CANDIDATE_COUNT: usize = 8;

/// Default minimum similarity for a pair to be mapped
pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.6;

/// Default number of lines on each side used as context
pub const DEFAULT_CONTEXT_WINDOW: usize = 2;

/// Matching parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchConfig {
    pub candidate_count: usize,
    pub similarity_threshold: f64,
    pub metric: SimilarityMetric,
    /// Weight of context similarity in the blended score (0 disables it)
    pub context_weight: f64,
    pub context_window: usize,
    pub scan_limit: usize,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            candidate_count: DEFAULT_CANDIDATE_COUNT,
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
            metric: SimilarityMetric::default(),
            context_weight: 0.0,
            context_window: DEFAULT_CONTEXT_WINDOW,
            scan_limit: DEFAULT_SCAN_LIMIT,
        }
    }
}

/// A scored candidate edge that passed the threshold
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoredEdge {
    pub old_index: usize,
    pub new_index: usize,
    pub similarity: f64,
}

impl ScoredEdge {
    pub fn displacement(&self) -> usize {
        self.old_index.abs_diff(self.new_index)
    }

    /// Commit order: similarity desc, displacement asc, old asc, new asc
    fn commit_order(&self, other: &Self) -> Ordering {
        other
            .similarity
            .total_cmp(&self.similarity)
            .then_with(|| self.displacement().cmp(&other.displacement()))
            .then_with(|| self.old_index.cmp(&other.old_index))
            .then_with(|| self.new_index.cmp(&other.new_index))
    }
}

/// One committed old/new pair
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MappedPair {
    pub old_index: usize,
    pub new_index: usize,
    pub similarity: f64,
}

impl MappedPair {
    pub fn displacement(&self) -> usize {
        self.old_index.abs_diff(self.new_index)
    }
}

/// Injective relation between old and new line indices
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mapping {
    /// Committed pairs ordered by old index
    pairs: Vec<MappedPair>,
    /// Slot `i` holds the new index mapped to old line `i + 1`
    old_to_new: Vec<Option<usize>>,
    /// Slot `j` holds the old index mapped to new line `j + 1`
    new_to_old: Vec<Option<usize>>,
}

impl Mapping {
    fn empty(old_len: usize, new_len: usize) -> Self {
        Self {
            pairs: Vec::new(),
            old_to_new: vec![None; old_len],
            new_to_old: vec![None; new_len],
        }
    }

    pub fn pairs(&self) -> &[MappedPair] {
        &self.pairs
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn old_len(&self) -> usize {
        self.old_to_new.len()
    }

    pub fn new_len(&self) -> usize {
        self.new_to_old.len()
    }

    /// New index mapped to a 1-based old index
    pub fn new_for_old(&self, old_index: usize) -> Option<usize> {
        old_index
            .checked_sub(1)
            .and_then(|i| self.old_to_new.get(i).copied().flatten())
    }

    /// Old index mapped to a 1-based new index
    pub fn old_for_new(&self, new_index: usize) -> Option<usize> {
        new_index
            .checked_sub(1)
            .and_then(|j| self.new_to_old.get(j).copied().flatten())
    }

    /// Pair for an old index, with its similarity
    pub fn pair_for_old(&self, old_index: usize) -> Option<&MappedPair> {
        self.pairs
            .binary_search_by_key(&old_index, |p| p.old_index)
            .ok()
            .map(|pos| &self.pairs[pos])
    }

    /// Commit an edge unless either endpoint is already taken
    fn try_commit(&mut self, edge: &ScoredEdge) -> bool {
        let (o, n) = (edge.old_index - 1, edge.new_index - 1);
        if self.old_to_new[o].is_some() || self.new_to_old[n].is_some() {
            return false;
        }
        self.old_to_new[o] = Some(edge.new_index);
        self.new_to_old[n] = Some(edge.old_index);
        self.pairs.push(MappedPair {
            old_index: edge.old_index,
            new_index: edge.new_index,
            similarity: edge.similarity,
        });
        true
    }
}

/// Resolves candidate pairs into a [`Mapping`]
#[derive(Debug, Clone, Default)]
pub struct Matcher {
    config: MatchConfig,
}

impl Matcher {
    pub fn new(config: MatchConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &MatchConfig {
        &self.config
    }

    /// Blended similarity of old line `old_index` and new line `new_index`
    pub fn score(&self, old: &[LineRecord], new: &[LineRecord], old_index: usize, new_index: usize) -> f64 {
        let a = &old[old_index - 1];
        let b = &new[new_index - 1];
        let content = content_similarity(self.config.metric, &a.normalized_text, &b.normalized_text);

        let w = self.config.context_weight;
        if w <= 0.0 {
            return content;
        }
        let window = self.config.context_window;
        let context = context_similarity(
            &similarity::context_lines(old, old_index, window),
            &similarity::context_lines(new, new_index, window),
        );
        (1.0 - w) * content + w * context
    }

    /// Unique (old, new) candidate pairs from both directions, sorted
    pub fn candidate_pairs(&self, old: &[LineRecord], new: &[LineRecord]) -> Vec<(usize, usize)> {
        let k = self.config.candidate_count;
        let new_index = FingerprintIndex::build(new, Side::New).with_scan_limit(self.config.scan_limit);
        let old_index = FingerprintIndex::build(old, Side::Old).with_scan_limit(self.config.scan_limit);

        let forward = old.par_iter().flat_map_iter(|line| {
            new_index
                .candidates(line, k)
                .iter()
                .map(|c| (c.old.index, c.new.index))
                .collect::<Vec<_>>()
        });
        let backward = new.par_iter().flat_map_iter(|line| {
            old_index
                .candidates(line, k)
                .iter()
                .map(|c| (c.old.index, c.new.index))
                .collect::<Vec<_>>()
        });

        let mut pairs: Vec<(usize, usize)> = forward.chain(backward).collect();
        pairs.par_sort_unstable();
        pairs.dedup();
        pairs
    }

    /// Score candidate pairs in parallel, keeping those at or above the threshold
    pub fn score_candidates(
        &self,
        old: &[LineRecord],
        new: &[LineRecord],
        pairs: &[(usize, usize)],
    ) -> Vec<ScoredEdge> {
        let threshold = self.config.similarity_threshold;
        pairs
            .par_iter()
            .map(|&(o, n)| ScoredEdge {
                old_index: o,
                new_index: n,
                similarity: self.score(old, new, o, n),
            })
            .filter(|edge| edge.similarity >= threshold)
            .collect()
    }

    /// Greedily commit edges into a one-to-one mapping
    pub fn commit(&self, old_len: usize, new_len: usize, mut edges: Vec<ScoredEdge>) -> Mapping {
        edges.par_sort_unstable_by(|a, b| a.commit_order(b));

        let mut mapping = Mapping::empty(old_len, new_len);
        for edge in &edges {
            mapping.try_commit(edge);
        }
        mapping.pairs.sort_unstable_by_key(|p| p.old_index);

        debug!(
            "Committed {} of {} scored edges ({} old, {} new lines)",
            mapping.len(),
            edges.len(),
            old_len,
            new_len
        );
        mapping
    }

    /// Run every matching stage
    pub fn resolve(&self, old: &[LineRecord], new: &[LineRecord]) -> Mapping {
        let pairs = self.candidate_pairs(old, new);
        debug!("Gathered {} unique candidate pairs", pairs.len());
        let edges = self.score_candidates(old, new, &pairs);
        self.commit(old.len(), new.len(), edges)
    }
}
