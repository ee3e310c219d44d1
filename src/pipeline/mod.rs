//! Comparison pipeline
//!
//! Wires extraction, candidate retrieval, matching, change classification
//! and bug labelling into one call. Every comparison is independent: no state
//! survives between calls, so any number may run concurrently.

use crate::bugs::{BugClassifier, RuleTable};
use crate::changes::classify;
use crate::extract::{extract, extract_bytes, InputError, NormalizeOptions};
use crate::fingerprint::DEFAULT_SCAN_LIMIT;
use crate::matcher::{
    MatchConfig, Matcher, SimilarityMetric, DEFAULT_CANDIDATE_COUNT, DEFAULT_CONTEXT_WINDOW,
    DEFAULT_SIMILARITY_THRESHOLD,
};
use crate::models::{Comparison, LineRecord, Side};
use std::borrow::Cow;
use std::convert::Infallible;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

/// Out-of-range configuration values
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("similarity_threshold must be within [0, 1], got {0}")]
    Threshold(f64),

    #[error("candidate_count must be at least 1")]
    ZeroCandidates,

    #[error("context_weight must be within [0, 1], got {0}")]
    ContextWeight(f64),
}

/// Reasons a comparison produced no result
#[derive(Error, Debug)]
pub enum CompareError {
    #[error(transparent)]
    Input(#[from] InputError),

    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("comparison cancelled")]
    Cancelled,
}

/// Shared cancellation switch, checked between stages
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    fn check(&self) -> Result<(), CompareError> {
        if self.is_cancelled() {
            Err(CompareError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Everything that shapes one comparison
#[derive(Debug, Clone)]
pub struct CompareConfig {
    /// Candidates retrieved per line and direction
    pub candidate_count: usize,
    pub similarity_threshold: f64,
    /// Mapped lines displaced by more than this are flagged as moved
    pub displacement_threshold: usize,
    pub metric: SimilarityMetric,
    pub context_weight: f64,
    /// Lines either side used for context similarity
    pub context_window: usize,
    pub scan_limit: usize,
    pub normalize: NormalizeOptions,
    pub rules: RuleTable,
    /// Lines either side the bug rules may inspect
    pub bug_context_window: usize,
}

impl Default for CompareConfig {
    fn default() -> Self {
        Self {
            candidate_count: DEFAULT_CANDIDATE_COUNT,
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
            displacement_threshold: 0,
            metric: SimilarityMetric::default(),
            context_weight: 0.0,
            context_window: DEFAULT_CONTEXT_WINDOW,
            scan_limit: DEFAULT_SCAN_LIMIT,
            normalize: NormalizeOptions::default(),
            rules: RuleTable::builtin(),
            bug_context_window: DEFAULT_CONTEXT_WINDOW,
        }
    }
}

impl CompareConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.similarity_threshold) {
            return Err(ConfigError::Threshold(self.similarity_threshold));
        }
        if self.candidate_count == 0 {
            return Err(ConfigError::ZeroCandidates);
        }
        if !(0.0..=1.0).contains(&self.context_weight) {
            return Err(ConfigError::ContextWeight(self.context_weight));
        }
        Ok(())
    }

    pub fn match_config(&self) -> MatchConfig {
        MatchConfig {
            candidate_count: self.candidate_count,
            similarity_threshold: self.similarity_threshold,
            metric: self.metric,
            context_weight: self.context_weight,
            context_window: self.context_window,
            scan_limit: self.scan_limit,
        }
    }
}

/// Compare two extracted versions.
///
/// Lines are identified by their position in `old` and `new`. Records whose
/// `side` or `index` disagree with that position (a subslice, or both sides
/// extracted as old) are re-indexed before matching.
pub fn compare(old: &[LineRecord], new: &[LineRecord], config: &CompareConfig) -> Comparison {
    match run(old, new, config, || Ok::<(), Infallible>(())) {
        Ok(comparison) => comparison,
        Err(never) => match never {},
    }
}

/// Extract and compare two texts
pub fn compare_texts(old: &str, new: &str, config: &CompareConfig) -> Comparison {
    let old = extract(old, Side::Old, &config.normalize);
    let new = extract(new, Side::New, &config.normalize);
    compare(&old, &new, config)
}

/// Decode, extract and compare two byte buffers
pub fn compare_bytes(old: &[u8], new: &[u8], config: &CompareConfig) -> Result<Comparison, InputError> {
    let old = extract_bytes(old, Side::Old, &config.normalize)?;
    let new = extract_bytes(new, Side::New, &config.normalize)?;
    Ok(compare(&old, &new, config))
}

/// Compare with validation and cooperative cancellation
pub fn compare_cancellable(
    old: &[LineRecord],
    new: &[LineRecord],
    config: &CompareConfig,
    cancel: &CancelFlag,
) -> Result<Comparison, CompareError> {
    config.validate()?;
    run(old, new, config, || cancel.check())
}

/// `lines` as records of `side` numbered by slice position
fn positioned(lines: &[LineRecord], side: Side) -> Cow<'_, [LineRecord]> {
    let in_place = lines
        .iter()
        .enumerate()
        .all(|(pos, line)| line.side == side && line.index == pos + 1);
    if in_place {
        return Cow::Borrowed(lines);
    }
    debug!("Re-indexing {} {} lines by position", lines.len(), side);
    Cow::Owned(
        lines
            .iter()
            .enumerate()
            .map(|(pos, line)| LineRecord {
                side,
                index: pos + 1,
                ..line.clone()
            })
            .collect(),
    )
}

/// Run every stage, calling `checkpoint` between them
fn run<E>(
    old: &[LineRecord],
    new: &[LineRecord],
    config: &CompareConfig,
    checkpoint: impl Fn() -> Result<(), E>,
) -> Result<Comparison, E> {
    checkpoint()?;
    let (old, new) = (positioned(old, Side::Old), positioned(new, Side::New));
    let (old, new) = (&*old, &*new);
    let matcher = Matcher::new(config.match_config());
    let pairs = matcher.candidate_pairs(old, new);
    debug!("Gathered {} unique candidate pairs", pairs.len());

    checkpoint()?;
    let edges = matcher.score_candidates(old, new, &pairs);
    debug!("{} candidate pairs at or above threshold", edges.len());

    checkpoint()?;
    let mapping = matcher.commit(old.len(), new.len(), edges);

    checkpoint()?;
    let records = classify(old, new, &mapping, config.displacement_threshold);

    checkpoint()?;
    let bug_labels =
        BugClassifier::new(&config.rules, config.bug_context_window).label_changes(old, new, &records);

    let comparison = Comparison {
        records,
        bug_labels,
        rule_table_version: config.rules.version().to_string(),
    };
    let summary = comparison.summary();
    info!(
        "Compared {} -> {} lines: {} unchanged, {} modified, {} inserted, {} deleted",
        old.len(),
        new.len(),
        summary.unchanged,
        summary.modified,
        summary.inserted,
        summary.deleted
    );
    Ok(comparison)
}
