//! Whole-chain analysis and bug origin tracing
//!
//! Adjacent versions of a chain are compared in parallel. Each line
//! labelled as a bug fix is then followed backwards through the earlier
//! mappings: while the line is unchanged we keep walking; the first pair in
//! which it was modified or inserted is where the buggy text appeared.

use crate::extract::{extract, read_text, InputError};
use crate::models::{ChangeStatus, Comparison, Side};
use crate::pipeline::{compare, CompareConfig};
use rayon::prelude::*;
use serde::Serialize;
use std::path::Path;
use tracing::{debug, info};

/// Confidence given to an origin that was pinned to a concrete change
pub const EXACT_CONFIDENCE: f64 = 1.0;

/// Confidence given when the line already existed in the first version
pub const BASELINE_CONFIDENCE: f64 = 0.5;

/// One version's text
#[derive(Debug, Clone)]
pub struct Version {
    pub label: String,
    pub text: String,
}

impl Version {
    pub fn new(label: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            text: text.into(),
        }
    }

    pub fn read(label: impl Into<String>, path: &Path) -> Result<Self, InputError> {
        Ok(Self::new(label, read_text(path)?))
    }
}

/// Result of comparing two adjacent versions
#[derive(Debug, Clone, Serialize)]
pub struct PairAnalysis {
    pub from: String,
    pub to: String,
    pub comparison: Comparison,
}

/// Where a fixed bug first appeared
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BugOrigin {
    /// Version in which the fix landed
    pub fixed_in: String,
    /// Line of the fixed text in `fixed_in`
    pub fixed_line: usize,
    /// Line of the buggy text in the version just before the fix
    pub buggy_line: usize,
    pub introduced_in: String,
    /// Line of the buggy text in `introduced_in`
    pub introduced_line: usize,
    /// False when the walk ran out of history
    pub exact: bool,
    pub confidence: f64,
    /// Rules that labelled the fix
    pub evidence: Vec<String>,
}

/// Analysis of a full version chain
#[derive(Debug, Clone, Serialize)]
pub struct ChainAnalysis {
    pub pairs: Vec<PairAnalysis>,
    pub origins: Vec<BugOrigin>,
}

/// Compare every adjacent pair of `versions` and trace bug origins
pub fn analyze_chain(versions: &[Version], config: &CompareConfig) -> ChainAnalysis {
    let pairs: Vec<PairAnalysis> = versions
        .par_windows(2)
        .map(|w| {
            let old = extract(&w[0].text, Side::Old, &config.normalize);
            let new = extract(&w[1].text, Side::New, &config.normalize);
            debug!("Comparing {} -> {}", w[0].label, w[1].label);
            PairAnalysis {
                from: w[0].label.clone(),
                to: w[1].label.clone(),
                comparison: compare(&old, &new, config),
            }
        })
        .collect();

    let origins = trace_origins(&pairs);
    info!(
        "Analyzed {} version pairs, traced {} bug origins",
        pairs.len(),
        origins.len()
    );
    ChainAnalysis { pairs, origins }
}

/// Follow each bug fix back to the version that introduced the buggy text
pub fn trace_origins(pairs: &[PairAnalysis]) -> Vec<BugOrigin> {
    let mut origins = Vec::new();

    for (p, pair) in pairs.iter().enumerate() {
        for fix in pair.comparison.bug_fixes() {
            let (introduced_in, introduced_line, exact) = walk_back(pairs, p, fix.old_index);
            origins.push(BugOrigin {
                fixed_in: pair.to.clone(),
                fixed_line: fix.new_index,
                buggy_line: fix.old_index,
                introduced_in,
                introduced_line,
                exact,
                confidence: if exact {
                    EXACT_CONFIDENCE
                } else {
                    BASELINE_CONFIDENCE
                },
                evidence: fix.evidence.clone(),
            });
        }
    }

    origins
}

/// Walk from line `line` of pair `p`'s old version towards the first version
fn walk_back(pairs: &[PairAnalysis], p: usize, mut line: usize) -> (String, usize, bool) {
    for q in (0..p).rev() {
        let earlier = &pairs[q];
        match earlier.comparison.record_for_new(line) {
            Some(record) if record.status == ChangeStatus::Unchanged => {
                if let Some(old_index) = record.old_index {
                    line = old_index;
                }
            }
            // Modified or inserted: the text took its current form here
            _ => return (earlier.to.clone(), line, true),
        }
    }
    (pairs[0].from.clone(), line, false)
}
