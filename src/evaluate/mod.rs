//! Mapping evaluation against ground truth
//!
//! Ground truth is a JSON object keyed by case name:
//!
//! ```json
//! { "calc": { "lhdiff": { "v1-v2": [[1, 1], [2, 3]] } } }
//! ```
//!
//! Line numbers are 1-based. A predicted mapping is scored by precision,
//! recall and F1 over its set of (old, new) pairs.

use crate::models::Comparison;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use tracing::debug;

/// Name of the summary written by batch runs
pub const RESULTS_CSV: &str = "evaluation_results.csv";

#[derive(Debug, Clone, Default, Deserialize)]
struct CaseTruth {
    #[serde(default)]
    lhdiff: BTreeMap<String, Vec<(usize, usize)>>,
}

/// Annotated line mappings for a set of cases
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct GroundTruth {
    cases: BTreeMap<String, CaseTruth>,
}

impl GroundTruth {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Invalid ground truth JSON")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read ground truth {}", path.display()))?;
        let truth = Self::from_json(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        debug!("Loaded ground truth for {} cases", truth.cases.len());
        Ok(truth)
    }

    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }

    /// Annotated pairs for `case` and a version key such as `v1-v2`
    pub fn pairs(&self, case: &str, version_key: &str) -> Option<&[(usize, usize)]> {
        self.cases
            .get(case)?
            .lhdiff
            .get(version_key)
            .map(Vec::as_slice)
    }
}

/// Precision, recall and F1 of one mapping
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Scores {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
}

/// Mapped (old, new) pairs of a comparison
pub fn predicted_pairs(comparison: &Comparison) -> Vec<(usize, usize)> {
    comparison
        .mapped()
        .filter_map(|r| Some((r.old_index?, r.new_index?)))
        .collect()
}

/// Score predicted pairs against annotated pairs.
///
/// Empty denominators score zero.
pub fn score_mapping(predicted: &[(usize, usize)], truth: &[(usize, usize)]) -> Scores {
    let predicted: BTreeSet<&(usize, usize)> = predicted.iter().collect();
    let truth: BTreeSet<&(usize, usize)> = truth.iter().collect();

    let tp = predicted.intersection(&truth).count() as f64;
    let fp = predicted.difference(&truth).count() as f64;
    let fn_ = truth.difference(&predicted).count() as f64;

    let precision = if tp + fp > 0.0 { tp / (tp + fp) } else { 0.0 };
    let recall = if tp + fn_ > 0.0 { tp / (tp + fn_) } else { 0.0 };
    let f1 = if precision + recall > 0.0 {
        2.0 * precision * recall / (precision + recall)
    } else {
        0.0
    };

    Scores {
        precision,
        recall,
        f1,
    }
}

/// One scored version pair
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluationRow {
    pub dataset: String,
    pub scores: Scores,
}

/// Mean scores, or `None` for no rows
pub fn averages(rows: &[EvaluationRow]) -> Option<Scores> {
    if rows.is_empty() {
        return None;
    }
    let n = rows.len() as f64;
    let sum = rows.iter().fold(Scores::default(), |acc, r| Scores {
        precision: acc.precision + r.scores.precision,
        recall: acc.recall + r.scores.recall,
        f1: acc.f1 + r.scores.f1,
    });
    Some(Scores {
        precision: sum.precision / n,
        recall: sum.recall / n,
        f1: sum.f1 / n,
    })
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Render rows as `Dataset,Precision,Recall,F1`
pub fn render_csv(rows: &[EvaluationRow]) -> String {
    let mut out = String::from("Dataset,Precision,Recall,F1\n");
    for row in rows {
        out.push_str(&format!(
            "{},{},{},{}\n",
            csv_field(&row.dataset),
            row.scores.precision,
            row.scores.recall,
            row.scores.f1
        ));
    }
    out
}

pub fn write_csv(path: &Path, rows: &[EvaluationRow]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    std::fs::write(path, render_csv(rows))
        .with_context(|| format!("Failed to write {}", path.display()))
}
