//! Core data models for lhdiff
//!
//! These models flow through every stage of a comparison: line records
//! produced by the extractor, change records produced by the classifier,
//! and bug labels attached to modified lines.

use crate::fingerprint::Fingerprint;
use serde::{Deserialize, Serialize};

/// Which version of the file a line belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Old,
    New,
}

impl Side {
    /// The side a query on this side is matched against
    pub fn opposite(self) -> Side {
        match self {
            Side::Old => Side::New,
            Side::New => Side::Old,
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Old => write!(f, "old"),
            Side::New => write!(f, "new"),
        }
    }
}

/// A single line of one version
///
/// Created once by the extractor and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LineRecord {
    pub side: Side,
    /// 1-based position within its side
    pub index: usize,
    pub raw_text: String,
    pub normalized_text: String,
    pub fingerprint: Fingerprint,
}

/// Final status of a line after matching
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeStatus {
    Unchanged,
    Modified,
    Inserted,
    Deleted,
}

impl ChangeStatus {
    pub fn is_mapped(self) -> bool {
        matches!(self, ChangeStatus::Unchanged | ChangeStatus::Modified)
    }
}

impl std::fmt::Display for ChangeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChangeStatus::Unchanged => write!(f, "unchanged"),
            ChangeStatus::Modified => write!(f, "modified"),
            ChangeStatus::Inserted => write!(f, "inserted"),
            ChangeStatus::Deleted => write!(f, "deleted"),
        }
    }
}

/// One record per line that appears in either version
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeRecord {
    pub status: ChangeStatus,
    /// Orthogonal to `status`: a mapped line whose displacement exceeds the
    /// configured threshold
    pub moved: bool,
    pub old_index: Option<usize>,
    pub new_index: Option<usize>,
    pub displacement: Option<usize>,
    pub similarity: Option<f64>,
}

impl ChangeRecord {
    pub fn deleted(old_index: usize) -> Self {
        Self {
            status: ChangeStatus::Deleted,
            moved: false,
            old_index: Some(old_index),
            new_index: None,
            displacement: None,
            similarity: None,
        }
    }

    pub fn inserted(new_index: usize) -> Self {
        Self {
            status: ChangeStatus::Inserted,
            moved: false,
            old_index: None,
            new_index: Some(new_index),
            displacement: None,
            similarity: None,
        }
    }
}

/// Verdict of the bug classifier for one modified line
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BugKind {
    BugFix,
    BugIntroduction,
    #[default]
    None,
}

impl std::fmt::Display for BugKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BugKind::BugFix => write!(f, "bug_fix"),
            BugKind::BugIntroduction => write!(f, "bug_introduction"),
            BugKind::None => write!(f, "none"),
        }
    }
}

impl std::str::FromStr for BugKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "bug_fix" | "fix" => Ok(BugKind::BugFix),
            "bug_introduction" | "introduction" => Ok(BugKind::BugIntroduction),
            "none" => Ok(BugKind::None),
            _ => Err(format!(
                "Unknown bug label '{}'. Valid labels: bug_fix, bug_introduction, none",
                s
            )),
        }
    }
}

/// Bug evidence attached to a modified line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BugLabel {
    pub old_index: usize,
    pub new_index: usize,
    pub label: BugKind,
    /// Winning weight over all weight considered, 0.0 when undecided
    pub confidence: f64,
    /// Names of triggered rules, in rule-table order
    pub evidence: Vec<String>,
}

/// Full result of comparing two versions
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Comparison {
    pub records: Vec<ChangeRecord>,
    pub bug_labels: Vec<BugLabel>,
    /// Version of the rule table the labels were produced with
    pub rule_table_version: String,
}

impl Comparison {
    /// Records for lines present in both versions, ordered by old index
    pub fn mapped(&self) -> impl Iterator<Item = &ChangeRecord> {
        self.records.iter().filter(|r| r.status.is_mapped())
    }

    pub fn deleted(&self) -> impl Iterator<Item = &ChangeRecord> {
        self.records
            .iter()
            .filter(|r| r.status == ChangeStatus::Deleted)
    }

    pub fn inserted(&self) -> impl Iterator<Item = &ChangeRecord> {
        self.records
            .iter()
            .filter(|r| r.status == ChangeStatus::Inserted)
    }

    pub fn bug_fixes(&self) -> impl Iterator<Item = &BugLabel> {
        self.bug_labels.iter().filter(|l| l.label == BugKind::BugFix)
    }

    pub fn bug_introductions(&self) -> impl Iterator<Item = &BugLabel> {
        self.bug_labels
            .iter()
            .filter(|l| l.label == BugKind::BugIntroduction)
    }

    /// Record for a given new index, if any
    pub fn record_for_new(&self, new_index: usize) -> Option<&ChangeRecord> {
        self.records
            .iter()
            .find(|r| r.new_index == Some(new_index))
    }

    /// Summary counts by status
    pub fn summary(&self) -> ChangeSummary {
        ChangeSummary::from_records(&self.records, &self.bug_labels)
    }
}

/// Summary of a comparison by status
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeSummary {
    pub unchanged: usize,
    pub modified: usize,
    pub inserted: usize,
    pub deleted: usize,
    pub moved: usize,
    pub bug_fixes: usize,
    pub bug_introductions: usize,
}

impl ChangeSummary {
    pub fn from_records(records: &[ChangeRecord], labels: &[BugLabel]) -> Self {
        let mut summary = Self::default();
        for r in records {
            match r.status {
                ChangeStatus::Unchanged => summary.unchanged += 1,
                ChangeStatus::Modified => summary.modified += 1,
                ChangeStatus::Inserted => summary.inserted += 1,
                ChangeStatus::Deleted => summary.deleted += 1,
            }
            if r.moved {
                summary.moved += 1;
            }
        }
        for l in labels {
            match l.label {
                BugKind::BugFix => summary.bug_fixes += 1,
                BugKind::BugIntroduction => summary.bug_introductions += 1,
                BugKind::None => {}
            }
        }
        summary
    }
}
