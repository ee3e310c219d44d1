//! Side-by-side view for the web front-end
//!
//! Each side becomes an ordered list of `{status, content}` entries, one per
//! line, with the change statuses collapsed to what the viewer colours.

use super::PairReport;
use crate::models::{ChangeStatus, Comparison, LineRecord};
use anyhow::Result;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WebStatus {
    Unchanged,
    Changed,
    Inserted,
    Deleted,
}

impl From<ChangeStatus> for WebStatus {
    fn from(status: ChangeStatus) -> Self {
        match status {
            ChangeStatus::Unchanged => WebStatus::Unchanged,
            ChangeStatus::Modified => WebStatus::Changed,
            ChangeStatus::Inserted => WebStatus::Inserted,
            ChangeStatus::Deleted => WebStatus::Deleted,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebLine {
    pub status: WebStatus,
    pub content: String,
}

/// Both sides of a comparison, ready for display
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebDiff {
    pub old: Vec<WebLine>,
    pub new: Vec<WebLine>,
}

impl WebDiff {
    pub fn build(old: &[LineRecord], new: &[LineRecord], comparison: &Comparison) -> Self {
        let mut old_status = vec![WebStatus::Unchanged; old.len()];
        let mut new_status = vec![WebStatus::Unchanged; new.len()];
        for record in &comparison.records {
            let status = WebStatus::from(record.status);
            if let Some(slot) = record.old_index.and_then(|i| old_status.get_mut(i - 1)) {
                *slot = status;
            }
            if let Some(slot) = record.new_index.and_then(|i| new_status.get_mut(i - 1)) {
                *slot = status;
            }
        }

        let side = |lines: &[LineRecord], statuses: Vec<WebStatus>| -> Vec<WebLine> {
            lines
                .iter()
                .zip(statuses)
                .map(|(line, status)| WebLine {
                    status,
                    content: line.raw_text.clone(),
                })
                .collect()
        };

        Self {
            old: side(old, old_status),
            new: side(new, new_status),
        }
    }
}

/// Render report as the web diff JSON
pub fn render(report: &PairReport<'_>) -> Result<String> {
    let diff = WebDiff::build(report.old, report.new, report.comparison);
    Ok(serde_json::to_string_pretty(&diff)?)
}
