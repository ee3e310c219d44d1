//! Output reporters for lhdiff comparison results
//!
//! Supports multiple output formats:
//! - `text` - The per-pair results report (mappings, removed/inserted lines, bug labels)
//! - `json` - Machine-readable JSON
//! - `web` - The side-by-side wire shape consumed by the web viewer

mod json;
mod text;
mod web;

pub use web::{WebDiff, WebLine, WebStatus};

use crate::history::BugOrigin;
use crate::models::{Comparison, LineRecord};
use anyhow::{anyhow, Result};
use std::str::FromStr;

/// Supported output formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
    Web,
}

impl FromStr for OutputFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "txt" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            "web" => Ok(OutputFormat::Web),
            _ => Err(anyhow!(
                "Unknown format '{}'. Valid formats: text, json, web",
                s
            )),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Web => write!(f, "web"),
        }
    }
}

/// Everything a reporter needs about one compared pair
#[derive(Debug, Clone, Copy)]
pub struct PairReport<'a> {
    pub case_name: &'a str,
    pub old: &'a [LineRecord],
    pub new: &'a [LineRecord],
    pub comparison: &'a Comparison,
    /// Traced origins of this pair's bug fixes, when history is available
    pub origins: &'a [BugOrigin],
}

impl<'a> PairReport<'a> {
    pub fn new(
        case_name: &'a str,
        old: &'a [LineRecord],
        new: &'a [LineRecord],
        comparison: &'a Comparison,
    ) -> Self {
        Self {
            case_name,
            old,
            new,
            comparison,
            origins: &[],
        }
    }

    pub fn with_origins(mut self, origins: &'a [BugOrigin]) -> Self {
        self.origins = origins;
        self
    }
}

/// Render a pair report in the specified format
pub fn report(report: &PairReport<'_>, format: &str) -> Result<String> {
    let fmt = OutputFormat::from_str(format)?;
    report_with_format(report, fmt)
}

/// Render a pair report using an OutputFormat enum
pub fn report_with_format(report: &PairReport<'_>, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Text => text::render(report),
        OutputFormat::Json => json::render(report),
        OutputFormat::Web => web::render(report),
    }
}

/// Get the recommended file extension for a format
pub fn file_extension(format: OutputFormat) -> &'static str {
    match format {
        OutputFormat::Text => "txt",
        OutputFormat::Json | OutputFormat::Web => "json",
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::extract::{extract, NormalizeOptions};
    use crate::models::{BugKind, BugLabel, ChangeRecord, ChangeStatus, Side};

    pub(crate) const OLD: &str = "fn f(a: &[i32], i: usize) -> i32 {\n    let total = 0;\n    a[i]\n}\nunused();\n";
    pub(crate) const NEW: &str = "fn f(a: &[i32], i: usize) -> i32 {\n    let total = 0;\n    if i >= a.len() { return -1; }\n    a.get(i).copied().unwrap_or(0)\n}\n";

    fn mapped(old: usize, new: usize, status: ChangeStatus, similarity: f64) -> ChangeRecord {
        let displacement = old.abs_diff(new);
        ChangeRecord {
            status,
            moved: displacement > 0,
            old_index: Some(old),
            new_index: Some(new),
            displacement: Some(displacement),
            similarity: Some(similarity),
        }
    }

    /// Hand-built comparison over the shared fixture texts
    pub(crate) fn fixture() -> (Vec<LineRecord>, Vec<LineRecord>, Comparison) {
        let opts = NormalizeOptions::default();
        let old = extract(OLD, Side::Old, &opts);
        let new = extract(NEW, Side::New, &opts);
        let comparison = Comparison {
            records: vec![
                mapped(1, 1, ChangeStatus::Unchanged, 1.0),
                mapped(2, 2, ChangeStatus::Unchanged, 1.0),
                mapped(3, 4, ChangeStatus::Modified, 0.75),
                mapped(4, 5, ChangeStatus::Unchanged, 1.0),
                ChangeRecord::deleted(5),
                ChangeRecord::inserted(3),
            ],
            bug_labels: vec![BugLabel {
                old_index: 3,
                new_index: 4,
                label: BugKind::BugFix,
                confidence: 1.0,
                evidence: vec![
                    "default-value-added".to_string(),
                    "guard-added-in-context".to_string(),
                ],
            }],
            rule_table_version: "builtin-1".to_string(),
        };
        (old, new, comparison)
    }

    #[test]
    fn test_format_parsing() {
        assert_eq!(OutputFormat::from_str("text").unwrap(), OutputFormat::Text);
        assert_eq!(OutputFormat::from_str("JSON").unwrap(), OutputFormat::Json);
        assert_eq!(OutputFormat::from_str("web").unwrap(), OutputFormat::Web);
        assert!(OutputFormat::from_str("sarif").is_err());
        assert_eq!(OutputFormat::Web.to_string(), "web");
        assert_eq!(file_extension(OutputFormat::Web), "json");
    }

    #[test]
    fn test_report_dispatch() {
        let (old, new, comparison) = fixture();
        let pair = PairReport::new("f_v1_to_v2", &old, &new, &comparison);
        assert!(report(&pair, "text")
            .unwrap()
            .starts_with("RESULTS FOR: f_v1_to_v2"));
        assert!(report(&pair, "json").unwrap().contains("\"case\": \"f_v1_to_v2\""));
        assert!(report(&pair, "bogus").is_err());
    }
}
