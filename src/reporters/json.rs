//! JSON reporter
//!
//! Outputs the full comparison of one pair as pretty-printed JSON.
//! Useful for machine consumption, piping to jq, or further processing.

use super::PairReport;
use crate::history::BugOrigin;
use crate::models::{BugLabel, ChangeRecord, ChangeSummary};
use anyhow::Result;
use serde::Serialize;

#[derive(Serialize)]
struct JsonReport<'a> {
    case: &'a str,
    rule_table_version: &'a str,
    old_lines: usize,
    new_lines: usize,
    summary: ChangeSummary,
    records: &'a [ChangeRecord],
    bug_labels: &'a [BugLabel],
    #[serde(skip_serializing_if = "no_origins")]
    origins: &'a [BugOrigin],
}

fn no_origins(origins: &&[BugOrigin]) -> bool {
    origins.is_empty()
}

impl<'a> JsonReport<'a> {
    fn from_pair(report: &PairReport<'a>) -> Self {
        let comparison = report.comparison;
        Self {
            case: report.case_name,
            rule_table_version: &comparison.rule_table_version,
            old_lines: report.old.len(),
            new_lines: report.new.len(),
            summary: comparison.summary(),
            records: &comparison.records,
            bug_labels: &comparison.bug_labels,
            origins: report.origins,
        }
    }
}

/// Render report as JSON
pub fn render(report: &PairReport<'_>) -> Result<String> {
    Ok(serde_json::to_string_pretty(&JsonReport::from_pair(report))?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reporters::tests::fixture;

    #[test]
    fn test_json_render_valid() {
        let (old, new, comparison) = fixture();
        let json_str = render(&PairReport::new("f", &old, &new, &comparison)).expect("render JSON");
        let parsed: serde_json::Value = serde_json::from_str(&json_str).expect("parse JSON");
        assert_eq!(parsed["case"], "f");
        assert_eq!(parsed["rule_table_version"], "builtin-1");
        assert_eq!(parsed["old_lines"], 5);
        assert_eq!(parsed["summary"]["modified"], 1);
        assert_eq!(parsed["summary"]["bug_fixes"], 1);
        assert_eq!(parsed["records"][2]["status"], "modified");
        assert_eq!(parsed["bug_labels"][0]["label"], "bug_fix");
        assert!(parsed.get("origins").is_none());
    }
}
