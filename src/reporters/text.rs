//! Plain-text results report
//!
//! This is the format written to `<case>_results.txt` by batch runs, so it
//! carries no ANSI styling.

use super::PairReport;
use crate::history::BugOrigin;
use crate::models::BugLabel;
use anyhow::Result;
use std::fmt::Write;

/// Render report as the plain-text results file
pub fn render(report: &PairReport<'_>) -> Result<String> {
    let comparison = report.comparison;
    let mut out = String::new();

    writeln!(out, "RESULTS FOR: {}", report.case_name)?;
    writeln!(out, "{}\n", "=".repeat(50))?;

    writeln!(out, "LHDIFF MAPPINGS:")?;
    writeln!(out, "{}", "-".repeat(20))?;
    for record in comparison.mapped() {
        if let (Some(old), Some(new)) = (record.old_index, record.new_index) {
            writeln!(out, "[{}] -> [{}]", old, new)?;
        }
    }
    out.push('\n');

    writeln!(out, "\nRemoved lines:")?;
    let removed: Vec<usize> = comparison.deleted().filter_map(|r| r.old_index).collect();
    write_indices(&mut out, "Old", &removed)?;

    writeln!(out, "\nInserted lines:")?;
    let inserted: Vec<usize> = comparison.inserted().filter_map(|r| r.new_index).collect();
    write_indices(&mut out, "New", &inserted)?;
    out.push('\n');

    writeln!(out, "BUG IDENTIFIER RESULTS:")?;
    writeln!(out, "{}", "-".repeat(25))?;

    writeln!(out, "=== BUG FIXES ===")?;
    let fixes: Vec<&BugLabel> = comparison.bug_fixes().collect();
    if fixes.is_empty() {
        writeln!(out, "No bug fixes detected\n")?;
    }
    for (i, fix) in fixes.iter().enumerate() {
        writeln!(out, "FIX #{}:", i + 1)?;
        write_label(&mut out, fix)?;
        if let Some(origin) = origin_for(report.origins, fix) {
            writeln!(
                out,
                "  Introduced In: {} (line {})",
                origin.introduced_in, origin.introduced_line
            )?;
            writeln!(out, "  Origin Confidence: {:.3}", origin.confidence)?;
        }
        out.push('\n');
    }

    writeln!(out, "=== BUG INTRODUCTIONS ===")?;
    let introductions: Vec<&BugLabel> = comparison.bug_introductions().collect();
    if introductions.is_empty() {
        writeln!(out, "No bug introductions detected\n")?;
    }
    for (i, intro) in introductions.iter().enumerate() {
        writeln!(out, "INTRODUCTION #{}:", i + 1)?;
        write_label(&mut out, intro)?;
        out.push('\n');
    }

    writeln!(out, "=== SUMMARY ===")?;
    writeln!(out, "Total bug fixes: {}", fixes.len())?;
    writeln!(out, "Total bug introductions: {}", introductions.len())?;
    writeln!(out, "Rule table: {}", comparison.rule_table_version)?;

    Ok(out)
}

fn write_indices(out: &mut String, side: &str, indices: &[usize]) -> std::fmt::Result {
    if indices.is_empty() {
        return writeln!(out, "  None");
    }
    for index in indices {
        writeln!(out, "  {} {}", side, index)?;
    }
    Ok(())
}

fn write_label(out: &mut String, label: &BugLabel) -> std::fmt::Result {
    writeln!(out, "  Old Line: {}", label.old_index)?;
    writeln!(out, "  New Line: {}", label.new_index)?;
    writeln!(out, "  Confidence: {:.3}", label.confidence)?;
    writeln!(out, "  Evidence: {}", label.evidence.join(", "))
}

fn origin_for<'o>(origins: &'o [BugOrigin], fix: &BugLabel) -> Option<&'o BugOrigin> {
    origins
        .iter()
        .find(|o| o.fixed_line == fix.new_index && o.buggy_line == fix.old_index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reporters::tests::fixture;

    #[test]
    fn test_text_sections() {
        let (old, new, comparison) = fixture();
        let out = render(&PairReport::new("f_v1_to_v2", &old, &new, &comparison)).unwrap();

        assert!(out.starts_with("RESULTS FOR: f_v1_to_v2\n=================================================="));
        assert!(out.contains("LHDIFF MAPPINGS:\n--------------------\n[1] -> [1]\n[2] -> [2]\n[3] -> [4]\n[4] -> [5]\n"));
        assert!(out.contains("Removed lines:\n  Old 5\n"));
        assert!(out.contains("Inserted lines:\n  New 3\n"));
        assert!(out.contains("FIX #1:\n  Old Line: 3\n  New Line: 4\n  Confidence: 1.000\n"));
        assert!(out.contains("  Evidence: default-value-added, guard-added-in-context\n"));
        assert!(out.contains("No bug introductions detected"));
        assert!(out.contains("Total bug fixes: 1\nTotal bug introductions: 0\nRule table: builtin-1\n"));
        assert!(!out.contains("Introduced In"));
    }

    #[test]
    fn test_text_empty_sections() {
        let (old, new, mut comparison) = fixture();
        comparison.records.retain(|r| r.status.is_mapped());
        comparison.bug_labels.clear();
        let out = render(&PairReport::new("case", &old, &new, &comparison)).unwrap();
        assert!(out.contains("Removed lines:\n  None\n"));
        assert!(out.contains("Inserted lines:\n  None\n"));
        assert!(out.contains("No bug fixes detected"));
    }

    #[test]
    fn test_text_includes_origin() {
        let (old, new, comparison) = fixture();
        let origins = vec![BugOrigin {
            fixed_in: "v2".to_string(),
            fixed_line: 4,
            buggy_line: 3,
            introduced_in: "v1".to_string(),
            introduced_line: 3,
            exact: false,
            confidence: 0.5,
            evidence: vec!["default-value-added".to_string()],
        }];
        let pair = PairReport::new("f_v1_to_v2", &old, &new, &comparison).with_origins(&origins);
        let out = render(&pair).unwrap();
        assert!(out.contains("  Introduced In: v1 (line 3)\n  Origin Confidence: 0.500\n"));
    }
}
