//! Bug-fix / bug-introduction classification
//!
//! Every rule in the table is evaluated against every modified line. The
//! weights of the rules that fire are summed per label; the label with the
//! strictly greater sum wins. Ties and silence yield `none`.

pub mod rules;

pub use rules::{
    builtin_specs, PredicateSpec, Rule, RuleError, RuleSpec, RuleTable, BUILTIN_VERSION,
};

use crate::models::{BugKind, BugLabel, ChangeRecord, ChangeStatus, LineRecord};
use rayon::prelude::*;
use tracing::debug;

/// Raw text of a modified line on both sides plus its neighbours
#[derive(Debug, Clone, Default)]
pub struct ChangeContext<'a> {
    pub old_line: &'a str,
    pub new_line: &'a str,
    pub old_context: Vec<&'a str>,
    pub new_context: Vec<&'a str>,
}

/// Raw text of up to `window` lines either side of `index`, excluding it
fn neighbours(lines: &[LineRecord], index: usize, window: usize) -> Vec<&str> {
    let pos = index - 1;
    let start = pos.saturating_sub(window);
    let end = (pos + 1 + window).min(lines.len());
    (start..end)
        .filter(|&p| p != pos)
        .map(|p| lines[p].raw_text.as_str())
        .collect()
}

impl<'a> ChangeContext<'a> {
    pub fn new(old_line: &'a str, new_line: &'a str) -> Self {
        Self {
            old_line,
            new_line,
            old_context: Vec::new(),
            new_context: Vec::new(),
        }
    }

    pub fn with_context(mut self, old_context: Vec<&'a str>, new_context: Vec<&'a str>) -> Self {
        self.old_context = old_context;
        self.new_context = new_context;
        self
    }

    /// Build the context for a mapped pair of 1-based indices
    pub fn for_pair(
        old: &'a [LineRecord],
        new: &'a [LineRecord],
        old_index: usize,
        new_index: usize,
        window: usize,
    ) -> Self {
        Self::new(&old[old_index - 1].raw_text, &new[new_index - 1].raw_text).with_context(
            neighbours(old, old_index, window),
            neighbours(new, new_index, window),
        )
    }
}

/// Outcome of evaluating the table against one change
#[derive(Debug, Clone, PartialEq)]
pub struct Verdict {
    pub label: BugKind,
    pub confidence: f64,
    pub evidence: Vec<String>,
}

/// Applies a [`RuleTable`] to modified lines
#[derive(Debug, Clone, Copy)]
pub struct BugClassifier<'t> {
    table: &'t RuleTable,
    context_window: usize,
}

impl<'t> BugClassifier<'t> {
    pub fn new(table: &'t RuleTable, context_window: usize) -> Self {
        Self {
            table,
            context_window,
        }
    }

    pub fn table(&self) -> &RuleTable {
        self.table
    }

    /// Evaluate every rule against one change
    pub fn evaluate(&self, change: &ChangeContext<'_>) -> Verdict {
        let mut fix = 0.0;
        let mut intro = 0.0;
        let mut evidence = Vec::new();

        for rule in self.table.rules() {
            if !rule.fires(change) {
                continue;
            }
            match rule.label() {
                BugKind::BugFix => fix += rule.weight(),
                BugKind::BugIntroduction => intro += rule.weight(),
                BugKind::None => continue,
            }
            evidence.push(rule.name().to_string());
        }

        let total = fix + intro;
        let (label, confidence) = if fix > intro {
            (BugKind::BugFix, fix / total)
        } else if intro > fix {
            (BugKind::BugIntroduction, intro / total)
        } else {
            (BugKind::None, 0.0)
        };

        Verdict {
            label,
            confidence,
            evidence,
        }
    }

    /// Label every modified record, in record order
    pub fn label_changes(
        &self,
        old: &[LineRecord],
        new: &[LineRecord],
        records: &[ChangeRecord],
    ) -> Vec<BugLabel> {
        let labels: Vec<BugLabel> = records
            .par_iter()
            .filter(|r| r.status == ChangeStatus::Modified)
            .filter_map(|r| Some((r.old_index?, r.new_index?)))
            .map(|(old_index, new_index)| {
                let change =
                    ChangeContext::for_pair(old, new, old_index, new_index, self.context_window);
                let verdict = self.evaluate(&change);
                BugLabel {
                    old_index,
                    new_index,
                    label: verdict.label,
                    confidence: verdict.confidence,
                    evidence: verdict.evidence,
                }
            })
            .collect();

        debug!(
            "Labelled {} modified lines with rule table {}",
            labels.len(),
            self.table.version()
        );
        labels
    }
}
