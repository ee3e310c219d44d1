//! Refined similarity between candidate lines

use crate::models::LineRecord;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::OnceLock;

/// Content metric used to score a candidate pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimilarityMetric {
    /// Normalized Levenshtein similarity of the normalized texts
    #[default]
    Levenshtein,
    /// Jaccard similarity of the token sets
    TokenOverlap,
}

impl std::str::FromStr for SimilarityMetric {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "levenshtein" => Ok(SimilarityMetric::Levenshtein),
            "token_overlap" | "tokens" => Ok(SimilarityMetric::TokenOverlap),
            _ => Err(format!(
                "Unknown metric '{}'. Valid metrics: levenshtein, token_overlap",
                s
            )),
        }
    }
}

impl std::fmt::Display for SimilarityMetric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SimilarityMetric::Levenshtein => write!(f, "levenshtein"),
            SimilarityMetric::TokenOverlap => write!(f, "token_overlap"),
        }
    }
}

fn token_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"[A-Za-z_][A-Za-z0-9_]*|[0-9]+(?:\.[0-9]+)?|[^\sA-Za-z0-9_]+")
            .expect("valid regex")
    })
}

/// Identifiers, numbers and operator runs of a line
pub fn tokens(text: &str) -> Vec<&str> {
    token_pattern().find_iter(text).map(|m| m.as_str()).collect()
}

/// Score two normalized texts with `metric`
pub fn content_similarity(metric: SimilarityMetric, a: &str, b: &str) -> f64 {
    match (a.is_empty(), b.is_empty()) {
        (true, true) => return 1.0,
        (true, false) | (false, true) => return 0.0,
        _ => {}
    }
    match metric {
        SimilarityMetric::Levenshtein => strsim::normalized_levenshtein(a, b),
        SimilarityMetric::TokenOverlap => {
            let left: BTreeSet<&str> = tokens(a).into_iter().collect();
            let right: BTreeSet<&str> = tokens(b).into_iter().collect();
            let union = left.union(&right).count();
            if union == 0 {
                return 1.0;
            }
            left.intersection(&right).count() as f64 / union as f64
        }
    }
}

/// Normalized texts of up to `window` lines on each side of line `index`
pub fn context_lines(lines: &[LineRecord], index: usize, window: usize) -> Vec<&str> {
    let pos = index.saturating_sub(1);
    let start = pos.saturating_sub(window);
    let end = (pos + 1 + window).min(lines.len());
    lines[start..end]
        .iter()
        .filter(|l| l.index != index)
        .map(|l| l.normalized_text.as_str())
        .collect()
}

/// Bag-of-words cosine similarity of two context windows
pub fn context_similarity(old_context: &[&str], new_context: &[&str]) -> f64 {
    let bag = |lines: &[&str]| {
        let mut counts: BTreeMap<String, f64> = BTreeMap::new();
        for line in lines {
            for token in tokens(line) {
                *counts.entry(token.to_string()).or_default() += 1.0;
            }
        }
        counts
    };
    let old_bag = bag(old_context);
    let new_bag = bag(new_context);

    match (old_bag.is_empty(), new_bag.is_empty()) {
        (true, true) => return 1.0,
        (true, false) | (false, true) => return 0.0,
        _ => {}
    }

    let dot: f64 = old_bag
        .iter()
        .filter_map(|(token, a)| new_bag.get(token).map(|b| a * b))
        .sum();
    let norm = |bag: &BTreeMap<String, f64>| bag.values().map(|v| v * v).sum::<f64>().sqrt();
    (dot / (norm(&old_bag) * norm(&new_bag))).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::{extract, NormalizeOptions};
    use crate::models::Side;

    #[test]
    fn test_levenshtein_edges() {
        let m = SimilarityMetric::Levenshtein;
        assert_eq!(content_similarity(m, "", ""), 1.0);
        assert_eq!(content_similarity(m, "", "x"), 0.0);
        assert_eq!(content_similarity(m, "abc", "abc"), 1.0);
        let s = content_similarity(m, "if (x > 0)", "if (x >= 0)");
        assert!(s > 0.85 && s < 1.0);
    }

    #[test]
    fn test_token_overlap() {
        let m = SimilarityMetric::TokenOverlap;
        assert_eq!(content_similarity(m, "a = b + c", "c + b = a"), 1.0);
        let s = content_similarity(m, "total = a + b", "total = a - b");
        assert!((s - 4.0 / 6.0).abs() < 1e-9);
    }

    #[test]
    fn test_tokens() {
        assert_eq!(tokens("x1 >= 3.5;"), vec!["x1", ">=", "3.5", ";"]);
    }

    #[test]
    fn test_metric_parsing() {
        assert_eq!(
            "token-overlap".parse::<SimilarityMetric>().unwrap(),
            SimilarityMetric::TokenOverlap
        );
        assert!("cosine".parse::<SimilarityMetric>().is_err());
    }

    #[test]
    fn test_context_window_excludes_line() {
        let lines = extract("a\nb\nc\nd\ne", Side::Old, &NormalizeOptions::default());
        assert_eq!(context_lines(&lines, 3, 1), vec!["b", "d"]);
        assert_eq!(context_lines(&lines, 1, 2), vec!["b", "c"]);
        assert_eq!(context_lines(&lines, 5, 2), vec!["c", "d"]);
    }

    #[test]
    fn test_context_similarity() {
        assert_eq!(context_similarity(&[], &[]), 1.0);
        assert_eq!(context_similarity(&["x"], &[]), 0.0);
        let s = context_similarity(&["let a = 1"], &["let a = 1"]);
        assert!((s - 1.0).abs() < 1e-9);
        assert_eq!(context_similarity(&["foo"], &["bar"]), 0.0);
    }
}
