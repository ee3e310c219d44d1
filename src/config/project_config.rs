//! Project-level configuration support
//!
//! Loads per-project configuration from `lhdiff.toml` or `.lhdiffrc.json`
//! in the working directory.
//!
//! # Configuration Format
//!
//! ```toml
//! # lhdiff.toml
//!
//! [matching]
//! candidate_count = 8
//! similarity_threshold = 0.6
//! displacement_threshold = 0
//! metric = "levenshtein"   # or "token_overlap"
//! context_weight = 0.0
//!
//! [normalize]
//! strip_comments = true
//!
//! [bug_rules]
//! builtin = true           # start from the built-in table
//! context_window = 2
//!
//! [[bug_rules.rules]]
//! name = "retry-added"
//! label = "bug_fix"
//! weight = 0.3
//! kind = "added"
//! pattern = '(?i)\bretry\b'
//! ```

use crate::bugs::{RuleError, RuleSpec, RuleTable, BUILTIN_VERSION};
use crate::extract::NormalizeOptions;
use crate::fingerprint::DEFAULT_SCAN_LIMIT;
use crate::matcher::{
    SimilarityMetric, DEFAULT_CANDIDATE_COUNT, DEFAULT_CONTEXT_WINDOW,
    DEFAULT_SIMILARITY_THRESHOLD,
};
use crate::pipeline::CompareConfig;
use anyhow::Context;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// File names searched, in order
pub const CONFIG_FILES: [&str; 2] = ["lhdiff.toml", ".lhdiffrc.json"];

/// Project-level configuration loaded from lhdiff.toml or .lhdiffrc.json
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ProjectConfig {
    /// Candidate retrieval and mapping parameters
    #[serde(default)]
    pub matching: MatchingConfig,

    /// Line normalization
    #[serde(default)]
    pub normalize: NormalizeOptions,

    /// Bug rule table selection and extra rules
    #[serde(default)]
    pub bug_rules: BugRulesConfig,

    /// Default CLI flags
    #[serde(default)]
    pub defaults: CliDefaults,
}

/// `[matching]` section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MatchingConfig {
    pub candidate_count: usize,
    pub similarity_threshold: f64,
    pub displacement_threshold: usize,
    pub metric: SimilarityMetric,
    pub context_weight: f64,
    pub context_window: usize,
    pub scan_limit: usize,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            candidate_count: DEFAULT_CANDIDATE_COUNT,
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
            displacement_threshold: 0,
            metric: SimilarityMetric::default(),
            context_weight: 0.0,
            context_window: DEFAULT_CONTEXT_WINDOW,
            scan_limit: DEFAULT_SCAN_LIMIT,
        }
    }
}

/// `[bug_rules]` section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BugRulesConfig {
    /// Start from the built-in table (false replaces it with `rules`)
    pub builtin: bool,
    /// Raw lines either side of a modified line the rules may inspect
    pub context_window: usize,
    pub rules: Vec<RuleSpec>,
}

impl Default for BugRulesConfig {
    fn default() -> Self {
        Self {
            builtin: true,
            context_window: DEFAULT_CONTEXT_WINDOW,
            rules: Vec::new(),
        }
    }
}

/// Default CLI flags (`[defaults]` section)
#[derive(Debug, Clone, Deserialize, Default)]
pub struct CliDefaults {
    /// Default output format (text, json, web)
    #[serde(default)]
    pub format: Option<String>,

    /// Default number of workers
    #[serde(default)]
    pub workers: Option<usize>,

    /// Directory for batch results
    #[serde(default)]
    pub results_dir: Option<PathBuf>,

    /// Ground truth file for batch evaluation
    #[serde(default)]
    pub ground_truth: Option<PathBuf>,
}

impl ProjectConfig {
    /// Compile the configured rule table
    pub fn rule_table(&self) -> Result<RuleTable, RuleError> {
        let rules = &self.bug_rules;
        if !rules.builtin {
            return RuleTable::from_specs("project", &rules.rules);
        }
        let mut table = RuleTable::builtin();
        if !rules.rules.is_empty() {
            table.extend(format!("{}+project", BUILTIN_VERSION), &rules.rules)?;
        }
        Ok(table)
    }

    /// Build the comparison configuration described by this file
    pub fn compare_config(&self) -> Result<CompareConfig, RuleError> {
        let m = &self.matching;
        Ok(CompareConfig {
            candidate_count: m.candidate_count,
            similarity_threshold: m.similarity_threshold,
            displacement_threshold: m.displacement_threshold,
            metric: m.metric,
            context_weight: m.context_weight,
            context_window: m.context_window,
            scan_limit: m.scan_limit,
            normalize: self.normalize.clone(),
            rules: self.rule_table()?,
            bug_context_window: self.bug_rules.context_window,
        })
    }
}

/// Load project configuration from a directory
///
/// Searches for configuration files in this order:
/// 1. `lhdiff.toml`
/// 2. `.lhdiffrc.json`
///
/// Returns default configuration if no config file is found or loads.
pub fn load_project_config(dir: &Path) -> ProjectConfig {
    for name in CONFIG_FILES {
        let path = dir.join(name);
        if !path.exists() {
            continue;
        }
        match load_config_file(&path) {
            Ok(config) => {
                debug!("Loaded project config from {}", path.display());
                return config;
            }
            Err(e) => {
                warn!("Failed to load {}: {:#}", path.display(), e);
            }
        }
    }

    debug!("No project config found, using defaults");
    ProjectConfig::default()
}

/// Load one configuration file, picking the format from its extension
pub fn load_config_file(path: &Path) -> anyhow::Result<ProjectConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let config = if path.extension().is_some_and(|ext| ext == "json") {
        serde_json::from_str(&content)?
    } else {
        toml::from_str(&content)?
    };
    Ok(config)
}

#[cfg(test)]
mod tests;
