//! Configuration module for lhdiff
//!
//! This module handles:
//! - Project-level configuration (lhdiff.toml)
//! - Matching and normalization overrides
//! - Custom bug rules
//! - CLI defaults

mod project_config;

pub use project_config::{
    load_config_file, load_project_config, BugRulesConfig, CliDefaults, MatchingConfig,
    ProjectConfig, CONFIG_FILES,
};
