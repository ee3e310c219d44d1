//! Init command - write an example lhdiff.toml

use anyhow::{Context, Result};
use console::style;
use std::path::Path;

/// Example configuration written by `lhdiff init`
pub const EXAMPLE_CONFIG: &str = r#"# lhdiff configuration

[matching]
# Candidates retrieved per line and direction
candidate_count = 8
# Minimum similarity for two lines to be mapped (0-1)
similarity_threshold = 0.6
# Mapped lines displaced by more than this are reported as moved
displacement_threshold = 0
# levenshtein or token_overlap
metric = "levenshtein"
# Weight of surrounding-line similarity (0 disables it)
context_weight = 0.0

[normalize]
strip_comments = true
strip_punctuation = false
lowercase = false

[bug_rules]
# Start from the built-in rule table (false replaces it with the rules below)
builtin = true
# Lines either side of a modified line the rules may inspect
context_window = 2

# [[bug_rules.rules]]
# name = "retry-added"
# label = "bug_fix"
# weight = 0.3
# kind = "added"
# pattern = '(?i)\bretry\b'

[defaults]
# format = "text"
# workers = 8
# results_dir = "results"
# ground_truth = "ground_truth.json"
"#;

/// Run the init command
pub fn run(path: &Path, force: bool) -> Result<()> {
    if !path.is_dir() {
        anyhow::bail!("Path is not a directory: {}", path.display());
    }

    let config_path = path.join("lhdiff.toml");
    if config_path.exists() && !force {
        println!(
            "{} {} already exists (use --force to overwrite)",
            style("!").yellow(),
            style(config_path.display()).cyan()
        );
        return Ok(());
    }

    std::fs::write(&config_path, EXAMPLE_CONFIG)
        .with_context(|| format!("Failed to write {}", config_path.display()))?;
    println!(
        "{} Created {}",
        style("✓").green(),
        style(config_path.display()).cyan()
    );
    println!("\nNext steps:");
    println!("  {} Compare two versions", style("lhdiff compare old new").cyan());
    println!("  {} Inspect the bug rules", style("lhdiff rules").cyan());

    Ok(())
}
