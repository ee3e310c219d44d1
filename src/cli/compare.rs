//! Compare command - map lines between two versions of a file

use anyhow::{Context, Result};
use console::style;
use lhdiff::config::ProjectConfig;
use lhdiff::extract::read_lines;
use lhdiff::reporters::{report, PairReport};
use lhdiff::{compare, CompareConfig, Side};
use std::path::Path;

/// Flags that take precedence over the project config
#[derive(Debug, Default)]
pub struct Overrides {
    pub threshold: Option<f64>,
    pub candidates: Option<usize>,
    pub displacement: Option<usize>,
    pub keep_comments: bool,
}

/// Resolve the comparison config from the project file and CLI flags
pub fn resolve_config(project: &ProjectConfig, overrides: &Overrides) -> Result<CompareConfig> {
    let mut config = project
        .compare_config()
        .context("Invalid bug rules in configuration")?;
    if let Some(threshold) = overrides.threshold {
        config.similarity_threshold = threshold;
    }
    if let Some(candidates) = overrides.candidates {
        config.candidate_count = candidates;
    }
    if let Some(displacement) = overrides.displacement {
        config.displacement_threshold = displacement;
    }
    if overrides.keep_comments {
        config.normalize.strip_comments = false;
    }
    config.validate()?;
    Ok(config)
}

/// Run the compare command
pub fn run(
    old_path: &Path,
    new_path: &Path,
    project: &ProjectConfig,
    overrides: &Overrides,
    format: &str,
    output: Option<&Path>,
) -> Result<()> {
    let config = resolve_config(project, overrides)?;

    let old = read_lines(old_path, Side::Old, &config.normalize)?;
    let new = read_lines(new_path, Side::New, &config.normalize)?;
    let comparison = compare(&old, &new, &config);

    let case_name = format!("{} -> {}", old_path.display(), new_path.display());
    let rendered = report(&PairReport::new(&case_name, &old, &new, &comparison), format)?;

    match output {
        Some(path) => {
            std::fs::write(path, &rendered)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            let summary = comparison.summary();
            eprintln!(
                "{} {} mapped, {} deleted, {} inserted, {} bug fixes, {} bug introductions",
                style("✓").green(),
                summary.unchanged + summary.modified,
                summary.deleted,
                summary.inserted,
                summary.bug_fixes,
                summary.bug_introductions
            );
            eprintln!("Report written to {}", style(path.display()).cyan());
        }
        None => print!("{}", rendered),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overrides_take_precedence() {
        let project: ProjectConfig =
            toml::from_str("[matching]\nsimilarity_threshold = 0.8\ncandidate_count = 3\n").unwrap();
        let overrides = Overrides {
            threshold: Some(0.5),
            keep_comments: true,
            ..Default::default()
        };
        let config = resolve_config(&project, &overrides).unwrap();
        assert_eq!(config.similarity_threshold, 0.5);
        assert_eq!(config.candidate_count, 3);
        assert!(!config.normalize.strip_comments);
    }

    #[test]
    fn test_zero_candidates_rejected() {
        let overrides = Overrides {
            candidates: Some(0),
            ..Default::default()
        };
        assert!(resolve_config(&ProjectConfig::default(), &overrides).is_err());
    }
}
