//! History command - trace where the bugs fixed along a chain came from

use anyhow::{bail, Context, Result};
use console::style;
use lhdiff::config::ProjectConfig;
use lhdiff::discovery::discover;
use lhdiff::history::{analyze_chain, ChainAnalysis, Version};
use std::path::Path;

/// Run the history command
pub fn run(data_dir: &Path, name: &str, format: &str, project: &ProjectConfig) -> Result<()> {
    let config = project
        .compare_config()
        .context("Invalid bug rules in configuration")?;
    config.validate()?;

    let chains = discover(data_dir)?;
    let Some(chain) = chains.iter().find(|c| c.name == name) else {
        bail!(
            "No version chain named '{}' in {} (need at least two files like {}_v1.ext)",
            name,
            data_dir.display(),
            name
        );
    };

    let versions = chain
        .versions
        .iter()
        .map(|v| Version::read(v.label(), &v.path))
        .collect::<Result<Vec<_>, _>>()?;
    let analysis = analyze_chain(&versions, &config);

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&analysis)?),
        _ => print_text(name, &analysis),
    }
    Ok(())
}

fn print_text(name: &str, analysis: &ChainAnalysis) {
    println!("\n{} {}\n", style("History of").bold(), style(name).cyan().bold());

    for pair in &analysis.pairs {
        let summary = pair.comparison.summary();
        println!(
            "  {} -> {}  {} modified, {} inserted, {} deleted, {} fixes, {} introductions",
            pair.from,
            pair.to,
            summary.modified,
            summary.inserted,
            summary.deleted,
            summary.bug_fixes,
            summary.bug_introductions
        );
    }

    println!("\n{}", style("BUG ORIGINS").bold());
    if analysis.origins.is_empty() {
        println!("  No bug fixes found");
        return;
    }
    for origin in &analysis.origins {
        let marker = if origin.exact {
            style("exact").green()
        } else {
            style("baseline").yellow()
        };
        println!(
            "  Fixed in {} line {} (was line {}) <- introduced in {} line {} [{}, {:.2}]",
            origin.fixed_in,
            origin.fixed_line,
            origin.buggy_line,
            origin.introduced_in,
            origin.introduced_line,
            marker,
            origin.confidence
        );
        println!("    {}", style(origin.evidence.join(", ")).dim());
    }
}
