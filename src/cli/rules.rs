//! Rules command - show the active bug rule table

use anyhow::{Context, Result};
use console::style;
use lhdiff::bugs::{RuleSpec, RuleTable};
use lhdiff::config::ProjectConfig;
use lhdiff::BugKind;
use serde::Serialize;

#[derive(Serialize)]
struct RulesJson<'a> {
    version: &'a str,
    rules: Vec<RuleSpec>,
}

/// Run the rules command
pub fn run(project: &ProjectConfig, format: &str) -> Result<()> {
    let table = project
        .rule_table()
        .context("Invalid bug rules in configuration")?;

    match format {
        "json" => {
            let json = RulesJson {
                version: table.version(),
                rules: table.specs(),
            };
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
        _ => print_text(&table),
    }
    Ok(())
}

fn print_text(table: &RuleTable) {
    println!(
        "\n{} {} ({} rules)\n",
        style("Rule table").bold(),
        style(table.version()).cyan(),
        table.len()
    );
    for rule in table.rules() {
        let label = match rule.label() {
            BugKind::BugFix => style("fix   ").green(),
            BugKind::BugIntroduction => style("intro ").red(),
            BugKind::None => style("none  ").dim(),
        };
        println!(
            "  {:<28} {} {:>5.2}  {}",
            rule.name(),
            label,
            rule.weight(),
            rule.spec().predicate.kind()
        );
    }
}
