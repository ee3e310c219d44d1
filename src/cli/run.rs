//! Run command - batch comparison of every version chain in a data folder

use anyhow::{Context, Result};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use lhdiff::config::ProjectConfig;
use lhdiff::discovery::{discover, pair_key, VersionChain, VersionFile};
use lhdiff::evaluate::{
    averages, predicted_pairs, score_mapping, write_csv, EvaluationRow, GroundTruth, RESULTS_CSV,
};
use lhdiff::extract::read_lines;
use lhdiff::history::{trace_origins, BugOrigin, PairAnalysis};
use lhdiff::reporters::{file_extension, report_with_format, OutputFormat, PairReport};
use lhdiff::{compare, CompareConfig, LineRecord, Side};
use rayon::prelude::*;
use std::path::Path;
use tracing::{info, warn};

/// One adjacent pair of a chain, ready to compare
struct Job<'c> {
    chain: usize,
    old: &'c VersionFile,
    new: &'c VersionFile,
}

/// A compared pair together with the lines the reporters need
struct PairRun {
    chain: usize,
    case: String,
    key: String,
    old: Vec<LineRecord>,
    new: Vec<LineRecord>,
    analysis: PairAnalysis,
}

fn create_bar_style() -> Result<ProgressStyle> {
    Ok(ProgressStyle::default_bar()
        .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
        .progress_chars("█▓▒░  "))
}

fn compare_job(chains: &[VersionChain], job: &Job<'_>, config: &CompareConfig) -> Result<PairRun> {
    let chain = &chains[job.chain];
    let old = read_lines(&job.old.path, Side::Old, &config.normalize)?;
    let new = read_lines(&job.new.path, Side::New, &config.normalize)?;
    let comparison = compare(&old, &new, config);
    Ok(PairRun {
        chain: job.chain,
        case: chain.case_name(job.old, job.new),
        key: pair_key(job.old, job.new),
        old,
        new,
        analysis: PairAnalysis {
            from: job.old.label(),
            to: job.new.label(),
            comparison,
        },
    })
}

/// Trace origins for chains whose every pair compared successfully
fn chain_origins(chains: &[VersionChain], runs: &[PairRun]) -> Vec<Vec<BugOrigin>> {
    chains
        .iter()
        .enumerate()
        .map(|(c, chain)| {
            let analyses: Vec<PairAnalysis> = runs
                .iter()
                .filter(|r| r.chain == c)
                .map(|r| r.analysis.clone())
                .collect();
            if analyses.len() + 1 != chain.versions.len() {
                warn!("Skipping origin tracing for '{}': not every pair compared", chain.name);
                return Vec::new();
            }
            trace_origins(&analyses)
        })
        .collect()
}

/// Run the batch command
pub fn run(
    data_dir: &Path,
    results_dir: &Path,
    ground_truth: Option<&Path>,
    project: &ProjectConfig,
) -> Result<()> {
    let config = project
        .compare_config()
        .context("Invalid bug rules in configuration")?;
    config.validate()?;

    let chains = discover(data_dir)?;
    if chains.is_empty() {
        println!(
            "{} No versioned files found in {}",
            style("!").yellow(),
            style(data_dir.display()).cyan()
        );
        return Ok(());
    }

    let truth = ground_truth.map(GroundTruth::load).transpose()?;

    let jobs: Vec<Job<'_>> = chains
        .iter()
        .enumerate()
        .flat_map(|(chain, c)| c.pairs().map(move |(old, new)| Job { chain, old, new }))
        .collect();
    println!(
        "\n{} Comparing {} version pairs across {} chains\n",
        style("▶").cyan().bold(),
        jobs.len(),
        chains.len()
    );

    let bar = ProgressBar::new(jobs.len() as u64);
    bar.set_style(create_bar_style()?);
    bar.set_message("Comparing versions...");

    let runs: Vec<PairRun> = jobs
        .par_iter()
        .filter_map(|job| {
            let result = compare_job(&chains, job, &config);
            bar.inc(1);
            match result {
                Ok(run) => Some(run),
                Err(e) => {
                    warn!(
                        "Failed to compare {} -> {}: {:#}",
                        job.old.path.display(),
                        job.new.path.display(),
                        e
                    );
                    None
                }
            }
        })
        .collect();
    bar.finish_and_clear();

    let origins = chain_origins(&chains, &runs);

    std::fs::create_dir_all(results_dir)
        .with_context(|| format!("Failed to create {}", results_dir.display()))?;

    let mut rows = Vec::new();
    for run in &runs {
        let fixed_here: Vec<BugOrigin> = origins[run.chain]
            .iter()
            .filter(|o| o.fixed_in == run.analysis.to)
            .cloned()
            .collect();
        let report = PairReport::new(&run.case, &run.old, &run.new, &run.analysis.comparison)
            .with_origins(&fixed_here);
        let path = results_dir.join(format!(
            "{}_results.{}",
            run.case,
            file_extension(OutputFormat::Text)
        ));
        std::fs::write(&path, report_with_format(&report, OutputFormat::Text)?)
            .with_context(|| format!("Failed to write {}", path.display()))?;

        let summary = run.analysis.comparison.summary();
        println!(
            "  {} {:<32} {} mapped, {} deleted, {} inserted, {} fixes, {} introductions",
            style("✓").green(),
            run.case,
            summary.unchanged + summary.modified,
            summary.deleted,
            summary.inserted,
            summary.bug_fixes,
            summary.bug_introductions
        );

        if let Some(truth) = &truth {
            let chain = &chains[run.chain];
            match truth.pairs(&chain.name, &run.key) {
                Some(expected) => rows.push(EvaluationRow {
                    dataset: run.case.clone(),
                    scores: score_mapping(&predicted_pairs(&run.analysis.comparison), expected),
                }),
                None => warn!("No ground truth for {} {}", chain.name, run.key),
            }
        }
    }

    if truth.is_some() {
        let csv_path = results_dir.join(RESULTS_CSV);
        write_csv(&csv_path, &rows)?;
        print_evaluation(&rows);
        println!("\nEvaluation written to {}", style(csv_path.display()).cyan());
    }

    info!("Processed {} of {} version pairs", runs.len(), jobs.len());
    println!(
        "\n{} {} version pairs processed, results in {}",
        style("✨").bold(),
        runs.len(),
        style(results_dir.display()).cyan()
    );
    Ok(())
}

fn print_evaluation(rows: &[EvaluationRow]) {
    println!("\n{}", style("EVALUATION").bold());
    for row in rows {
        println!(
            "  {:<32} P={:.3} R={:.3} F1={:.3}",
            row.dataset, row.scores.precision, row.scores.recall, row.scores.f1
        );
    }
    match averages(rows) {
        Some(avg) => println!(
            "  {:<32} P={:.3} R={:.3} F1={:.3}",
            "average",
            avg.precision,
            avg.recall,
            avg.f1
        ),
        None => println!("  No pairs with ground truth"),
    }
}
