//! CLI command definitions and handlers

mod compare;
mod history;
mod init;
mod rules;
mod run;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use lhdiff::config::{load_config_file, load_project_config, ProjectConfig};
use std::path::{Path, PathBuf};

const DEFAULT_WORKERS: usize = 8;

/// Parse and validate workers count (1-64)
fn parse_workers(s: &str) -> Result<usize, String> {
    let n: usize = s
        .parse()
        .map_err(|_| format!("'{}' is not a valid number", s))?;
    if n == 0 {
        Err("workers must be at least 1".to_string())
    } else if n > 64 {
        Err("workers cannot exceed 64".to_string())
    } else {
        Ok(n)
    }
}

/// Parse a similarity threshold in [0, 1]
fn parse_threshold(s: &str) -> Result<f64, String> {
    let t: f64 = s
        .parse()
        .map_err(|_| format!("'{}' is not a valid number", s))?;
    if (0.0..=1.0).contains(&t) {
        Ok(t)
    } else {
        Err("threshold must be between 0 and 1".to_string())
    }
}

/// lhdiff - Track lines across file versions and spot bug fixes
#[derive(Parser, Debug)]
#[command(name = "lhdiff")]
#[command(
    version,
    about = "Track source lines across file versions and classify bug fixes and bug introductions",
    long_about = "lhdiff maps every line of an old file version to its counterpart in a new \
version (or marks it deleted/inserted) using SimHash fingerprints, candidate retrieval \
and content similarity. Modified lines are then scored against a table of bug-fix and \
bug-introduction rules.",
    after_help = "\
Examples:
  lhdiff compare old.py new.py                 Map lines between two versions
  lhdiff compare old.py new.py --format json   JSON output for scripting
  lhdiff run data --ground-truth truth.json    Batch run and evaluate a data folder
  lhdiff history data calc                     Trace where fixed bugs were introduced
  lhdiff rules                                 Show the active bug rule table"
)]
pub struct Cli {
    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "info", value_parser = ["error", "warn", "info", "debug", "trace"])]
    pub log_level: String,

    /// Number of parallel workers (1-64, default: 8)
    #[arg(long, global = true, value_parser = parse_workers)]
    pub workers: Option<usize>,

    /// Configuration file (default: lhdiff.toml or .lhdiffrc.json in the current directory)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Compare two versions of a file
    #[command(after_help = "\
Examples:
  lhdiff compare old.c new.c                         Text report on stdout
  lhdiff compare old.c new.c --format web -o d.json  Side-by-side JSON for the viewer
  lhdiff compare old.c new.c --threshold 0.7         Stricter matching")]
    Compare {
        /// Old version
        old: PathBuf,

        /// New version
        new: PathBuf,

        /// Output format: text, json, web
        #[arg(long, short = 'f', value_parser = ["text", "json", "web"])]
        format: Option<String>,

        /// Output file path (default: stdout)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,

        /// Minimum similarity for a pair of lines to be mapped
        #[arg(long, value_parser = parse_threshold)]
        threshold: Option<f64>,

        /// Candidates considered per line
        #[arg(long)]
        candidates: Option<usize>,

        /// Displacement above which a mapped line counts as moved
        #[arg(long)]
        displacement: Option<usize>,

        /// Keep comments when normalizing lines
        #[arg(long)]
        keep_comments: bool,
    },

    /// Compare every adjacent version pair in a data folder
    ///
    /// Files are grouped into chains by name (`calc_v1.py`, `calc_v2.py`, ...).
    #[command(after_help = "\
Examples:
  lhdiff run                                         Use ./data, write ./results
  lhdiff run data --results out                      Custom results directory
  lhdiff run data --ground-truth truth.json          Also write evaluation_results.csv")]
    Run {
        /// Folder holding versioned files
        #[arg(default_value = "data")]
        data_dir: PathBuf,

        /// Directory for per-pair reports
        #[arg(long)]
        results: Option<PathBuf>,

        /// Ground truth JSON for evaluation
        #[arg(long)]
        ground_truth: Option<PathBuf>,
    },

    /// Trace where the bugs fixed along one version chain were introduced
    History {
        /// Folder holding versioned files
        data_dir: PathBuf,

        /// Chain name (e.g. `calc` for calc_v1.py, calc_v2.py)
        name: String,

        /// Output format: text, json
        #[arg(long, short = 'f', default_value = "text", value_parser = ["text", "json"])]
        format: String,
    },

    /// Show the active bug rule table
    Rules {
        /// Output format: text, json
        #[arg(long, short = 'f', default_value = "text", value_parser = ["text", "json"])]
        format: String,
    },

    /// Write an example lhdiff.toml
    Init {
        /// Directory to write into
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

/// Load the explicit config file, or the project config of the current directory
fn load_config(explicit: Option<&Path>) -> Result<ProjectConfig> {
    match explicit {
        Some(path) => load_config_file(path)
            .with_context(|| format!("Failed to load config {}", path.display())),
        None => Ok(load_project_config(Path::new("."))),
    }
}

/// Build a rayon pool of the requested size
fn thread_pool(workers: usize) -> Result<rayon::ThreadPool> {
    rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .build()
        .context("Failed to build worker pool")
}

/// Run the CLI with parsed arguments
pub fn run(cli: Cli) -> Result<()> {
    let config = load_config(cli.config.as_deref())?;
    let workers = cli
        .workers
        .or(config.defaults.workers)
        .unwrap_or(DEFAULT_WORKERS);
    let pool = thread_pool(workers)?;

    match cli.command {
        Commands::Compare {
            old,
            new,
            format,
            output,
            threshold,
            candidates,
            displacement,
            keep_comments,
        } => {
            let overrides = compare::Overrides {
                threshold,
                candidates,
                displacement,
                keep_comments,
            };
            let format = format
                .or_else(|| config.defaults.format.clone())
                .unwrap_or_else(|| "text".to_string());
            pool.install(|| {
                compare::run(&old, &new, &config, &overrides, &format, output.as_deref())
            })
        }

        Commands::Run {
            data_dir,
            results,
            ground_truth,
        } => {
            let results = results
                .or_else(|| config.defaults.results_dir.clone())
                .unwrap_or_else(|| PathBuf::from("results"));
            let ground_truth = ground_truth.or_else(|| config.defaults.ground_truth.clone());
            pool.install(|| run::run(&data_dir, &results, ground_truth.as_deref(), &config))
        }

        Commands::History {
            data_dir,
            name,
            format,
        } => pool.install(|| history::run(&data_dir, &name, &format, &config)),

        Commands::Rules { format } => rules::run(&config, &format),

        Commands::Init { path, force } => init::run(&path, force),
    }
}
