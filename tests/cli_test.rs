//! CLI contract tests
//!
//! Drives the `lhdiff` binary on temporary files and checks the output of
//! every subcommand.

use std::path::Path;
use std::process::{Command, Output};

const V1: &str = "a = 1\nvalue = items[i];\n";
const V2: &str = "header()\na = 1\nvalue = items[i];\n";
const V3: &str = "header()\na = 1\nvalue = items[i] ?? 0;\n";

fn lhdiff_bin() -> &'static str {
    env!("CARGO_BIN_EXE_lhdiff")
}

fn run_lhdiff(dir: &Path, args: &[&str]) -> Output {
    Command::new(lhdiff_bin())
        .args(["--log-level", "warn"])
        .args(args)
        .current_dir(dir)
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to run lhdiff")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

/// A data folder holding one three-version chain
fn setup_data_dir() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    let data = dir.path().join("data");
    std::fs::create_dir(&data).unwrap();
    std::fs::write(data.join("calc_v1.py"), V1).unwrap();
    std::fs::write(data.join("calc_v2.py"), V2).unwrap();
    std::fs::write(data.join("calc_v3.py"), V3).unwrap();
    std::fs::write(data.join("notes.txt"), "not versioned\n").unwrap();
    dir
}

// ============================================================================
// compare
// ============================================================================

#[test]
fn test_compare_text_report() {
    let dir = setup_data_dir();
    let output = run_lhdiff(dir.path(), &["compare", "data/calc_v2.py", "data/calc_v3.py"]);
    assert!(output.status.success());

    let out = stdout(&output);
    assert!(out.starts_with("RESULTS FOR: data/calc_v2.py -> data/calc_v3.py"));
    assert!(out.contains("[1] -> [1]\n[2] -> [2]\n[3] -> [3]\n"));
    assert!(out.contains("FIX #1:"));
    assert!(out.contains("default-value-added"));
    assert!(out.contains("Total bug fixes: 1"));
}

#[test]
fn test_compare_json_stdout_clean() {
    let dir = setup_data_dir();
    let output = run_lhdiff(
        dir.path(),
        &["compare", "data/calc_v1.py", "data/calc_v2.py", "--format", "json"],
    );
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_str(&stdout(&output)).expect("Invalid JSON");
    assert_eq!(json["rule_table_version"], "builtin-1");
    assert_eq!(json["summary"]["unchanged"], 2);
    assert_eq!(json["summary"]["inserted"], 1);
    assert_eq!(json["records"].as_array().unwrap().len(), 3);
}

#[test]
fn test_compare_web_output_file() {
    let dir = setup_data_dir();
    let output = run_lhdiff(
        dir.path(),
        &[
            "compare",
            "data/calc_v1.py",
            "data/calc_v2.py",
            "--format",
            "web",
            "-o",
            "diff.json",
        ],
    );
    assert!(output.status.success());
    assert!(stdout(&output).is_empty());

    let written = std::fs::read_to_string(dir.path().join("diff.json")).unwrap();
    let json: serde_json::Value = serde_json::from_str(&written).unwrap();
    assert_eq!(json["old"].as_array().unwrap().len(), 2);
    assert_eq!(json["new"][0]["status"], "inserted");
    assert_eq!(json["new"][0]["content"], "header()");
    assert_eq!(json["new"][2]["status"], "unchanged");
}

#[test]
fn test_compare_rejects_bad_threshold() {
    let dir = setup_data_dir();
    let output = run_lhdiff(
        dir.path(),
        &["compare", "data/calc_v1.py", "data/calc_v2.py", "--threshold", "2"],
    );
    assert!(!output.status.success());
}

#[test]
fn test_compare_reports_undecodable_input() {
    let dir = setup_data_dir();
    std::fs::write(dir.path().join("bad.txt"), b"ok\n\xff\xfe\n").unwrap();
    let output = run_lhdiff(dir.path(), &["compare", "bad.txt", "data/calc_v1.py"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("line 2"), "stderr: {}", stderr);
}

#[test]
fn test_compare_missing_file_fails() {
    let dir = setup_data_dir();
    let output = run_lhdiff(dir.path(), &["compare", "missing.py", "data/calc_v1.py"]);
    assert!(!output.status.success());
}

// ============================================================================
// run
// ============================================================================

#[test]
fn test_run_writes_reports_and_evaluation() {
    let dir = setup_data_dir();
    std::fs::write(
        dir.path().join("truth.json"),
        r#"{"calc": {"lhdiff": {"v1-v2": [[1, 2], [2, 3]], "v2-v3": [[1, 1], [2, 2], [3, 3]]}}}"#,
    )
    .unwrap();

    let output = run_lhdiff(
        dir.path(),
        &[
            "--workers",
            "2",
            "run",
            "data",
            "--results",
            "out",
            "--ground-truth",
            "truth.json",
        ],
    );
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let results = dir.path().join("out");
    let first = std::fs::read_to_string(results.join("calc_v1_to_v2_results.txt")).unwrap();
    assert!(first.starts_with("RESULTS FOR: calc_v1_to_v2"));
    assert!(first.contains("Inserted lines:\n  New 1\n"));

    let second = std::fs::read_to_string(results.join("calc_v2_to_v3_results.txt")).unwrap();
    assert!(second.contains("FIX #1:"));
    assert!(second.contains("  Introduced In: v1 (line 2)"));

    let csv = std::fs::read_to_string(results.join("evaluation_results.csv")).unwrap();
    assert_eq!(
        csv,
        "Dataset,Precision,Recall,F1\ncalc_v1_to_v2,1,1,1\ncalc_v2_to_v3,1,1,1\n"
    );
}

#[test]
fn test_run_without_ground_truth_skips_csv() {
    let dir = setup_data_dir();
    let output = run_lhdiff(dir.path(), &["run", "data", "--results", "out"]);
    assert!(output.status.success());
    assert!(dir.path().join("out/calc_v1_to_v2_results.txt").exists());
    assert!(!dir.path().join("out/evaluation_results.csv").exists());
}

#[test]
fn test_run_empty_folder() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir(dir.path().join("data")).unwrap();
    let output = run_lhdiff(dir.path(), &["run"]);
    assert!(output.status.success());
    assert!(stdout(&output).contains("No versioned files found"));
}

// ============================================================================
// history, rules, init, config
// ============================================================================

#[test]
fn test_history_json_origins() {
    let dir = setup_data_dir();
    let output = run_lhdiff(dir.path(), &["history", "data", "calc", "--format", "json"]);
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(json["pairs"].as_array().unwrap().len(), 2);
    let origin = &json["origins"][0];
    assert_eq!(origin["fixed_in"], "v3");
    assert_eq!(origin["introduced_in"], "v1");
    assert_eq!(origin["introduced_line"], 2);
    assert_eq!(origin["exact"], false);
}

#[test]
fn test_history_unknown_chain_fails() {
    let dir = setup_data_dir();
    let output = run_lhdiff(dir.path(), &["history", "data", "nope"]);
    assert!(!output.status.success());
}

#[test]
fn test_rules_json_lists_builtin_table() {
    let dir = tempfile::tempdir().unwrap();
    let output = run_lhdiff(dir.path(), &["rules", "--format", "json"]);
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(json["version"], "builtin-1");
    let rules = json["rules"].as_array().unwrap();
    assert_eq!(rules.len(), 20);
    assert_eq!(rules[0]["name"], "null-check-added");
    assert!(rules[0]["kind"].is_string());
}

#[test]
fn test_project_config_replaces_rules() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("lhdiff.toml"),
        r#"
[bug_rules]
builtin = false

[[bug_rules.rules]]
name = "retry-added"
label = "bug_fix"
weight = 0.3
kind = "added"
pattern = '(?i)\bretry\b'
"#,
    )
    .unwrap();

    let output = run_lhdiff(dir.path(), &["rules", "--format", "json"]);
    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(json["version"], "project");
    assert_eq!(json["rules"].as_array().unwrap().len(), 1);
}

#[test]
fn test_explicit_missing_config_fails() {
    let dir = tempfile::tempdir().unwrap();
    let output = run_lhdiff(dir.path(), &["--config", "nope.toml", "rules"]);
    assert!(!output.status.success());
}

#[test]
fn test_init_writes_loadable_config() {
    let dir = tempfile::tempdir().unwrap();
    let output = run_lhdiff(dir.path(), &["init"]);
    assert!(output.status.success());
    assert!(dir.path().join("lhdiff.toml").exists());

    let output = run_lhdiff(dir.path(), &["rules", "--format", "json"]);
    let json: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(json["version"], "builtin-1");
}
