use super::*;
use crate::models::BugKind;
use std::fs;
use tempfile::tempdir;

#[test]
fn test_defaults_match_compare_config() {
    let config = ProjectConfig::default().compare_config().unwrap();
    let reference = CompareConfig::default();
    assert_eq!(config.candidate_count, reference.candidate_count);
    assert_eq!(config.similarity_threshold, reference.similarity_threshold);
    assert_eq!(config.displacement_threshold, reference.displacement_threshold);
    assert_eq!(config.normalize, reference.normalize);
    assert_eq!(config.rules.version(), BUILTIN_VERSION);
    assert_eq!(config.bug_context_window, 2);
}

#[test]
fn test_parse_full_toml() {
    let config: ProjectConfig = toml::from_str(
        r#"
        [matching]
        candidate_count = 12
        similarity_threshold = 0.7
        displacement_threshold = 3
        metric = "token_overlap"
        context_weight = 0.25

        [normalize]
        strip_comments = false
        lowercase = true

        [bug_rules]
        context_window = 1

        [[bug_rules.rules]]
        name = "retry-added"
        label = "bug_fix"
        weight = 0.3
        kind = "added"
        pattern = '(?i)\bretry\b'

        [defaults]
        format = "json"
        workers = 4
        "#,
    )
    .unwrap();

    assert_eq!(config.matching.candidate_count, 12);
    assert_eq!(config.matching.metric, SimilarityMetric::TokenOverlap);
    assert!(!config.normalize.strip_comments);
    assert!(config.normalize.lowercase);
    assert!(!config.normalize.strip_punctuation);
    assert_eq!(config.defaults.format.as_deref(), Some("json"));

    let compare = config.compare_config().unwrap();
    assert_eq!(compare.displacement_threshold, 3);
    assert_eq!(compare.bug_context_window, 1);
    assert_eq!(compare.rules.version(), "builtin-1+project");
    let last = compare.rules.rules().last().unwrap();
    assert_eq!(last.name(), "retry-added");
    assert_eq!(last.label(), BugKind::BugFix);
}

#[test]
fn test_replace_builtin_rules() {
    let config: ProjectConfig = toml::from_str(
        r#"
        [bug_rules]
        builtin = false

        [[bug_rules.rules]]
        name = "panic-added"
        label = "bug_introduction"
        weight = 0.5
        kind = "added"
        pattern = 'panic!'
        "#,
    )
    .unwrap();
    let table = config.rule_table().unwrap();
    assert_eq!(table.version(), "project");
    assert_eq!(table.len(), 1);
}

#[test]
fn test_invalid_rule_surfaces_error() {
    let config: ProjectConfig = toml::from_str(
        r#"
        [[bug_rules.rules]]
        name = "broken"
        label = "bug_fix"
        weight = 0.3
        kind = "removed"
        pattern = '(['
        "#,
    )
    .unwrap();
    assert!(matches!(
        config.compare_config(),
        Err(RuleError::InvalidPattern { .. })
    ));
}

#[test]
fn test_load_prefers_toml() {
    let dir = tempdir().unwrap();
    fs::write(
        dir.path().join("lhdiff.toml"),
        "[matching]\nsimilarity_threshold = 0.8\n",
    )
    .unwrap();
    fs::write(
        dir.path().join(".lhdiffrc.json"),
        r#"{"matching": {"similarity_threshold": 0.9}}"#,
    )
    .unwrap();
    let config = load_project_config(dir.path());
    assert_eq!(config.matching.similarity_threshold, 0.8);
}

#[test]
fn test_load_json_fallback() {
    let dir = tempdir().unwrap();
    fs::write(
        dir.path().join(".lhdiffrc.json"),
        r#"{"matching": {"candidate_count": 3}, "bug_rules": {"builtin": false}}"#,
    )
    .unwrap();
    let config = load_project_config(dir.path());
    assert_eq!(config.matching.candidate_count, 3);
    assert!(config.rule_table().unwrap().is_empty());
}

#[test]
fn test_malformed_file_falls_back_to_defaults() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("lhdiff.toml"), "[matching\nbroken").unwrap();
    let config = load_project_config(dir.path());
    assert_eq!(config.matching.candidate_count, DEFAULT_CANDIDATE_COUNT);
}

#[test]
fn test_missing_explicit_file_is_error() {
    assert!(load_config_file(Path::new("/nonexistent/lhdiff.toml")).is_err());
}
