//! Bug evidence rules
//!
//! A rule pairs a predicate over one modified line (and its neighbours)
//! with the label it votes for and a weight. Predicates are declared as
//! data so project configuration can add rules in TOML; they are compiled
//! once, up front, and invalid patterns never reach classification.

use super::ChangeContext;
use crate::models::BugKind;
use regex::Regex;
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Version tag of the built-in rule table
pub const BUILTIN_VERSION: &str = "builtin-1";

/// Errors raised while compiling a rule table
#[derive(Error, Debug)]
pub enum RuleError {
    #[error("rule '{name}' has an invalid pattern: {source}")]
    InvalidPattern {
        name: String,
        #[source]
        source: regex::Error,
    },

    #[error("rule '{name}' needs a positive finite weight, got {weight}")]
    InvalidWeight { name: String, weight: f64 },

    #[error("rule '{0}' must be labelled bug_fix or bug_introduction")]
    InvalidLabel(String),

    #[error("duplicate rule name '{0}'")]
    DuplicateName(String),

    #[error("rule names must not be empty")]
    EmptyName,
}

/// Declarative form of a predicate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PredicateSpec {
    /// Matches the new line and not the old line
    Added { pattern: String },
    /// Matches the old line and not the new line
    Removed { pattern: String },
    /// Old matches `from`, new matches `to`, old does not match `to`
    Rewrite { from: String, to: String },
    /// Matches some new-context line and no old-context line
    ContextAdded { pattern: String },
    /// Matches some old-context line and no new-context line
    ContextRemoved { pattern: String },
}

impl PredicateSpec {
    pub fn kind(&self) -> &'static str {
        match self {
            PredicateSpec::Added { .. } => "added",
            PredicateSpec::Removed { .. } => "removed",
            PredicateSpec::Rewrite { .. } => "rewrite",
            PredicateSpec::ContextAdded { .. } => "context_added",
            PredicateSpec::ContextRemoved { .. } => "context_removed",
        }
    }
}

/// Declarative form of a rule, as written in `lhdiff.toml`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleSpec {
    pub name: String,
    pub label: BugKind,
    pub weight: f64,
    #[serde(flatten)]
    pub predicate: PredicateSpec,
}

#[derive(Debug, Clone)]
enum Predicate {
    Added(Regex),
    Removed(Regex),
    Rewrite { from: Regex, to: Regex },
    ContextAdded(Regex),
    ContextRemoved(Regex),
}

fn any_match(re: &Regex, lines: &[&str]) -> bool {
    lines.iter().any(|line| re.is_match(line))
}

impl Predicate {
    fn holds(&self, change: &ChangeContext<'_>) -> bool {
        match self {
            Predicate::Added(re) => re.is_match(change.new_line) && !re.is_match(change.old_line),
            Predicate::Removed(re) => {
                re.is_match(change.old_line) && !re.is_match(change.new_line)
            }
            Predicate::Rewrite { from, to } => {
                from.is_match(change.old_line)
                    && to.is_match(change.new_line)
                    && !to.is_match(change.old_line)
            }
            Predicate::ContextAdded(re) => {
                any_match(re, &change.new_context) && !any_match(re, &change.old_context)
            }
            Predicate::ContextRemoved(re) => {
                any_match(re, &change.old_context) && !any_match(re, &change.new_context)
            }
        }
    }
}

/// A compiled rule
#[derive(Debug, Clone)]
pub struct Rule {
    spec: RuleSpec,
    predicate: Predicate,
}

impl Rule {
    /// Validate and compile a rule declaration
    pub fn compile(spec: &RuleSpec) -> Result<Self, RuleError> {
        if spec.name.trim().is_empty() {
            return Err(RuleError::EmptyName);
        }
        if spec.label == BugKind::None {
            return Err(RuleError::InvalidLabel(spec.name.clone()));
        }
        if !spec.weight.is_finite() || spec.weight <= 0.0 {
            return Err(RuleError::InvalidWeight {
                name: spec.name.clone(),
                weight: spec.weight,
            });
        }

        let regex = |pattern: &str| {
            Regex::new(pattern).map_err(|e| RuleError::InvalidPattern {
                name: spec.name.clone(),
                source: e,
            })
        };
        let predicate = match &spec.predicate {
            PredicateSpec::Added { pattern } => Predicate::Added(regex(pattern)?),
            PredicateSpec::Removed { pattern } => Predicate::Removed(regex(pattern)?),
            PredicateSpec::Rewrite { from, to } => Predicate::Rewrite {
                from: regex(from)?,
                to: regex(to)?,
            },
            PredicateSpec::ContextAdded { pattern } => Predicate::ContextAdded(regex(pattern)?),
            PredicateSpec::ContextRemoved { pattern } => {
                Predicate::ContextRemoved(regex(pattern)?)
            }
        };

        Ok(Self {
            spec: spec.clone(),
            predicate,
        })
    }

    pub fn name(&self) -> &str {
        &self.spec.name
    }

    pub fn label(&self) -> BugKind {
        self.spec.label
    }

    pub fn weight(&self) -> f64 {
        self.spec.weight
    }

    pub fn spec(&self) -> &RuleSpec {
        &self.spec
    }

    /// Whether this rule fires for the given change
    pub fn fires(&self, change: &ChangeContext<'_>) -> bool {
        self.predicate.holds(change)
    }
}

/// Ordered, versioned set of rules
#[derive(Debug, Clone)]
pub struct RuleTable {
    version: String,
    rules: Vec<Rule>,
}

impl Default for RuleTable {
    fn default() -> Self {
        Self::builtin()
    }
}

impl RuleTable {
    /// The built-in table
    pub fn builtin() -> Self {
        Self::from_specs(BUILTIN_VERSION, &builtin_specs()).expect("valid builtin rules")
    }

    /// A table with no rules (every line is labelled `none`)
    pub fn empty(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            rules: Vec::new(),
        }
    }

    pub fn from_specs(version: impl Into<String>, specs: &[RuleSpec]) -> Result<Self, RuleError> {
        let mut table = Self::empty(version);
        table.push_all(specs)?;
        Ok(table)
    }

    /// Append rules after the existing ones and retag the version
    pub fn extend(&mut self, version: impl Into<String>, specs: &[RuleSpec]) -> Result<(), RuleError> {
        self.push_all(specs)?;
        self.version = version.into();
        Ok(())
    }

    fn push_all(&mut self, specs: &[RuleSpec]) -> Result<(), RuleError> {
        let mut names: FxHashSet<String> = self.rules.iter().map(|r| r.name().to_string()).collect();
        let mut compiled = Vec::with_capacity(specs.len());
        for spec in specs {
            if !names.insert(spec.name.clone()) {
                return Err(RuleError::DuplicateName(spec.name.clone()));
            }
            compiled.push(Rule::compile(spec)?);
        }
        self.rules.extend(compiled);
        Ok(())
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Rule> {
        self.rules.iter().find(|r| r.name() == name)
    }

    /// Declarations of every rule, in table order
    pub fn specs(&self) -> Vec<RuleSpec> {
        self.rules.iter().map(|r| r.spec.clone()).collect()
    }
}

const NULL_CHECK: &str = r"(?i)(?:[!=]==?\s*(?:null|nil|nullptr|none|undefined)\b|\b(?:null|nil|nullptr|none|undefined)\s*[!=]==?|\bis\s+(?:not\s+)?none\b|\.is_(?:none|some)\(\)|requireNonNull|\bif\s+(?:!|not\s+)\w+)";
const BOUNDS_CHECK: &str = r"(?i)(?:\blen\s*\([^)]*\)\s*[<>]|[<>]=?\s*len\s*\(|\.(?:length|size\(\)|len\(\)|count\(\))\s*[<>]|[<>]=?\s*\w+(?:\.\w+)*\.(?:length|size\(\)|len\(\)|count\(\))|\b(?:index|idx)\s*[<>])";
const ERROR_HANDLING: &str = r"(?:\btry\s*[{:]|\bcatch\s*[({]|\bexcept\b|\bfinally\b|\brescue\b|\.catch\s*\(|\bif\s+let\s+Err\b|\bErr\s*\(\s*\w+\s*\)\s*=>|\)\?\s*;)";
const EXCEPTION_RAISED: &str = r"(?:\braise\b|\bthrow\b|\bthrows\b|\bpanic!|\bbail!|\breturn\s+Err\()";
const VALIDATION_CALL: &str = r"(?i)\b(?:assert\w*|validate\w*|verify\w*|check\w*|ensure\w*|is_?valid\w*|debug_assert\w*)\s*!?\s*\(";
const STRICT_COMPARISON: &str = r"(?:^|[^<>=!\-])[<>](?:[^<>=]|$)";
const INCLUSIVE_COMPARISON: &str = r"(?:^|[^<>])[<>]=";
const FIX_COMMENT: &str = r"(?i)(?://|#|/\*).*\b(?:fix(?:e[sd])?|bug|issue|patch|workaround|hotfix)\b";
const DEFAULT_VALUE: &str = r"(?:\?\?|\.(?:orElse\w*|getOrElse|unwrap_or\w*|or_default|get_or_insert\w*)\s*\(|\.get\s*\([^,()]+,|\bdefault\s*:|\|\|\s*(?:['\x22\[{0-9]|null\b|false\b|true\b))";
const RESOURCE_RELEASE: &str = r"(?:\b(?:close|dispose|release|free|unlock|shutdown|flush)\s*\(|\bwith\s+open\b|\bdefer\b|\bdrop\s*\()";
const GUARD: &str = r"^\s*(?:\}\s*)?(?:if|elif|else\s+if|unless|guard)\b";
const DEBUG_OUTPUT: &str = r"(?:\bconsole\.log|\bprintln!?|\bprintf|\bprint|\bSystem\.(?:out|err)\.print\w*|\bdbg!|\bvar_dump|\bputs|\bfmt\.Print\w*)\s*\(";
const TODO_MARKER: &str = r"\b(?:TODO|FIXME|XXX|HACK)\b";
const ERROR_SUPPRESSED: &str = r"(?:\bexcept\s*:|\bexcept\b.*:\s*pass\b|catch\s*\([^)]*\)\s*\{\s*\}|\.unwrap\(\)|@SuppressWarnings|\blet\s+_\s*=)";

fn added(name: &str, label: BugKind, weight: f64, pattern: &str) -> RuleSpec {
    RuleSpec {
        name: name.to_string(),
        label,
        weight,
        predicate: PredicateSpec::Added {
            pattern: pattern.to_string(),
        },
    }
}

fn removed(name: &str, label: BugKind, weight: f64, pattern: &str) -> RuleSpec {
    RuleSpec {
        name: name.to_string(),
        label,
        weight,
        predicate: PredicateSpec::Removed {
            pattern: pattern.to_string(),
        },
    }
}

fn rewrite(name: &str, label: BugKind, weight: f64, from: &str, to: &str) -> RuleSpec {
    RuleSpec {
        name: name.to_string(),
        label,
        weight,
        predicate: PredicateSpec::Rewrite {
            from: from.to_string(),
            to: to.to_string(),
        },
    }
}

fn context(name: &str, label: BugKind, weight: f64, pattern: &str, gained: bool) -> RuleSpec {
    let pattern = pattern.to_string();
    RuleSpec {
        name: name.to_string(),
        label,
        weight,
        predicate: if gained {
            PredicateSpec::ContextAdded { pattern }
        } else {
            PredicateSpec::ContextRemoved { pattern }
        },
    }
}

/// Declarations of the built-in table, in evaluation order
pub fn builtin_specs() -> Vec<RuleSpec> {
    use BugKind::{BugFix as Fix, BugIntroduction as Intro};

    vec![
        added("null-check-added", Fix, 0.55, NULL_CHECK),
        added("bounds-check-added", Fix, 0.5, BOUNDS_CHECK),
        added("error-handling-added", Fix, 0.55, ERROR_HANDLING),
        added("exception-raised", Fix, 0.4, EXCEPTION_RAISED),
        added("validation-call-added", Fix, 0.4, VALIDATION_CALL),
        rewrite("boundary-operator-relaxed", Fix, 0.4, STRICT_COMPARISON, INCLUSIVE_COMPARISON),
        rewrite("boundary-operator-tightened", Fix, 0.4, INCLUSIVE_COMPARISON, STRICT_COMPARISON),
        added("default-value-added", Fix, 0.4, DEFAULT_VALUE),
        added("resource-release-added", Fix, 0.35, RESOURCE_RELEASE),
        added("fix-comment-added", Fix, 0.15, FIX_COMMENT),
        context("guard-added-in-context", Fix, 0.3, GUARD, true),
        removed("null-check-removed", Intro, 0.55, NULL_CHECK),
        removed("bounds-check-removed", Intro, 0.5, BOUNDS_CHECK),
        removed("error-handling-removed", Intro, 0.55, ERROR_HANDLING),
        removed("validation-removed", Intro, 0.4, VALIDATION_CALL),
        removed("resource-release-removed", Intro, 0.35, RESOURCE_RELEASE),
        added("error-suppressed", Intro, 0.45, ERROR_SUPPRESSED),
        added("todo-marker-added", Intro, 0.3, TODO_MARKER),
        added("debug-output-added", Intro, 0.2, DEBUG_OUTPUT),
        context("guard-removed-in-context", Intro, 0.3, GUARD, false),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fires(name: &str, old: &str, new: &str) -> bool {
        let table = RuleTable::builtin();
        let rule = table.get(name).unwrap_or_else(|| panic!("no rule {name}"));
        rule.fires(&ChangeContext::new(old, new))
    }

    fn fires_in_context(name: &str, old_ctx: &[&str], new_ctx: &[&str]) -> bool {
        let table = RuleTable::builtin();
        let rule = table.get(name).unwrap();
        rule.fires(&ChangeContext::new("x = 1", "x = 2").with_context(old_ctx.to_vec(), new_ctx.to_vec()))
    }

    #[test]
    fn test_builtin_compiles() {
        let table = RuleTable::builtin();
        assert_eq!(table.version(), BUILTIN_VERSION);
        assert_eq!(table.len(), builtin_specs().len());
        assert!(table.rules().iter().all(|r| r.label() != BugKind::None));
    }

    #[test]
    fn test_null_check_rules() {
        assert!(fires("null-check-added", "name = user.name", "if (user != null) name = user.name"));
        assert!(fires("null-check-added", "x.run()", "if x is not None: x.run()"));
        assert!(!fires("null-check-added", "if (a == null) a = 1", "if (a == null) a = 2"));
        assert!(fires("null-check-removed", "if (user != null) name = user.name", "name = user.name"));
    }

    #[test]
    fn test_bounds_check_rules() {
        assert!(fires("bounds-check-added", "return items[i];", "if (i < items.length) return items[i];"));
        assert!(fires("bounds-check-added", "v = xs[k]", "v = xs[k] if k < len(xs) else None"));
        assert!(fires("bounds-check-removed", "if index < size: go()", "go()"));
    }

    #[test]
    fn test_error_handling_rules() {
        assert!(fires("error-handling-added", "data = load()", "try: data = load()"));
        assert!(fires("error-handling-added", "let v = parse(s);", "let v = parse(s)?;"));
        assert!(fires("error-handling-removed", "} catch (IOException e) {", "}"));
        assert!(fires("exception-raised", "return -1", "raise ValueError('bad')"));
        assert!(fires("exception-raised", "return 0;", "throw new IllegalArgumentException();"));
    }

    #[test]
    fn test_validation_rules() {
        assert!(fires("validation-call-added", "save(form)", "validate(form); save(form)"));
        assert!(fires("validation-call-added", "run(n)", "assert!(n > 0); run(n)"));
        assert!(fires("validation-removed", "checkArgs(a); run(a)", "run(a)"));
    }

    #[test]
    fn test_boundary_operator_rewrites() {
        assert!(fires("boundary-operator-relaxed", "if (x > 0)", "if (x >= 0)"));
        assert!(fires("boundary-operator-tightened", "while i <= n:", "while i < n:"));
        assert!(!fires("boundary-operator-relaxed", "if (x >= 0)", "if (x >= 1)"));
        assert!(!fires("boundary-operator-relaxed", "p->next", "q >= 0"));
    }

    #[test]
    fn test_default_and_resource_rules() {
        assert!(fires("default-value-added", "name = user.getName()", "name = user.getName().orElse(\"anon\")"));
        assert!(fires("default-value-added", "port = cfg['port']", "port = cfg.get('port', 80)"));
        assert!(fires("resource-release-added", "handle.write(buf)", "handle.write(buf); handle.close()"));
        assert!(fires("resource-release-removed", "conn.close()", "conn = None"));
    }

    #[test]
    fn test_marker_rules() {
        assert!(fires("fix-comment-added", "total = a + b", "total = a + b  // fix overflow bug"));
        assert!(!fires("fix-comment-added", "fix = 1", "fix = 2"));
        assert!(fires("todo-marker-added", "x = load()", "x = load()  # TODO handle errors"));
        assert!(fires("debug-output-added", "x = f(y)", "x = f(y); console.log(x)"));
        assert!(fires("debug-output-added", "x = f(y)", "print(x)"));
    }

    #[test]
    fn test_error_suppressed() {
        assert!(fires("error-suppressed", "except ValueError as e: log(e)", "except ValueError: pass"));
        assert!(fires("error-suppressed", "let v = parse(s)?;", "let v = parse(s).unwrap();"));
        assert!(fires("error-suppressed", "catch (Exception e) { log(e); }", "catch (Exception e) {}"));
    }

    #[test]
    fn test_context_rules() {
        assert!(fires_in_context("guard-added-in-context", &["a()"], &["if (ready) {", "a()"]));
        assert!(!fires_in_context("guard-added-in-context", &["if (x) {"], &["if (ready) {"]));
        assert!(fires_in_context("guard-removed-in-context", &["  if ok:"], &["go()"]));
    }

    #[test]
    fn test_invalid_rules_rejected() {
        let mut bad = added("broken", BugKind::BugFix, 0.5, "(unclosed");
        assert!(matches!(Rule::compile(&bad), Err(RuleError::InvalidPattern { .. })));

        bad = added("weightless", BugKind::BugFix, 0.0, "x");
        assert!(matches!(Rule::compile(&bad), Err(RuleError::InvalidWeight { .. })));

        bad = added("unlabelled", BugKind::None, 0.5, "x");
        assert!(matches!(Rule::compile(&bad), Err(RuleError::InvalidLabel(_))));

        let dup = vec![added("same", BugKind::BugFix, 0.1, "a"), added("same", BugKind::BugFix, 0.1, "b")];
        assert!(matches!(RuleTable::from_specs("t", &dup), Err(RuleError::DuplicateName(_))));
    }

    #[test]
    fn test_extend_appends_and_retags() {
        let mut table = RuleTable::builtin();
        let before = table.len();
        table
            .extend("builtin-1+project", &[added("retry-added", BugKind::BugFix, 0.3, r"\bretry\b")])
            .unwrap();
        assert_eq!(table.len(), before + 1);
        assert_eq!(table.version(), "builtin-1+project");
        assert_eq!(table.rules().last().unwrap().name(), "retry-added");
    }

    #[test]
    fn test_spec_from_toml() {
        let spec: RuleSpec = toml::from_str(
            r#"
            name = "swap"
            label = "bug_introduction"
            weight = 0.25
            kind = "rewrite"
            from = "a"
            to = "b"
            "#,
        )
        .unwrap();
        assert_eq!(spec.label, BugKind::BugIntroduction);
        assert_eq!(spec.predicate.kind(), "rewrite");
        assert!(Rule::compile(&spec).is_ok());
    }
}
