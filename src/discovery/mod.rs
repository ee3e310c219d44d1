//! Version chain discovery
//!
//! Files named `<name>_v<N>.<ext>` in one directory form a chain per
//! `(name, ext)`, ordered by the numeric `N`. Chains with fewer than two
//! versions and files that do not follow the convention are ignored.

use anyhow::{Context, Result};
use regex::Regex;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::{debug, warn};

fn version_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(?P<name>.+)_v(?P<version>\d+)\.(?P<ext>[^.]+)$").expect("valid regex")
    })
}

/// Parse `<name>_v<N>.<ext>` into its parts
pub fn parse_version_name(file_name: &str) -> Option<(String, u32, String)> {
    let caps = version_pattern().captures(file_name)?;
    let version = caps["version"].parse().ok()?;
    Some((caps["name"].to_string(), version, caps["ext"].to_string()))
}

/// One file of a chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionFile {
    pub version: u32,
    pub path: PathBuf,
}

impl VersionFile {
    pub fn label(&self) -> String {
        format!("v{}", self.version)
    }
}

/// Successive versions of one file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionChain {
    pub name: String,
    pub extension: String,
    /// Ascending by version number, at least two entries
    pub versions: Vec<VersionFile>,
}

impl VersionChain {
    /// Adjacent (older, newer) pairs
    pub fn pairs(&self) -> impl Iterator<Item = (&VersionFile, &VersionFile)> {
        self.versions.windows(2).map(|w| (&w[0], &w[1]))
    }

    /// Case name of a pair, e.g. `parser_v1_to_v2`
    pub fn case_name(&self, old: &VersionFile, new: &VersionFile) -> String {
        format!("{}_v{}_to_v{}", self.name, old.version, new.version)
    }
}

/// Ground-truth key of a pair, e.g. `v1-v2`
pub fn pair_key(old: &VersionFile, new: &VersionFile) -> String {
    format!("v{}-v{}", old.version, new.version)
}

/// Group the versioned files of `dir` into chains, ordered by name
pub fn discover(dir: &Path) -> Result<Vec<VersionChain>> {
    let entries =
        std::fs::read_dir(dir).with_context(|| format!("Failed to read directory {}", dir.display()))?;

    let mut paths: Vec<PathBuf> = Vec::new();
    for entry in entries {
        let entry = entry.with_context(|| format!("Failed to list {}", dir.display()))?;
        let path = entry.path();
        if path.is_file() {
            paths.push(path);
        }
    }
    paths.sort();

    let mut groups: BTreeMap<(String, String), BTreeMap<u32, PathBuf>> = BTreeMap::new();
    for path in paths {
        let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let Some((name, version, ext)) = parse_version_name(file_name) else {
            debug!("Skipping {}: not a versioned file name", file_name);
            continue;
        };
        let versions = groups.entry((name, ext)).or_default();
        if let Some(existing) = versions.get(&version) {
            warn!(
                "Ignoring {}: version {} already provided by {}",
                path.display(),
                version,
                existing.display()
            );
            continue;
        }
        versions.insert(version, path);
    }

    let chains: Vec<VersionChain> = groups
        .into_iter()
        .filter(|(_, versions)| versions.len() >= 2)
        .map(|((name, extension), versions)| VersionChain {
            name,
            extension,
            versions: versions
                .into_iter()
                .map(|(version, path)| VersionFile { version, path })
                .collect(),
        })
        .collect();

    debug!("Discovered {} version chains in {}", chains.len(), dir.display());
    Ok(chains)
}
