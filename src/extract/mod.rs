//! Line extraction and normalization
//!
//! Splits a version's text into [`LineRecord`]s. Numbering follows the
//! original file: blank lines are kept as records with empty content so
//! line N of the file is always record N.
//!
//! Normalization collapses insignificant whitespace and, when enabled,
//! strips comments (see [`comments`]). The normalized text drives matching;
//! the raw text is kept for display and for the bug rules.

mod comments;

pub use comments::CommentState;

use crate::fingerprint::compute_fingerprint;
use crate::models::{LineRecord, Side};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Punctuation removed when `strip_punctuation` is enabled
const PUNCTUATION: &[char] = &[';', ',', '(', ')', '{', '}', '[', ']'];

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// Errors raised while turning input into line records
#[derive(Error, Debug)]
pub enum InputError {
    #[error("input is not valid UTF-8 (line {line}, byte offset {offset})")]
    Undecodable { line: usize, offset: usize },

    #[error("failed to read {}: {source}", path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// How raw lines are normalized before matching
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizeOptions {
    /// Strip `//`, `#`, `/* */` comments and docstring blocks
    pub strip_comments: bool,
    /// Drop `; , ( ) { } [ ]`
    pub strip_punctuation: bool,
    pub lowercase: bool,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self {
            strip_comments: true,
            strip_punctuation: false,
            lowercase: false,
        }
    }
}

impl NormalizeOptions {
    /// Whitespace-only normalization
    pub fn verbatim() -> Self {
        Self {
            strip_comments: false,
            strip_punctuation: false,
            lowercase: false,
        }
    }
}

/// Collapse whitespace runs to one space and trim the ends
fn collapse_whitespace(line: &str) -> String {
    line.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Apply the post-comment steps of normalization
fn finish(line: &str, options: &NormalizeOptions) -> String {
    let mut text = collapse_whitespace(line);
    if options.strip_punctuation {
        let stripped: String = text.chars().filter(|c| !PUNCTUATION.contains(c)).collect();
        text = collapse_whitespace(&stripped);
    }
    if options.lowercase {
        text = text.to_lowercase();
    }
    text
}

/// Normalize a single line in isolation.
///
/// Block comments opened on this line are stripped to the end of the line;
/// nothing is carried over to other lines.
pub fn normalize_line(line: &str, options: &NormalizeOptions) -> String {
    if options.strip_comments {
        let mut state = CommentState::default();
        finish(&state.strip(line), options)
    } else {
        finish(line, options)
    }
}

/// Split `text` into line records for one side of a comparison.
///
/// Never fails; empty text yields no records.
pub fn extract(text: &str, side: Side, options: &NormalizeOptions) -> Vec<LineRecord> {
    let mut state = CommentState::default();
    let rows: Vec<(String, String)> = text
        .lines()
        .map(|raw| {
            let normalized = if options.strip_comments {
                finish(&state.strip(raw), options)
            } else {
                finish(raw, options)
            };
            (raw.to_string(), normalized)
        })
        .collect();

    let records: Vec<LineRecord> = rows
        .into_par_iter()
        .enumerate()
        .map(|(pos, (raw_text, normalized_text))| LineRecord {
            side,
            index: pos + 1,
            fingerprint: compute_fingerprint(&normalized_text),
            raw_text,
            normalized_text,
        })
        .collect();

    debug!("Extracted {} {} lines", records.len(), side);
    records
}

/// Decode raw bytes and extract line records.
///
/// Invalid UTF-8 is reported with the 1-based line it occurs on.
pub fn extract_bytes(
    bytes: &[u8],
    side: Side,
    options: &NormalizeOptions,
) -> Result<Vec<LineRecord>, InputError> {
    Ok(extract(decode(bytes)?, side, options))
}

/// Decode UTF-8 input, skipping a leading byte-order mark
pub fn decode(bytes: &[u8]) -> Result<&str, InputError> {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    std::str::from_utf8(bytes).map_err(|e| {
        let offset = e.valid_up_to();
        let line = bytes[..offset].iter().filter(|&&b| b == b'\n').count() + 1;
        InputError::Undecodable { line, offset }
    })
}

/// Read and decode a version from disk
pub fn read_text(path: &Path) -> Result<String, InputError> {
    let bytes = std::fs::read(path).map_err(|source| InputError::Unreadable {
        path: path.to_path_buf(),
        source,
    })?;
    decode(&bytes).map(str::to_string)
}

/// Read a version from disk and extract its line records
pub fn read_lines(
    path: &Path,
    side: Side,
    options: &NormalizeOptions,
) -> Result<Vec<LineRecord>, InputError> {
    Ok(extract(&read_text(path)?, side, options))
}
