//! lhdiff library
//!
//! Tracks lines across versions of a text file and flags modified lines that
//! look like bug fixes or bug introductions.

pub mod bugs;
pub mod changes;
pub mod config;
pub mod discovery;
pub mod evaluate;
pub mod extract;
pub mod fingerprint;
pub mod history;
pub mod matcher;
pub mod models;
pub mod pipeline;
pub mod reporters;

pub use models::{BugKind, BugLabel, ChangeRecord, ChangeStatus, Comparison, LineRecord, Side};
pub use pipeline::{
    compare, compare_bytes, compare_cancellable, compare_texts, CancelFlag, CompareConfig,
    CompareError,
};
