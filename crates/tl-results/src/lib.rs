//! tl-results: run artifacts on disk.
//!
//! Loads per-run folders (metadata + time series), discovers run folders under
//! a root directory, and persists aggregated tables.

pub mod loader;
pub mod sink;
pub mod types;

pub use loader::{
    discover_runs, load_metadata, load_run, load_series_all_channels, load_series_file, run_id_for,
};
pub use sink::{ResultSink, Table, read_table, write_table};
pub use types::*;

use std::path::PathBuf;

pub type ResultsResult<T> = Result<T, ResultsError>;

#[derive(thiserror::Error, Debug)]
pub enum ResultsError {
    #[error("Missing artifact: {path}")]
    MissingArtifact { path: PathBuf },

    #[error("Malformed metadata in {path}: {reason}")]
    MalformedMetadata { path: PathBuf, reason: String },

    #[error("Malformed series in {path}: {reason}")]
    MalformedSeries { path: PathBuf, reason: String },

    #[error("Malformed table in {path}: {reason}")]
    MalformedTable { path: PathBuf, reason: String },

    #[error("Invalid path: {message}")]
    InvalidPath { message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}
