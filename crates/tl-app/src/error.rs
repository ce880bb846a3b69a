//! Error types for the tl-app service layer.

use std::path::PathBuf;

use serde::Serialize;
use tl_core::CoreError;
use tl_results::ResultsError;

/// Application error type wrapping the backend crates, shared by the batch
/// driver, the single-run operations and the CLI.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to read config file: {path}")]
    ConfigFileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Series has no channel '{0}'")]
    MissingChannel(String),

    #[error("Core error: {0}")]
    Core(#[from] CoreError),

    #[error("Results error: {0}")]
    Results(#[from] ResultsError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for tl-app operations.
pub type AppResult<T> = Result<T, AppError>;

/// Coarse classification carried by skip records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    MissingArtifact,
    MalformedMetadata,
    MalformedSeries,
    WindowOutOfRange,
    DegenerateWindow,
    InvalidSmoothingWindow,
    Io,
    Config,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::MissingArtifact => "missing_artifact",
            ErrorKind::MalformedMetadata => "malformed_metadata",
            ErrorKind::MalformedSeries => "malformed_series",
            ErrorKind::WindowOutOfRange => "window_out_of_range",
            ErrorKind::DegenerateWindow => "degenerate_window",
            ErrorKind::InvalidSmoothingWindow => "invalid_smoothing_window",
            ErrorKind::Io => "io",
            ErrorKind::Config => "config",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl AppError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::Config(_) => ErrorKind::Config,
            AppError::MissingChannel(_) => ErrorKind::MalformedSeries,
            AppError::ConfigFileRead { .. } | AppError::Io(_) => ErrorKind::Io,
            AppError::Core(err) => core_kind(err),
            AppError::Results(err) => results_kind(err),
        }
    }
}

fn core_kind(err: &CoreError) -> ErrorKind {
    match err {
        CoreError::WindowOutOfRange { .. } => ErrorKind::WindowOutOfRange,
        CoreError::DegenerateWindow { .. } => ErrorKind::DegenerateWindow,
        CoreError::InvalidSmoothingWindow { .. } => ErrorKind::InvalidSmoothingWindow,
        // only reachable through inconsistent channel data
        CoreError::NonFinite { .. } | CoreError::InvalidArg { .. } => ErrorKind::MalformedSeries,
    }
}

fn results_kind(err: &ResultsError) -> ErrorKind {
    match err {
        ResultsError::MissingArtifact { .. } => ErrorKind::MissingArtifact,
        ResultsError::MalformedMetadata { .. } => ErrorKind::MalformedMetadata,
        ResultsError::MalformedSeries { .. } => ErrorKind::MalformedSeries,
        ResultsError::Csv(e) if !e.is_io_error() => ErrorKind::MalformedSeries,
        ResultsError::Csv(_)
        | ResultsError::MalformedTable { .. }
        | ResultsError::InvalidPath { .. }
        | ResultsError::Io(_) => ErrorKind::Io,
    }
}
