//! Service layer for tractionlab.
//!
//! Turns run folders (or an explicit list of series files) into grouped,
//! ordered statistics and time traces for comparison plots. Shared by the
//! CLI and by tests; nothing here renders or prints.

pub mod batch;
pub mod config;
pub mod error;
pub mod grouping;
pub mod manifest;
pub mod progress;
pub mod stats;
pub mod trace;

pub use batch::{
    BatchReport, RunOutcome, SkipRecord, evaluate_run, evaluate_series, persist_report, run_batch,
    run_batch_with_progress, write_grouped,
};
pub use config::BatchConfig;
pub use error::{AppError, AppResult, ErrorKind};
pub use grouping::{GroupedSeries, group_label, group_rows};
pub use manifest::{
    Manifest, ManifestEntry, default_manifest_evaluation, run_manifest, run_manifest_with_progress,
};
pub use progress::{BatchProgressEvent, BatchStage};
pub use stats::{
    Evaluation, SlipSummary, StatisticKind, WheelParams, summarize_slip, summarize_slip_file,
    windowed_channel_mean,
};
pub use trace::{
    TraceSeries, channel_label, channel_trace_series, channel_traces, drawbar_trace_series,
    drawbar_traces, scaled_label,
};
