//! Explicit-manifest mode: series files with caller-supplied keys.
//!
//! Instead of discovering run folders, the caller lists series files along
//! with one group key (scale) and one order key (slip) per file.

use std::path::{Path, PathBuf};
use std::time::Instant;

use tl_core::{Real, Smoothing, WindowSpec};
use tl_results::{load_series_file, run_id_for};
use tracing::info;

use crate::batch::{BatchReport, RunOutcome, emit_progress, evaluate_series};
use crate::error::{AppError, AppResult};
use crate::progress::{BatchProgressEvent, BatchStage};
use crate::stats::{Evaluation, StatisticKind};

#[derive(Debug, Clone, PartialEq)]
pub struct ManifestEntry {
    pub series_path: PathBuf,
    pub group_key: Real,
    pub order_key: Real,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Manifest {
    entries: Vec<ManifestEntry>,
}

impl Manifest {
    /// Zip parallel lists of series paths, scales and slips.
    pub fn from_lists(
        series_paths: Vec<PathBuf>,
        scales: Vec<Real>,
        slips: Vec<Real>,
    ) -> AppResult<Self> {
        if series_paths.len() != scales.len() || series_paths.len() != slips.len() {
            return Err(AppError::Config(format!(
                "manifest lists differ in length: {} series, {} scales, {} slips",
                series_paths.len(),
                scales.len(),
                slips.len()
            )));
        }
        if let Some(bad) = scales.iter().chain(&slips).find(|v| !v.is_finite()) {
            return Err(AppError::Config(format!("manifest key must be finite, got {bad}")));
        }

        let entries = series_paths
            .into_iter()
            .zip(scales)
            .zip(slips)
            .map(|((series_path, group_key), order_key)| ManifestEntry {
                series_path,
                group_key,
                order_key,
            })
            .collect();
        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[ManifestEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Whole-file drawbar mean without smoothing.
pub fn default_manifest_evaluation() -> Evaluation {
    Evaluation {
        statistic: StatisticKind::DrawbarCoefficient,
        window: WindowSpec::full(),
        smoothing: Smoothing::None,
    }
}

pub fn run_manifest(manifest: &Manifest, evaluation: &Evaluation) -> AppResult<BatchReport> {
    run_manifest_with_progress(manifest, evaluation, None)
}

/// Evaluate every manifest entry in list order; failures become skip records.
pub fn run_manifest_with_progress(
    manifest: &Manifest,
    evaluation: &Evaluation,
    mut progress_cb: Option<&mut dyn FnMut(BatchProgressEvent)>,
) -> AppResult<BatchReport> {
    let started = Instant::now();
    evaluation.validate()?;

    let total = manifest.len();
    let channels = evaluation.statistic.required_channels();
    let mut outcomes = Vec::with_capacity(total);
    for (i, entry) in manifest.entries().iter().enumerate() {
        let run_id = manifest_run_id(&entry.series_path);
        emit_progress(
            &mut progress_cb,
            BatchStage::ProcessingRun,
            i,
            total,
            Some(run_id.as_str()),
            started,
        );
        let result = load_series_file(&entry.series_path, &channels)
            .map_err(AppError::from)
            .and_then(|series| {
                evaluate_series(&series, evaluation, entry.group_key, entry.order_key)
            });
        let outcome = RunOutcome::from_result(run_id, result);
        let stage = if outcome.is_skipped() {
            BatchStage::RunSkipped
        } else {
            BatchStage::RunCompleted
        };
        emit_progress(
            &mut progress_cb,
            stage,
            i + 1,
            total,
            Some(outcome.run_id.as_str()),
            started,
        );
        outcomes.push(outcome);
    }

    let report = BatchReport {
        outcomes,
        output_path: None,
    };
    info!(
        entries = total,
        skipped = report.skipped().len(),
        "manifest finished"
    );
    emit_progress(&mut progress_cb, BatchStage::Completed, total, total, None, started);
    Ok(report)
}

fn manifest_run_id(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| run_id_for(path))
}
