//! Batch driver: discover run folders, evaluate each, collect rows.
//!
//! A run that fails to load or evaluate becomes a [`SkipRecord`]; the batch
//! carries on with the next folder. Only configuration problems and an
//! unreadable root directory abort the whole batch.

use std::path::{Path, PathBuf};
use std::time::Instant;

use rayon::prelude::*;
use serde::Serialize;
use tl_core::Real;
use tl_results::{
    AggregationRow, ResultSink, RunId, RunRecord, discover_runs, load_run, run_id_for,
};
use tracing::{debug, info, warn};

use crate::config::BatchConfig;
use crate::error::{AppError, AppResult, ErrorKind};
use crate::grouping::GroupedSeries;
use crate::progress::{BatchProgressEvent, BatchStage};
use crate::stats::Evaluation;

/// Why a run produced no row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkipRecord {
    pub run_id: RunId,
    pub kind: ErrorKind,
    pub message: String,
}

impl SkipRecord {
    pub fn from_error(run_id: impl Into<RunId>, err: &AppError) -> Self {
        Self {
            run_id: run_id.into(),
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunOutcome {
    pub run_id: RunId,
    pub result: Result<AggregationRow, SkipRecord>,
}

impl RunOutcome {
    pub(crate) fn from_result(run_id: RunId, result: AppResult<AggregationRow>) -> Self {
        let result = result.map_err(|err| {
            let skip = SkipRecord::from_error(run_id.clone(), &err);
            warn!(run_id = %skip.run_id, kind = %skip.kind, "skipping run: {}", skip.message);
            skip
        });
        Self { run_id, result }
    }

    pub fn is_skipped(&self) -> bool {
        self.result.is_err()
    }
}

/// Per-run outcomes in discovery order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchReport {
    pub outcomes: Vec<RunOutcome>,
    /// Table written by the result sink, if persistence was enabled.
    pub output_path: Option<PathBuf>,
}

impl BatchReport {
    pub fn rows(&self) -> Vec<AggregationRow> {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().ok().copied())
            .collect()
    }

    pub fn skipped(&self) -> Vec<&SkipRecord> {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().err())
            .collect()
    }

    pub fn grouped(&self) -> GroupedSeries {
        GroupedSeries::from_rows(self.rows())
    }

    pub fn run_count(&self) -> usize {
        self.outcomes.len()
    }
}

pub(crate) fn emit_progress(
    progress_cb: &mut Option<&mut dyn FnMut(BatchProgressEvent)>,
    stage: BatchStage,
    completed: usize,
    total: usize,
    run_id: Option<&str>,
    started: Instant,
) {
    if let Some(cb) = progress_cb.as_deref_mut() {
        cb(BatchProgressEvent {
            stage,
            completed,
            total,
            run_id: run_id.map(str::to_string),
            elapsed_wall_s: started.elapsed().as_secs_f64(),
        });
    }
}

/// Run a batch over every run folder under `config.root_dir`.
pub fn run_batch(config: &BatchConfig) -> AppResult<BatchReport> {
    run_batch_with_progress(config, None)
}

/// Run a batch and stream progress events.
///
/// In parallel mode the per-run events are delivered after all runs finish,
/// still in discovery order.
pub fn run_batch_with_progress(
    config: &BatchConfig,
    mut progress_cb: Option<&mut dyn FnMut(BatchProgressEvent)>,
) -> AppResult<BatchReport> {
    let started = Instant::now();
    config.validate()?;

    emit_progress(&mut progress_cb, BatchStage::Discovering, 0, 0, None, started);
    let run_dirs = discover_runs(&config.root_dir)?;
    let total = run_dirs.len();
    info!(root = %config.root_dir.display(), runs = total, "discovered run folders");

    let outcomes = if config.parallel {
        let outcomes: Vec<RunOutcome> = run_dirs
            .par_iter()
            .map(|dir| process_run(dir, config))
            .collect();
        for (i, outcome) in outcomes.iter().enumerate() {
            emit_progress(
                &mut progress_cb,
                finished_stage(outcome),
                i + 1,
                total,
                Some(outcome.run_id.as_str()),
                started,
            );
        }
        outcomes
    } else {
        let mut outcomes = Vec::with_capacity(total);
        for (i, dir) in run_dirs.iter().enumerate() {
            let run_id = run_id_for(dir);
            emit_progress(
                &mut progress_cb,
                BatchStage::ProcessingRun,
                i,
                total,
                Some(run_id.as_str()),
                started,
            );
            let outcome = process_run(dir, config);
            emit_progress(
                &mut progress_cb,
                finished_stage(&outcome),
                i + 1,
                total,
                Some(run_id.as_str()),
                started,
            );
            outcomes.push(outcome);
        }
        outcomes
    };

    let mut report = BatchReport {
        outcomes,
        output_path: None,
    };
    let skipped = report.skipped().len();
    info!(
        runs = total,
        rows = total - skipped,
        skipped,
        "batch finished"
    );

    if config.persist {
        emit_progress(&mut progress_cb, BatchStage::Persisting, total, total, None, started);
        report.output_path = persist_report(&report, config)?;
    }

    emit_progress(&mut progress_cb, BatchStage::Completed, total, total, None, started);
    Ok(report)
}

fn finished_stage(outcome: &RunOutcome) -> BatchStage {
    if outcome.is_skipped() {
        BatchStage::RunSkipped
    } else {
        BatchStage::RunCompleted
    }
}

fn process_run(dir: &Path, config: &BatchConfig) -> RunOutcome {
    let run_id = run_id_for(dir);
    let result = load_run(dir, &config.layout, &config.requirements())
        .map_err(AppError::from)
        .and_then(|record| evaluate_run(&record, config));
    RunOutcome::from_result(run_id, result)
}

/// Evaluate one loaded run into a row.
pub fn evaluate_run(record: &RunRecord, config: &BatchConfig) -> AppResult<AggregationRow> {
    let order_key = required_parameter(record, &config.order_parameter)?;
    let group_key = match &config.group_parameter {
        Some(name) => required_parameter(record, name)?,
        None => config.default_group_key,
    };
    let value = config.evaluation().evaluate(&record.series)?;
    debug!(run_id = %record.run_id, order_key, group_key, value, "evaluated run");
    Ok(AggregationRow {
        group_key,
        order_key,
        value,
    })
}

/// Evaluate a series whose keys are supplied by the caller.
pub fn evaluate_series(
    series: &tl_results::Series,
    evaluation: &Evaluation,
    group_key: Real,
    order_key: Real,
) -> AppResult<AggregationRow> {
    Ok(AggregationRow {
        group_key,
        order_key,
        value: evaluation.evaluate(series)?,
    })
}

fn required_parameter(record: &RunRecord, name: &str) -> AppResult<Real> {
    record.parameter(name).ok_or_else(|| {
        tl_results::ResultsError::MalformedMetadata {
            path: PathBuf::from(&record.run_id),
            reason: format!("missing required parameter '{name}'"),
        }
        .into()
    })
}

/// Write the successful rows through the configured sink, in group/order
/// sequence.
///
/// Grouped batches write `(group, order, value)` triples; ungrouped batches
/// write `(order, value)` pairs.
pub fn persist_report(report: &BatchReport, config: &BatchConfig) -> AppResult<Option<PathBuf>> {
    let sink = config.sink();
    if config.is_grouped() {
        return write_grouped(report, &sink);
    }
    let rows: Vec<[Real; 2]> = report
        .grouped()
        .to_rows()
        .into_iter()
        .map(AggregationRow::to_pair)
        .collect();
    Ok(sink.write(&rows)?)
}

/// Write `(group, order, value)` triples in group/order sequence.
pub fn write_grouped(report: &BatchReport, sink: &ResultSink) -> AppResult<Option<PathBuf>> {
    let rows: Vec<[Real; 3]> = report
        .grouped()
        .to_rows()
        .into_iter()
        .map(AggregationRow::to_triple)
        .collect();
    Ok(sink.write(&rows)?)
}
