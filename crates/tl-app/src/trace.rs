//! Per-run time traces for plotting: drawbar coefficient or a raw channel
//! against time, one series per file, keyed by scale.

use std::path::PathBuf;

use serde::Serialize;
use tl_core::{Real, Smoothing};
use tl_results::{Series, TIME_CHANNEL, load_series_file};
use tracing::debug;

use crate::error::{AppError, AppResult};
use crate::stats::StatisticKind;

/// Model-to-prototype multiplier shown in drawbar trace labels.
pub const SCALE_DISPLAY_FACTOR: Real = 20.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TraceSeries {
    pub group_key: Real,
    pub label: String,
    pub points: Vec<(Real, Real)>,
}

/// `Scale 1.0 (20.0x scaled)`.
pub fn scaled_label(scale: Real) -> String {
    format!(
        "Scale {scale:?} ({:?}x scaled)",
        scale * SCALE_DISPLAY_FACTOR
    )
}

/// `pos_x (Scale 1.0)`.
pub fn channel_label(channel: &str, scale: Real) -> String {
    format!("{channel} (Scale {scale:?})")
}

/// Per-sample drawbar coefficient over time, optionally smoothed.
pub fn drawbar_trace_series(
    series: &Series,
    scale: Real,
    smoothing: &Smoothing,
) -> AppResult<TraceSeries> {
    let trace = StatisticKind::DrawbarCoefficient.trace(series)?;
    Ok(TraceSeries {
        group_key: scale,
        label: scaled_label(scale),
        points: zip_time(series.time(), &smoothing.apply(&trace)?),
    })
}

/// One channel over time, optionally smoothed.
pub fn channel_trace_series(
    series: &Series,
    channel: &str,
    scale: Real,
    smoothing: &Smoothing,
) -> AppResult<TraceSeries> {
    let values = series
        .channel(channel)
        .ok_or_else(|| AppError::MissingChannel(channel.to_string()))?;
    Ok(TraceSeries {
        group_key: scale,
        label: channel_label(channel, scale),
        points: zip_time(series.time(), &smoothing.apply(values)?),
    })
}

/// Drawbar traces for parallel lists of files and scales.
pub fn drawbar_traces(
    paths: &[PathBuf],
    scales: &[Real],
    smoothing: &Smoothing,
) -> AppResult<Vec<TraceSeries>> {
    let channels = StatisticKind::DrawbarCoefficient.required_channels();
    traces_for(paths, scales, smoothing, &channels, |series, scale| {
        drawbar_trace_series(series, scale, smoothing)
    })
}

/// Traces of each named channel for parallel lists of files and scales.
///
/// Output is file-major: all channels of the first file, then the next file.
pub fn channel_traces(
    paths: &[PathBuf],
    scales: &[Real],
    channels: &[String],
    smoothing: &Smoothing,
) -> AppResult<Vec<Vec<TraceSeries>>> {
    if channels.is_empty() || channels.iter().any(|c| c == TIME_CHANNEL) {
        return Err(AppError::Config(
            "channel traces need at least one non-time channel".into(),
        ));
    }
    traces_for(paths, scales, smoothing, channels, |series, scale| {
        channels
            .iter()
            .map(|c| channel_trace_series(series, c, scale, smoothing))
            .collect()
    })
}

fn traces_for<T, F>(
    paths: &[PathBuf],
    scales: &[Real],
    smoothing: &Smoothing,
    channels: &[String],
    build: F,
) -> AppResult<Vec<T>>
where
    F: Fn(&Series, Real) -> AppResult<T>,
{
    if paths.len() != scales.len() {
        return Err(AppError::Config(format!(
            "{} series files but {} scales",
            paths.len(),
            scales.len()
        )));
    }
    smoothing
        .validate()
        .map_err(|e| AppError::Config(e.to_string()))?;

    paths
        .iter()
        .zip(scales)
        .map(|(path, &scale)| {
            let series = load_series_file(path, channels)?;
            debug!(path = %path.display(), scale, "building trace");
            build(&series, scale)
        })
        .collect()
}

fn zip_time(time: &[Real], values: &[Real]) -> Vec<(Real, Real)> {
    time.iter().copied().zip(values.iter().copied()).collect()
}
