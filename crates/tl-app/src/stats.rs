//! Per-run statistics evaluated over a time window.

use std::borrow::Cow;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tl_core::derived::{drawbar_trace, effective_radius, expected_velocity, slip_percent};
use tl_core::{
    CoreError, Real, Smoothing, WindowSpec, ensure_finite, locate_window, mean, windowed_mean,
};
use tl_results::{Series, load_series_file};

use crate::error::{AppError, AppResult};

pub const FORCE_X: &str = "f_x";
pub const FORCE_Y: &str = "f_y";
pub const FORCE_Z: &str = "f_z";

pub const DEFAULT_ANGULAR_RATE: Real = 0.2;
pub const DEFAULT_WHEEL_RADIUS: Real = 0.09;
pub const DEFAULT_VELOCITY_CHANNEL: &str = "velX";
pub const DEFAULT_SUMMARY_START: Real = 1.0;

/// The scalar extracted from each run.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StatisticKind {
    /// Mean of `sqrt(f_x^2 + f_y^2) / f_z` over the window.
    #[default]
    DrawbarCoefficient,
    /// Mean of a single channel, e.g. a precomputed `d_c` column.
    ChannelMean { channel: String },
    /// Slip percent from the mean longitudinal velocity.
    Slip {
        #[serde(default = "default_angular_rate")]
        angular_rate: Real,
        #[serde(default = "default_wheel_radius")]
        wheel_radius: Real,
        #[serde(default = "default_velocity_channel")]
        velocity_channel: String,
    },
    /// Effective rolling radius from the mean longitudinal velocity.
    EffectiveRadius {
        #[serde(default = "default_angular_rate")]
        angular_rate: Real,
        #[serde(default = "default_velocity_channel")]
        velocity_channel: String,
    },
}

fn default_angular_rate() -> Real {
    DEFAULT_ANGULAR_RATE
}

fn default_wheel_radius() -> Real {
    DEFAULT_WHEEL_RADIUS
}

fn default_velocity_channel() -> String {
    DEFAULT_VELOCITY_CHANNEL.to_string()
}

impl StatisticKind {
    /// Channels (besides time) a series must carry for this statistic.
    pub fn required_channels(&self) -> Vec<String> {
        match self {
            StatisticKind::DrawbarCoefficient => [FORCE_X, FORCE_Y, FORCE_Z]
                .iter()
                .map(|c| c.to_string())
                .collect(),
            StatisticKind::ChannelMean { channel } => vec![channel.clone()],
            StatisticKind::Slip {
                velocity_channel, ..
            }
            | StatisticKind::EffectiveRadius {
                velocity_channel, ..
            } => vec![velocity_channel.clone()],
        }
    }

    /// Column label used when the statistic is written out.
    pub fn label(&self) -> String {
        match self {
            StatisticKind::DrawbarCoefficient => "Drawbar".to_string(),
            StatisticKind::ChannelMean { channel } => channel.clone(),
            StatisticKind::Slip { .. } => "Slip".to_string(),
            StatisticKind::EffectiveRadius { .. } => "Radius".to_string(),
        }
    }

    pub fn validate(&self) -> AppResult<()> {
        if self.required_channels().iter().any(|c| c.trim().is_empty()) {
            return Err(AppError::Config("statistic channel name is empty".into()));
        }
        let params: Vec<(&str, Real)> = match self {
            StatisticKind::Slip {
                angular_rate,
                wheel_radius,
                ..
            } => vec![("angular_rate", *angular_rate), ("wheel_radius", *wheel_radius)],
            StatisticKind::EffectiveRadius { angular_rate, .. } => {
                vec![("angular_rate", *angular_rate)]
            }
            _ => Vec::new(),
        };
        if let Some((name, value)) = params.iter().find(|(_, v)| !v.is_finite()) {
            return Err(AppError::Config(format!("{name} must be finite, got {value}")));
        }
        Ok(())
    }

    /// Evaluate over `window`, smoothing the per-sample trace first if asked.
    ///
    /// Without smoothing only the samples inside the window are touched, so a
    /// zero normal force outside the window does not matter. With smoothing
    /// the whole trace is computed because the filter reads across the window
    /// edges.
    pub fn evaluate(
        &self,
        series: &Series,
        window: WindowSpec,
        smoothing: &Smoothing,
    ) -> AppResult<Real> {
        let bounds = locate_window(series.time(), window)?;

        let value = if smoothing.is_none() {
            let trace = self.trace_over(series, |values| bounds.slice(values))?;
            mean(&trace).ok_or(CoreError::InvalidArg {
                what: "empty window",
            })?
        } else {
            let trace = self.trace_over(series, Ok)?;
            let smoothed = smoothing.apply(&trace)?;
            windowed_mean(&smoothed, bounds)?
        };

        let value = self.finish(value)?;
        Ok(ensure_finite(value, "statistic")?)
    }

    /// Full-length per-sample trace of the averaged quantity.
    pub fn trace<'a>(&self, series: &'a Series) -> AppResult<Cow<'a, [Real]>> {
        self.trace_over(series, Ok)
    }

    fn trace_over<'a, F>(&self, series: &'a Series, select: F) -> AppResult<Cow<'a, [Real]>>
    where
        F: Fn(&'a [Real]) -> tl_core::CoreResult<&'a [Real]>,
    {
        match self {
            StatisticKind::DrawbarCoefficient => {
                let f_x = select(require_channel(series, FORCE_X)?)?;
                let f_y = select(require_channel(series, FORCE_Y)?)?;
                let f_z = select(require_channel(series, FORCE_Z)?)?;
                Ok(Cow::Owned(drawbar_trace(f_x, f_y, f_z)?))
            }
            StatisticKind::ChannelMean { channel }
            | StatisticKind::Slip {
                velocity_channel: channel,
                ..
            }
            | StatisticKind::EffectiveRadius {
                velocity_channel: channel,
                ..
            } => Ok(Cow::Borrowed(select(require_channel(series, channel)?)?)),
        }
    }

    fn finish(&self, mean: Real) -> AppResult<Real> {
        match *self {
            StatisticKind::DrawbarCoefficient | StatisticKind::ChannelMean { .. } => Ok(mean),
            StatisticKind::Slip {
                angular_rate,
                wheel_radius,
                ..
            } => Ok(slip_percent(
                mean,
                expected_velocity(angular_rate, wheel_radius),
            )?),
            StatisticKind::EffectiveRadius { angular_rate, .. } => {
                Ok(effective_radius(mean, angular_rate)?)
            }
        }
    }
}

fn require_channel<'a>(series: &'a Series, name: &str) -> AppResult<&'a [Real]> {
    series
        .channel(name)
        .ok_or_else(|| AppError::MissingChannel(name.to_string()))
}

/// What to compute for each run: statistic, window and smoothing.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub statistic: StatisticKind,
    pub window: WindowSpec,
    pub smoothing: Smoothing,
}

impl Evaluation {
    pub fn validate(&self) -> AppResult<()> {
        self.statistic.validate()?;
        if !self.window.start.is_finite() && self.window.start != Real::NEG_INFINITY {
            return Err(AppError::Config(format!(
                "window start must be finite, got {}",
                self.window.start
            )));
        }
        if let Some(end) = self.window.end
            && !end.is_finite()
        {
            return Err(AppError::Config(format!("window end must be finite, got {end}")));
        }
        self.smoothing
            .validate()
            .map_err(|e| AppError::Config(e.to_string()))
    }

    pub fn evaluate(&self, series: &Series) -> AppResult<Real> {
        self.statistic
            .evaluate(series, self.window, &self.smoothing)
    }
}

/// Mean of one channel over a window.
pub fn windowed_channel_mean(
    series: &Series,
    channel: &str,
    window: WindowSpec,
) -> AppResult<Real> {
    let bounds = locate_window(series.time(), window)?;
    Ok(windowed_mean(require_channel(series, channel)?, bounds)?)
}

/// Wheel kinematics for the slip summary.
#[derive(Debug, Clone, PartialEq)]
pub struct WheelParams {
    pub angular_rate: Real,
    pub wheel_radius: Real,
    pub velocity_channel: String,
}

impl Default for WheelParams {
    fn default() -> Self {
        Self {
            angular_rate: DEFAULT_ANGULAR_RATE,
            wheel_radius: DEFAULT_WHEEL_RADIUS,
            velocity_channel: DEFAULT_VELOCITY_CHANNEL.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SlipSummary {
    pub mean_velocity: Real,
    pub slip_percent: Real,
    pub effective_radius: Real,
}

/// Slip and effective rolling radius of one run from its mean velocity.
pub fn summarize_slip(
    series: &Series,
    window: WindowSpec,
    wheel: &WheelParams,
) -> AppResult<SlipSummary> {
    let mean_velocity = windowed_channel_mean(series, &wheel.velocity_channel, window)?;
    Ok(SlipSummary {
        mean_velocity,
        slip_percent: slip_percent(
            mean_velocity,
            expected_velocity(wheel.angular_rate, wheel.wheel_radius),
        )?,
        effective_radius: effective_radius(mean_velocity, wheel.angular_rate)?,
    })
}

/// Load a bare series file and summarize it.
pub fn summarize_slip_file(
    path: &Path,
    window: WindowSpec,
    wheel: &WheelParams,
) -> AppResult<SlipSummary> {
    let series = load_series_file(path, std::slice::from_ref(&wheel.velocity_channel))?;
    summarize_slip(&series, window, wheel)
}
