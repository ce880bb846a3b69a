//! Run data types.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tl_core::Real;

pub type RunId = String;

/// Name of the time channel every series must carry.
pub const TIME_CHANNEL: &str = "t";

/// Scalar run parameters, keyed by name (e.g. `slip`, `scale`).
pub type Parameters = BTreeMap<String, Real>;

/// Columnar time series: one column per named channel, all of equal length,
/// with a non-decreasing time channel.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    channels: Vec<String>,
    columns: Vec<Vec<Real>>,
    time_index: usize,
}

impl Series {
    /// Build a series from named columns.
    ///
    /// The time channel must be present, columns must share one length, and
    /// time must be finite and non-decreasing. An empty series is allowed
    /// here; loaders reject it separately.
    pub fn from_columns<I, S>(columns: I) -> Result<Self, String>
    where
        I: IntoIterator<Item = (S, Vec<Real>)>,
        S: Into<String>,
    {
        let (channels, columns): (Vec<String>, Vec<Vec<Real>>) = columns
            .into_iter()
            .map(|(name, values)| (name.into(), values))
            .unzip();

        let time_index = channels
            .iter()
            .position(|c| c == TIME_CHANNEL)
            .ok_or_else(|| format!("missing time channel '{TIME_CHANNEL}'"))?;

        let len = columns[time_index].len();
        if let Some((name, col)) = channels
            .iter()
            .zip(&columns)
            .find(|(_, col)| col.len() != len)
        {
            return Err(format!(
                "channel '{name}' has {} samples, expected {len}",
                col.len()
            ));
        }

        let time = &columns[time_index];
        if let Some(i) = time.iter().position(|t| !t.is_finite()) {
            return Err(format!("non-finite time at sample {i}"));
        }
        if let Some(i) = time.windows(2).position(|w| w[1] < w[0]) {
            return Err(format!(
                "time decreases at sample {}: {} -> {}",
                i + 1,
                time[i],
                time[i + 1]
            ));
        }

        Ok(Self {
            channels,
            columns,
            time_index,
        })
    }

    pub fn time(&self) -> &[Real] {
        &self.columns[self.time_index]
    }

    pub fn channel(&self, name: &str) -> Option<&[Real]> {
        self.channels
            .iter()
            .position(|c| c == name)
            .map(|i| self.columns[i].as_slice())
    }

    pub fn channel_names(&self) -> impl Iterator<Item = &str> {
        self.channels.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.time().len()
    }

    pub fn is_empty(&self) -> bool {
        self.time().is_empty()
    }

    pub fn time_range(&self) -> Option<(Real, Real)> {
        Some((*self.time().first()?, *self.time().last()?))
    }
}

/// One experiment or simulation run, as loaded from disk.
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub run_id: RunId,
    pub parameters: Parameters,
    pub series: Series,
}

impl RunRecord {
    pub fn parameter(&self, name: &str) -> Option<Real> {
        self.parameters.get(name).copied()
    }
}

/// File names inside a run folder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunLayout {
    pub metadata_file: String,
    pub series_file: String,
}

impl Default for RunLayout {
    fn default() -> Self {
        Self {
            metadata_file: "params.json".to_string(),
            series_file: "output.csv".to_string(),
        }
    }
}

/// Parameters and channels a caller needs from every run.
///
/// Only the listed channels (plus time) are kept unless `keep_all_channels`
/// is set, in which case every fully numeric column is retained as well.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunRequirements {
    pub parameters: Vec<String>,
    pub channels: Vec<String>,
    pub keep_all_channels: bool,
}

impl RunRequirements {
    pub fn new<P, C>(parameters: P, channels: C) -> Self
    where
        P: IntoIterator,
        P::Item: Into<String>,
        C: IntoIterator,
        C::Item: Into<String>,
    {
        Self {
            parameters: parameters.into_iter().map(Into::into).collect(),
            channels: channels.into_iter().map(Into::into).collect(),
            keep_all_channels: false,
        }
    }

    pub fn with_all_channels(mut self) -> Self {
        self.keep_all_channels = true;
        self
    }
}

/// The unit collected per run: group key (e.g. scale), order key (e.g. slip)
/// and the derived statistic.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AggregationRow {
    pub group_key: Real,
    pub order_key: Real,
    pub value: Real,
}

impl AggregationRow {
    pub fn to_triple(self) -> [Real; 3] {
        [self.group_key, self.order_key, self.value]
    }

    pub fn to_pair(self) -> [Real; 2] {
        [self.order_key, self.value]
    }
}
