//! Batch configuration, loadable from YAML.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tl_core::{Real, Smoothing, WindowSpec};
use tl_results::{ResultSink, RunLayout, RunRequirements};

use crate::error::{AppError, AppResult};
use crate::stats::{Evaluation, StatisticKind};

pub const DEFAULT_OUTPUT_DIR: &str = "SimulatedData";
pub const DEFAULT_OUTPUT_FILE: &str = "slip_drawbar.txt";
pub const DEFAULT_ORDER_PARAMETER: &str = "slip";
pub const DEFAULT_WINDOW_START: Real = 10.0;
pub const DEFAULT_WINDOW_END: Real = 20.0;

/// Everything a batch run needs. Missing YAML keys take the defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    pub root_dir: PathBuf,
    pub output_dir: PathBuf,
    pub output_file: String,
    pub window: WindowSpec,
    pub persist: bool,
    pub layout: RunLayout,
    pub statistic: StatisticKind,
    pub smoothing: Smoothing,
    /// Metadata key giving each row's order key.
    pub order_parameter: String,
    /// Metadata key giving each row's group key; `None` puts every run in
    /// `default_group_key`.
    pub group_parameter: Option<String>,
    pub default_group_key: Real,
    /// Output column labels; derived from the parameters and statistic when unset.
    pub labels: Option<Vec<String>>,
    pub parallel: bool,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            root_dir: PathBuf::from("."),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            output_file: DEFAULT_OUTPUT_FILE.to_string(),
            window: WindowSpec::new(DEFAULT_WINDOW_START, DEFAULT_WINDOW_END),
            persist: false,
            layout: RunLayout::default(),
            statistic: StatisticKind::default(),
            smoothing: Smoothing::None,
            order_parameter: DEFAULT_ORDER_PARAMETER.to_string(),
            group_parameter: None,
            default_group_key: 1.0,
            labels: None,
            parallel: false,
        }
    }
}

impl BatchConfig {
    pub fn for_root(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
            ..Self::default()
        }
    }

    /// Load from a YAML file and validate.
    pub fn load_yaml(path: &Path) -> AppResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| AppError::ConfigFileRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        let config: BatchConfig = serde_yaml::from_str(&content)
            .map_err(|e| AppError::Config(format!("Failed to parse config YAML: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Checks that need no file access. Run before touching any run folder.
    pub fn validate(&self) -> AppResult<()> {
        self.evaluation().validate()?;

        if self.order_parameter.trim().is_empty() {
            return Err(AppError::Config("order_parameter is empty".into()));
        }
        if let Some(group) = &self.group_parameter
            && group.trim().is_empty()
        {
            return Err(AppError::Config("group_parameter is empty".into()));
        }
        if !self.default_group_key.is_finite() {
            return Err(AppError::Config(format!(
                "default_group_key must be finite, got {}",
                self.default_group_key
            )));
        }
        if self.layout.metadata_file.is_empty() || self.layout.series_file.is_empty() {
            return Err(AppError::Config("run layout file names must be set".into()));
        }
        if self.persist && self.output_file.trim().is_empty() {
            return Err(AppError::Config("output_file is empty".into()));
        }
        if let Some(labels) = &self.labels
            && labels.len() != self.column_count()
        {
            return Err(AppError::Config(format!(
                "expected {} labels, got {}",
                self.column_count(),
                labels.len()
            )));
        }
        Ok(())
    }

    pub fn evaluation(&self) -> Evaluation {
        Evaluation {
            statistic: self.statistic.clone(),
            window: self.window,
            smoothing: self.smoothing,
        }
    }

    /// Metadata keys and channels every run must provide.
    pub fn requirements(&self) -> RunRequirements {
        let mut parameters = vec![self.order_parameter.clone()];
        if let Some(group) = &self.group_parameter
            && group != &self.order_parameter
        {
            parameters.push(group.clone());
        }
        RunRequirements::new(parameters, self.statistic.required_channels())
    }

    pub fn is_grouped(&self) -> bool {
        self.group_parameter.is_some()
    }

    fn column_count(&self) -> usize {
        if self.is_grouped() { 3 } else { 2 }
    }

    /// Output column labels, e.g. `Scale, Slip, Drawbar` or `Slip, Drawbar`.
    pub fn column_labels(&self) -> Vec<String> {
        if let Some(labels) = &self.labels {
            return labels.clone();
        }
        let mut labels = Vec::with_capacity(3);
        if let Some(group) = &self.group_parameter {
            labels.push(capitalize(group));
        }
        labels.push(capitalize(&self.order_parameter));
        labels.push(self.statistic.label());
        labels
    }

    pub fn output_path(&self) -> PathBuf {
        self.output_dir.join(&self.output_file)
    }

    pub fn sink(&self) -> ResultSink {
        if self.persist {
            ResultSink::File {
                path: self.output_path(),
                labels: self.column_labels(),
            }
        } else {
            ResultSink::Disabled
        }
    }
}

fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
