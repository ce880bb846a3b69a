//! Run folder loading and discovery.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tl_core::Real;
use tracing::debug;

use crate::types::{Parameters, RunLayout, RunRecord, RunRequirements, Series, TIME_CHANNEL};
use crate::{ResultsError, ResultsResult};

/// Immediate subdirectories of `root`, sorted by name.
pub fn discover_runs(root: &Path) -> ResultsResult<Vec<PathBuf>> {
    if !root.is_dir() {
        return Err(ResultsError::MissingArtifact {
            path: root.to_path_buf(),
        });
    }

    let mut runs = Vec::new();
    for entry in fs::read_dir(root)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir() {
            runs.push(path);
        } else {
            debug!(path = %path.display(), "skipping non-directory entry");
        }
    }
    runs.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(runs)
}

/// Run id for a folder or file: its final path component.
pub fn run_id_for(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Load one run folder: metadata file plus series file.
pub fn load_run(
    dir: &Path,
    layout: &RunLayout,
    requirements: &RunRequirements,
) -> ResultsResult<RunRecord> {
    let metadata_path = dir.join(&layout.metadata_file);
    let series_path = dir.join(&layout.series_file);

    for path in [&metadata_path, &series_path] {
        if !path.is_file() {
            return Err(ResultsError::MissingArtifact { path: path.clone() });
        }
    }

    let parameters = load_metadata(&metadata_path, &requirements.parameters)?;
    let series = read_series(
        &series_path,
        &requirements.channels,
        requirements.keep_all_channels,
    )?;

    Ok(RunRecord {
        run_id: run_id_for(dir),
        parameters,
        series,
    })
}

/// Load numeric key/value metadata from a JSON object.
///
/// Every finite numeric entry (numbers, or strings that parse as numbers) is
/// kept; each key in `required` must be present, numeric and finite.
pub fn load_metadata(path: &Path, required: &[String]) -> ResultsResult<Parameters> {
    if !path.is_file() {
        return Err(ResultsError::MissingArtifact {
            path: path.to_path_buf(),
        });
    }

    let malformed = |reason: String| ResultsError::MalformedMetadata {
        path: path.to_path_buf(),
        reason,
    };

    let content = fs::read_to_string(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::InvalidData => malformed("file is not valid UTF-8".to_string()),
        _ => ResultsError::Io(e),
    })?;
    let value: Value = serde_json::from_str(&content).map_err(|e| malformed(e.to_string()))?;
    let object = value
        .as_object()
        .ok_or_else(|| malformed("expected a JSON object".to_string()))?;

    let parameters: Parameters = object
        .iter()
        .filter_map(|(key, v)| numeric_value(v).map(|x| (key.clone(), x)))
        .collect();

    for key in required {
        if !parameters.contains_key(key) {
            let reason = match object.get(key) {
                Some(v) => format!("parameter '{key}' is not a finite number: {v}"),
                None => format!("missing required parameter '{key}'"),
            };
            return Err(malformed(reason));
        }
    }

    debug!(path = %path.display(), count = parameters.len(), "loaded metadata");
    Ok(parameters)
}

fn numeric_value(value: &Value) -> Option<Real> {
    let parsed: Option<Real> = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    };
    parsed.filter(|x| x.is_finite())
}

/// Load the time channel plus `channels` from a delimited file with a header row.
///
/// Header names and cells are trimmed, so `t, f_x` and `t,f_x` are equivalent.
pub fn load_series_file(path: &Path, channels: &[String]) -> ResultsResult<Series> {
    read_series(path, channels, false)
}

/// Like [`load_series_file`], but also keeps every other column whose cells
/// all parse as numbers.
pub fn load_series_all_channels(path: &Path, channels: &[String]) -> ResultsResult<Series> {
    read_series(path, channels, true)
}

fn read_series(path: &Path, channels: &[String], keep_all: bool) -> ResultsResult<Series> {
    if !path.is_file() {
        return Err(ResultsError::MissingArtifact {
            path: path.to_path_buf(),
        });
    }

    let malformed = |reason: String| ResultsError::MalformedSeries {
        path: path.to_path_buf(),
        reason,
    };

    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)?;
    let headers = reader
        .headers()
        .map_err(|e| malformed(e.to_string()))?
        .clone();

    let mut required: Vec<&str> = vec![TIME_CHANNEL];
    for name in channels {
        if !required.contains(&name.as_str()) {
            required.push(name.as_str());
        }
    }

    let mut selected: Vec<(&str, usize)> = required
        .iter()
        .map(|&name| {
            headers
                .iter()
                .position(|h| h == name)
                .map(|idx| (name, idx))
                .ok_or_else(|| malformed(format!("missing channel '{name}'")))
        })
        .collect::<ResultsResult<Vec<_>>>()?;
    let required_count = selected.len();
    if keep_all {
        for (idx, name) in headers.iter().enumerate() {
            if !name.is_empty() && !selected.iter().any(|(n, _)| *n == name) {
                selected.push((name, idx));
            }
        }
    }

    // optional columns drop out on their first non-numeric cell
    let mut columns: Vec<Option<Vec<Real>>> = vec![Some(Vec::new()); selected.len()];
    for (row, record) in reader.records().enumerate() {
        let record = record.map_err(|e| malformed(e.to_string()))?;
        for (slot, (k, &(name, idx))) in columns.iter_mut().zip(selected.iter().enumerate()) {
            let Some(column) = slot.as_mut() else {
                continue;
            };
            let cell = record.get(idx).unwrap_or("");
            match cell.parse::<Real>() {
                Ok(value) => column.push(value),
                Err(_) if k >= required_count => {
                    debug!(path = %path.display(), channel = name, "dropping non-numeric channel");
                    *slot = None;
                }
                Err(_) => {
                    // header is line 1
                    return Err(malformed(format!(
                        "line {}, channel '{name}': invalid number '{cell}'",
                        row + 2
                    )));
                }
            }
        }
    }

    let kept = selected
        .iter()
        .zip(columns)
        .filter_map(|(&(name, _), column)| column.map(|c| (name, c)));
    let series = Series::from_columns(kept).map_err(malformed)?;
    if series.is_empty() {
        return Err(malformed("no samples".to_string()));
    }

    debug!(path = %path.display(), samples = series.len(), "loaded series");
    Ok(series)
}
