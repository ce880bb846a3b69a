//! Flat output tables.
//!
//! Layout: one `# label1, label2, ...` comment line followed by one
//! space-separated row of numbers per data point. Files are written to a
//! temporary sibling and renamed into place, so the target path only ever
//! holds a complete table.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use tl_core::Real;
use tracing::info;

use crate::{ResultsError, ResultsResult};

/// Where aggregated rows go, if anywhere.
#[derive(Debug, Clone, PartialEq)]
pub enum ResultSink {
    Disabled,
    File { path: PathBuf, labels: Vec<String> },
}

impl ResultSink {
    /// Persist `rows`; returns the written path, or `None` when disabled.
    pub fn write<R: AsRef<[Real]>>(&self, rows: &[R]) -> ResultsResult<Option<PathBuf>> {
        match self {
            ResultSink::Disabled => Ok(None),
            ResultSink::File { path, labels } => {
                if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    fs::create_dir_all(parent)?;
                }
                write_table(path, labels.as_slice(), rows)?;
                Ok(Some(path.clone()))
            }
        }
    }
}

/// A table read back from disk.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub labels: Vec<String>,
    pub rows: Vec<Vec<Real>>,
}

/// Atomically write `rows` under a `# labels` header.
pub fn write_table<L, R>(path: &Path, labels: &[L], rows: &[R]) -> ResultsResult<()>
where
    L: AsRef<str>,
    R: AsRef<[Real]>,
{
    let width = labels.len();
    if let Some((i, row)) = rows
        .iter()
        .enumerate()
        .find(|(_, r)| width > 0 && r.as_ref().len() != width)
    {
        return Err(ResultsError::MalformedTable {
            path: path.to_path_buf(),
            reason: format!(
                "row {i} has {} values, expected {width}",
                row.as_ref().len()
            ),
        });
    }

    let file_name = path
        .file_name()
        .ok_or_else(|| ResultsError::InvalidPath {
            message: format!("{} has no file name", path.display()),
        })?
        .to_string_lossy();
    let tmp_path = path.with_file_name(format!(".{}.tmp.{}", file_name, std::process::id()));

    let result = write_contents(&tmp_path, labels, rows).and_then(|()| {
        fs::rename(&tmp_path, path)?;
        Ok(())
    });
    if result.is_err() {
        let _ = fs::remove_file(&tmp_path);
    }
    result?;

    info!(path = %path.display(), rows = rows.len(), "wrote result table");
    Ok(())
}

fn write_contents<L, R>(tmp_path: &Path, labels: &[L], rows: &[R]) -> ResultsResult<()>
where
    L: AsRef<str>,
    R: AsRef<[Real]>,
{
    let mut file = File::create(tmp_path)?;
    let header: Vec<&str> = labels.iter().map(AsRef::as_ref).collect();
    writeln!(file, "# {}", header.join(", "))?;

    let mut wtr = csv::WriterBuilder::new()
        .delimiter(b' ')
        .has_headers(false)
        .from_writer(file);
    for row in rows {
        wtr.write_record(row.as_ref().iter().map(|v| format!("{v:.18e}")))?;
    }
    let file = wtr.into_inner().map_err(|e| e.into_error())?;
    file.sync_all()?;
    Ok(())
}

/// Read a table written by [`write_table`].
///
/// Comment lines are skipped; values may be separated by whitespace or commas.
/// Labels come from the first line if it is a comment.
pub fn read_table(path: &Path) -> ResultsResult<Table> {
    if !path.is_file() {
        return Err(ResultsError::MissingArtifact {
            path: path.to_path_buf(),
        });
    }
    let content = fs::read_to_string(path)?;

    let labels = content
        .lines()
        .next()
        .and_then(|line| line.strip_prefix('#'))
        .map(|header| {
            header
                .split(',')
                .map(|l| l.trim().to_string())
                .filter(|l| !l.is_empty())
                .collect()
        })
        .unwrap_or_default();

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .comment(Some(b'#'))
        .delimiter(b' ')
        .flexible(true)
        .from_reader(content.as_bytes());

    let mut rows: Vec<Vec<Real>> = Vec::new();
    for record in reader.records() {
        let record = record?;
        let row = record
            .iter()
            .flat_map(|field| field.split(|c: char| c == ',' || c.is_whitespace()))
            .filter(|token| !token.is_empty())
            .map(|token| {
                token.parse::<Real>().map_err(|_| ResultsError::MalformedTable {
                    path: path.to_path_buf(),
                    reason: format!("invalid number '{token}'"),
                })
            })
            .collect::<ResultsResult<Vec<Real>>>()?;
        if row.is_empty() {
            continue;
        }
        if let Some(first) = rows.first()
            && first.len() != row.len()
        {
            return Err(ResultsError::MalformedTable {
                path: path.to_path_buf(),
                reason: format!("row has {} values, expected {}", row.len(), first.len()),
            });
        }
        rows.push(row);
    }

    Ok(Table { labels, rows })
}
