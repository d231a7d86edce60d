//! File-based data source.
//!
//! Reads a JSON document of the form
//!
//! ```json
//! {
//!   "index": ["2015-01-01 00:00:00", "2015-01-01 00:15:00"],
//!   "columns": { "A": [0.1, 0.2], "B": [null, 0.4] }
//! }
//! ```
//!
//! Timestamps are naive wall-clock times (`YYYY-MM-DD HH:MM:SS[.fff]`, with
//! a space or `T`). `null` samples load as `NaN`. Columns are ordered by
//! name.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::NaiveDateTime;
use qcwatch_core::{ColumnKey, Frame};
use qcwatch_types::Timestamp;
use serde::Deserialize;

use super::DataSource;

const TIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M"];

/// The on-disk shape of a time series document.
#[derive(Debug, Clone, Deserialize)]
pub struct RawSeries {
    pub index: Vec<String>,
    pub columns: BTreeMap<String, Vec<Option<f64>>>,
}

impl RawSeries {
    /// Convert into a frame. Column names are split into system and
    /// variable on `:`.
    pub fn into_frame(self) -> Result<Frame> {
        let index = self
            .index
            .iter()
            .map(|s| parse_time(s))
            .collect::<Result<Vec<_>>>()?;
        let mut frame = Frame::new(index);
        for (name, values) in self.columns {
            let values = values.into_iter().map(|v| v.unwrap_or(f64::NAN)).collect();
            frame
                .push_column(ColumnKey::parse(&name), values)
                .with_context(|| format!("column {name}"))?;
        }
        Ok(frame)
    }
}

/// Parse a naive timestamp in any of the accepted formats.
pub fn parse_time(s: &str) -> Result<Timestamp> {
    let s = s.trim();
    for format in TIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, format) {
            return Ok(Timestamp::from_naive(dt));
        }
    }
    bail!("Unknown timestamp format: {}", s)
}

/// A data source that reads a time series from a JSON file.
#[derive(Debug)]
pub struct FileSource {
    path: PathBuf,
    description: String,
}

impl FileSource {
    /// Create a new file source for the given path.
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref().to_path_buf();
        let description = format!("file: {}", path.display());
        Self { path, description }
    }

    /// Returns the path being read.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl DataSource for FileSource {
    fn load(&mut self) -> Result<Frame> {
        let content = fs::read_to_string(&self.path).with_context(|| format!("Read error: {}", self.path.display()))?;
        let raw: RawSeries =
            serde_json::from_str(&content).with_context(|| format!("Parse error: {}", self.path.display()))?;
        raw.into_frame()
    }

    fn description(&self) -> &str {
        &self.description
    }
}
