//! Data source abstraction for loading time series.
//!
//! A source produces one [`Frame`] of raw samples. The QC plan runner does
//! not care where it came from: a JSON export on disk, an in-memory buffer
//! in tests, or anything else that can be shaped into an index and named
//! columns.

mod file;

pub use file::{FileSource, RawSeries};

use std::fmt::Debug;

use anyhow::Result;
use qcwatch_core::Frame;

/// Trait for loading time series from various sources.
///
/// # Example
///
/// ```no_run
/// use qcwatch::{DataSource, FileSource};
///
/// let mut source = FileSource::new("simple.json");
/// let frame = source.load().unwrap();
/// println!("{} rows from {}", frame.n_rows(), source.description());
/// ```
pub trait DataSource: Debug {
    /// Load the samples.
    fn load(&mut self) -> Result<Frame>;

    /// Returns a human-readable description of the source, used in logs.
    fn description(&self) -> &str;
}
