//! QcReport - the result of one quality control session, ready for rendering.

use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

use crate::{IncidentRecord, Timestamp, SCHEMA_MINOR, SCHEMA_VERSION};

/// Layout version stamped on every report, written as `major.minor`.
///
/// A reader can open any report with its own major version; newer minor
/// versions only add optional fields it will skip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "minicbor", derive(minicbor::Encode, minicbor::Decode))]
pub struct ReportSchema {
    #[cfg_attr(feature = "minicbor", n(0))]
    pub major: u32,
    #[cfg_attr(feature = "minicbor", n(1))]
    pub minor: u32,
}

impl ReportSchema {
    /// The layout written by this library.
    pub const CURRENT: ReportSchema = ReportSchema {
        major: SCHEMA_VERSION,
        minor: SCHEMA_MINOR,
    };

    /// Whether this library can read a report stamped with this layout.
    pub fn is_readable(&self) -> bool {
        self.major == Self::CURRENT.major
    }

    /// Whether the report may carry fields this library does not know.
    pub fn is_newer(&self) -> bool {
        self.is_readable() && self.minor > Self::CURRENT.minor
    }
}

impl Default for ReportSchema {
    fn default() -> Self {
        Self::CURRENT
    }
}

impl fmt::Display for ReportSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Quality control index for a single calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "minicbor", derive(minicbor::Encode, minicbor::Decode))]
pub struct DailyIndex {
    /// Midnight at the start of the day.
    #[cfg_attr(feature = "minicbor", n(0))]
    pub day: Timestamp,

    /// Fraction of eligible samples that passed every test, in `[0, 1]`.
    #[cfg_attr(feature = "minicbor", n(1))]
    pub value: f64,
}

/// Summary of a quality control run.
///
/// This is the top-level type handed to report renderers. It carries the
/// incident table, the quality control index and any notes raised while the
/// checks ran (skipped checks, failed expressions).
///
/// # Example
///
/// ```rust
/// use qcwatch_types::{QcReport, Timestamp};
///
/// let report = QcReport::builder()
///     .timestamp_ms(1_420_070_400_000)
///     .overall_index(0.87)
///     .note("Undefined key: Wave")
///     .build();
///
/// assert_eq!(report.notes.len(), 1);
/// assert!(report.incidents.is_empty());
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "minicbor", derive(minicbor::Encode, minicbor::Decode))]
pub struct QcReport {
    /// Schema version for forward compatibility.
    #[cfg_attr(feature = "minicbor", n(0))]
    pub version: ReportSchema,

    /// Unix timestamp in milliseconds when this report was generated.
    #[cfg_attr(feature = "minicbor", n(1))]
    pub timestamp_ms: u64,

    /// Every incident recorded during the run, in recording order.
    #[cfg_attr(feature = "minicbor", n(2))]
    pub incidents: Vec<IncidentRecord>,

    /// Per-day quality control index (empty when computed overall).
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Vec::is_empty"))]
    #[cfg_attr(feature = "minicbor", n(3))]
    pub daily_index: Vec<DailyIndex>,

    /// Overall quality control index (absent when computed per day).
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    #[cfg_attr(feature = "minicbor", n(4))]
    pub overall_index: Option<f64>,

    /// Warnings raised during the run that belong in the report.
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Vec::is_empty"))]
    #[cfg_attr(feature = "minicbor", n(5))]
    pub notes: Vec<String>,
}

impl QcReport {
    /// Create a builder for constructing reports.
    pub fn builder() -> QcReportBuilder {
        QcReportBuilder::new()
    }

    /// Number of incident records.
    pub fn len(&self) -> usize {
        self.incidents.len()
    }

    /// Check if no incidents were recorded.
    pub fn is_empty(&self) -> bool {
        self.incidents.is_empty()
    }

    /// Total failing samples across all incidents.
    pub fn total_failed_samples(&self) -> u64 {
        self.incidents.iter().map(|r| r.run_length).sum()
    }

    /// Iterate incidents with the given error description.
    pub fn incidents_with<'a>(
        &'a self,
        description: &'a str,
    ) -> impl Iterator<Item = &'a IncidentRecord> + 'a {
        self.incidents
            .iter()
            .filter(move |r| r.error_description == description)
    }
}

/// Builder for constructing `QcReport` instances.
#[derive(Debug, Default)]
pub struct QcReportBuilder {
    timestamp_ms: Option<u64>,
    incidents: Vec<IncidentRecord>,
    daily_index: Vec<DailyIndex>,
    overall_index: Option<f64>,
    notes: Vec<String>,
}

impl QcReportBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a specific timestamp (milliseconds since Unix epoch).
    pub fn timestamp_ms(mut self, ts: u64) -> Self {
        self.timestamp_ms = Some(ts);
        self
    }

    /// Append incident records.
    pub fn incidents(mut self, records: impl IntoIterator<Item = IncidentRecord>) -> Self {
        self.incidents.extend(records);
        self
    }

    /// Set the per-day quality control index.
    pub fn daily_index(mut self, days: Vec<DailyIndex>) -> Self {
        self.daily_index = days;
        self
    }

    /// Set the overall quality control index.
    pub fn overall_index(mut self, value: f64) -> Self {
        self.overall_index = Some(value);
        self
    }

    /// Append a note.
    pub fn note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    /// Append several notes.
    pub fn notes(mut self, notes: impl IntoIterator<Item = String>) -> Self {
        self.notes.extend(notes);
        self
    }

    /// Build the report.
    #[cfg(feature = "std")]
    pub fn build(self) -> QcReport {
        let timestamp_ms = self.timestamp_ms.unwrap_or_else(current_timestamp_ms);
        self.finish(timestamp_ms)
    }

    /// Build the report with a specific timestamp (for no_std).
    #[cfg(not(feature = "std"))]
    pub fn build(self) -> QcReport {
        let timestamp_ms = self.timestamp_ms.unwrap_or(0);
        self.finish(timestamp_ms)
    }

    fn finish(self, timestamp_ms: u64) -> QcReport {
        QcReport {
            version: ReportSchema::CURRENT,
            timestamp_ms,
            incidents: self.incidents,
            daily_index: self.daily_index,
            overall_index: self.overall_index,
            notes: self.notes,
        }
    }
}

/// Get current timestamp in milliseconds since Unix epoch.
#[cfg(feature = "std")]
fn current_timestamp_ms() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
