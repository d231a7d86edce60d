//! Incident records - one contiguous run of failed quality control samples.

use alloc::string::String;

use crate::Timestamp;

/// Error flag for rows whose timestamp is earlier than the previous row.
pub const NONMONOTONIC_TIMESTAMP: &str = "Nonmonotonic timestamp";
/// Error flag for rows whose timestamp repeats the previous row.
pub const DUPLICATE_TIMESTAMP: &str = "Duplicate timestamp";
/// Error flag for expected timestamps absent from the data.
pub const MISSING_TIMESTAMP: &str = "Missing timestamp";
/// Error flag for NaN / infinite samples.
pub const MISSING_DATA: &str = "Missing data";
/// Error flag for samples equal to a corrupt sentinel value.
pub const CORRUPT_DATA: &str = "Corrupt data";

/// A contiguous run of samples that failed one quality control test.
///
/// Records are immutable once created. An empty `variable_name` means the
/// record applies to whole rows (timestamp checks); an empty `system_name`
/// means the column has no owning system (derived signals).
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "minicbor", derive(minicbor::Encode, minicbor::Decode))]
pub struct IncidentRecord {
    /// Owning system of the failing column, or empty.
    #[cfg_attr(feature = "minicbor", n(0))]
    pub system_name: String,

    /// Failing column's variable name, or empty for whole-row incidents.
    #[cfg_attr(feature = "minicbor", n(1))]
    pub variable_name: String,

    /// Timestamp of the first failing sample.
    #[cfg_attr(feature = "minicbor", n(2))]
    pub start_time: Timestamp,

    /// Timestamp of the last failing sample (inclusive).
    #[cfg_attr(feature = "minicbor", n(3))]
    pub end_time: Timestamp,

    /// Number of consecutive failing samples.
    #[cfg_attr(feature = "minicbor", n(4))]
    pub run_length: u64,

    /// Human-readable error flag, e.g. `Data > upper bound, 1`.
    #[cfg_attr(feature = "minicbor", n(5))]
    pub error_description: String,
}

impl IncidentRecord {
    /// Create a builder for an incident record.
    pub fn builder() -> IncidentRecordBuilder {
        IncidentRecordBuilder::new()
    }

    /// True for records produced by the timestamp integrity check that do
    /// not map onto rows of the cleaned index.
    pub fn is_index_integrity(&self) -> bool {
        self.error_description == NONMONOTONIC_TIMESTAMP
            || self.error_description == DUPLICATE_TIMESTAMP
    }

    /// True if the record covers whole rows rather than a single column.
    pub fn is_whole_row(&self) -> bool {
        self.variable_name.is_empty()
    }

    /// Check whether `t` falls inside the record's time range (inclusive).
    pub fn covers(&self, t: Timestamp) -> bool {
        self.start_time <= t && t <= self.end_time
    }
}

/// Builder for `IncidentRecord`.
#[derive(Debug, Default)]
pub struct IncidentRecordBuilder {
    system_name: String,
    variable_name: String,
    start_time: Timestamp,
    end_time: Timestamp,
    run_length: u64,
    error_description: String,
}

impl IncidentRecordBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the owning system.
    pub fn system(mut self, name: impl Into<String>) -> Self {
        self.system_name = name.into();
        self
    }

    /// Set the variable name.
    pub fn variable(mut self, name: impl Into<String>) -> Self {
        self.variable_name = name.into();
        self
    }

    /// Set the time span and run length.
    pub fn span(mut self, start: Timestamp, end: Timestamp, run_length: u64) -> Self {
        self.start_time = start;
        self.end_time = end;
        self.run_length = run_length;
        self
    }

    /// Set the error description.
    pub fn error(mut self, description: impl Into<String>) -> Self {
        self.error_description = description.into();
        self
    }

    /// Build the record.
    pub fn build(self) -> IncidentRecord {
        IncidentRecord {
            system_name: self.system_name,
            variable_name: self.variable_name,
            start_time: self.start_time,
            end_time: self.end_time,
            run_length: self.run_length,
            error_description: self.error_description,
        }
    }
}
