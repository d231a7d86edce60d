//! # qcwatch-types
//!
//! Core types for time-series quality control results. This crate defines the
//! schema shared by the qcwatch engine and anything that renders or archives
//! its output (HTML reports, dashboards, CSV exports).
//!
//! ## Design Goals
//!
//! - **Zero required dependencies**: Core types work without any serialization framework
//! - **Optional serialization**: Enable `serde` and/or `minicbor` features as needed
//! - **Exact time arithmetic**: Timestamps are integer milliseconds, so day
//!   bucketing and range membership never suffer rounding
//! - **Versioned schema**: Reports include version info for forward compatibility
//!
//! ## Features
//!
//! - `std` (default): Standard library support
//! - `serde`: JSON/YAML/etc. serialization via serde
//! - `minicbor`: Compact binary serialization via CBOR
//! - `chrono`: Conversions between [`Timestamp`] and `chrono::NaiveDateTime`
//! - `all`: Enable all of the above
//!
//! ## Example
//!
//! ```rust
//! use qcwatch_types::{IncidentRecord, QcReport, Timestamp};
//!
//! let record = IncidentRecord::builder()
//!     .system("Simple")
//!     .variable("D")
//!     .span(Timestamp::from_secs(63_900), Timestamp::from_secs(65_700), 3)
//!     .error("Missing data")
//!     .build();
//!
//! let report = QcReport::builder().incidents([record]).overall_index(0.87).build();
//! assert_eq!(report.total_failed_samples(), 3);
//! ```

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

mod incident;
mod report;
mod timestamp;

pub use incident::*;
pub use report::*;
pub use timestamp::*;

/// Major version of the report layout; bumped when incident or report fields
/// change incompatibly.
pub const SCHEMA_VERSION: u32 = 1;

/// Minor version of the report layout; bumped for new optional fields.
pub const SCHEMA_MINOR: u32 = 0;
