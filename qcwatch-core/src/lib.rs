//! # qcwatch-core
//!
//! Quality control engine for time-indexed sensor data.
//!
//! Checks turn a [`Frame`] of samples into pass/fail [`Mask`]s; the recorder
//! collapses each contiguous run of failures into an
//! [`IncidentRecord`](qcwatch_types::IncidentRecord). The incident table is
//! then folded back into an aggregate mask and scored as the fraction of
//! samples that passed every test.
//!
//! ## Quick Start
//!
//! ```rust
//! use qcwatch_core::metrics::{qci, QualityIndex};
//! use qcwatch_core::{Bounds, CheckOptions, Frame, Monitor, TimestampCheck};
//! use qcwatch_types::Timestamp;
//!
//! let index = (0..5).map(|h| Timestamp::from_secs(h * 3600)).collect();
//! let frame = Frame::new(index)
//!     .with_column("A", vec![0.0, 2.0, 2.0, 2.0, 2.0])
//!     .unwrap()
//!     .with_column("B", vec![0.0, 2.0, 0.0, 0.0, 0.0])
//!     .unwrap()
//!     .with_column("C", vec![0.0; 5])
//!     .unwrap();
//!
//! let mut monitor = Monitor::new();
//! monitor.add_frame(frame, Some("Simple"), true).unwrap();
//! monitor.check_timestamp(&TimestampCheck::new(3600)).unwrap();
//! monitor.check_missing(None, 1).unwrap();
//! monitor
//!     .check_range(&Bounds::between(0.0, 1.0), None, &CheckOptions::default())
//!     .unwrap();
//!
//! let mask = monitor.test_results_mask(None).unwrap();
//! let QualityIndex::Overall(score) = qci(&mask, None, false).unwrap() else {
//!     unreachable!()
//! };
//! assert!((score - 10.0 / 15.0).abs() < 1e-12);
//! ```
//!
//! ## Modules
//!
//! - [`time`]: index rounding, elapsed/clock time, regular grids, window parsing
//! - [`blocks`]: run-length extraction of failure runs
//! - [`window`]: rolling statistics over right-closed time windows
//! - [`checks`]: the pure check functions behind [`Monitor`]'s check methods
//! - [`expr`]: the sandboxed expression language for composite signals and bounds
//! - [`metrics`]: quality control index, RMSE, time integrals, detection rates
//! - [`pv`]: photovoltaic performance metrics
//! - [`results`]: incident table helpers for reports

pub mod blocks;
pub mod checks;
mod error;
pub mod expr;
mod frame;
mod mask;
pub mod metrics;
mod monitor;
pub mod pv;
pub mod results;
mod signal;
pub mod time;
pub mod window;

pub use checks::{Bound, Bounds, CheckOptions, DeltaCheck, IncrementCheck, OutlierCheck, Side, TimestampCheck};
pub use error::{QcError, Result};
pub use expr::{ExprError, Expression, Value};
pub use frame::{ColumnId, ColumnIndex, ColumnKey, Frame, SYSTEM_SEPARATOR};
pub use mask::{Mask, MaskTarget};
pub use metrics::QualityIndex;
pub use monitor::{Monitor, CLOCK_TIME, ELAPSED_TIME};
pub use signal::Signal;

// Re-export types for convenience
pub use qcwatch_types::{DailyIndex, IncidentRecord, QcReport, Timestamp};
