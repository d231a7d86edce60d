//! # qcwatch
//!
//! Run quality control plans over time-series data files.
//!
//! This crate wires the [`qcwatch_core`] engine to the outside world: a
//! [`QcConfig`] plan loaded from TOML/YAML/JSON, a [`DataSource`] that
//! produces a frame of samples, a [`Pipeline`] that runs the plan's checks in
//! order, and JSON/text renderers for the resulting report.
//!
//! ```text
//! ┌────────────┐    ┌────────────┐    ┌─────────────┐    ┌────────────┐
//! │   source   │───▶│  pipeline  │───▶│   Monitor   │───▶│   export   │
//! │ (samples)  │    │ (QcConfig) │    │  (checks)   │    │ (QcReport) │
//! └────────────┘    └────────────┘    └─────────────┘    └────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! qcwatch --data simple.json --config plan.toml --export report.json
//! ```
//!
//! ### As a library
//!
//! ```no_run
//! use qcwatch::{DataSource, FileSource, Pipeline, QcConfig};
//!
//! let config = QcConfig::load("plan.toml".as_ref()).unwrap();
//! let frame = FileSource::new("simple.json").load().unwrap();
//! let report = Pipeline::new(config).run(frame, false).unwrap();
//! println!("QCI: {:?}", report.overall_index);
//! ```

pub mod config;
pub mod export;
pub mod pipeline;
pub mod source;

pub use config::{BoundValue, CheckEntry, CompositeSignal, QcConfig, Specification, TranslationEntry};
pub use pipeline::Pipeline;
pub use source::{DataSource, FileSource, RawSeries};

pub use qcwatch_core::{Frame, IncidentRecord, Monitor, QcReport};
