//! Error types for the quality control engine.
//!
//! Only programmer errors surface here. Data problems (NaN, corrupt values,
//! timestamp gaps) are recorded as incidents, and usage problems (unknown
//! translation keys, empty frames) are logged and skipped.

use thiserror::Error;

use crate::expr::ExprError;

/// Errors returned by frame, mask and session operations.
#[derive(Debug, Error)]
pub enum QcError {
    /// A mask, filter or column does not match the frame's shape.
    #[error("Shape mismatch: expected {expected} rows, got {got}")]
    ShapeMismatch { expected: usize, got: usize },

    /// A column id or key is not present in the frame.
    #[error("Unknown column: {0}")]
    UnknownColumn(String),

    /// A column with the same key already exists.
    #[error("Duplicate column: {0}")]
    DuplicateColumn(String),

    /// The expected sampling frequency is zero or unparseable.
    #[error("Invalid frequency: {0}")]
    InvalidFrequency(String),

    /// A window or rolling-mean length could not be parsed.
    #[error("Invalid window: {0}")]
    InvalidWindow(String),

    /// An expression could not be parsed or evaluated.
    #[error("Expression error: {0}")]
    Expression(#[from] ExprError),
}

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, QcError>;
