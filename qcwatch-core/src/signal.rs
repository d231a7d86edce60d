//! Composite signals produced by expressions.

use crate::expr::Value;

/// A derived signal: either a constant or named columns aligned with the
/// session's time index.
#[derive(Debug, Clone, PartialEq)]
pub enum Signal {
    Constant(f64),
    Columns(Vec<(String, Vec<f64>)>),
}

impl Signal {
    /// Name the columns of an evaluated value. A single column takes `name`;
    /// several become `name 1`, `name 2`, ...
    pub fn from_value(name: &str, value: Value) -> Self {
        match value {
            Value::Scalar(x) => Signal::Constant(x),
            Value::Columns(cols) if cols.len() == 1 => {
                Signal::Columns(cols.into_iter().map(|c| (name.to_string(), c)).collect())
            }
            Value::Columns(cols) => Signal::Columns(
                cols.into_iter()
                    .enumerate()
                    .map(|(i, c)| (format!("{name} {}", i + 1), c))
                    .collect(),
            ),
        }
    }

    /// A single named column.
    pub fn column(name: impl Into<String>, values: Vec<f64>) -> Self {
        Signal::Columns(vec![(name.into(), values)])
    }

    /// Interpret a single-column signal as a time filter: non-zero, non-NaN
    /// samples are in scope.
    pub fn to_filter(&self) -> Option<Vec<bool>> {
        match self {
            Signal::Columns(cols) if cols.len() == 1 => {
                Some(cols[0].1.iter().map(|v| *v != 0.0 && !v.is_nan()).collect())
            }
            _ => None,
        }
    }
}
