//! The quality control check library.
//!
//! Each check is split in two: a pure function in this module tree that turns
//! samples into failure flags, and a [`Monitor`](crate::Monitor) method that
//! selects the columns, resolves bounds and hands the result to the recorder.

mod data;
mod delta;
mod range;
mod timestamp;

use std::fmt;
use std::time::Duration;

pub use data::{corrupt_failures, missing_failures};
pub use delta::{delta_failures, window_deltas, DeltaCheck, WindowDelta};
pub use range::{increments, zscores, IncrementCheck, OutlierCheck};
pub use timestamp::{duplicate_failures, missing_bins, missing_on_grid, nonmonotonic_failures, TimestampCheck};

use crate::expr::Expression;

/// One side of a bounds check: a literal or an expression evaluated in the
/// session (for example `{Max Power} * 1.1`).
#[derive(Debug, Clone, PartialEq)]
pub enum Bound {
    Value(f64),
    Expr(Expression),
}

impl From<f64> for Bound {
    fn from(v: f64) -> Self {
        Bound::Value(v)
    }
}

impl From<Expression> for Bound {
    fn from(e: Expression) -> Self {
        Bound::Expr(e)
    }
}

/// Lower and upper bound; a missing side is unbounded.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Bounds {
    pub lower: Option<Bound>,
    pub upper: Option<Bound>,
}

impl Bounds {
    /// Literal bounds, either side optional.
    pub fn new(lower: Option<f64>, upper: Option<f64>) -> Self {
        Self {
            lower: lower.map(Bound::Value),
            upper: upper.map(Bound::Value),
        }
    }

    pub fn between(lower: f64, upper: f64) -> Self {
        Self::new(Some(lower), Some(upper))
    }

    pub fn at_least(lower: f64) -> Self {
        Self::new(Some(lower), None)
    }

    pub fn at_most(upper: f64) -> Self {
        Self::new(None, Some(upper))
    }

    /// Replace the lower side.
    pub fn with_lower(mut self, bound: impl Into<Bound>) -> Self {
        self.lower = Some(bound.into());
        self
    }

    /// Replace the upper side.
    pub fn with_upper(mut self, bound: impl Into<Bound>) -> Self {
        self.upper = Some(bound.into());
        self
    }

    /// Sides that are set, lower first.
    pub fn sides(&self) -> impl Iterator<Item = (Side, &Bound)> {
        [(Side::Lower, self.lower.as_ref()), (Side::Upper, self.upper.as_ref())]
            .into_iter()
            .filter_map(|(side, b)| b.map(|b| (side, b)))
    }
}

/// Which side of a bound a sample crossed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Lower,
    Upper,
}

impl Side {
    /// True if `value` violates `bound` on this side. `NaN` never fails.
    pub fn fails(self, value: f64, bound: f64) -> bool {
        match self {
            Side::Lower => value < bound,
            Side::Upper => value > bound,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Lower => f.write_str("< lower bound"),
            Side::Upper => f.write_str("> upper bound"),
        }
    }
}

/// A bound after evaluation: one value or one value per row.
#[derive(Debug, Clone, PartialEq)]
pub enum Threshold {
    Scalar(f64),
    PerRow(Vec<f64>),
}

impl Threshold {
    /// Bound that applies at `row`.
    pub fn at(&self, row: usize) -> f64 {
        match self {
            Threshold::Scalar(x) => *x,
            Threshold::PerRow(v) => v.get(row).copied().unwrap_or(f64::NAN),
        }
    }
}

/// Flag every sample that crosses `threshold` on `side`.
pub fn bound_failures(columns: &[Vec<f64>], threshold: &Threshold, side: Side) -> Vec<Vec<bool>> {
    columns
        .iter()
        .map(|col| {
            col.iter()
                .enumerate()
                .map(|(row, v)| side.fails(*v, threshold.at(row)))
                .collect()
        })
        .collect()
}

/// Error description, e.g. `Data < lower bound, 0` or
/// `|Increment| > upper bound, 0.6`.
pub fn describe(prefix: &str, side: Side, bound: impl fmt::Display) -> String {
    format!("{prefix} {side}, {bound}")
}

/// Prefix for checks that optionally take the absolute value.
pub(crate) fn prefix(name: &str, absolute_value: bool) -> String {
    if absolute_value {
        format!("|{name}|")
    } else {
        name.to_string()
    }
}

/// Settings shared by every bounds check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckOptions {
    /// Smooth the data with a rolling mean of this length first.
    pub rolling_mean: Option<Duration>,
    /// Shortest run of failures worth recording.
    pub min_failures: usize,
}

impl Default for CheckOptions {
    fn default() -> Self {
        Self {
            rolling_mean: None,
            min_failures: 1,
        }
    }
}

impl CheckOptions {
    pub fn min_failures(mut self, n: usize) -> Self {
        self.min_failures = n;
        self
    }

    pub fn rolling_mean(mut self, window: Duration) -> Self {
        self.rolling_mean = Some(window);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn descriptions() {
        assert_eq!(describe("Data", Side::Lower, 0.0), "Data < lower bound, 0");
        assert_eq!(describe("Data", Side::Upper, 1.0), "Data > upper bound, 1");
        assert_eq!(
            describe(&prefix("Increment", true), Side::Lower, 0.0001),
            "|Increment| < lower bound, 0.0001"
        );
        assert_eq!(describe(&prefix("Delta", false), Side::Upper, -7.5), "Delta > upper bound, -7.5");
    }

    #[test]
    fn sides_skip_unbounded() {
        let b = Bounds::at_most(0.25);
        let sides: Vec<_> = b.sides().map(|(s, _)| s).collect();
        assert_eq!(sides, vec![Side::Upper]);
        assert_eq!(Bounds::between(0.0, 1.0).sides().count(), 2);
        assert_eq!(Bounds::default().sides().count(), 0);
    }

    #[test]
    fn failures_against_scalar_and_per_row_bounds() {
        let cols = vec![vec![-0.1, 0.5, 1.2, f64::NAN]];
        assert_eq!(
            bound_failures(&cols, &Threshold::Scalar(0.0), Side::Lower),
            vec![vec![true, false, false, false]]
        );
        assert_eq!(
            bound_failures(&cols, &Threshold::Scalar(1.0), Side::Upper),
            vec![vec![false, false, true, false]]
        );
        let per_row = Threshold::PerRow(vec![0.0, 0.0, 2.0, 0.0]);
        assert_eq!(
            bound_failures(&cols, &per_row, Side::Upper),
            vec![vec![false, true, false, false]]
        );
    }
}
