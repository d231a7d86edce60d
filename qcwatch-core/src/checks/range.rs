//! Derived series for the increment and outlier checks.

use std::time::Duration;

use qcwatch_types::Timestamp;

use super::CheckOptions;
use crate::error::Result;
use crate::window::{mean_std, rolling_mean, rolling_std};

/// Parameters for [`Monitor::check_increment`](crate::Monitor::check_increment).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncrementCheck {
    /// Row shift used for the difference.
    pub increment: usize,
    pub absolute_value: bool,
    pub options: CheckOptions,
}

impl Default for IncrementCheck {
    fn default() -> Self {
        Self {
            increment: 1,
            absolute_value: true,
            options: CheckOptions::default(),
        }
    }
}

/// Parameters for [`Monitor::check_outlier`](crate::Monitor::check_outlier).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutlierCheck {
    /// Normalisation window; `None` uses the whole column.
    pub window: Option<Duration>,
    pub absolute_value: bool,
    pub options: CheckOptions,
}

impl Default for OutlierCheck {
    fn default() -> Self {
        Self {
            window: Some(Duration::from_secs(3600)),
            absolute_value: true,
            options: CheckOptions::default(),
        }
    }
}

/// `x[i] - x[i - n]`, optionally absolute. The first `n` rows are `NaN`.
pub fn increments(values: &[f64], n: usize, absolute_value: bool) -> Vec<f64> {
    (0..values.len())
        .map(|i| {
            if i < n {
                return f64::NAN;
            }
            let d = values[i] - values[i - n];
            if absolute_value {
                d.abs()
            } else {
                d
            }
        })
        .collect()
}

/// Values normalised as `(x - mean) / std`, optionally absolute.
///
/// With a window, mean and sample standard deviation are rolling and rows up
/// to `t_0 + window` are `NaN`. Without one, whole-column statistics are
/// used. Infinite results become `NaN`.
pub fn zscores(
    index: &[Timestamp],
    values: &[f64],
    window: Option<Duration>,
    absolute_value: bool,
) -> Result<Vec<f64>> {
    let mut z: Vec<f64> = match window {
        Some(w) => {
            let mean = rolling_mean(index, values, w)?;
            let std = rolling_std(index, values, w)?;
            values
                .iter()
                .zip(mean.iter().zip(&std))
                .map(|(x, (m, s))| (x - m) / s)
                .collect()
        }
        None => {
            let (mean, std) = mean_std(values);
            values.iter().map(|x| (x - mean) / std).collect()
        }
    };

    for v in &mut z {
        if v.is_infinite() {
            *v = f64::NAN;
        } else if absolute_value {
            *v = v.abs();
        }
    }

    if let (Some(w), Some(first)) = (window, index.first()) {
        let edge = first.saturating_add(w);
        for (v, t) in z.iter_mut().zip(index) {
            if *t <= edge {
                *v = f64::NAN;
            }
        }
    }
    Ok(z)
}
