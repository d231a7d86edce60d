//! Health metrics computed from masks and signals.
//!
//! The central metric is the quality control index (QCI): the fraction of
//! samples that passed every test, either over the whole run or per calendar
//! day.

use std::collections::BTreeMap;

use qcwatch_types::{DailyIndex, Timestamp};
use tracing::info;

use crate::error::{QcError, Result};
use crate::mask::Mask;

/// A QCI result.
#[derive(Debug, Clone, PartialEq)]
pub enum QualityIndex {
    Overall(f64),
    Daily(Vec<DailyIndex>),
}

impl QualityIndex {
    /// The overall value, or the mean of the daily values.
    pub fn mean(&self) -> f64 {
        match self {
            QualityIndex::Overall(v) => *v,
            QualityIndex::Daily(days) if days.is_empty() => 0.0,
            QualityIndex::Daily(days) => days.iter().map(|d| d.value).sum::<f64>() / days.len() as f64,
        }
    }
}

/// A metric computed over the whole run or per calendar day.
#[derive(Debug, Clone, PartialEq)]
pub enum Summary<T> {
    Overall(T),
    Daily(Vec<(Timestamp, T)>),
}

/// Row positions in time order; ties keep their index order.
fn time_order(index: &[Timestamp]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..index.len()).collect();
    order.sort_by_key(|&i| index[i]);
    order
}

/// Row positions of each calendar day from the earliest to the latest
/// row's day, including days without rows. The index need not be sorted.
fn days(index: &[Timestamp]) -> Vec<(Timestamp, Vec<usize>)> {
    let (Some(first), Some(last)) = (index.iter().min(), index.iter().max()) else {
        return Vec::new();
    };
    let mut buckets: BTreeMap<i64, Vec<usize>> = (first.day()..=last.day()).map(|d| (d, Vec::new())).collect();
    for i in time_order(index) {
        if let Some(rows) = buckets.get_mut(&index[i].day()) {
            rows.push(i);
        }
    }
    buckets
        .into_iter()
        .map(|(day, rows)| (Timestamp::from_millis(day * qcwatch_types::MILLIS_PER_DAY), rows))
        .collect()
}

/// Rows kept by an optional filter.
fn kept_rows(len: usize, filter: Option<&[bool]>) -> Result<Vec<usize>> {
    match filter {
        None => Ok((0..len).collect()),
        Some(f) if f.len() != len => Err(QcError::ShapeMismatch {
            expected: len,
            got: f.len(),
        }),
        Some(f) => Ok((0..len).filter(|i| f[*i]).collect()),
    }
}

fn pass_ratio(mask: &Mask, rows: &[usize]) -> f64 {
    let total = rows.len() * mask.n_cols();
    if total == 0 {
        return 0.0;
    }
    let passed: usize = mask
        .columns()
        .iter()
        .map(|col| rows.iter().filter(|&&i| col[i]).count())
        .sum();
    passed as f64 / total as f64
}

/// Quality control index: passed cells over all cells, restricted to rows
/// kept by `filter`. Days with no eligible cells score 0.
pub fn qci(mask: &Mask, filter: Option<&[bool]>, per_day: bool) -> Result<QualityIndex> {
    info!("Compute QCI");
    let mask = match filter {
        Some(f) => mask.retain_rows(f)?,
        None => mask.clone(),
    };

    if !per_day {
        let rows: Vec<usize> = (0..mask.n_rows()).collect();
        return Ok(QualityIndex::Overall(pass_ratio(&mask, &rows)));
    }
    Ok(QualityIndex::Daily(
        days(mask.index())
            .into_iter()
            .map(|(day, rows)| DailyIndex {
                day,
                value: pass_ratio(&mask, &rows),
            })
            .collect(),
    ))
}

/// Root mean squared error between two aligned series, skipping `NaN`.
pub fn rmse(
    index: &[Timestamp],
    x1: &[f64],
    x2: &[f64],
    filter: Option<&[bool]>,
    per_day: bool,
) -> Result<Summary<f64>> {
    info!("Compute RMSE");
    for len in [x1.len(), x2.len()] {
        if len != index.len() {
            return Err(QcError::ShapeMismatch {
                expected: index.len(),
                got: len,
            });
        }
    }
    let rows = kept_rows(index.len(), filter)?;
    let kept_index: Vec<Timestamp> = rows.iter().map(|&i| index[i]).collect();
    let error = |positions: &[usize]| {
        let (sum, n) = positions
            .iter()
            .map(|&p| (x1[rows[p]] - x2[rows[p]]).powi(2))
            .filter(|v| !v.is_nan())
            .fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
        if n == 0 {
            f64::NAN
        } else {
            (sum / n as f64).sqrt()
        }
    };

    if per_day {
        Ok(Summary::Daily(
            days(&kept_index)
                .into_iter()
                .map(|(day, positions)| (day, error(&positions[..])))
                .collect(),
        ))
    } else {
        Ok(Summary::Overall(error(&time_order(&kept_index)[..])))
    }
}

/// Trapezoidal integral of each column over time, in value-seconds.
/// `NaN` samples count as zero.
pub fn time_integral(
    index: &[Timestamp],
    columns: &[Vec<f64>],
    filter: Option<&[bool]>,
    per_day: bool,
) -> Result<Summary<Vec<f64>>> {
    info!("Compute time integral");
    if let Some(bad) = columns.iter().find(|c| c.len() != index.len()) {
        return Err(QcError::ShapeMismatch {
            expected: index.len(),
            got: bad.len(),
        });
    }
    let rows = kept_rows(index.len(), filter)?;
    let kept_index: Vec<Timestamp> = rows.iter().map(|&i| index[i]).collect();

    let integrate = |positions: &[usize]| -> Vec<f64> {
        let rows: Vec<usize> = positions.iter().map(|&p| rows[p]).collect();
        columns
            .iter()
            .map(|col| {
                let value = |i: usize| if col[i].is_nan() { 0.0 } else { col[i] };
                rows.windows(2)
                    .map(|w| {
                        let dt = (index[w[1]].as_millis() - index[w[0]].as_millis()) as f64 / 1000.0;
                        0.5 * (value(w[0]) + value(w[1])) * dt
                    })
                    .sum::<f64>()
            })
            .collect()
    };

    if per_day {
        Ok(Summary::Daily(
            days(&kept_index)
                .into_iter()
                .map(|(day, positions)| (day, integrate(&positions[..])))
                .collect(),
        ))
    } else {
        Ok(Summary::Overall(integrate(&time_order(&kept_index)[..])))
    }
}

/// Confusion counts between an observed mask and the actual conditions.
/// In both masks `true` means normal, `false` anomalous.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Confusion {
    true_positive: usize,
    false_negative: usize,
    true_negative: usize,
    false_positive: usize,
}

fn confusion(observed: &Mask, actual: &Mask, filter: Option<&[bool]>) -> Result<Confusion> {
    if observed.n_cols() != actual.n_cols() {
        return Err(QcError::ShapeMismatch {
            expected: observed.n_cols(),
            got: actual.n_cols(),
        });
    }
    if observed.n_rows() != actual.n_rows() {
        return Err(QcError::ShapeMismatch {
            expected: observed.n_rows(),
            got: actual.n_rows(),
        });
    }
    let rows = kept_rows(observed.n_rows(), filter)?;

    let mut counts = Confusion::default();
    for (obs, act) in observed.columns().iter().zip(actual.columns()) {
        for &i in &rows {
            match (obs[i], act[i]) {
                (false, false) => counts.true_positive += 1,
                (true, false) => counts.false_negative += 1,
                (true, true) => counts.true_negative += 1,
                (false, true) => counts.false_positive += 1,
            }
        }
    }
    Ok(counts)
}

/// Probability of detection, `TP / (TP + FN)`.
pub fn probability_of_detection(observed: &Mask, actual: &Mask, filter: Option<&[bool]>) -> Result<f64> {
    let c = confusion(observed, actual, filter)?;
    Ok(c.true_positive as f64 / (c.true_positive + c.false_negative) as f64)
}

/// False alarm rate, `FP / (TN + FP)`.
pub fn false_alarm_rate(observed: &Mask, actual: &Mask, filter: Option<&[bool]>) -> Result<f64> {
    let c = confusion(observed, actual, filter)?;
    Ok(c.false_positive as f64 / (c.true_negative + c.false_positive) as f64)
}
