//! Time-based rolling window statistics.
//!
//! Every window is right-closed: the window ending at row `i` holds the rows
//! whose timestamp falls in `(t_i - w, t_i]`. `NaN` samples are skipped. All
//! functions run in a single pass with two pointers, so the cost is linear in
//! the number of rows whatever the window length.

use std::collections::VecDeque;
use std::time::Duration;

use qcwatch_types::Timestamp;

use crate::error::{QcError, Result};

/// Convert a window to a positive millisecond width.
pub(crate) fn window_millis(window: Duration) -> Result<i64> {
    i64::try_from(window.as_millis())
        .ok()
        .filter(|w| *w > 0)
        .ok_or_else(|| QcError::InvalidWindow(format!("{window:?}")))
}

/// For each row, the first row inside the window that ends there.
fn window_starts(index: &[Timestamp], width: i64) -> Vec<usize> {
    let mut left = 0;
    index
        .iter()
        .enumerate()
        .map(|(i, t)| {
            let lower = t.as_millis().saturating_sub(width);
            while left < i && index[left].as_millis() <= lower {
                left += 1;
            }
            left
        })
        .collect()
}

/// Window starts for a series that must align with `index`.
fn aligned_starts(index: &[Timestamp], values: &[f64], window: Duration) -> Result<Vec<usize>> {
    if values.len() != index.len() {
        return Err(QcError::ShapeMismatch {
            expected: index.len(),
            got: values.len(),
        });
    }
    Ok(window_starts(index, window_millis(window)?))
}

/// Rolling mean; `NaN` where the window holds no finite sample.
pub fn rolling_mean(index: &[Timestamp], values: &[f64], window: Duration) -> Result<Vec<f64>> {
    let starts = aligned_starts(index, values, window)?;
    let mut out = vec![f64::NAN; values.len()];
    let mut sum = 0.0;
    let mut count = 0usize;
    let mut left = 0;

    for (i, x) in values.iter().enumerate() {
        if !x.is_nan() {
            sum += x;
            count += 1;
        }
        while left < starts[i] {
            if !values[left].is_nan() {
                sum -= values[left];
                count -= 1;
            }
            left += 1;
        }
        if count > 0 {
            out[i] = sum / count as f64;
        }
    }
    Ok(out)
}

/// Running mean and sum of squared deviations (Welford), supporting removal.
#[derive(Debug, Default, Clone, Copy)]
struct Moments {
    n: usize,
    mean: f64,
    m2: f64,
}

impl Moments {
    fn add(&mut self, x: f64) {
        self.n += 1;
        let delta = x - self.mean;
        self.mean += delta / self.n as f64;
        self.m2 += delta * (x - self.mean);
    }

    fn remove(&mut self, x: f64) {
        if self.n <= 1 {
            *self = Moments::default();
            return;
        }
        self.n -= 1;
        let delta = x - self.mean;
        self.mean -= delta / self.n as f64;
        self.m2 = (self.m2 - delta * (x - self.mean)).max(0.0);
    }

    /// Sample standard deviation (n - 1 denominator).
    fn std(&self) -> f64 {
        if self.n < 2 {
            f64::NAN
        } else {
            (self.m2 / (self.n - 1) as f64).sqrt()
        }
    }
}

/// Rolling sample standard deviation; `NaN` with fewer than two samples.
pub fn rolling_std(index: &[Timestamp], values: &[f64], window: Duration) -> Result<Vec<f64>> {
    let starts = aligned_starts(index, values, window)?;
    let mut out = vec![f64::NAN; values.len()];
    let mut moments = Moments::default();
    let mut left = 0;

    for (i, x) in values.iter().enumerate() {
        if !x.is_nan() {
            moments.add(*x);
        }
        while left < starts[i] {
            if !values[left].is_nan() {
                moments.remove(values[left]);
            }
            left += 1;
        }
        out[i] = moments.std();
    }
    Ok(out)
}

/// Mean and sample standard deviation of a whole column, skipping `NaN`.
pub fn mean_std(values: &[f64]) -> (f64, f64) {
    let mut moments = Moments::default();
    for v in values.iter().filter(|v| !v.is_nan()) {
        moments.add(*v);
    }
    let mean = if moments.n == 0 { f64::NAN } else { moments.mean };
    (mean, moments.std())
}

/// Position and value of the extremes inside one window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Extrema {
    pub max: f64,
    pub max_pos: usize,
    pub min: f64,
    pub min_pos: usize,
}

impl Extrema {
    /// Max minus min.
    pub fn range(&self) -> f64 {
        self.max - self.min
    }
}

/// Rolling max/min with the row of each extreme.
///
/// Ties resolve to the earliest row. Uses a monotonic deque per extreme, so
/// every row is pushed and popped at most once.
pub fn rolling_extrema(index: &[Timestamp], values: &[f64], window: Duration) -> Result<Vec<Option<Extrema>>> {
    let starts = aligned_starts(index, values, window)?;
    let mut out = vec![None; values.len()];
    let mut maxima: VecDeque<usize> = VecDeque::new();
    let mut minima: VecDeque<usize> = VecDeque::new();

    for i in 0..values.len() {
        let x = values[i];
        if !x.is_nan() {
            while maxima.back().is_some_and(|&b| values[b] < x) {
                maxima.pop_back();
            }
            maxima.push_back(i);
            while minima.back().is_some_and(|&b| values[b] > x) {
                minima.pop_back();
            }
            minima.push_back(i);
        }

        let left = starts[i];
        while maxima.front().is_some_and(|&f| f < left) {
            maxima.pop_front();
        }
        while minima.front().is_some_and(|&f| f < left) {
            minima.pop_front();
        }

        if let (Some(&max_pos), Some(&min_pos)) = (maxima.front(), minima.front()) {
            out[i] = Some(Extrema {
                max: values[max_pos],
                max_pos,
                min: values[min_pos],
                min_pos,
            });
        }
    }
    Ok(out)
}

/// Number of leading rows whose window is not yet full: rows before the last
/// one with a timestamp earlier than `t_0 + w`.
pub fn warmup_rows(index: &[Timestamp], window: Duration) -> usize {
    let Some(first) = index.first() else {
        return 0;
    };
    let edge = first.saturating_add(window);
    let inside = index.iter().filter(|t| **t < edge).count();
    inside.saturating_sub(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hourly(n: i64) -> Vec<Timestamp> {
        (0..n).map(|i| Timestamp::from_secs(i * 3600)).collect()
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn mean_over_time_window() {
        let idx = hourly(5);
        let vals = [1.0, 2.0, f64::NAN, 4.0, 5.0];
        // two-hour window holds the current and previous row
        let m = rolling_mean(&idx, &vals, Duration::from_secs(7200)).unwrap();
        assert_eq!(m[0], 1.0);
        assert_eq!(m[1], 1.5);
        assert_eq!(m[2], 2.0);
        assert_eq!(m[3], 4.0);
        assert_eq!(m[4], 4.5);
    }

    #[test]
    fn mean_all_nan_window() {
        let idx = hourly(3);
        let m = rolling_mean(&idx, &[f64::NAN, f64::NAN, 3.0], Duration::from_secs(3600)).unwrap();
        assert!(m[0].is_nan() && m[1].is_nan());
        assert_eq!(m[2], 3.0);
    }

    #[test]
    fn irregular_sampling_uses_time_not_counts() {
        let idx: Vec<_> = [0, 10, 20, 3600, 3610].iter().map(|s| Timestamp::from_secs(*s)).collect();
        let m = rolling_mean(&idx, &[1.0, 1.0, 1.0, 5.0, 7.0], Duration::from_secs(60)).unwrap();
        assert_eq!(m[2], 1.0);
        assert_eq!(m[3], 5.0);
        assert_eq!(m[4], 6.0);
    }

    #[test]
    fn misaligned_values_are_rejected() {
        let idx = hourly(3);
        let vals = [1.0, 2.0, 3.0, 4.0];
        let w = Duration::from_secs(3600);
        assert!(matches!(
            rolling_mean(&idx, &vals, w),
            Err(QcError::ShapeMismatch { expected: 3, got: 4 })
        ));
        assert!(matches!(rolling_std(&idx, &vals[..2], w), Err(QcError::ShapeMismatch { .. })));
        assert!(matches!(rolling_extrema(&idx, &vals, w), Err(QcError::ShapeMismatch { .. })));
    }

    #[test]
    fn std_needs_two_samples() {
        let idx = hourly(4);
        let s = rolling_std(&idx, &[1.0, 3.0, 5.0, 5.0], Duration::from_secs(7200)).unwrap();
        assert!(s[0].is_nan());
        assert!(approx(s[1], 2.0_f64.sqrt()));
        assert!(s[3] < 1e-6);
    }

    #[test]
    fn whole_column_moments() {
        let (mean, std) = mean_std(&[2.0, 4.0, f64::NAN, 6.0]);
        assert!(approx(mean, 4.0));
        assert!(approx(std, 2.0));
        let (mean, std) = mean_std(&[f64::NAN]);
        assert!(mean.is_nan() && std.is_nan());
    }

    #[test]
    fn extrema_track_positions() {
        let idx = hourly(6);
        let vals = [3.0, 1.0, 4.0, 1.0, 5.0, 0.0];
        let ext = rolling_extrema(&idx, &vals, Duration::from_secs(3 * 3600)).unwrap();

        let e = ext[3].unwrap();
        assert_eq!((e.max, e.max_pos), (4.0, 2));
        // ties resolve to the earliest row
        assert_eq!((e.min, e.min_pos), (1.0, 1));

        let e = ext[5].unwrap();
        assert_eq!((e.max_pos, e.min_pos), (4, 5));
        assert_eq!(e.range(), 5.0);
    }

    #[test]
    fn extrema_skip_nan() {
        let idx = hourly(3);
        let ext = rolling_extrema(&idx, &[f64::NAN, 2.0, f64::NAN], Duration::from_secs(3600)).unwrap();
        assert!(ext[0].is_none());
        assert_eq!(ext[1].unwrap().max_pos, 1);
        assert!(ext[2].is_none());
    }

    #[test]
    fn extrema_match_brute_force() {
        let idx = hourly(200);
        let vals: Vec<f64> = (0..200).map(|i| ((i * 37) % 23) as f64).collect();
        let window = Duration::from_secs(5 * 3600);
        let ext = rolling_extrema(&idx, &vals, window).unwrap();
        for i in 0..vals.len() {
            let lo = i.saturating_sub(4);
            let slice = &vals[lo..=i];
            let max = slice.iter().cloned().fold(f64::MIN, f64::max);
            let min = slice.iter().cloned().fold(f64::MAX, f64::min);
            let max_pos = lo + slice.iter().position(|v| *v == max).unwrap();
            let min_pos = lo + slice.iter().position(|v| *v == min).unwrap();
            let e = ext[i].unwrap();
            assert_eq!((e.max_pos, e.min_pos), (max_pos, min_pos), "row {i}");
        }
    }

    #[test]
    fn warmup_counts_rows_before_first_full_window() {
        let idx = hourly(24);
        assert_eq!(warmup_rows(&idx, Duration::from_secs(5 * 3600 + 1)), 5);
        assert_eq!(warmup_rows(&idx, Duration::from_secs(3600)), 0);
        assert_eq!(warmup_rows(&[], Duration::from_secs(1)), 0);
    }

    #[test]
    fn zero_window_is_rejected() {
        assert!(rolling_mean(&hourly(2), &[1.0, 2.0], Duration::ZERO).is_err());
    }
}
