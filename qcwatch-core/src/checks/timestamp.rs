//! Timestamp integrity: ordering, duplicates and gaps.

use std::collections::HashSet;

use qcwatch_types::Timestamp;

/// Parameters for [`Monitor::check_timestamp`](crate::Monitor::check_timestamp).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimestampCheck {
    /// Expected sampling period, in seconds.
    pub frequency: u64,
    /// First expected timestamp; defaults to the earliest one present.
    pub expected_start: Option<Timestamp>,
    /// Last expected timestamp; defaults to the latest one present.
    pub expected_end: Option<Timestamp>,
    /// When true, samples must sit exactly on the grid and the frame is
    /// reindexed onto it. When false, each `frequency`-long bin only needs
    /// one sample and the frame is left alone.
    pub exact_times: bool,
    pub min_failures: usize,
}

impl TimestampCheck {
    pub fn new(frequency: u64) -> Self {
        Self {
            frequency,
            expected_start: None,
            expected_end: None,
            exact_times: true,
            min_failures: 1,
        }
    }

    pub fn expected_start(mut self, t: Timestamp) -> Self {
        self.expected_start = Some(t);
        self
    }

    pub fn expected_end(mut self, t: Timestamp) -> Self {
        self.expected_end = Some(t);
        self
    }

    pub fn exact_times(mut self, exact: bool) -> Self {
        self.exact_times = exact;
        self
    }

    pub fn min_failures(mut self, n: usize) -> Self {
        self.min_failures = n;
        self
    }
}

/// Rows whose timestamp is earlier than the row before.
pub fn nonmonotonic_failures(index: &[Timestamp]) -> Vec<bool> {
    let mut flags = vec![false; index.len()];
    for i in 1..index.len() {
        flags[i] = index[i] < index[i - 1];
    }
    flags
}

/// Unique timestamps of a sorted index, each flagged if it occurred more
/// than once.
pub fn duplicate_failures(sorted: &[Timestamp]) -> (Vec<Timestamp>, Vec<bool>) {
    let mut unique: Vec<Timestamp> = Vec::with_capacity(sorted.len());
    let mut flags: Vec<bool> = Vec::with_capacity(sorted.len());
    for t in sorted {
        if unique.last() == Some(t) {
            if let Some(flag) = flags.last_mut() {
                *flag = true;
            }
        } else {
            unique.push(*t);
            flags.push(false);
        }
    }
    (unique, flags)
}

/// Grid points with no matching timestamp in `present`.
pub fn missing_on_grid(grid: &[Timestamp], present: &[Timestamp]) -> Vec<bool> {
    let present: HashSet<Timestamp> = present.iter().copied().collect();
    grid.iter().map(|t| !present.contains(t)).collect()
}

/// Bins of `step_ms` anchored at midnight of the first day, spanning the
/// sorted index; each flagged if it holds no timestamp.
pub fn missing_bins(sorted: &[Timestamp], step_ms: i64) -> (Vec<Timestamp>, Vec<bool>) {
    let (Some(first), Some(last)) = (sorted.first(), sorted.last()) else {
        return (Vec::new(), Vec::new());
    };
    let origin = first.start_of_day().as_millis();
    let bin_of = |t: &Timestamp| (t.as_millis() - origin).div_euclid(step_ms);
    let first_bin = bin_of(first);
    let n_bins = usize::try_from(bin_of(last) - first_bin + 1).unwrap_or(0);

    let mut counts = vec![0usize; n_bins];
    for t in sorted {
        if let Ok(k) = usize::try_from(bin_of(t) - first_bin) {
            if let Some(c) = counts.get_mut(k) {
                *c += 1;
            }
        }
    }

    let starts = (0..n_bins as i64)
        .map(|k| Timestamp::from_millis(origin + (first_bin + k) * step_ms))
        .collect();
    let flags = counts.into_iter().map(|c| c == 0).collect();
    (starts, flags)
}
