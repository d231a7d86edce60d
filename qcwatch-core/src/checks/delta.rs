//! Max-minus-min inside a sliding time window.
//!
//! A failing window is attributed to the rows between its extreme values,
//! not to the whole window, so a sharp jump in a long window is reported as
//! the few samples the jump actually spans.

use std::time::Duration;

use qcwatch_types::Timestamp;

use super::{CheckOptions, Side, Threshold};
use crate::error::Result;
use crate::window::{rolling_extrema, warmup_rows};

/// Parameters for [`Monitor::check_delta`](crate::Monitor::check_delta).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeltaCheck {
    pub window: Duration,
    pub absolute_value: bool,
    pub options: CheckOptions,
}

impl Default for DeltaCheck {
    fn default() -> Self {
        Self {
            window: Duration::from_secs(3600),
            absolute_value: true,
            options: CheckOptions::default(),
        }
    }
}

/// Delta of the window ending at one row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowDelta {
    /// `max - min`, negated in signed mode when the max precedes the min.
    pub value: f64,
    /// First row between the two extremes.
    pub start: usize,
    /// Last row between the two extremes.
    pub end: usize,
}

/// Delta per row. Rows before the first full window, and windows without a
/// finite sample, are `None`.
pub fn window_deltas(
    index: &[Timestamp],
    values: &[f64],
    window: Duration,
    absolute_value: bool,
) -> Result<Vec<Option<WindowDelta>>> {
    let extrema = rolling_extrema(index, values, window)?;
    let warmup = warmup_rows(index, window);

    Ok(extrema
        .into_iter()
        .enumerate()
        .map(|(row, ext)| {
            let ext = ext.filter(|_| row >= warmup)?;
            let mut value = ext.range();
            if !absolute_value && ext.max_pos < ext.min_pos {
                value = -value;
            }
            Some(WindowDelta {
                value,
                start: ext.min_pos.min(ext.max_pos),
                end: ext.min_pos.max(ext.max_pos),
            })
        })
        .collect())
}

/// Rows covered by failing windows. Windows ending on a row excluded by
/// `filter` are ignored.
pub fn delta_failures(
    deltas: &[Option<WindowDelta>],
    threshold: &Threshold,
    side: Side,
    filter: Option<&[bool]>,
) -> Vec<bool> {
    let mut flags = vec![false; deltas.len()];
    for (row, delta) in deltas.iter().enumerate() {
        let Some(delta) = delta else { continue };
        if filter.is_some_and(|f| !f.get(row).copied().unwrap_or(true)) {
            continue;
        }
        if side.fails(delta.value, threshold.at(row)) {
            flags[delta.start..=delta.end].iter_mut().for_each(|f| *f = true);
        }
    }
    flags
}
