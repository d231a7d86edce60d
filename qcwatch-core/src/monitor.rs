//! The monitoring session.
//!
//! A [`Monitor`] owns the frame, the translation dictionary, the time filter
//! and the constants used by expressions. Checks run one after another and
//! append to a single incident table; nothing is cached between calls.

use std::collections::BTreeMap;
use std::time::Duration;

use qcwatch_types::{
    IncidentRecord, QcReport, Timestamp, CORRUPT_DATA, DUPLICATE_TIMESTAMP, MISSING_DATA,
    MISSING_TIMESTAMP, NONMONOTONIC_TIMESTAMP,
};
use tracing::{debug, info, warn};

use crate::blocks::{extract_blocks, Runs};
use crate::checks::{
    bound_failures, corrupt_failures, delta_failures, describe, duplicate_failures, increments,
    missing_bins, missing_failures, missing_on_grid, nonmonotonic_failures, prefix, window_deltas,
    zscores, Bound, Bounds, CheckOptions, DeltaCheck, IncrementCheck, OutlierCheck, Threshold,
    TimestampCheck,
};
use crate::error::{QcError, Result};
use crate::expr::{ExprError, Expression, Scope, Value};
use crate::frame::{ColumnId, ColumnKey, Frame};
use crate::mask::{Mask, MaskTarget};
use crate::metrics::QualityIndex;
use crate::signal::Signal;
use crate::time::{clock_seconds, elapsed_seconds, frequency_millis, regular_grid};
use crate::window::rolling_mean;

/// Keyword for seconds elapsed since the first row.
pub const ELAPSED_TIME: &str = "ELAPSED_TIME";
/// Keyword for seconds past midnight of each row.
pub const CLOCK_TIME: &str = "CLOCK_TIME";

/// One quality control session over one frame.
///
/// # Example
///
/// ```rust
/// use qcwatch_core::{Bounds, CheckOptions, Frame, Monitor};
/// use qcwatch_types::Timestamp;
///
/// let index = (0..4).map(|h| Timestamp::from_secs(h * 3600)).collect();
/// let frame = Frame::new(index).with_column("A", vec![0.5, 1.5, 1.7, 0.2]).unwrap();
///
/// let mut monitor = Monitor::new();
/// monitor.add_frame(frame, Some("Simple"), true).unwrap();
/// monitor
///     .check_range(&Bounds::between(0.0, 1.0), Some("A"), &CheckOptions::default())
///     .unwrap();
///
/// let incidents = monitor.incidents();
/// assert_eq!(incidents.len(), 1);
/// assert_eq!(incidents[0].run_length, 2);
/// assert_eq!(incidents[0].error_description, "Data > upper bound, 1");
/// ```
#[derive(Debug, Clone, Default)]
pub struct Monitor {
    frame: Frame,
    translation: BTreeMap<String, Vec<ColumnKey>>,
    time_filter: Option<Vec<bool>>,
    specs: BTreeMap<String, f64>,
    incidents: Vec<IncidentRecord>,
    notes: Vec<String>,
}

impl Monitor {
    /// Create an empty session.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frame(&self) -> &Frame {
        &self.frame
    }

    pub fn translation(&self) -> &BTreeMap<String, Vec<ColumnKey>> {
        &self.translation
    }

    pub fn time_filter(&self) -> Option<&[bool]> {
        self.time_filter.as_deref()
    }

    pub fn specs(&self) -> &BTreeMap<String, f64> {
        &self.specs
    }

    /// Every incident recorded so far, in recording order.
    pub fn incidents(&self) -> &[IncidentRecord] {
        &self.incidents
    }

    /// Warnings raised by skipped checks and failed expressions.
    pub fn notes(&self) -> &[String] {
        &self.notes
    }

    /// Merge a frame into the session.
    ///
    /// With a `system`, every column is re-keyed under it. Incoming values
    /// take precedence; the existing frame fills the gaps. With
    /// `identity_translation`, each incoming column's raw name becomes a
    /// translation key for that column.
    ///
    /// The first frame is kept as given, so [`check_timestamp`] still sees
    /// its duplicate and out-of-order timestamps. Merging into an existing
    /// frame sorts and deduplicates the union index; when either index was
    /// irregular a note records that those rows can no longer be reported.
    ///
    /// [`check_timestamp`]: Monitor::check_timestamp
    pub fn add_frame(&mut self, frame: Frame, system: Option<&str>, identity_translation: bool) -> Result<()> {
        let raw_names: Vec<String> = frame.columns().iter().map(|(_, key)| key.to_string()).collect();
        let incoming = match system {
            Some(system) => frame.with_system(system)?,
            None => frame,
        };
        let keys: Vec<ColumnKey> = incoming.columns().iter().map(|(_, key)| key.clone()).collect();
        debug!(
            "Adding frame: {} rows, {} columns, system {:?}",
            incoming.n_rows(),
            incoming.n_cols(),
            system
        );

        if self.frame.n_rows() == 0 && self.frame.n_cols() == 0 {
            self.frame = incoming;
        } else {
            let irregular = |f: &Frame| f.index().windows(2).any(|w| w[0] >= w[1]);
            if irregular(&self.frame) || irregular(&incoming) {
                self.note("Frame merge sorted and deduplicated the time index".to_string());
            }
            let previous = std::mem::replace(&mut self.frame, incoming);
            self.frame.combine_first(previous);
        }

        if identity_translation {
            for (name, key) in raw_names.into_iter().zip(keys) {
                self.translation.insert(name, vec![key]);
            }
        }

        if self
            .time_filter
            .as_ref()
            .is_some_and(|f| f.len() != self.frame.n_rows())
        {
            self.time_filter = None;
            self.note("Time filter cleared: frame index changed".to_string());
        }
        Ok(())
    }

    /// Add translation entries, replacing existing keys. With a `system`,
    /// values are variable names under it; otherwise they are raw column
    /// names (`system:variable` or a bare variable).
    pub fn add_translation(&mut self, translation: BTreeMap<String, Vec<String>>, system: Option<&str>) {
        for (key, columns) in translation {
            let columns = columns
                .iter()
                .map(|c| match system {
                    Some(system) => ColumnKey::new(system, c.as_str()),
                    None => ColumnKey::parse(c),
                })
                .collect();
            self.translation.insert(key, columns);
        }
    }

    /// Restrict recording and scoring to rows where `filter` is true.
    pub fn add_time_filter(&mut self, filter: Vec<bool>) -> Result<()> {
        if filter.len() != self.frame.n_rows() {
            return Err(QcError::ShapeMismatch {
                expected: self.frame.n_rows(),
                got: filter.len(),
            });
        }
        self.time_filter = Some(filter);
        Ok(())
    }

    pub fn clear_time_filter(&mut self) {
        self.time_filter = None;
    }

    /// Replace the constants available to expressions.
    pub fn set_specs(&mut self, specs: BTreeMap<String, f64>) {
        self.specs = specs;
    }

    /// Add a composite signal's columns to the frame under a new
    /// translation key. Existing keys and column names are never
    /// overwritten. Returns whether the signal was added.
    pub fn add_signal(&mut self, name: &str, signal: Signal) -> bool {
        let Signal::Columns(columns) = signal else {
            self.note(format!("Signal {name} is a constant and was not added"));
            return false;
        };
        if self.translation.contains_key(name) {
            info!("Signal {name} already exists, not added");
            return false;
        }
        if let Some((column, _)) = columns
            .iter()
            .find(|(column, _)| self.frame.columns().id(&ColumnKey::bare(column.as_str())).is_some())
        {
            info!("Column {column} already exists, signal {name} not added");
            return false;
        }
        if let Some((column, values)) = columns.iter().find(|(_, v)| v.len() != self.frame.n_rows()) {
            self.note(format!(
                "Signal {name} not added: column {column} has {} rows, expected {}",
                values.len(),
                self.frame.n_rows()
            ));
            return false;
        }

        let mut keys = Vec::with_capacity(columns.len());
        for (column, values) in columns {
            let key = ColumnKey::bare(column);
            if let Err(e) = self.frame.push_column(key.clone(), values) {
                self.note(format!("Signal {name} not added: {e}"));
                return false;
            }
            keys.push(key);
        }
        self.translation.insert(name.to_string(), keys);
        true
    }

    /// Evaluate an expression in the session's namespace. Failures are
    /// logged, noted and return `None`.
    pub fn evaluate(&mut self, name: &str, expression: &str) -> Option<Signal> {
        let result = Expression::parse(expression).and_then(|e| self.evaluate_expression(&e));
        match result {
            Ok(value) => Some(Signal::from_value(name, value)),
            Err(e) => {
                self.note(format!("Insufficient data for composite signal {name} ({expression}): {e}"));
                None
            }
        }
    }

    /// Evaluate a parsed expression; column results must align with the frame.
    pub fn evaluate_expression(&self, expression: &Expression) -> std::result::Result<Value, ExprError> {
        let value = expression.eval(&SessionScope(self))?;
        if let Value::Columns(columns) = &value {
            if let Some(bad) = columns.iter().find(|c| c.len() != self.frame.n_rows()) {
                return Err(ExprError::LengthMismatch {
                    expected: self.frame.n_rows(),
                    got: bad.len(),
                });
            }
        }
        Ok(value)
    }

    /// Seconds since the first row.
    pub fn elapsed_time(&self) -> Vec<f64> {
        elapsed_seconds(self.frame.index())
    }

    /// Seconds past midnight of each row.
    pub fn clock_time(&self) -> Vec<f64> {
        clock_seconds(self.frame.index())
    }

    /// Summarise the session for rendering.
    pub fn report(&self, index: QualityIndex) -> QcReport {
        let builder = QcReport::builder()
            .incidents(self.incidents.iter().cloned())
            .notes(self.notes.iter().cloned());
        match index {
            QualityIndex::Overall(value) => builder.overall_index(value),
            QualityIndex::Daily(days) => builder.daily_index(days),
        }
        .build()
    }

    /// Turn a mask's failure runs into incident records.
    ///
    /// Rows outside the time filter pass. Runs shorter than `min_failures`
    /// are dropped. Returns the number of records appended.
    pub fn record(&mut self, mask: &Mask, description: &str, min_failures: usize) -> Result<usize> {
        let names: Vec<(String, String)> = match mask.target() {
            MaskTarget::Columns(ids) => {
                if mask.n_rows() != self.frame.n_rows() {
                    return Err(QcError::ShapeMismatch {
                        expected: self.frame.n_rows(),
                        got: mask.n_rows(),
                    });
                }
                ids.iter()
                    .map(|id| {
                        self.frame
                            .columns()
                            .key(*id)
                            .map(|key| (key.system.clone(), key.variable.clone()))
                            .ok_or_else(|| QcError::UnknownColumn(format!("#{id}")))
                    })
                    .collect::<Result<_>>()?
            }
            MaskTarget::Row => vec![(String::new(), String::new())],
        };

        let filtered;
        let mask = match &self.time_filter {
            Some(filter) => {
                let mut m = mask.clone();
                m.apply_filter(filter)?;
                filtered = m;
                &filtered
            }
            None => mask,
        };

        let min_failures = min_failures.max(1);
        let index = mask.index();
        let before = self.incidents.len();
        for block in extract_blocks(&mask.failures()) {
            if block.len() < min_failures {
                continue;
            }
            let (system, variable) = &names[block.column];
            self.incidents.push(
                IncidentRecord::builder()
                    .system(system.as_str())
                    .variable(variable.as_str())
                    .span(index[block.start], index[block.end], block.len() as u64)
                    .error(description)
                    .build(),
            );
        }

        let added = self.incidents.len() - before;
        if added > 0 {
            debug!("Recorded {added} incident(s): {description}");
        }
        Ok(added)
    }

    /// Check timestamps for ordering, duplicates and gaps.
    ///
    /// The frame is sorted and de-duplicated. With exact times it is then
    /// reindexed onto the expected grid, so missing rows appear as `NaN`.
    pub fn check_timestamp(&mut self, check: &TimestampCheck) -> Result<()> {
        info!("Check timestamp");
        let step = frequency_millis(check.frequency)?;
        if self.frame.n_rows() == 0 {
            self.note("Empty database, timestamp check skipped".to_string());
            return Ok(());
        }
        if self.time_filter.take().is_some() {
            self.note("Time filter cleared by timestamp check".to_string());
        }

        let index = self.frame.index().to_vec();
        let nonmonotonic = nonmonotonic_failures(&index);
        self.record(&Mask::rows_failing(index, nonmonotonic)?, NONMONOTONIC_TIMESTAMP, check.min_failures)?;

        self.frame.sort_by_index();
        let (unique, duplicates) = duplicate_failures(self.frame.index());
        self.record(&Mask::rows_failing(unique, duplicates)?, DUPLICATE_TIMESTAMP, check.min_failures)?;
        self.frame.dedup_index();

        let (Some(first), Some(last)) = (self.frame.index().first().copied(), self.frame.index().last().copied())
        else {
            return Ok(());
        };

        if check.exact_times {
            let start = check.expected_start.unwrap_or(first);
            let end = check.expected_end.unwrap_or(last);
            let grid = regular_grid(start, end, Duration::from_secs(check.frequency))?;
            let missing = missing_on_grid(&grid, self.frame.index());
            self.frame.reindex(grid.clone());
            self.record(&Mask::rows_failing(grid, missing)?, MISSING_TIMESTAMP, check.min_failures)?;
        } else {
            let (bins, missing) = missing_bins(self.frame.index(), step);
            self.record(&Mask::rows_failing(bins, missing)?, MISSING_TIMESTAMP, check.min_failures)?;
        }
        Ok(())
    }

    /// Check for missing (non-finite) samples. Rows already reported as
    /// missing timestamps are not reported again.
    pub fn check_missing(&mut self, key: Option<&str>, min_failures: usize) -> Result<()> {
        info!("Check for missing data");
        let Some((ids, columns)) = self.prepare(key, None)? else {
            return Ok(());
        };
        let reported: Vec<(Timestamp, Timestamp)> = self
            .incidents
            .iter()
            .filter(|r| r.error_description == MISSING_TIMESTAMP)
            .map(|r| (r.start_time, r.end_time))
            .collect();
        let failures = missing_failures(self.frame.index(), &columns, &reported);
        let mask = Mask::from_failures(self.frame.index().to_vec(), MaskTarget::Columns(ids), failures)?;
        self.record(&mask, MISSING_DATA, min_failures)?;
        Ok(())
    }

    /// Check for samples equal to a corrupt sentinel value. Matching
    /// samples are replaced with `NaN` in the frame.
    pub fn check_corrupt(&mut self, corrupt_values: &[f64], key: Option<&str>, min_failures: usize) -> Result<()> {
        info!("Check for corrupt data");
        let Some((ids, columns)) = self.prepare(key, None)? else {
            return Ok(());
        };
        let failures = corrupt_failures(&columns, corrupt_values);
        for (id, flags) in ids.iter().zip(&failures) {
            if let Some(column) = self.frame.column_mut(*id) {
                for (value, corrupt) in column.iter_mut().zip(flags) {
                    if *corrupt {
                        *value = f64::NAN;
                    }
                }
            }
        }
        let mask = Mask::from_failures(self.frame.index().to_vec(), MaskTarget::Columns(ids), failures)?;
        self.record(&mask, CORRUPT_DATA, min_failures)?;
        Ok(())
    }

    /// Check that samples stay within bounds.
    pub fn check_range(&mut self, bounds: &Bounds, key: Option<&str>, options: &CheckOptions) -> Result<()> {
        info!("Check data range");
        let Some((ids, columns)) = self.prepare(key, options.rolling_mean)? else {
            return Ok(());
        };
        self.check_bounds(&ids, &columns, bounds, "Data", options.min_failures)
    }

    /// Check the difference between samples `increment` rows apart.
    pub fn check_increment(&mut self, bounds: &Bounds, key: Option<&str>, check: &IncrementCheck) -> Result<()> {
        info!("Check increment range");
        let Some((ids, columns)) = self.prepare(key, check.options.rolling_mean)? else {
            return Ok(());
        };
        if columns.iter().flatten().all(|v| v.is_nan()) {
            self.note(format!(
                "Check increment range failed (all data is missing): {}",
                key.unwrap_or("all columns")
            ));
            return Ok(());
        }
        let columns: Vec<Vec<f64>> = columns
            .iter()
            .map(|c| increments(c, check.increment, check.absolute_value))
            .collect();
        let name = prefix("Increment", check.absolute_value);
        self.check_bounds(&ids, &columns, bounds, &name, check.options.min_failures)
    }

    /// Check the max-minus-min range inside a sliding time window.
    pub fn check_delta(&mut self, bounds: &Bounds, key: Option<&str>, check: &DeltaCheck) -> Result<()> {
        info!("Check delta (max-min) range");
        let Some((ids, columns)) = self.prepare(key, check.options.rolling_mean)? else {
            return Ok(());
        };
        let deltas = columns
            .iter()
            .map(|c| window_deltas(self.frame.index(), c, check.window, check.absolute_value))
            .collect::<Result<Vec<_>>>()?;
        let name = prefix("Delta", check.absolute_value);

        for (side, bound) in bounds.sides() {
            let Some((threshold, label)) = self.resolve(bound) else {
                continue;
            };
            let filter = self.time_filter.as_deref();
            let failures = deltas
                .iter()
                .map(|d| delta_failures(d, &threshold, side, filter))
                .collect();
            let mask = Mask::from_failures(self.frame.index().to_vec(), MaskTarget::Columns(ids.clone()), failures)?;
            self.record(&mask, &describe(&name, side, label), check.options.min_failures)?;
        }
        Ok(())
    }

    /// Check normalised values `(x - mean) / std` against bounds.
    pub fn check_outlier(&mut self, bounds: &Bounds, key: Option<&str>, check: &OutlierCheck) -> Result<()> {
        info!("Check for outliers");
        let Some((ids, columns)) = self.prepare(key, check.options.rolling_mean)? else {
            return Ok(());
        };
        let columns = columns
            .iter()
            .map(|c| zscores(self.frame.index(), c, check.window, check.absolute_value))
            .collect::<Result<Vec<_>>>()?;
        let name = prefix("Outlier", check.absolute_value);
        self.check_bounds(&ids, &columns, bounds, &name, check.options.min_failures)
    }

    /// Pass/fail mask of the selected columns combining every recorded
    /// incident. Missing samples fail. Nonmonotonic and duplicate timestamp
    /// records are skipped since they refer to rows no longer in the frame.
    pub fn test_results_mask(&mut self, key: Option<&str>) -> Option<Mask> {
        let ids = self.select_columns(key)?;
        let passed: Vec<Vec<bool>> = ids
            .iter()
            .filter_map(|id| self.frame.column(*id))
            .map(|column| column.iter().map(|v| !v.is_nan()).collect())
            .collect();
        let mut mask = Mask::from_passed(self.frame.index().to_vec(), MaskTarget::Columns(ids.clone()), passed).ok()?;

        let sorted = self.frame.is_sorted();
        for record in self.incidents.iter().filter(|r| !r.is_index_integrity()) {
            let rows = covered_rows(self.frame.index(), sorted, record);
            if record.is_whole_row() {
                for (start, end) in rows {
                    mask.fail_rows(start, end);
                }
                continue;
            }
            let key = ColumnKey::new(record.system_name.as_str(), record.variable_name.as_str());
            let Some(col) = self
                .frame
                .columns()
                .id(&key)
                .and_then(|id| ids.iter().position(|i| *i == id))
            else {
                continue;
            };
            for (start, end) in rows {
                mask.fail_range(col, start, end);
            }
        }
        Some(mask)
    }

    fn note(&mut self, message: String) {
        warn!("{message}");
        if !self.notes.contains(&message) {
            self.notes.push(message);
        }
    }

    /// Column ids behind a translation key, or every column.
    fn select_columns(&mut self, key: Option<&str>) -> Option<Vec<ColumnId>> {
        if self.frame.is_empty() {
            self.note("Empty database".to_string());
            return None;
        }
        let Some(key) = key else {
            return Some(self.frame.column_ids());
        };
        let ids = self.translation.get(key).and_then(|keys| {
            keys.iter()
                .map(|k| self.frame.columns().id(k))
                .collect::<Option<Vec<_>>>()
        });
        match ids {
            Some(ids) if !ids.is_empty() => Some(ids),
            _ => {
                self.note(format!("Undefined key: {key}"));
                None
            }
        }
    }

    /// Selected columns, smoothed if requested.
    fn prepare(
        &mut self,
        key: Option<&str>,
        rolling: Option<Duration>,
    ) -> Result<Option<(Vec<ColumnId>, Vec<Vec<f64>>)>> {
        let Some(ids) = self.select_columns(key) else {
            return Ok(None);
        };
        let mut columns = self.frame.select(&ids)?;
        if let Some(window) = rolling {
            for column in &mut columns {
                *column = rolling_mean(self.frame.index(), column, window)?;
            }
        }
        Ok(Some((ids, columns)))
    }

    /// Evaluate a bound and the label used in its error description.
    fn resolve(&mut self, bound: &Bound) -> Option<(Threshold, String)> {
        let expression = match bound {
            Bound::Value(x) => return Some((Threshold::Scalar(*x), x.to_string())),
            Bound::Expr(expression) => expression,
        };
        match self.evaluate_expression(expression) {
            Ok(Value::Scalar(x)) => Some((Threshold::Scalar(x), expression.source().to_string())),
            Ok(Value::Columns(mut columns)) if columns.len() == 1 => {
                Some((Threshold::PerRow(columns.remove(0)), expression.source().to_string()))
            }
            Ok(value) => {
                self.note(format!(
                    "Bound {expression} evaluates to {} columns, expected one",
                    value.width()
                ));
                None
            }
            Err(e) => {
                self.note(format!("Bound {expression} could not be evaluated: {e}"));
                None
            }
        }
    }

    fn check_bounds(
        &mut self,
        ids: &[ColumnId],
        columns: &[Vec<f64>],
        bounds: &Bounds,
        name: &str,
        min_failures: usize,
    ) -> Result<()> {
        for (side, bound) in bounds.sides() {
            let Some((threshold, label)) = self.resolve(bound) else {
                continue;
            };
            let failures = bound_failures(columns, &threshold, side);
            let mask = Mask::from_failures(self.frame.index().to_vec(), MaskTarget::Columns(ids.to_vec()), failures)?;
            self.record(&mask, &describe(name, side, label), min_failures)?;
        }
        Ok(())
    }
}

/// Inclusive row ranges of `index` inside the record's time span.
fn covered_rows(index: &[Timestamp], sorted: bool, record: &IncidentRecord) -> Vec<(usize, usize)> {
    if sorted {
        let lo = index.partition_point(|t| *t < record.start_time);
        let hi = index.partition_point(|t| *t <= record.end_time);
        return if lo < hi { vec![(lo, hi - 1)] } else { Vec::new() };
    }
    let covered: Vec<bool> = index.iter().map(|t| record.covers(*t)).collect();
    Runs::new(&covered).collect()
}

/// Expression namespace: translation keys resolve to frame columns, then to
/// constants.
struct SessionScope<'a>(&'a Monitor);

impl Scope for SessionScope<'_> {
    fn keyword(&self, name: &str) -> Option<Value> {
        let monitor = self.0;
        match name {
            ELAPSED_TIME => return Some(Value::column(monitor.elapsed_time())),
            CLOCK_TIME => return Some(Value::column(monitor.clock_time())),
            _ => {}
        }
        monitor
            .translation
            .get(name)
            .and_then(|keys| {
                keys.iter()
                    .map(|k| monitor.frame.column_by_key(k).map(<[f64]>::to_vec))
                    .collect::<Option<Vec<_>>>()
            })
            .filter(|columns| !columns.is_empty())
            .map(Value::Columns)
            .or_else(|| monitor.specs.get(name).copied().map(Value::Scalar))
    }

    fn constant(&self, name: &str) -> Option<f64> {
        self.0.specs.get(name).copied()
    }
}
