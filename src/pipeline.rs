//! Runs a QC plan against a frame.
//!
//! The order matches how a plan is meant to be read: timestamps are checked
//! (and the frame reindexed) before anything else looks at the samples, the
//! time filter is evaluated on the reindexed frame, missing and corrupt
//! samples are flagged before the bounds checks see them, and composite
//! signals exist before any check that names them.

use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::Result;
use qcwatch_core::metrics::{qci, QualityIndex};
use qcwatch_core::{Frame, Monitor, QcReport};
use tracing::{debug, info, warn};

use crate::config::{CheckEntry, QcConfig};

/// A QC session driven by a [`QcConfig`].
#[derive(Debug)]
pub struct Pipeline {
    config: QcConfig,
    monitor: Monitor,
}

impl Pipeline {
    pub fn new(config: QcConfig) -> Self {
        Self {
            config,
            monitor: Monitor::new(),
        }
    }

    pub fn config(&self) -> &QcConfig {
        &self.config
    }

    pub fn monitor(&self) -> &Monitor {
        &self.monitor
    }

    /// Load a frame, run every check and score the result.
    pub fn run(mut self, frame: Frame, per_day: bool) -> Result<QcReport> {
        self.load(frame)?;
        self.run_checks()?;
        self.score(per_day)
    }

    /// Add the frame under the plan's system, with its specifications and
    /// translation.
    pub fn load(&mut self, frame: Frame) -> Result<()> {
        let system = self.config.system_name.as_deref();
        self.monitor.add_frame(frame, system, true)?;
        self.monitor.set_specs(self.config.specs());
        self.monitor.add_translation(self.config.translation_map(), system);
        Ok(())
    }

    /// Run every check in the plan.
    pub fn run_checks(&mut self) -> Result<()> {
        let min_failures = self.config.min_failures;

        if let Some(check) = self.config.timestamp_check() {
            self.monitor.check_timestamp(&check)?;
        } else {
            debug!("No frequency configured, skipping timestamp check");
        }

        if let Some(expression) = self.config.time_filter.clone() {
            self.apply_time_filter(&expression)?;
        }

        self.monitor.check_missing(None, min_failures)?;
        if !self.config.corrupt_values.is_empty() {
            let corrupt = self.config.corrupt_values.clone();
            self.monitor.check_corrupt(&corrupt, None, min_failures)?;
        }

        for signal in self.config.composite_signals.clone() {
            if let Some(value) = self.monitor.evaluate(&signal.name, &signal.expression) {
                self.monitor.add_signal(&signal.name, value);
            }
        }

        for entry in self.config.range.clone() {
            let Some(bounds) = resolve("range", &entry, |e| e.bounds()) else {
                continue;
            };
            let Some(options) = resolve("range", &entry, |e| e.options(min_failures)) else {
                continue;
            };
            self.monitor.check_range(&bounds, entry.key.as_deref(), &options)?;
        }

        for entry in self.config.increment.clone() {
            let Some(bounds) = resolve("increment", &entry, |e| e.bounds()) else {
                continue;
            };
            let Some(check) = resolve("increment", &entry, |e| e.increment_check(min_failures)) else {
                continue;
            };
            self.monitor.check_increment(&bounds, entry.key.as_deref(), &check)?;
        }

        for entry in self.config.delta.clone() {
            let Some(bounds) = resolve("delta", &entry, |e| e.bounds()) else {
                continue;
            };
            let Some(check) = resolve("delta", &entry, |e| e.delta_check(min_failures)) else {
                continue;
            };
            self.monitor.check_delta(&bounds, entry.key.as_deref(), &check)?;
        }

        for entry in self.config.outlier.clone() {
            let Some(bounds) = resolve("outlier", &entry, |e| e.bounds()) else {
                continue;
            };
            let Some(check) = resolve("outlier", &entry, |e| e.outlier_check(min_failures)) else {
                continue;
            };
            self.monitor.check_outlier(&bounds, entry.key.as_deref(), &check)?;
        }

        info!("Recorded {} incidents", self.monitor.incidents().len());
        Ok(())
    }

    /// Fold the incidents into the aggregate mask and build the report.
    pub fn score(&mut self, per_day: bool) -> Result<QcReport> {
        let index = match self.monitor.test_results_mask(None) {
            Some(mask) => qci(&mask, self.monitor.time_filter(), per_day)?,
            None => {
                warn!("No data to score");
                QualityIndex::Overall(0.0)
            }
        };
        let mut report = self.monitor.report(index);
        report.timestamp_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        Ok(report)
    }

    fn apply_time_filter(&mut self, expression: &str) -> Result<()> {
        let Some(signal) = self.monitor.evaluate("Time Filter", expression) else {
            return Ok(());
        };
        match signal.to_filter() {
            Some(filter) => self.monitor.add_time_filter(filter)?,
            None => warn!("Time filter must evaluate to a single column: {}", expression),
        }
        Ok(())
    }
}

/// Resolve part of a plan entry, logging and skipping entries that do not
/// resolve.
fn resolve<T>(check: &str, entry: &CheckEntry, f: impl FnOnce(&CheckEntry) -> Result<T>) -> Option<T> {
    match f(entry) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!("Skipping {} check for {:?}: {:#}", check, entry.key, e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BoundValue, CompositeSignal, Specification, TranslationEntry};
    use qcwatch_core::Timestamp;

    const JAN_1_2015: i64 = 1_420_070_400;

    fn quarter_hours(n: i64) -> Vec<Timestamp> {
        (0..n).map(|i| Timestamp::from_secs(JAN_1_2015 + i * 900)).collect()
    }

    fn simple_frame() -> Frame {
        Frame::new(quarter_hours(6))
            .with_column("A", vec![0.1, 0.2, 0.3, -999.0, 0.5, 0.6])
            .unwrap()
            .with_column("B", vec![0.5, 0.5, 5.0, 5.0, 0.5, f64::NAN])
            .unwrap()
    }

    fn simple_config() -> QcConfig {
        QcConfig {
            system_name: Some("Simple".to_string()),
            frequency: Some(900),
            corrupt_values: vec![-999.0],
            specifications: vec![Specification {
                name: "Max B".to_string(),
                value: 2.0,
            }],
            range: vec![CheckEntry {
                key: Some("B".to_string()),
                upper: Some(BoundValue::Expression("{Max B}".to_string())),
                ..CheckEntry::default()
            }],
            ..QcConfig::default()
        }
    }

    fn descriptions(report: &QcReport) -> Vec<&str> {
        report.incidents.iter().map(|r| r.error_description.as_str()).collect()
    }

    #[test]
    fn test_plan_records_each_problem() {
        let report = Pipeline::new(simple_config()).run(simple_frame(), false).unwrap();

        assert_eq!(
            descriptions(&report),
            vec!["Missing data", "Corrupt data", "Data > upper bound, {Max B}"]
        );
        let range = &report.incidents[2];
        assert_eq!(range.system_name, "Simple");
        assert_eq!(range.variable_name, "B");
        assert_eq!(range.run_length, 2);

        // 12 cells, four failing: A[3] corrupt, B[2..=3] high, B[5] missing
        let overall = report.overall_index.unwrap();
        assert!((overall - 8.0 / 12.0).abs() < 1e-12);
        assert!(report.timestamp_ms > 0);
    }

    #[test]
    fn test_translation_and_composite_signal() {
        let config = QcConfig {
            translation: vec![TranslationEntry {
                key: "Pair".to_string(),
                columns: vec!["A".to_string(), "B".to_string()],
            }],
            composite_signals: vec![CompositeSignal {
                name: "Sum".to_string(),
                expression: "{A} + {B}".to_string(),
            }],
            range: vec![CheckEntry {
                key: Some("Sum".to_string()),
                upper: Some(BoundValue::Number(1.0)),
                ..CheckEntry::default()
            }],
            ..simple_config()
        };
        let mut pipeline = Pipeline::new(config);
        pipeline.load(simple_frame()).unwrap();
        pipeline.run_checks().unwrap();

        assert_eq!(pipeline.monitor().translation()["Pair"].len(), 2);
        assert!(pipeline.monitor().translation().contains_key("Sum"));
        let sum: Vec<_> = pipeline
            .monitor()
            .incidents()
            .iter()
            .filter(|r| r.variable_name == "Sum")
            .collect();
        // A[3] was corrupt, so only row 2 is both defined and above 1
        assert_eq!(sum.len(), 1);
        assert_eq!(sum[0].run_length, 1);
        assert_eq!(sum[0].system_name, "");
    }

    #[test]
    fn test_unresolvable_entries_are_skipped() {
        let config = QcConfig {
            delta: vec![CheckEntry {
                key: Some("A".to_string()),
                upper: Some(BoundValue::Number(1.0)),
                window: Some("whenever".to_string()),
                ..CheckEntry::default()
            }],
            ..simple_config()
        };
        let report = Pipeline::new(config).run(simple_frame(), false).unwrap();
        assert!(!descriptions(&report).iter().any(|d| d.starts_with("Delta")));
    }

    #[test]
    fn test_unknown_key_is_noted() {
        let config = QcConfig {
            range: vec![CheckEntry {
                key: Some("Wave".to_string()),
                upper: Some(BoundValue::Number(1.0)),
                ..CheckEntry::default()
            }],
            ..simple_config()
        };
        let report = Pipeline::new(config).run(simple_frame(), false).unwrap();
        assert!(report.notes.contains(&"Undefined key: Wave".to_string()));
    }

    #[test]
    fn test_time_filter_limits_scoring() {
        let config = QcConfig {
            time_filter: Some("{ELAPSED_TIME} < 1800".to_string()),
            ..simple_config()
        };
        let mut pipeline = Pipeline::new(config);
        pipeline.load(simple_frame()).unwrap();
        pipeline.run_checks().unwrap();
        assert_eq!(
            pipeline.monitor().time_filter(),
            Some(&[true, true, false, false, false, false][..])
        );

        // only the first two rows count, and both pass
        let report = pipeline.score(false).unwrap();
        assert_eq!(report.overall_index, Some(1.0));
        assert!(report.incidents.is_empty());
    }

    #[test]
    fn test_daily_index() {
        let report = Pipeline::new(simple_config()).run(simple_frame(), true).unwrap();
        assert_eq!(report.daily_index.len(), 1);
        assert_eq!(report.daily_index[0].day, Timestamp::from_secs(JAN_1_2015));
        assert!(report.overall_index.is_none());
    }
}
