//! QC plan configuration.
//!
//! A plan is a TOML/YAML/JSON file describing which checks to run against a
//! data file. Settings can be overridden from the environment with the
//! `QCWATCH_` prefix, using `__` between nested keys (for example
//! `QCWATCH_MIN_FAILURES=3`).
//!
//! ```toml
//! system_name = "Simple"
//! frequency = 900
//! corrupt_values = [-999]
//!
//! [[specifications]]
//! name = "Max Power"
//! value = 2.0
//!
//! [[translation]]
//! key = "Wave"
//! columns = ["C", "D"]
//!
//! [[range]]
//! key = "B"
//! lower = 0
//! upper = "{Max Power} * 0.5"
//! ```

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use config::{Config, Environment, File};
use qcwatch_core::time::parse_window;
use qcwatch_core::{Bound, Bounds, CheckOptions, DeltaCheck, Expression, IncrementCheck, OutlierCheck, Timestamp, TimestampCheck};
use serde::{Deserialize, Serialize};

/// Top-level QC plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QcConfig {
    /// System that owns the data file's columns.
    pub system_name: Option<String>,
    /// Expected sampling period in seconds; the timestamp check is skipped
    /// without one.
    pub frequency: Option<u64>,
    pub exact_times: bool,
    pub expected_start: Option<NaiveDateTime>,
    pub expected_end: Option<NaiveDateTime>,
    /// Default shortest run of failures worth recording.
    pub min_failures: usize,
    pub specifications: Vec<Specification>,
    pub translation: Vec<TranslationEntry>,
    /// Expression selecting the rows that count towards the checks.
    pub time_filter: Option<String>,
    pub corrupt_values: Vec<f64>,
    pub composite_signals: Vec<CompositeSignal>,
    pub range: Vec<CheckEntry>,
    pub increment: Vec<CheckEntry>,
    pub delta: Vec<CheckEntry>,
    pub outlier: Vec<CheckEntry>,
}

impl Default for QcConfig {
    fn default() -> Self {
        Self {
            system_name: None,
            frequency: None,
            exact_times: true,
            expected_start: None,
            expected_end: None,
            min_failures: 1,
            specifications: Vec::new(),
            translation: Vec::new(),
            time_filter: None,
            corrupt_values: Vec::new(),
            composite_signals: Vec::new(),
            range: Vec::new(),
            increment: Vec::new(),
            delta: Vec::new(),
            outlier: Vec::new(),
        }
    }
}

/// A named constant available to expressions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Specification {
    pub name: String,
    pub value: f64,
}

/// A translation key and the column names it groups.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranslationEntry {
    pub key: String,
    pub columns: Vec<String>,
}

/// A derived signal computed from an expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositeSignal {
    pub name: String,
    pub expression: String,
}

/// A bound given either as a number or as an expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BoundValue {
    Number(f64),
    Expression(String),
}

impl BoundValue {
    fn to_bound(&self) -> Result<Bound> {
        match self {
            BoundValue::Number(v) => Ok(Bound::Value(*v)),
            BoundValue::Expression(s) => {
                let expr = Expression::parse(s).with_context(|| format!("bound expression {s:?}"))?;
                Ok(Bound::Expr(expr))
            }
        }
    }
}

/// One bounds check in the plan.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckEntry {
    /// Translation key or column name; all columns when absent.
    pub key: Option<String>,
    pub lower: Option<BoundValue>,
    pub upper: Option<BoundValue>,
    /// Rolling-mean window applied before checking, e.g. `"1h"`.
    pub rolling_mean: Option<String>,
    pub min_failures: Option<usize>,
    /// Row shift for the increment check.
    pub increment: Option<usize>,
    /// Window for the delta and outlier checks, e.g. `"15m"`. For the
    /// outlier check `"none"` normalises over the whole column.
    pub window: Option<String>,
    pub absolute_value: Option<bool>,
}

impl CheckEntry {
    /// Resolve the bound expressions.
    pub fn bounds(&self) -> Result<Bounds> {
        let mut bounds = Bounds::default();
        if let Some(lower) = &self.lower {
            bounds = bounds.with_lower(lower.to_bound()?);
        }
        if let Some(upper) = &self.upper {
            bounds = bounds.with_upper(upper.to_bound()?);
        }
        Ok(bounds)
    }

    /// Shared options, falling back to the plan's `min_failures`.
    pub fn options(&self, default_min_failures: usize) -> Result<CheckOptions> {
        let mut options = CheckOptions::default().min_failures(self.min_failures.unwrap_or(default_min_failures));
        if let Some(window) = &self.rolling_mean {
            options = options.rolling_mean(parse_window(window)?);
        }
        Ok(options)
    }

    pub fn increment_check(&self, default_min_failures: usize) -> Result<IncrementCheck> {
        let defaults = IncrementCheck::default();
        Ok(IncrementCheck {
            increment: self.increment.unwrap_or(defaults.increment),
            absolute_value: self.absolute_value.unwrap_or(defaults.absolute_value),
            options: self.options(default_min_failures)?,
        })
    }

    pub fn delta_check(&self, default_min_failures: usize) -> Result<DeltaCheck> {
        let defaults = DeltaCheck::default();
        Ok(DeltaCheck {
            window: self.window()?.unwrap_or(defaults.window),
            absolute_value: self.absolute_value.unwrap_or(defaults.absolute_value),
            options: self.options(default_min_failures)?,
        })
    }

    pub fn outlier_check(&self, default_min_failures: usize) -> Result<OutlierCheck> {
        let defaults = OutlierCheck::default();
        let window = match self.window.as_deref() {
            Some(w) if w.eq_ignore_ascii_case("none") => None,
            Some(_) => self.window()?,
            None => defaults.window,
        };
        Ok(OutlierCheck {
            window,
            absolute_value: self.absolute_value.unwrap_or(defaults.absolute_value),
            options: self.options(default_min_failures)?,
        })
    }

    fn window(&self) -> Result<Option<Duration>> {
        self.window
            .as_deref()
            .map(|w| parse_window(w).with_context(|| format!("window {w:?}")))
            .transpose()
    }
}

impl QcConfig {
    /// Load a plan from a file, with `QCWATCH_` environment overrides.
    pub fn load(path: &Path) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::from(path))
            .add_source(
                Environment::with_prefix("QCWATCH")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()
            .with_context(|| format!("Failed to load plan: {}", path.display()))?;
        config
            .try_deserialize()
            .with_context(|| format!("Invalid plan: {}", path.display()))
    }

    /// Build the timestamp check, if a frequency is configured.
    pub fn timestamp_check(&self) -> Option<TimestampCheck> {
        let frequency = self.frequency?;
        let mut check = TimestampCheck::new(frequency)
            .exact_times(self.exact_times)
            .min_failures(self.min_failures);
        if let Some(start) = self.expected_start {
            check = check.expected_start(Timestamp::from_naive(start));
        }
        if let Some(end) = self.expected_end {
            check = check.expected_end(Timestamp::from_naive(end));
        }
        Some(check)
    }

    pub fn specs(&self) -> BTreeMap<String, f64> {
        self.specifications.iter().map(|s| (s.name.clone(), s.value)).collect()
    }

    pub fn translation_map(&self) -> BTreeMap<String, Vec<String>> {
        self.translation
            .iter()
            .map(|t| (t.key.clone(), t.columns.clone()))
            .collect()
    }
}
