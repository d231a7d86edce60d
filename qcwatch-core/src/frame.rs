//! The time series matrix and its column index.
//!
//! A [`Frame`] stores samples column-major: one `Vec<f64>` per column, all
//! aligned with a shared timestamp index. Columns are identified by a
//! [`ColumnKey`] (system + variable) and addressed by a dense [`ColumnId`].
//! The [`ColumnIndex`] maps between the two in both directions, so incident
//! records never need to parse a `system:variable` string back apart.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use qcwatch_types::Timestamp;

use crate::error::{QcError, Result};

/// Separator used when a column key is rendered as a single string.
pub const SYSTEM_SEPARATOR: char = ':';

/// Dense position of a column inside a [`Frame`].
pub type ColumnId = usize;

/// A column's identity: owning system (may be empty) and variable name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ColumnKey {
    pub system: String,
    pub variable: String,
}

impl ColumnKey {
    /// Key with an owning system.
    pub fn new(system: impl Into<String>, variable: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            variable: variable.into(),
        }
    }

    /// Key without an owning system (derived or composite signals).
    pub fn bare(variable: impl Into<String>) -> Self {
        Self::new(String::new(), variable)
    }

    /// Split a raw column name on exactly one separator; anything else is
    /// treated as a bare variable name.
    pub fn parse(name: &str) -> Self {
        let mut parts = name.split(SYSTEM_SEPARATOR);
        match (parts.next(), parts.next(), parts.next()) {
            (Some(system), Some(variable), None) => Self::new(system, variable),
            _ => Self::bare(name),
        }
    }

    /// The same variable re-homed under `system`.
    pub fn with_system(&self, system: &str) -> Self {
        Self::new(system, self.variable.clone())
    }
}

impl fmt::Display for ColumnKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.system.is_empty() {
            write!(f, "{}", self.variable)
        } else {
            write!(f, "{}{}{}", self.system, SYSTEM_SEPARATOR, self.variable)
        }
    }
}

/// Bidirectional map between column keys and column ids.
#[derive(Debug, Clone, Default)]
pub struct ColumnIndex {
    keys: Vec<ColumnKey>,
    ids: HashMap<ColumnKey, ColumnId>,
}

impl ColumnIndex {
    /// Register a key, returning its new id.
    fn insert(&mut self, key: ColumnKey) -> Result<ColumnId> {
        if self.ids.contains_key(&key) {
            return Err(QcError::DuplicateColumn(key.to_string()));
        }
        let id = self.keys.len();
        self.ids.insert(key.clone(), id);
        self.keys.push(key);
        Ok(id)
    }

    /// Look up the id of a key.
    pub fn id(&self, key: &ColumnKey) -> Option<ColumnId> {
        self.ids.get(key).copied()
    }

    /// Look up the key of an id.
    pub fn key(&self, id: ColumnId) -> Option<&ColumnKey> {
        self.keys.get(id)
    }

    /// Number of columns.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Check if there are no columns.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Iterate `(id, key)` pairs in column order.
    pub fn iter(&self) -> impl Iterator<Item = (ColumnId, &ColumnKey)> {
        self.keys.iter().enumerate()
    }
}

/// A time-indexed, column-named table of floating point samples.
///
/// Missing samples are `NaN`. The index is kept exactly as supplied; the
/// timestamp check is responsible for sorting, de-duplicating and
/// regularising it.
#[derive(Debug, Clone, Default)]
pub struct Frame {
    index: Vec<Timestamp>,
    columns: ColumnIndex,
    data: Vec<Vec<f64>>,
}

impl Frame {
    /// Create an empty frame over the given index.
    pub fn new(index: Vec<Timestamp>) -> Self {
        Self {
            index,
            columns: ColumnIndex::default(),
            data: Vec::new(),
        }
    }

    /// Builder-style [`Frame::push_column`] for raw column names.
    pub fn with_column(mut self, name: &str, values: Vec<f64>) -> Result<Self> {
        self.push_column(ColumnKey::parse(name), values)?;
        Ok(self)
    }

    /// Append a column. The values must align with the index.
    pub fn push_column(&mut self, key: ColumnKey, values: Vec<f64>) -> Result<ColumnId> {
        if values.len() != self.index.len() {
            return Err(QcError::ShapeMismatch {
                expected: self.index.len(),
                got: values.len(),
            });
        }
        let id = self.columns.insert(key)?;
        self.data.push(values);
        Ok(id)
    }

    pub fn index(&self) -> &[Timestamp] {
        &self.index
    }

    pub fn columns(&self) -> &ColumnIndex {
        &self.columns
    }

    /// Number of rows.
    pub fn n_rows(&self) -> usize {
        self.index.len()
    }

    /// Number of columns.
    pub fn n_cols(&self) -> usize {
        self.data.len()
    }

    /// True when the frame has no rows or no columns.
    pub fn is_empty(&self) -> bool {
        self.index.is_empty() || self.data.is_empty()
    }

    /// Every column id, in order.
    pub fn column_ids(&self) -> Vec<ColumnId> {
        (0..self.data.len()).collect()
    }

    /// Samples of one column.
    pub fn column(&self, id: ColumnId) -> Option<&[f64]> {
        self.data.get(id).map(Vec::as_slice)
    }

    /// Mutable samples of one column.
    pub fn column_mut(&mut self, id: ColumnId) -> Option<&mut [f64]> {
        self.data.get_mut(id).map(Vec::as_mut_slice)
    }

    /// Samples of a column by key.
    pub fn column_by_key(&self, key: &ColumnKey) -> Option<&[f64]> {
        self.columns.id(key).and_then(|id| self.column(id))
    }

    /// Copy the listed columns out of the frame.
    pub fn select(&self, ids: &[ColumnId]) -> Result<Vec<Vec<f64>>> {
        ids.iter()
            .map(|id| {
                self.data
                    .get(*id)
                    .cloned()
                    .ok_or_else(|| QcError::UnknownColumn(format!("#{id}")))
            })
            .collect()
    }

    /// Re-key every column under `system`.
    pub fn with_system(self, system: &str) -> Result<Self> {
        let mut renamed = Frame::new(self.index);
        for ((_, key), values) in self.columns.iter().zip(self.data) {
            renamed.push_column(key.with_system(system), values)?;
        }
        Ok(renamed)
    }

    /// True if timestamps never decrease.
    pub fn is_sorted(&self) -> bool {
        self.index.windows(2).all(|w| w[0] <= w[1])
    }

    /// Stable sort of rows by timestamp.
    pub fn sort_by_index(&mut self) {
        if self.is_sorted() {
            return;
        }
        let mut order: Vec<usize> = (0..self.index.len()).collect();
        order.sort_by_key(|&i| self.index[i]);
        self.take_rows(&order);
    }

    /// Drop rows whose timestamp equals an earlier row's, keeping the first.
    ///
    /// Assumes the index is sorted. Returns the number of rows dropped.
    pub fn dedup_index(&mut self) -> usize {
        let keep: Vec<usize> = (0..self.index.len())
            .filter(|&i| i == 0 || self.index[i] != self.index[i - 1])
            .collect();
        let dropped = self.index.len() - keep.len();
        if dropped > 0 {
            self.take_rows(&keep);
        }
        dropped
    }

    /// Conform the frame to a new index. New rows are `NaN`; rows whose
    /// timestamp is absent from `index` are dropped. Assumes unique
    /// timestamps in the current index.
    pub fn reindex(&mut self, index: Vec<Timestamp>) {
        let positions: HashMap<Timestamp, usize> = self
            .index
            .iter()
            .enumerate()
            .map(|(i, t)| (*t, i))
            .collect();
        let lookup: Vec<Option<usize>> = index.iter().map(|t| positions.get(t).copied()).collect();

        for column in &mut self.data {
            *column = lookup
                .iter()
                .map(|pos| pos.map_or(f64::NAN, |p| column[p]))
                .collect();
        }
        self.index = index;
    }

    /// Merge `other` into this frame: the index becomes the sorted union of
    /// both indexes, existing non-missing values win, and `other` fills the
    /// gaps. Repeated timestamps collapse onto their first occurrence.
    pub fn combine_first(&mut self, other: Frame) {
        let mut union: Vec<Timestamp> = self.index.iter().chain(other.index.iter()).copied().collect();
        union.sort();
        union.dedup();

        let first_positions = |index: &[Timestamp]| {
            let mut map: HashMap<Timestamp, usize> = HashMap::with_capacity(index.len());
            for (i, t) in index.iter().enumerate() {
                map.entry(*t).or_insert(i);
            }
            map
        };
        let ours = first_positions(&self.index);
        let theirs = first_positions(&other.index);

        let realign = |column: &[f64], positions: &HashMap<Timestamp, usize>| -> Vec<f64> {
            union
                .iter()
                .map(|t| positions.get(t).map_or(f64::NAN, |&p| column[p]))
                .collect()
        };

        let mut data: Vec<Vec<f64>> = self.data.iter().map(|c| realign(c, &ours)).collect();
        for ((_, key), column) in other.columns.iter().zip(other.data.iter()) {
            let incoming = realign(column, &theirs);
            match self.columns.id(key) {
                Some(id) => {
                    for (slot, value) in data[id].iter_mut().zip(incoming) {
                        if slot.is_nan() {
                            *slot = value;
                        }
                    }
                }
                None => {
                    // Keys are unique within `other`, so insertion cannot fail.
                    if self.columns.insert(key.clone()).is_ok() {
                        data.push(incoming);
                    }
                }
            }
        }

        self.index = union;
        self.data = data;
    }

    /// Keep only the listed rows, in the given order.
    fn take_rows(&mut self, rows: &[usize]) {
        self.index = rows.iter().map(|&i| self.index[i]).collect();
        for column in &mut self.data {
            *column = rows.iter().map(|&i| column[i]).collect();
        }
    }

    /// Column keys grouped by system, for diagnostics.
    pub fn systems(&self) -> BTreeMap<&str, Vec<&str>> {
        let mut systems: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
        for (_, key) in self.columns.iter() {
            systems
                .entry(key.system.as_str())
                .or_default()
                .push(key.variable.as_str());
        }
        systems
    }
}
