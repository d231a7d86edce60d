//! Pass/fail masks produced by quality control checks.
//!
//! A [`Mask`] is column-major with `true` meaning the sample **passed**.
//! Checks usually compute failures first, so [`Mask::from_failures`] is the
//! common constructor; [`Mask::failures`] turns the polarity back around for
//! the block extractor, which always looks for runs of `true`.

use qcwatch_types::Timestamp;

use crate::error::{QcError, Result};
use crate::frame::ColumnId;

/// What the columns of a mask refer to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MaskTarget {
    /// One mask column per listed frame column, aligned with the frame rows.
    Columns(Vec<ColumnId>),
    /// A single unnamed column describing whole rows. The mask carries its
    /// own index, which need not match the frame (timestamp checks).
    Row,
}

impl MaskTarget {
    /// Number of mask columns this target implies.
    pub fn width(&self) -> usize {
        match self {
            MaskTarget::Columns(ids) => ids.len(),
            MaskTarget::Row => 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Mask {
    index: Vec<Timestamp>,
    target: MaskTarget,
    passed: Vec<Vec<bool>>,
}

impl Mask {
    /// A mask where every cell passed.
    pub fn passing(index: Vec<Timestamp>, target: MaskTarget) -> Self {
        let passed = vec![vec![true; index.len()]; target.width()];
        Self {
            index,
            target,
            passed,
        }
    }

    /// Build from pass-polarity columns.
    pub fn from_passed(index: Vec<Timestamp>, target: MaskTarget, passed: Vec<Vec<bool>>) -> Result<Self> {
        if passed.len() != target.width() {
            return Err(QcError::ShapeMismatch {
                expected: target.width(),
                got: passed.len(),
            });
        }
        if let Some(bad) = passed.iter().find(|c| c.len() != index.len()) {
            return Err(QcError::ShapeMismatch {
                expected: index.len(),
                got: bad.len(),
            });
        }
        Ok(Self {
            index,
            target,
            passed,
        })
    }

    /// Build from failure-polarity columns (`true` = failed).
    pub fn from_failures(
        index: Vec<Timestamp>,
        target: MaskTarget,
        failures: Vec<Vec<bool>>,
    ) -> Result<Self> {
        let passed = failures
            .into_iter()
            .map(|col| col.into_iter().map(|failed| !failed).collect())
            .collect();
        Self::from_passed(index, target, passed)
    }

    /// Whole-row mask from a single failure column.
    pub fn rows_failing(index: Vec<Timestamp>, failures: Vec<bool>) -> Result<Self> {
        Self::from_failures(index, MaskTarget::Row, vec![failures])
    }

    pub fn index(&self) -> &[Timestamp] {
        &self.index
    }

    pub fn target(&self) -> &MaskTarget {
        &self.target
    }

    pub fn n_rows(&self) -> usize {
        self.index.len()
    }

    pub fn n_cols(&self) -> usize {
        self.passed.len()
    }

    /// Pass-polarity column.
    pub fn column(&self, i: usize) -> Option<&[bool]> {
        self.passed.get(i).map(Vec::as_slice)
    }

    /// All pass-polarity columns.
    pub fn columns(&self) -> &[Vec<bool>] {
        &self.passed
    }

    /// Failure-polarity copy of the mask, for the block extractor.
    pub fn failures(&self) -> Vec<Vec<bool>> {
        self.passed
            .iter()
            .map(|col| col.iter().map(|p| !p).collect())
            .collect()
    }

    /// Number of failed cells.
    pub fn failure_count(&self) -> usize {
        self.passed.iter().flatten().filter(|p| !**p).count()
    }

    /// Number of passed cells.
    pub fn pass_count(&self) -> usize {
        self.passed.iter().flatten().filter(|p| **p).count()
    }

    /// True if no cell failed.
    pub fn all_passed(&self) -> bool {
        self.passed.iter().flatten().all(|p| *p)
    }

    /// Force every row excluded by `filter` to pass.
    pub fn apply_filter(&mut self, filter: &[bool]) -> Result<()> {
        if filter.len() != self.index.len() {
            return Err(QcError::ShapeMismatch {
                expected: self.index.len(),
                got: filter.len(),
            });
        }
        for col in &mut self.passed {
            for (cell, keep) in col.iter_mut().zip(filter) {
                if !keep {
                    *cell = true;
                }
            }
        }
        Ok(())
    }

    /// Mark rows `start..=end` of mask column `col` as failed.
    pub fn fail_range(&mut self, col: usize, start: usize, end: usize) {
        if let Some(column) = self.passed.get_mut(col) {
            let end = end.min(column.len().saturating_sub(1));
            if start <= end {
                column[start..=end].iter_mut().for_each(|c| *c = false);
            }
        }
    }

    /// Mark rows `start..=end` as failed in every column.
    pub fn fail_rows(&mut self, start: usize, end: usize) {
        for col in 0..self.passed.len() {
            self.fail_range(col, start, end);
        }
    }

    /// Keep only the rows where `filter` is true.
    pub fn retain_rows(&self, filter: &[bool]) -> Result<Mask> {
        if filter.len() != self.index.len() {
            return Err(QcError::ShapeMismatch {
                expected: self.index.len(),
                got: filter.len(),
            });
        }
        let keep = |i: &usize| filter[*i];
        let rows: Vec<usize> = (0..self.index.len()).filter(keep).collect();
        Ok(Mask {
            index: rows.iter().map(|&i| self.index[i]).collect(),
            target: self.target.clone(),
            passed: self
                .passed
                .iter()
                .map(|col| rows.iter().map(|&i| col[i]).collect())
                .collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index(n: i64) -> Vec<Timestamp> {
        (0..n).map(|i| Timestamp::from_secs(i * 60)).collect()
    }

    #[test]
    fn passing_mask_has_no_failures() {
        let mask = Mask::passing(index(4), MaskTarget::Columns(vec![0, 1]));
        assert_eq!(mask.n_cols(), 2);
        assert!(mask.all_passed());
        assert_eq!(mask.pass_count(), 8);
    }

    #[test]
    fn failures_flip_polarity() {
        let mask = Mask::rows_failing(index(3), vec![false, true, false]).unwrap();
        assert_eq!(mask.column(0).unwrap(), &[true, false, true]);
        assert_eq!(mask.failures(), vec![vec![false, true, false]]);
        assert_eq!(mask.failure_count(), 1);
    }

    #[test]
    fn shape_is_validated() {
        let err = Mask::from_passed(index(3), MaskTarget::Columns(vec![0]), vec![vec![true; 2]]);
        assert!(matches!(err, Err(QcError::ShapeMismatch { expected: 3, got: 2 })));

        let err = Mask::from_passed(index(3), MaskTarget::Columns(vec![0, 1]), vec![vec![true; 3]]);
        assert!(matches!(err, Err(QcError::ShapeMismatch { expected: 2, got: 1 })));
    }

    #[test]
    fn filter_forces_pass() {
        let mut mask = Mask::from_failures(
            index(3),
            MaskTarget::Columns(vec![0]),
            vec![vec![true, true, true]],
        )
        .unwrap();
        mask.apply_filter(&[true, false, true]).unwrap();
        assert_eq!(mask.column(0).unwrap(), &[false, true, false]);
        assert!(mask.apply_filter(&[true]).is_err());
    }

    #[test]
    fn fail_range_clamps_to_length() {
        let mut mask = Mask::passing(index(4), MaskTarget::Columns(vec![0, 1]));
        mask.fail_range(1, 2, 10);
        mask.fail_rows(0, 0);
        assert_eq!(mask.column(0).unwrap(), &[false, true, true, true]);
        assert_eq!(mask.column(1).unwrap(), &[false, true, false, false]);
    }

    #[test]
    fn retain_rows_subsets_index() {
        let mask = Mask::rows_failing(index(3), vec![true, false, true]).unwrap();
        let kept = mask.retain_rows(&[false, true, true]).unwrap();
        assert_eq!(kept.index(), &index(3)[1..]);
        assert_eq!(kept.column(0).unwrap(), &[true, false]);
    }
}
