//! Run-length block extraction.
//!
//! Input is column-major with `true` marking a failing sample. Each column is
//! scanned once; a run starts where a `true` follows a `false` (or row 0) and
//! ends where a `true` precedes a `false` (or the last row). Runs never span
//! columns.

/// A maximal run of failing samples inside one column (rows are inclusive).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Block {
    pub column: usize,
    pub start: usize,
    pub end: usize,
}

impl Block {
    /// Number of samples in the run.
    pub fn len(&self) -> usize {
        self.end - self.start + 1
    }

    /// Always false: a block holds at least one sample.
    pub fn is_empty(&self) -> bool {
        false
    }
}

/// Iterator over the `(start, end)` runs of `true` in a single column.
#[derive(Debug, Clone)]
pub struct Runs<'a> {
    column: &'a [bool],
    pos: usize,
}

impl<'a> Runs<'a> {
    pub fn new(column: &'a [bool]) -> Self {
        Self { column, pos: 0 }
    }
}

impl Iterator for Runs<'_> {
    type Item = (usize, usize);

    fn next(&mut self) -> Option<Self::Item> {
        let rest = self.column.get(self.pos..)?;
        let start = self.pos + rest.iter().position(|f| *f)?;
        let len = self.column[start..]
            .iter()
            .position(|f| !*f)
            .unwrap_or(self.column.len() - start);
        let end = start + len - 1;
        self.pos = end + 1;
        Some((start, end))
    }
}

/// Find every run of failures, ordered by column then by start row.
pub fn extract_blocks<C: AsRef<[bool]>>(failures: &[C]) -> Vec<Block> {
    failures
        .iter()
        .enumerate()
        .flat_map(|(column, values)| {
            Runs::new(values.as_ref()).map(move |(start, end)| Block { column, start, end })
        })
        .collect()
}
