//! Missing and corrupt samples.

use qcwatch_types::Timestamp;

/// Flag non-finite samples, except rows inside any of the `excluded`
/// (inclusive) time ranges, which were already reported as missing
/// timestamps.
pub fn missing_failures(
    index: &[Timestamp],
    columns: &[Vec<f64>],
    excluded: &[(Timestamp, Timestamp)],
) -> Vec<Vec<bool>> {
    let reported: Vec<bool> = index
        .iter()
        .map(|t| excluded.iter().any(|(start, end)| start <= t && t <= end))
        .collect();

    columns
        .iter()
        .map(|col| {
            col.iter()
                .zip(&reported)
                .map(|(v, skip)| !v.is_finite() && !skip)
                .collect()
        })
        .collect()
}

/// Flag samples exactly equal to one of the sentinel values.
pub fn corrupt_failures(columns: &[Vec<f64>], sentinels: &[f64]) -> Vec<Vec<bool>> {
    columns
        .iter()
        .map(|col| col.iter().map(|v| sentinels.contains(v)).collect())
        .collect()
}
