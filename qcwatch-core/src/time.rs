//! Time index utilities: rounding, elapsed / clock time and window parsing.

use std::time::Duration;

use qcwatch_types::Timestamp;

use crate::error::{QcError, Result};

/// How [`round_index`] moves a timestamp onto the frequency grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RoundMode {
    /// Nearest grid point; exact halves go to the even multiple.
    #[default]
    Nearest,
    /// Largest grid point not after the timestamp.
    Floor,
    /// Smallest grid point not before the timestamp.
    Ceiling,
}

/// Round every timestamp onto a grid of `frequency` seconds anchored at the
/// Unix epoch.
pub fn round_index(index: &[Timestamp], frequency: u64, how: RoundMode) -> Result<Vec<Timestamp>> {
    let step = frequency_millis(frequency)?;
    Ok(index.iter().map(|t| round_one(*t, step, how)).collect())
}

fn round_one(t: Timestamp, step: i64, how: RoundMode) -> Timestamp {
    let ms = t.as_millis();
    let q = ms.div_euclid(step);
    let r = ms.rem_euclid(step);
    let q = match how {
        RoundMode::Floor => q,
        RoundMode::Ceiling if r > 0 => q + 1,
        RoundMode::Ceiling => q,
        RoundMode::Nearest => {
            if 2 * r > step || (2 * r == step && q % 2 != 0) {
                q + 1
            } else {
                q
            }
        }
    };
    Timestamp::from_millis(q * step)
}

/// Convert a frequency in seconds to a millisecond step, rejecting zero.
pub(crate) fn frequency_millis(frequency: u64) -> Result<i64> {
    if frequency == 0 {
        return Err(QcError::InvalidFrequency("frequency must be positive".into()));
    }
    i64::try_from(frequency)
        .ok()
        .and_then(|f| f.checked_mul(1000))
        .ok_or_else(|| QcError::InvalidFrequency(format!("{frequency}s is out of range")))
}

/// Seconds elapsed since the first timestamp of the index.
pub fn elapsed_seconds(index: &[Timestamp]) -> Vec<f64> {
    let Some(first) = index.first() else {
        return Vec::new();
    };
    index
        .iter()
        .map(|t| (t.as_millis() - first.as_millis()) as f64 / 1000.0)
        .collect()
}

/// Seconds past midnight for each timestamp.
pub fn clock_seconds(index: &[Timestamp]) -> Vec<f64> {
    index.iter().map(|t| t.millis_of_day() as f64 / 1000.0).collect()
}

/// Regular grid from `start` to `end` (inclusive when aligned) every `step`.
pub fn regular_grid(start: Timestamp, end: Timestamp, step: Duration) -> Result<Vec<Timestamp>> {
    let step_ms = i64::try_from(step.as_millis())
        .ok()
        .filter(|s| *s > 0)
        .ok_or_else(|| QcError::InvalidFrequency(format!("{step:?}")))?;

    if end < start {
        return Ok(Vec::new());
    }
    let count = (end.as_millis() - start.as_millis()) / step_ms + 1;
    Ok((0..count)
        .map(|i| Timestamp::from_millis(start.as_millis() + i * step_ms))
        .collect())
}

/// Suffix to seconds multiplier (order matters: longer suffixes first)
const UNITS: &[(&str, f64)] = &[
    ("ms", 0.001),
    ("s", 1.0),
    ("m", 60.0),
    ("h", 3600.0),
    ("d", 86_400.0),
];

/// Parse window strings like "900", "900s", "15m", "1.5h", "500ms", "1d".
///
/// A bare number is taken as seconds.
pub fn parse_window(s: &str) -> Result<Duration> {
    let s = s.trim();
    let invalid = || QcError::InvalidWindow(s.to_string());

    let (value, multiplier) = UNITS
        .iter()
        .find_map(|(suffix, multiplier)| s.strip_suffix(suffix).map(|v| (v, *multiplier)))
        .unwrap_or((s, 1.0));

    let value: f64 = value.trim().parse().map_err(|_| invalid())?;
    if !value.is_finite() || value < 0.0 {
        return Err(invalid());
    }
    Ok(Duration::from_secs_f64(value * multiplier))
}

/// Format a window for log messages and error descriptions.
pub fn format_window(d: Duration) -> String {
    let millis = d.as_millis();
    if millis % 3_600_000 == 0 && millis > 0 {
        format!("{}h", millis / 3_600_000)
    } else if millis % 60_000 == 0 && millis > 0 {
        format!("{}m", millis / 60_000)
    } else if millis % 1000 == 0 {
        format!("{}s", millis / 1000)
    } else {
        format!("{millis}ms")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(hms: &[(i64, i64, i64)]) -> Vec<Timestamp> {
        hms.iter()
            .map(|(h, m, s)| Timestamp::from_secs(1_451_606_400 + h * 3600 + m * 60 + s))
            .collect()
    }

    fn sample_index() -> Vec<Timestamp> {
        ts(&[
            (0, 0, 14),
            (0, 0, 30),
            (0, 0, 40),
            (0, 0, 44),
            (0, 0, 59),
            (0, 1, 0),
            (0, 1, 14),
            (0, 1, 32),
            (0, 1, 45),
            (0, 2, 5),
        ])
    }

    #[test]
    fn round_index_nearest() {
        let rounded = round_index(&sample_index(), 15, RoundMode::Nearest).unwrap();
        let expected = ts(&[
            (0, 0, 15),
            (0, 0, 30),
            (0, 0, 45),
            (0, 0, 45),
            (0, 1, 0),
            (0, 1, 0),
            (0, 1, 15),
            (0, 1, 30),
            (0, 1, 45),
            (0, 2, 0),
        ]);
        assert_eq!(rounded, expected);
    }

    #[test]
    fn round_index_floor() {
        let rounded = round_index(&sample_index(), 15, RoundMode::Floor).unwrap();
        let expected = ts(&[
            (0, 0, 0),
            (0, 0, 30),
            (0, 0, 30),
            (0, 0, 30),
            (0, 0, 45),
            (0, 1, 0),
            (0, 1, 0),
            (0, 1, 30),
            (0, 1, 45),
            (0, 2, 0),
        ]);
        assert_eq!(rounded, expected);
    }

    #[test]
    fn round_index_ceiling() {
        let rounded = round_index(&sample_index(), 15, RoundMode::Ceiling).unwrap();
        let expected = ts(&[
            (0, 0, 15),
            (0, 0, 30),
            (0, 0, 45),
            (0, 0, 45),
            (0, 1, 0),
            (0, 1, 0),
            (0, 1, 15),
            (0, 1, 45),
            (0, 1, 45),
            (0, 2, 15),
        ]);
        assert_eq!(rounded, expected);
    }

    #[test]
    fn nearest_ties_go_to_even_multiple() {
        let index = vec![Timestamp::from_millis(7_500), Timestamp::from_millis(22_500)];
        let rounded = round_index(&index, 15, RoundMode::Nearest).unwrap();
        assert_eq!(rounded, vec![Timestamp::from_secs(0), Timestamp::from_secs(30)]);
    }

    #[test]
    fn zero_frequency_is_rejected() {
        assert!(round_index(&sample_index(), 0, RoundMode::Floor).is_err());
    }

    #[test]
    fn elapsed_and_clock_time() {
        // 48 hourly samples starting 1990-01-01 02:15
        let start = 631_152_000 + 2 * 3600 + 15 * 60;
        let index: Vec<_> = (0..48).map(|i| Timestamp::from_secs(start + i * 3600)).collect();

        let elapsed = elapsed_seconds(&index);
        assert_eq!(elapsed[0], 0.0);
        assert_eq!(elapsed[47], 47.0 * 3600.0);

        let clock = clock_seconds(&index);
        assert_eq!(clock[0], 2.25 * 3600.0);
        assert_eq!(clock[22], 0.25 * 3600.0);
    }

    #[test]
    fn elapsed_of_empty_index() {
        assert!(elapsed_seconds(&[]).is_empty());
    }

    #[test]
    fn grid_includes_aligned_end() {
        let grid = regular_grid(
            Timestamp::from_secs(0),
            Timestamp::from_secs(3600),
            Duration::from_secs(900),
        )
        .unwrap();
        assert_eq!(grid.len(), 5);
        assert_eq!(grid[4], Timestamp::from_secs(3600));

        let unaligned = regular_grid(
            Timestamp::from_secs(0),
            Timestamp::from_secs(3500),
            Duration::from_secs(900),
        )
        .unwrap();
        assert_eq!(unaligned.len(), 4);
    }

    #[test]
    fn parse_window_units() {
        assert_eq!(parse_window("900").unwrap(), Duration::from_secs(900));
        assert_eq!(parse_window("900s").unwrap(), Duration::from_secs(900));
        assert_eq!(parse_window("15m").unwrap(), Duration::from_secs(900));
        assert_eq!(parse_window("1.5h").unwrap(), Duration::from_secs(5400));
        assert_eq!(parse_window("500ms").unwrap(), Duration::from_millis(500));
        assert_eq!(parse_window(" 1d ").unwrap(), Duration::from_secs(86_400));
    }

    #[test]
    fn parse_window_rejects_garbage() {
        assert!(parse_window("abc").is_err());
        assert!(parse_window("-5s").is_err());
        assert!(parse_window("10x").is_err());
    }

    #[test]
    fn format_window_picks_largest_unit() {
        assert_eq!(format_window(Duration::from_secs(7200)), "2h");
        assert_eq!(format_window(Duration::from_secs(900)), "15m");
        assert_eq!(format_window(Duration::from_secs(3601)), "3601s");
        assert_eq!(format_window(Duration::from_millis(1500)), "1500ms");
    }
}
