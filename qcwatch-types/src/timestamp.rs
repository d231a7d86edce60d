//! Timestamp representation for serialization.
//!
//! We use integer milliseconds since the Unix epoch as the canonical unit so
//! that equality, ordering and calendar-day bucketing are exact. Timestamps
//! are naive wall-clock times: no time zone is attached or applied.

use core::fmt;
use core::time::Duration;

/// Milliseconds in one calendar day.
pub const MILLIS_PER_DAY: i64 = 86_400_000;

/// A point in time, in milliseconds since the Unix epoch.
///
/// Negative values are valid and refer to instants before 1970.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
#[cfg_attr(feature = "minicbor", derive(minicbor::Encode, minicbor::Decode))]
#[cfg_attr(feature = "minicbor", cbor(transparent))]
pub struct Timestamp(#[cfg_attr(feature = "minicbor", n(0))] pub i64);

impl Timestamp {
    /// Create from milliseconds since the epoch.
    pub const fn from_millis(millis: i64) -> Self {
        Self(millis)
    }

    /// Create from whole seconds since the epoch.
    pub const fn from_secs(secs: i64) -> Self {
        Self(secs * 1000)
    }

    /// Get the value in milliseconds.
    pub const fn as_millis(&self) -> i64 {
        self.0
    }

    /// Get the value in (fractional) seconds.
    pub fn as_secs_f64(&self) -> f64 {
        self.0 as f64 / 1000.0
    }

    /// Calendar day number (days since 1970-01-01).
    pub const fn day(&self) -> i64 {
        self.0.div_euclid(MILLIS_PER_DAY)
    }

    /// Midnight at the start of this timestamp's calendar day.
    pub const fn start_of_day(&self) -> Self {
        Self(self.day() * MILLIS_PER_DAY)
    }

    /// Milliseconds elapsed since midnight.
    pub const fn millis_of_day(&self) -> i64 {
        self.0.rem_euclid(MILLIS_PER_DAY)
    }

    /// Add a duration, saturating at the representable range.
    pub fn saturating_add(self, d: Duration) -> Self {
        let millis = i64::try_from(d.as_millis()).unwrap_or(i64::MAX);
        Self(self.0.saturating_add(millis))
    }

    /// Subtract a duration, saturating at the representable range.
    pub fn saturating_sub(self, d: Duration) -> Self {
        let millis = i64::try_from(d.as_millis()).unwrap_or(i64::MAX);
        Self(self.0.saturating_sub(millis))
    }
}

#[cfg(feature = "chrono")]
impl Timestamp {
    /// Convert from a naive date-time.
    pub fn from_naive(dt: chrono::NaiveDateTime) -> Self {
        Self(dt.and_utc().timestamp_millis())
    }

    /// Convert to a naive date-time, if the value is in chrono's range.
    pub fn to_naive(&self) -> Option<chrono::NaiveDateTime> {
        chrono::DateTime::from_timestamp_millis(self.0).map(|dt| dt.naive_utc())
    }
}

#[cfg(feature = "chrono")]
impl From<chrono::NaiveDateTime> for Timestamp {
    fn from(dt: chrono::NaiveDateTime) -> Self {
        Self::from_naive(dt)
    }
}

impl fmt::Display for Timestamp {
    #[cfg(feature = "chrono")]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_naive() {
            Some(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S")),
            None => write!(f, "{}ms", self.0),
        }
    }

    #[cfg(not(feature = "chrono"))]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ms", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversions() {
        let t = Timestamp::from_secs(90);
        assert_eq!(t.as_millis(), 90_000);
        assert!((t.as_secs_f64() - 90.0).abs() < 1e-12);
    }

    #[test]
    fn day_and_time_of_day() {
        // 2015-01-01 03:15:00
        let t = Timestamp::from_secs(1_420_082_100);
        assert_eq!(t.day(), 16_436);
        assert_eq!(t.millis_of_day(), (3 * 3600 + 15 * 60) * 1000);
        assert_eq!(t.start_of_day(), Timestamp::from_secs(1_420_070_400));
    }

    #[test]
    fn negative_timestamps_bucket_into_previous_day() {
        let t = Timestamp::from_millis(-1);
        assert_eq!(t.day(), -1);
        assert_eq!(t.millis_of_day(), MILLIS_PER_DAY - 1);
    }

    #[test]
    fn saturating_arithmetic() {
        let t = Timestamp::from_secs(10);
        assert_eq!(t.saturating_add(Duration::from_secs(5)), Timestamp::from_secs(15));
        assert_eq!(t.saturating_sub(Duration::from_secs(5)), Timestamp::from_secs(5));
        assert_eq!(
            Timestamp::from_millis(i64::MAX).saturating_add(Duration::from_secs(1)),
            Timestamp::from_millis(i64::MAX)
        );
    }

    #[test]
    fn default_is_epoch() {
        assert_eq!(Timestamp::default().as_millis(), 0);
    }

    #[cfg(feature = "chrono")]
    #[test]
    fn chrono_roundtrip_and_display() {
        let dt = chrono::NaiveDate::from_ymd_opt(2015, 1, 1)
            .unwrap()
            .and_hms_opt(17, 0, 0)
            .unwrap();
        let t = Timestamp::from(dt);
        assert_eq!(t.to_naive(), Some(dt));
        assert_eq!(t.to_string(), "2015-01-01 17:00:00");
    }
}
