use std::fmt;

use chrono::{DateTime, Duration, SecondsFormat, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// A single UTC instant with microsecond precision.
///
/// Sub-microsecond precision is truncated at construction so that a
/// timestamp survives the integer encoding used by the graph store
/// unchanged.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "DateTime<Utc>")]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// The current wall-clock time.
    pub fn now() -> Self {
        Self::from_datetime(Utc::now())
    }

    /// Wrap an existing chrono datetime.
    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self(dt.trunc_subsecs(6))
    }

    /// Decode from microseconds since the UNIX epoch.
    pub fn from_micros(micros: i64) -> Result<Self, TypeError> {
        DateTime::<Utc>::from_timestamp_micros(micros)
            .map(Self)
            .ok_or_else(|| TypeError::InvalidTimestamp(format!("{micros}us out of range")))
    }

    /// Parse an RFC 3339 string.
    pub fn parse(s: &str) -> Result<Self, TypeError> {
        let dt = DateTime::parse_from_rfc3339(s)
            .map_err(|e| TypeError::InvalidTimestamp(format!("{s}: {e}")))?;
        Ok(Self::from_datetime(dt.with_timezone(&Utc)))
    }

    /// Microseconds since the UNIX epoch.
    pub fn as_micros(&self) -> i64 {
        self.0.timestamp_micros()
    }

    /// The underlying chrono datetime.
    pub fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }

    /// Shift forward by `delta`, saturating at the representable maximum.
    pub fn add(&self, delta: Duration) -> Self {
        Self::from_datetime(
            self.0
                .checked_add_signed(delta)
                .unwrap_or(DateTime::<Utc>::MAX_UTC),
        )
    }

    /// Shift backward by `delta`, saturating at the representable minimum.
    pub fn sub(&self, delta: Duration) -> Self {
        Self::from_datetime(
            self.0
                .checked_sub_signed(delta)
                .unwrap_or(DateTime::<Utc>::MIN_UTC),
        )
    }

    pub fn add_seconds(&self, seconds: i64) -> Self {
        self.add(Duration::seconds(seconds))
    }

    pub fn add_minutes(&self, minutes: i64) -> Self {
        self.add(Duration::minutes(minutes))
    }

    pub fn add_hours(&self, hours: i64) -> Self {
        self.add(Duration::hours(hours))
    }

    pub fn add_days(&self, days: i64) -> Self {
        self.add(Duration::days(days))
    }

    /// Returns `true` if this instant is strictly before `other`.
    pub fn is_before(&self, other: &Self) -> bool {
        self < other
    }

    /// Returns `true` if this instant is strictly after `other`.
    pub fn is_after(&self, other: &Self) -> bool {
        self > other
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(dt: DateTime<Utc>) -> Self {
        Self::from_datetime(dt)
    }
}

impl fmt::Debug for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Timestamp({self})")
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.to_rfc3339_opts(SecondsFormat::Micros, true))
    }
}

/// Half-open validity window `[from, to)` of a diff.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeRange {
    pub from: Timestamp,
    pub to: Timestamp,
}

impl TimeRange {
    /// Build a range, rejecting `from > to`.
    pub fn new(from: Timestamp, to: Timestamp) -> Result<Self, TypeError> {
        if from > to {
            return Err(TypeError::InvalidTimeRange {
                from: from.to_string(),
                to: to.to_string(),
            });
        }
        Ok(Self { from, to })
    }

    /// Half-open intersection test. Ranges that only touch at a boundary
    /// do not overlap.
    pub fn overlaps(&self, other: &Self) -> bool {
        self.from < other.to && self.to > other.from
    }

    /// Returns `true` if `other` lies entirely within this range.
    pub fn contains(&self, other: &Self) -> bool {
        self.from <= other.from && self.to >= other.to
    }

    /// Containment where the two ranges are not identical.
    pub fn strictly_contains(&self, other: &Self) -> bool {
        self.contains(other) && self != other
    }

    /// Length of the window.
    pub fn duration(&self) -> Duration {
        self.to.0 - self.from.0
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.from, self.to)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn ts(micros: i64) -> Timestamp {
        Timestamp::from_micros(micros).unwrap()
    }

    #[test]
    fn construction_truncates_to_micros() {
        let dt = DateTime::parse_from_rfc3339("2024-06-15T18:35:20.123456789Z")
            .unwrap()
            .with_timezone(&Utc);
        let t = Timestamp::from_datetime(dt);
        assert_eq!(t.to_string(), "2024-06-15T18:35:20.123456Z");
        assert_eq!(Timestamp::from_micros(t.as_micros()).unwrap(), t);
    }

    #[test]
    fn parse_and_display() {
        let t = Timestamp::parse("2024-06-15T18:35:20Z").unwrap();
        assert_eq!(t.to_string(), "2024-06-15T18:35:20.000000Z");
        assert!(Timestamp::parse("yesterday").is_err());
    }

    #[test]
    fn arithmetic() {
        let t = Timestamp::parse("2024-06-15T18:35:20Z").unwrap();
        assert_eq!(t.add_minutes(30).sub(Duration::minutes(30)), t);
        assert!(t.add_seconds(1).is_after(&t));
        assert!(t.sub(Duration::hours(1)).is_before(&t));
        assert_eq!(t.add_days(1), t.add_hours(24));
    }

    #[test]
    fn add_saturates() {
        let t = Timestamp::from_datetime(DateTime::<Utc>::MAX_UTC);
        assert_eq!(t.add_days(1), t);
    }

    #[test]
    fn range_rejects_inverted_bounds() {
        let err = TimeRange::new(ts(10), ts(5)).unwrap_err();
        assert!(matches!(err, TypeError::InvalidTimeRange { .. }));
        assert!(TimeRange::new(ts(5), ts(5)).is_ok());
    }

    #[test]
    fn touching_ranges_do_not_overlap() {
        let a = TimeRange::new(ts(0), ts(10)).unwrap();
        let b = TimeRange::new(ts(10), ts(20)).unwrap();
        assert!(!a.overlaps(&b));
        assert!(!b.overlaps(&a));
    }

    #[test]
    fn containment() {
        let outer = TimeRange::new(ts(0), ts(100)).unwrap();
        let inner = TimeRange::new(ts(10), ts(90)).unwrap();
        assert!(outer.contains(&inner));
        assert!(outer.strictly_contains(&inner));
        assert!(outer.contains(&outer));
        assert!(!outer.strictly_contains(&outer));
        assert!(!inner.contains(&outer));
    }

    #[test]
    fn serde_roundtrip() {
        let t = Timestamp::parse("2024-06-15T18:35:20.5Z").unwrap();
        let json = serde_json::to_string(&t).unwrap();
        let parsed: Timestamp = serde_json::from_str(&json).unwrap();
        assert_eq!(t, parsed);
    }

    #[test]
    fn deserialize_truncates_to_micros() {
        let parsed: Timestamp = serde_json::from_str("\"2024-06-15T18:00:00.123456789Z\"").unwrap();
        assert_eq!(parsed, Timestamp::parse("2024-06-15T18:00:00.123456Z").unwrap());
        assert_eq!(Timestamp::from_micros(parsed.as_micros()).unwrap(), parsed);
    }

    proptest! {
        #[test]
        fn overlap_matches_half_open_rule(
            t0 in 0i64..1_000_000,
            len in 0i64..1_000_000,
            a in 0i64..2_000_000,
            qlen in 0i64..1_000_000,
        ) {
            let stored = TimeRange::new(ts(t0), ts(t0 + len)).unwrap();
            let query = TimeRange::new(ts(a), ts(a + qlen)).unwrap();
            let expected = a < t0 + len && a + qlen > t0;
            prop_assert_eq!(query.overlaps(&stored), expected);
            prop_assert_eq!(stored.overlaps(&query), expected);
        }
    }
}
