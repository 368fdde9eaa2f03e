//! Time types for the yearly report.
//!
//! This module provides [`EventTime`] for event boundaries as the provider
//! reports them (a concrete instant or an all-day date), [`ReportZone`] for
//! the named zone a report is produced in, and [`YearRange`] for the query
//! window covering one calendar year.

use std::fmt;
use std::str::FromStr;

use chrono::{
    DateTime, FixedOffset, NaiveDate, NaiveDateTime, ParseError, SecondsFormat, TimeZone, Utc,
};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Zone used when the configuration does not name one.
pub const DEFAULT_ZONE: &str = "America/New_York";

/// Errors produced while building time ranges.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TimeError {
    /// The zone name is not in the IANA database.
    #[error("unknown time zone: {0}")]
    UnknownZone(String),

    /// The year cannot be represented.
    #[error("year {0} is out of range")]
    YearOutOfRange(i32),

    /// The wall-clock time falls in a gap of the zone (DST jump).
    #[error("{time} does not exist in {zone}")]
    NonexistentLocalTime { time: NaiveDateTime, zone: String },
}

/// The start or end of a calendar event.
///
/// - **DateTime**: a concrete instant, keeping the offset the provider sent
/// - **AllDay**: a date without a time of day
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventTime {
    /// A concrete instant with its UTC offset.
    DateTime(DateTime<FixedOffset>),
    /// An all-day date.
    AllDay(NaiveDate),
}

impl EventTime {
    /// Parses an RFC 3339 timestamp such as `2024-06-01T10:00:00-04:00`.
    pub fn parse_date_time(value: &str) -> Result<Self, ParseError> {
        DateTime::parse_from_rfc3339(value).map(Self::DateTime)
    }

    /// Parses an all-day date such as `2024-06-01`.
    pub fn parse_date(value: &str) -> Result<Self, ParseError> {
        NaiveDate::parse_from_str(value, "%Y-%m-%d").map(Self::AllDay)
    }

    /// Returns `true` if this is an all-day date.
    pub fn is_all_day(&self) -> bool {
        matches!(self, Self::AllDay(_))
    }

    /// Returns the instant if this is a `DateTime`.
    pub fn as_datetime(&self) -> Option<&DateTime<FixedOffset>> {
        match self {
            Self::DateTime(dt) => Some(dt),
            Self::AllDay(_) => None,
        }
    }
}

/// A named IANA time zone used for queries and ranges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ReportZone(Tz);

impl ReportZone {
    /// Wraps a `chrono_tz` zone.
    pub fn new(tz: Tz) -> Self {
        Self(tz)
    }

    /// Returns the IANA name, e.g. `America/New_York`.
    pub fn name(&self) -> &'static str {
        self.0.name()
    }

    /// Returns the underlying zone.
    pub fn tz(&self) -> Tz {
        self.0
    }

    /// Interprets a wall-clock time in this zone.
    ///
    /// Ambiguous times (DST fall-back) resolve to the earlier instant.
    pub fn localize(&self, naive: NaiveDateTime) -> Result<DateTime<FixedOffset>, TimeError> {
        self.0
            .from_local_datetime(&naive)
            .earliest()
            .map(|dt| dt.fixed_offset())
            .ok_or_else(|| TimeError::NonexistentLocalTime {
                time: naive,
                zone: self.name().to_string(),
            })
    }
}

impl Default for ReportZone {
    fn default() -> Self {
        Self(Tz::America__New_York)
    }
}

impl FromStr for ReportZone {
    type Err = TimeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<Tz>()
            .map(Self)
            .map_err(|_| TimeError::UnknownZone(s.to_string()))
    }
}

impl TryFrom<String> for ReportZone {
    type Error = TimeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ReportZone> for String {
    fn from(zone: ReportZone) -> Self {
        zone.name().to_string()
    }
}

impl fmt::Display for ReportZone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// How the wall-clock bounds of a [`YearRange`] are anchored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RangeAnchor {
    /// Bounds are wall-clock times in the report zone.
    #[default]
    Zone,
    /// Bounds are the same wall-clock times read as UTC (`Z` suffix).
    ///
    /// Near the year edges this shifts the window by the zone's offset.
    Utc,
}

/// The query window for one calendar year: Jan 1 00:00:00 through
/// Dec 31 23:59:59.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct YearRange {
    year: i32,
    start: DateTime<FixedOffset>,
    end: DateTime<FixedOffset>,
}

impl YearRange {
    /// Builds the range for `year`, anchored as requested.
    pub fn new(year: i32, zone: &ReportZone, anchor: RangeAnchor) -> Result<Self, TimeError> {
        let naive_start = NaiveDate::from_ymd_opt(year, 1, 1)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .ok_or(TimeError::YearOutOfRange(year))?;
        let naive_end = NaiveDate::from_ymd_opt(year, 12, 31)
            .and_then(|d| d.and_hms_opt(23, 59, 59))
            .ok_or(TimeError::YearOutOfRange(year))?;

        let (start, end) = match anchor {
            RangeAnchor::Zone => (zone.localize(naive_start)?, zone.localize(naive_end)?),
            RangeAnchor::Utc => (
                Utc.from_utc_datetime(&naive_start).fixed_offset(),
                Utc.from_utc_datetime(&naive_end).fixed_offset(),
            ),
        };

        Ok(Self { year, start, end })
    }

    /// Returns the calendar year.
    pub fn year(&self) -> i32 {
        self.year
    }

    /// Returns the first instant of the range.
    pub fn start(&self) -> DateTime<FixedOffset> {
        self.start
    }

    /// Returns the last instant of the range.
    pub fn end(&self) -> DateTime<FixedOffset> {
        self.end
    }

    /// Lower bound as sent to the provider.
    pub fn time_min(&self) -> String {
        self.start.to_rfc3339_opts(SecondsFormat::Secs, true)
    }

    /// Upper bound as sent to the provider.
    pub fn time_max(&self) -> String {
        self.end.to_rfc3339_opts(SecondsFormat::Secs, true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_york() -> ReportZone {
        "America/New_York".parse().unwrap()
    }

    fn instant(value: &str) -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339(value).unwrap()
    }

    fn covers(range: &YearRange, instant: DateTime<FixedOffset>) -> bool {
        range.start() <= instant && instant <= range.end()
    }

    mod event_time {
        use super::*;

        #[test]
        fn parses_datetime_with_offset() {
            let t = EventTime::parse_date_time("2024-06-01T10:00:00-04:00").unwrap();
            assert!(!t.is_all_day());
            assert_eq!(t.as_datetime().unwrap().offset().local_minus_utc(), -4 * 3600);
        }

        #[test]
        fn parses_all_day_date() {
            let t = EventTime::parse_date("2024-06-01").unwrap();
            assert!(t.is_all_day());
            assert!(t.as_datetime().is_none());
        }

        #[test]
        fn rejects_garbage() {
            assert!(EventTime::parse_date_time("tomorrow").is_err());
            assert!(EventTime::parse_date("2024-13-01").is_err());
        }
    }

    mod zone {
        use super::*;

        #[test]
        fn default_is_new_york() {
            assert_eq!(ReportZone::default().name(), DEFAULT_ZONE);
        }

        #[test]
        fn parses_iana_names() {
            let zone: ReportZone = "Europe/Paris".parse().unwrap();
            assert_eq!(zone.to_string(), "Europe/Paris");
        }

        #[test]
        fn rejects_unknown_names() {
            let err = "Mars/Olympus_Mons".parse::<ReportZone>().unwrap_err();
            assert_eq!(err, TimeError::UnknownZone("Mars/Olympus_Mons".to_string()));
        }

        #[test]
        fn serde_uses_the_name() {
            let json = serde_json::to_string(&new_york()).unwrap();
            assert_eq!(json, "\"America/New_York\"");
            let back: ReportZone = serde_json::from_str(&json).unwrap();
            assert_eq!(back, new_york());
            assert!(serde_json::from_str::<ReportZone>("\"Nowhere\"").is_err());
        }

        #[test]
        fn spring_forward_gap_is_an_error() {
            let naive = NaiveDate::from_ymd_opt(2024, 3, 10)
                .unwrap()
                .and_hms_opt(2, 30, 0)
                .unwrap();
            assert!(matches!(
                new_york().localize(naive),
                Err(TimeError::NonexistentLocalTime { .. })
            ));
        }
    }

    mod year_range {
        use super::*;

        #[test]
        fn zone_anchor_carries_the_offset() {
            let range = YearRange::new(2024, &new_york(), RangeAnchor::Zone).unwrap();
            assert_eq!(range.year(), 2024);
            assert_eq!(range.time_min(), "2024-01-01T00:00:00-05:00");
            assert_eq!(range.time_max(), "2024-12-31T23:59:59-05:00");
        }

        #[test]
        fn utc_anchor_matches_bare_zulu_bounds() {
            let range = YearRange::new(2024, &new_york(), RangeAnchor::Utc).unwrap();
            assert_eq!(range.time_min(), "2024-01-01T00:00:00Z");
            assert_eq!(range.time_max(), "2024-12-31T23:59:59Z");
        }

        #[test]
        fn southern_hemisphere_uses_summer_offset() {
            let sydney: ReportZone = "Australia/Sydney".parse().unwrap();
            let range = YearRange::new(2024, &sydney, RangeAnchor::Zone).unwrap();
            assert_eq!(range.time_min(), "2024-01-01T00:00:00+11:00");
        }

        #[test]
        fn anchors_disagree_at_the_year_edges() {
            let zone = YearRange::new(2024, &new_york(), RangeAnchor::Zone).unwrap();
            let utc = YearRange::new(2024, &new_york(), RangeAnchor::Utc).unwrap();

            // New Year's Eve party in New York, still 2023 locally.
            let nye = instant("2023-12-31T20:00:00-05:00");
            assert!(!covers(&zone, nye));
            assert!(covers(&utc, nye));

            // Late on Dec 31 2024 locally is already 2025 in UTC.
            let late = instant("2024-12-31T21:00:00-05:00");
            assert!(covers(&zone, late));
            assert!(!covers(&utc, late));
        }

        #[test]
        fn bounds_are_inclusive() {
            let range = YearRange::new(2023, &new_york(), RangeAnchor::Zone).unwrap();
            assert!(covers(&range, range.start()));
            assert!(covers(&range, range.end()));
        }

        #[test]
        fn year_out_of_range() {
            let err = YearRange::new(i32::MAX, &new_york(), RangeAnchor::Zone).unwrap_err();
            assert_eq!(err, TimeError::YearOutOfRange(i32::MAX));
        }
    }
}
