//! Timestamp normalization and date-range filtering
//!
//! Every timestamp entering the engine is normalized to UTC. HMS systems are
//! inconsistent about formats, so parsing accepts:
//! - RFC 3339 (`2024-03-01T08:30:00Z`, `2024-03-01T08:30:00+03:00`)
//! - OpenMRS style offsets without a colon (`2024-03-01T08:30:00.000+0300`)
//! - naive date-times and plain dates, which are assumed to be UTC

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};

const OFFSET_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f%z", "%Y-%m-%d %H:%M:%S%.f%z"];
const NAIVE_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Parses a timestamp in any supported format and converts it to UTC
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, String> {
    parse_with_day_time(raw, DayTime::Start)
}

/// Parses the upper bound of a date window
///
/// A plain date covers the whole day, so it resolves to the last instant of
/// that day instead of midnight. Anything with a time part parses exactly as
/// [`parse_timestamp`] would.
pub fn parse_range_end(raw: &str) -> Result<DateTime<Utc>, String> {
    parse_with_day_time(raw, DayTime::End)
}

#[derive(Clone, Copy)]
enum DayTime {
    Start,
    End,
}

fn parse_with_day_time(raw: &str, day_time: DayTime) -> Result<DateTime<Utc>, String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err("timestamp is empty".to_string());
    }

    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }

    for format in OFFSET_FORMATS {
        if let Ok(ts) = DateTime::parse_from_str(raw, format) {
            return Ok(ts.with_timezone(&Utc));
        }
    }

    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Ok(Utc.from_utc_datetime(&naive));
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        let naive = match day_time {
            DayTime::Start => date.and_hms_opt(0, 0, 0),
            DayTime::End => date.and_hms_nano_opt(23, 59, 59, 999_999_999),
        };
        if let Some(naive) = naive {
            return Ok(Utc.from_utc_datetime(&naive));
        }
    }

    Err(format!("unrecognized timestamp format: '{raw}'"))
}

/// Serde helper for required timestamps in any supported format
pub fn deserialize_utc<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw).map_err(serde::de::Error::custom)
}

/// Serde helper for optional timestamps; empty strings become `None`
pub fn deserialize_utc_opt<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        None => Ok(None),
        Some(raw) if raw.trim().is_empty() => Ok(None),
        Some(raw) => parse_timestamp(&raw)
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}

/// Optional inclusive date window applied to fetched records
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawDateRange")]
pub struct DateRange {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

/// Unchecked wire form of [`DateRange`]
#[derive(Deserialize)]
struct RawDateRange {
    #[serde(default)]
    from: Option<DateTime<Utc>>,
    #[serde(default)]
    to: Option<DateTime<Utc>>,
}

impl TryFrom<RawDateRange> for DateRange {
    type Error = String;

    fn try_from(raw: RawDateRange) -> Result<Self, Self::Error> {
        DateRange::new(raw.from, raw.to)
    }
}

impl DateRange {
    /// Creates a range, rejecting windows whose start is after their end
    pub fn new(from: Option<DateTime<Utc>>, to: Option<DateTime<Utc>>) -> Result<Self, String> {
        if let (Some(from), Some(to)) = (from, to) {
            if from > to {
                return Err(format!(
                    "date_from ({}) must not be after date_to ({})",
                    from.to_rfc3339(),
                    to.to_rfc3339()
                ));
            }
        }
        Ok(Self { from, to })
    }

    /// A range with no bounds
    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn contains(&self, ts: &DateTime<Utc>) -> bool {
        self.from.map_or(true, |from| *ts >= from) && self.to.map_or(true, |to| *ts <= to)
    }

    pub fn is_unbounded(&self) -> bool {
        self.from.is_none() && self.to.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    #[test]
    fn test_parse_rfc3339_with_offset_normalizes_to_utc() {
        let ts = parse_timestamp("2024-03-01T08:30:00+03:00").unwrap();
        assert_eq!(ts.hour(), 5);
    }

    #[test]
    fn test_parse_openmrs_offset() {
        let ts = parse_timestamp("2024-03-01T08:30:00.000+0000").unwrap();
        assert_eq!(ts.to_rfc3339(), "2024-03-01T08:30:00+00:00");
    }

    #[test]
    fn test_parse_naive_assumes_utc() {
        let ts = parse_timestamp("2024-03-01T08:30:00").unwrap();
        assert_eq!(ts.hour(), 8);
        let date_only = parse_timestamp("2024-03-01").unwrap();
        assert_eq!(date_only.hour(), 0);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_timestamp("yesterday").is_err());
        assert!(parse_timestamp("").is_err());
    }

    #[test]
    fn test_date_range_rejects_inverted_window() {
        let from = parse_timestamp("2024-03-02").unwrap();
        let to = parse_timestamp("2024-03-01").unwrap();
        assert!(DateRange::new(Some(from), Some(to)).is_err());
    }

    #[test]
    fn test_date_range_contains_is_inclusive() {
        let from = parse_timestamp("2024-03-01").unwrap();
        let to = parse_timestamp("2024-03-31").unwrap();
        let range = DateRange::new(Some(from), Some(to)).unwrap();
        assert!(range.contains(&from));
        assert!(range.contains(&to));
        assert!(!range.contains(&parse_timestamp("2024-04-01").unwrap()));
        assert!(DateRange::unbounded().contains(&parse_timestamp("1999-01-01").unwrap()));
    }

    #[test]
    fn test_deserialize_validates_window() {
        let range: DateRange = serde_json::from_str(
            r#"{"from": "2024-03-01T00:00:00Z", "to": "2024-03-31T23:59:59Z"}"#,
        )
        .unwrap();
        assert!(range.contains(&parse_timestamp("2024-03-15T12:00:00Z").unwrap()));

        let open: DateRange = serde_json::from_str("{}").unwrap();
        assert!(open.is_unbounded());

        let inverted = serde_json::from_str::<DateRange>(
            r#"{"from": "2024-04-01T00:00:00Z", "to": "2024-03-01T00:00:00Z"}"#,
        );
        assert!(inverted.is_err());
    }

    #[test]
    fn test_plain_date_upper_bound_covers_whole_day() {
        let from = parse_timestamp("2024-03-01").unwrap();
        let to = parse_range_end("2024-03-31").unwrap();
        let range = DateRange::new(Some(from), Some(to)).unwrap();

        assert!(range.contains(&parse_timestamp("2024-03-31T08:00:00Z").unwrap()));
        assert!(range.contains(&parse_timestamp("2024-03-31T23:59:59Z").unwrap()));
        assert!(!range.contains(&parse_timestamp("2024-04-01T00:00:00Z").unwrap()));
    }

    #[test]
    fn test_range_end_with_time_is_exact() {
        let exact = parse_range_end("2024-03-31T08:00:00Z").unwrap();
        assert_eq!(exact, parse_timestamp("2024-03-31T08:00:00Z").unwrap());

        let same_day = DateRange::new(
            Some(parse_timestamp("2024-03-31").unwrap()),
            Some(parse_range_end("2024-03-31").unwrap()),
        );
        assert!(same_day.is_ok());
    }
}
