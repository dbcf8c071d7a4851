//! Glucose readings and how they are ingested
//!
//! The backend hands us loosely-typed JSON: `glucose_value` is usually a
//! number, `timestamp` is an ISO-8601 string or an epoch number. Records that
//! cannot be turned into a [`Reading`] are dropped one by one so a single bad
//! record never invalidates a batch.
//!
//! Hour-of-day bucketing goes through an explicit [`TimeZonePolicy`] instead of
//! the process locale. Naive timestamps (no offset) are taken as UTC.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, FixedOffset, NaiveDateTime, Offset, Timelike, Utc};
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::error::AnalyticsError;

/// A single blood glucose reading
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    /// mg/dL
    pub glucose_value: f64,
    pub timestamp: DateTime<Utc>,
}

impl Reading {
    pub fn new(glucose_value: f64, timestamp: DateTime<Utc>) -> Self {
        Self { glucose_value, timestamp }
    }
}

/// Extract the glucose values of a series, in order
pub fn values(readings: &[Reading]) -> Vec<f64> {
    readings.iter().map(|r| r.glucose_value).collect()
}

/// A JSON scalar that may arrive as a number or as text
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum NumberOrText {
    Number(f64),
    Text(String),
}

impl NumberOrText {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            NumberOrText::Number(n) => Some(*n),
            NumberOrText::Text(s) => s.trim().parse().ok(),
        }
    }
}

/// Reading as received from the backend, before validation
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawReading {
    #[serde(default)]
    pub glucose_value: Option<NumberOrText>,
    #[serde(default)]
    pub timestamp: Option<NumberOrText>,
}

impl RawReading {
    /// Validate into a [`Reading`], or `None` if the record is malformed
    pub fn into_reading(self) -> Option<Reading> {
        let glucose_value = self.glucose_value?.as_f64().filter(|v| v.is_finite())?;
        let timestamp = parse_timestamp(&self.timestamp?)?;
        Some(Reading { glucose_value, timestamp })
    }
}

/// Turn raw JSON records into readings, skipping anything malformed
pub fn ingest(records: &[serde_json::Value]) -> Vec<Reading> {
    let mut readings = Vec::with_capacity(records.len());
    let mut skipped = 0usize;

    for record in records {
        let parsed = serde_json::from_value::<RawReading>(record.clone())
            .ok()
            .and_then(RawReading::into_reading);
        match parsed {
            Some(reading) => readings.push(reading),
            None => {
                skipped += 1;
                debug!("Skipping malformed reading: {}", record);
            }
        }
    }

    if skipped > 0 {
        warn!("Skipped {} malformed readings out of {}", skipped, records.len());
    }

    readings
}

/// Parse an ISO-8601 string or epoch number (seconds or milliseconds)
pub fn parse_timestamp(raw: &NumberOrText) -> Option<DateTime<Utc>> {
    match raw {
        NumberOrText::Number(n) => from_epoch(*n),
        NumberOrText::Text(s) => {
            let s = s.trim();
            if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
                return Some(dt.with_timezone(&Utc));
            }
            const NAIVE_FORMATS: [&str; 4] = [
                "%Y-%m-%dT%H:%M:%S%.f",
                "%Y-%m-%d %H:%M:%S%.f",
                "%Y-%m-%dT%H:%M",
                "%Y-%m-%d %H:%M",
            ];
            for fmt in NAIVE_FORMATS {
                if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
                    return Some(naive.and_utc());
                }
            }
            s.parse::<f64>().ok().and_then(from_epoch)
        }
    }
}

fn from_epoch(n: f64) -> Option<DateTime<Utc>> {
    if !n.is_finite() {
        return None;
    }
    // Anything this large is milliseconds; seconds would be past year 5000
    let millis = if n.abs() >= 1e11 { n } else { n * 1000.0 };
    DateTime::from_timestamp_millis(millis.round() as i64)
}

/// Which clock hour-of-day calculations are evaluated in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TimeZonePolicy {
    #[default]
    Utc,
    /// Fixed offset east of UTC, e.g. the user's profile timezone
    Fixed { offset_minutes: i32 },
}

impl TimeZonePolicy {
    const MAX_OFFSET_MINUTES: i32 = 24 * 60;

    pub fn fixed_minutes(offset_minutes: i32) -> Result<Self, AnalyticsError> {
        if offset_minutes.abs() >= Self::MAX_OFFSET_MINUTES {
            return Err(AnalyticsError::InvalidTimezone(format!(
                "offset of {} minutes is out of range",
                offset_minutes
            )));
        }
        Ok(TimeZonePolicy::Fixed { offset_minutes })
    }

    pub fn offset(self) -> FixedOffset {
        match self {
            TimeZonePolicy::Utc => Utc.fix(),
            TimeZonePolicy::Fixed { offset_minutes } => {
                FixedOffset::east_opt(offset_minutes * 60).unwrap_or_else(|| Utc.fix())
            }
        }
    }

    pub fn localize(self, ts: &DateTime<Utc>) -> DateTime<FixedOffset> {
        ts.with_timezone(&self.offset())
    }

    /// Hour of day (0-23) of a timestamp under this policy
    pub fn hour_of(self, ts: &DateTime<Utc>) -> u32 {
        self.localize(ts).hour()
    }

    /// Day of week, 0 = Monday
    pub fn weekday_of(self, ts: &DateTime<Utc>) -> u32 {
        self.localize(ts).weekday().num_days_from_monday()
    }
}

impl fmt::Display for TimeZonePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeZonePolicy::Utc => write!(f, "UTC"),
            TimeZonePolicy::Fixed { offset_minutes } => {
                let sign = if *offset_minutes < 0 { '-' } else { '+' };
                let abs = offset_minutes.abs();
                write!(f, "UTC{}{:02}:{:02}", sign, abs / 60, abs % 60)
            }
        }
    }
}

impl FromStr for TimeZonePolicy {
    type Err = AnalyticsError;

    /// Accepts `utc`, `z`, `+05:30`, `-0800`, `+2`, optionally prefixed by `UTC`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || AnalyticsError::InvalidTimezone(s.to_string());
        let trimmed = s.trim();
        let lower = trimmed.to_ascii_lowercase();
        if lower == "utc" || lower == "z" || lower == "gmt" {
            return Ok(TimeZonePolicy::Utc);
        }

        let rest = lower
            .strip_prefix("utc")
            .or_else(|| lower.strip_prefix("gmt"))
            .unwrap_or(&lower);
        let (sign, digits) = match rest.chars().next() {
            Some('+') => (1, &rest[1..]),
            Some('-') => (-1, &rest[1..]),
            _ => return Err(invalid()),
        };

        let (hours, minutes) = if let Some((h, m)) = digits.split_once(':') {
            (h, m)
        } else if digits.len() == 4 && digits.is_ascii() {
            digits.split_at(2)
        } else {
            (digits, "0")
        };
        let field = |part: &str| -> Result<i32, AnalyticsError> {
            if part.is_empty() || part.len() > 2 || !part.bytes().all(|b| b.is_ascii_digit()) {
                return Err(invalid());
            }
            part.parse().map_err(|_| invalid())
        };
        let hours = field(hours)?;
        let minutes = field(minutes)?;
        if hours >= 24 || minutes >= 60 {
            return Err(invalid());
        }

        let total = sign * (hours * 60 + minutes);
        if total == 0 {
            return Ok(TimeZonePolicy::Utc);
        }
        TimeZonePolicy::fixed_minutes(total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn test_parse_rfc3339_with_offset() {
        let ts = parse_timestamp(&NumberOrText::Text("2024-03-01T07:30:00+02:00".into())).unwrap();
        assert_eq!(ts, Utc.with_ymd_and_hms(2024, 3, 1, 5, 30, 0).unwrap());
    }

    #[test]
    fn test_parse_naive_is_utc() {
        let ts = parse_timestamp(&NumberOrText::Text("2024-03-01 07:30:00".into())).unwrap();
        assert_eq!(ts, Utc.with_ymd_and_hms(2024, 3, 1, 7, 30, 0).unwrap());
        let ts = parse_timestamp(&NumberOrText::Text("2024-03-01T07:30:00.250".into())).unwrap();
        assert_eq!(ts.hour(), 7);
    }

    #[test]
    fn test_parse_epoch_seconds_and_millis() {
        let expected = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let secs = expected.timestamp() as f64;
        assert_eq!(parse_timestamp(&NumberOrText::Number(secs)), Some(expected));
        assert_eq!(parse_timestamp(&NumberOrText::Number(secs * 1000.0)), Some(expected));
        assert_eq!(parse_timestamp(&NumberOrText::Text(format!("{}", secs))), Some(expected));
    }

    #[test]
    fn test_parse_negative_fractional_epoch() {
        let ts = parse_timestamp(&NumberOrText::Number(-1.5)).unwrap();
        assert_eq!(ts.timestamp_millis(), -1500);
        let ts = parse_timestamp(&NumberOrText::Number(1.25)).unwrap();
        assert_eq!(ts.timestamp_millis(), 1250);
    }

    #[test]
    fn test_parse_garbage_timestamp() {
        assert_eq!(parse_timestamp(&NumberOrText::Text("yesterday".into())), None);
        assert_eq!(parse_timestamp(&NumberOrText::Number(f64::NAN)), None);
    }

    #[test]
    fn test_ingest_skips_malformed_records() {
        let records = vec![
            json!({"glucose_value": 120, "timestamp": "2024-03-01T08:00:00Z"}),
            json!({"timestamp": "2024-03-01T08:05:00Z"}),
            json!({"glucose_value": 130}),
            json!({"glucose_value": "140", "timestamp": "2024-03-01T08:15:00Z"}),
            json!({"glucose_value": 150, "timestamp": "not a date"}),
            json!("garbage"),
            json!(null),
        ];
        let readings = ingest(&records);
        assert_eq!(readings.len(), 2);
        assert_eq!(readings[0].glucose_value, 120.0);
        assert_eq!(readings[1].glucose_value, 140.0);
    }

    #[test]
    fn test_timezone_policy_hour() {
        let ts = Utc.with_ymd_and_hms(2024, 3, 1, 23, 30, 0).unwrap();
        assert_eq!(TimeZonePolicy::Utc.hour_of(&ts), 23);

        let plus_two: TimeZonePolicy = "+02:00".parse().unwrap();
        assert_eq!(plus_two.hour_of(&ts), 1);
        // 2024-03-01 is a Friday, +2h rolls over to Saturday
        assert_eq!(TimeZonePolicy::Utc.weekday_of(&ts), 4);
        assert_eq!(plus_two.weekday_of(&ts), 5);

        let minus_half: TimeZonePolicy = "UTC-0530".parse().unwrap();
        assert_eq!(minus_half, TimeZonePolicy::Fixed { offset_minutes: -330 });
        assert_eq!(minus_half.hour_of(&ts), 18);
    }

    #[test]
    fn test_timezone_policy_parse() {
        assert_eq!("utc".parse::<TimeZonePolicy>().unwrap(), TimeZonePolicy::Utc);
        assert_eq!("+00:00".parse::<TimeZonePolicy>().unwrap(), TimeZonePolicy::Utc);
        assert_eq!("+5".parse::<TimeZonePolicy>().unwrap(), TimeZonePolicy::Fixed { offset_minutes: 300 });
        assert!("+25:00".parse::<TimeZonePolicy>().is_err());
        assert!("Europe/Paris".parse::<TimeZonePolicy>().is_err());
        assert_eq!(TimeZonePolicy::Fixed { offset_minutes: -330 }.to_string(), "UTC-05:30");
    }

    #[test]
    fn test_timezone_policy_rejects_malformed_offsets() {
        for bad in ["+40000000", "+-5", "-+05:00", "+05:-30", "+24:00", "+05:60", "+", "+aé1", "UTC+５"] {
            assert!(bad.parse::<TimeZonePolicy>().is_err(), "{} should not parse", bad);
        }
        assert_eq!("-23:59".parse::<TimeZonePolicy>().unwrap(), TimeZonePolicy::Fixed { offset_minutes: -1439 });
    }
}
