use std::time::Duration;

use chrono::{DateTime, Timelike, Utc};

use crate::error::{FrostError, Result};

pub fn parse_time_or_relative(input: &str) -> Result<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(input) {
        return Ok(ts.with_timezone(&Utc));
    }

    if let Ok(duration) = humantime::parse_duration(input) {
        return Ok(Utc::now()
            - chrono::Duration::from_std(duration).map_err(|e| {
                FrostError::Parse(format!("failed to parse duration to chrono: {e}"))
            })?);
    }

    Err(FrostError::Parse(format!(
        "expected RFC3339 time or duration, got {input}"
    )))
}

pub fn parse_duration_str(input: &str) -> Result<Duration> {
    humantime::parse_duration(input)
        .map_err(|e| FrostError::Parse(format!("invalid duration {input}: {e}")))
}

/// Floor a timestamp to the start of its UTC hour.
pub fn truncate_to_hour(ts: DateTime<Utc>) -> DateTime<Utc> {
    ts.with_minute(0)
        .and_then(|t| t.with_second(0))
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(ts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn parses_rfc3339() {
        let ts = parse_time_or_relative("2026-01-01T00:00:00Z").unwrap();
        assert_eq!(ts.to_rfc3339(), "2026-01-01T00:00:00+00:00");
    }

    #[test]
    fn parses_duration() {
        let now = Utc::now();
        let ts = parse_time_or_relative("5m").unwrap();
        assert!(ts < now);
    }

    #[test]
    fn rejects_invalid() {
        assert!(parse_time_or_relative("nope").is_err());
    }

    #[test]
    fn truncates_to_hour_start() {
        let ts = Utc.with_ymd_and_hms(2026, 2, 1, 13, 47, 9).unwrap();
        let hour = truncate_to_hour(ts);
        assert_eq!(hour, Utc.with_ymd_and_hms(2026, 2, 1, 13, 0, 0).unwrap());
        assert_eq!(truncate_to_hour(hour), hour);
    }
}
