use std::{fmt, time::Duration};

use jiff::{SpanRelativeTo, Unit};
use serde::{Deserialize, Serialize};

use crate::Error;

pub const MINUTE_MS: u64 = 60_000;
pub const HOUR_MS: u64 = 60 * MINUTE_MS;
pub const DAY_MS: u64 = 24 * HOUR_MS;

/// The time range handed over by the rendering host.
///
/// Both `beginTime`/`endTime` and `begin_time`/`end_time` are accepted. The
/// camel case pair wins when both are complete, a half specified pair is
/// ignored. Instants may be epoch milliseconds or RFC 3339 strings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawTimeRange")]
pub struct TimeRange {
    #[serde(rename = "beginTime")]
    pub begin: Option<i64>,
    #[serde(rename = "endTime")]
    pub end: Option<i64>,
    /// Rolling window length in milliseconds.
    pub duration: Option<u64>,
}

#[derive(Deserialize)]
struct RawTimeRange {
    #[serde(default, rename = "beginTime")]
    begin_time_camel: Option<RawInstant>,
    #[serde(default, rename = "endTime")]
    end_time_camel: Option<RawInstant>,
    #[serde(default)]
    begin_time: Option<RawInstant>,
    #[serde(default)]
    end_time: Option<RawInstant>,
    #[serde(default)]
    duration: Option<f64>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawInstant {
    Millis(i64),
    Float(f64),
    Text(String),
}

impl RawInstant {
    fn millis(self) -> Result<i64, Error> {
        match self {
            RawInstant::Millis(ms) => Ok(ms),
            RawInstant::Float(ms) => Ok(ms as i64),
            RawInstant::Text(s) => TimeWindow::parse_instant(&s),
        }
    }
}

fn pair(
    begin: Option<RawInstant>,
    end: Option<RawInstant>,
) -> Result<Option<(i64, i64)>, Error> {
    match (begin, end) {
        (Some(begin), Some(end)) => Ok(Some((begin.millis()?, end.millis()?))),
        _ => Ok(None),
    }
}

impl TryFrom<RawTimeRange> for TimeRange {
    type Error = Error;

    fn try_from(raw: RawTimeRange) -> Result<Self, Error> {
        let explicit = match pair(raw.begin_time_camel, raw.end_time_camel)? {
            Some(pair) => Some(pair),
            None => pair(raw.begin_time, raw.end_time)?,
        };
        Ok(TimeRange {
            begin: explicit.map(|(begin, _)| begin),
            end: explicit.map(|(_, end)| end),
            // fractional milliseconds are rounded, non-positive lengths ignored
            duration: raw
                .duration
                .filter(|d| d.is_finite() && *d > 0.0)
                .map(|d| d.round() as u64),
        })
    }
}

/// The `SINCE ...` clause of a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeWindow {
    /// Explicit instants, epoch milliseconds, rendered as given.
    Between { begin: i64, end: i64 },
    /// Rolling window ending now.
    Last { duration_ms: u64 },
}

impl Default for TimeWindow {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl TimeWindow {
    pub const DEFAULT: TimeWindow = TimeWindow::Last {
        duration_ms: 30 * MINUTE_MS,
    };

    pub fn from_range(range: Option<&TimeRange>) -> Self {
        let Some(range) = range else {
            return Self::DEFAULT;
        };
        match (range.begin, range.end, range.duration) {
            (Some(begin), Some(end), _) => TimeWindow::Between { begin, end },
            (_, _, Some(duration_ms)) => TimeWindow::Last { duration_ms },
            _ => Self::DEFAULT,
        }
    }

    pub fn last(duration: Duration) -> Self {
        TimeWindow::Last {
            duration_ms: duration.as_millis() as u64,
        }
    }

    /// Parses a rolling window such as `30m`, `6h`, `7d` or `PT45M`.
    pub fn parse_span(s: &str) -> Result<Self, Error> {
        let span: jiff::Span = s
            .trim()
            .parse()
            .map_err(|err| Error::InvalidSpan(s.to_string(), err))?;
        let millis = span
            .total((Unit::Millisecond, SpanRelativeTo::days_are_24_hours()))
            .map_err(|err| Error::InvalidSpan(s.to_string(), err))?;
        if millis <= 0.0 {
            return Err(Error::NonPositiveSpan(s.to_string()));
        }
        Ok(TimeWindow::Last {
            duration_ms: millis as u64,
        })
    }

    /// Parses an instant given either as epoch milliseconds or RFC 3339.
    pub fn parse_instant(s: &str) -> Result<i64, Error> {
        let s = s.trim();
        if let Ok(millis) = s.parse::<i64>() {
            return Ok(millis);
        }
        s.parse::<jiff::Timestamp>()
            .map(|ts| ts.as_millisecond())
            .map_err(|err| Error::InvalidInstant(s.to_string(), err))
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            TimeWindow::Between { begin, end } => write!(f, "SINCE {begin} UNTIL {end}"),
            TimeWindow::Last { duration_ms } => {
                let millis = duration_ms as f64;
                if duration_ms <= HOUR_MS {
                    write!(f, "SINCE {} MINUTES AGO", millis / MINUTE_MS as f64)
                } else if duration_ms <= DAY_MS {
                    write!(f, "SINCE {} HOURS AGO", millis / HOUR_MS as f64)
                } else {
                    write!(f, "SINCE {} DAYS AGO", millis / DAY_MS as f64)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window(json: &str) -> TimeWindow {
        let range: TimeRange = serde_json::from_str(json).unwrap();
        TimeWindow::from_range(Some(&range))
    }

    #[test]
    fn test_default_window() {
        assert_eq!(TimeWindow::from_range(None).to_string(), "SINCE 30 MINUTES AGO");
        assert_eq!(window("{}").to_string(), "SINCE 30 MINUTES AGO");
    }

    #[test]
    fn test_explicit_pairs() {
        assert_eq!(
            window(r#"{"beginTime": 1700000000000, "endTime": 1700003600000}"#).to_string(),
            "SINCE 1700000000000 UNTIL 1700003600000"
        );
        assert_eq!(
            window(r#"{"begin_time": 10, "end_time": 20, "duration": null}"#).to_string(),
            "SINCE 10 UNTIL 20"
        );
        // the explicit pair outranks a duration
        assert_eq!(
            window(r#"{"begin_time": 10, "end_time": 20, "duration": 60000}"#).to_string(),
            "SINCE 10 UNTIL 20"
        );
    }

    #[test]
    fn test_camel_case_pair_wins() {
        let range: TimeRange = serde_json::from_str(
            r#"{"beginTime": 1, "endTime": 2, "begin_time": 3, "end_time": 4}"#,
        )
        .unwrap();
        assert_eq!(range.begin, Some(1));
        assert_eq!(range.end, Some(2));
    }

    #[test]
    fn test_half_pair_falls_back_to_duration() {
        assert_eq!(
            window(r#"{"beginTime": 1, "end_time": 2, "duration": 7200000}"#).to_string(),
            "SINCE 2 HOURS AGO"
        );
    }

    #[test]
    fn test_duration_buckets() {
        let last = |duration_ms| TimeWindow::Last { duration_ms }.to_string();
        assert_eq!(last(1_800_000), "SINCE 30 MINUTES AGO");
        assert_eq!(last(HOUR_MS), "SINCE 60 MINUTES AGO");
        assert_eq!(last(HOUR_MS + 5 * MINUTE_MS * 12), "SINCE 2 HOURS AGO");
        assert_eq!(last(5_400_000), "SINCE 1.5 HOURS AGO");
        assert_eq!(last(DAY_MS), "SINCE 24 HOURS AGO");
        assert_eq!(last(7 * DAY_MS), "SINCE 7 DAYS AGO");
        assert_eq!(last(90_000), "SINCE 1.5 MINUTES AGO");
    }

    #[test]
    fn test_parse_span() {
        assert_eq!(
            TimeWindow::parse_span("30m").unwrap(),
            TimeWindow::Last { duration_ms: 1_800_000 }
        );
        assert_eq!(
            TimeWindow::parse_span("6h").unwrap(),
            TimeWindow::Last { duration_ms: 6 * HOUR_MS }
        );
        assert_eq!(
            TimeWindow::parse_span("2d").unwrap(),
            TimeWindow::Last { duration_ms: 2 * DAY_MS }
        );
        assert!(TimeWindow::parse_span("soon").is_err());
        assert!(matches!(
            TimeWindow::parse_span("0s"),
            Err(Error::NonPositiveSpan(_))
        ));
    }

    #[test]
    fn test_parse_instant() {
        assert_eq!(TimeWindow::parse_instant("1700000000000").unwrap(), 1_700_000_000_000);
        assert_eq!(
            TimeWindow::parse_instant("2023-11-14T22:13:20Z").unwrap(),
            1_700_000_000_000
        );
        assert!(TimeWindow::parse_instant("yesterday").is_err());
    }

    #[test]
    fn test_lenient_descriptor_fields() {
        assert_eq!(
            window(r#"{"beginTime": "1700000000000", "endTime": "2023-11-14T23:13:20Z"}"#)
                .to_string(),
            "SINCE 1700000000000 UNTIL 1700003600000"
        );
        assert_eq!(window(r#"{"duration": 1800000.0}"#).to_string(), "SINCE 30 MINUTES AGO");
        assert_eq!(window(r#"{"duration": -5}"#), TimeWindow::DEFAULT);
        let bad = serde_json::from_str::<TimeRange>(r#"{"beginTime": "soon", "endTime": 1}"#);
        assert!(bad.is_err());
    }

    #[test]
    fn test_range_serializes_in_host_shape() {
        let range = TimeRange {
            begin: Some(10),
            end: Some(20),
            duration: None,
        };
        let json = serde_json::to_string(&range).unwrap();
        assert_eq!(serde_json::from_str::<TimeRange>(&json).unwrap(), range);
    }
}
