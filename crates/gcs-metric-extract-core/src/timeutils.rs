use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::OffsetDateTime;

use crate::models::{TimeInterval, Timestamp};

pub fn now_utc() -> OffsetDateTime {
    OffsetDateTime::now_utc()
}

pub fn timestamp_from_datetime(dt: OffsetDateTime) -> Timestamp {
    Timestamp {
        seconds: dt.unix_timestamp(),
        nanos: dt.nanosecond() as i32,
    }
}

pub fn datetime_from_timestamp(ts: Timestamp) -> Option<OffsetDateTime> {
    let dt = OffsetDateTime::from_unix_timestamp(ts.seconds).ok()?;
    dt.replace_nanosecond(ts.nanos.max(0) as u32).ok()
}

/// Window of `lookback_seconds` ending at `now`. Start and end share the
/// same sub-second part.
pub fn lookback_interval(now: OffsetDateTime, lookback_seconds: u64) -> TimeInterval {
    let end_time = timestamp_from_datetime(now);
    let lookback = i64::try_from(lookback_seconds).unwrap_or(i64::MAX);
    TimeInterval {
        start_time: Timestamp {
            seconds: end_time.seconds.saturating_sub(lookback),
            nanos: end_time.nanos,
        },
        end_time,
    }
}

/// `YYYY-MM-DD HH:MM:SS` in UTC. Out of range epochs fall back to the raw
/// seconds so a single bad point does not abort the report.
pub fn format_end_time(epoch_seconds: i64) -> String {
    let format = format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
    OffsetDateTime::from_unix_timestamp(epoch_seconds)
        .ok()
        .and_then(|dt| dt.format(&format).ok())
        .unwrap_or_else(|| epoch_seconds.to_string())
}

pub fn to_rfc3339(ts: Timestamp) -> Option<String> {
    datetime_from_timestamp(ts)?.format(&Rfc3339).ok()
}

pub fn parse_rfc3339(value: &str) -> Option<Timestamp> {
    OffsetDateTime::parse(value, &Rfc3339)
        .ok()
        .map(timestamp_from_datetime)
}
