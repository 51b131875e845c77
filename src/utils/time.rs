use crate::error::{PlotError, Result};
use crate::Seconds;
use chrono::{NaiveDate, TimeZone, Utc};

const DAY_SECONDS: f64 = 86_400.0;
const HOUR_SECONDS: f64 = 3_600.0;

/// Parses a HAPI (restricted ISO 8601) time into seconds since the Unix epoch.
///
/// Accepts `YYYY-MM-DD` and `YYYY-DOY` dates, optionally followed by `T` and
/// `hh`, `hh:mm`, `hh:mm:ss` or `hh:mm:ss.sss`, with an optional trailing `Z`.
pub fn parse_hapi_time(time: &str) -> Result<Seconds> {
    let invalid = || PlotError::InvalidTime(time.to_string());

    let trimmed = time.trim();
    let trimmed = trimmed.strip_suffix('Z').unwrap_or(trimmed);
    let (date, clock) = match trimmed.split_once('T') {
        Some((date, clock)) => (date, Some(clock)),
        None => (trimmed, None),
    };

    // Date
    let parts: Vec<&str> = date.split('-').collect();
    let number = |s: &str| s.parse::<u32>().map_err(|_| invalid());
    let year = parts
        .first()
        .filter(|y| y.len() == 4)
        .ok_or_else(invalid)?
        .parse::<i32>()
        .map_err(|_| invalid())?;
    let date = match parts[1..] {
        [doy] if doy.len() == 3 => NaiveDate::from_yo_opt(year, number(doy)?),
        [month] if month.len() == 2 => NaiveDate::from_ymd_opt(year, number(month)?, 1),
        [month, day] => NaiveDate::from_ymd_opt(year, number(month)?, number(day)?),
        [] => NaiveDate::from_ymd_opt(year, 1, 1),
        _ => None,
    }
    .ok_or_else(invalid)?;

    // Time of day
    let (mut hour, mut minute, mut second) = (0, 0, 0.0);
    if let Some(clock) = clock.filter(|c| !c.is_empty()) {
        let fields: Vec<&str> = clock.split(':').collect();
        if fields.len() > 3 || fields.iter().take(2).any(|f| f.len() != 2) {
            return Err(invalid());
        }
        hour = number(fields[0])?;
        if let Some(m) = fields.get(1) {
            minute = number(m)?;
        }
        if let Some(s) = fields.get(2) {
            second = s.parse::<f64>().map_err(|_| invalid())?;
        }
    }
    if hour > 24 || minute > 59 || !(0.0..61.0).contains(&second) {
        return Err(invalid());
    }

    let midnight = date.and_hms_opt(0, 0, 0).ok_or_else(invalid)?;
    let day_start = Utc.from_utc_datetime(&midnight).timestamp() as f64;
    Ok(day_start + (hour * 3600 + minute * 60) as f64 + second)
}

/// Parses every time, failing on the first invalid one.
pub fn parse_hapi_times<S: AsRef<str>>(times: &[S]) -> Result<Vec<Seconds>> {
    times.iter().map(|t| parse_hapi_time(t.as_ref())).collect()
}

/// strftime pattern for tick labels on a time axis covering `span` seconds.
pub fn tick_format(span: Seconds) -> &'static str {
    if span > 2.0 * DAY_SECONDS {
        "%Y-%m-%d"
    } else if span > 6.0 * HOUR_SECONDS {
        "%m-%d %H:%M"
    } else {
        "%H:%M:%S"
    }
}

/// Formats `t` (seconds since the epoch, UTC) with a strftime pattern.
pub fn format_time(t: Seconds, pattern: &str) -> String {
    let secs = t.floor();
    let nanos = ((t - secs) * 1e9) as u32;
    match Utc.timestamp_opt(secs as i64, nanos).single() {
        Some(datetime) => datetime.format(pattern).to_string(),
        None => format!("{t}"),
    }
}

#[test]
fn test_parse_calendar_and_ordinal_dates() {
    assert_eq!(parse_hapi_time("1970-01-01T00:00:00Z").unwrap(), 0.0);
    assert_eq!(parse_hapi_time("1970-01-02").unwrap(), 86400.0);
    assert_eq!(parse_hapi_time("1970-002").unwrap(), 86400.0);
    assert_eq!(parse_hapi_time("1970-002T01Z").unwrap(), 90000.0);
    assert_eq!(
        parse_hapi_time("2000-01-01T00:00:00.000Z").unwrap(),
        946_684_800.0
    );
    assert_eq!(parse_hapi_time("2000-001T00:01").unwrap(), 946_684_860.0);
    assert_eq!(parse_hapi_time("2000-01").unwrap(), 946_684_800.0);
}

#[test]
fn test_parse_fractional_seconds() {
    let t = parse_hapi_time("1970-01-01T00:00:01.5Z").unwrap();
    approx_eq::assert_approx_eq!(t, 1.5);
}

#[test]
fn test_parse_rejects_malformed_times() {
    for bad in ["", "70-01-01", "1970-13-01", "1970-01-01T1:00", "1970-400", "now"] {
        assert!(
            matches!(parse_hapi_time(bad), Err(PlotError::InvalidTime(_))),
            "{bad}"
        );
    }
}

#[test]
fn test_tick_format_by_span() {
    assert_eq!(tick_format(3.0 * DAY_SECONDS), "%Y-%m-%d");
    assert_eq!(tick_format(DAY_SECONDS), "%m-%d %H:%M");
    assert_eq!(tick_format(60.0), "%H:%M:%S");
    assert_eq!(format_time(946_684_800.0, "%Y-%m-%d %H:%M:%S"), "2000-01-01 00:00:00");
}
