//! Draw deadlines as written by administrators.
//!
//! A deadline is a wall-clock minute in the configured named time zone,
//! written `YYYYMMDD-HH:MM` (the dash may be left out). Deadlines are stored
//! and compared as UTC instants.

use thiserror::Error;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::{Date, Month, OffsetDateTime, PrimitiveDateTime, Time};
use time_tz::{OffsetDateTimeExt, OffsetResult, PrimitiveDateTimeExt, TimeZone, Tz};

/// Minimum distance between activation and a `by_time` deadline.
pub const MIN_LEAD_TIME: time::Duration = time::Duration::minutes(1);

const DISPLAY_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[year][month][day]-[hour]:[minute]");

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TriggerTimeError {
    #[error("unknown time zone: {0}")]
    UnknownTimeZone(String),
    #[error("malformed draw time {0:?}, expected YYYYMMDD-HH:MM")]
    Malformed(String),
    #[error("draw time {0:?} is not a valid calendar date and time")]
    OutOfRange(String),
    #[error("draw time {0:?} does not exist in time zone {1}")]
    NonExistent(String, String),
    #[error("draw time must be at least one minute in the future")]
    TooSoon,
}

/// Look up an IANA time zone such as `Asia/Shanghai` or `UTC`.
pub fn parse_time_zone(name: &str) -> Result<&'static Tz, TriggerTimeError> {
    time_tz::timezones::get_by_name(name.trim())
        .ok_or_else(|| TriggerTimeError::UnknownTimeZone(name.to_string()))
}

/// Parse `YYYYMMDD-HH:MM` (or `YYYYMMDDHH:MM`) as local time in `tz`.
///
/// Wall-clock times that occur twice around a DST change resolve to the
/// earlier instant. Times skipped by a DST change are rejected.
pub fn parse_trigger_time(input: &str, tz: &Tz) -> Result<OffsetDateTime, TriggerTimeError> {
    let raw = input.trim();
    let malformed = || TriggerTimeError::Malformed(raw.to_string());
    if !raw.is_ascii() {
        return Err(malformed());
    }

    let (date_part, clock_part) = match raw.len() {
        14 if raw.as_bytes().get(8) == Some(&b'-') => (&raw[..8], &raw[9..]),
        13 => (&raw[..8], &raw[8..]),
        _ => return Err(malformed()),
    };
    let (hour, minute) = clock_part.split_once(':').ok_or_else(malformed)?;
    if !all_digits(date_part) || !all_digits(hour) || !all_digits(minute) {
        return Err(malformed());
    }
    if hour.len() != 2 || minute.len() != 2 {
        return Err(malformed());
    }

    let out_of_range = |_| TriggerTimeError::OutOfRange(raw.to_string());
    let year: i32 = date_part[..4].parse().map_err(|_| malformed())?;
    let month: u8 = date_part[4..6].parse().map_err(|_| malformed())?;
    let day: u8 = date_part[6..8].parse().map_err(|_| malformed())?;
    let hour: u8 = hour.parse().map_err(|_| malformed())?;
    let minute: u8 = minute.parse().map_err(|_| malformed())?;

    let month = Month::try_from(month).map_err(out_of_range)?;
    let date = Date::from_calendar_date(year, month, day).map_err(out_of_range)?;
    let clock = Time::from_hms(hour, minute, 0).map_err(out_of_range)?;

    match PrimitiveDateTime::new(date, clock).assume_timezone(tz) {
        OffsetResult::Some(at) | OffsetResult::Ambiguous(at, _) => {
            Ok(at.to_offset(time::UtcOffset::UTC))
        }
        OffsetResult::None => Err(TriggerTimeError::NonExistent(
            raw.to_string(),
            tz.name().to_string(),
        )),
    }
}

/// Render an instant as `YYYYMMDD-HH:MM` in `tz`.
pub fn format_trigger_time(at: OffsetDateTime, tz: &Tz) -> String {
    at.to_timezone(tz)
        .format(DISPLAY_FORMAT)
        .unwrap_or_else(|_| at.unix_timestamp().to_string())
}

/// Reject deadlines closer than [`MIN_LEAD_TIME`] to `now`.
pub fn check_lead_time(at: OffsetDateTime, now: OffsetDateTime) -> Result<(), TriggerTimeError> {
    if at < now + MIN_LEAD_TIME {
        return Err(TriggerTimeError::TooSoon);
    }
    Ok(())
}

fn all_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}
