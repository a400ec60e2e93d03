//! Text formats shared by the task file and the command line.
//!
//! Task times are wall-clock local times without an offset, matching what a
//! calendar shows: `yyyy-MM-dd` for dates and `yyyy-MM-ddTHH:MM:SS` for start
//! and reminder timestamps.

use crate::error::AppError;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::{Date, Duration, OffsetDateTime, PrimitiveDateTime, Time, UtcOffset};

const DATE_FORMAT: &[BorrowedFormatItem<'static>] = format_description!("[year]-[month]-[day]");
const DATETIME_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]");
const TIME_FORMAT: &[BorrowedFormatItem<'static>] = format_description!("[hour]:[minute]");
const TIME_WITH_SECONDS_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[hour]:[minute]:[second]");

pub fn format_date(date: Date) -> String {
    date.format(DATE_FORMAT)
        .unwrap_or_else(|_| date.to_string())
}

pub fn format_datetime(datetime: PrimitiveDateTime) -> String {
    datetime
        .format(DATETIME_FORMAT)
        .unwrap_or_else(|_| datetime.to_string())
}

pub fn format_time(time: Time) -> String {
    time.format(TIME_FORMAT).unwrap_or_else(|_| time.to_string())
}

/// Formats a lead time as `H:MM`.
pub fn format_lead(lead: Duration) -> String {
    let minutes = lead.whole_minutes();
    format!("{}:{:02}", minutes / 60, minutes % 60)
}

pub fn parse_date(raw: &str) -> Result<Date, AppError> {
    Date::parse(raw.trim(), DATE_FORMAT)
        .map_err(|_| AppError::invalid_input(format!("date must be yyyy-MM-dd, got '{raw}'")))
}

pub fn parse_datetime(raw: &str) -> Result<PrimitiveDateTime, AppError> {
    PrimitiveDateTime::parse(raw.trim(), DATETIME_FORMAT).map_err(|_| {
        AppError::invalid_input(format!("datetime must be yyyy-MM-ddTHH:MM:SS, got '{raw}'"))
    })
}

/// Accepts `HH:MM` or `HH:MM:SS`.
pub fn parse_time(raw: &str) -> Result<Time, AppError> {
    let trimmed = raw.trim();
    Time::parse(trimmed, TIME_WITH_SECONDS_FORMAT)
        .or_else(|_| Time::parse(trimmed, TIME_FORMAT))
        .map_err(|_| AppError::invalid_input(format!("time must be HH:MM, got '{raw}'")))
}

/// Accepts `H:MM` (hours and minutes) or a bare number of minutes.
pub fn parse_lead(raw: &str) -> Result<Duration, AppError> {
    let trimmed = raw.trim();
    let invalid = || AppError::invalid_input(format!("lead time must be H:MM, got '{raw}'"));

    let (hours, minutes) = match trimmed.split_once(':') {
        Some((hours, minutes)) => {
            let hours: u32 = hours.trim().parse().map_err(|_| invalid())?;
            let minutes: u32 = minutes.trim().parse().map_err(|_| invalid())?;
            if minutes >= 60 {
                return Err(invalid());
            }
            (hours, minutes)
        }
        None => (0, trimmed.parse().map_err(|_| invalid())?),
    };

    let seconds = i64::from(hours)
        .checked_mul(60)
        .and_then(|total| total.checked_add(i64::from(minutes)))
        .and_then(|total| total.checked_mul(60))
        .ok_or_else(invalid)?;
    Ok(Duration::seconds(seconds))
}

/// Current wall-clock time in the local offset, falling back to UTC when the
/// offset cannot be determined.
pub fn now_local() -> PrimitiveDateTime {
    let offset = UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC);
    let now = OffsetDateTime::now_utc().to_offset(offset);
    PrimitiveDateTime::new(now.date(), now.time())
}
