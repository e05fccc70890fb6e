//! Date handling for sheet values
//!
//! Dates arrive as ISO timestamps written by this front end, as plain dates
//! typed into the sheet, or in day-first form from older rows.

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, NaiveTime};

const DATETIME_FORMATS: [&str; 5] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%d/%m/%Y %H:%M:%S",
];

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%d/%m/%Y", "%d-%m-%Y"];

/// Parse a sheet date or timestamp into local wall-clock time
pub fn parse_sheet_datetime(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    // Zoned timestamps (e.g. `2024-06-15T04:30:00.000Z`) are shown in local time
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Local).naive_local());
    }

    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(dt);
        }
    }

    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(raw, format) {
            return Some(date.and_time(NaiveTime::MIN));
        }
    }

    None
}

/// Parse only the calendar date of a sheet value
pub fn parse_sheet_date(raw: &str) -> Option<NaiveDate> {
    parse_sheet_datetime(raw).map(|dt| dt.date())
}

/// Timestamp written into new rows
pub fn sheet_timestamp(now: NaiveDateTime) -> String {
    now.format("%Y-%m-%dT%H:%M:%S").to_string()
}

/// Day-first display date used on screens and receipts
pub fn display_date(date: NaiveDate) -> String {
    date.format("%d/%m/%Y").to_string()
}
