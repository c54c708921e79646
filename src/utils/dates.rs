use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::{America::New_York, Tz};

/// Attendance days roll over at midnight in this zone, wherever the server runs.
pub const EVENT_TZ: Tz = New_York;

pub const DATE_FORMAT: &str = "%Y-%m-%d";

pub fn event_date(at: DateTime<Utc>) -> NaiveDate {
    at.with_timezone(&EVENT_TZ).date_naive()
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Wall-clock time for operator messages, e.g. `3:07:09 PM`.
pub fn display_time(at: DateTime<Utc>) -> String {
    at.with_timezone(&EVENT_TZ).format("%-I:%M:%S %p").to_string()
}

/// 24h wall-clock time used by the CSV export.
pub fn export_time(at: DateTime<Utc>) -> String {
    at.with_timezone(&EVENT_TZ).format("%H:%M:%S").to_string()
}
