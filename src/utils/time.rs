use chrono::{DateTime, Local};
use chrono_tz::Tz;

/// Weekday name of a forecast timestamp, e.g. "Tuesday".
///
/// Uses the given zone, or the local zone of the machine if there is none.
pub fn day_of_week(timestamp: i64, timezone: Option<Tz>) -> Option<String> {
    let instant = DateTime::from_timestamp(timestamp, 0)?;

    let name = match timezone {
        Some(tz) => instant.with_timezone(&tz).format("%A").to_string(),
        None => instant.with_timezone(&Local).format("%A").to_string(),
    };
    Some(name)
}
