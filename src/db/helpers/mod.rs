use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Days, Local, NaiveDate, TimeZone, Utc};

use crate::db::models::BatchStatus;

pub fn from_unix_seconds(value: i64, field: &str) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp(value, 0)
        .ok_or_else(|| anyhow!("{field} contains out-of-range timestamp {value}"))
}

pub fn parse_batch_status(value: &str) -> Result<BatchStatus> {
    BatchStatus::parse(value).ok_or_else(|| anyhow!("unknown batch status {value}"))
}

/// Day keys are `YYYY-MM-DD` in the user's local calendar.
pub fn parse_day_key(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .with_context(|| format!("invalid day key '{value}', expected YYYY-MM-DD"))
}

pub fn day_key(day: NaiveDate) -> String {
    day.format("%Y-%m-%d").to_string()
}

/// Half-open `[start, end)` covering one local calendar day.
pub fn local_day_bounds(day: NaiveDate) -> Result<(DateTime<Utc>, DateTime<Utc>)> {
    let next_day = day
        .checked_add_days(Days::new(1))
        .ok_or_else(|| anyhow!("day {day} has no successor"))?;
    Ok((local_midnight(day)?, local_midnight(next_day)?))
}

fn local_midnight(day: NaiveDate) -> Result<DateTime<Utc>> {
    let naive = day
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| anyhow!("invalid midnight for {day}"))?;
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| anyhow!("local midnight does not exist for {day}"))
}

/// Local calendar day that contains `instant`.
pub fn local_day_of(instant: DateTime<Utc>) -> NaiveDate {
    instant.with_timezone(&Local).date_naive()
}
