use lazy_static::lazy_static;
use time::{format_description::FormatItem, macros::format_description, Duration, OffsetDateTime};

lazy_static! {
    static ref UNIX_TIME_UNIT_OFFSET: i128 = (Duration::MILLISECOND / Duration::NANOSECOND) as i128;
}

pub const MINUTE_MS: u64 = 60 * 1000;
pub const HOUR_MS: u64 = 60 * MINUTE_MS;
pub const DAY_MS: u64 = 24 * HOUR_MS;

const HOUR_MINUTE: &[FormatItem<'static>] = format_description!("[hour]:[minute]");
const HOUR_ONLY: &[FormatItem<'static>] = format_description!("[hour]:00");
const MONTH_DAY: &[FormatItem<'static>] = format_description!("[month]-[day]");
const DATE_TIME: &[FormatItem<'static>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");

/// Milliseconds since the unix epoch, UTC.
#[inline]
pub fn curr_time_millis() -> u64 {
    (OffsetDateTime::now_utc().unix_timestamp_nanos() / (*UNIX_TIME_UNIT_OFFSET)) as u64
}

#[inline]
pub fn milli2nano<T: Into<i128>>(t: T) -> i128 {
    *UNIX_TIME_UNIT_OFFSET * t.into()
}

fn format_millis(ts_millis: u64, format: &[FormatItem<'static>]) -> String {
    OffsetDateTime::from_unix_timestamp_nanos(milli2nano(ts_millis))
        .ok()
        .and_then(|t| t.format(format).ok())
        .unwrap_or_default()
}

/// `HH:MM`, the label of a sub-hour trend bucket.
#[inline]
pub fn format_hour_minute(ts_millis: u64) -> String {
    format_millis(ts_millis, HOUR_MINUTE)
}

/// `HH:00`, the label of an hourly trend bucket.
#[inline]
pub fn format_hour(ts_millis: u64) -> String {
    format_millis(ts_millis, HOUR_ONLY)
}

/// `MM-DD`, the label of a daily trend bucket.
#[inline]
pub fn format_month_day(ts_millis: u64) -> String {
    format_millis(ts_millis, MONTH_DAY)
}

/// `YYYY-MM-DD HH:MM:SS` in UTC
#[inline]
pub fn format_date_time(ts_millis: u64) -> String {
    format_millis(ts_millis, DATE_TIME)
}

#[cfg(test)]
mod test {
    use super::*;

    // 2024-03-05 14:07:09 UTC
    const TS: u64 = 1_709_647_629_000;

    #[test]
    fn formats() {
        assert_eq!(format_hour_minute(TS), "14:07");
        assert_eq!(format_hour(TS), "14:00");
        assert_eq!(format_month_day(TS), "03-05");
        assert_eq!(format_date_time(TS), "2024-03-05 14:07:09");
    }

    #[test]
    fn clock_moves_forward() {
        let t1 = curr_time_millis();
        std::thread::sleep(std::time::Duration::from_millis(2));
        assert!(curr_time_millis() > t1);
    }
}
