//! Time helpers for millisecond timestamps and local-calendar math.
//!
//! All persisted timestamps are integer milliseconds since the Unix
//! epoch; notification scheduling and day bucketing work in the
//! device's local timezone.

use chrono::{DateTime, Local, NaiveTime, TimeZone, Utc};
use std::time::Duration;

/// Current time in milliseconds since the Unix epoch.
pub fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// Converts a millisecond timestamp to local time.
fn to_local(ts_ms: i64) -> DateTime<Local> {
    DateTime::from_timestamp_millis(ts_ms)
        .unwrap_or_else(Utc::now)
        .with_timezone(&Local)
}

/// Local calendar date of a timestamp, formatted as `YYYY-MM-DD`.
pub fn local_date_string(ts_ms: i64) -> String {
    to_local(ts_ms).format("%Y-%m-%d").to_string()
}

/// Millisecond timestamp of local midnight on the day containing `ts_ms`.
pub fn start_of_local_day(ts_ms: i64) -> i64 {
    let midnight = to_local(ts_ms)
        .date_naive()
        .and_hms_opt(0, 0, 0)
        .unwrap_or_default();

    Local
        .from_local_datetime(&midnight)
        .earliest()
        .map(|dt| dt.timestamp_millis())
        .unwrap_or(ts_ms)
}

/// Sleep duration until the next occurrence of `hour`:00:00 local time,
/// strictly in the future. If the hour has already passed today the
/// target is tomorrow.
pub fn delay_until_local_hour(hour: u32) -> Duration {
    let now = Local::now();
    let time = NaiveTime::from_hms_opt(hour.min(23), 0, 0).unwrap_or_default();
    let today = now.date_naive();

    let target = match Local.from_local_datetime(&today.and_time(time)).earliest() {
        Some(dt) if dt > now => Some(dt),
        _ => {
            let tomorrow = today.succ_opt().unwrap_or(today);
            Local.from_local_datetime(&tomorrow.and_time(time)).earliest()
        }
    };

    match target {
        Some(dt) => (dt - now).to_std().unwrap_or(Duration::from_secs(60)),
        // Unresolvable local time (DST gap); retry shortly instead of stalling.
        None => Duration::from_secs(60),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_now_ms_is_recent() {
        // After 2020-01-01 in any sane clock.
        assert!(now_ms() > 1_577_836_800_000);
    }

    #[test]
    fn test_start_of_local_day_bounds() {
        let ts = now_ms();
        let sod = start_of_local_day(ts);

        assert!(sod <= ts);
        assert!(ts - sod < 86_400_000);
        assert_eq!(local_date_string(sod), local_date_string(ts));
    }

    #[test]
    fn test_local_date_string_format() {
        let date = local_date_string(now_ms());
        let parts: Vec<&str> = date.split('-').collect();

        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0].len(), 4);
        assert!(parts.iter().all(|p| p.chars().all(|c| c.is_ascii_digit())));
    }

    #[test]
    fn test_delay_until_local_hour_is_future_and_bounded() {
        for hour in 0..24 {
            let delay = delay_until_local_hour(hour);
            assert!(delay > Duration::ZERO, "hour {hour} gave zero delay");
            assert!(
                delay <= Duration::from_secs(24 * 3600),
                "hour {hour} gave delay over a day"
            );
        }
    }
}
