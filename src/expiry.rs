// 9.0: weekly expiry calendar. every option expires Friday 08:00 UTC.

use crate::types::Timestamp;
use chrono::{Datelike, Days, NaiveTime, Timelike, Weekday};

pub const EXPIRY_WEEKDAY: Weekday = Weekday::Fri;
pub const EXPIRY_HOUR: u32 = 8;

/// 2021-01-01 08:00:00 UTC, a Friday expiry. default start of a simulated run.
pub const SIMULATION_EPOCH: Timestamp = Timestamp(1_609_488_000);

// hour granularity: the driver ticks hourly
pub fn is_expiration(t: Timestamp) -> bool {
    t.to_datetime()
        .map(|dt| dt.weekday() == EXPIRY_WEEKDAY && dt.hour() == EXPIRY_HOUR)
        .unwrap_or(false)
}

/// 08:00 UTC on the first Friday on or after `t`'s calendar day.
///
/// On a Friday after 08:00 this is the same morning, i.e. earlier than `t`.
/// Callers wanting the following week pass `t` plus one day.
pub fn next_expiry(t: Timestamp) -> Option<Timestamp> {
    let dt = t.to_datetime()?;
    let from_monday = dt.weekday().num_days_from_monday() as i64;
    let friday = EXPIRY_WEEKDAY.num_days_from_monday() as i64;
    let days_ahead = (friday - from_monday).rem_euclid(7) as u64;

    let date = dt.date_naive().checked_add_days(Days::new(days_ahead))?;
    let expiry = date.and_time(NaiveTime::from_hms_opt(EXPIRY_HOUR, 0, 0)?).and_utc();
    Some(Timestamp::from_datetime(expiry))
}
