use crate::common::Timestamp;
use chrono::{DateTime, NaiveDateTime, Utc};

pub const MILLIS_PER_SECOND: i64 = 1000;
pub const MILLIS_PER_MINUTE: i64 = 60 * MILLIS_PER_SECOND;
pub const MILLIS_PER_HOUR: i64 = 60 * MILLIS_PER_MINUTE;
pub const MILLIS_PER_DAY: i64 = 24 * MILLIS_PER_HOUR;
pub const MILLIS_PER_WEEK: i64 = 7 * MILLIS_PER_DAY;

/// Converts epoch millis to a naive (zone-less) date time. Values outside chrono's
/// supported range are clamped to its bounds.
pub fn naive_from_millis(ts: Timestamp) -> NaiveDateTime {
    match DateTime::<Utc>::from_timestamp_millis(ts) {
        Some(dt) => dt.naive_utc(),
        None if ts < 0 => NaiveDateTime::MIN,
        None => NaiveDateTime::MAX,
    }
}

pub fn naive_to_millis(dt: NaiveDateTime) -> Timestamp {
    dt.and_utc().timestamp_millis()
}

/// Floor division of `ts` by `interval`, correct for timestamps before the epoch.
/// Saturates at `i64::MIN` when the floor is not representable.
#[inline]
pub fn floor_to_interval(ts: Timestamp, interval: i64) -> Timestamp {
    debug_assert!(interval > 0);
    ts.saturating_sub(ts.rem_euclid(interval))
}
