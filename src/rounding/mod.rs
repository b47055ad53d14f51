//! Mapping of raw timestamps onto histogram bucket keys.
//!
//! A [`DateRounding`] is a pure function of its configuration: the same timestamp always
//! lands on the same key, which is what lets partials from different partitions be merged
//! by key.
use crate::common::time::{
    floor_to_interval, naive_from_millis, naive_to_millis, MILLIS_PER_DAY, MILLIS_PER_HOUR,
    MILLIS_PER_MINUTE, MILLIS_PER_SECOND, MILLIS_PER_WEEK,
};
use crate::common::{BucketKey, Timestamp};
use crate::parser::{parse_positive_duration_value, utc, ParseError};
use bon::bon;
use chrono::{Datelike, FixedOffset, NaiveDate};
use std::fmt::Display;
use strum_macros::EnumIter;

/// 1970-01-01 was a Thursday; weeks start on Monday.
const WEEK_EPOCH_SHIFT: i64 = 3 * MILLIS_PER_DAY;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter)]
pub enum DateField {
    Year,
    Quarter,
    Month,
    Week,
    Day,
    Hour,
    Minute,
    Second,
}

impl DateField {
    pub fn name(&self) -> &'static str {
        match self {
            DateField::Year => "year",
            DateField::Quarter => "quarter",
            DateField::Month => "month",
            DateField::Week => "week",
            DateField::Day => "day",
            DateField::Hour => "hour",
            DateField::Minute => "minute",
            DateField::Second => "second",
        }
    }

    /// Nominal length of the unit, only used to pick a zone strategy.
    pub fn unit_millis(&self) -> i64 {
        match self {
            DateField::Year => 365 * MILLIS_PER_DAY,
            DateField::Quarter => 90 * MILLIS_PER_DAY,
            DateField::Month => 30 * MILLIS_PER_DAY,
            DateField::Week => MILLIS_PER_WEEK,
            DateField::Day => MILLIS_PER_DAY,
            DateField::Hour => MILLIS_PER_HOUR,
            DateField::Minute => MILLIS_PER_MINUTE,
            DateField::Second => MILLIS_PER_SECOND,
        }
    }

    /// Truncates `ts` to the start of the unit containing it, in the UTC calendar.
    pub fn round_floor(&self, ts: Timestamp) -> Timestamp {
        match self {
            DateField::Year => start_of_month(ts, |_| 1),
            DateField::Quarter => start_of_month(ts, |month| (month - 1) / 3 * 3 + 1),
            DateField::Month => start_of_month(ts, |month| month),
            DateField::Week => {
                floor_to_interval(ts.saturating_add(WEEK_EPOCH_SHIFT), MILLIS_PER_WEEK)
                    .saturating_sub(WEEK_EPOCH_SHIFT)
            }
            DateField::Day => floor_to_interval(ts, MILLIS_PER_DAY),
            DateField::Hour => floor_to_interval(ts, MILLIS_PER_HOUR),
            DateField::Minute => floor_to_interval(ts, MILLIS_PER_MINUTE),
            DateField::Second => floor_to_interval(ts, MILLIS_PER_SECOND),
        }
    }
}

fn start_of_month(ts: Timestamp, month_of: impl Fn(u32) -> u32) -> Timestamp {
    let dt = naive_from_millis(ts);
    NaiveDate::from_ymd_opt(dt.year(), month_of(dt.month()), 1)
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(naive_to_millis)
        .unwrap_or(ts)
}

impl Display for DateField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Either a calendar unit or a fixed interval in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RoundingUnit {
    Field(DateField),
    Interval(i64),
}

impl RoundingUnit {
    pub fn round_floor(&self, ts: Timestamp) -> Timestamp {
        match self {
            RoundingUnit::Field(field) => field.round_floor(ts),
            RoundingUnit::Interval(interval) => floor_to_interval(ts, *interval),
        }
    }

    fn is_sub_day(&self) -> bool {
        match self {
            RoundingUnit::Field(field) => field.unit_millis() < MILLIS_PER_DAY,
            RoundingUnit::Interval(interval) => *interval < MILLIS_PER_DAY,
        }
    }
}

impl TryFrom<&str> for RoundingUnit {
    type Error = ParseError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let field = hashify::tiny_map_ignore_case! {
            value.as_bytes(),
            "year" => DateField::Year,
            "1y" => DateField::Year,
            "quarter" => DateField::Quarter,
            "month" => DateField::Month,
            "week" => DateField::Week,
            "1w" => DateField::Week,
            "day" => DateField::Day,
            "1d" => DateField::Day,
            "hour" => DateField::Hour,
            "1h" => DateField::Hour,
            "minute" => DateField::Minute,
            "1m" => DateField::Minute,
            "second" => DateField::Second,
            "1s" => DateField::Second,
        };
        match field {
            Some(field) => Ok(RoundingUnit::Field(field)),
            None => parse_positive_duration_value(value)
                .map(RoundingUnit::Interval)
                .map_err(|_| ParseError::InvalidInterval(value.to_string())),
        }
    }
}

impl Display for RoundingUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RoundingUnit::Field(field) => write!(f, "{field}"),
            RoundingUnit::Interval(interval) => write!(f, "{interval}ms"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ZoneStrategy {
    Utc,
    /// Round in local time and convert the bucket start back to UTC.
    Time,
    /// Round in local time and keep the local midnight as the key.
    Day,
}

/// Rounding configuration for one histogram request.
///
/// `round(ts) = post_offset + zone_round(factor * ts + pre_offset)` where `zone_round`
/// truncates to the configured unit in the pre zone calendar and then applies the post zone.
#[derive(Debug, Clone, PartialEq)]
pub struct DateRounding {
    unit: RoundingUnit,
    pre_zone: FixedOffset,
    post_zone: FixedOffset,
    pre_zone_adjust_large_interval: bool,
    pre_offset: i64,
    post_offset: i64,
    factor: f64,
    strategy: ZoneStrategy,
}

#[bon]
impl DateRounding {
    #[builder]
    pub fn new(
        unit: RoundingUnit,
        #[builder(default = utc())] pre_zone: FixedOffset,
        #[builder(default = utc())] post_zone: FixedOffset,
        #[builder(default)] pre_zone_adjust_large_interval: bool,
        #[builder(default)] pre_offset: i64,
        #[builder(default)] post_offset: i64,
        #[builder(default = 1.0)] factor: f64,
    ) -> Self {
        let strategy = if pre_zone == utc() && post_zone == utc() {
            ZoneStrategy::Utc
        } else if pre_zone_adjust_large_interval || unit.is_sub_day() {
            ZoneStrategy::Time
        } else {
            ZoneStrategy::Day
        };
        Self {
            unit,
            pre_zone,
            post_zone,
            pre_zone_adjust_large_interval,
            pre_offset,
            post_offset,
            factor,
            strategy,
        }
    }
}

impl DateRounding {
    pub fn utc(unit: RoundingUnit) -> Self {
        Self::builder().unit(unit).build()
    }

    pub fn unit(&self) -> RoundingUnit {
        self.unit
    }

    pub fn pre_zone(&self) -> FixedOffset {
        self.pre_zone
    }

    pub fn post_zone(&self) -> FixedOffset {
        self.post_zone
    }

    pub fn pre_zone_adjust_large_interval(&self) -> bool {
        self.pre_zone_adjust_large_interval
    }

    pub fn pre_offset(&self) -> i64 {
        self.pre_offset
    }

    pub fn post_offset(&self) -> i64 {
        self.post_offset
    }

    pub fn factor(&self) -> f64 {
        self.factor
    }

    pub fn round(&self, ts: Timestamp) -> BucketKey {
        let scaled = if self.factor != 1.0 {
            (self.factor * ts as f64) as i64
        } else {
            ts
        };
        let key = self.round_in_zone(scaled.saturating_add(self.pre_offset));
        key.saturating_add(self.post_offset)
    }

    fn round_in_zone(&self, ts: Timestamp) -> Timestamp {
        match self.strategy {
            ZoneStrategy::Utc => self.unit.round_floor(ts),
            ZoneStrategy::Time => {
                let pre = offset_millis(self.pre_zone);
                let local = self.unit.round_floor(ts.saturating_add(pre));
                local
                    .saturating_sub(pre)
                    .saturating_add(offset_millis(self.post_zone))
            }
            ZoneStrategy::Day => {
                let local = self
                    .unit
                    .round_floor(ts.saturating_add(offset_millis(self.pre_zone)));
                local.saturating_add(offset_millis(self.post_zone))
            }
        }
    }
}

fn offset_millis(zone: FixedOffset) -> i64 {
    zone.local_minus_utc() as i64 * MILLIS_PER_SECOND
}
