use crate::parser::{ParseError, ParseResult};
use chrono::{FixedOffset, Offset, Utc};

const SECONDS_PER_HOUR: i32 = 3600;
const SECONDS_PER_MINUTE: i32 = 60;

/// Fixed offset zone for a whole number of hours east of UTC.
pub fn time_zone_from_hours(hours: i64) -> ParseResult<FixedOffset> {
    i32::try_from(hours)
        .ok()
        .and_then(|h| h.checked_mul(SECONDS_PER_HOUR))
        .and_then(FixedOffset::east_opt)
        .ok_or_else(|| ParseError::InvalidTimeZone(hours.to_string()))
}

/// Parses a zone given as `UTC`, `Z`, an hour count (`"-2"`) or `[+-]HH:MM`.
///
/// For `HH:MM` the minutes take the sign of the hours, so `-02:30` is two and a half
/// hours west of UTC.
pub fn parse_time_zone(text: &str) -> ParseResult<FixedOffset> {
    let text = text.trim();
    let invalid = || ParseError::InvalidTimeZone(text.to_string());

    if text.eq_ignore_ascii_case("utc") || text.eq_ignore_ascii_case("gmt") || text == "Z" {
        return Ok(utc());
    }

    match text.split_once(':') {
        Some((hours, minutes)) => {
            let negative = hours.starts_with('-');
            let hours: i32 = hours.parse().map_err(|_| invalid())?;
            let minutes: i32 = minutes.parse().map_err(|_| invalid())?;
            if !(-23..=23).contains(&hours) || !(0..60).contains(&minutes) {
                return Err(invalid());
            }
            let minutes = if negative { -minutes } else { minutes };
            let seconds = hours * SECONDS_PER_HOUR + minutes * SECONDS_PER_MINUTE;
            FixedOffset::east_opt(seconds).ok_or_else(invalid)
        }
        None => {
            let hours: i64 = text.parse().map_err(|_| invalid())?;
            time_zone_from_hours(hours)
        }
    }
}

#[inline]
pub fn utc() -> FixedOffset {
    Utc.fix()
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("UTC", 0; "utc")]
    #[test_case("Z", 0; "zulu")]
    #[test_case("2", 7200; "hours")]
    #[test_case("-5", -18000; "negative hours")]
    #[test_case("+05:30", 19800; "hours and minutes")]
    #[test_case("-02:30", -9000; "negative hours and minutes")]
    fn test_parse_time_zone(input: &str, expected_seconds: i32) {
        let zone = parse_time_zone(input).unwrap();
        assert_eq!(zone.local_minus_utc(), expected_seconds);
    }

    #[test_case("Europe/Amsterdam"; "named zone")]
    #[test_case("02:75"; "minutes out of range")]
    #[test_case("30"; "hours out of range")]
    #[test_case(""; "empty")]
    fn test_parse_time_zone_errors(input: &str) {
        assert!(matches!(
            parse_time_zone(input),
            Err(ParseError::InvalidTimeZone(_))
        ));
    }
}
