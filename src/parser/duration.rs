use crate::parser::{ParseError, ParseResult};

const MILLIS_PER_SECOND: f64 = 1e3;
const MILLIS_PER_MINUTE: f64 = 60.0 * MILLIS_PER_SECOND;
const MILLIS_PER_HOUR: f64 = 60.0 * MILLIS_PER_MINUTE;
const MILLIS_PER_DAY: f64 = 24.0 * MILLIS_PER_HOUR;
const MILLIS_PER_WEEK: f64 = 7.0 * MILLIS_PER_DAY;
const MILLIS_PER_YEAR: f64 = 365.0 * MILLIS_PER_DAY;

/// Returns a strictly positive duration in milliseconds, e.g. for a fixed histogram interval.
pub fn parse_positive_duration_value(s: &str) -> ParseResult<i64> {
    let d = parse_duration_value(s)?;
    if d <= 0 {
        return Err(ParseError::InvalidDuration(format!(
            "duration must be positive; got {s}"
        )));
    }
    Ok(d)
}

/// Parses a signed rounding offset such as `"2h"`, `"-2h"` or `"-1d12h"`.
pub fn parse_offset(s: &str) -> ParseResult<i64> {
    let s = s.trim();
    match s.strip_prefix('-') {
        Some(rest) => parse_positive_duration_value(rest).map(|d| -d),
        None => parse_duration_value(s),
    }
}

/// Returns the duration in milliseconds for the given s.
///
/// Duration in s may be combined, i.e., 2h5m, -2h5m or 2h-5m.
///
/// The returned duration value can be negative.
pub fn parse_duration_value(s: &str) -> ParseResult<i64> {
    Ok(parse_duration_internal(s)?.round() as i64)
}

fn parse_duration_internal(s: &str) -> ParseResult<f64> {
    if s.is_empty() {
        return Err(ParseError::InvalidDuration(r##""""##.to_string()));
    }

    let mut duration: f64 = 0.0;
    let mut cursor = s;
    let mut is_minus = false;

    while !cursor.is_empty() {
        let (mut value, rest) = scan_duration_segment(cursor)?;
        if is_minus && value > 0.0 {
            value = -value
        }
        duration += value;
        if value < 0f64 {
            is_minus = true
        }
        cursor = rest;
    }

    validate_duration(duration)
}

fn validate_duration(ms: f64) -> ParseResult<f64> {
    if ms.abs() > (1_i64 << (62 - 1)) as f64 {
        return Err(ParseError::General(format!("duration ({ms}) is too large")));
    }
    Ok(ms)
}

fn scan_duration_segment(s: &str) -> ParseResult<(f64, &str)> {
    let suffix_pos = s.find(|ch| matches!(ch, 'd' | 'h' | 'm' | 's' | 'w' | 'y'));
    let Some(i) = suffix_pos else {
        // bare number, interpreted as millis
        let value = parse_number_prefix(s)?;
        return Ok((value, ""));
    };

    let number_part = parse_number_prefix(&s[..i])?;
    let suffix = &s[i..];
    let (multiplier, suffix_len) = if suffix.starts_with("ms") {
        (1.0, 2)
    } else {
        let multiplier = match suffix.as_bytes()[0] {
            b'm' => MILLIS_PER_MINUTE,
            b's' => MILLIS_PER_SECOND,
            b'h' => MILLIS_PER_HOUR,
            b'd' => MILLIS_PER_DAY,
            b'w' => MILLIS_PER_WEEK,
            _ => MILLIS_PER_YEAR,
        };
        (multiplier, 1)
    };

    Ok((number_part * multiplier, &suffix[suffix_len..]))
}

fn parse_number_prefix(num_str: &str) -> ParseResult<f64> {
    match num_str.parse::<f64>() {
        Ok(num) if num.is_finite() => Ok(num),
        _ => Err(ParseError::InvalidDuration(num_str.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("5s", 5.0 * MILLIS_PER_SECOND, ""; "seconds")]
    #[test_case("10m", 10.0 * MILLIS_PER_MINUTE, ""; "minutes")]
    #[test_case("2h", 2.0 * MILLIS_PER_HOUR, ""; "hours")]
    #[test_case("3d", 3.0 * MILLIS_PER_DAY, ""; "days")]
    #[test_case("1w", MILLIS_PER_WEEK, ""; "weeks")]
    #[test_case("0.5y", 0.5 * MILLIS_PER_YEAR, ""; "fractional years")]
    #[test_case("100ms", 100.0, ""; "millis")]
    #[test_case("2h45m", 2.0 * MILLIS_PER_HOUR, "45m"; "with remainder")]
    #[test_case("10msrest", 10.0, "rest"; "millis with remainder")]
    fn test_scan_duration_segment(input: &str, expected: f64, remaining: &str) {
        let (value, rest) = scan_duration_segment(input).unwrap();
        assert_eq!(value, expected, "duration mismatch for {input}");
        assert_eq!(rest, remaining, "remaining mismatch for {input}");
    }

    #[test]
    fn test_duration_success() {
        fn f(s: &str, expected: i64) {
            let d = parse_duration_value(s).unwrap();
            assert_eq!(d, expected, "unexpected duration for expr {s}");
        }

        f("123ms", 123);
        f("123s", 123_000);
        f("1h", 3_600_000);
        f("1d", 86_400_000);
        f("1m34s24ms", 94_024);
        f("-1m34s24ms", -94_024);
        f("1m-34s24ms", 25_976);
        f("1.5s", 1_500);
        f("90", 90);
    }

    #[test]
    fn test_duration_error() {
        for s in ["", "foo", "m", "1.23mm", "123q", "1M", "2W", "3D", "3H"] {
            assert!(
                parse_duration_value(s).is_err(),
                "expected error for expr {s:?}"
            );
        }
    }

    #[test]
    fn test_positive_duration_error() {
        for s in ["", "0s", "-123s", "10000000000y"] {
            assert!(
                parse_positive_duration_value(s).is_err(),
                "expected error for duration {s:?}"
            );
        }
    }

    #[test_case("2h", 7_200_000; "positive")]
    #[test_case("-2h", -7_200_000; "negative")]
    #[test_case("-1d12h", -129_600_000; "negative compound")]
    #[test_case("0", 0; "zero")]
    fn test_parse_offset(input: &str, expected: i64) {
        assert_eq!(parse_offset(input).unwrap(), expected);
    }
}
