//! Human duration strings.
//!
//! Parsing accepts `<number><unit>` groups such as `"1h30m"`, `"2.5 days"`
//! or `"90"` (bare numbers are seconds). Formatting produces the compact
//! `1h30m0s` form used when a duration is printed.

use crate::{Result, RuntimeError};

use super::Duration;

const NANOS_PER_MICRO: f64 = 1e3;
const NANOS_PER_MILLI: f64 = 1e6;
const NANOS_PER_SEC: f64 = 1e9;
const NANOS_PER_MIN: f64 = 60.0 * NANOS_PER_SEC;
const NANOS_PER_HOUR: f64 = 60.0 * NANOS_PER_MIN;
const NANOS_PER_DAY: f64 = 24.0 * NANOS_PER_HOUR;

fn unit_nanos(unit: &str) -> Option<f64> {
    let nanos = match unit {
        "ns" | "nanosecond" | "nanoseconds" => 1.0,
        "us" | "µs" | "microsecond" | "microseconds" => NANOS_PER_MICRO,
        "ms" | "millisecond" | "milliseconds" => NANOS_PER_MILLI,
        "s" | "sec" | "secs" | "second" | "seconds" => NANOS_PER_SEC,
        "m" | "min" | "mins" | "minute" | "minutes" => NANOS_PER_MIN,
        "h" | "hr" | "hrs" | "hour" | "hours" => NANOS_PER_HOUR,
        "d" | "day" | "days" => NANOS_PER_DAY,
        "w" | "wk" | "week" | "weeks" => 7.0 * NANOS_PER_DAY,
        "mo" | "month" | "months" => 30.0 * NANOS_PER_DAY,
        "y" | "yr" | "year" | "years" => 365.0 * NANOS_PER_DAY,
        _ => return None,
    };
    Some(nanos)
}

fn invalid(input: &str) -> RuntimeError {
    RuntimeError::Validation(format!("invalid duration: {input:?}"))
}

/// Parse a human duration string.
///
/// # Errors
///
/// Returns a validation error for empty input, unknown units, missing
/// numbers or values that overflow.
pub fn parse_duration(input: &str) -> Result<Duration> {
    let lowered = input.trim().to_lowercase();
    if lowered.is_empty() {
        return Err(invalid(input));
    }

    if let Ok(secs) = lowered.parse::<f64>() {
        return nanos_to_duration(secs * NANOS_PER_SEC).ok_or_else(|| invalid(input));
    }

    let mut total = 0.0_f64;
    let mut rest = lowered.as_str();
    while !rest.is_empty() {
        let (number, after) = split_while(rest, |c| c.is_ascii_digit() || c == '.');
        if number.is_empty() {
            return Err(invalid(input));
        }
        let amount: f64 = number.parse().map_err(|_| invalid(input))?;

        let (unit, after) = split_while(after.trim_start(), |c| c.is_alphabetic());
        let nanos = unit_nanos(unit).ok_or_else(|| invalid(input))?;

        total += amount * nanos;
        rest = after.trim_start();
    }

    nanos_to_duration(total).ok_or_else(|| invalid(input))
}

fn split_while(s: &str, pred: impl Fn(char) -> bool) -> (&str, &str) {
    let end = s.find(|c: char| !pred(c)).unwrap_or(s.len());
    s.split_at(end)
}

fn nanos_to_duration(nanos: f64) -> Option<Duration> {
    if !nanos.is_finite() || nanos.abs() >= i64::MAX as f64 {
        return None;
    }
    Some(Duration::nanoseconds(nanos.round() as i64))
}

/// Format a duration as `72h3m0.5s`, `1.5ms`, `0s`, ...
pub fn format_duration(d: Duration) -> String {
    let nanos = super::coerce::duration_nanos(d);
    if nanos == 0 {
        return "0s".to_string();
    }

    let sign = if nanos < 0 { "-" } else { "" };
    let abs = nanos.unsigned_abs();

    if abs < 1_000 {
        return format!("{sign}{abs}ns");
    }
    if abs < 1_000_000 {
        return format!("{sign}{}µs", fraction(abs, 1_000));
    }
    if abs < 1_000_000_000 {
        return format!("{sign}{}ms", fraction(abs, 1_000_000));
    }

    let hours = abs / 3_600_000_000_000;
    let rem = abs % 3_600_000_000_000;
    let minutes = rem / 60_000_000_000;
    let secs = fraction(rem % 60_000_000_000, 1_000_000_000);

    if hours > 0 {
        format!("{sign}{hours}h{minutes}m{secs}s")
    } else if minutes > 0 {
        format!("{sign}{minutes}m{secs}s")
    } else {
        format!("{sign}{secs}s")
    }
}

/// `value / unit` with the fractional digits trimmed of trailing zeros.
fn fraction(value: u64, unit: u64) -> String {
    let whole = value / unit;
    let frac = value % unit;
    if frac == 0 {
        return whole.to_string();
    }
    let width = unit.to_string().len() - 1;
    let digits = format!("{frac:0width$}");
    format!("{whole}.{}", digits.trim_end_matches('0'))
}
