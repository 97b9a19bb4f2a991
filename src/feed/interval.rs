//! Parsing of scrape interval strings such as `30s`, `1m` or `1h30m`.

use std::time::Duration;

use crate::error::{GatorError, Result};

const NANOS_PER_UNIT: &[(&str, f64)] = &[
    ("ns", 1.0),
    ("us", 1e3),
    ("µs", 1e3),
    ("μs", 1e3),
    ("ms", 1e6),
    ("s", 1e9),
    ("m", 60.0 * 1e9),
    ("h", 3600.0 * 1e9),
];

/// Parse a duration string made of decimal numbers with unit suffixes.
///
/// Valid units are `ns`, `us` (or `µs`), `ms`, `s`, `m` and `h`. The interval
/// must be strictly positive.
pub fn parse_interval(text: &str) -> Result<Duration> {
    let invalid = || GatorError::InvalidArgument(format!("invalid interval: {:?}", text));

    let trimmed = text.trim();
    let (negative, mut rest) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        Some(_) => (false, trimmed),
        None => return Err(invalid()),
    };
    if rest.is_empty() {
        return Err(invalid());
    }

    let mut total_nanos = 0f64;
    while !rest.is_empty() {
        let number_len = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(rest.len());
        let number = &rest[..number_len];
        if number.is_empty() || number == "." {
            return Err(invalid());
        }
        let value: f64 = number.parse().map_err(|_| invalid())?;
        rest = &rest[number_len..];

        let unit_len = rest
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(rest.len());
        let unit = &rest[..unit_len];
        let scale = NANOS_PER_UNIT
            .iter()
            .find(|(name, _)| *name == unit)
            .map(|(_, scale)| *scale)
            .ok_or_else(|| {
                if unit.is_empty() {
                    GatorError::InvalidArgument(format!("missing unit in interval: {:?}", text))
                } else {
                    GatorError::InvalidArgument(format!(
                        "unknown unit {:?} in interval: {:?}",
                        unit, text
                    ))
                }
            })?;
        rest = &rest[unit_len..];

        total_nanos += value * scale;
    }

    if negative || total_nanos < 1.0 {
        return Err(GatorError::InvalidArgument(format!(
            "interval must be positive: {:?}",
            text
        )));
    }
    if !total_nanos.is_finite() || total_nanos > u64::MAX as f64 {
        return Err(GatorError::InvalidArgument(format!(
            "interval too large: {:?}",
            text
        )));
    }

    Ok(Duration::from_nanos(total_nanos.round() as u64))
}

/// Render a duration the way intervals are written, e.g. `1h30m0s` or `300ms`.
pub fn format_interval(duration: Duration) -> String {
    if duration.is_zero() {
        return "0s".to_string();
    }
    if duration < Duration::from_secs(1) {
        let nanos = duration.as_nanos();
        return if nanos % 1_000_000 == 0 {
            format!("{}ms", nanos / 1_000_000)
        } else if nanos % 1_000 == 0 {
            format!("{}µs", nanos / 1_000)
        } else {
            format!("{}ns", nanos)
        };
    }

    let total = duration.as_secs();
    let (hours, minutes, seconds) = (total / 3600, (total % 3600) / 60, total % 60);
    let subsec = duration.subsec_nanos();
    let seconds = if subsec == 0 {
        format!("{}s", seconds)
    } else {
        let fraction = format!("{:09}", subsec);
        format!("{}.{}s", seconds, fraction.trim_end_matches('0'))
    };

    if hours > 0 {
        format!("{}h{}m{}", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{}m{}", minutes, seconds)
    } else {
        seconds
    }
}
