//! Duration strings in the `2h30m0s` notation.
//!
//! Users write durations such as `"2h30m"` or `"90m"`; the server stores
//! milliseconds. Reads render milliseconds back in canonical form
//! (`"2h30m0s"`), and two spellings are equal when they denote the same
//! number of milliseconds.

use crate::error::{Error, Result};

const NANOS_PER_MILLI: u128 = 1_000_000;

const UNITS: &[(&str, u128)] = &[
    ("ns", 1),
    ("us", 1_000),
    ("µs", 1_000),
    ("ms", 1_000_000),
    ("s", 1_000_000_000),
    ("m", 60 * 1_000_000_000),
    ("h", 60 * 60 * 1_000_000_000),
];

/// Parse a duration string into whole milliseconds.
pub fn parse_millis(input: &str) -> Result<u64> {
    let invalid = |reason: &str| Error::InvalidDuration {
        input: input.to_string(),
        reason: reason.to_string(),
    };

    let text = input.trim();
    if text.is_empty() {
        return Err(invalid("empty duration"));
    }
    if text == "0" {
        return Ok(0);
    }
    if text.starts_with('-') {
        return Err(invalid("negative durations are not allowed"));
    }
    let mut rest = text.strip_prefix('+').unwrap_or(text);

    let mut total_nanos: u128 = 0;
    while !rest.is_empty() {
        let int_len = rest.bytes().take_while(u8::is_ascii_digit).count();
        let (int_part, after_int) = rest.split_at(int_len);
        let (frac_part, after_number) = match after_int.strip_prefix('.') {
            Some(tail) => {
                let frac_len = tail.bytes().take_while(u8::is_ascii_digit).count();
                tail.split_at(frac_len)
            }
            None => ("", after_int),
        };
        if int_part.is_empty() && frac_part.is_empty() {
            return Err(invalid("expected a number"));
        }

        let unit_len = after_number
            .char_indices()
            .find(|(_, c)| c.is_ascii_digit() || *c == '.')
            .map_or(after_number.len(), |(i, _)| i);
        let (unit, tail) = after_number.split_at(unit_len);
        let scale = UNITS
            .iter()
            .find(|(name, _)| *name == unit)
            .map(|(_, scale)| *scale)
            .ok_or_else(|| {
                if unit.is_empty() {
                    invalid("missing unit")
                } else {
                    invalid(&format!("unknown unit {unit:?}"))
                }
            })?;

        let whole: u128 = if int_part.is_empty() {
            0
        } else {
            int_part.parse().map_err(|_| invalid("number too large"))?
        };
        let mut nanos = whole
            .checked_mul(scale)
            .ok_or_else(|| invalid("duration too large"))?;
        if !frac_part.is_empty() {
            let digits = frac_part.len().min(18);
            let frac: u128 = frac_part[..digits]
                .parse()
                .map_err(|_| invalid("invalid fraction"))?;
            nanos += frac * scale / 10u128.pow(digits as u32);
        }
        total_nanos = total_nanos
            .checked_add(nanos)
            .ok_or_else(|| invalid("duration too large"))?;
        rest = tail;
    }

    u64::try_from(total_nanos / NANOS_PER_MILLI).map_err(|_| invalid("duration too large"))
}

/// Render milliseconds in canonical `XhYmZs` form.
pub fn format_millis(millis: u64) -> String {
    if millis == 0 {
        return "0s".to_string();
    }
    if millis < 1000 {
        return format!("{millis}ms");
    }

    let secs = millis / 1000;
    let frac = millis % 1000;
    let hours = secs / 3600;
    let minutes = (secs % 3600) / 60;
    let seconds = secs % 60;

    let mut out = String::new();
    if hours > 0 {
        out.push_str(&format!("{hours}h"));
    }
    if hours > 0 || minutes > 0 {
        out.push_str(&format!("{minutes}m"));
    }
    out.push_str(&seconds.to_string());
    if frac > 0 {
        let frac = format!("{frac:03}");
        out.push('.');
        out.push_str(frac.trim_end_matches('0'));
    }
    out.push('s');
    out
}

/// Whether two duration strings denote the same number of milliseconds.
pub fn durations_equal(a: &str, b: &str) -> bool {
    matches!((parse_millis(a), parse_millis(b)), (Ok(x), Ok(y)) if x == y)
}
