//! Field-level sanitization and type coercion.
//!
//! Every function here is total: a value that cannot be used becomes `None`, never an error.
//! Coercion failures are logged as warnings so a dirty source still loads as much as it can.

use std::str::FromStr;

use bigdecimal::BigDecimal;
use tracing::warn;

/// Token (compared ignoring ASCII case) that marks a missing value.
pub const NULL_TOKEN: &str = "NA";

/// Trim `raw`, returning `None` for missing, blank, or `NA` cells.
fn non_null(raw: Option<&str>) -> Option<&str> {
    let trimmed = raw?.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case(NULL_TOKEN) {
        return None;
    }
    Some(trimmed)
}

/// Sanitize a text cell.
///
/// Returns `None` for missing, blank, or `NA` cells. Otherwise returns the trimmed value with at
/// most one leading and one trailing `"` removed. The null rule is applied again to the unquoted
/// value, so `""` and `"NA"` are null as well.
pub fn sanitize_string(raw: Option<&str>) -> Option<String> {
    let trimmed = non_null(raw)?;
    let unquoted = trimmed.strip_prefix('"').unwrap_or(trimmed);
    let unquoted = unquoted.strip_suffix('"').unwrap_or(unquoted);
    non_null(Some(unquoted)).map(str::to_owned)
}

/// Parse a base-10 integer cell, or `None` (with a warning when the cell was not null).
pub fn parse_integer(raw: Option<&str>) -> Option<i32> {
    let trimmed = non_null(raw)?;
    match trimmed.parse::<i32>() {
        Ok(v) => Some(v),
        Err(e) => {
            warn!(raw = trimmed, error = %e, "could not parse integer value; setting to null");
            None
        }
    }
}

/// Parse an exact decimal cell, or `None` (with a warning when the cell was not null).
///
/// The value is kept at whatever scale the source used; no rounding happens here.
pub fn parse_decimal(raw: Option<&str>) -> Option<BigDecimal> {
    let trimmed = non_null(raw)?;
    if !is_plain_decimal(trimmed) {
        warn!(raw = trimmed, "not a plain decimal value; setting to null");
        return None;
    }
    match BigDecimal::from_str(trimmed) {
        Ok(v) => Some(v),
        Err(e) => {
            warn!(raw = trimmed, error = %e, "could not parse decimal value; setting to null");
            None
        }
    }
}

/// `[+-]digits[.digits][(e|E)[+-]digits]`, with digits on at least one side of the point.
///
/// `BigDecimal::from_str` is more lenient (it accepts `_` separators, for one).
fn is_plain_decimal(s: &str) -> bool {
    let (mantissa, exponent) = match s.find(['e', 'E']) {
        Some(idx) => (&s[..idx], Some(&s[idx + 1..])),
        None => (s, None),
    };

    let (int_part, frac_part) = strip_sign(mantissa)
        .split_once('.')
        .unwrap_or((strip_sign(mantissa), ""));
    let mantissa_ok = !(int_part.is_empty() && frac_part.is_empty())
        && is_digits(int_part)
        && is_digits(frac_part);

    mantissa_ok
        && exponent.is_none_or(|exp| {
            let exp = strip_sign(exp);
            !exp.is_empty() && is_digits(exp)
        })
}

fn strip_sign(s: &str) -> &str {
    s.strip_prefix(['+', '-']).unwrap_or(s)
}

fn is_digits(s: &str) -> bool {
    s.bytes().all(|b| b.is_ascii_digit())
}
