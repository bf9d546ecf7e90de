//! Conversion between decimal strings and scaled integers.
//!
//! Both [`crate::Money`] and [`crate::Quantity`] are stored as `i64` multiples of a fixed power of ten. This module
//! holds the parsing, formatting and rounding rules they share, so that no value ever passes through `f64`.
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FixedPointParseError {
    #[error("'{0}' is not a decimal number")]
    NotANumber(String),
    #[error("'{value}' has more than {max} decimal places")]
    TooPrecise { value: String, max: u32 },
    #[error("'{0}' is out of range")]
    OutOfRange(String),
}

/// Parses a signed decimal string into an integer scaled by `10^decimals`. Trailing zeros in the fractional part do
/// not count towards the precision limit, so `"1.500"` is valid with `decimals = 1`.
pub(crate) fn parse(s: &str, decimals: u32) -> Result<i64, FixedPointParseError> {
    let trimmed = s.trim();
    let (negative, digits) = match trimmed.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, trimmed.strip_prefix('+').unwrap_or(trimmed)),
    };
    let (whole, frac) = digits.split_once('.').unwrap_or((digits, ""));
    let is_digits = |part: &str| part.chars().all(|c| c.is_ascii_digit());
    if (whole.is_empty() && frac.is_empty()) || !is_digits(whole) || !is_digits(frac) {
        return Err(FixedPointParseError::NotANumber(s.to_string()));
    }
    let frac = frac.trim_end_matches('0');
    if frac.len() > decimals as usize {
        return Err(FixedPointParseError::TooPrecise { value: s.to_string(), max: decimals });
    }
    let out_of_range = || FixedPointParseError::OutOfRange(s.to_string());
    let whole_value = if whole.is_empty() { 0 } else { whole.parse::<i64>().map_err(|_| out_of_range())? };
    let frac_value = if frac.is_empty() {
        0
    } else {
        format!("{:0<width$}", frac, width = decimals as usize).parse::<i64>().map_err(|_| out_of_range())?
    };
    let value = whole_value
        .checked_mul(10i64.pow(decimals))
        .and_then(|v| v.checked_add(frac_value))
        .ok_or_else(out_of_range)?;
    Ok(if negative { -value } else { value })
}

/// Renders a scaled integer as a decimal string, keeping at least `min_decimals` fractional digits and dropping any
/// further trailing zeros.
pub(crate) fn format(value: i64, decimals: u32, min_decimals: u32) -> String {
    let scale = 10u64.pow(decimals);
    let sign = if value < 0 { "-" } else { "" };
    let abs = value.unsigned_abs();
    let whole = abs / scale;
    let mut frac = format!("{:0width$}", abs % scale, width = decimals as usize);
    while frac.len() > min_decimals as usize && frac.ends_with('0') {
        frac.pop();
    }
    if frac.is_empty() {
        format!("{sign}{whole}")
    } else {
        format!("{sign}{whole}.{frac}")
    }
}

/// Integer division rounding half away from zero.
pub(crate) fn div_round_half_up(numerator: i128, denominator: i128) -> i128 {
    let half = denominator / 2;
    if numerator >= 0 {
        (numerator + half) / denominator
    } else {
        -((-numerator + half) / denominator)
    }
}

/// Wire representation accepted when deserializing. JSON clients may send `"1.5"` or `1.5`; either way the value is
/// re-parsed from its decimal text.
#[derive(Deserialize)]
#[serde(untagged)]
pub(crate) enum DecimalRepr {
    Text(String),
    Integer(i64),
    Float(f64),
}

impl DecimalRepr {
    pub fn into_text(self) -> String {
        match self {
            Self::Text(s) => s,
            Self::Integer(i) => i.to_string(),
            Self::Float(f) => f.to_string(),
        }
    }
}
