//! Decimal conversions between provider amounts and display strings.

use rust_decimal::{Decimal, RoundingStrategy};
use std::str::FromStr;

/// Fractional digits kept in every rendered balance.
pub const DISPLAY_DECIMALS: u32 = 12;

/// Renders a decimal for display.
///
/// Rounds half away from zero to [`DISPLAY_DECIMALS`], strips trailing zeros
/// and always keeps one fractional digit (`1` renders as `1.0`).
#[must_use]
pub fn format_decimal(value: Decimal) -> String {
    let rounded = value
        .round_dp_with_strategy(DISPLAY_DECIMALS, RoundingStrategy::MidpointAwayFromZero)
        .normalize();
    let rendered = rounded.to_string();
    if rendered.contains('.') {
        rendered
    } else {
        format!("{rendered}.0")
    }
}

/// Scales an integer amount of base units (wei, lamports, ...) down by
/// `decimals`. Returns `None` when the amount does not fit a 96-bit mantissa.
#[must_use]
pub fn from_base_units(amount: u128, decimals: u32) -> Option<Decimal> {
    let amount = i128::try_from(amount).ok()?;
    Decimal::try_from_i128_with_scale(amount, decimals).ok()
}

/// Parses a `0x`-prefixed hex quantity as returned by EVM nodes.
pub fn parse_hex_quantity(raw: &str) -> Option<u128> {
    let digits = raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X"))?;
    if digits.is_empty() {
        return Some(0);
    }
    u128::from_str_radix(digits, 16).ok()
}

/// Reads a provider amount that may arrive as a JSON string or number.
/// Scientific notation is accepted.
#[must_use]
pub fn parse_decimal(value: &serde_json::Value) -> Option<Decimal> {
    let text = match value {
        serde_json::Value::String(s) => s.trim().to_string(),
        serde_json::Value::Number(n) => n.to_string(),
        _ => return None,
    };
    if text.is_empty() {
        return None;
    }
    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .ok()
}
