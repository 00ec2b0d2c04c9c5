use rust_decimal::{Decimal, RoundingStrategy};
use serde_json::Value;
use std::str::FromStr;

/// Decimal carried in a JSON value, either as a string or a number.
pub fn decimal(value: &Value) -> Option<Decimal> {
    match value {
        Value::String(s) => Decimal::from_str(s).ok(),
        Value::Number(n) => Decimal::from_str(&n.to_string()).ok(),
        _ => None,
    }
}

/// `1234567.891` -> `1,234,567.89` at `dp` decimals.
pub fn format_amount(value: Decimal, dp: u32) -> String {
    let rounded = round_half_up(value, dp);
    let text = format!("{:.*}", dp as usize, rounded.abs());
    let (int_part, frac_part) = match text.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (text.as_str(), None),
    };

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if rounded.is_sign_negative() && !rounded.is_zero() {
        "-"
    } else {
        ""
    };
    match frac_part {
        Some(f) => format!("{sign}{grouped}.{f}"),
        None => format!("{sign}{grouped}"),
    }
}

/// A fractional rate as a percentage: `0.0725` -> `7.3%`.
pub fn as_percent(rate: Decimal, dp: u32) -> String {
    format!("{:.*}%", dp as usize, round_half_up(rate * Decimal::ONE_HUNDRED, dp))
}

fn round_half_up(value: Decimal, dp: u32) -> Decimal {
    value.round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero)
}

/// Generic scalar rendering for field/value tables.
pub fn format_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "N/A".to_string(),
        Value::Array(arr) => {
            let items: Vec<String> = arr.iter().map(format_value).collect();
            items.join(", ")
        }
        Value::Object(_) => serde_json::to_string(value).unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;
    use serde_json::json;

    #[test]
    fn groups_thousands() {
        assert_eq!(format_amount(dec!(1234567.891), 2), "1,234,567.89");
        assert_eq!(format_amount(dec!(-60000000000), 0), "-60,000,000,000");
        assert_eq!(format_amount(dec!(999), 0), "999");
        assert_eq!(format_amount(dec!(-0.001), 2), "0.00");
    }

    #[test]
    fn percent_from_rate() {
        assert_eq!(as_percent(dec!(0.0725), 1), "7.3%");
        assert_eq!(as_percent(dec!(-0.5), 0), "-50%");
    }

    #[test]
    fn decimal_from_string_or_number() {
        assert_eq!(decimal(&json!("98.94")), Some(dec!(98.94)));
        assert_eq!(decimal(&json!(12)), Some(dec!(12)));
        assert_eq!(decimal(&json!(null)), None);
    }
}
