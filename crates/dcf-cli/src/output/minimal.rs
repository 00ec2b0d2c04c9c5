use serde_json::Value;

use super::format::format_value;
use super::result_of;

/// Headline fields, most specific first.
const PRIORITY_KEYS: [&str; 4] = ["per_share_value", "wacc_pct", "enterprise_value", "equity_value"];

/// Print just the key answer value from the output.
pub fn print_minimal(value: &Value) {
    println!("{}", minimal_line(result_of(value)));
}

fn minimal_line(result: &Value) -> String {
    let Value::Object(map) = result else {
        return format_value(result);
    };

    for key in PRIORITY_KEYS {
        if let Some(val) = map.get(key).filter(|v| !v.is_null()) {
            return format_value(val);
        }
    }

    // Projection only: final-year FCFF
    if let Some(last) = map
        .get("projected_years")
        .and_then(Value::as_array)
        .and_then(|years| years.last())
    {
        if let Some(fcff) = last.get("fcff") {
            return format_value(fcff);
        }
    }

    match map.iter().next() {
        Some((key, val)) => format!("{key}: {}", format_value(val)),
        None => String::new(),
    }
}
