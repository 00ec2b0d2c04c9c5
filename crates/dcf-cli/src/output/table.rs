use serde_json::{Map, Value};
use tabled::{builder::Builder, Table};

use super::format::{as_percent, decimal, format_amount, format_value};
use super::result_of;

/// Fields rendered as their own tables rather than in the summary.
const NESTED_FIELDS: [&str; 3] = ["projected_years", "present_values", "sensitivity"];

/// Format output as tables using the tabled crate.
pub fn print_table(value: &Value) {
    let result = result_of(value);

    match result {
        Value::Object(res_map) => {
            print_summary(res_map);
            if let Some(Value::Array(years)) = res_map.get("projected_years") {
                println!();
                print_projection(years, res_map.get("present_values"));
            }
            if let Some(grid @ Value::Object(_)) = res_map.get("sensitivity") {
                println!();
                print_grid(grid);
            }
            if res_map.contains_key("per_share_values") {
                println!();
                print_grid(result);
            }
        }
        other => println!("{}", format_value(other)),
    }

    if let Value::Object(envelope) = value {
        print_footer(envelope);
    }
}

fn print_summary(map: &Map<String, Value>) {
    let mut builder = Builder::default();
    builder.push_record(["Field", "Value"]);
    let is_grid = map.contains_key("per_share_values");
    let mut rows = 0;
    for (key, val) in map {
        if NESTED_FIELDS.contains(&key.as_str()) || (is_grid && is_grid_field(key)) {
            continue;
        }
        builder.push_record([key.as_str(), &summary_value(key, val)]);
        rows += 1;
    }
    if rows > 0 {
        println!("{}", Table::from(builder));
    }
}

fn is_grid_field(key: &str) -> bool {
    matches!(
        key,
        "wacc_pct" | "terminal_growth_pct" | "exit_multiples" | "per_share_values"
    )
}

fn summary_value(key: &str, val: &Value) -> String {
    // Decimals serialize as strings; bare numbers are counts
    if val.is_number() {
        return format_value(val);
    }
    match decimal(val) {
        Some(d) if key.ends_with("_share") || key == "implied_upside" => as_percent(d, 1),
        Some(d) if key.ends_with("_weight") => as_percent(d, 2),
        Some(d) if key.ends_with("_pct") || key.ends_with("_sales") => format!("{}%", d.normalize()),
        Some(d) => format_amount(d, 2),
        None => format_value(val),
    }
}

fn print_projection(years: &[Value], present_values: Option<&Value>) {
    let columns = [
        ("year", "Year"),
        ("revenue", "Revenue"),
        ("ebit", "EBIT"),
        ("nopat", "NOPAT"),
        ("da", "D&A"),
        ("capex", "CapEx"),
        ("delta_nwc", "dNWC"),
        ("fcff", "FCFF"),
    ];
    let pvs = present_values.and_then(Value::as_array);

    let mut header: Vec<&str> = columns.iter().map(|(_, label)| *label).collect();
    if pvs.is_some() {
        header.push("PV(FCFF)");
    }

    let mut builder = Builder::default();
    builder.push_record(header);
    for (i, year) in years.iter().enumerate() {
        let mut row: Vec<String> = columns
            .iter()
            .map(|(field, _)| match (*field, year.get(*field)) {
                ("year", Some(v)) => format_value(v),
                (_, Some(v)) => decimal(v)
                    .map(|d| format_amount(d, 0))
                    .unwrap_or_else(|| format_value(v)),
                (_, None) => String::new(),
            })
            .collect();
        if let Some(pvs) = pvs {
            row.push(
                pvs.get(i)
                    .and_then(decimal)
                    .map(|d| format_amount(d, 0))
                    .unwrap_or_default(),
            );
        }
        builder.push_record(row);
    }
    println!("{}", Table::from(builder));
}

/// Per-share grid with WACC rows. Undefined cells show `N/A`.
fn print_grid(grid: &Value) {
    let axes = (grid.get("terminal_growth_pct"), grid.get("exit_multiples"));
    let (columns, corner, suffix) = match axes {
        (Some(Value::Array(g)), _) => (g, "WACC \\ g", "%"),
        (_, Some(Value::Array(m))) => (m, "WACC \\ multiple", "x"),
        _ => return,
    };
    let (Some(Value::Array(rows)), Some(Value::Array(cells))) =
        (grid.get("wacc_pct"), grid.get("per_share_values"))
    else {
        return;
    };

    let label = |v: &Value| match decimal(v) {
        Some(d) => format!("{}{suffix}", d.normalize()),
        None => format_value(v),
    };

    let mut builder = Builder::default();
    let mut header = vec![corner.to_string()];
    header.extend(columns.iter().map(label));
    builder.push_record(header);

    for (wacc, row) in rows.iter().zip(cells) {
        let wacc_label = decimal(wacc)
            .map(|d| format!("{}%", d.normalize()))
            .unwrap_or_default();
        let mut record = vec![wacc_label];
        if let Value::Array(row) = row {
            record.extend(row.iter().map(|cell| match decimal(cell) {
                Some(d) => format_amount(d, 2),
                None => "N/A".to_string(),
            }));
        }
        builder.push_record(record);
    }
    println!("{}", Table::from(builder));
}

fn print_footer(envelope: &Map<String, Value>) {
    if let Some(Value::Array(warnings)) = envelope.get("warnings") {
        if !warnings.is_empty() {
            println!("\nWarnings:");
            for w in warnings {
                if let Value::String(s) = w {
                    println!("  - {s}");
                }
            }
        }
    }

    if let Some(Value::String(meth)) = envelope.get("methodology") {
        println!("\nMethodology: {meth}");
    }
}
