use serde_json::Value;
use std::io;

use super::format::format_value;
use super::result_of;

const PROJECTION_COLUMNS: [&str; 8] = [
    "year", "revenue", "ebit", "nopat", "da", "capex", "delta_nwc", "fcff",
];

/// Write output as CSV to stdout: projection rows when present, the grid
/// for sensitivity output, otherwise `field,value` pairs.
pub fn print_csv(value: &Value) {
    let stdout = io::stdout();
    let mut wtr = csv::Writer::from_writer(stdout.lock());
    if let Err(e) = write_csv(&mut wtr, result_of(value)) {
        eprintln!("CSV write error: {e}");
    }
    let _ = wtr.flush();
}

fn write_csv<W: io::Write>(wtr: &mut csv::Writer<W>, result: &Value) -> csv::Result<()> {
    let Value::Object(map) = result else {
        return wtr.write_record([format_csv_value(result)]);
    };

    if let Some(Value::Array(years)) = map.get("projected_years") {
        return write_projection(wtr, years);
    }
    if map.contains_key("per_share_values") {
        return write_grid(wtr, result);
    }

    wtr.write_record(["field", "value"])?;
    for (key, val) in map {
        wtr.write_record([key.as_str(), &format_csv_value(val)])?;
    }
    Ok(())
}

fn write_projection<W: io::Write>(wtr: &mut csv::Writer<W>, years: &[Value]) -> csv::Result<()> {
    wtr.write_record(PROJECTION_COLUMNS)?;
    for year in years {
        let row: Vec<String> = PROJECTION_COLUMNS
            .iter()
            .map(|c| year.get(*c).map(format_csv_value).unwrap_or_default())
            .collect();
        wtr.write_record(&row)?;
    }
    Ok(())
}

/// Long format: one row per cell. Undefined cells have an empty value.
fn write_grid<W: io::Write>(wtr: &mut csv::Writer<W>, grid: &Value) -> csv::Result<()> {
    let (column_name, columns) = match (grid.get("terminal_growth_pct"), grid.get("exit_multiples")) {
        (Some(Value::Array(g)), _) => ("terminal_growth_pct", g),
        (_, Some(Value::Array(m))) => ("exit_multiple", m),
        _ => return Ok(()),
    };
    let (Some(Value::Array(rows)), Some(Value::Array(cells))) =
        (grid.get("wacc_pct"), grid.get("per_share_values"))
    else {
        return Ok(());
    };

    wtr.write_record(["wacc_pct", column_name, "per_share_value"])?;
    for (wacc, row) in rows.iter().zip(cells) {
        let Value::Array(row) = row else { continue };
        for (col, cell) in columns.iter().zip(row) {
            wtr.write_record([
                format_csv_value(wacc),
                format_csv_value(col),
                format_csv_value(cell),
            ])?;
        }
    }
    Ok(())
}

fn format_csv_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        other => format_value(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn render(value: &Value) -> String {
        let mut wtr = csv::Writer::from_writer(Vec::new());
        write_csv(&mut wtr, value).unwrap();
        String::from_utf8(wtr.into_inner().unwrap()).unwrap()
    }

    #[test]
    fn grid_rows_leave_undefined_cells_empty() {
        let grid = json!({
            "wacc_pct": ["2", "8"],
            "terminal_growth_pct": ["2.5"],
            "per_share_values": [[null], ["41.5"]],
            "base_case_position": null,
            "undefined_cells": 1
        });
        assert_eq!(
            render(&grid),
            "wacc_pct,terminal_growth_pct,per_share_value\n2,2.5,\n8,2.5,41.5\n"
        );
    }

    #[test]
    fn projection_rows_in_column_order() {
        let result = json!({
            "projected_years": [{
                "year": 1, "revenue": "1100", "ebit": "220", "nopat": "165",
                "da": "44", "capex": "55", "delta_nwc": "10", "fcff": "144"
            }]
        });
        let text = render(&result);
        assert_eq!(
            text,
            "year,revenue,ebit,nopat,da,capex,delta_nwc,fcff\n1,1100,220,165,44,55,10,144\n"
        );
    }
}
