use rust_decimal::Decimal;
use serde::Serialize;
use std::fs::{self, File};
use std::path::{Path, PathBuf};

use dcf_core::valuation::{FinancialInputs, ValuationResult};

#[derive(Serialize)]
struct Summary<'a> {
    ticker: &'a str,
    currency: String,
    per_share_value: Decimal,
    enterprise_value: Decimal,
    equity_value: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    last_price: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    implied_upside: Option<Decimal>,
}

/// Write the forecast CSV and the summary JSON for `ticker` into `dir`,
/// creating it if needed. Returns the written paths.
pub fn write_all(
    dir: &Path,
    ticker: &str,
    financials: &FinancialInputs,
    result: &ValuationResult,
) -> Result<Vec<PathBuf>, Box<dyn std::error::Error>> {
    fs::create_dir_all(dir)
        .map_err(|e| format!("Failed to create '{}': {}", dir.display(), e))?;

    let forecast = dir.join(format!("{ticker}_forecast.csv"));
    write_forecast(&forecast, result)?;

    let summary = dir.join(format!("{ticker}_summary.json"));
    write_summary(&summary, ticker, financials, result)?;

    Ok(vec![forecast, summary])
}

fn write_forecast(path: &Path, result: &ValuationResult) -> Result<(), Box<dyn std::error::Error>> {
    let mut wtr = csv::Writer::from_path(path)?;
    wtr.write_record(["Year", "Revenue", "EBIT", "FCFF"])?;
    for y in &result.projected_years {
        wtr.write_record([
            y.year.to_string(),
            y.revenue.round_dp(2).to_string(),
            y.ebit.round_dp(2).to_string(),
            y.fcff.round_dp(2).to_string(),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

fn write_summary(
    path: &Path,
    ticker: &str,
    financials: &FinancialInputs,
    result: &ValuationResult,
) -> Result<(), Box<dyn std::error::Error>> {
    let summary = Summary {
        ticker,
        currency: financials.currency.to_string(),
        per_share_value: result.per_share_value,
        enterprise_value: result.enterprise_value,
        equity_value: result.equity_value,
        last_price: financials.last_price,
        implied_upside: result.implied_upside,
    };
    let file = File::create(path)
        .map_err(|e| format!("Failed to create '{}': {}", path.display(), e))?;
    serde_json::to_writer_pretty(file, &summary)?;
    Ok(())
}
