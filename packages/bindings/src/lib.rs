use napi::Result as NapiResult;
use napi_derive::napi;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use dcf_core::suggestions::{
    suggest_assumptions as suggest, HistoricalFinancials, NarrativeSuggestions,
    SuggestedAssumptions,
};
use dcf_core::valuation::{
    exit_multiple_sensitivity, project, sensitivity, DcfAssumptions, FinancialInputs,
    ProjectedYear, SensitivityRequest,
};
use dcf_core::Percent;

/// Convert any Display error into a napi::Error.
fn to_napi_error(e: impl std::fmt::Display) -> napi::Error {
    napi::Error::from_reason(e.to_string())
}

#[derive(Deserialize)]
struct ModelInput {
    financials: FinancialInputs,
    assumptions: DcfAssumptions,
}

#[derive(Deserialize)]
struct GridInput {
    financials: FinancialInputs,
    assumptions: DcfAssumptions,
    #[serde(default)]
    wacc_pct: Vec<Percent>,
    #[serde(default)]
    terminal_growth_pct: Vec<Percent>,
    /// When present, the grid runs over exit multiples instead of growth
    #[serde(default)]
    exit_multiples: Option<Vec<Decimal>>,
}

#[derive(Deserialize)]
struct SuggestInput {
    history: HistoricalFinancials,
    #[serde(default)]
    assumptions: Option<DcfAssumptions>,
    #[serde(default)]
    narrative: Option<NarrativeSuggestions>,
}

#[derive(Serialize)]
struct SuggestOutput {
    suggested: SuggestedAssumptions,
    #[serde(skip_serializing_if = "Option::is_none")]
    assumptions: Option<DcfAssumptions>,
}

#[derive(Serialize)]
struct ProjectionOutput {
    projected_years: Vec<ProjectedYear>,
}

// ---------------------------------------------------------------------------
// Valuation
// ---------------------------------------------------------------------------

#[napi]
pub fn compute_dcf(input_json: String) -> NapiResult<String> {
    let input: dcf_core::valuation::DcfInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = dcf_core::valuation::calculate_dcf(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn project_cash_flows(input_json: String) -> NapiResult<String> {
    let input: ModelInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let projected_years = project(&input.financials, &input.assumptions).map_err(to_napi_error)?;
    serde_json::to_string(&ProjectionOutput { projected_years }).map_err(to_napi_error)
}

#[napi]
pub fn sensitivity_grid(input_json: String) -> NapiResult<String> {
    let input: GridInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let request = SensitivityRequest {
        wacc_pct: input.wacc_pct,
        terminal_growth_pct: input.terminal_growth_pct,
    };
    let (wacc, growth) = request.resolve(&input.assumptions).map_err(to_napi_error)?;

    match input.exit_multiples {
        Some(multiples) => {
            let table =
                exit_multiple_sensitivity(&input.financials, &input.assumptions, &wacc, &multiples)
                    .map_err(to_napi_error)?;
            serde_json::to_string(&table).map_err(to_napi_error)
        }
        None => {
            let table = sensitivity(&input.financials, &input.assumptions, &wacc, &growth)
                .map_err(to_napi_error)?;
            serde_json::to_string(&table).map_err(to_napi_error)
        }
    }
}

#[napi]
pub fn calculate_wacc(input_json: String) -> NapiResult<String> {
    let input: dcf_core::valuation::wacc::WaccInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = dcf_core::valuation::wacc::calculate_wacc(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Suggestions
// ---------------------------------------------------------------------------

#[napi]
pub fn suggest_assumptions(input_json: String) -> NapiResult<String> {
    let input: SuggestInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let suggested = suggest(&input.history).map_err(to_napi_error)?;

    let assumptions = match (input.assumptions, input.narrative) {
        (Some(base), narrative) => {
            let merged = suggested.apply_to(&base);
            match narrative {
                Some(n) => Some(n.apply_to(&merged).map_err(to_napi_error)?),
                None => Some(merged),
            }
        }
        (None, Some(_)) => {
            return Err(to_napi_error(
                "narrative suggestions require base assumptions to merge into",
            ))
        }
        (None, None) => None,
    };

    serde_json::to_string(&SuggestOutput {
        suggested,
        assumptions,
    })
    .map_err(to_napi_error)
}
