use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::error::{DcfError, OrOverflow};
use crate::time_value::{checked_sum, present_value, present_values};
use crate::types::{with_metadata, ComputationOutput, Money, Percent, Rate};
use crate::DcfResult;

use super::inputs::{
    validate_discount_rate, validate_exit_multiple, DcfAssumptions, FinancialInputs,
    TerminalAssumption, TerminalMethod,
};
use super::projection::{project_normalized, ProjectedYear};
use super::sensitivity::{wacc_growth_grid, SensitivityRequest, SensitivityTable};

/// Terminal value share of EV above which a warning is emitted.
const TERMINAL_SHARE_WARNING: Decimal = dec!(0.75);

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Everything `calculate_dcf` needs for one valuation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DcfInput {
    pub financials: FinancialInputs,
    pub assumptions: DcfAssumptions,
    /// Request a (WACC, terminal growth) grid alongside the point estimate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sensitivity: Option<SensitivityRequest>,
}

/// Output of a single-point valuation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValuationResult {
    /// Year-by-year projections
    pub projected_years: Vec<ProjectedYear>,
    /// Present value of each year's FCFF, aligned with `projected_years`
    pub present_values: Vec<Money>,
    pub terminal_value: Money,
    pub present_value_of_terminal: Money,
    /// Sum of present values of explicit-period FCFFs
    pub present_value_of_stream: Money,
    /// PV(stream) + PV(terminal)
    pub enterprise_value: Money,
    /// EV - net debt - minority interest + investments
    pub equity_value: Money,
    pub per_share_value: Money,
    /// PV(terminal) / EV
    pub terminal_value_share: Rate,
    /// Per-share value relative to `last_price`, when a price is known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub implied_upside: Option<Rate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sensitivity: Option<SensitivityTable>,
}

/// Discounting result shared by the point valuation and every grid cell.
#[derive(Debug, Clone)]
pub(crate) struct Discounted {
    pub present_values: Vec<Money>,
    pub terminal_value: Money,
    pub present_value_of_terminal: Money,
    pub present_value_of_stream: Money,
    pub enterprise_value: Money,
    pub equity_value: Money,
    pub per_share_value: Money,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Run the full pipeline: normalize, project, value and (optionally) build
/// the sensitivity grid.
#[cfg_attr(feature = "tracing", tracing::instrument(level = "debug", skip_all, err))]
pub fn calculate_dcf(input: &DcfInput) -> DcfResult<ComputationOutput<ValuationResult>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let assumptions = &input.assumptions;
    let normalized = assumptions.normalize()?;

    if !assumptions.horizon_is_conventional() {
        warnings.push(format!(
            "Forecast horizon of {} years is outside the conventional 3-15 year range",
            assumptions.forecast_years
        ));
    }

    let projected = project_normalized(&input.financials, &normalized)?;
    let discounted = discount(
        &input.financials,
        &projected,
        normalized.wacc,
        normalized.terminal,
    )?;

    let sensitivity = match input.sensitivity {
        Some(ref request) => {
            let (wacc_values, growth_values) = request.resolve(assumptions)?;
            let table = wacc_growth_grid(
                &input.financials,
                &projected,
                &wacc_values,
                &growth_values,
                base_case(assumptions),
            );
            if table.undefined_cells > 0 {
                warnings.push(format!(
                    "{} of {} sensitivity cells are undefined (WACC must exceed terminal growth)",
                    table.undefined_cells,
                    wacc_values.len() * growth_values.len()
                ));
            }
            Some(table)
        }
        None => None,
    };

    let mut result = assemble(&input.financials, projected, discounted)?;
    result.sensitivity = sensitivity;

    if result.terminal_value_share > TERMINAL_SHARE_WARNING {
        let share = Percent::from_rate(result.terminal_value_share)?;
        warnings.push(format!(
            "Terminal value represents {:.1}% of enterprise value; consider extending the explicit forecast period",
            share.value()
        ));
    }

    let methodology = match normalized.terminal {
        TerminalMethod::Gordon { .. } => "FCFF DCF (WACC-based, Gordon growth terminal)",
        TerminalMethod::ExitMultiple { .. } => "FCFF DCF (WACC-based, exit multiple terminal)",
    };

    let elapsed = start.elapsed().as_micros() as u64;

    Ok(with_metadata(methodology, input, warnings, elapsed, result))
}

/// Value a projected FCFF stream.
///
/// Each year is discounted at `wacc` compounded annually; the terminal value
/// is taken on the final year and discounted over the same horizon. The
/// result carries no sensitivity grid.
#[cfg_attr(feature = "tracing", tracing::instrument(level = "debug", skip(inputs, projected), err))]
pub fn valuate(
    inputs: &FinancialInputs,
    projected: &[ProjectedYear],
    wacc_pct: Percent,
    terminal: &TerminalAssumption,
) -> DcfResult<ValuationResult> {
    let wacc = wacc_pct.to_rate();
    validate_discount_rate(wacc)?;
    let terminal = terminal.normalize()?;

    let discounted = discount(inputs, projected, wacc, terminal)?;
    assemble(inputs, projected.to_vec(), discounted)
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

pub(crate) fn discount(
    inputs: &FinancialInputs,
    projected: &[ProjectedYear],
    wacc: Rate,
    terminal: TerminalMethod,
) -> DcfResult<Discounted> {
    let last = projected.last().ok_or_else(|| {
        DcfError::assumptions("projected_years", "At least one projected year is required")
    })?;
    let horizon = u32::try_from(projected.len())
        .map_err(|_| DcfError::assumptions("projected_years", "Too many projected years"))?;

    // --- Explicit period ---
    let fcffs: Vec<Money> = projected.iter().map(|y| y.fcff).collect();
    let present_values = present_values(&fcffs, wacc)?;
    let present_value_of_stream = checked_sum(&present_values, "present value of FCFF stream")?;

    // --- Terminal value ---
    let terminal_value = terminal_value(last, wacc, terminal)?;
    let present_value_of_terminal = present_value(terminal_value, wacc, horizon)?;

    // --- Equity bridge ---
    let enterprise_value = present_value_of_stream
        .checked_add(present_value_of_terminal)
        .or_overflow("enterprise value")?;
    let equity_value = enterprise_value
        .checked_sub(inputs.net_debt)
        .and_then(|v| v.checked_sub(inputs.minority_interest))
        .and_then(|v| v.checked_add(inputs.investments))
        .or_overflow("equity value")?;

    if inputs.shares_outstanding <= Decimal::ZERO {
        return Err(DcfError::InvalidShareCount(inputs.shares_outstanding));
    }
    let per_share_value = equity_value
        .checked_div(inputs.shares_outstanding)
        .or_overflow("per-share value")?;

    Ok(Discounted {
        present_values,
        terminal_value,
        present_value_of_terminal,
        present_value_of_stream,
        enterprise_value,
        equity_value,
        per_share_value,
    })
}

fn terminal_value(last: &ProjectedYear, wacc: Rate, terminal: TerminalMethod) -> DcfResult<Money> {
    match terminal {
        TerminalMethod::Gordon { growth } => {
            // Checked before dividing: a non-positive spread would flip the sign
            if wacc <= growth {
                return Err(DcfError::InvalidTerminalAssumption { wacc, growth });
            }
            let spread = wacc.checked_sub(growth).or_overflow("WACC - g")?;
            last.fcff
                .checked_mul(Decimal::ONE + growth)
                .and_then(|next| next.checked_div(spread))
                .or_overflow("Gordon terminal value")
        }
        TerminalMethod::ExitMultiple { multiple } => {
            validate_exit_multiple(multiple)?;
            last.ebitda()
                .and_then(|ebitda| ebitda.checked_mul(multiple))
                .or_overflow("exit multiple terminal value")
        }
    }
}

fn assemble(
    inputs: &FinancialInputs,
    projected_years: Vec<ProjectedYear>,
    d: Discounted,
) -> DcfResult<ValuationResult> {
    let terminal_value_share = if d.enterprise_value.is_zero() {
        Decimal::ZERO
    } else {
        d.present_value_of_terminal
            .checked_div(d.enterprise_value)
            .or_overflow("terminal value share")?
    };

    Ok(ValuationResult {
        projected_years,
        present_values: d.present_values,
        terminal_value: d.terminal_value,
        present_value_of_terminal: d.present_value_of_terminal,
        present_value_of_stream: d.present_value_of_stream,
        enterprise_value: d.enterprise_value,
        equity_value: d.equity_value,
        implied_upside: inputs.implied_upside(d.per_share_value),
        per_share_value: d.per_share_value,
        terminal_value_share,
        sensitivity: None,
    })
}

fn base_case(assumptions: &DcfAssumptions) -> (Percent, Option<Percent>) {
    let growth = match assumptions.terminal {
        TerminalAssumption::Gordon { growth_pct } => Some(growth_pct),
        TerminalAssumption::ExitMultiple { .. } => None,
    };
    (assumptions.wacc_pct, growth)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
