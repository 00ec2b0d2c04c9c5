use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::error::{DcfError, OrOverflow};
use crate::types::{with_metadata, ComputationOutput, Money, Percent, Rate};
use crate::DcfResult;

/// Input parameters for a CAPM build-up of the discount rate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WaccInput {
    /// Risk-free rate (e.g. 10-year government bond yield)
    pub risk_free_pct: Percent,
    /// Levered equity beta
    pub beta: Decimal,
    /// Market risk premium
    pub market_risk_premium_pct: Percent,
    /// Small-cap premium, added to the market risk premium before beta
    #[serde(default)]
    pub size_premium_pct: Percent,
    /// Pre-tax cost of debt
    pub cost_of_debt_pct: Percent,
    /// Marginal tax rate for the debt shield
    pub tax_rate_pct: Percent,
    /// Market value of equity
    pub equity_value: Money,
    /// Market value of debt
    pub debt_value: Money,
}

/// Output of the WACC calculation, in percent so it can feed
/// `DcfAssumptions::wacc_pct` directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaccOutput {
    pub wacc_pct: Percent,
    pub cost_of_equity_pct: Percent,
    pub after_tax_cost_of_debt_pct: Percent,
    pub equity_weight: Rate,
    pub debt_weight: Rate,
}

/// Weighted average cost of capital.
///
/// Ke = Rf + Beta * (MRP + size premium)
/// Kd_at = Kd * (1 - t)
/// WACC = E/(D+E) * Ke + D/(D+E) * Kd_at
///
/// With no capital values at all the WACC falls back to the cost of equity.
pub fn calculate_wacc(input: &WaccInput) -> DcfResult<ComputationOutput<WaccOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    validate_wacc_input(input)?;

    let rf = input.risk_free_pct.to_rate();
    let premium = input
        .market_risk_premium_pct
        .to_rate()
        .checked_add(input.size_premium_pct.to_rate())
        .or_overflow("equity premium")?;
    let cost_of_equity = input
        .beta
        .checked_mul(premium)
        .and_then(|p| p.checked_add(rf))
        .or_overflow("cost of equity")?;

    let tax_rate = input.tax_rate_pct.to_rate();
    let after_tax_cost_of_debt = input
        .cost_of_debt_pct
        .to_rate()
        .checked_mul(Decimal::ONE - tax_rate)
        .or_overflow("after-tax cost of debt")?;

    let total_capital = input
        .equity_value
        .checked_add(input.debt_value)
        .or_overflow("total capital")?;
    let (equity_weight, debt_weight) = if total_capital.is_zero() {
        warnings.push("No capital structure supplied; WACC equals the cost of equity".into());
        (Decimal::ONE, Decimal::ZERO)
    } else {
        let we = input
            .equity_value
            .checked_div(total_capital)
            .or_overflow("equity weight")?;
        (we, Decimal::ONE - we)
    };

    let wacc = cost_of_equity
        .checked_mul(equity_weight)
        .zip(after_tax_cost_of_debt.checked_mul(debt_weight))
        .and_then(|(e, d)| e.checked_add(d))
        .or_overflow("WACC")?;

    // --- Reasonableness warnings ---
    if input.beta > dec!(3.0) {
        warnings.push(format!(
            "High beta ({}): verify market data; betas above 3.0 are unusual",
            input.beta
        ));
    }
    if wacc > dec!(0.20) {
        warnings.push(format!(
            "WACC of {} exceeds 20%; appropriate for high-risk situations only",
            Percent::from_rate(wacc)?
        ));
    }

    let output = WaccOutput {
        wacc_pct: Percent::from_rate(wacc)?,
        cost_of_equity_pct: Percent::from_rate(cost_of_equity)?,
        after_tax_cost_of_debt_pct: Percent::from_rate(after_tax_cost_of_debt)?,
        equity_weight,
        debt_weight,
    };

    let elapsed = start.elapsed().as_micros() as u64;

    Ok(with_metadata(
        "WACC via CAPM build-up",
        input,
        warnings,
        elapsed,
        output,
    ))
}

fn validate_wacc_input(input: &WaccInput) -> DcfResult<()> {
    let invalid = |field: &str, reason: &str| DcfError::InvalidInput {
        field: field.into(),
        reason: reason.into(),
    };

    if input.risk_free_pct.value() < Decimal::ZERO {
        return Err(invalid("risk_free_pct", "Risk-free rate cannot be negative"));
    }
    if input.market_risk_premium_pct.value() < Decimal::ZERO {
        return Err(invalid(
            "market_risk_premium_pct",
            "Market risk premium cannot be negative",
        ));
    }
    if input.beta <= Decimal::ZERO {
        return Err(invalid("beta", "Beta must be positive"));
    }
    if input.cost_of_debt_pct.value() < Decimal::ZERO {
        return Err(invalid("cost_of_debt_pct", "Cost of debt cannot be negative"));
    }
    let tax = input.tax_rate_pct.value();
    if tax < Decimal::ZERO || tax > dec!(100) {
        return Err(invalid("tax_rate_pct", "Tax rate must be between 0 and 100%"));
    }
    if input.equity_value < Decimal::ZERO || input.debt_value < Decimal::ZERO {
        return Err(invalid(
            "equity_value / debt_value",
            "Capital values cannot be negative",
        ));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
