use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{DcfError, OrOverflow};
use crate::types::{Currency, Money, Multiple, Percent, Rate};
use crate::DcfResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Company-level figures supplied per call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinancialInputs {
    /// Last fiscal year revenue; must be positive
    pub base_revenue: Money,
    /// Total debt minus cash. Negative for a net cash position.
    pub net_debt: Money,
    /// Non-controlling interests, deducted from enterprise value
    #[serde(default)]
    pub minority_interest: Money,
    /// Non-operating investments, added back to enterprise value
    #[serde(default)]
    pub investments: Money,
    /// Diluted shares outstanding
    pub shares_outstanding: Decimal,
    /// Current market price, for comparison only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_price: Option<Money>,
    /// Reporting currency
    #[serde(default)]
    pub currency: Currency,
}

/// Terminal value method, tagged by `method`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum TerminalAssumption {
    /// Gordon growth: TV = FCFF_N * (1 + g) / (WACC - g)
    Gordon { growth_pct: Percent },
    /// Exit multiple on final-year EBITDA (EBIT + D&A)
    ExitMultiple { multiple: Multiple },
}

/// Caller-facing assumptions, in percent units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DcfAssumptions {
    /// Explicit forecast horizon. Conventionally 3 to 15 years.
    pub forecast_years: u32,
    /// Constant annual revenue growth (flat CAGR)
    pub revenue_growth_pct: Percent,
    /// EBIT margin, applied to every year including the terminal year
    pub ebit_margin_pct: Percent,
    /// D&A as a percentage of revenue
    pub da_pct_of_sales: Percent,
    /// Capital expenditure as a percentage of revenue
    pub capex_pct_of_sales: Percent,
    /// Change in net working capital as a percentage of the change in revenue
    pub delta_nwc_pct_of_delta_sales: Percent,
    /// Tax rate on EBIT
    pub tax_rate_pct: Percent,
    /// Discount rate
    pub wacc_pct: Percent,
    pub terminal: TerminalAssumption,
}

/// Terminal method in model units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum TerminalMethod {
    Gordon { growth: Rate },
    ExitMultiple { multiple: Multiple },
}

/// Assumptions in fractional form. Only built by [`DcfAssumptions::normalize`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedAssumptions {
    pub forecast_years: u32,
    pub revenue_growth: Rate,
    pub ebit_margin: Rate,
    pub da_pct_of_sales: Rate,
    pub capex_pct_of_sales: Rate,
    pub delta_nwc_pct_of_delta_sales: Rate,
    pub tax_rate: Rate,
    pub wacc: Rate,
    pub terminal: TerminalMethod,
}

/// Raw record from a market-data fetch. Any field may be absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FetchedFinancials {
    #[serde(default)]
    pub revenue: Option<Money>,
    #[serde(default)]
    pub total_debt: Option<Money>,
    #[serde(default)]
    pub cash: Option<Money>,
    #[serde(default)]
    pub shares_outstanding: Option<Decimal>,
    #[serde(default)]
    pub price: Option<Money>,
    #[serde(default)]
    pub currency: Option<String>,
}

// ---------------------------------------------------------------------------
// Normalization
// ---------------------------------------------------------------------------

impl DcfAssumptions {
    /// Converts every percentage to a fractional rate and checks the
    /// preconditions shared by projection and valuation.
    pub fn normalize(&self) -> DcfResult<NormalizedAssumptions> {
        if self.forecast_years == 0 {
            return Err(DcfError::assumptions(
                "forecast_years",
                "Forecast horizon must be at least one year",
            ));
        }

        let wacc = self.wacc_pct.to_rate();
        validate_discount_rate(wacc)?;

        Ok(NormalizedAssumptions {
            forecast_years: self.forecast_years,
            revenue_growth: self.revenue_growth_pct.to_rate(),
            ebit_margin: self.ebit_margin_pct.to_rate(),
            da_pct_of_sales: self.da_pct_of_sales.to_rate(),
            capex_pct_of_sales: self.capex_pct_of_sales.to_rate(),
            delta_nwc_pct_of_delta_sales: self.delta_nwc_pct_of_delta_sales.to_rate(),
            tax_rate: self.tax_rate_pct.to_rate(),
            wacc,
            terminal: self.terminal.normalize()?,
        })
    }

    /// Whether the horizon falls inside the conventional 3..=15 year band.
    pub fn horizon_is_conventional(&self) -> bool {
        (3..=15).contains(&self.forecast_years)
    }
}

impl TerminalAssumption {
    pub fn normalize(&self) -> DcfResult<TerminalMethod> {
        match *self {
            TerminalAssumption::Gordon { growth_pct } => Ok(TerminalMethod::Gordon {
                growth: growth_pct.to_rate(),
            }),
            TerminalAssumption::ExitMultiple { multiple } => {
                validate_exit_multiple(multiple)?;
                Ok(TerminalMethod::ExitMultiple { multiple })
            }
        }
    }
}

pub(crate) fn validate_discount_rate(wacc: Rate) -> DcfResult<()> {
    if wacc <= -Decimal::ONE {
        return Err(DcfError::assumptions(
            "wacc_pct",
            "WACC must be greater than -100%",
        ));
    }
    Ok(())
}

pub(crate) fn validate_exit_multiple(multiple: Multiple) -> DcfResult<()> {
    if multiple <= Decimal::ZERO {
        return Err(DcfError::assumptions(
            "terminal.multiple",
            "Exit multiple must be positive",
        ));
    }
    Ok(())
}

impl FinancialInputs {
    pub(crate) fn validate_base_revenue(&self) -> DcfResult<()> {
        if self.base_revenue <= Decimal::ZERO {
            return Err(DcfError::InvalidInput {
                field: "base_revenue".into(),
                reason: "Base revenue must be positive".into(),
            });
        }
        Ok(())
    }

    /// Market price implied upside: per-share value / price - 1.
    pub fn implied_upside(&self, per_share_value: Money) -> Option<Rate> {
        let price = self.last_price.filter(|p| *p > Decimal::ZERO)?;
        per_share_value
            .checked_div(price)
            .and_then(|ratio| ratio.checked_sub(Decimal::ONE))
    }
}

// ---------------------------------------------------------------------------
// Fetch boundary
// ---------------------------------------------------------------------------

impl TryFrom<FetchedFinancials> for FinancialInputs {
    type Error = DcfError;

    /// Revenue and share count are required; nothing is imputed. Absent
    /// debt or cash count as zero.
    fn try_from(fetched: FetchedFinancials) -> DcfResult<Self> {
        let base_revenue = fetched.revenue.ok_or_else(|| DcfError::MissingInput {
            field: "revenue".into(),
        })?;
        let shares_outstanding =
            fetched
                .shares_outstanding
                .ok_or_else(|| DcfError::MissingInput {
                    field: "shares_outstanding".into(),
                })?;
        let net_debt = fetched
            .total_debt
            .unwrap_or_default()
            .checked_sub(fetched.cash.unwrap_or_default())
            .or_overflow("net debt")?;

        Ok(FinancialInputs {
            base_revenue,
            net_debt,
            minority_interest: Decimal::ZERO,
            investments: Decimal::ZERO,
            shares_outstanding,
            last_price: fetched.price,
            currency: fetched
                .currency
                .map(Currency::from)
                .unwrap_or_default(),
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
