//! Advisory assumption values.
//!
//! Two sources feed suggestions: heuristics over a company's historical
//! statements, and an optional narrative analysis that proposes growth,
//! margin and capex figures. Both only ever produce a new
//! [`DcfAssumptions`]; callers decide whether to use it.

use rust_decimal::{Decimal, MathematicalOps};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::{DcfError, OrOverflow};
use crate::types::{Money, Percent, Rate};
use crate::valuation::inputs::DcfAssumptions;
use crate::DcfResult;

const MAX_DA_PCT: Decimal = dec!(0.20);
const MAX_CAPEX_PCT: Decimal = dec!(0.20);
const MIN_DELTA_NWC_PCT: Decimal = dec!(-0.05);
const MAX_DELTA_NWC_PCT: Decimal = dec!(0.15);

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Historical annual series, oldest first. Series are aligned by index with
/// `revenue`; shorter series are matched on their overlap.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HistoricalFinancials {
    pub revenue: Vec<Money>,
    #[serde(default)]
    pub ebit: Vec<Money>,
    #[serde(default)]
    pub depreciation: Vec<Money>,
    /// Capital expenditure as a positive outflow
    #[serde(default)]
    pub capex: Vec<Money>,
    /// Net working capital balances
    #[serde(default)]
    pub net_working_capital: Vec<Money>,
}

/// Assumptions derived from history, in percent units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuggestedAssumptions {
    pub revenue_growth_pct: Percent,
    pub ebit_margin_pct: Percent,
    pub da_pct_of_sales: Percent,
    pub capex_pct_of_sales: Percent,
    pub delta_nwc_pct_of_delta_sales: Percent,
}

/// Figures proposed by a narrative analysis of filings. Untyped floats from
/// an external source; each is checked when merged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NarrativeSuggestions {
    #[serde(default)]
    pub revenue_growth_pct: Option<f64>,
    #[serde(default)]
    pub ebit_margin_pct: Option<f64>,
    #[serde(default)]
    pub capex_pct_of_sales: Option<f64>,
}

// ---------------------------------------------------------------------------
// Heuristics
// ---------------------------------------------------------------------------

/// Geometric CAGR over the positive entries of `revenues`. Zero when fewer
/// than two positive entries exist.
pub fn revenue_cagr(revenues: &[Money]) -> DcfResult<Rate> {
    let positive: Vec<Money> = revenues.iter().copied().filter(|r| *r > Decimal::ZERO).collect();
    let (first, last) = match (positive.first(), positive.last()) {
        (Some(first), Some(last)) if positive.len() >= 2 => (*first, *last),
        _ => return Ok(Decimal::ZERO),
    };
    let years = Decimal::from(positive.len() - 1);
    let ratio = last.checked_div(first).or_overflow("revenue CAGR ratio")?;
    let root = ratio
        .checked_powd(Decimal::ONE / years)
        .or_overflow("revenue CAGR root")?;
    Ok(root - Decimal::ONE)
}

/// Mean of `series[i] / revenues[i]`, skipping zero-revenue years. Zero when
/// nothing overlaps.
pub fn average_ratio(series: &[Money], revenues: &[Money]) -> DcfResult<Rate> {
    let ratios = series
        .iter()
        .zip(revenues)
        .filter(|(_, rev)| !rev.is_zero())
        .map(|(value, rev)| value.checked_div(*rev).or_overflow("average ratio"))
        .collect::<DcfResult<Vec<Rate>>>()?;
    mean(&ratios)
}

/// Mean ratio of the change in working capital to the change in revenue.
fn average_delta_ratio(nwc: &[Money], revenues: &[Money]) -> DcfResult<Rate> {
    let deltas = |s: &[Money]| -> DcfResult<Vec<Money>> {
        s.windows(2)
            .map(|w| w[1].checked_sub(w[0]).or_overflow("year-over-year delta"))
            .collect()
    };
    average_ratio(&deltas(nwc)?, &deltas(revenues)?)
}

fn mean(values: &[Rate]) -> DcfResult<Rate> {
    if values.is_empty() {
        return Ok(Decimal::ZERO);
    }
    let total = values
        .iter()
        .try_fold(Decimal::ZERO, |acc, v| acc.checked_add(*v))
        .or_overflow("mean")?;
    Ok(total / Decimal::from(values.len()))
}

fn clamp(value: Rate, low: Rate, high: Rate) -> Rate {
    value.max(low).min(high)
}

/// Derive default assumptions from history.
///
/// D&A and capex are clamped to 0-20% of sales and capex is floored at D&A;
/// the working-capital ratio is clamped to -5%..15%. Growth and margin are
/// taken as observed.
pub fn suggest_assumptions(history: &HistoricalFinancials) -> DcfResult<SuggestedAssumptions> {
    if history.revenue.is_empty() {
        return Err(DcfError::MissingInput {
            field: "revenue".into(),
        });
    }
    let revenue = &history.revenue;

    let growth = revenue_cagr(revenue)?;
    let ebit_margin = average_ratio(&history.ebit, revenue)?;
    let da = clamp(average_ratio(&history.depreciation, revenue)?, Decimal::ZERO, MAX_DA_PCT);
    let capex = clamp(average_ratio(&history.capex, revenue)?, Decimal::ZERO, MAX_CAPEX_PCT).max(da);
    let delta_nwc = clamp(
        average_delta_ratio(&history.net_working_capital, revenue)?,
        MIN_DELTA_NWC_PCT,
        MAX_DELTA_NWC_PCT,
    );

    Ok(SuggestedAssumptions {
        revenue_growth_pct: Percent::from_rate(growth)?,
        ebit_margin_pct: Percent::from_rate(ebit_margin)?,
        da_pct_of_sales: Percent::from_rate(da)?,
        capex_pct_of_sales: Percent::from_rate(capex)?,
        delta_nwc_pct_of_delta_sales: Percent::from_rate(delta_nwc)?,
    })
}

// ---------------------------------------------------------------------------
// Merging
// ---------------------------------------------------------------------------

impl SuggestedAssumptions {
    /// `base` with the operating assumptions replaced by the suggestions.
    pub fn apply_to(&self, base: &DcfAssumptions) -> DcfAssumptions {
        DcfAssumptions {
            revenue_growth_pct: self.revenue_growth_pct,
            ebit_margin_pct: self.ebit_margin_pct,
            da_pct_of_sales: self.da_pct_of_sales,
            capex_pct_of_sales: self.capex_pct_of_sales,
            delta_nwc_pct_of_delta_sales: self.delta_nwc_pct_of_delta_sales,
            ..base.clone()
        }
    }
}

impl NarrativeSuggestions {
    /// `base` with every present suggestion merged in. Fails on the first
    /// non-finite figure.
    pub fn apply_to(&self, base: &DcfAssumptions) -> DcfResult<DcfAssumptions> {
        let pick = |field: &str, suggested: Option<f64>, current: Percent| match suggested {
            Some(value) => Percent::from_f64(field, value),
            None => Ok(current),
        };

        Ok(DcfAssumptions {
            revenue_growth_pct: pick(
                "revenue_growth_pct",
                self.revenue_growth_pct,
                base.revenue_growth_pct,
            )?,
            ebit_margin_pct: pick("ebit_margin_pct", self.ebit_margin_pct, base.ebit_margin_pct)?,
            capex_pct_of_sales: pick(
                "capex_pct_of_sales",
                self.capex_pct_of_sales,
                base.capex_pct_of_sales,
            )?,
            ..base.clone()
        })
    }
}
