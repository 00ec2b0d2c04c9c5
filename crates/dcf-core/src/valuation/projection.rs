use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::OrOverflow;
use crate::types::Money;
use crate::DcfResult;

use super::inputs::{DcfAssumptions, FinancialInputs, NormalizedAssumptions};

/// One explicit forecast year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectedYear {
    /// 1-based year index
    pub year: u32,
    pub revenue: Money,
    pub ebit: Money,
    pub nopat: Money,
    pub da: Money,
    pub capex: Money,
    pub delta_nwc: Money,
    pub fcff: Money,
}

impl ProjectedYear {
    /// EBIT + D&A, the base for exit-multiple terminal values.
    pub fn ebitda(&self) -> Option<Money> {
        self.ebit.checked_add(self.da)
    }
}

/// Project FCFF for `assumptions.forecast_years` years.
///
/// Revenue compounds at the flat growth rate from `base_revenue`; every other
/// line is a fixed percentage of revenue (or, for working capital, of the
/// change in revenue).
#[cfg_attr(feature = "tracing", tracing::instrument(level = "debug", skip_all, err))]
pub fn project(
    inputs: &FinancialInputs,
    assumptions: &DcfAssumptions,
) -> DcfResult<Vec<ProjectedYear>> {
    let normalized = assumptions.normalize()?;
    project_normalized(inputs, &normalized)
}

/// [`project`] over assumptions that are already in fractional form.
pub fn project_normalized(
    inputs: &FinancialInputs,
    a: &NormalizedAssumptions,
) -> DcfResult<Vec<ProjectedYear>> {
    inputs.validate_base_revenue()?;

    let growth_factor = Decimal::ONE
        .checked_add(a.revenue_growth)
        .or_overflow("1 + revenue growth")?;
    let after_tax = Decimal::ONE
        .checked_sub(a.tax_rate)
        .or_overflow("1 - tax rate")?;

    let mut years = Vec::with_capacity(a.forecast_years as usize);
    let mut prev_revenue = inputs.base_revenue;

    for year in 1..=a.forecast_years {
        let ctx = |line: &str| format!("year {year} {line}");

        let revenue = prev_revenue
            .checked_mul(growth_factor)
            .or_overflow(&ctx("revenue"))?;
        let ebit = revenue
            .checked_mul(a.ebit_margin)
            .or_overflow(&ctx("EBIT"))?;
        let nopat = ebit.checked_mul(after_tax).or_overflow(&ctx("NOPAT"))?;
        let da = revenue
            .checked_mul(a.da_pct_of_sales)
            .or_overflow(&ctx("D&A"))?;
        let capex = revenue
            .checked_mul(a.capex_pct_of_sales)
            .or_overflow(&ctx("capex"))?;
        let delta_nwc = revenue
            .checked_sub(prev_revenue)
            .and_then(|delta| delta.checked_mul(a.delta_nwc_pct_of_delta_sales))
            .or_overflow(&ctx("change in NWC"))?;

        // FCFF = NOPAT + D&A - CapEx - Delta NWC
        let fcff = nopat
            .checked_add(da)
            .and_then(|v| v.checked_sub(capex))
            .and_then(|v| v.checked_sub(delta_nwc))
            .or_overflow(&ctx("FCFF"))?;

        years.push(ProjectedYear {
            year,
            revenue,
            ebit,
            nopat,
            da,
            capex,
            delta_nwc,
            fcff,
        });
        prev_revenue = revenue;
    }

    Ok(years)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DcfError;
    use crate::types::{Currency, Percent};
    use crate::valuation::inputs::TerminalAssumption;
    use rust_decimal_macros::dec;

    fn inputs() -> FinancialInputs {
        FinancialInputs {
            base_revenue: dec!(1000),
            net_debt: dec!(200),
            minority_interest: dec!(0),
            investments: dec!(0),
            shares_outstanding: dec!(100),
            last_price: None,
            currency: Currency::USD,
        }
    }

    fn assumptions() -> DcfAssumptions {
        DcfAssumptions {
            forecast_years: 3,
            revenue_growth_pct: Percent::new(dec!(10)),
            ebit_margin_pct: Percent::new(dec!(20)),
            da_pct_of_sales: Percent::new(dec!(4)),
            capex_pct_of_sales: Percent::new(dec!(5)),
            delta_nwc_pct_of_delta_sales: Percent::new(dec!(10)),
            tax_rate_pct: Percent::new(dec!(25)),
            wacc_pct: Percent::new(dec!(9)),
            terminal: TerminalAssumption::Gordon {
                growth_pct: Percent::new(dec!(2)),
            },
        }
    }

    #[test]
    fn test_first_year_lines() {
        let years = project(&inputs(), &assumptions()).unwrap();
        let y1 = &years[0];

        assert_eq!(y1.year, 1);
        assert_eq!(y1.revenue, dec!(1100));
        assert_eq!(y1.ebit, dec!(220));
        assert_eq!(y1.nopat, dec!(165));
        assert_eq!(y1.da, dec!(44));
        assert_eq!(y1.capex, dec!(55));
        // Delta revenue 100 * 10%
        assert_eq!(y1.delta_nwc, dec!(10));
        // 165 + 44 - 55 - 10
        assert_eq!(y1.fcff, dec!(144));
    }

    #[test]
    fn test_revenue_compounds_from_prior_year() {
        let years = project(&inputs(), &assumptions()).unwrap();
        assert_eq!(years.len(), 3);
        assert_eq!(years[1].revenue, dec!(1210));
        assert_eq!(years[2].revenue, dec!(1331));
        assert_eq!(years[2].delta_nwc, dec!(12.1));
    }

    #[test]
    fn test_zero_horizon_fails() {
        let mut a = assumptions();
        a.forecast_years = 0;
        assert!(matches!(
            project(&inputs(), &a),
            Err(DcfError::InvalidAssumptions { .. })
        ));
    }

    #[test]
    fn test_non_positive_base_revenue_fails() {
        let mut i = inputs();
        i.base_revenue = Decimal::ZERO;
        assert!(matches!(
            project(&i, &assumptions()),
            Err(DcfError::InvalidInput { .. })
        ));
    }

    #[test]
    fn test_negative_growth_shrinks_revenue_and_releases_nwc() {
        let mut a = assumptions();
        a.revenue_growth_pct = Percent::new(dec!(-10));
        let years = project(&inputs(), &a).unwrap();
        assert_eq!(years[0].revenue, dec!(900));
        // Shrinking sales release working capital
        assert_eq!(years[0].delta_nwc, dec!(-10));
    }

    #[test]
    fn test_extreme_growth_reports_overflow() {
        let mut a = assumptions();
        a.forecast_years = 15;
        a.revenue_growth_pct = Percent::new(dec!(1000000));
        let mut i = inputs();
        i.base_revenue = dec!(1000000000000);
        assert!(matches!(
            project(&i, &a),
            Err(DcfError::NumericOverflow { .. })
        ));
    }

    #[test]
    fn test_ebitda_helper() {
        let years = project(&inputs(), &assumptions()).unwrap();
        assert_eq!(years[0].ebitda(), Some(dec!(264)));
    }
}
