use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

use crate::error::{DcfError, OrOverflow};
use crate::types::{Money, Multiple, Percent, Rate};
use crate::DcfResult;

use super::dcf::discount;
use super::inputs::{
    validate_discount_rate, DcfAssumptions, FinancialInputs, TerminalAssumption, TerminalMethod,
};
use super::projection::{project_normalized, ProjectedYear};

/// Upper bound on the number of points a single sweep may generate.
const MAX_SWEEP_POINTS: usize = 101;

/// WACC 6% to 12% in 0.5% steps.
pub const DEFAULT_WACC_SWEEP: Sweep = Sweep {
    min: Percent::new(dec!(6)),
    max: Percent::new(dec!(12)),
    step: Percent::new(dec!(0.5)),
};

/// Terminal growth 0% to 2.5% in 0.25% steps.
pub const DEFAULT_GROWTH_SWEEP: Sweep = Sweep {
    min: Percent::new(dec!(0)),
    max: Percent::new(dec!(2.5)),
    step: Percent::new(dec!(0.25)),
};

/// Exit multiples 6x to 14x.
pub const DEFAULT_EXIT_MULTIPLES: [Multiple; 9] = [
    dec!(6),
    dec!(7),
    dec!(8),
    dec!(9),
    dec!(10),
    dec!(11),
    dec!(12),
    dec!(13),
    dec!(14),
];

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// An inclusive range of percentages swept at a fixed step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sweep {
    pub min: Percent,
    pub max: Percent,
    pub step: Percent,
}

/// Grid axes requested alongside a point valuation. Empty axes are filled
/// with a 5-point sweep centred on the base case.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SensitivityRequest {
    #[serde(default)]
    pub wacc_pct: Vec<Percent>,
    #[serde(default)]
    pub terminal_growth_pct: Vec<Percent>,
}

/// Per-share value over (WACC, terminal growth).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensitivityTable {
    /// Row axis
    pub wacc_pct: Vec<Percent>,
    /// Column axis
    pub terminal_growth_pct: Vec<Percent>,
    /// `per_share_values[i][j]` at `wacc_pct[i]`, `terminal_growth_pct[j]`.
    /// `None` where the cell is undefined (WACC <= g).
    pub per_share_values: Vec<Vec<Option<Money>>>,
    /// Position of the base assumptions in the grid, if they lie on it
    pub base_case_position: Option<(usize, usize)>,
    pub undefined_cells: usize,
}

/// Per-share value over (WACC, exit multiple).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExitMultipleTable {
    pub wacc_pct: Vec<Percent>,
    pub exit_multiples: Vec<Multiple>,
    pub per_share_values: Vec<Vec<Option<Money>>>,
    pub undefined_cells: usize,
}

// ---------------------------------------------------------------------------
// Sweeps
// ---------------------------------------------------------------------------

impl Sweep {
    /// `steps_each_side` points below and above `base`.
    pub fn centered(base: Percent, step: Percent, steps_each_side: u32) -> DcfResult<Sweep> {
        let offset = step
            .value()
            .checked_mul(Decimal::from(steps_each_side))
            .or_overflow("sweep bounds")?;
        let min = base.value().checked_sub(offset).or_overflow("sweep bounds")?;
        let max = base.value().checked_add(offset).or_overflow("sweep bounds")?;
        Ok(Sweep {
            min: Percent::new(min),
            max: Percent::new(max),
            step,
        })
    }

    /// Ordered values from `min` to `max`. `max` is always included.
    pub fn values(&self) -> DcfResult<Vec<Percent>> {
        let (min, max, step) = (self.min.value(), self.max.value(), self.step.value());
        if step <= Decimal::ZERO {
            return Err(DcfError::assumptions("sweep.step", "Step must be positive"));
        }
        if min > max {
            return Err(DcfError::assumptions("sweep", "Min must be <= max"));
        }

        let mut values = Vec::new();
        let mut current = min;
        while current <= max {
            if values.len() == MAX_SWEEP_POINTS {
                return Err(DcfError::assumptions(
                    "sweep",
                    format!("Sweep would exceed {MAX_SWEEP_POINTS} points"),
                ));
            }
            values.push(Percent::new(current.normalize()));
            // An overflowing step is past any representable max
            match current.checked_add(step) {
                Some(next) => current = next,
                None => break,
            }
        }
        // Ensure max is included if step doesn't land exactly on it
        if let Some(last) = values.last() {
            if last.value() < max {
                values.push(Percent::new(max.normalize()));
            }
        }

        Ok(values)
    }
}

impl SensitivityRequest {
    /// Concrete grid axes for `assumptions`.
    pub fn resolve(&self, assumptions: &DcfAssumptions) -> DcfResult<(Vec<Percent>, Vec<Percent>)> {
        let wacc = if self.wacc_pct.is_empty() {
            Sweep::centered(assumptions.wacc_pct, Percent::new(dec!(1)), 2)?.values()?
        } else {
            self.wacc_pct.clone()
        };
        let growth = if !self.terminal_growth_pct.is_empty() {
            self.terminal_growth_pct.clone()
        } else {
            match assumptions.terminal {
                TerminalAssumption::Gordon { growth_pct } => {
                    Sweep::centered(growth_pct, Percent::new(dec!(0.5)), 2)?.values()?
                }
                TerminalAssumption::ExitMultiple { .. } => DEFAULT_GROWTH_SWEEP.values()?,
            }
        };
        Ok((wacc, growth))
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Per-share value for every (WACC, terminal growth) pair, all other
/// assumptions held at their base values.
///
/// Cells where the valuation is undefined are `None` and the grid carries on.
/// Only failures shared by every cell (invalid base assumptions, a failed
/// projection) fail the call.
#[cfg_attr(
    feature = "tracing",
    tracing::instrument(level = "debug", skip(inputs, assumptions), err)
)]
pub fn sensitivity(
    inputs: &FinancialInputs,
    assumptions: &DcfAssumptions,
    wacc_range: &[Percent],
    growth_range: &[Percent],
) -> DcfResult<SensitivityTable> {
    let normalized = assumptions.normalize()?;
    let projected = project_normalized(inputs, &normalized)?;
    let base = match assumptions.terminal {
        TerminalAssumption::Gordon { growth_pct } => (assumptions.wacc_pct, Some(growth_pct)),
        TerminalAssumption::ExitMultiple { .. } => (assumptions.wacc_pct, None),
    };
    Ok(wacc_growth_grid(inputs, &projected, wacc_range, growth_range, base))
}

/// Per-share value for every (WACC, exit multiple) pair.
pub fn exit_multiple_sensitivity(
    inputs: &FinancialInputs,
    assumptions: &DcfAssumptions,
    wacc_range: &[Percent],
    multiples: &[Multiple],
) -> DcfResult<ExitMultipleTable> {
    let normalized = assumptions.normalize()?;
    let projected = project_normalized(inputs, &normalized)?;

    let (per_share_values, undefined_cells) =
        evaluate_grid(inputs, &projected, wacc_range, multiples, |multiple| {
            TerminalMethod::ExitMultiple { multiple }
        });

    Ok(ExitMultipleTable {
        wacc_pct: wacc_range.to_vec(),
        exit_multiples: multiples.to_vec(),
        per_share_values,
        undefined_cells,
    })
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

pub(crate) fn wacc_growth_grid(
    inputs: &FinancialInputs,
    projected: &[ProjectedYear],
    wacc_range: &[Percent],
    growth_range: &[Percent],
    base: (Percent, Option<Percent>),
) -> SensitivityTable {
    let growth_rates: Vec<Rate> = growth_range.iter().map(|g| g.to_rate()).collect();
    let (per_share_values, undefined_cells) =
        evaluate_grid(inputs, projected, wacc_range, &growth_rates, |growth| {
            TerminalMethod::Gordon { growth }
        });

    let (base_wacc, base_growth) = base;
    let base_case_position = base_growth.and_then(|g| {
        let row = wacc_range.iter().position(|w| *w == base_wacc)?;
        let col = growth_range.iter().position(|x| *x == g)?;
        Some((row, col))
    });

    SensitivityTable {
        wacc_pct: wacc_range.to_vec(),
        terminal_growth_pct: growth_range.to_vec(),
        per_share_values,
        base_case_position,
        undefined_cells,
    }
}

/// Evaluates each cell independently; a failed cell becomes `None`.
fn evaluate_grid<C, F>(
    inputs: &FinancialInputs,
    projected: &[ProjectedYear],
    wacc_range: &[Percent],
    columns: &[C],
    terminal_for: F,
) -> (Vec<Vec<Option<Money>>>, usize)
where
    C: Copy + Debug,
    F: Fn(C) -> TerminalMethod,
{
    let mut undefined = 0;
    let matrix = wacc_range
        .iter()
        .map(|wacc_pct| {
            let wacc = wacc_pct.to_rate();
            columns
                .iter()
                .map(|column| {
                    let cell = validate_discount_rate(wacc)
                        .and_then(|_| discount(inputs, projected, wacc, terminal_for(*column)));
                    match cell {
                        Ok(d) => Some(d.per_share_value),
                        Err(_e) => {
                            #[cfg(feature = "tracing")]
                            tracing::debug!(wacc = %wacc_pct, column = ?column, error = %_e, "sensitivity cell undefined");
                            undefined += 1;
                            None
                        }
                    }
                })
                .collect()
        })
        .collect();
    (matrix, undefined)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Currency;
    use pretty_assertions::assert_eq;

    fn pct(v: Decimal) -> Percent {
        Percent::new(v)
    }

    fn sample_inputs() -> FinancialInputs {
        FinancialInputs {
            base_revenue: dec!(1000),
            net_debt: dec!(100),
            minority_interest: dec!(0),
            investments: dec!(0),
            shares_outstanding: dec!(50),
            last_price: None,
            currency: Currency::EUR,
        }
    }

    fn sample_assumptions() -> DcfAssumptions {
        DcfAssumptions {
            forecast_years: 5,
            revenue_growth_pct: pct(dec!(6)),
            ebit_margin_pct: pct(dec!(18)),
            da_pct_of_sales: pct(dec!(3)),
            capex_pct_of_sales: pct(dec!(4)),
            delta_nwc_pct_of_delta_sales: pct(dec!(5)),
            tax_rate_pct: pct(dec!(21)),
            wacc_pct: pct(dec!(9)),
            terminal: TerminalAssumption::Gordon {
                growth_pct: pct(dec!(2)),
            },
        }
    }

    #[test]
    fn test_sweep_values_inclusive() {
        let values = DEFAULT_WACC_SWEEP.values().unwrap();
        assert_eq!(values.len(), 13);
        assert_eq!(values.first(), Some(&pct(dec!(6))));
        assert_eq!(values.last(), Some(&pct(dec!(12))));

        let growth = DEFAULT_GROWTH_SWEEP.values().unwrap();
        assert_eq!(growth.len(), 11);
    }

    #[test]
    fn test_sweep_appends_max_off_step() {
        let sweep = Sweep {
            min: pct(dec!(1)),
            max: pct(dec!(2)),
            step: pct(dec!(0.3)),
        };
        let values = sweep.values().unwrap();
        assert_eq!(
            values,
            vec![pct(dec!(1)), pct(dec!(1.3)), pct(dec!(1.6)), pct(dec!(1.9)), pct(dec!(2))]
        );
    }

    #[test]
    fn test_sweep_rejects_bad_ranges() {
        let zero_step = Sweep {
            min: pct(dec!(1)),
            max: pct(dec!(2)),
            step: Percent::ZERO,
        };
        assert!(zero_step.values().is_err());

        let inverted = Sweep {
            min: pct(dec!(3)),
            max: pct(dec!(2)),
            step: pct(dec!(0.5)),
        };
        assert!(inverted.values().is_err());

        let huge = Sweep {
            min: pct(dec!(0)),
            max: pct(dec!(1000)),
            step: pct(dec!(0.01)),
        };
        assert!(huge.values().is_err());
    }

    #[test]
    fn test_centered_sweep() {
        let values = Sweep::centered(pct(dec!(9)), pct(dec!(1)), 2)
            .unwrap()
            .values()
            .unwrap();
        assert_eq!(
            values,
            vec![pct(dec!(7)), pct(dec!(8)), pct(dec!(9)), pct(dec!(10)), pct(dec!(11))]
        );
    }

    #[test]
    fn test_centered_sweep_bounds_overflow() {
        let err = Sweep::centered(pct(Decimal::MAX - Decimal::ONE), pct(dec!(1)), 2).unwrap_err();
        assert!(matches!(err, DcfError::NumericOverflow { .. }));

        let err = Sweep::centered(pct(Decimal::MIN), pct(dec!(1)), 1).unwrap_err();
        assert!(matches!(err, DcfError::NumericOverflow { .. }));
    }

    #[test]
    fn test_sweep_stops_at_decimal_max() {
        let sweep = Sweep {
            min: pct(Decimal::MAX),
            max: pct(Decimal::MAX),
            step: pct(dec!(1)),
        };
        assert_eq!(sweep.values().unwrap(), vec![pct(Decimal::MAX)]);
    }

    #[test]
    fn test_grid_marks_undefined_cells() {
        let waccs = [pct(dec!(2)), pct(dec!(3)), pct(dec!(9))];
        let growth = [pct(dec!(1)), pct(dec!(3))];
        let table = sensitivity(&sample_inputs(), &sample_assumptions(), &waccs, &growth).unwrap();

        // WACC 2% <= g 3%, WACC 3% == g 3%
        assert_eq!(table.undefined_cells, 2);
        assert!(table.per_share_values[0][0].is_some());
        assert!(table.per_share_values[0][1].is_none());
        assert!(table.per_share_values[1][1].is_none());
        assert!(table.per_share_values[2][1].is_some());
    }

    #[test]
    fn test_grid_rows_follow_wacc() {
        let waccs = [pct(dec!(8)), pct(dec!(9)), pct(dec!(10))];
        let growth = [pct(dec!(1)), pct(dec!(2))];
        let table = sensitivity(&sample_inputs(), &sample_assumptions(), &waccs, &growth).unwrap();

        assert_eq!(table.base_case_position, Some((1, 1)));
        for col in 0..growth.len() {
            let a = table.per_share_values[0][col].unwrap();
            let b = table.per_share_values[1][col].unwrap();
            let c = table.per_share_values[2][col].unwrap();
            assert!(a > b && b > c);
        }
        for row in &table.per_share_values {
            assert!(row[1].unwrap() > row[0].unwrap());
        }
    }

    #[test]
    fn test_grid_shares_base_failures() {
        let mut a = sample_assumptions();
        a.forecast_years = 0;
        let result = sensitivity(&sample_inputs(), &a, &[pct(dec!(9))], &[pct(dec!(2))]);
        assert!(matches!(result, Err(DcfError::InvalidAssumptions { .. })));
    }

    #[test]
    fn test_grid_ignores_base_terminal_validity() {
        // Base g above WACC would fail the point valuation, not the grid
        let mut a = sample_assumptions();
        a.terminal = TerminalAssumption::Gordon {
            growth_pct: pct(dec!(12)),
        };
        let table = sensitivity(&sample_inputs(), &a, &[pct(dec!(9))], &[pct(dec!(2))]).unwrap();
        assert_eq!(table.undefined_cells, 0);
        assert_eq!(table.base_case_position, None);
    }

    #[test]
    fn test_empty_axes_give_empty_grid() {
        let table = sensitivity(&sample_inputs(), &sample_assumptions(), &[], &[]).unwrap();
        assert!(table.per_share_values.is_empty());
        assert_eq!(table.undefined_cells, 0);
    }

    #[test]
    fn test_exit_multiple_grid() {
        let waccs = [pct(dec!(8)), pct(dec!(10))];
        let table = exit_multiple_sensitivity(
            &sample_inputs(),
            &sample_assumptions(),
            &waccs,
            &DEFAULT_EXIT_MULTIPLES,
        )
        .unwrap();

        assert_eq!(table.per_share_values.len(), 2);
        assert_eq!(table.per_share_values[0].len(), 9);
        assert_eq!(table.undefined_cells, 0);
        // Higher multiple, higher value
        let row = &table.per_share_values[0];
        assert!(row[8].unwrap() > row[0].unwrap());
    }

    #[test]
    fn test_exit_multiple_grid_marks_non_positive_multiple() {
        let table = exit_multiple_sensitivity(
            &sample_inputs(),
            &sample_assumptions(),
            &[pct(dec!(9))],
            &[dec!(0), dec!(8)],
        )
        .unwrap();
        assert_eq!(table.per_share_values[0][0], None);
        assert!(table.per_share_values[0][1].is_some());
        assert_eq!(table.undefined_cells, 1);
    }

    #[test]
    fn test_resolve_defaults_to_centered_axes() {
        let (wacc, growth) = SensitivityRequest::default()
            .resolve(&sample_assumptions())
            .unwrap();
        assert_eq!(wacc[2], pct(dec!(9)));
        assert_eq!(growth[2], pct(dec!(2)));
        assert_eq!(wacc.len(), 5);
        assert_eq!(growth.len(), 5);
    }

    #[test]
    fn test_resolve_reports_overflowing_base_wacc() {
        let mut a = sample_assumptions();
        a.wacc_pct = pct(Decimal::MAX - Decimal::ONE);
        let err = SensitivityRequest::default().resolve(&a).unwrap_err();
        assert!(matches!(err, DcfError::NumericOverflow { .. }));
    }
}
