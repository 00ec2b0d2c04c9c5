use dcf_core::valuation::wacc::{calculate_wacc, WaccInput};
use dcf_core::valuation::{
    calculate_dcf, exit_multiple_sensitivity, project, sensitivity, valuate, DcfAssumptions,
    DcfInput, FetchedFinancials, FinancialInputs, SensitivityRequest, TerminalAssumption,
};
use dcf_core::{Currency, DcfError, Percent};
use pretty_assertions::assert_eq;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

// ===========================================================================
// Fixtures
// ===========================================================================

fn apple_financials() -> FinancialInputs {
    FinancialInputs {
        base_revenue: dec!(385000000000),
        net_debt: dec!(-60000000000),
        minority_interest: dec!(0),
        investments: dec!(0),
        shares_outstanding: dec!(15500000000),
        last_price: Some(dec!(230)),
        currency: Currency::USD,
    }
}

fn apple_assumptions() -> DcfAssumptions {
    DcfAssumptions {
        forecast_years: 5,
        revenue_growth_pct: Percent::new(dec!(5)),
        ebit_margin_pct: Percent::new(dec!(30)),
        da_pct_of_sales: Percent::new(dec!(3)),
        capex_pct_of_sales: Percent::new(dec!(3)),
        delta_nwc_pct_of_delta_sales: Percent::ZERO,
        tax_rate_pct: Percent::new(dec!(16)),
        wacc_pct: Percent::new(dec!(10)),
        terminal: TerminalAssumption::Gordon {
            growth_pct: Percent::new(dec!(2.5)),
        },
    }
}

fn apple_input() -> DcfInput {
    DcfInput {
        financials: apple_financials(),
        assumptions: apple_assumptions(),
        sensitivity: None,
    }
}

fn assert_close(actual: Decimal, expected: Decimal, tolerance: Decimal, what: &str) {
    assert!(
        (actual - expected).abs() < tolerance,
        "{what}: expected ~{expected}, got {actual}"
    );
}

// ===========================================================================
// Golden scenario
// ===========================================================================

#[test]
fn test_apple_first_year_projection() {
    let years = project(&apple_financials(), &apple_assumptions()).unwrap();
    assert_eq!(years.len(), 5);

    let y1 = &years[0];
    assert_eq!(y1.revenue, dec!(404250000000));
    assert_eq!(y1.ebit, dec!(121275000000));
    assert_eq!(y1.nopat, dec!(101871000000));
    // D&A and capex cancel, no working capital build
    assert_eq!(y1.fcff, dec!(101871000000));
}

#[test]
fn test_apple_golden_valuation() {
    let out = calculate_dcf(&apple_input()).unwrap();
    let r = &out.result;

    // TV = FCFF5 * 1.025 / 0.075, exact in decimal
    assert_eq!(r.terminal_value, dec!(1692272774981.25));
    assert_close(
        r.present_value_of_stream,
        dec!(422824883503.5175),
        dec!(0.001),
        "PV of stream",
    );
    assert_close(
        r.enterprise_value,
        dec!(1473593133921.8633),
        dec!(0.001),
        "enterprise value",
    );
    assert_close(
        r.per_share_value,
        dec!(98.941492511088),
        dec!(0.000001),
        "per-share value",
    );
    assert_close(
        r.terminal_value_share,
        dec!(0.7130653816),
        dec!(0.0000001),
        "terminal share",
    );
    // 98.94 / 230 - 1
    let upside = r.implied_upside.unwrap();
    assert!(upside < dec!(-0.56) && upside > dec!(-0.58), "upside {upside}");
}

#[test]
fn test_apple_equity_bridge_adds_net_cash() {
    let r = calculate_dcf(&apple_input()).unwrap().result;
    assert_eq!(r.equity_value, r.enterprise_value + dec!(60000000000));
    assert_eq!(
        r.enterprise_value,
        r.present_value_of_stream + r.present_value_of_terminal
    );
    assert_eq!(r.present_values.len(), r.projected_years.len());
}

#[test]
fn test_valuation_is_deterministic() {
    let a = calculate_dcf(&apple_input()).unwrap().result;
    let b = calculate_dcf(&apple_input()).unwrap().result;
    assert_eq!(a, b);
}

// ===========================================================================
// Boundaries
// ===========================================================================

#[test]
fn test_wacc_equal_to_growth_is_rejected_not_infinite() {
    let mut input = apple_input();
    input.assumptions.wacc_pct = Percent::new(dec!(2.5));
    match calculate_dcf(&input) {
        Err(DcfError::InvalidTerminalAssumption { wacc, growth }) => {
            assert_eq!(wacc, growth);
        }
        other => panic!("expected InvalidTerminalAssumption, got {other:?}"),
    }
}

#[test]
fn test_valuate_over_external_projection() {
    let projected = project(&apple_financials(), &apple_assumptions()).unwrap();
    let at_nine = valuate(
        &apple_financials(),
        &projected,
        Percent::new(dec!(9)),
        &apple_assumptions().terminal,
    )
    .unwrap();
    let at_ten = calculate_dcf(&apple_input()).unwrap().result;
    assert!(at_nine.per_share_value > at_ten.per_share_value);
}

#[test]
fn test_fetched_financials_feed_the_pipeline() {
    let fetched = FetchedFinancials {
        revenue: Some(dec!(385000000000)),
        total_debt: Some(dec!(100000000000)),
        cash: Some(dec!(160000000000)),
        shares_outstanding: Some(dec!(15500000000)),
        price: Some(dec!(230)),
        currency: Some("usd".into()),
    };
    let financials = FinancialInputs::try_from(fetched).unwrap();
    assert_eq!(financials.net_debt, dec!(-60000000000));

    let input = DcfInput {
        financials,
        ..apple_input()
    };
    let via_fetch = calculate_dcf(&input).unwrap().result;
    let direct = calculate_dcf(&apple_input()).unwrap().result;
    assert_eq!(via_fetch.per_share_value, direct.per_share_value);
}

// ===========================================================================
// Sensitivity
// ===========================================================================

#[test]
fn test_default_grid_brackets_base_case() {
    let r = calculate_dcf(&DcfInput {
        sensitivity: Some(SensitivityRequest::default()),
        ..apple_input()
    })
    .unwrap()
    .result;

    let table = r.sensitivity.unwrap();
    let (row, col) = table.base_case_position.unwrap();
    assert_eq!(table.per_share_values[row][col], Some(r.per_share_value));
    assert_eq!(table.undefined_cells, 0);
}

#[test]
fn test_grid_marks_undefined_cells_without_failing() {
    let wacc = [Percent::new(dec!(2)), Percent::new(dec!(8))];
    let growth = [Percent::new(dec!(2)), Percent::new(dec!(3))];
    let table = sensitivity(&apple_financials(), &apple_assumptions(), &wacc, &growth).unwrap();

    assert_eq!(table.per_share_values[0], vec![None, None]);
    assert!(table.per_share_values[1].iter().all(Option::is_some));
    assert_eq!(table.undefined_cells, 2);
    assert_eq!(table.base_case_position, None);
}

#[test]
fn test_exit_multiple_grid_increases_with_multiple() {
    let wacc = [Percent::new(dec!(10))];
    let multiples = [dec!(8), dec!(10), dec!(12)];
    let table =
        exit_multiple_sensitivity(&apple_financials(), &apple_assumptions(), &wacc, &multiples)
            .unwrap();

    let row: Vec<Decimal> = table.per_share_values[0].iter().flatten().copied().collect();
    assert_eq!(row.len(), 3);
    assert!(row[0] < row[1] && row[1] < row[2]);
}

// ===========================================================================
// WACC into DCF
// ===========================================================================

#[test]
fn test_wacc_output_feeds_assumptions() {
    let wacc = calculate_wacc(&WaccInput {
        risk_free_pct: Percent::new(dec!(4.25)),
        beta: dec!(1.24),
        market_risk_premium_pct: Percent::new(dec!(4.72)),
        size_premium_pct: Percent::ZERO,
        cost_of_debt_pct: Percent::new(dec!(3.4)),
        tax_rate_pct: Percent::new(dec!(16.23)),
        equity_value: dec!(3500000000000),
        debt_value: dec!(100000000000),
    })
    .unwrap()
    .result;

    // Ke = 4.25 + 1.24 * 4.72 = 10.1028%
    assert_eq!(wacc.cost_of_equity_pct, Percent::new(dec!(10.1028)));
    assert!(wacc.wacc_pct < wacc.cost_of_equity_pct);

    let mut input = apple_input();
    input.assumptions.wacc_pct = wacc.wacc_pct;
    let r = calculate_dcf(&input).unwrap().result;
    assert!(r.per_share_value > Decimal::ZERO);
}
