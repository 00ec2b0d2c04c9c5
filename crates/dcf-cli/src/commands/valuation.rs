use clap::Args;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::PathBuf;
use std::time::Instant;

use dcf_core::valuation::sensitivity::{
    DEFAULT_EXIT_MULTIPLES, DEFAULT_GROWTH_SWEEP, DEFAULT_WACC_SWEEP,
};
use dcf_core::valuation::wacc::{self, WaccInput};
use dcf_core::valuation::{
    calculate_dcf, exit_multiple_sensitivity, project, sensitivity, DcfAssumptions, DcfInput,
    FinancialInputs, ProjectedYear, SensitivityRequest, Sweep, TerminalAssumption,
};
use dcf_core::{with_metadata, Currency, Percent};

use crate::{export, input};

/// Company and assumption flags shared by `dcf`, `project` and `sensitivity`.
/// Percentages are in percent units (`9.5` or `9.5%`).
#[derive(Args)]
pub struct ModelArgs {
    /// Path to a JSON or YAML input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Last reported annual revenue
    #[arg(long)]
    pub base_revenue: Option<Decimal>,

    /// Net debt (negative for net cash)
    #[arg(long, default_value = "0", allow_hyphen_values = true)]
    pub net_debt: Decimal,

    /// Minority interest deducted in the equity bridge
    #[arg(long, default_value = "0")]
    pub minority_interest: Decimal,

    /// Non-operating investments added in the equity bridge
    #[arg(long, default_value = "0")]
    pub investments: Decimal,

    /// Diluted shares outstanding
    #[arg(long)]
    pub shares: Option<Decimal>,

    /// Last share price, for implied upside
    #[arg(long)]
    pub price: Option<Decimal>,

    /// Reporting currency code
    #[arg(long, default_value = "USD")]
    pub currency: String,

    /// Explicit forecast years
    #[arg(long, default_value = "5")]
    pub years: u32,

    /// Annual revenue growth
    #[arg(long, default_value = "5", allow_hyphen_values = true)]
    pub growth: Percent,

    /// EBIT margin
    #[arg(long, default_value = "10", allow_hyphen_values = true)]
    pub ebit_margin: Percent,

    /// D&A as a share of revenue
    #[arg(long, default_value = "5")]
    pub da: Percent,

    /// Capex as a share of revenue
    #[arg(long, default_value = "5")]
    pub capex: Percent,

    /// Working capital build as a share of the change in revenue
    #[arg(long, default_value = "1", allow_hyphen_values = true)]
    pub nwc: Percent,

    /// Tax rate on EBIT
    #[arg(long, default_value = "20.6")]
    pub tax: Percent,

    /// Discount rate
    #[arg(long, default_value = "10", allow_hyphen_values = true)]
    pub wacc: Percent,

    /// Gordon growth terminal rate
    #[arg(long, default_value = "2.5", allow_hyphen_values = true)]
    pub terminal_growth: Percent,

    /// Use an exit multiple on final-year EBITDA instead of Gordon growth
    #[arg(long)]
    pub exit_multiple: Option<Decimal>,
}

/// Arguments for a full DCF valuation
#[derive(Args)]
pub struct DcfArgs {
    #[command(flatten)]
    pub model: ModelArgs,

    /// Attach a WACC x terminal growth grid around the base case
    #[arg(long)]
    pub sensitivity: bool,

    /// Write `<ticker>_forecast.csv` and `<ticker>_summary.json` here
    #[arg(long)]
    pub export_dir: Option<PathBuf>,

    /// Name used for exported files
    #[arg(long, default_value = "dcf")]
    pub ticker: String,
}

/// Arguments for a projection without valuation
#[derive(Args)]
pub struct ProjectArgs {
    #[command(flatten)]
    pub model: ModelArgs,
}

/// Arguments for a sensitivity grid
#[derive(Args)]
pub struct SensitivityArgs {
    #[command(flatten)]
    pub model: ModelArgs,

    #[arg(long, default_value_t = DEFAULT_WACC_SWEEP.min)]
    pub wacc_min: Percent,
    #[arg(long, default_value_t = DEFAULT_WACC_SWEEP.max)]
    pub wacc_max: Percent,
    #[arg(long, default_value_t = DEFAULT_WACC_SWEEP.step)]
    pub wacc_step: Percent,

    #[arg(long, default_value_t = DEFAULT_GROWTH_SWEEP.min, allow_hyphen_values = true)]
    pub growth_min: Percent,
    #[arg(long, default_value_t = DEFAULT_GROWTH_SWEEP.max, allow_hyphen_values = true)]
    pub growth_max: Percent,
    #[arg(long, default_value_t = DEFAULT_GROWTH_SWEEP.step)]
    pub growth_step: Percent,

    /// Sweep exit multiples instead of terminal growth
    #[arg(long)]
    pub exit_multiples: bool,

    /// Exit multiples to sweep (defaults to 6x-14x)
    #[arg(long, value_delimiter = ',')]
    pub multiples: Vec<Decimal>,
}

/// Arguments for WACC calculation
#[derive(Args)]
#[command(allow_hyphen_values = true)]
pub struct WaccArgs {
    /// Risk-free rate
    #[arg(long, default_value = "2")]
    pub risk_free: Percent,

    /// Levered beta
    #[arg(long, default_value = "1.0")]
    pub beta: Decimal,

    /// Market risk premium
    #[arg(long, alias = "mrp", default_value = "5.5")]
    pub market_risk_premium: Percent,

    /// Small-cap premium
    #[arg(long, default_value = "0")]
    pub size_premium: Percent,

    /// Pre-tax cost of debt
    #[arg(long, default_value = "3")]
    pub cost_of_debt: Percent,

    /// Marginal tax rate
    #[arg(long, default_value = "20.6")]
    pub tax: Percent,

    /// Market value of equity
    #[arg(long, default_value = "0")]
    pub equity_value: Decimal,

    /// Market value of debt
    #[arg(long, default_value = "0")]
    pub debt_value: Decimal,

    /// Path to a JSON or YAML input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,
}

/// File form of a sensitivity request.
#[derive(Debug, Deserialize)]
struct SensitivityFile {
    financials: FinancialInputs,
    assumptions: DcfAssumptions,
    #[serde(default)]
    wacc_sweep: Option<Sweep>,
    #[serde(default)]
    growth_sweep: Option<Sweep>,
    #[serde(default)]
    exit_multiples: Option<Vec<Decimal>>,
}

#[derive(Serialize)]
struct Projection<'a> {
    projected_years: &'a [ProjectedYear],
}

// ---------------------------------------------------------------------------
// Input assembly
// ---------------------------------------------------------------------------

impl ModelArgs {
    fn financials(&self) -> Result<FinancialInputs, Box<dyn std::error::Error>> {
        Ok(FinancialInputs {
            base_revenue: self
                .base_revenue
                .ok_or("--base-revenue is required (or provide --input)")?,
            net_debt: self.net_debt,
            minority_interest: self.minority_interest,
            investments: self.investments,
            shares_outstanding: self
                .shares
                .ok_or("--shares is required (or provide --input)")?,
            last_price: self.price,
            currency: Currency::from(self.currency.as_str()),
        })
    }

    fn assumptions(&self) -> DcfAssumptions {
        let terminal = match self.exit_multiple {
            Some(multiple) => TerminalAssumption::ExitMultiple { multiple },
            None => TerminalAssumption::Gordon {
                growth_pct: self.terminal_growth,
            },
        };
        DcfAssumptions {
            forecast_years: self.years,
            revenue_growth_pct: self.growth,
            ebit_margin_pct: self.ebit_margin,
            da_pct_of_sales: self.da,
            capex_pct_of_sales: self.capex,
            delta_nwc_pct_of_delta_sales: self.nwc,
            tax_rate_pct: self.tax,
            wacc_pct: self.wacc,
            terminal,
        }
    }

    fn dcf_input(&self) -> Result<DcfInput, Box<dyn std::error::Error>> {
        if let Some(from_file) = input::read_typed::<DcfInput>(self.input.as_deref())? {
            return Ok(from_file);
        }
        Ok(DcfInput {
            financials: self.financials()?,
            assumptions: self.assumptions(),
            sensitivity: None,
        })
    }
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

pub fn run_dcf(args: DcfArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let mut dcf_input = args.model.dcf_input()?;
    if args.sensitivity && dcf_input.sensitivity.is_none() {
        dcf_input.sensitivity = Some(SensitivityRequest::default());
    }

    let output = calculate_dcf(&dcf_input)?;
    for warning in &output.warnings {
        tracing::warn!("{warning}");
    }

    if let Some(ref dir) = args.export_dir {
        let written = export::write_all(dir, &args.ticker, &dcf_input.financials, &output.result)?;
        for path in written {
            tracing::info!(path = %path.display(), "exported");
        }
    }

    Ok(serde_json::to_value(output)?)
}

pub fn run_project(args: ProjectArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let start = Instant::now();
    let dcf_input = args.model.dcf_input()?;
    let years = project(&dcf_input.financials, &dcf_input.assumptions)?;

    let output = with_metadata(
        "FCFF projection (flat growth, percent-of-sales drivers)",
        &dcf_input,
        Vec::new(),
        start.elapsed().as_micros() as u64,
        Projection {
            projected_years: &years,
        },
    );
    Ok(serde_json::to_value(output)?)
}

pub fn run_sensitivity(args: SensitivityArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let start = Instant::now();

    let file = input::read_typed::<SensitivityFile>(args.model.input.as_deref())?;
    let (financials, assumptions, wacc_sweep, growth_sweep, multiples) = match file {
        Some(f) => (
            f.financials,
            f.assumptions,
            f.wacc_sweep,
            f.growth_sweep,
            f.exit_multiples,
        ),
        None => (
            args.model.financials()?,
            args.model.assumptions(),
            None,
            None,
            None,
        ),
    };

    let wacc_values = wacc_sweep
        .unwrap_or(Sweep {
            min: args.wacc_min,
            max: args.wacc_max,
            step: args.wacc_step,
        })
        .values()?;

    let mut warnings = Vec::new();
    let (methodology, value) = if args.exit_multiples || multiples.is_some() {
        let multiples = multiples
            .or_else(|| (!args.multiples.is_empty()).then(|| args.multiples.clone()))
            .unwrap_or_else(|| DEFAULT_EXIT_MULTIPLES.to_vec());
        let table = exit_multiple_sensitivity(&financials, &assumptions, &wacc_values, &multiples)?;
        if table.undefined_cells > 0 {
            warnings.push(format!("{} grid cells are undefined", table.undefined_cells));
        }
        ("WACC x exit multiple sensitivity", serde_json::to_value(table)?)
    } else {
        let growth_values = growth_sweep
            .unwrap_or(Sweep {
                min: args.growth_min,
                max: args.growth_max,
                step: args.growth_step,
            })
            .values()?;
        let table = sensitivity(&financials, &assumptions, &wacc_values, &growth_values)?;
        if table.undefined_cells > 0 {
            warnings.push(format!(
                "{} grid cells are undefined (WACC must exceed terminal growth)",
                table.undefined_cells
            ));
        }
        ("WACC x terminal growth sensitivity", serde_json::to_value(table)?)
    };

    let output = with_metadata(
        methodology,
        &assumptions,
        warnings,
        start.elapsed().as_micros() as u64,
        value,
    );
    Ok(serde_json::to_value(output)?)
}

pub fn run_wacc(args: WaccArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let wacc_input = match input::read_typed::<WaccInput>(args.input.as_deref())? {
        Some(from_file) => from_file,
        None => WaccInput {
            risk_free_pct: args.risk_free,
            beta: args.beta,
            market_risk_premium_pct: args.market_risk_premium,
            size_premium_pct: args.size_premium,
            cost_of_debt_pct: args.cost_of_debt,
            tax_rate_pct: args.tax,
            equity_value: args.equity_value,
            debt_value: args.debt_value,
        },
    };

    let result = wacc::calculate_wacc(&wacc_input)?;
    Ok(serde_json::to_value(result)?)
}
