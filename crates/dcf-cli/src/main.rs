mod commands;
mod export;
mod input;
mod logging;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;

use commands::suggest::SuggestArgs;
use commands::valuation::{DcfArgs, ProjectArgs, SensitivityArgs, WaccArgs};

/// FCFF discounted cash flow valuations
#[derive(Parser)]
#[command(
    name = "dcf",
    version,
    about = "FCFF discounted cash flow valuations",
    long_about = "Project free cash flow to the firm, discount it at the WACC and bridge \
                  to a per-share value with decimal precision. Supports Gordon growth and \
                  exit-multiple terminal values, sensitivity grids, a CAPM WACC builder \
                  and assumption suggestions from historical financials."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a full DCF valuation
    Dcf(DcfArgs),
    /// Project FCFF without valuing it
    Project(ProjectArgs),
    /// Per-share value over a WACC x terminal growth (or exit multiple) grid
    Sensitivity(SensitivityArgs),
    /// Calculate Weighted Average Cost of Capital (CAPM build-up)
    Wacc(WaccArgs),
    /// Suggest operating assumptions from historical financials
    Suggest(SuggestArgs),
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

fn main() {
    let cli = Cli::parse();
    logging::init();

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Dcf(args) => commands::valuation::run_dcf(args),
        Commands::Project(args) => commands::valuation::run_project(args),
        Commands::Sensitivity(args) => commands::valuation::run_sensitivity(args),
        Commands::Wacc(args) => commands::valuation::run_wacc(args),
        Commands::Suggest(args) => commands::suggest::run_suggest(args),
        Commands::Version => {
            println!("dcf {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            tracing::debug!(error = %e, "command failed");
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
