use clap::Args;
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::Value;
use std::time::Instant;

use dcf_core::suggestions::{
    suggest_assumptions, HistoricalFinancials, NarrativeSuggestions, SuggestedAssumptions,
};
use dcf_core::valuation::DcfAssumptions;
use dcf_core::with_metadata;

use crate::input;

/// Arguments for assumption suggestions
#[derive(Args)]
pub struct SuggestArgs {
    /// Historical financials file (JSON or YAML), oldest year first
    #[arg(long)]
    pub input: Option<String>,

    /// Historical revenue, oldest first, when no input file is given
    #[arg(long, value_delimiter = ',', num_args = 1..)]
    pub revenue: Vec<Decimal>,

    /// Assumptions file to merge the suggestions into
    #[arg(long)]
    pub assumptions: Option<String>,

    /// Narrative suggestions file to merge after the historical ones
    #[arg(long)]
    pub narrative: Option<String>,
}

#[derive(Serialize)]
struct SuggestOutput {
    suggested: SuggestedAssumptions,
    #[serde(skip_serializing_if = "Option::is_none")]
    assumptions: Option<DcfAssumptions>,
}

pub fn run_suggest(args: SuggestArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let start = Instant::now();

    let history = match input::read_typed::<HistoricalFinancials>(args.input.as_deref())? {
        Some(history) => history,
        None if !args.revenue.is_empty() => HistoricalFinancials {
            revenue: args.revenue.clone(),
            ..Default::default()
        },
        None => return Err("--input or --revenue is required".into()),
    };

    let suggested = suggest_assumptions(&history)?;

    let assumptions = match args.assumptions {
        Some(ref path) => {
            let base: DcfAssumptions = input::file::read_input(path)?;
            let mut merged = suggested.apply_to(&base);
            if let Some(ref narrative_path) = args.narrative {
                let narrative: NarrativeSuggestions = input::file::read_input(narrative_path)?;
                merged = narrative.apply_to(&merged)?;
            }
            Some(merged)
        }
        None if args.narrative.is_some() => {
            return Err("--narrative requires --assumptions to merge into".into());
        }
        None => None,
    };

    let output = with_metadata(
        "Historical heuristics (revenue CAGR, average ratios to sales)",
        &history,
        Vec::new(),
        start.elapsed().as_micros() as u64,
        SuggestOutput {
            suggested,
            assumptions,
        },
    );
    Ok(serde_json::to_value(output)?)
}
