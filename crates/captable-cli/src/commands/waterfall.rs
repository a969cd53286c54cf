use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;

use captable_core::cap_table::build_ledger;
use captable_core::model::{exit_valuation, run_model};
use captable_core::projections::Metric;
use captable_core::valuation::{select_valuation, ValuationBasis};
use captable_core::waterfall::{calculate_waterfall, debt_schedule};

use super::{load_model_input, require_projections};

/// Arguments for a full model run
#[derive(Args)]
pub struct ModelArgs {
    /// Path to JSON/YAML model input (assumptions + projections)
    #[arg(long)]
    pub input: Option<String>,
}

pub fn run_full_model(args: ModelArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let model = load_model_input(args.input.as_deref())?;
    require_projections(&model)?;
    let result = run_model(&model)?;
    Ok(serde_json::to_value(result)?)
}

/// Arguments for the exit waterfall
#[derive(Args)]
pub struct WaterfallArgs {
    /// Path to JSON/YAML model input (assumptions + projections)
    #[arg(long)]
    pub input: Option<String>,

    /// Distribute this exit value instead of valuing from projections
    #[arg(long, allow_hyphen_values = true)]
    pub exit_valuation: Option<Decimal>,
}

pub fn run_waterfall(args: WaterfallArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let model = load_model_input(args.input.as_deref())?;
    require_projections(&model)?;
    let a = &model.assumptions;

    let mut warnings = Vec::new();
    let arr_at_close = model
        .projections
        .value_or_zero(a.hybrid.close_year(), Metric::Arr, &mut warnings);
    let ledger = build_ledger(a, arr_at_close)?;
    warnings.extend(ledger.warnings);

    let valuation = match args.exit_valuation {
        Some(v) => {
            select_valuation(v, Decimal::ZERO, Decimal::ONE, Decimal::ZERO, ValuationBasis::Arr)?
        }
        None => exit_valuation(&model, &mut warnings)?,
    };

    let mut out = calculate_waterfall(&ledger.result, a, &valuation)?;
    warnings.append(&mut out.warnings);
    out.warnings = warnings;
    Ok(serde_json::to_value(out)?)
}

/// Arguments for the debt schedule
#[derive(Args)]
pub struct DebtScheduleArgs {
    /// Path to JSON/YAML model input
    #[arg(long)]
    pub input: Option<String>,

    /// First year (defaults to the founder round year)
    #[arg(long)]
    pub from: Option<i32>,

    /// Last year (defaults to the exit year)
    #[arg(long)]
    pub to: Option<i32>,
}

pub fn run_debt_schedule(args: DebtScheduleArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let model = load_model_input(args.input.as_deref())?;
    let a = &model.assumptions;
    let from = args.from.unwrap_or(a.founder.year);
    let to = args.to.unwrap_or(a.exit.exit_year);
    let result = debt_schedule(a, from, to)?;
    Ok(serde_json::to_value(result)?)
}
