use clap::Args;
use rust_decimal::Decimal;
use serde_json::{json, Value};

use captable_core::cap_table::{build_ledger, build_pre_hybrid_ledger};
use captable_core::model::ModelInput;
use captable_core::projections::Metric;

use super::{load_model_input, require_projections};

/// Arguments for building the cap table
#[derive(Args)]
pub struct CapTableArgs {
    /// Path to JSON/YAML model input (assumptions + projections)
    #[arg(long)]
    pub input: Option<String>,

    /// ARR at the hybrid close (overrides the projections)
    #[arg(long)]
    pub arr_at_close: Option<Decimal>,

    /// Stop before the hybrid round
    #[arg(long)]
    pub pre_hybrid: bool,
}

pub fn run_cap_table(args: CapTableArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let model = load_model_input(args.input.as_deref())?;
    let a = &model.assumptions;

    if args.pre_hybrid {
        let ledger = build_pre_hybrid_ledger(a)?;
        return Ok(json!({
            "result": ledger,
            "summary": ledger.summary(),
            "ownership": ledger.ownership(),
        }));
    }

    let mut warnings = Vec::new();
    let arr_at_close = match args.arr_at_close {
        Some(arr) => arr,
        None => {
            require_projections(&model)?;
            model
                .projections
                .value_or_zero(a.hybrid.close_year(), Metric::Arr, &mut warnings)
        }
    };

    let mut out = build_ledger(a, arr_at_close)?;
    warnings.append(&mut out.warnings);
    out.warnings = warnings;

    let summary = out.result.summary();
    let ownership = out.result.ownership();
    let mut value = serde_json::to_value(out)?;
    if let Value::Object(ref mut map) = value {
        map.insert("summary".into(), serde_json::to_value(summary)?);
        map.insert("ownership".into(), serde_json::to_value(ownership)?);
    }
    Ok(value)
}

/// Arguments for printing the default model input
#[derive(Args)]
pub struct DefaultsArgs {}

pub fn run_defaults(_args: DefaultsArgs) -> Result<Value, Box<dyn std::error::Error>> {
    Ok(serde_json::to_value(ModelInput::default())?)
}
