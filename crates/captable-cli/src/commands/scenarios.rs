use clap::Args;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;

use captable_core::model::ModelInput;
use captable_core::scenarios::{run_scenarios, run_sensitivity, ScenarioSpec};
use captable_core::SensitivityVariable;

use super::{load_model_input, require_projections};
use crate::input;

/// Scenario file: a base model input and the named variations to run against it.
#[derive(Debug, Deserialize)]
struct ScenarioFile {
    #[serde(default)]
    base: ModelInput,
    scenarios: Vec<ScenarioSpec>,
}

/// Arguments for scenario analysis
#[derive(Args)]
pub struct ScenariosArgs {
    /// Path to JSON/YAML scenario file ({ base, scenarios: [{ name, overrides }] })
    #[arg(long)]
    pub input: Option<String>,
}

pub fn run_scenario_analysis(args: ScenariosArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let file: ScenarioFile = if let Some(ref path) = args.input {
        input::file::read_input(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        serde_json::from_value(data)?
    } else {
        return Err("--input <scenarios.json> or stdin required for scenario analysis".into());
    };

    let result = run_scenarios(&file.base, &file.scenarios)?;
    Ok(serde_json::to_value(result)?)
}

/// Arguments for a one-way sensitivity sweep
#[derive(Args)]
pub struct SensitivityArgs {
    /// Path to JSON/YAML model input
    #[arg(long)]
    pub input: Option<String>,

    /// Variable in format path:min:max:step
    /// (e.g. "assumptions.exit.ebitda_multiple:15:30:2.5")
    #[arg(long)]
    pub var: String,
}

fn parse_sens_var(spec: &str) -> Result<SensitivityVariable, Box<dyn std::error::Error>> {
    let parts: Vec<&str> = spec.split(':').collect();
    if parts.len() != 4 {
        return Err(format!(
            "Sensitivity variable must be path:min:max:step, got '{}'",
            spec
        )
        .into());
    }
    Ok(SensitivityVariable {
        name: parts[0].to_string(),
        min: parts[1].parse::<Decimal>()?,
        max: parts[2].parse::<Decimal>()?,
        step: parts[3].parse::<Decimal>()?,
    })
}

pub fn run_sensitivity_sweep(args: SensitivityArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let variable = parse_sens_var(&args.var)?;
    let model = load_model_input(args.input.as_deref())?;
    require_projections(&model)?;
    let result = run_sensitivity(&model, &variable)?;
    Ok(serde_json::to_value(result)?)
}
