use napi::Result as NapiResult;
use napi_derive::napi;
use rust_decimal::Decimal;
use serde::Deserialize;

use captable_core::assumptions::CapTableAssumptions;
use captable_core::model::{self, ModelInput};
use captable_core::projections::Metric;
use captable_core::valuation::{self, ValuationBasis};
use captable_core::{cap_table, scenarios, waterfall, SensitivityVariable};

/// Convert any Display error into a napi::Error.
fn to_napi_error(e: impl std::fmt::Display) -> napi::Error {
    napi::Error::from_reason(e.to_string())
}

fn parse<T: for<'de> Deserialize<'de>>(input_json: &str) -> NapiResult<T> {
    serde_json::from_str(input_json).map_err(to_napi_error)
}

fn to_json(value: &impl serde::Serialize) -> NapiResult<String> {
    serde_json::to_string(value).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Full model
// ---------------------------------------------------------------------------

#[napi]
pub fn run_model(input_json: String) -> NapiResult<String> {
    let input: ModelInput = parse(&input_json)?;
    let output = model::run_model(&input).map_err(to_napi_error)?;
    to_json(&output)
}

// ---------------------------------------------------------------------------
// Cap table
// ---------------------------------------------------------------------------

#[napi]
pub fn build_cap_table(input_json: String) -> NapiResult<String> {
    let input: ModelInput = parse(&input_json)?;
    let a = &input.assumptions;
    let mut warnings = Vec::new();
    let arr_at_close =
        input
            .projections
            .value_or_zero(a.hybrid.close_year(), Metric::Arr, &mut warnings);
    let mut output = cap_table::build_ledger(a, arr_at_close).map_err(to_napi_error)?;
    warnings.append(&mut output.warnings);
    output.warnings = warnings;
    to_json(&output)
}

#[napi]
pub fn convert_note(input_json: String) -> NapiResult<String> {
    let input: cap_table::ConversionInput = parse(&input_json)?;
    let output = cap_table::convert_note(&input).map_err(to_napi_error)?;
    to_json(&output)
}

// ---------------------------------------------------------------------------
// Valuation & waterfall
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct ExitValuationInput {
    arr_value: Decimal,
    ebitda_value: Decimal,
    arr_multiple: Decimal,
    ebitda_multiple: Decimal,
    basis: ValuationBasis,
}

#[napi]
pub fn select_exit_valuation(input_json: String) -> NapiResult<String> {
    let input: ExitValuationInput = parse(&input_json)?;
    let output = valuation::select_valuation(
        input.arr_value,
        input.ebitda_value,
        input.arr_multiple,
        input.ebitda_multiple,
        input.basis,
    )
    .map_err(to_napi_error)?;
    to_json(&output)
}

#[napi]
pub fn calculate_waterfall(input_json: String) -> NapiResult<String> {
    let input: ModelInput = parse(&input_json)?;
    let a = &input.assumptions;
    let mut warnings = Vec::new();
    let arr_at_close =
        input
            .projections
            .value_or_zero(a.hybrid.close_year(), Metric::Arr, &mut warnings);
    let ledger = cap_table::build_ledger(a, arr_at_close).map_err(to_napi_error)?;
    warnings.extend(ledger.warnings);
    let exit = model::exit_valuation(&input, &mut warnings).map_err(to_napi_error)?;
    let mut output =
        waterfall::calculate_waterfall(&ledger.result, a, &exit).map_err(to_napi_error)?;
    warnings.append(&mut output.warnings);
    output.warnings = warnings;
    to_json(&output)
}

#[derive(Deserialize)]
struct DebtScheduleInput {
    #[serde(default)]
    assumptions: CapTableAssumptions,
    from_year: i32,
    to_year: i32,
}

#[napi]
pub fn debt_schedule(input_json: String) -> NapiResult<String> {
    let input: DebtScheduleInput = parse(&input_json)?;
    let output = waterfall::debt_schedule(&input.assumptions, input.from_year, input.to_year)
        .map_err(to_napi_error)?;
    to_json(&output)
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct ScenariosInput {
    #[serde(default)]
    base: ModelInput,
    scenarios: Vec<scenarios::ScenarioSpec>,
}

#[napi]
pub fn run_scenarios(input_json: String) -> NapiResult<String> {
    let input: ScenariosInput = parse(&input_json)?;
    let output = scenarios::run_scenarios(&input.base, &input.scenarios).map_err(to_napi_error)?;
    to_json(&output)
}

#[derive(Deserialize)]
struct SensitivityInput {
    #[serde(default)]
    base: ModelInput,
    variable: SensitivityVariable,
}

#[napi]
pub fn run_sensitivity(input_json: String) -> NapiResult<String> {
    let input: SensitivityInput = parse(&input_json)?;
    let output =
        scenarios::run_sensitivity(&input.base, &input.variable).map_err(to_napi_error)?;
    to_json(&output)
}
