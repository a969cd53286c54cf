use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::assumptions::CapTableAssumptions;
use crate::cap_table::{build_ledger, CapTableEntry, CapTableSummary, RoundLedger};
use crate::projections::{Metric, ProjectionSeries};
use crate::types::{with_metadata, ComputationOutput};
use crate::valuation::{select_valuation, ExitValuation};
use crate::waterfall::{calculate_waterfall, WaterfallOutput};
use crate::CapTableResult;

/// Assumption set plus the projection collaborator's ARR/EBITDA by year.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelInput {
    #[serde(default)]
    pub assumptions: CapTableAssumptions,
    #[serde(default)]
    pub projections: ProjectionSeries,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelOutput {
    pub ledger: RoundLedger,
    pub summary: CapTableSummary,
    pub ownership: Vec<CapTableEntry>,
    pub exit_valuation: ExitValuation,
    pub waterfall: WaterfallOutput,
}

/// Value the exit from the projections at the exit year.
pub fn exit_valuation(
    input: &ModelInput,
    warnings: &mut Vec<String>,
) -> CapTableResult<ExitValuation> {
    let exit = &input.assumptions.exit;
    let arr = input
        .projections
        .value_or_zero(exit.exit_year, Metric::Arr, warnings);
    let ebitda = input
        .projections
        .value_or_zero(exit.exit_year, Metric::Ebitda, warnings);
    select_valuation(
        arr,
        ebitda,
        exit.arr_multiple,
        exit.ebitda_multiple,
        exit.valuation_basis,
    )
}

/// One full engine run: ledger, exit valuation, waterfall.
pub fn run_model(input: &ModelInput) -> CapTableResult<ComputationOutput<ModelOutput>> {
    let start = Instant::now();
    let a = &input.assumptions;
    let mut warnings: Vec<String> = Vec::new();

    let close_year = a.hybrid.close_year();
    let arr_at_close = input
        .projections
        .value_or_zero(close_year, Metric::Arr, &mut warnings);

    let ledger_out = build_ledger(a, arr_at_close)?;
    warnings.extend(ledger_out.warnings);
    let ledger = ledger_out.result;

    let valuation = exit_valuation(input, &mut warnings)?;
    let waterfall_out = calculate_waterfall(&ledger, a, &valuation)?;
    warnings.extend(waterfall_out.warnings);

    let output = ModelOutput {
        summary: ledger.summary(),
        ownership: ledger.ownership(),
        ledger,
        exit_valuation: valuation,
        waterfall: waterfall_out.result,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Cap table dilution and exit waterfall",
        a,
        warnings,
        elapsed,
        output,
    ))
}
