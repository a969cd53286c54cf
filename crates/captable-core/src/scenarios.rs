use rayon::prelude::*;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::Instant;

use crate::cap_table::{RoundKind, Stakeholder};
use crate::error::CapTableError;
use crate::model::{run_model, ModelInput, ModelOutput};
use crate::types::{with_metadata, ComputationOutput, Money, Multiple, Rate, SensitivityVariable};
use crate::CapTableResult;

// ─── Types ───────────────────────────────────────────────────────────────────

/// A named variation of the base input.
///
/// Override keys are dotted paths into `ModelInput`, e.g.
/// `assumptions.exit.ebitda_multiple` or `assumptions.convertible_notes.0.discount`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioSpec {
    pub name: String,
    #[serde(default)]
    pub overrides: Map<String, Value>,
}

/// Headline figures from one engine run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioResult {
    pub name: String,
    pub hybrid_pre_money_valuation: Money,
    pub exit_valuation: Money,
    pub valuation_method: String,
    pub total_debt: Money,
    pub total_equity: Money,
    pub shortfall: Money,
    pub founder_ownership: Rate,
    pub founder_proceeds: Money,
    pub founder_moic: Multiple,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensitivityPoint {
    pub value: Decimal,
    pub result: ScenarioResult,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensitivityOutput {
    pub variable: String,
    pub points: Vec<SensitivityPoint>,
}

// ─── Overrides ───────────────────────────────────────────────────────────────

/// Coerce an override to the JSON shape already at its target.
///
/// Decimals serialize as strings, so a numeric override aimed at a decimal field
/// becomes a string and a string override aimed at an integer field is parsed.
fn coerce(existing: &Value, value: Value) -> CapTableResult<Value> {
    match (existing, value) {
        (Value::String(_), Value::Number(n)) => Ok(Value::String(n.to_string())),
        (Value::Number(_), Value::String(s)) => Ok(serde_json::from_str::<Value>(&s)?),
        (_, v) => Ok(v),
    }
}

/// Set the value at `path` inside `root`. Every segment must already exist.
pub fn apply_override(root: &mut Value, path: &str, value: Value) -> CapTableResult<()> {
    let unknown = || CapTableError::configuration(path, "Unknown assumption path");

    let mut target = root;
    for segment in path.split('.') {
        target = match target {
            Value::Object(map) => map.get_mut(segment).ok_or_else(unknown)?,
            Value::Array(items) => {
                let idx: usize = segment.parse().map_err(|_| unknown())?;
                items.get_mut(idx).ok_or_else(unknown)?
            }
            _ => return Err(unknown()),
        };
    }
    let coerced = coerce(target, value)?;
    *target = coerced;
    Ok(())
}

/// Structural copy of `base` with `overrides` applied.
pub fn apply_overrides(base: &ModelInput, overrides: &Map<String, Value>) -> CapTableResult<ModelInput> {
    let mut value = serde_json::to_value(base)?;
    for (path, v) in overrides {
        apply_override(&mut value, path, v.clone())?;
    }
    Ok(serde_json::from_value(value)?)
}

fn summarise(name: &str, out: &ModelOutput) -> ScenarioResult {
    let founder = out
        .waterfall
        .entries
        .iter()
        .find(|e| e.stakeholder == Some(Stakeholder::Founder));
    let hybrid_pre_money = out
        .ledger
        .find(RoundKind::Hybrid)
        .map(|r| r.pre_money_valuation)
        .unwrap_or(Decimal::ZERO);

    ScenarioResult {
        name: name.to_string(),
        hybrid_pre_money_valuation: hybrid_pre_money,
        exit_valuation: out.exit_valuation.final_valuation,
        valuation_method: out.exit_valuation.method_label.clone(),
        total_debt: out.waterfall.summary.total_debt,
        total_equity: out.waterfall.summary.total_equity,
        shortfall: out.waterfall.summary.shortfall,
        founder_ownership: founder.map(|e| e.ownership).unwrap_or(Decimal::ZERO),
        founder_proceeds: founder.map(|e| e.proceeds).unwrap_or(Decimal::ZERO),
        founder_moic: founder.map(|e| e.moic).unwrap_or(Decimal::ZERO),
    }
}

/// Run one scenario against its own copy of the base input.
pub fn run_scenario(base: &ModelInput, spec: &ScenarioSpec) -> CapTableResult<ScenarioResult> {
    let input = apply_overrides(base, &spec.overrides)?;
    let out = run_model(&input)?;
    Ok(summarise(&spec.name, &out.result))
}

// ─── Scenario runner ─────────────────────────────────────────────────────────

/// Evaluate every scenario in parallel. Results keep input order; a scenario
/// that fails is reported as a warning and left out.
pub fn run_scenarios(
    base: &ModelInput,
    specs: &[ScenarioSpec],
) -> CapTableResult<ComputationOutput<Vec<ScenarioResult>>> {
    let start = Instant::now();

    if specs.is_empty() {
        return Err(CapTableError::configuration(
            "scenarios",
            "At least one scenario required",
        ));
    }

    let outcomes: Vec<CapTableResult<ScenarioResult>> = specs
        .par_iter()
        .map(|spec| run_scenario(base, spec))
        .collect();

    let mut warnings: Vec<String> = Vec::new();
    let mut results: Vec<ScenarioResult> = Vec::with_capacity(specs.len());
    for (spec, outcome) in specs.iter().zip(outcomes) {
        match outcome {
            Ok(r) => results.push(r),
            Err(e) => {
                let msg = format!("Scenario '{}' failed: {e}", spec.name);
                log::warn!("{msg}");
                warnings.push(msg);
            }
        }
    }

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Scenario analysis (independent engine run per scenario)",
        &serde_json::json!({
            "scenarios": specs.iter().map(|s| s.name.as_str()).collect::<Vec<_>>(),
        }),
        warnings,
        elapsed,
        results,
    ))
}

// ─── Sensitivity ─────────────────────────────────────────────────────────────

/// Values from min to max by step, with max always included.
fn generate_sweep_values(var: &SensitivityVariable) -> CapTableResult<Vec<Decimal>> {
    if var.step <= Decimal::ZERO {
        return Err(CapTableError::configuration(
            format!("variable:{}", var.name),
            "Step must be positive",
        ));
    }
    if var.min > var.max {
        return Err(CapTableError::configuration(
            format!("variable:{}", var.name),
            "Min must be <= max",
        ));
    }

    let mut values = Vec::new();
    let mut current = var.min;
    while current <= var.max {
        values.push(current);
        current += var.step;
    }
    if let Some(&last) = values.last() {
        if last < var.max {
            values.push(var.max);
        }
    }
    Ok(values)
}

/// Sweep one dotted-path variable across its range, one engine run per value.
pub fn run_sensitivity(
    base: &ModelInput,
    variable: &SensitivityVariable,
) -> CapTableResult<ComputationOutput<SensitivityOutput>> {
    let start = Instant::now();
    let values = generate_sweep_values(variable)?;

    // A bad path fails every point; surface it once instead.
    let mut probe = serde_json::to_value(base)?;
    apply_override(&mut probe, &variable.name, Value::String(variable.min.to_string()))?;

    let specs: Vec<ScenarioSpec> = values
        .iter()
        .map(|v| {
            let mut overrides = Map::new();
            overrides.insert(variable.name.clone(), Value::String(v.to_string()));
            ScenarioSpec {
                name: format!("{} = {}", variable.name, v),
                overrides,
            }
        })
        .collect();

    let outcomes: Vec<CapTableResult<ScenarioResult>> = specs
        .par_iter()
        .map(|spec| run_scenario(base, spec))
        .collect();

    let mut warnings: Vec<String> = Vec::new();
    let mut points = Vec::with_capacity(values.len());
    for ((value, spec), outcome) in values.iter().zip(&specs).zip(outcomes) {
        match outcome {
            Ok(result) => points.push(SensitivityPoint {
                value: *value,
                result,
            }),
            Err(e) => {
                let msg = format!("{} failed: {e}", spec.name);
                log::warn!("{msg}");
                warnings.push(msg);
            }
        }
    }

    let output = SensitivityOutput {
        variable: variable.name.clone(),
        points,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "One-way sensitivity sweep",
        variable,
        warnings,
        elapsed,
        output,
    ))
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::projections::{ProjectionSeries, ProjectionYear};
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn base() -> ModelInput {
        ModelInput {
            projections: ProjectionSeries::new(vec![
                ProjectionYear {
                    year: 2026,
                    arr: dec!(10_000_000),
                    ebitda: dec!(-2_000_000),
                },
                ProjectionYear {
                    year: 2030,
                    arr: dec!(40_000_000),
                    ebitda: dec!(12_000_000),
                },
            ]),
            ..ModelInput::default()
        }
    }

    fn overrides(v: Value) -> Map<String, Value> {
        match v {
            Value::Object(m) => m,
            _ => Map::new(),
        }
    }

    #[test]
    fn test_override_decimal_with_number() {
        let input = apply_overrides(
            &base(),
            &overrides(json!({ "assumptions.exit.arr_multiple": 10 })),
        )
        .unwrap();
        assert_eq!(input.assumptions.exit.arr_multiple, dec!(10));
    }

    #[test]
    fn test_override_array_element_and_integer() {
        let input = apply_overrides(
            &base(),
            &overrides(json!({
                "assumptions.convertible_notes.1.discount": "0.25",
                "assumptions.exit.exit_year": "2031",
            })),
        )
        .unwrap();
        assert_eq!(input.assumptions.convertible_notes[1].discount, dec!(0.25));
        assert_eq!(input.assumptions.exit.exit_year, 2031);
    }

    #[test]
    fn test_override_leaves_base_untouched() {
        let b = base();
        let _ = apply_overrides(&b, &overrides(json!({ "assumptions.option_pool_target": "0.2" })))
            .unwrap();
        assert_eq!(b.assumptions.option_pool_target, dec!(0.15));
    }

    #[test]
    fn test_unknown_path_rejected() {
        let err = apply_overrides(&base(), &overrides(json!({ "assumptions.nope": 1 }))).unwrap_err();
        assert!(err.to_string().contains("assumptions.nope"));
    }

    #[test]
    fn test_scenarios_keep_order_and_skip_failures() {
        let specs = vec![
            ScenarioSpec {
                name: "Base".into(),
                overrides: Map::new(),
            },
            ScenarioSpec {
                name: "Broken".into(),
                overrides: overrides(json!({ "assumptions.hybrid.debt_fraction": "0.5" })),
            },
            ScenarioSpec {
                name: "Rich exit".into(),
                overrides: overrides(json!({ "assumptions.exit.arr_multiple": "12" })),
            },
        ];
        let out = run_scenarios(&base(), &specs).unwrap();
        let names: Vec<&str> = out.result.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["Base", "Rich exit"]);
        assert_eq!(out.warnings.len(), 1);
        assert!(out.warnings[0].contains("Broken"));
        assert!(out.result[1].exit_valuation > out.result[0].exit_valuation);
    }

    #[test]
    fn test_sweep_includes_max() {
        let var = SensitivityVariable {
            name: "x".into(),
            min: dec!(1),
            max: dec!(2),
            step: dec!(0.4),
        };
        assert_eq!(
            generate_sweep_values(&var).unwrap(),
            vec![dec!(1), dec!(1.4), dec!(1.8), dec!(2)]
        );
    }

    #[test]
    fn test_exit_multiple_sensitivity_is_monotonic() {
        let var = SensitivityVariable {
            name: "assumptions.exit.ebitda_multiple".into(),
            min: dec!(15),
            max: dec!(35),
            step: dec!(5),
        };
        let out = run_sensitivity(&base(), &var).unwrap();
        assert_eq!(out.result.points.len(), 5);
        let proceeds: Vec<Money> = out
            .result
            .points
            .iter()
            .map(|p| p.result.founder_proceeds)
            .collect();
        assert!(proceeds.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_sensitivity_on_unknown_path_fails() {
        let var = SensitivityVariable {
            name: "assumptions.exit.nope".into(),
            min: dec!(1),
            max: dec!(2),
            step: dec!(1),
        };
        assert!(run_sensitivity(&base(), &var).is_err());
    }
}
