#![cfg(feature = "scenarios")]

use captable_core::model::ModelInput;
use captable_core::projections::{ProjectionSeries, ProjectionYear};
use captable_core::scenarios::{run_scenarios, run_sensitivity, ScenarioSpec};
use captable_core::SensitivityVariable;
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

#[test]
fn test_scenarios_from_json() {
    let specs: Vec<ScenarioSpec> = serde_json::from_value(json!([
        { "name": "Base" },
        { "name": "Lower pool", "overrides": { "assumptions.option_pool_target": "0.10" } },
        { "name": "Cheap round", "overrides": { "assumptions.hybrid.pre_money_arr_multiple": 4 } }
    ]))
    .unwrap();

    let out = run_scenarios(&base(), &specs).unwrap();
    assert_eq!(out.result.len(), 3);
    assert!(out.warnings.is_empty());

    let (base_row, lower_pool, cheap) = (&out.result[0], &out.result[1], &out.result[2]);
    assert!(lower_pool.founder_ownership > base_row.founder_ownership);
    assert!(cheap.founder_ownership < base_row.founder_ownership);
    assert_eq!(cheap.hybrid_pre_money_valuation, dec!(40_000_000));
}

#[test]
fn test_parallel_runs_match_sequential() {
    let specs: Vec<ScenarioSpec> = (0..8)
        .map(|i| ScenarioSpec {
            name: format!("s{i}"),
            overrides: serde_json::from_value(json!({
                "assumptions.exit.arr_multiple": (6 + i).to_string()
            }))
            .unwrap(),
        })
        .collect();

    let parallel = run_scenarios(&base(), &specs).unwrap().result;
    for (spec, row) in specs.iter().zip(&parallel) {
        let single = run_scenarios(&base(), std::slice::from_ref(spec)).unwrap().result;
        assert_eq!(&single[0], row);
    }
}

#[test]
fn test_pool_target_sensitivity() {
    let var = SensitivityVariable {
        name: "assumptions.option_pool_target".into(),
        min: dec!(0.05),
        max: dec!(0.25),
        step: dec!(0.05),
    };
    let out = run_sensitivity(&base(), &var).unwrap();
    assert_eq!(out.result.points.len(), 5);
    let ownership: Vec<_> = out
        .result
        .points
        .iter()
        .map(|p| p.result.founder_ownership)
        .collect();
    assert!(ownership.windows(2).all(|w| w[0] > w[1]));
}
