use serde::{Deserialize, Serialize};

use crate::error::CapTableError;
use crate::types::{Money, Multiple};
use crate::CapTableResult;

/// Which valuation basis the exit (or financing) is priced on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValuationBasis {
    Arr,
    Ebitda,
    /// Take whichever of the two bases is larger. Ties resolve to ARR.
    HigherOfArrOrEbitda,
}

/// The method that produced the selected valuation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValuationMethod {
    Arr,
    Ebitda,
    HigherOfArrOrEbitdaArrSelected,
    HigherOfArrOrEbitdaEbitdaSelected,
}

impl ValuationMethod {
    pub fn label(&self) -> &'static str {
        match self {
            ValuationMethod::Arr => "ARR",
            ValuationMethod::Ebitda => "EBITDA",
            ValuationMethod::HigherOfArrOrEbitdaArrSelected => "Higher of ARR/EBITDA (ARR Selected)",
            ValuationMethod::HigherOfArrOrEbitdaEbitdaSelected => {
                "Higher of ARR/EBITDA (EBITDA Selected)"
            }
        }
    }
}

/// Exit valuation breakdown handed to the waterfall and the display layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExitValuation {
    pub arr_valuation: Money,
    pub ebitda_valuation: Money,
    pub final_valuation: Money,
    pub method: ValuationMethod,
    pub method_label: String,
}

/// Value the company on ARR and EBITDA multiples and pick one according to `basis`.
pub fn select_valuation(
    arr_value: Money,
    ebitda_value: Money,
    arr_multiple: Multiple,
    ebitda_multiple: Multiple,
    basis: ValuationBasis,
) -> CapTableResult<ExitValuation> {
    let arr_valuation = apply_multiple(arr_value, arr_multiple, "exit.arr_multiple")?;
    let ebitda_valuation = apply_multiple(ebitda_value, ebitda_multiple, "exit.ebitda_multiple")?;

    let (final_valuation, method) = match basis {
        ValuationBasis::Arr => (arr_valuation, ValuationMethod::Arr),
        ValuationBasis::Ebitda => (ebitda_valuation, ValuationMethod::Ebitda),
        ValuationBasis::HigherOfArrOrEbitda => {
            if arr_valuation >= ebitda_valuation {
                (arr_valuation, ValuationMethod::HigherOfArrOrEbitdaArrSelected)
            } else {
                (
                    ebitda_valuation,
                    ValuationMethod::HigherOfArrOrEbitdaEbitdaSelected,
                )
            }
        }
    };

    Ok(ExitValuation {
        arr_valuation,
        ebitda_valuation,
        final_valuation,
        method,
        method_label: method.label().to_string(),
    })
}

fn apply_multiple(value: Money, multiple: Multiple, field: &str) -> CapTableResult<Money> {
    value.checked_mul(multiple).ok_or_else(|| {
        CapTableError::configuration(field, format!("{value} x {multiple} overflows"))
    })
}
