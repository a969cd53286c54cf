use clap::{Args, ValueEnum};
use rust_decimal::Decimal;
use serde_json::Value;

use captable_core::valuation::{select_valuation, ValuationBasis};

/// Valuation basis as accepted on the command line
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum BasisArg {
    Arr,
    Ebitda,
    HigherOf,
}

impl From<BasisArg> for ValuationBasis {
    fn from(b: BasisArg) -> Self {
        match b {
            BasisArg::Arr => ValuationBasis::Arr,
            BasisArg::Ebitda => ValuationBasis::Ebitda,
            BasisArg::HigherOf => ValuationBasis::HigherOfArrOrEbitda,
        }
    }
}

/// Arguments for selecting an exit valuation
#[derive(Args)]
pub struct ExitValuationArgs {
    /// ARR in the exit year
    #[arg(long)]
    pub arr: Decimal,

    /// EBITDA in the exit year
    #[arg(long, allow_hyphen_values = true)]
    pub ebitda: Decimal,

    /// ARR multiple
    #[arg(long, default_value = "8.5")]
    pub arr_multiple: Decimal,

    /// EBITDA multiple
    #[arg(long, default_value = "20")]
    pub ebitda_multiple: Decimal,

    /// Valuation basis
    #[arg(long, value_enum, default_value = "higher-of")]
    pub basis: BasisArg,
}

pub fn run_exit_valuation(args: ExitValuationArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let valuation = select_valuation(
        args.arr,
        args.ebitda,
        args.arr_multiple,
        args.ebitda_multiple,
        args.basis.into(),
    )?;
    Ok(serde_json::to_value(valuation)?)
}
