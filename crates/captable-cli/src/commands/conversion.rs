use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;

use captable_core::cap_table::{convert_note, ConversionInput};

use crate::input;

/// Arguments for a standalone note conversion
#[derive(Args)]
pub struct ConvertNoteArgs {
    /// Path to JSON/YAML input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Note face value
    #[arg(long)]
    pub principal: Option<Decimal>,

    /// Annual roll-up interest rate (e.g. 0.08)
    #[arg(long)]
    pub rate: Option<Decimal>,

    /// Whole years from issue to conversion
    #[arg(long)]
    pub years: Option<i32>,

    /// Conversion discount (e.g. 0.20)
    #[arg(long)]
    pub discount: Option<Decimal>,

    /// Price per share paid by the round's equity investors
    #[arg(long)]
    pub price: Option<Decimal>,
}

pub fn run_convert_note(args: ConvertNoteArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let conversion_input: ConversionInput = if let Some(ref path) = args.input {
        input::file::read_input(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        serde_json::from_value(data)?
    } else {
        ConversionInput {
            label: "Note".into(),
            principal: args
                .principal
                .ok_or("--principal is required (or provide --input)")?,
            annual_rate: args.rate.ok_or("--rate is required (or provide --input)")?,
            years_outstanding: args.years.ok_or("--years is required (or provide --input)")?,
            discount: args.discount.unwrap_or(Decimal::ZERO),
            reference_price_per_share: args
                .price
                .ok_or("--price is required (or provide --input)")?,
        }
    };

    let result = convert_note(&conversion_input)?;
    Ok(serde_json::to_value(result)?)
}
