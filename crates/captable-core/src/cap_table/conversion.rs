use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::error::CapTableError;
use crate::time_value::rolled_up_balance;
use crate::types::{with_metadata, ComputationOutput, Money, Rate, Shares, Year};
use crate::CapTableResult;

// ─── Conversion ──────────────────────────────────────────────────────────────

/// Input for converting one note at the hybrid close.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionInput {
    #[serde(default)]
    pub label: String,
    /// Note face value.
    pub principal: Money,
    /// Annual roll-up interest rate (e.g. 0.08 = 8%).
    pub annual_rate: Rate,
    /// Whole years between issue and conversion.
    pub years_outstanding: Year,
    /// Conversion discount (e.g. 0.20 = 20%).
    pub discount: Rate,
    /// Price per share paid by the round's equity investors.
    pub reference_price_per_share: Money,
}

/// Result of converting one note.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoteConversion {
    pub label: String,
    pub principal: Money,
    pub years_outstanding: Year,
    /// principal * (1 + rate)^years
    pub accrued_value: Money,
    /// accrued_value * (1 - discount)
    pub converted_capital: Money,
    /// reference price * (1 - discount)
    pub conversion_price: Money,
    pub shares: Shares,
}

/// Convert a note into shares.
///
/// The discount is applied twice: it shrinks the converting capital and it also
/// lowers the price that capital buys at. Holders therefore receive exactly
/// `accrued_value / reference_price` shares.
pub fn calculate_conversion(input: &ConversionInput) -> CapTableResult<NoteConversion> {
    if input.principal < Decimal::ZERO {
        return Err(CapTableError::configuration(
            "principal",
            "Principal cannot be negative",
        ));
    }
    if input.discount < Decimal::ZERO || input.discount >= Decimal::ONE {
        return Err(CapTableError::configuration(
            "discount",
            "Discount must be in [0, 1)",
        ));
    }
    if input.years_outstanding < 0 {
        return Err(CapTableError::configuration(
            "years_outstanding",
            "Note cannot convert before it is issued",
        ));
    }
    if input.reference_price_per_share <= Decimal::ZERO {
        return Err(CapTableError::DivisionByZero {
            context: format!(
                "conversion of {}: reference price per share is {}",
                input.label, input.reference_price_per_share
            ),
        });
    }

    let accrued_value = rolled_up_balance(
        input.principal,
        input.annual_rate,
        input.years_outstanding,
    )?;
    let keep = Decimal::ONE - input.discount;
    let converted_capital = accrued_value * keep;
    let conversion_price = input.reference_price_per_share * keep;
    let shares = converted_capital / conversion_price;

    log::debug!(
        "{}: accrued {} over {}y converts to {} shares at {}",
        input.label,
        accrued_value,
        input.years_outstanding,
        shares,
        conversion_price
    );

    Ok(NoteConversion {
        label: input.label.clone(),
        principal: input.principal,
        years_outstanding: input.years_outstanding,
        accrued_value,
        converted_capital,
        conversion_price,
        shares,
    })
}

/// Standalone conversion with the usual output envelope.
pub fn convert_note(input: &ConversionInput) -> CapTableResult<ComputationOutput<NoteConversion>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    if input.principal.is_zero() {
        warnings.push("Zero principal; conversion issues no shares".into());
    }
    if input.discount.is_zero() {
        warnings.push("Zero discount; converting at the reference price".into());
    }

    let output = calculate_conversion(input)?;

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Convertible Note Conversion (rolled-up interest, discount on capital and price)",
        &serde_json::json!({
            "principal": input.principal.to_string(),
            "annual_rate": input.annual_rate.to_string(),
            "years_outstanding": input.years_outstanding,
            "discount": input.discount.to_string(),
            "reference_price_per_share": input.reference_price_per_share.to_string(),
        }),
        warnings,
        elapsed,
        output,
    ))
}

// ─── Tests ───────────────────────────────────────────────────────────────────
