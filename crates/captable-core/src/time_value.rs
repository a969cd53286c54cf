use rust_decimal::Decimal;
use rust_decimal::MathematicalOps;

use crate::error::CapTableError;
use crate::types::{Money, Multiple, Rate, Year};
use crate::CapTableResult;

/// Balance of an instrument whose interest is rolled up (compounded annually) and
/// paid at the end: `principal * (1 + rate)^years`.
pub fn rolled_up_balance(principal: Money, rate: Rate, years: Year) -> CapTableResult<Money> {
    if rate <= -Decimal::ONE {
        return Err(CapTableError::configuration(
            "rate",
            "Interest rate must be greater than -100%",
        ));
    }
    if years < 0 {
        return Err(CapTableError::configuration(
            "years",
            format!("Cannot roll interest over a negative period ({years} years)"),
        ));
    }

    let growth = (Decimal::ONE + rate)
        .checked_powi(i64::from(years))
        .ok_or_else(|| {
            CapTableError::configuration(
                "rate",
                format!("Compounding {rate} over {years} years overflows"),
            )
        })?;

    principal.checked_mul(growth).ok_or_else(|| {
        CapTableError::configuration(
            "principal",
            format!("Rolling {principal} at {rate} over {years} years overflows"),
        )
    })
}

/// Multiple on invested capital. Zero when nothing was invested.
pub fn moic(proceeds: Money, invested: Money) -> Multiple {
    if invested.is_zero() {
        Decimal::ZERO
    } else {
        proceeds / invested
    }
}

/// Annualised return implied by a multiple over a holding period:
/// `moic^(1/years) - 1`.
///
/// A zero holding period or a non-positive multiple reports 0 rather than failing.
pub fn annualised_irr(moic: Multiple, years_held: Year) -> Rate {
    if years_held <= 0 || moic <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    let exponent = Decimal::ONE / Decimal::from(years_held);
    match moic.checked_powd(exponent) {
        Some(root) => root - Decimal::ONE,
        None => Decimal::ZERO,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_rolled_up_two_years() {
        // 6M at 8% for two years = 6M * 1.1664
        let bal = rolled_up_balance(dec!(6_000_000), dec!(0.08), 2).unwrap();
        assert_eq!(bal, dec!(6_998_400));
    }

    #[test]
    fn test_rolled_up_zero_years_is_principal() {
        let bal = rolled_up_balance(dec!(4_000_000), dec!(0.08), 0).unwrap();
        assert_eq!(bal, dec!(4_000_000));
    }

    #[test]
    fn test_rolled_up_rejects_negative_period() {
        assert!(rolled_up_balance(dec!(100), dec!(0.05), -1).is_err());
    }

    #[test]
    fn test_rolled_up_rejects_total_loss_rate() {
        assert!(rolled_up_balance(dec!(100), dec!(-1), 3).is_err());
    }

    #[test]
    fn test_rolled_up_overflow_is_an_error() {
        let err = rolled_up_balance(Decimal::MAX, dec!(0.08), 1).unwrap_err();
        assert!(matches!(err, CapTableError::Configuration { .. }), "got {err:?}");
    }

    #[test]
    fn test_moic_zero_invested() {
        assert_eq!(moic(dec!(1_000), Decimal::ZERO), Decimal::ZERO);
        assert_eq!(moic(dec!(300), dec!(100)), dec!(3));
    }

    #[test]
    fn test_irr_known_answer() {
        // 2x over 1 year = 100%
        let irr = annualised_irr(dec!(2), 1);
        assert!((irr - dec!(1)).abs() < dec!(0.000001), "got {irr}");

        // 1.21x over 2 years = 10%
        let irr = annualised_irr(dec!(1.21), 2);
        assert!((irr - dec!(0.10)).abs() < dec!(0.000001), "got {irr}");
    }

    #[test]
    fn test_irr_degenerate_cases_report_zero() {
        assert_eq!(annualised_irr(dec!(3), 0), Decimal::ZERO);
        assert_eq!(annualised_irr(Decimal::ZERO, 5), Decimal::ZERO);
        assert_eq!(annualised_irr(dec!(-0.5), 5), Decimal::ZERO);
    }

    #[test]
    fn test_irr_loss_is_negative() {
        let irr = annualised_irr(dec!(0.5), 1);
        assert!((irr + dec!(0.5)).abs() < dec!(0.000001), "got {irr}");
    }
}
