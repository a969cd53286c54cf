use rust_decimal::Decimal;
use thiserror::Error;

/// Errors raised by the engine.
///
/// A zero or negative pricing denominator is a configuration fault but is reported as
/// `DivisionByZero` so the failing formula is named. Use [`CapTableError::is_configuration`]
/// to match both.
#[derive(Debug, Error)]
pub enum CapTableError {
    /// Fatal: the assumption set cannot produce a consistent ledger.
    #[error("Configuration error: {field}: {reason}")]
    Configuration { field: String, reason: String },

    /// Fatal: a pricing formula would divide by a zero or negative quantity.
    #[error("Division by zero in {context}")]
    DivisionByZero { context: String },

    /// Recoverable: debt at exit exceeds the exit valuation. Equity is clamped to zero.
    #[error(
        "Negative proceeds: exit valuation {exit_valuation} does not cover debt of {total_debt} \
         (shortfall {shortfall}); equity proceeds clamped to zero"
    )]
    NegativeProceeds {
        exit_valuation: Decimal,
        total_debt: Decimal,
        shortfall: Decimal,
    },

    /// Recoverable: a projection year was requested that the collaborator did not supply.
    #[error("Missing input: {metric} for {year} not present in projections; treated as 0")]
    MissingInput { metric: String, year: i32 },

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl CapTableError {
    pub fn configuration(field: impl Into<String>, reason: impl Into<String>) -> Self {
        CapTableError::Configuration {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// True for `Configuration` and `DivisionByZero`.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            CapTableError::Configuration { .. } | CapTableError::DivisionByZero { .. }
        )
    }

    /// Recoverable errors are reported as warnings and never abort a run.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            CapTableError::NegativeProceeds { .. } | CapTableError::MissingInput { .. }
        )
    }
}

impl From<serde_json::Error> for CapTableError {
    fn from(e: serde_json::Error) -> Self {
        CapTableError::Serialization(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_recoverable_classification() {
        let fatal = CapTableError::configuration("hybrid", "fractions do not sum to 1");
        assert!(!fatal.is_recoverable());

        let missing = CapTableError::MissingInput {
            metric: "ARR".into(),
            year: 2031,
        };
        assert!(missing.is_recoverable());

        let shortfall = CapTableError::NegativeProceeds {
            exit_valuation: dec!(5_000_000),
            total_debt: dec!(8_000_000),
            shortfall: dec!(3_000_000),
        };
        assert!(shortfall.is_recoverable());
        assert!(shortfall.to_string().contains("3000000"));
        assert!(!shortfall.is_configuration());
    }

    #[test]
    fn test_zero_denominator_is_a_configuration_fault() {
        let div = CapTableError::DivisionByZero {
            context: "hybrid price per share".into(),
        };
        assert!(div.is_configuration());
        assert!(!div.is_recoverable());
        assert!(CapTableError::configuration("exit", "bad").is_configuration());
    }
}
