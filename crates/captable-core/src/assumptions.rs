use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::CapTableError;
use crate::types::{Money, Multiple, Rate, Shares, Year};
use crate::valuation::ValuationBasis;
use crate::CapTableResult;

/// Tolerance for fraction sums (hybrid tranche split).
pub const FRACTION_TOLERANCE: Decimal = dec!(0.000001);

// ─── Round assumptions ───────────────────────────────────────────────────────

/// Incorporation round: founders buy the initial share count outright.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FounderRoundAssumptions {
    pub year: Year,
    pub investment: Money,
    pub shares: Shares,
}

/// A historical priced round, described the way it was announced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricedRoundAssumptions {
    pub year: Year,
    pub investment: Money,
    pub post_money_valuation: Money,
}

impl PricedRoundAssumptions {
    pub fn pre_money_valuation(&self) -> Money {
        self.post_money_valuation - self.investment
    }
}

/// Terms of a convertible loan note issued ahead of the hybrid round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConvertibleNoteTerms {
    pub label: String,
    /// Face value
    pub principal: Money,
    /// Annual roll-up interest rate
    pub annual_rate: Rate,
    pub issue_year: Year,
    pub maturity_year: Year,
    /// Conversion discount (0.20 = 20%)
    pub discount: Rate,
}

impl ConvertibleNoteTerms {
    /// A note converts at the hybrid close only if it has been issued and has not
    /// yet matured. A matured note stays on the books as debt.
    pub fn converts_at(&self, close_year: Year) -> bool {
        self.issue_year <= close_year && close_year <= self.maturity_year
    }
}

/// How an interest-bearing tranche is repaid at exit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepaymentProfile {
    /// Interest compounds annually and is repaid with principal at exit.
    RolledUp,
    /// Interest is serviced in cash; only principal is outstanding at exit.
    Bullet,
}

/// Late-stage round split between equity, straight debt and a convertible tranche.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HybridRoundAssumptions {
    pub close_date: NaiveDate,
    pub amount: Money,
    pub equity_fraction: Rate,
    pub debt_fraction: Rate,
    pub convertible_fraction: Rate,
    /// Pre-money valuation = ARR at close * this multiple
    pub pre_money_arr_multiple: Multiple,
    pub debt_interest_rate: Rate,
    pub debt_repayment: RepaymentProfile,
    pub debt_term_years: Decimal,
    pub convertible_interest_rate: Rate,
    pub convertible_repayment: RepaymentProfile,
    pub convertible_term_years: Decimal,
}

impl HybridRoundAssumptions {
    pub fn close_year(&self) -> Year {
        self.close_date.year()
    }

    pub fn equity_tranche(&self) -> Money {
        self.amount * self.equity_fraction
    }

    pub fn debt_tranche(&self) -> Money {
        self.amount * self.debt_fraction
    }

    pub fn convertible_tranche(&self) -> Money {
        self.amount * self.convertible_fraction
    }
}

/// Liquidity event assumptions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExitAssumptions {
    pub exit_year: Year,
    pub valuation_basis: ValuationBasis,
    pub arr_multiple: Multiple,
    pub ebitda_multiple: Multiple,
}

/// The complete, immutable assumption set for one engine run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapTableAssumptions {
    pub founder: FounderRoundAssumptions,
    pub seed: PricedRoundAssumptions,
    pub series_a: PricedRoundAssumptions,
    pub series_b: PricedRoundAssumptions,
    pub convertible_notes: [ConvertibleNoteTerms; 2],
    pub hybrid: HybridRoundAssumptions,
    pub exit: ExitAssumptions,
    /// Option pool as a fraction of fully diluted shares after each top-up
    pub option_pool_target: Rate,
}

impl Default for CapTableAssumptions {
    fn default() -> Self {
        Self {
            founder: FounderRoundAssumptions {
                year: 2018,
                investment: dec!(661_000),
                shares: dec!(10_000_000),
            },
            seed: PricedRoundAssumptions {
                year: 2019,
                investment: dec!(3_500_000),
                post_money_valuation: dec!(20_000_000),
            },
            series_a: PricedRoundAssumptions {
                year: 2020,
                investment: dec!(10_300_000),
                post_money_valuation: dec!(50_000_000),
            },
            series_b: PricedRoundAssumptions {
                year: 2021,
                investment: dec!(36_900_000),
                post_money_valuation: dec!(166_000_000),
            },
            convertible_notes: [
                ConvertibleNoteTerms {
                    label: "CLN 2024".into(),
                    principal: dec!(6_000_000),
                    annual_rate: dec!(0.08),
                    issue_year: 2024,
                    maturity_year: 2029,
                    discount: dec!(0.20),
                },
                ConvertibleNoteTerms {
                    label: "CLN 2025".into(),
                    principal: dec!(4_000_000),
                    annual_rate: dec!(0.08),
                    issue_year: 2025,
                    maturity_year: 2030,
                    discount: dec!(0.20),
                },
            ],
            hybrid: HybridRoundAssumptions {
                close_date: NaiveDate::from_ymd_opt(2026, 6, 30).unwrap_or_default(),
                amount: dec!(15_000_000),
                equity_fraction: dec!(0.60),
                debt_fraction: dec!(0.20),
                convertible_fraction: dec!(0.20),
                pre_money_arr_multiple: dec!(6.0),
                debt_interest_rate: dec!(0.10),
                debt_repayment: RepaymentProfile::RolledUp,
                debt_term_years: dec!(5),
                convertible_interest_rate: dec!(0.08),
                convertible_repayment: RepaymentProfile::RolledUp,
                convertible_term_years: dec!(5),
            },
            exit: ExitAssumptions {
                exit_year: 2030,
                valuation_basis: ValuationBasis::HigherOfArrOrEbitda,
                arr_multiple: dec!(8.5),
                ebitda_multiple: dec!(20.0),
            },
            option_pool_target: dec!(0.15),
        }
    }
}

impl CapTableAssumptions {
    pub fn notes(&self) -> &[ConvertibleNoteTerms] {
        &self.convertible_notes
    }

    /// Reject assumption sets that cannot produce a consistent ledger.
    pub fn validate(&self) -> CapTableResult<()> {
        // ── Option pool ──────────────────────────────────────────────
        if self.option_pool_target < Decimal::ZERO || self.option_pool_target >= Decimal::ONE {
            return Err(CapTableError::configuration(
                "option_pool_target",
                "Option pool target must be in [0, 1)",
            ));
        }

        // ── Founder round ────────────────────────────────────────────
        if self.founder.shares <= Decimal::ZERO {
            return Err(CapTableError::configuration(
                "founder.shares",
                "Founder shares must be positive",
            ));
        }
        if self.founder.investment < Decimal::ZERO {
            return Err(CapTableError::configuration(
                "founder.investment",
                "Founder investment cannot be negative",
            ));
        }

        // ── Priced rounds ────────────────────────────────────────────
        for (name, round) in [
            ("seed", &self.seed),
            ("series_a", &self.series_a),
            ("series_b", &self.series_b),
        ] {
            if round.investment <= Decimal::ZERO {
                return Err(CapTableError::configuration(
                    format!("{name}.investment"),
                    "Investment must be positive",
                ));
            }
            if round.pre_money_valuation() <= Decimal::ZERO {
                return Err(CapTableError::configuration(
                    format!("{name}.post_money_valuation"),
                    format!(
                        "Post-money {} must exceed investment {} (pre-money resolves to {})",
                        round.post_money_valuation,
                        round.investment,
                        round.pre_money_valuation()
                    ),
                ));
            }
        }

        // ── Round chronology ─────────────────────────────────────────
        let close_year = self.hybrid.close_year();
        let mut chronology: Vec<(String, Year)> = vec![
            ("founder.year".into(), self.founder.year),
            ("seed.year".into(), self.seed.year),
            ("series_a.year".into(), self.series_a.year),
            ("series_b.year".into(), self.series_b.year),
        ];
        for note in self.notes() {
            chronology.push((format!("{}.issue_year", note.label), note.issue_year));
        }
        chronology.push(("hybrid.close_date".into(), close_year));
        for pair in chronology.windows(2) {
            if pair[1].1 < pair[0].1 {
                return Err(CapTableError::configuration(
                    pair[1].0.clone(),
                    format!(
                        "Round year {} precedes {} ({})",
                        pair[1].1, pair[0].0, pair[0].1
                    ),
                ));
            }
        }

        // ── Convertible notes ────────────────────────────────────────
        for note in self.notes() {
            if note.principal < Decimal::ZERO {
                return Err(CapTableError::configuration(
                    format!("{}.principal", note.label),
                    "Principal cannot be negative",
                ));
            }
            if note.annual_rate <= -Decimal::ONE {
                return Err(CapTableError::configuration(
                    format!("{}.annual_rate", note.label),
                    "Interest rate must be greater than -100%",
                ));
            }
            if note.discount < Decimal::ZERO || note.discount >= Decimal::ONE {
                return Err(CapTableError::configuration(
                    format!("{}.discount", note.label),
                    "Discount must be in [0, 1)",
                ));
            }
            if note.maturity_year < note.issue_year {
                return Err(CapTableError::configuration(
                    format!("{}.maturity_year", note.label),
                    "Maturity cannot precede issue",
                ));
            }
        }

        // ── Hybrid round ─────────────────────────────────────────────
        let h = &self.hybrid;
        for (field, fraction) in [
            ("hybrid.equity_fraction", h.equity_fraction),
            ("hybrid.debt_fraction", h.debt_fraction),
            ("hybrid.convertible_fraction", h.convertible_fraction),
        ] {
            if fraction < Decimal::ZERO {
                return Err(CapTableError::configuration(field, "Fraction cannot be negative"));
            }
        }
        let fraction_sum = h.equity_fraction + h.debt_fraction + h.convertible_fraction;
        if (fraction_sum - Decimal::ONE).abs() > FRACTION_TOLERANCE {
            return Err(CapTableError::configuration(
                "hybrid",
                format!("Equity, debt and convertible fractions must sum to 1 (got {fraction_sum})"),
            ));
        }
        if h.amount < Decimal::ZERO {
            return Err(CapTableError::configuration(
                "hybrid.amount",
                "Round amount cannot be negative",
            ));
        }
        if h.pre_money_arr_multiple <= Decimal::ZERO {
            return Err(CapTableError::configuration(
                "hybrid.pre_money_arr_multiple",
                "Pre-money ARR multiple must be positive",
            ));
        }
        for (field, rate) in [
            ("hybrid.debt_interest_rate", h.debt_interest_rate),
            ("hybrid.convertible_interest_rate", h.convertible_interest_rate),
        ] {
            if rate <= -Decimal::ONE {
                return Err(CapTableError::configuration(
                    field,
                    "Interest rate must be greater than -100%",
                ));
            }
        }

        // ── Exit ─────────────────────────────────────────────────────
        if self.exit.arr_multiple < Decimal::ZERO || self.exit.ebitda_multiple < Decimal::ZERO {
            return Err(CapTableError::configuration(
                "exit",
                "Exit multiples cannot be negative",
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(CapTableAssumptions::default().validate().is_ok());
    }

    #[test]
    fn test_default_hybrid_close_year() {
        assert_eq!(CapTableAssumptions::default().hybrid.close_year(), 2026);
    }

    #[test]
    fn test_fractions_must_sum_to_one() {
        let mut a = CapTableAssumptions::default();
        a.hybrid.debt_fraction = dec!(0.25);
        let err = a.validate().unwrap_err();
        assert!(matches!(err, CapTableError::Configuration { ref field, .. } if field == "hybrid"));
    }

    #[test]
    fn test_fraction_sum_within_tolerance_accepted() {
        let mut a = CapTableAssumptions::default();
        a.hybrid.equity_fraction = dec!(0.6000000001);
        assert!(a.validate().is_ok());
    }

    #[test]
    fn test_non_positive_pre_money_rejected() {
        let mut a = CapTableAssumptions::default();
        a.series_a.post_money_valuation = a.series_a.investment;
        assert!(a.validate().is_err());
    }

    #[test]
    fn test_pool_target_bounds() {
        let mut a = CapTableAssumptions::default();
        a.option_pool_target = Decimal::ONE;
        assert!(a.validate().is_err());
        a.option_pool_target = Decimal::ZERO;
        assert!(a.validate().is_ok());
    }

    #[test]
    fn test_out_of_order_years_rejected() {
        let mut a = CapTableAssumptions::default();
        a.series_b.year = 2019;
        let err = a.validate().unwrap_err();
        assert!(err.to_string().contains("series_b.year"));
    }

    #[test]
    fn test_note_issued_after_close_rejected() {
        let mut a = CapTableAssumptions::default();
        a.convertible_notes[1].issue_year = 2027;
        a.convertible_notes[1].maturity_year = 2032;
        assert!(a.validate().is_err());
    }

    #[test]
    fn test_note_conversion_window() {
        let note = &CapTableAssumptions::default().convertible_notes[0];
        assert!(note.converts_at(2026));
        assert!(note.converts_at(2029));
        assert!(!note.converts_at(2030));
        assert!(!note.converts_at(2023));
    }

    #[test]
    fn test_assumptions_json_round_trip_preserves_basis() {
        let a = CapTableAssumptions::default();
        let json = serde_json::to_value(&a).unwrap();
        assert_eq!(json["exit"]["valuation_basis"], "higher_of_arr_or_ebitda");
        assert_eq!(json["hybrid"]["debt_repayment"], "rolled_up");
        let back: CapTableAssumptions = serde_json::from_value(json).unwrap();
        assert_eq!(back, a);
    }
}
