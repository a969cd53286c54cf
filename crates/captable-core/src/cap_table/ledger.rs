use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::conversion::NoteConversion;
use super::{approx_eq, SHARE_TOLERANCE};
use crate::error::CapTableError;
use crate::types::{Money, Rate, Shares, Year};
use crate::CapTableResult;

// ─── Enums ───────────────────────────────────────────────────────────────────

/// The fixed identities a financing event can take.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoundKind {
    Founder,
    Seed,
    SeriesA,
    SeriesB,
    /// Registers a note's face value. Issues no shares.
    ConvertibleNote,
    /// Equity + debt + convertible round that also converts outstanding notes.
    Hybrid,
}

impl RoundKind {
    pub fn label(&self) -> &'static str {
        match self {
            RoundKind::Founder => "Founder",
            RoundKind::Seed => "Seed",
            RoundKind::SeriesA => "Series A",
            RoundKind::SeriesB => "Series B",
            RoundKind::ConvertibleNote => "CLN",
            RoundKind::Hybrid => "Hybrid",
        }
    }
}

/// Share classes tracked by the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Stakeholder {
    Founder,
    Seed,
    SeriesA,
    SeriesB,
    ConvertibleHolder,
    LateRound,
    OptionPool,
}

impl Stakeholder {
    pub const ALL: [Stakeholder; 7] = [
        Stakeholder::Founder,
        Stakeholder::Seed,
        Stakeholder::SeriesA,
        Stakeholder::SeriesB,
        Stakeholder::ConvertibleHolder,
        Stakeholder::LateRound,
        Stakeholder::OptionPool,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Stakeholder::Founder => "Founder",
            Stakeholder::Seed => "Seed",
            Stakeholder::SeriesA => "Series A",
            Stakeholder::SeriesB => "Series B",
            Stakeholder::ConvertibleHolder => "CLN Holder",
            Stakeholder::LateRound => "Late Round",
            Stakeholder::OptionPool => "Option Pool",
        }
    }
}

/// Cumulative shares per stakeholder class.
pub type Holdings = BTreeMap<Stakeholder, Shares>;

// ─── Round ───────────────────────────────────────────────────────────────────

/// One financing event and the cap table immediately after it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Round {
    pub year: Year,
    pub kind: RoundKind,
    pub label: String,
    /// Cash invested for shares this round. Zero for note registrations.
    pub investment: Money,
    pub pre_money_valuation: Money,
    pub post_money_valuation: Money,
    pub price_per_share: Money,
    /// Shares created for investors (including note conversions), excluding pool top-up.
    pub investor_shares: Shares,
    /// `investor_shares + option_pool_created`
    pub shares_issued: Shares,
    pub option_pool_created: Shares,
    pub total_shares_outstanding: Shares,
    pub stakeholder_shares: Holdings,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conversions: Vec<NoteConversion>,
    /// Note face value registered by a `ConvertibleNote` round.
    #[serde(default, skip_serializing_if = "Decimal::is_zero")]
    pub face_value: Money,
    #[serde(default, skip_serializing_if = "Decimal::is_zero")]
    pub debt_tranche: Money,
    #[serde(default, skip_serializing_if = "Decimal::is_zero")]
    pub convertible_tranche: Money,
}

impl Round {
    pub fn shares_of(&self, holder: Stakeholder) -> Shares {
        self.stakeholder_shares
            .get(&holder)
            .copied()
            .unwrap_or(Decimal::ZERO)
    }

    pub fn share_sum(&self) -> Shares {
        self.stakeholder_shares.values().copied().sum()
    }

    /// Fraction of the company held by `holder` after this round.
    pub fn ownership(&self, holder: Stakeholder) -> Rate {
        if self.total_shares_outstanding.is_zero() {
            Decimal::ZERO
        } else {
            self.shares_of(holder) / self.total_shares_outstanding
        }
    }

    /// Share-conservation check: holdings sum to the outstanding total.
    pub fn is_conserved(&self) -> bool {
        approx_eq(self.share_sum(), self.total_shares_outstanding, SHARE_TOLERANCE)
    }
}

/// A single row in an ownership table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapTableEntry {
    pub name: String,
    pub shares: Shares,
    /// Fraction, not percent
    pub ownership: Rate,
    pub value_at_post_money: Money,
}

/// Headline figures for the ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapTableSummary {
    pub total_equity_raised: Money,
    pub final_post_money_valuation: Money,
    pub total_shares: Shares,
    pub founder_ownership: Rate,
    pub option_pool_ownership: Rate,
}

// ─── Ledger ──────────────────────────────────────────────────────────────────

/// Append-only, chronologically ordered sequence of rounds.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RoundLedger {
    rounds: Vec<Round>,
}

impl RoundLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a round. Rounds are never revised once appended.
    pub fn push(&mut self, round: Round) -> CapTableResult<()> {
        if let Some(last) = self.rounds.last() {
            if round.year < last.year {
                return Err(CapTableError::configuration(
                    format!("{}.year", round.label),
                    format!(
                        "Round year {} precedes previous round {} ({})",
                        round.year, last.label, last.year
                    ),
                ));
            }
            if round.total_shares_outstanding < last.total_shares_outstanding {
                return Err(CapTableError::configuration(
                    round.label.clone(),
                    "Total shares outstanding cannot decrease",
                ));
            }
        }
        if !round.is_conserved() {
            return Err(CapTableError::configuration(
                round.label.clone(),
                format!(
                    "Stakeholder shares ({}) do not sum to total outstanding ({})",
                    round.share_sum(),
                    round.total_shares_outstanding
                ),
            ));
        }
        self.rounds.push(round);
        Ok(())
    }

    pub fn rounds(&self) -> &[Round] {
        &self.rounds
    }

    pub fn len(&self) -> usize {
        self.rounds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rounds.is_empty()
    }

    pub fn last(&self) -> Option<&Round> {
        self.rounds.last()
    }

    /// First round of the given kind.
    pub fn find(&self, kind: RoundKind) -> Option<&Round> {
        self.rounds.iter().find(|r| r.kind == kind)
    }

    /// The cap table in force at `year`: the last round closed on or before it.
    pub fn as_at(&self, year: Year) -> Option<&Round> {
        self.rounds.iter().rev().find(|r| r.year <= year)
    }

    /// Ownership table for a round: every holder with shares, plus a TOTAL row.
    pub fn cap_table(round: &Round) -> Vec<CapTableEntry> {
        let mut entries: Vec<CapTableEntry> = Stakeholder::ALL
            .iter()
            .filter(|h| round.shares_of(**h) > Decimal::ZERO)
            .map(|h| {
                let ownership = round.ownership(*h);
                CapTableEntry {
                    name: h.label().to_string(),
                    shares: round.shares_of(*h),
                    ownership,
                    value_at_post_money: ownership * round.post_money_valuation,
                }
            })
            .collect();

        let total_shares: Shares = entries.iter().map(|e| e.shares).sum();
        let total_ownership: Rate = entries.iter().map(|e| e.ownership).sum();
        let total_value: Money = entries.iter().map(|e| e.value_at_post_money).sum();
        entries.push(CapTableEntry {
            name: "TOTAL".into(),
            shares: total_shares,
            ownership: total_ownership,
            value_at_post_money: total_value,
        });
        entries
    }

    /// Ownership table after the final round.
    pub fn ownership(&self) -> Vec<CapTableEntry> {
        self.last().map(Self::cap_table).unwrap_or_default()
    }

    pub fn summary(&self) -> CapTableSummary {
        let total_equity_raised: Money = self
            .rounds
            .iter()
            .map(|r| r.investment)
            .filter(|i| *i > Decimal::ZERO)
            .sum();

        match self.last() {
            Some(last) => CapTableSummary {
                total_equity_raised,
                final_post_money_valuation: last.post_money_valuation,
                total_shares: last.total_shares_outstanding,
                founder_ownership: last.ownership(Stakeholder::Founder),
                option_pool_ownership: last.ownership(Stakeholder::OptionPool),
            },
            None => CapTableSummary {
                total_equity_raised,
                final_post_money_valuation: Decimal::ZERO,
                total_shares: Decimal::ZERO,
                founder_ownership: Decimal::ZERO,
                option_pool_ownership: Decimal::ZERO,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn round(year: Year, total: Decimal, holdings: &[(Stakeholder, Decimal)]) -> Round {
        Round {
            year,
            kind: RoundKind::Founder,
            label: format!("R{year}"),
            investment: dec!(100),
            pre_money_valuation: Decimal::ZERO,
            post_money_valuation: dec!(1_000),
            price_per_share: dec!(1),
            investor_shares: total,
            shares_issued: total,
            option_pool_created: Decimal::ZERO,
            total_shares_outstanding: total,
            stakeholder_shares: holdings.iter().copied().collect(),
            conversions: vec![],
            face_value: Decimal::ZERO,
            debt_tranche: Decimal::ZERO,
            convertible_tranche: Decimal::ZERO,
        }
    }

    #[test]
    fn test_push_rejects_unconserved_round() {
        let mut ledger = RoundLedger::new();
        let bad = round(2018, dec!(100), &[(Stakeholder::Founder, dec!(90))]);
        assert!(ledger.push(bad).is_err());
        assert!(ledger.is_empty());
    }

    #[test]
    fn test_push_rejects_backdated_round() {
        let mut ledger = RoundLedger::new();
        ledger
            .push(round(2019, dec!(100), &[(Stakeholder::Founder, dec!(100))]))
            .unwrap();
        let err = ledger.push(round(2018, dec!(100), &[(Stakeholder::Founder, dec!(100))]));
        assert!(err.is_err());
    }

    #[test]
    fn test_push_rejects_shrinking_share_count() {
        let mut ledger = RoundLedger::new();
        ledger
            .push(round(2019, dec!(100), &[(Stakeholder::Founder, dec!(100))]))
            .unwrap();
        let err = ledger.push(round(2020, dec!(50), &[(Stakeholder::Founder, dec!(50))]));
        assert!(err.is_err());
    }

    #[test]
    fn test_as_at_picks_latest_round_not_after_year() {
        let mut ledger = RoundLedger::new();
        ledger
            .push(round(2018, dec!(100), &[(Stakeholder::Founder, dec!(100))]))
            .unwrap();
        ledger
            .push(round(
                2020,
                dec!(150),
                &[(Stakeholder::Founder, dec!(100)), (Stakeholder::Seed, dec!(50))],
            ))
            .unwrap();

        assert_eq!(ledger.as_at(2019).unwrap().year, 2018);
        assert_eq!(ledger.as_at(2020).unwrap().year, 2020);
        assert_eq!(ledger.as_at(2035).unwrap().year, 2020);
        assert!(ledger.as_at(2017).is_none());
    }

    #[test]
    fn test_cap_table_total_row_sums_to_one() {
        let r = round(
            2020,
            dec!(300),
            &[
                (Stakeholder::Founder, dec!(100)),
                (Stakeholder::Seed, dec!(100)),
                (Stakeholder::OptionPool, dec!(100)),
                (Stakeholder::SeriesA, Decimal::ZERO),
            ],
        );
        let table = RoundLedger::cap_table(&r);
        // Zero holders are omitted
        assert_eq!(table.len(), 4);
        let total = table.last().unwrap();
        assert_eq!(total.name, "TOTAL");
        assert_eq!(total.shares, dec!(300));
        assert!((total.ownership - Decimal::ONE).abs() < dec!(0.000001));
    }

    #[test]
    fn test_summary_of_empty_ledger() {
        let s = RoundLedger::new().summary();
        assert_eq!(s.total_shares, Decimal::ZERO);
        assert_eq!(s.total_equity_raised, Decimal::ZERO);
    }
}
