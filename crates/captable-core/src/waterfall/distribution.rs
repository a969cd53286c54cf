use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use super::debt::{debt_obligations, term_warnings, DebtBalance};
use crate::assumptions::CapTableAssumptions;
use crate::cap_table::{Round, RoundKind, RoundLedger, Stakeholder};
use crate::error::CapTableError;
use crate::time_value::{annualised_irr, moic};
use crate::types::{with_metadata, ComputationOutput, Money, Multiple, Rate, Shares, Year};
use crate::valuation::ExitValuation;
use crate::CapTableResult;

// ─── Types ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntryType {
    Debt,
    Equity,
}

/// One row of the distribution: a debt instrument or an equity class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaterfallEntry {
    pub name: String,
    pub entry_type: EntryType,
    /// Set for equity rows only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stakeholder: Option<Stakeholder>,
    pub invested: Money,
    pub proceeds: Money,
    /// Fraction of equity held at exit. Zero for debt rows.
    pub ownership: Rate,
    pub years_held: Year,
    pub moic: Multiple,
    /// Annualised, as a decimal
    pub irr: Rate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaterfallSummary {
    pub total_debt_invested: Money,
    pub total_debt: Money,
    pub total_equity_invested: Money,
    pub total_equity: Money,
    pub total_invested: Money,
    pub total_proceeds: Money,
    /// Debt not covered by the exit valuation. Zero unless equity was clamped.
    pub shortfall: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaterfallOutput {
    pub exit_year: Year,
    pub exit_valuation: ExitValuation,
    pub entries: Vec<WaterfallEntry>,
    pub summary: WaterfallSummary,
}

// ─── Building blocks ─────────────────────────────────────────────────────────

/// Residual left for equity after debt is repaid.
///
/// When debt exceeds the valuation the residual is clamped to zero and the
/// recoverable `NegativeProceeds` error is returned alongside it.
pub fn equity_proceeds(
    exit_valuation: Money,
    total_debt: Money,
) -> (Money, Option<CapTableError>) {
    let residual = exit_valuation - total_debt;
    if residual < Decimal::ZERO {
        (
            Decimal::ZERO,
            Some(CapTableError::NegativeProceeds {
                exit_valuation,
                total_debt,
                shortfall: -residual,
            }),
        )
    } else {
        (residual, None)
    }
}

/// Split `proceeds` across every class holding shares in `round`.
/// Returns `(holder, shares, ownership, proceeds)` in stakeholder order.
pub fn pro_rata(proceeds: Money, round: &Round) -> Vec<(Stakeholder, Shares, Rate, Money)> {
    Stakeholder::ALL
        .iter()
        .filter(|h| round.shares_of(**h) > Decimal::ZERO)
        .map(|h| {
            let ownership = round.ownership(*h);
            (*h, round.shares_of(*h), ownership, proceeds * ownership)
        })
        .collect()
}

/// Capital a class put in and the year it went in.
fn equity_basis(ledger: &RoundLedger, round: &Round, holder: Stakeholder) -> (Money, Option<Year>) {
    let from_round = |kind: RoundKind| {
        ledger
            .find(kind)
            .map(|r| (r.investment, Some(r.year)))
            .unwrap_or((Decimal::ZERO, None))
    };
    match holder {
        Stakeholder::Founder => from_round(RoundKind::Founder),
        Stakeholder::Seed => from_round(RoundKind::Seed),
        Stakeholder::SeriesA => from_round(RoundKind::SeriesA),
        Stakeholder::SeriesB => from_round(RoundKind::SeriesB),
        Stakeholder::LateRound => from_round(RoundKind::Hybrid),
        Stakeholder::ConvertibleHolder => {
            let invested: Money = round.conversions.iter().map(|c| c.principal).sum();
            let first_issue = round
                .conversions
                .iter()
                .map(|c| round.year - c.years_outstanding)
                .min();
            (invested, first_issue)
        }
        Stakeholder::OptionPool => (Decimal::ZERO, None),
    }
}

fn debt_entry(debt: &DebtBalance) -> WaterfallEntry {
    let multiple = moic(debt.balance, debt.principal);
    WaterfallEntry {
        name: debt.label.clone(),
        entry_type: EntryType::Debt,
        stakeholder: None,
        invested: debt.principal,
        proceeds: debt.balance,
        ownership: Decimal::ZERO,
        years_held: debt.years_outstanding,
        moic: multiple,
        irr: annualised_irr(multiple, debt.years_outstanding),
    }
}

// ─── Waterfall ───────────────────────────────────────────────────────────────

/// Distribute the exit: debt repaid first at its rolled-up balance, the residual
/// split pro rata across the cap table in force at the exit year.
pub fn calculate_waterfall(
    ledger: &RoundLedger,
    a: &CapTableAssumptions,
    valuation: &ExitValuation,
) -> CapTableResult<ComputationOutput<WaterfallOutput>> {
    let start = Instant::now();
    let exit_year = a.exit.exit_year;
    let exit_value = valuation.final_valuation;

    let round = ledger.as_at(exit_year).ok_or_else(|| {
        CapTableError::configuration(
            "exit.exit_year",
            format!("No round has closed by the exit year {exit_year}"),
        )
    })?;

    // ── Debt ─────────────────────────────────────────────────────────
    let debts = debt_obligations(a, exit_year)?;
    let mut warnings = term_warnings(a, exit_year);
    let total_debt: Money = debts.iter().map(|d| d.balance).sum();
    let total_debt_invested: Money = debts.iter().map(|d| d.principal).sum();

    // ── Residual to equity ───────────────────────────────────────────
    let (total_equity, recovered) = equity_proceeds(exit_value, total_debt);
    let shortfall = match recovered {
        Some(e) => {
            log::warn!("{e}");
            warnings.push(e.to_string());
            total_debt - exit_value
        }
        None => Decimal::ZERO,
    };

    // ── Rows ─────────────────────────────────────────────────────────
    let mut entries: Vec<WaterfallEntry> = debts.iter().map(debt_entry).collect();
    let mut total_equity_invested = Decimal::ZERO;
    for (holder, _, ownership, proceeds) in pro_rata(total_equity, round) {
        let (invested, entry_year) = equity_basis(ledger, round, holder);
        let years_held = entry_year.map(|y| exit_year - y).unwrap_or(0);
        let multiple = moic(proceeds, invested);
        total_equity_invested += invested;
        entries.push(WaterfallEntry {
            name: holder.label().to_string(),
            entry_type: EntryType::Equity,
            stakeholder: Some(holder),
            invested,
            proceeds,
            ownership,
            years_held,
            moic: multiple,
            irr: annualised_irr(multiple, years_held),
        });
    }

    let summary = WaterfallSummary {
        total_debt_invested,
        total_debt,
        total_equity_invested,
        total_equity,
        total_invested: total_debt_invested + total_equity_invested,
        total_proceeds: exit_value,
        shortfall,
    };

    log::debug!(
        "exit {}: valuation {} debt {} equity {} shortfall {}",
        exit_year,
        exit_value,
        total_debt,
        total_equity,
        shortfall
    );

    let output = WaterfallOutput {
        exit_year,
        exit_valuation: valuation.clone(),
        entries,
        summary,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Exit waterfall: debt at rolled-up balance, residual pro rata to equity",
        &serde_json::json!({
            "exit_year": exit_year,
            "exit_valuation": exit_value.to_string(),
            "valuation_method": valuation.method_label,
            "cap_table_as_at": round.label,
        }),
        warnings,
        elapsed,
        output,
    ))
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cap_table::build_ledger;
    use crate::valuation::{select_valuation, ValuationBasis};
    use rust_decimal_macros::dec;

    fn two_holder_round() -> Round {
        let mut round = build_ledger(&CapTableAssumptions::default(), dec!(10_000_000))
            .unwrap()
            .result
            .rounds()[0]
            .clone();
        round.stakeholder_shares.insert(Stakeholder::Founder, dec!(800));
        round.stakeholder_shares.insert(Stakeholder::Seed, dec!(200));
        round.total_shares_outstanding = dec!(1_000);
        round
    }

    fn exit_at(value: Money) -> ExitValuation {
        select_valuation(value, Decimal::ZERO, Decimal::ONE, Decimal::ONE, ValuationBasis::Arr)
            .unwrap()
    }

    #[test]
    fn test_twenty_percent_holder_gets_eighteen_million() {
        let (equity, err) = equity_proceeds(dec!(100_000_000), dec!(10_000_000));
        assert!(err.is_none());
        assert_eq!(equity, dec!(90_000_000));

        let split = pro_rata(equity, &two_holder_round());
        let seed = split.iter().find(|s| s.0 == Stakeholder::Seed).unwrap();
        assert_eq!(seed.2, dec!(0.2));
        assert_eq!(seed.3, dec!(18_000_000));
    }

    #[test]
    fn test_negative_proceeds_clamped() {
        let (equity, err) = equity_proceeds(dec!(5_000_000), dec!(8_000_000));
        assert_eq!(equity, Decimal::ZERO);
        match err {
            Some(CapTableError::NegativeProceeds { shortfall, .. }) => {
                assert_eq!(shortfall, dec!(3_000_000))
            }
            other => panic!("expected NegativeProceeds, got {other:?}"),
        }
    }

    #[test]
    fn test_waterfall_conserves_exit_value() {
        let a = CapTableAssumptions::default();
        let ledger = build_ledger(&a, dec!(10_000_000)).unwrap().result;
        let out = calculate_waterfall(&ledger, &a, &exit_at(dec!(300_000_000))).unwrap();
        let s = &out.result.summary;
        assert_eq!(s.shortfall, Decimal::ZERO);
        assert_eq!(s.total_proceeds, dec!(300_000_000));

        let row_sum: Money = out.result.entries.iter().map(|e| e.proceeds).sum();
        assert!((row_sum - dec!(300_000_000)).abs() < dec!(0.0001));
    }

    #[test]
    fn test_shortfall_reported_not_raised() {
        let a = CapTableAssumptions::default();
        let ledger = build_ledger(&a, dec!(10_000_000)).unwrap().result;
        // Default debt at 2030 is 4,392,300 + 4,081,466.88
        let out = calculate_waterfall(&ledger, &a, &exit_at(dec!(5_000_000))).unwrap();
        let s = &out.result.summary;
        assert_eq!(s.total_equity, Decimal::ZERO);
        assert_eq!(s.shortfall, dec!(3_473_766.88));
        assert_eq!(s.total_proceeds, dec!(5_000_000));
        assert_eq!(s.total_debt + s.total_equity, s.total_proceeds + s.shortfall);
        assert!(out.warnings.iter().any(|w| w.contains("Negative proceeds")));
    }

    #[test]
    fn test_option_pool_reports_zero_returns() {
        let a = CapTableAssumptions::default();
        let ledger = build_ledger(&a, dec!(10_000_000)).unwrap().result;
        let out = calculate_waterfall(&ledger, &a, &exit_at(dec!(300_000_000))).unwrap();
        let pool = out
            .result
            .entries
            .iter()
            .find(|e| e.stakeholder == Some(Stakeholder::OptionPool))
            .unwrap();
        assert!(pool.proceeds > Decimal::ZERO);
        assert_eq!(pool.invested, Decimal::ZERO);
        assert_eq!(pool.moic, Decimal::ZERO);
        assert_eq!(pool.irr, Decimal::ZERO);
    }

    #[test]
    fn test_convertible_holder_basis() {
        let a = CapTableAssumptions::default();
        let ledger = build_ledger(&a, dec!(10_000_000)).unwrap().result;
        let out = calculate_waterfall(&ledger, &a, &exit_at(dec!(300_000_000))).unwrap();
        let cln = out
            .result
            .entries
            .iter()
            .find(|e| e.stakeholder == Some(Stakeholder::ConvertibleHolder))
            .unwrap();
        assert_eq!(cln.invested, dec!(10_000_000));
        // Held from the 2024 issue
        assert_eq!(cln.years_held, 6);
    }

    #[test]
    fn test_exit_before_hybrid_uses_earlier_cap_table() {
        let mut a = CapTableAssumptions::default();
        a.exit.exit_year = 2025;
        let ledger = build_ledger(&a, dec!(10_000_000)).unwrap().result;
        let out = calculate_waterfall(&ledger, &a, &exit_at(dec!(200_000_000))).unwrap();
        assert!(out
            .result
            .entries
            .iter()
            .all(|e| e.stakeholder != Some(Stakeholder::LateRound)));
        // Both notes still owed as debt
        let debt_rows = out
            .result
            .entries
            .iter()
            .filter(|e| e.entry_type == EntryType::Debt)
            .count();
        assert_eq!(debt_rows, 2);
    }

    #[test]
    fn test_exit_before_founding_is_rejected() {
        let mut a = CapTableAssumptions::default();
        let ledger = build_ledger(&a, dec!(10_000_000)).unwrap().result;
        a.exit.exit_year = 2017;
        assert!(calculate_waterfall(&ledger, &a, &exit_at(dec!(1_000))).is_err());
    }
}
