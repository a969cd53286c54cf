use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::assumptions::{CapTableAssumptions, RepaymentProfile};
use crate::error::CapTableError;
use crate::time_value::rolled_up_balance;
use crate::types::{with_metadata, ComputationOutput, Money, Rate, Year};
use crate::CapTableResult;

// ─── Types ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InstrumentKind {
    ConvertibleNote,
    HybridDebt,
    HybridConvertible,
}

/// An interest-bearing claim that ranks ahead of equity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebtInstrument {
    pub label: String,
    pub kind: InstrumentKind,
    pub principal: Money,
    pub annual_rate: Rate,
    pub origination_year: Year,
    pub repayment: RepaymentProfile,
}

impl DebtInstrument {
    /// Amount owed at `year`. Rolled-up instruments compound annually from
    /// origination; bullet instruments owe principal only.
    pub fn balance_at(&self, year: Year) -> CapTableResult<Money> {
        match self.repayment {
            RepaymentProfile::RolledUp => rolled_up_balance(
                self.principal,
                self.annual_rate,
                year - self.origination_year,
            ),
            RepaymentProfile::Bullet => Ok(self.principal),
        }
    }
}

/// One instrument's balance at a given year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebtBalance {
    pub label: String,
    pub kind: InstrumentKind,
    pub principal: Money,
    pub origination_year: Year,
    pub years_outstanding: Year,
    pub balance: Money,
}

/// Total interest-bearing debt at year end.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebtScheduleRow {
    pub year: Year,
    pub instruments: Vec<DebtBalance>,
    pub total_debt: Money,
}

// ─── Instruments ─────────────────────────────────────────────────────────────

/// Instruments still owed at `year`.
///
/// A note is owed once issued until the hybrid close converts it. A note outside
/// its conversion window at the close never converts and stays owed. The hybrid
/// tranches are owed from the close onwards.
pub fn outstanding_instruments(a: &CapTableAssumptions, year: Year) -> Vec<DebtInstrument> {
    let close_year = a.hybrid.close_year();
    let hybrid_closed = year >= close_year;

    let mut instruments: Vec<DebtInstrument> = a
        .notes()
        .iter()
        .filter(|note| note.issue_year <= year)
        .filter(|note| !(hybrid_closed && note.converts_at(close_year)))
        .map(|note| DebtInstrument {
            label: note.label.clone(),
            kind: InstrumentKind::ConvertibleNote,
            principal: note.principal,
            annual_rate: note.annual_rate,
            origination_year: note.issue_year,
            repayment: RepaymentProfile::RolledUp,
        })
        .collect();

    if hybrid_closed {
        let h = &a.hybrid;
        let tranches = [
            (
                "Hybrid Debt",
                InstrumentKind::HybridDebt,
                h.debt_tranche(),
                h.debt_interest_rate,
                h.debt_repayment,
            ),
            (
                "Hybrid Convertible",
                InstrumentKind::HybridConvertible,
                h.convertible_tranche(),
                h.convertible_interest_rate,
                h.convertible_repayment,
            ),
        ];
        instruments.extend(
            tranches
                .into_iter()
                .filter(|(_, _, principal, _, _)| *principal > Decimal::ZERO)
                .map(|(label, kind, principal, annual_rate, repayment)| DebtInstrument {
                    label: label.to_string(),
                    kind,
                    principal,
                    annual_rate,
                    origination_year: close_year,
                    repayment,
                }),
        );
    }

    instruments
}

/// Balances of every instrument owed at `year`, in seniority-neutral order:
/// notes first, then the hybrid tranches.
pub fn debt_obligations(a: &CapTableAssumptions, year: Year) -> CapTableResult<Vec<DebtBalance>> {
    outstanding_instruments(a, year)
        .into_iter()
        .map(|inst| {
            let balance = inst.balance_at(year)?;
            Ok(DebtBalance {
                years_outstanding: year - inst.origination_year,
                label: inst.label,
                kind: inst.kind,
                principal: inst.principal,
                origination_year: inst.origination_year,
                balance,
            })
        })
        .collect()
}

/// Warnings for hybrid tranches still owed after their stated term.
pub(crate) fn term_warnings(a: &CapTableAssumptions, year: Year) -> Vec<String> {
    let h = &a.hybrid;
    let elapsed = Decimal::from(year - h.close_year());
    let mut warnings = Vec::new();
    for (label, principal, term) in [
        ("Hybrid Debt", h.debt_tranche(), h.debt_term_years),
        ("Hybrid Convertible", h.convertible_tranche(), h.convertible_term_years),
    ] {
        if principal > Decimal::ZERO && elapsed > term {
            let msg = format!(
                "{label} is outstanding in {year}, past its {term}-year term; interest continues to accrue"
            );
            log::warn!("{msg}");
            warnings.push(msg);
        }
    }
    warnings
}

// ─── Debt schedule ───────────────────────────────────────────────────────────

/// Year-by-year interest-bearing debt for the balance-sheet collaborator.
pub fn debt_schedule(
    a: &CapTableAssumptions,
    from_year: Year,
    to_year: Year,
) -> CapTableResult<ComputationOutput<Vec<DebtScheduleRow>>> {
    let start = Instant::now();

    if to_year < from_year {
        return Err(CapTableError::configuration(
            "to_year",
            format!("Schedule end {to_year} precedes start {from_year}"),
        ));
    }
    a.validate()?;

    let rows = (from_year..=to_year)
        .map(|year| {
            let instruments = debt_obligations(a, year)?;
            let total_debt: Money = instruments.iter().map(|d| d.balance).sum();
            Ok(DebtScheduleRow {
                year,
                instruments,
                total_debt,
            })
        })
        .collect::<CapTableResult<Vec<_>>>()?;

    let warnings = term_warnings(a, to_year);

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Interest-bearing debt by year (notes until conversion, hybrid tranches after close)",
        &serde_json::json!({
            "from_year": from_year,
            "to_year": to_year,
            "hybrid_close_year": a.hybrid.close_year(),
        }),
        warnings,
        elapsed,
        rows,
    ))
}

// ─── Tests ───────────────────────────────────────────────────────────────────
