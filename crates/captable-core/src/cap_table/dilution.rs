use rust_decimal::Decimal;
use std::time::Instant;

use super::conversion::{calculate_conversion, ConversionInput, NoteConversion};
use super::ledger::{Holdings, Round, RoundKind, RoundLedger, Stakeholder};
use crate::assumptions::{
    CapTableAssumptions, ConvertibleNoteTerms, FounderRoundAssumptions, PricedRoundAssumptions,
};
use crate::error::CapTableError;
use crate::types::{with_metadata, ComputationOutput, Money, Rate, Shares};
use crate::CapTableResult;

// ─── Round sequence ──────────────────────────────────────────────────────────

/// One step of the fixed pre-hybrid round sequence.
#[derive(Debug, Clone, Copy)]
enum RoundSpec<'a> {
    Founder(&'a FounderRoundAssumptions),
    Priced {
        kind: RoundKind,
        holder: Stakeholder,
        terms: &'a PricedRoundAssumptions,
    },
    Note(&'a ConvertibleNoteTerms),
}

fn round_specs(a: &CapTableAssumptions) -> Vec<RoundSpec<'_>> {
    let mut specs = vec![
        RoundSpec::Founder(&a.founder),
        RoundSpec::Priced {
            kind: RoundKind::Seed,
            holder: Stakeholder::Seed,
            terms: &a.seed,
        },
        RoundSpec::Priced {
            kind: RoundKind::SeriesA,
            holder: Stakeholder::SeriesA,
            terms: &a.series_a,
        },
        RoundSpec::Priced {
            kind: RoundKind::SeriesB,
            holder: Stakeholder::SeriesB,
            terms: &a.series_b,
        },
    ];
    specs.extend(a.notes().iter().map(RoundSpec::Note));
    specs
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

fn empty_holdings() -> Holdings {
    Stakeholder::ALL.iter().map(|h| (*h, Decimal::ZERO)).collect()
}

fn add_shares(holdings: &mut Holdings, holder: Stakeholder, shares: Shares) {
    *holdings.entry(holder).or_insert(Decimal::ZERO) += shares;
}

/// Top the option pool up so it is `target` of the fully diluted count afterwards.
///
/// Solves `pool / (non_pool + pool) = target` for the pool. A pool already at or
/// above target is left alone. Returns the shares created.
fn top_up_pool(holdings: &mut Holdings, target: Rate) -> Shares {
    let pool_before = holdings
        .get(&Stakeholder::OptionPool)
        .copied()
        .unwrap_or(Decimal::ZERO);
    let non_pool: Shares = holdings
        .iter()
        .filter(|(holder, _)| **holder != Stakeholder::OptionPool)
        .map(|(_, shares)| *shares)
        .sum();

    let pool_after = non_pool * target / (Decimal::ONE - target);
    let created = (pool_after - pool_before).max(Decimal::ZERO);
    if created > Decimal::ZERO {
        add_shares(holdings, Stakeholder::OptionPool, created);
    }
    created
}

/// Price per share for a round priced on the fully diluted count before it.
fn price_per_share(pre_money: Money, shares_before: Shares, round: &str) -> CapTableResult<Money> {
    if pre_money <= Decimal::ZERO {
        return Err(CapTableError::DivisionByZero {
            context: format!("{round}: pre-money valuation is {pre_money}"),
        });
    }
    if shares_before <= Decimal::ZERO {
        return Err(CapTableError::DivisionByZero {
            context: format!("{round}: {shares_before} shares outstanding before the round"),
        });
    }
    Ok(pre_money / shares_before)
}

// ─── Round builders ──────────────────────────────────────────────────────────

/// Incorporation: founders buy the whole initial share count. No pool yet.
pub fn founder_round(terms: &FounderRoundAssumptions) -> CapTableResult<Round> {
    if terms.shares <= Decimal::ZERO {
        return Err(CapTableError::DivisionByZero {
            context: format!("Founder: {} shares issued", terms.shares),
        });
    }

    let mut holdings = empty_holdings();
    add_shares(&mut holdings, Stakeholder::Founder, terms.shares);

    Ok(Round {
        year: terms.year,
        kind: RoundKind::Founder,
        label: RoundKind::Founder.label().to_string(),
        investment: terms.investment,
        pre_money_valuation: Decimal::ZERO,
        post_money_valuation: terms.investment,
        price_per_share: terms.investment / terms.shares,
        investor_shares: terms.shares,
        shares_issued: terms.shares,
        option_pool_created: Decimal::ZERO,
        total_shares_outstanding: terms.shares,
        stakeholder_shares: holdings,
        conversions: Vec::new(),
        face_value: Decimal::ZERO,
        debt_tranche: Decimal::ZERO,
        convertible_tranche: Decimal::ZERO,
    })
}

/// Seed, Series A or Series B: price on the pre-money, issue investor shares, top up the pool.
pub fn priced_round(
    prev: &Round,
    kind: RoundKind,
    holder: Stakeholder,
    terms: &PricedRoundAssumptions,
    pool_target: Rate,
) -> CapTableResult<Round> {
    let pre_money = terms.pre_money_valuation();
    let price = price_per_share(pre_money, prev.total_shares_outstanding, kind.label())?;
    let investor_shares = terms.investment / price;

    let mut holdings = prev.stakeholder_shares.clone();
    add_shares(&mut holdings, holder, investor_shares);
    let option_pool_created = top_up_pool(&mut holdings, pool_target);
    let shares_issued = investor_shares + option_pool_created;

    Ok(Round {
        year: terms.year,
        kind,
        label: kind.label().to_string(),
        investment: terms.investment,
        pre_money_valuation: pre_money,
        post_money_valuation: terms.post_money_valuation,
        price_per_share: price,
        investor_shares,
        shares_issued,
        option_pool_created,
        total_shares_outstanding: prev.total_shares_outstanding + shares_issued,
        stakeholder_shares: holdings,
        conversions: Vec::new(),
        face_value: Decimal::ZERO,
        debt_tranche: Decimal::ZERO,
        convertible_tranche: Decimal::ZERO,
    })
}

/// Registers a note at issuance. The cap table carries over unchanged.
pub fn note_round(prev: &Round, note: &ConvertibleNoteTerms) -> Round {
    Round {
        year: note.issue_year,
        kind: RoundKind::ConvertibleNote,
        label: note.label.clone(),
        investment: Decimal::ZERO,
        pre_money_valuation: Decimal::ZERO,
        post_money_valuation: Decimal::ZERO,
        price_per_share: Decimal::ZERO,
        investor_shares: Decimal::ZERO,
        shares_issued: Decimal::ZERO,
        option_pool_created: Decimal::ZERO,
        total_shares_outstanding: prev.total_shares_outstanding,
        stakeholder_shares: prev.stakeholder_shares.clone(),
        conversions: Vec::new(),
        face_value: note.principal,
        debt_tranche: Decimal::ZERO,
        convertible_tranche: Decimal::ZERO,
    }
}

/// The hybrid equity + debt + convertible round.
///
/// Prices on `arr_at_close * pre_money_arr_multiple` over the full share count
/// before the round (existing pool included), converts every note still inside
/// its conversion window, issues the equity tranche, then tops up the pool over
/// everyone. The debt and convertible tranches issue no shares.
///
/// Returns the round and any warnings (matured notes left unconverted).
pub fn hybrid_round(
    prev: &Round,
    a: &CapTableAssumptions,
    arr_at_close: Money,
) -> CapTableResult<(Round, Vec<String>)> {
    let h = &a.hybrid;
    let close_year = h.close_year();
    let mut warnings: Vec<String> = Vec::new();

    let pre_money = arr_at_close * h.pre_money_arr_multiple;
    let price = price_per_share(pre_money, prev.total_shares_outstanding, RoundKind::Hybrid.label())?;

    // ── Note conversion ──────────────────────────────────────────────
    let mut conversions: Vec<NoteConversion> = Vec::new();
    for note in a.notes() {
        if note.converts_at(close_year) {
            conversions.push(calculate_conversion(&ConversionInput {
                label: note.label.clone(),
                principal: note.principal,
                annual_rate: note.annual_rate,
                years_outstanding: close_year - note.issue_year,
                discount: note.discount,
                reference_price_per_share: price,
            })?);
        } else if note.maturity_year < close_year {
            let msg = format!(
                "{} matured in {} before the hybrid close in {}; carried as rolled-up debt to exit",
                note.label, note.maturity_year, close_year
            );
            log::warn!("{msg}");
            warnings.push(msg);
        }
    }
    let conversion_shares: Shares = conversions.iter().map(|c| c.shares).sum();
    let converted_capital: Money = conversions.iter().map(|c| c.converted_capital).sum();

    // ── Equity tranche ───────────────────────────────────────────────
    let equity = h.equity_tranche();
    let equity_shares = equity / price;

    let mut holdings = prev.stakeholder_shares.clone();
    add_shares(&mut holdings, Stakeholder::LateRound, equity_shares);
    add_shares(&mut holdings, Stakeholder::ConvertibleHolder, conversion_shares);

    // ── Pool top-up over old and new holders ─────────────────────────
    let option_pool_created = top_up_pool(&mut holdings, a.option_pool_target);
    let investor_shares = equity_shares + conversion_shares;
    let shares_issued = investor_shares + option_pool_created;

    let round = Round {
        year: close_year,
        kind: RoundKind::Hybrid,
        label: RoundKind::Hybrid.label().to_string(),
        investment: equity,
        pre_money_valuation: pre_money,
        post_money_valuation: pre_money + equity + converted_capital,
        price_per_share: price,
        investor_shares,
        shares_issued,
        option_pool_created,
        total_shares_outstanding: prev.total_shares_outstanding + shares_issued,
        stakeholder_shares: holdings,
        conversions,
        face_value: Decimal::ZERO,
        debt_tranche: h.debt_tranche(),
        convertible_tranche: h.convertible_tranche(),
    };
    Ok((round, warnings))
}

fn next_round(
    spec: RoundSpec<'_>,
    prev: Option<&Round>,
    pool_target: Rate,
) -> CapTableResult<Round> {
    match (spec, prev) {
        (RoundSpec::Founder(terms), None) => founder_round(terms),
        (RoundSpec::Priced { kind, holder, terms }, Some(prev)) => {
            priced_round(prev, kind, holder, terms, pool_target)
        }
        (RoundSpec::Note(note), Some(prev)) => Ok(note_round(prev, note)),
        (RoundSpec::Founder(_), Some(_)) => Err(CapTableError::configuration(
            "founder",
            "Founder round must be the first round",
        )),
        (_, None) => Err(CapTableError::configuration(
            "founder",
            "Ledger must open with the founder round",
        )),
    }
}

fn log_round(round: &Round) {
    log::debug!(
        "{} {}: price {} issued {} (pool +{}) total {}",
        round.year,
        round.label,
        round.price_per_share,
        round.shares_issued,
        round.option_pool_created,
        round.total_shares_outstanding
    );
}

// ─── Ledger construction ─────────────────────────────────────────────────────

/// Founder, Seed, Series A, Series B and both note registrations, folded in order.
pub fn build_pre_hybrid_ledger(a: &CapTableAssumptions) -> CapTableResult<RoundLedger> {
    a.validate()?;

    round_specs(a)
        .into_iter()
        .try_fold(RoundLedger::new(), |mut ledger, spec| {
            let round = next_round(spec, ledger.last(), a.option_pool_target)?;
            log_round(&round);
            ledger.push(round)?;
            Ok(ledger)
        })
}

/// Build the full ledger, hybrid round included.
///
/// `arr_at_close` is the ARR the projection collaborator reports for the hybrid
/// close year.
pub fn build_ledger(
    a: &CapTableAssumptions,
    arr_at_close: Money,
) -> CapTableResult<ComputationOutput<RoundLedger>> {
    let start = Instant::now();

    let mut ledger = build_pre_hybrid_ledger(a)?;
    let prev = ledger.last().ok_or_else(|| {
        CapTableError::configuration("founder", "Pre-hybrid ledger is empty")
    })?;
    let (hybrid, warnings) = hybrid_round(prev, a, arr_at_close)?;
    log_round(&hybrid);
    ledger.push(hybrid)?;

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Sequential dilution with closed-form option pool top-up",
        &serde_json::json!({
            "option_pool_target": a.option_pool_target.to_string(),
            "hybrid_close_year": a.hybrid.close_year(),
            "arr_at_close": arr_at_close.to_string(),
            "pre_money_arr_multiple": a.hybrid.pre_money_arr_multiple.to_string(),
        }),
        warnings,
        elapsed,
        ledger,
    ))
}

// ─── Tests ───────────────────────────────────────────────────────────────────
