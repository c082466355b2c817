use std::collections::HashSet;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::ledger::{self, LedgerEntry};
use super::{WagerError, WagerResult};
use crate::odds::round_cents;
use crate::storage::StoreTx;
use crate::wager::{
    Bet, BetId, BetLeg, BetStatus, BetType, DirectBet, DirectBetId, DirectResult, GradeResult,
    LegResult, Outcome, PropId, PropResult, UserId,
};

/// What starts a grading request.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GradeTrigger {
    /// A proposition's final result, cascading to every leg on it.
    Proposition { prop_id: PropId, result: GradeResult },
    /// A result for one legacy direct bet.
    DirectBet { bet_id: DirectBetId, result: DirectResult },
}

impl GradeTrigger {
    pub fn label(&self) -> &'static str {
        match self {
            GradeTrigger::Proposition { .. } => "proposition",
            GradeTrigger::DirectBet { .. } => "direct_bet",
        }
    }
}

/// Terminal result of a bet and the money it moves.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct Resolution {
    pub outcome: Outcome,
    /// Amount credited back to the balance.
    pub payout: f64,
    /// Signed result against the stake.
    pub profit: f64,
}

impl Resolution {
    fn won(stake: f64, payout: f64) -> Self {
        Self {
            outcome: Outcome::Won,
            payout,
            profit: round_cents(payout - stake),
        }
    }

    fn lost(stake: f64) -> Self {
        Self {
            outcome: Outcome::Lost,
            payout: 0.0,
            profit: -stake,
        }
    }

    fn push(stake: f64) -> Self {
        Self {
            outcome: Outcome::Push,
            payout: stake,
            profit: 0.0,
        }
    }

    fn ledger_entry(&self) -> LedgerEntry {
        LedgerEntry::Settlement {
            outcome: self.outcome,
            payout: self.payout,
            profit: self.profit,
        }
    }
}

/// A bet that reached a terminal status in this request.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Settlement {
    pub bet_id: Uuid,
    pub user_id: UserId,
    pub resolution: Resolution,
}

/// Effects of one grading request.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct GradingReport {
    pub trigger: GradeTrigger,
    /// The trigger's target was already terminal; nothing changed.
    pub already_graded: bool,
    pub legs_updated: usize,
    /// Bets touched by this request that still wait on other legs.
    pub still_pending: Vec<BetId>,
    /// Bets touched by this request that were already settled.
    pub skipped: Vec<BetId>,
    pub settlements: Vec<Settlement>,
}

impl GradingReport {
    fn new(trigger: GradeTrigger) -> Self {
        Self {
            trigger,
            already_graded: false,
            legs_updated: 0,
            still_pending: Vec::new(),
            skipped: Vec::new(),
            settlements: Vec::new(),
        }
    }
}

/// Resolve a bet from the full set of its legs.
///
/// Returns `None` while any leg is pending. A parlay pays only when every leg
/// won, is refunded when the legs are a mix of wins and pushes (or all
/// pushes), and is lost on any lost leg.
pub fn evaluate_bet(bet: &Bet, legs: &[BetLeg]) -> WagerResult<Option<Resolution>> {
    if legs.is_empty() {
        return Err(WagerError::Consistency(format!("bet {} has no legs", bet.id)));
    }
    if legs.iter().any(|l| l.result == LegResult::Pending) {
        return Ok(None);
    }

    let resolution = match bet.bet_type {
        BetType::Single => {
            let [leg] = legs else {
                return Err(WagerError::Consistency(format!(
                    "single bet {} has {} legs",
                    bet.id,
                    legs.len()
                )));
            };
            match leg.result {
                LegResult::Won => Resolution::won(bet.stake, bet.potential_payout),
                LegResult::Push => Resolution::push(bet.stake),
                _ => Resolution::lost(bet.stake),
            }
        }
        BetType::Parlay => {
            let won = legs.iter().filter(|l| l.result == LegResult::Won).count();
            let pushed = legs.iter().filter(|l| l.result == LegResult::Push).count();
            if won == legs.len() {
                Resolution::won(bet.stake, bet.potential_payout)
            } else if pushed > 0 && won + pushed == legs.len() {
                Resolution::push(bet.stake)
            } else {
                Resolution::lost(bet.stake)
            }
        }
    };
    Ok(Some(resolution))
}

/// Resolve a legacy direct bet from an operator-supplied result.
pub fn evaluate_direct(bet: &DirectBet, result: DirectResult) -> Resolution {
    match result {
        DirectResult::Win => Resolution::won(bet.amount, round_cents(bet.amount * bet.odds)),
        DirectResult::Loss => Resolution::lost(bet.amount),
        DirectResult::Push => Resolution::push(bet.amount),
    }
}

/// Apply one grading request inside `tx`.
pub async fn settle<T: StoreTx>(tx: &mut T, trigger: GradeTrigger) -> WagerResult<GradingReport> {
    match trigger {
        GradeTrigger::Proposition { prop_id, result } => {
            grade_proposition(tx, trigger, prop_id, result.into()).await
        }
        GradeTrigger::DirectBet { bet_id, result } => {
            grade_direct_bet(tx, trigger, bet_id, result).await
        }
    }
}

async fn grade_proposition<T: StoreTx>(
    tx: &mut T,
    trigger: GradeTrigger,
    prop_id: PropId,
    result: PropResult,
) -> WagerResult<GradingReport> {
    let mut report = GradingReport::new(trigger);

    let prop = tx
        .get_proposition(prop_id)
        .await?
        .ok_or(WagerError::NotFound {
            entity: "proposition",
            id: prop_id,
        })?;
    if tx.get_game(prop.game_id).await?.is_none() {
        return Err(WagerError::Consistency(format!(
            "proposition {prop_id} references missing game {}",
            prop.game_id
        )));
    }

    if prop.result.is_terminal() || !tx.set_proposition_result(prop_id, result).await? {
        if prop.result != result {
            warn!(
                target: "engine",
                %prop_id,
                current = prop.result.as_str(),
                requested = result.as_str(),
                "proposition already graded with a different result; ignoring"
            );
        } else {
            debug!(target: "engine", %prop_id, "proposition already graded");
        }
        report.already_graded = true;
        return Ok(report);
    }

    let mut touched: Vec<BetId> = Vec::new();
    let mut seen = HashSet::new();
    for leg in tx.legs_by_proposition(prop_id).await? {
        let Some(leg_result) = LegResult::from_proposition(result, leg.side) else {
            continue;
        };
        if leg.result.is_terminal() || !tx.set_leg_result(leg.id, leg_result).await? {
            continue;
        }
        report.legs_updated += 1;
        if seen.insert(leg.bet_id) {
            touched.push(leg.bet_id);
        }
    }

    for bet_id in touched {
        let bet = tx.get_bet(bet_id).await?.ok_or_else(|| {
            WagerError::Consistency(format!("bet leg references missing bet {bet_id}"))
        })?;
        if bet.status.is_terminal() {
            report.skipped.push(bet_id);
            continue;
        }

        let legs = tx.legs_by_bet(bet_id).await?;
        match evaluate_bet(&bet, &legs)? {
            None => report.still_pending.push(bet_id),
            Some(resolution) => {
                let status = BetStatus::from(resolution.outcome);
                if !tx.transition_bet(bet_id, status, Utc::now()).await? {
                    report.skipped.push(bet_id);
                    continue;
                }
                ledger::apply(tx, bet.user_id, resolution.ledger_entry()).await?;
                info!(
                    target: "engine",
                    %bet_id,
                    user_id = %bet.user_id,
                    status = status.as_str(),
                    payout = resolution.payout,
                    profit = resolution.profit,
                    "bet settled"
                );
                report.settlements.push(Settlement {
                    bet_id,
                    user_id: bet.user_id,
                    resolution,
                });
            }
        }
    }

    info!(
        target: "engine",
        %prop_id,
        result = result.as_str(),
        legs_updated = report.legs_updated,
        settled = report.settlements.len(),
        pending = report.still_pending.len(),
        "proposition graded"
    );
    Ok(report)
}

async fn grade_direct_bet<T: StoreTx>(
    tx: &mut T,
    trigger: GradeTrigger,
    bet_id: DirectBetId,
    result: DirectResult,
) -> WagerResult<GradingReport> {
    let mut report = GradingReport::new(trigger);

    let bet = tx
        .get_direct_bet(bet_id)
        .await?
        .ok_or(WagerError::NotFound {
            entity: "direct bet",
            id: bet_id,
        })?;
    if bet.is_settled() || !tx.settle_direct_bet(bet_id, result).await? {
        debug!(target: "engine", %bet_id, "direct bet already settled");
        report.already_graded = true;
        return Ok(report);
    }

    let resolution = evaluate_direct(&bet, result);
    ledger::apply(tx, bet.user_id, resolution.ledger_entry()).await?;
    info!(
        target: "engine",
        %bet_id,
        user_id = %bet.user_id,
        result = result.as_str(),
        payout = resolution.payout,
        profit = resolution.profit,
        "direct bet settled"
    );
    report.settlements.push(Settlement {
        bet_id,
        user_id: bet.user_id,
        resolution,
    });
    Ok(report)
}
