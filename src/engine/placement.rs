use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::ledger::{self, LedgerEntry};
use super::{WagerError, WagerResult};
use crate::odds::{combine, payout, round_cents};
use crate::storage::StoreTx;
use crate::types::BookConfig;
use crate::wager::{
    Bet, BetId, BetLeg, BetStatus, BetType, DirectBet, DirectBetId, LegId, LegResult, PropId,
    Side, UserId,
};

/// One selection submitted for placement, with the odds the bettor was quoted.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct LegRequest {
    pub prop_id: PropId,
    pub side: Side,
    pub odds: i32,
    #[serde(default)]
    pub custom_line: Option<f64>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct BetRequest {
    pub user_id: UserId,
    pub legs: Vec<LegRequest>,
    /// Stake per bet: per leg for singles, once for a parlay.
    pub stake: f64,
    pub bet_type: BetType,
}

impl BetRequest {
    /// Amount debited from the balance for the whole request.
    pub fn total_stake(&self) -> f64 {
        match self.bet_type {
            BetType::Single => self.stake * self.legs.len() as f64,
            BetType::Parlay => self.stake,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct DirectBetRequest {
    pub user_id: UserId,
    pub game_ref: String,
    pub prop_ref: String,
    pub amount: f64,
    pub prediction: String,
    /// Decimal multiplier applied to `amount` on a win.
    pub odds: f64,
}

fn validate_stake(stake: f64) -> WagerResult<()> {
    if !stake.is_finite() || stake <= 0.0 {
        return Err(WagerError::InvalidStake(stake));
    }
    Ok(())
}

async fn validate_request<T: StoreTx>(
    tx: &mut T,
    cfg: &BookConfig,
    req: &BetRequest,
) -> WagerResult<()> {
    validate_stake(req.stake)?;
    if req.legs.is_empty() {
        return Err(WagerError::EmptyBet);
    }
    if req.bet_type == BetType::Parlay && req.legs.len() < cfg.min_parlay_legs {
        return Err(WagerError::ParlayTooShort {
            min: cfg.min_parlay_legs,
            got: req.legs.len(),
        });
    }
    if tx.get_user_for_update(req.user_id).await?.is_none() {
        return Err(WagerError::NotFound {
            entity: "user",
            id: req.user_id,
        });
    }

    for leg in &req.legs {
        let prop = tx
            .get_proposition(leg.prop_id)
            .await?
            .ok_or(WagerError::NotFound {
                entity: "proposition",
                id: leg.prop_id,
            })?;
        if prop.result.is_terminal() {
            return Err(WagerError::PropositionClosed(prop.id));
        }
        if let Some(line) = leg.custom_line.filter(|l| !l.is_finite()) {
            return Err(WagerError::InvalidLine(line));
        }
        if leg.odds == 0 {
            return Err(WagerError::InvalidOdds {
                prop_id: prop.id,
                odds: leg.odds,
            });
        }
        if tx.get_game(prop.game_id).await?.is_none() {
            return Err(WagerError::Consistency(format!(
                "proposition {} references missing game {}",
                prop.id, prop.game_id
            )));
        }
    }
    Ok(())
}

fn new_bet(user_id: UserId, bet_type: BetType, stake: f64, combined_odds: i32) -> Bet {
    Bet {
        id: BetId::new_v4(),
        user_id,
        bet_type,
        stake,
        combined_odds,
        potential_payout: round_cents(payout(stake, combined_odds)),
        status: BetStatus::Pending,
        placed_at: Utc::now(),
        settled_at: None,
    }
}

fn new_leg(bet_id: BetId, req: &LegRequest) -> BetLeg {
    BetLeg {
        id: LegId::new_v4(),
        bet_id,
        prop_id: req.prop_id,
        side: req.side,
        odds: req.odds,
        custom_line: req.custom_line,
        result: LegResult::Pending,
    }
}

/// Validate, debit and record a bet request.
///
/// Every check runs before the debit, so a rejected request changes nothing.
/// Odds are locked from the request; a parlay's combined price and payout are
/// computed here once.
pub async fn place_bet<T: StoreTx>(
    tx: &mut T,
    cfg: &BookConfig,
    req: &BetRequest,
) -> WagerResult<Vec<Bet>> {
    validate_request(tx, cfg, req).await?;

    let planned: Vec<(Bet, Vec<BetLeg>)> = match req.bet_type {
        BetType::Single => req
            .legs
            .iter()
            .map(|leg| {
                let bet = new_bet(req.user_id, BetType::Single, req.stake, leg.odds);
                let legs = vec![new_leg(bet.id, leg)];
                (bet, legs)
            })
            .collect(),
        BetType::Parlay => {
            let locked: Vec<i32> = req.legs.iter().map(|l| l.odds).collect();
            let combined = combine(&locked)?;
            let bet = new_bet(req.user_id, BetType::Parlay, req.stake, combined);
            let legs = req.legs.iter().map(|l| new_leg(bet.id, l)).collect();
            vec![(bet, legs)]
        }
    };

    ledger::apply(
        tx,
        req.user_id,
        LedgerEntry::StakeDebit {
            amount: req.total_stake(),
        },
    )
    .await?;

    let mut bets = Vec::with_capacity(planned.len());
    for (bet, legs) in planned {
        tx.insert_bet(&bet).await?;
        for leg in &legs {
            tx.insert_leg(leg).await?;
        }
        info!(
            target: "engine",
            bet_id = %bet.id,
            user_id = %bet.user_id,
            bet_type = bet.bet_type.as_str(),
            legs = legs.len(),
            stake = bet.stake,
            odds = bet.combined_odds,
            potential_payout = bet.potential_payout,
            "bet placed"
        );
        bets.push(bet);
    }
    Ok(bets)
}

/// Record a legacy direct bet. Only the balance moves now; the user's record
/// changes when the bet is settled.
pub async fn place_direct_bet<T: StoreTx>(
    tx: &mut T,
    req: &DirectBetRequest,
) -> WagerResult<DirectBet> {
    validate_stake(req.amount)?;
    if !req.odds.is_finite() || req.odds < 1.0 {
        return Err(WagerError::InvalidDecimalOdds(req.odds));
    }

    ledger::apply(tx, req.user_id, LedgerEntry::StakeDebit { amount: req.amount }).await?;

    let bet = DirectBet {
        id: DirectBetId::new_v4(),
        user_id: req.user_id,
        game_ref: req.game_ref.clone(),
        prop_ref: req.prop_ref.clone(),
        amount: req.amount,
        prediction: req.prediction.clone(),
        odds: req.odds,
        result: None,
        placed_at: Utc::now(),
    };
    tx.insert_direct_bet(&bet).await?;
    info!(
        target: "engine",
        bet_id = %bet.id,
        user_id = %bet.user_id,
        amount = bet.amount,
        odds = bet.odds,
        "direct bet placed"
    );
    Ok(bet)
}
