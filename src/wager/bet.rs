use chrono::{DateTime, Utc};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{PropId, PropResult, UserId};

pub type BetId = Uuid;
pub type LegId = Uuid;
pub type DirectBetId = Uuid;

/// Side of an over/under line a leg is on.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Over,
    Under,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum BetType {
    Single,
    Parlay,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LegResult {
    Pending,
    Won,
    Lost,
    Push,
}

impl LegResult {
    /// Leg result implied by a graded proposition for a leg on `side`.
    ///
    /// Returns `None` for an ungraded proposition.
    pub fn from_proposition(result: PropResult, side: Side) -> Option<Self> {
        match (result, side) {
            (PropResult::Pending, _) => None,
            (PropResult::Push, _) => Some(LegResult::Push),
            (PropResult::OverWin, Side::Over) | (PropResult::UnderWin, Side::Under) => {
                Some(LegResult::Won)
            }
            _ => Some(LegResult::Lost),
        }
    }

    pub fn is_terminal(self) -> bool {
        !matches!(self, LegResult::Pending)
    }
}

/// Terminal result of a bet, as passed to the ledger.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Won,
    Lost,
    Push,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BetStatus {
    Pending,
    Won,
    Lost,
    Push,
}

impl BetStatus {
    pub fn outcome(self) -> Option<Outcome> {
        match self {
            BetStatus::Pending => None,
            BetStatus::Won => Some(Outcome::Won),
            BetStatus::Lost => Some(Outcome::Lost),
            BetStatus::Push => Some(Outcome::Push),
        }
    }

    pub fn is_terminal(self) -> bool {
        self.outcome().is_some()
    }
}

impl From<Outcome> for BetStatus {
    fn from(o: Outcome) -> Self {
        match o {
            Outcome::Won => BetStatus::Won,
            Outcome::Lost => BetStatus::Lost,
            Outcome::Push => BetStatus::Push,
        }
    }
}

/// A wager owning one (single) or several (parlay) legs.
///
/// `potential_payout` and `combined_odds` are fixed at placement from the
/// locked leg odds. `status` only changes through grading.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Bet {
    pub id: BetId,
    pub user_id: UserId,
    pub bet_type: BetType,
    pub stake: f64,
    pub combined_odds: i32,
    pub potential_payout: f64,
    pub status: BetStatus,
    pub placed_at: DateTime<Utc>,
    pub settled_at: Option<DateTime<Utc>>,
}

/// One proposition-and-side selection inside a bet.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct BetLeg {
    pub id: LegId,
    pub bet_id: BetId,
    pub prop_id: PropId,
    pub side: Side,
    /// American odds locked at placement.
    pub odds: i32,
    pub custom_line: Option<f64>,
    pub result: LegResult,
}

/// Result supplied when settling a legacy direct bet.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DirectResult {
    Win,
    Loss,
    Push,
}

impl From<DirectResult> for Outcome {
    fn from(r: DirectResult) -> Self {
        match r {
            DirectResult::Win => Outcome::Won,
            DirectResult::Loss => Outcome::Lost,
            DirectResult::Push => Outcome::Push,
        }
    }
}

/// Legacy bet without leg indirection, settled directly by an operator.
///
/// `odds` is a decimal multiplier: a win returns `amount * odds`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct DirectBet {
    pub id: DirectBetId,
    pub user_id: UserId,
    pub game_ref: String,
    pub prop_ref: String,
    pub amount: f64,
    pub prediction: String,
    pub odds: f64,
    pub result: Option<DirectResult>,
    pub placed_at: DateTime<Utc>,
}

impl DirectBet {
    pub fn is_settled(&self) -> bool {
        self.result.is_some()
    }
}

str_enum!(Side {
    Over => "over",
    Under => "under",
});

str_enum!(BetType {
    Single => "single",
    Parlay => "parlay",
});

str_enum!(LegResult {
    Pending => "pending",
    Won => "won",
    Lost => "lost",
    Push => "push",
});

str_enum!(BetStatus {
    Pending => "pending",
    Won => "won",
    Lost => "lost",
    Push => "push",
});

str_enum!(DirectResult {
    Win => "win",
    Loss => "loss",
    Push => "push",
});
