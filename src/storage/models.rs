use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::storage::StoreError;
use crate::wager::{Bet, BetLeg, DirectBet, DirectResult, Game, Proposition, User};

/// Row model for `users`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UserRow {
    pub id: Uuid,
    pub username: String,
    pub virtual_balance: f64,
    pub lifetime_profit: f64,
    pub total_bets: i64,
    pub wins: i64,
    pub losses: i64,
    pub pushes: i64,
    pub created_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id,
            username: row.username,
            virtual_balance: row.virtual_balance,
            lifetime_profit: row.lifetime_profit,
            total_bets: row.total_bets,
            wins: row.wins,
            losses: row.losses,
            pushes: row.pushes,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct GameRow {
    pub id: Uuid,
    pub home_team: String,
    pub away_team: String,
    pub start_time: DateTime<Utc>,
    pub status: String,
}

impl TryFrom<GameRow> for Game {
    type Error = StoreError;

    fn try_from(row: GameRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            home_team: row.home_team,
            away_team: row.away_team,
            start_time: row.start_time,
            status: row.status.parse()?,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PropositionRow {
    pub id: Uuid,
    pub game_id: Uuid,
    pub player_name: String,
    pub prop_type: String,
    pub line_value: f64,
    pub over_odds: i32,
    pub under_odds: i32,
    pub result: String,
}

impl TryFrom<PropositionRow> for Proposition {
    type Error = StoreError;

    fn try_from(row: PropositionRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            game_id: row.game_id,
            player_name: row.player_name,
            prop_type: row.prop_type.parse()?,
            line_value: row.line_value,
            over_odds: row.over_odds,
            under_odds: row.under_odds,
            result: row.result.parse()?,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct BetRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub bet_type: String,
    pub stake: f64,
    pub combined_odds: i32,
    pub potential_payout: f64,
    pub status: String,
    pub placed_at: DateTime<Utc>,
    pub settled_at: Option<DateTime<Utc>>,
}

impl TryFrom<BetRow> for Bet {
    type Error = StoreError;

    fn try_from(row: BetRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            user_id: row.user_id,
            bet_type: row.bet_type.parse()?,
            stake: row.stake,
            combined_odds: row.combined_odds,
            potential_payout: row.potential_payout,
            status: row.status.parse()?,
            placed_at: row.placed_at,
            settled_at: row.settled_at,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct BetLegRow {
    pub id: Uuid,
    pub bet_id: Uuid,
    pub prop_id: Uuid,
    pub side: String,
    pub odds: i32,
    pub custom_line: Option<f64>,
    pub result: String,
}

impl TryFrom<BetLegRow> for BetLeg {
    type Error = StoreError;

    fn try_from(row: BetLegRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            bet_id: row.bet_id,
            prop_id: row.prop_id,
            side: row.side.parse()?,
            odds: row.odds,
            custom_line: row.custom_line,
            result: row.result.parse()?,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DirectBetRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub game_ref: String,
    pub prop_ref: String,
    pub amount: f64,
    pub prediction: String,
    pub odds: f64,
    pub result: Option<String>,
    pub placed_at: DateTime<Utc>,
}

impl TryFrom<DirectBetRow> for DirectBet {
    type Error = StoreError;

    fn try_from(row: DirectBetRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            user_id: row.user_id,
            game_ref: row.game_ref,
            prop_ref: row.prop_ref,
            amount: row.amount,
            prediction: row.prediction,
            odds: row.odds,
            result: row.result.as_deref().map(str::parse::<DirectResult>).transpose()?,
            placed_at: row.placed_at,
        })
    }
}
