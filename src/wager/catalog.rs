use chrono::{DateTime, Utc};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Side;

pub type GameId = Uuid;
pub type PropId = Uuid;

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GameStatus {
    Upcoming,
    Live,
    Final,
}

/// Game record as supplied by the catalog.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Game {
    pub id: GameId,
    pub home_team: String,
    pub away_team: String,
    pub start_time: DateTime<Utc>,
    pub status: GameStatus,
}

impl Game {
    pub fn new(home_team: &str, away_team: &str, start_time: DateTime<Utc>) -> Self {
        Self {
            id: GameId::new_v4(),
            home_team: home_team.to_string(),
            away_team: away_team.to_string(),
            start_time,
            status: GameStatus::Upcoming,
        }
    }

    /// "AWAY @ HOME" label used in bet history.
    pub fn matchup(&self) -> String {
        format!("{} @ {}", self.away_team, self.home_team)
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PropType {
    PassingYards,
    RushingYards,
    ReceivingYards,
    Receptions,
    AnytimeTd,
}

/// Grading state of a proposition. Moves from `Pending` to a terminal value once.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PropResult {
    Pending,
    OverWin,
    UnderWin,
    Push,
}

impl PropResult {
    pub fn is_terminal(self) -> bool {
        !matches!(self, PropResult::Pending)
    }
}

/// Outcome an operator may grade a proposition with. `Pending` is not a valid
/// grading input, so it has no variant here.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum GradeResult {
    OverWin,
    UnderWin,
    Push,
}

impl From<GradeResult> for PropResult {
    fn from(g: GradeResult) -> Self {
        match g {
            GradeResult::OverWin => PropResult::OverWin,
            GradeResult::UnderWin => PropResult::UnderWin,
            GradeResult::Push => PropResult::Push,
        }
    }
}

/// A gradable over/under line tied to a game.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Proposition {
    pub id: PropId,
    pub game_id: GameId,
    pub player_name: String,
    pub prop_type: PropType,
    pub line_value: f64,
    pub over_odds: i32,
    pub under_odds: i32,
    pub result: PropResult,
}

impl Proposition {
    pub fn new(
        game_id: GameId,
        player_name: &str,
        prop_type: PropType,
        line_value: f64,
        over_odds: i32,
        under_odds: i32,
    ) -> Self {
        Self {
            id: PropId::new_v4(),
            game_id,
            player_name: player_name.to_string(),
            prop_type,
            line_value,
            over_odds,
            under_odds,
            result: PropResult::Pending,
        }
    }

    pub fn odds_for(&self, side: Side) -> i32 {
        match side {
            Side::Over => self.over_odds,
            Side::Under => self.under_odds,
        }
    }
}

str_enum!(GameStatus {
    Upcoming => "upcoming",
    Live => "live",
    Final => "final",
});

str_enum!(PropType {
    PassingYards => "passing_yards",
    RushingYards => "rushing_yards",
    ReceivingYards => "receiving_yards",
    Receptions => "receptions",
    AnytimeTd => "anytime_td",
});

str_enum!(PropResult {
    Pending => "pending",
    OverWin => "over_win",
    UnderWin => "under_win",
    Push => "push",
});
