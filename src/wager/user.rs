use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type UserId = Uuid;

/// Virtual balance and settled-bet record for one user.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub virtual_balance: f64,
    /// Sum of (payout - stake) over settled bets only.
    pub lifetime_profit: f64,
    pub total_bets: i64,
    pub wins: i64,
    pub losses: i64,
    pub pushes: i64,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn new(id: UserId, username: &str, starting_balance: f64) -> Self {
        Self {
            id,
            username: username.to_string(),
            virtual_balance: starting_balance,
            lifetime_profit: 0.0,
            total_bets: 0,
            wins: 0,
            losses: 0,
            pushes: 0,
            created_at: Utc::now(),
        }
    }

    /// Win percentage over decided (non-push) bets; 0 when nothing is decided.
    pub fn win_rate(&self) -> f64 {
        let decided = self.total_bets - self.pushes;
        if decided > 0 {
            self.wins as f64 / decided as f64 * 100.0
        } else {
            0.0
        }
    }

    pub fn apply(&mut self, delta: &UserDelta) {
        self.virtual_balance += delta.balance;
        self.lifetime_profit += delta.lifetime_profit;
        self.total_bets += delta.total_bets;
        self.wins += delta.wins;
        self.losses += delta.losses;
        self.pushes += delta.pushes;
    }
}

/// Additive patch applied to a user row in one write.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct UserDelta {
    pub balance: f64,
    pub lifetime_profit: f64,
    pub total_bets: i64,
    pub wins: i64,
    pub losses: i64,
    pub pushes: i64,
}
