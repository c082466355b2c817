use serde::{Deserialize, Serialize};

use super::WagerResult;
use crate::storage::StoreTx;
use crate::wager::{User, UserId};

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct LeaderboardEntry {
    pub rank: usize,
    pub user_id: UserId,
    pub username: String,
    pub lifetime_profit: f64,
    pub total_bets: i64,
    pub wins: i64,
    pub losses: i64,
    pub pushes: i64,
    /// Percent of decided (non-push) bets won.
    pub win_rate: f64,
}

impl LeaderboardEntry {
    fn from_user(rank: usize, user: User) -> Self {
        Self {
            rank,
            win_rate: user.win_rate(),
            user_id: user.id,
            username: user.username,
            lifetime_profit: user.lifetime_profit,
            total_bets: user.total_bets,
            wins: user.wins,
            losses: user.losses,
            pushes: user.pushes,
        }
    }
}

/// Users ranked by lifetime profit, best first, ranks starting at 1.
pub async fn top<T: StoreTx>(tx: &mut T, limit: usize) -> WagerResult<Vec<LeaderboardEntry>> {
    let users = tx.top_users_by_profit(limit).await?;
    Ok(users
        .into_iter()
        .enumerate()
        .map(|(i, user)| LeaderboardEntry::from_user(i + 1, user))
        .collect())
}
