//! The only code path that changes a user's balance or settled-bet record.
//!
//! Callers run [`apply`] inside the same transaction as the state change that
//! caused it. The ledger does no deduplication: settlement callers guarantee
//! one entry per settled bet by winning the bet's pending → terminal
//! transition first.

use tracing::info;

use super::{WagerError, WagerResult};
use crate::storage::{StoreError, StoreTx};
use crate::wager::{Outcome, User, UserDelta, UserId};

/// A balance/stat change and the reason for it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum LedgerEntry {
    /// Upfront stake deduction at placement. Fails if the balance is short.
    StakeDebit { amount: f64 },
    /// A bet reached a terminal outcome.
    ///
    /// `payout` is the amount returned to the balance (0 on a loss, the stake
    /// on a push) and `profit` the signed result recorded against lifetime
    /// profit.
    Settlement {
        outcome: Outcome,
        payout: f64,
        profit: f64,
    },
}

impl LedgerEntry {
    pub fn reason(&self) -> &'static str {
        match self {
            LedgerEntry::StakeDebit { .. } => "stake_debit",
            LedgerEntry::Settlement { outcome: Outcome::Won, .. } => "win_payout",
            LedgerEntry::Settlement { outcome: Outcome::Lost, .. } => "loss",
            LedgerEntry::Settlement { outcome: Outcome::Push, .. } => "push_refund",
        }
    }

    pub fn delta(&self) -> UserDelta {
        match *self {
            LedgerEntry::StakeDebit { amount } => UserDelta {
                balance: -amount,
                ..UserDelta::default()
            },
            LedgerEntry::Settlement {
                outcome,
                payout,
                profit,
            } => UserDelta {
                balance: payout,
                lifetime_profit: profit,
                total_bets: 1,
                wins: i64::from(outcome == Outcome::Won),
                losses: i64::from(outcome == Outcome::Lost),
                pushes: i64::from(outcome == Outcome::Push),
            },
        }
    }
}

/// Apply `entry` to `user_id` as one atomic user update.
pub async fn apply<T: StoreTx>(
    tx: &mut T,
    user_id: UserId,
    entry: LedgerEntry,
) -> WagerResult<User> {
    if let LedgerEntry::StakeDebit { amount } = entry {
        let user = tx
            .get_user_for_update(user_id)
            .await?
            .ok_or(WagerError::NotFound { entity: "user", id: user_id })?;
        if user.virtual_balance < amount {
            return Err(WagerError::InsufficientBalance {
                required: amount,
                available: user.virtual_balance,
            });
        }
    }

    let user = tx
        .apply_user_delta(user_id, &entry.delta())
        .await
        .map_err(|e| match e {
            StoreError::Missing { .. } => {
                WagerError::Consistency(format!("ledger entry for missing user {user_id}"))
            }
            other => other.into(),
        })?;

    info!(
        target: "ledger",
        %user_id,
        reason = entry.reason(),
        balance_delta = entry.delta().balance,
        balance = user.virtual_balance,
        lifetime_profit = user.lifetime_profit,
        "ledger entry applied"
    );
    Ok(user)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stake_debit_only_moves_balance() {
        let delta = LedgerEntry::StakeDebit { amount: 30.0 }.delta();
        assert_eq!(
            delta,
            UserDelta {
                balance: -30.0,
                ..UserDelta::default()
            }
        );
    }

    #[test]
    fn settlement_deltas_count_exactly_one_result() {
        let won = LedgerEntry::Settlement {
            outcome: Outcome::Won,
            payout: 19.09,
            profit: 9.09,
        }
        .delta();
        assert_eq!((won.total_bets, won.wins, won.losses, won.pushes), (1, 1, 0, 0));
        assert_eq!(won.balance, 19.09);

        let lost = LedgerEntry::Settlement {
            outcome: Outcome::Lost,
            payout: 0.0,
            profit: -10.0,
        }
        .delta();
        assert_eq!((lost.total_bets, lost.wins, lost.losses, lost.pushes), (1, 0, 1, 0));
        assert_eq!(lost.balance, 0.0);
        assert_eq!(lost.lifetime_profit, -10.0);

        let push = LedgerEntry::Settlement {
            outcome: Outcome::Push,
            payout: 10.0,
            profit: 0.0,
        }
        .delta();
        assert_eq!((push.total_bets, push.wins, push.losses, push.pushes), (1, 0, 0, 1));
        assert_eq!(push.balance, 10.0);
        assert_eq!(push.lifetime_profit, 0.0);
    }

    #[test]
    fn reasons() {
        assert_eq!(LedgerEntry::StakeDebit { amount: 1.0 }.reason(), "stake_debit");
        let push = LedgerEntry::Settlement {
            outcome: Outcome::Push,
            payout: 1.0,
            profit: 0.0,
        };
        assert_eq!(push.reason(), "push_refund");
    }
}
