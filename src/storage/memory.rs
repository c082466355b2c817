use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::{RecordStore, StoreError, StoreResult, StoreTx};
use crate::wager::{
    Bet, BetId, BetLeg, BetStatus, DirectBet, DirectBetId, DirectResult, Game, GameId, LegId,
    LegResult, PropId, PropResult, Proposition, User, UserDelta, UserId,
};

#[derive(Clone, Debug, Default)]
struct Tables {
    users: HashMap<UserId, User>,
    games: HashMap<GameId, Game>,
    props: HashMap<PropId, Proposition>,
    bets: HashMap<BetId, Bet>,
    legs: HashMap<LegId, BetLeg>,
    direct_bets: HashMap<DirectBetId, DirectBet>,
    legs_by_bet: HashMap<BetId, Vec<LegId>>,
    legs_by_prop: HashMap<PropId, Vec<LegId>>,
    bets_by_user: HashMap<UserId, Vec<BetId>>,
}

impl Tables {
    fn collect_legs(&self, ids: Option<&Vec<LegId>>) -> Vec<BetLeg> {
        ids.map(|ids| ids.iter().filter_map(|id| self.legs.get(id).cloned()).collect())
            .unwrap_or_default()
    }
}

/// In-process record store.
///
/// A transaction holds the lock over every table for its whole lifetime and
/// works on a staged copy, so transactions are fully serialized and a dropped
/// transaction leaves no trace.
#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

pub struct MemoryTx {
    guard: OwnedMutexGuard<Tables>,
    staged: Tables,
}

#[async_trait]
impl RecordStore for MemoryStore {
    type Tx = MemoryTx;

    async fn begin(&self) -> StoreResult<MemoryTx> {
        let guard = self.tables.clone().lock_owned().await;
        let staged = guard.clone();
        Ok(MemoryTx { guard, staged })
    }
}

fn insert_new<K, V>(map: &mut HashMap<K, V>, key: K, value: V, entity: &'static str) -> StoreResult<()>
where
    K: std::hash::Hash + Eq + Copy + Into<uuid::Uuid>,
{
    if map.contains_key(&key) {
        return Err(StoreError::Duplicate {
            entity,
            id: key.into(),
        });
    }
    map.insert(key, value);
    Ok(())
}

#[async_trait]
impl StoreTx for MemoryTx {
    async fn get_user(&mut self, id: UserId) -> StoreResult<Option<User>> {
        Ok(self.staged.users.get(&id).cloned())
    }

    async fn get_user_for_update(&mut self, id: UserId) -> StoreResult<Option<User>> {
        self.get_user(id).await
    }

    async fn insert_user(&mut self, user: &User) -> StoreResult<()> {
        insert_new(&mut self.staged.users, user.id, user.clone(), "user")
    }

    async fn apply_user_delta(&mut self, id: UserId, delta: &UserDelta) -> StoreResult<User> {
        let user = self
            .staged
            .users
            .get_mut(&id)
            .ok_or(StoreError::Missing { entity: "user", id })?;
        user.apply(delta);
        Ok(user.clone())
    }

    async fn top_users_by_profit(&mut self, limit: usize) -> StoreResult<Vec<User>> {
        let mut users: Vec<User> = self.staged.users.values().cloned().collect();
        users.sort_by(|a, b| {
            b.lifetime_profit
                .total_cmp(&a.lifetime_profit)
                .then_with(|| a.created_at.cmp(&b.created_at))
        });
        users.truncate(limit);
        Ok(users)
    }

    async fn get_game(&mut self, id: GameId) -> StoreResult<Option<Game>> {
        Ok(self.staged.games.get(&id).cloned())
    }

    async fn insert_game(&mut self, game: &Game) -> StoreResult<()> {
        insert_new(&mut self.staged.games, game.id, game.clone(), "game")
    }

    async fn get_proposition(&mut self, id: PropId) -> StoreResult<Option<Proposition>> {
        Ok(self.staged.props.get(&id).cloned())
    }

    async fn insert_proposition(&mut self, prop: &Proposition) -> StoreResult<()> {
        insert_new(&mut self.staged.props, prop.id, prop.clone(), "proposition")
    }

    async fn set_proposition_result(&mut self, id: PropId, result: PropResult) -> StoreResult<bool> {
        match self.staged.props.get_mut(&id) {
            Some(prop) if prop.result == PropResult::Pending => {
                prop.result = result;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn get_bet(&mut self, id: BetId) -> StoreResult<Option<Bet>> {
        Ok(self.staged.bets.get(&id).cloned())
    }

    async fn insert_bet(&mut self, bet: &Bet) -> StoreResult<()> {
        insert_new(&mut self.staged.bets, bet.id, bet.clone(), "bet")?;
        self.staged
            .bets_by_user
            .entry(bet.user_id)
            .or_default()
            .push(bet.id);
        Ok(())
    }

    async fn transition_bet(
        &mut self,
        id: BetId,
        status: BetStatus,
        settled_at: DateTime<Utc>,
    ) -> StoreResult<bool> {
        match self.staged.bets.get_mut(&id) {
            Some(bet) if bet.status == BetStatus::Pending => {
                bet.status = status;
                bet.settled_at = Some(settled_at);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn bets_by_user(&mut self, user_id: UserId) -> StoreResult<Vec<Bet>> {
        let mut bets: Vec<Bet> = self
            .staged
            .bets_by_user
            .get(&user_id)
            .map(|ids| ids.iter().filter_map(|id| self.staged.bets.get(id).cloned()).collect())
            .unwrap_or_default();
        bets.reverse();
        Ok(bets)
    }

    async fn insert_leg(&mut self, leg: &BetLeg) -> StoreResult<()> {
        insert_new(&mut self.staged.legs, leg.id, leg.clone(), "bet leg")?;
        self.staged
            .legs_by_bet
            .entry(leg.bet_id)
            .or_default()
            .push(leg.id);
        self.staged
            .legs_by_prop
            .entry(leg.prop_id)
            .or_default()
            .push(leg.id);
        Ok(())
    }

    async fn legs_by_bet(&mut self, bet_id: BetId) -> StoreResult<Vec<BetLeg>> {
        Ok(self.staged.collect_legs(self.staged.legs_by_bet.get(&bet_id)))
    }

    async fn legs_by_proposition(&mut self, prop_id: PropId) -> StoreResult<Vec<BetLeg>> {
        Ok(self.staged.collect_legs(self.staged.legs_by_prop.get(&prop_id)))
    }

    async fn set_leg_result(&mut self, id: LegId, result: LegResult) -> StoreResult<bool> {
        match self.staged.legs.get_mut(&id) {
            Some(leg) if leg.result == LegResult::Pending => {
                leg.result = result;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn get_direct_bet(&mut self, id: DirectBetId) -> StoreResult<Option<DirectBet>> {
        Ok(self.staged.direct_bets.get(&id).cloned())
    }

    async fn insert_direct_bet(&mut self, bet: &DirectBet) -> StoreResult<()> {
        insert_new(&mut self.staged.direct_bets, bet.id, bet.clone(), "direct bet")
    }

    async fn settle_direct_bet(&mut self, id: DirectBetId, result: DirectResult) -> StoreResult<bool> {
        match self.staged.direct_bets.get_mut(&id) {
            Some(bet) if bet.result.is_none() => {
                bet.result = Some(result);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn commit(self) -> StoreResult<()> {
        let MemoryTx { mut guard, staged } = self;
        *guard = staged;
        Ok(())
    }
}
