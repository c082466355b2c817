use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::{Pool, Postgres};
use thiserror::Error;

use crate::types::{PostgresConfig, RedisConfig};
use crate::wager::{
    Bet, BetId, BetLeg, BetStatus, DirectBet, DirectBetId, DirectResult, Game, GameId, LegId,
    LegResult, ParseEnumError, PropId, PropResult, Proposition, User, UserDelta, UserId,
};

pub mod memory;
pub mod models;
pub mod postgres;
pub mod state;

pub use memory::MemoryStore;
pub use postgres::PgStore;

pub type PgPool = Pool<Postgres>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("serialization error: {0}")]
    SerdeJson(#[from] serde_json::Error),

    #[error("corrupt record: {0}")]
    Corrupt(String),

    #[error("{entity} {id} does not exist")]
    Missing { entity: &'static str, id: uuid::Uuid },

    #[error("{entity} {id} already exists")]
    Duplicate { entity: &'static str, id: uuid::Uuid },
}

impl From<ParseEnumError> for StoreError {
    fn from(e: ParseEnumError) -> Self {
        StoreError::Corrupt(e.to_string())
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// A transactional record store holding the catalog lines, bets, legs and
/// user ledgers.
///
/// Every engine operation opens one transaction with [`RecordStore::begin`] and
/// either commits it or drops it. Transactions must be serializable with
/// respect to each other.
#[async_trait]
pub trait RecordStore: Send + Sync {
    type Tx: StoreTx;

    async fn begin(&self) -> StoreResult<Self::Tx>;
}

/// Operations available inside one store transaction.
///
/// The `set_*`/`transition_*`/`settle_*` methods are compare-and-set from the
/// pending state: they return `false` and change nothing when the record has
/// already left it. A missing record also returns `false`.
#[async_trait]
pub trait StoreTx: Send {
    async fn get_user(&mut self, id: UserId) -> StoreResult<Option<User>>;
    /// Like `get_user`, but holds the row until the transaction ends. Used on
    /// paths that go on to change the balance.
    async fn get_user_for_update(&mut self, id: UserId) -> StoreResult<Option<User>>;
    async fn insert_user(&mut self, user: &User) -> StoreResult<()>;
    /// Add `delta` to the user's balance and counters, returning the new row.
    async fn apply_user_delta(&mut self, id: UserId, delta: &UserDelta) -> StoreResult<User>;
    async fn top_users_by_profit(&mut self, limit: usize) -> StoreResult<Vec<User>>;

    async fn get_game(&mut self, id: GameId) -> StoreResult<Option<Game>>;
    async fn insert_game(&mut self, game: &Game) -> StoreResult<()>;

    async fn get_proposition(&mut self, id: PropId) -> StoreResult<Option<Proposition>>;
    async fn insert_proposition(&mut self, prop: &Proposition) -> StoreResult<()>;
    async fn set_proposition_result(&mut self, id: PropId, result: PropResult) -> StoreResult<bool>;

    async fn get_bet(&mut self, id: BetId) -> StoreResult<Option<Bet>>;
    async fn insert_bet(&mut self, bet: &Bet) -> StoreResult<()>;
    async fn transition_bet(
        &mut self,
        id: BetId,
        status: BetStatus,
        settled_at: DateTime<Utc>,
    ) -> StoreResult<bool>;
    /// Newest first.
    async fn bets_by_user(&mut self, user_id: UserId) -> StoreResult<Vec<Bet>>;

    async fn insert_leg(&mut self, leg: &BetLeg) -> StoreResult<()>;
    /// Legs in placement order.
    async fn legs_by_bet(&mut self, bet_id: BetId) -> StoreResult<Vec<BetLeg>>;
    async fn legs_by_proposition(&mut self, prop_id: PropId) -> StoreResult<Vec<BetLeg>>;
    async fn set_leg_result(&mut self, id: LegId, result: LegResult) -> StoreResult<bool>;

    async fn get_direct_bet(&mut self, id: DirectBetId) -> StoreResult<Option<DirectBet>>;
    async fn insert_direct_bet(&mut self, bet: &DirectBet) -> StoreResult<()>;
    async fn settle_direct_bet(&mut self, id: DirectBetId, result: DirectResult) -> StoreResult<bool>;

    async fn commit(self) -> StoreResult<()>;
}

/// Create a PostgreSQL connection pool using the provided config.
///
/// Connection establishment is performed eagerly so misconfiguration is
/// surfaced at startup.
pub async fn create_pg_pool(cfg: &PostgresConfig) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(cfg.max_connections)
        .acquire_timeout(std::time::Duration::from_secs(15))
        .connect(&cfg.url)
        .await?;
    Ok(pool)
}

/// Create a Redis client using the provided config.
pub fn create_redis_client(cfg: &RedisConfig) -> anyhow::Result<redis::Client> {
    let client = redis::Client::open(cfg.url.as_str())?;
    Ok(client)
}
