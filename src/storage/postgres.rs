use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{query, query_as, Executor, Postgres, Transaction};
use tracing::debug;
use uuid::Uuid;

use super::models::{BetLegRow, BetRow, DirectBetRow, GameRow, PropositionRow, UserRow};
use super::{PgPool, RecordStore, StoreError, StoreResult, StoreTx};
use crate::wager::{
    Bet, BetId, BetLeg, BetStatus, DirectBet, DirectBetId, DirectResult, Game, GameId, LegId,
    LegResult, PropId, PropResult, Proposition, User, UserDelta, UserId,
};

/// Table definitions applied by `sportsbook migrate`.
pub const SCHEMA: &str = include_str!("../../migrations/schema.sql");

const USER_COLUMNS: &str =
    "id, username, virtual_balance, lifetime_profit, total_bets, wins, losses, pushes, created_at";
const BET_COLUMNS: &str =
    "id, user_id, bet_type, stake, combined_odds, potential_payout, status, placed_at, settled_at";
const LEG_COLUMNS: &str = "id, bet_id, prop_id, side, odds, custom_line, result";
const PROP_COLUMNS: &str =
    "id, game_id, player_name, prop_type, line_value, over_odds, under_odds, result";

/// Record store backed by PostgreSQL.
///
/// Each transaction runs at SERIALIZABLE isolation and locks the user rows it
/// reads, so placement and grading for the same user never interleave. Status
/// transitions are conditional updates on the pending state.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create all tables and indices if they do not exist yet.
    pub async fn migrate(&self) -> StoreResult<()> {
        self.pool.execute(SCHEMA).await?;
        debug!(target: "storage", "schema applied");
        Ok(())
    }
}

pub struct PgTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl RecordStore for PgStore {
    type Tx = PgTx;

    async fn begin(&self) -> StoreResult<PgTx> {
        let mut tx = self.pool.begin().await?;
        query("SET TRANSACTION ISOLATION LEVEL SERIALIZABLE")
            .execute(&mut *tx)
            .await?;
        Ok(PgTx { tx })
    }
}

fn insert_error(err: sqlx::Error, entity: &'static str, id: Uuid) -> StoreError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            StoreError::Duplicate { entity, id }
        }
        _ => StoreError::Sqlx(err),
    }
}

fn user_by_id_sql(lock: bool) -> String {
    let mut sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
    if lock {
        sql.push_str(" FOR UPDATE");
    }
    sql
}

/// `LIMIT` argument for a row count, saturating instead of wrapping.
fn sql_limit(limit: usize) -> i64 {
    i64::try_from(limit).unwrap_or(i64::MAX)
}

impl PgTx {
    async fn fetch_user(&mut self, id: UserId, lock: bool) -> StoreResult<Option<User>> {
        let sql = user_by_id_sql(lock);
        let row = query_as::<_, UserRow>(&sql)
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(row.map(User::from))
    }
}

#[async_trait]
impl StoreTx for PgTx {
    async fn get_user(&mut self, id: UserId) -> StoreResult<Option<User>> {
        self.fetch_user(id, false).await
    }

    async fn get_user_for_update(&mut self, id: UserId) -> StoreResult<Option<User>> {
        self.fetch_user(id, true).await
    }

    async fn insert_user(&mut self, user: &User) -> StoreResult<()> {
        query(
            "INSERT INTO users \
             (id, username, virtual_balance, lifetime_profit, total_bets, wins, losses, pushes, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(user.id)
        .bind(&user.username)
        .bind(user.virtual_balance)
        .bind(user.lifetime_profit)
        .bind(user.total_bets)
        .bind(user.wins)
        .bind(user.losses)
        .bind(user.pushes)
        .bind(user.created_at)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| insert_error(e, "user", user.id))?;
        Ok(())
    }

    async fn apply_user_delta(&mut self, id: UserId, delta: &UserDelta) -> StoreResult<User> {
        let sql = format!(
            "UPDATE users SET \
             virtual_balance = virtual_balance + $2, \
             lifetime_profit = lifetime_profit + $3, \
             total_bets = total_bets + $4, \
             wins = wins + $5, \
             losses = losses + $6, \
             pushes = pushes + $7 \
             WHERE id = $1 RETURNING {USER_COLUMNS}"
        );
        let row = query_as::<_, UserRow>(&sql)
            .bind(id)
            .bind(delta.balance)
            .bind(delta.lifetime_profit)
            .bind(delta.total_bets)
            .bind(delta.wins)
            .bind(delta.losses)
            .bind(delta.pushes)
            .fetch_optional(&mut *self.tx)
            .await?;
        row.map(User::from)
            .ok_or(StoreError::Missing { entity: "user", id })
    }

    async fn top_users_by_profit(&mut self, limit: usize) -> StoreResult<Vec<User>> {
        let sql = format!(
            "SELECT {USER_COLUMNS} FROM users \
             ORDER BY lifetime_profit DESC, created_at ASC LIMIT $1"
        );
        let rows = query_as::<_, UserRow>(&sql)
            .bind(sql_limit(limit))
            .fetch_all(&mut *self.tx)
            .await?;
        Ok(rows.into_iter().map(User::from).collect())
    }

    async fn get_game(&mut self, id: GameId) -> StoreResult<Option<Game>> {
        let row = query_as::<_, GameRow>(
            "SELECT id, home_team, away_team, start_time, status FROM games WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;
        row.map(Game::try_from).transpose()
    }

    async fn insert_game(&mut self, game: &Game) -> StoreResult<()> {
        query(
            "INSERT INTO games (id, home_team, away_team, start_time, status) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(game.id)
        .bind(&game.home_team)
        .bind(&game.away_team)
        .bind(game.start_time)
        .bind(game.status.as_str())
        .execute(&mut *self.tx)
        .await
        .map_err(|e| insert_error(e, "game", game.id))?;
        Ok(())
    }

    async fn get_proposition(&mut self, id: PropId) -> StoreResult<Option<Proposition>> {
        let sql = format!("SELECT {PROP_COLUMNS} FROM propositions WHERE id = $1 FOR UPDATE");
        let row = query_as::<_, PropositionRow>(&sql)
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?;
        row.map(Proposition::try_from).transpose()
    }

    async fn insert_proposition(&mut self, prop: &Proposition) -> StoreResult<()> {
        query(
            "INSERT INTO propositions \
             (id, game_id, player_name, prop_type, line_value, over_odds, under_odds, result) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(prop.id)
        .bind(prop.game_id)
        .bind(&prop.player_name)
        .bind(prop.prop_type.as_str())
        .bind(prop.line_value)
        .bind(prop.over_odds)
        .bind(prop.under_odds)
        .bind(prop.result.as_str())
        .execute(&mut *self.tx)
        .await
        .map_err(|e| insert_error(e, "proposition", prop.id))?;
        Ok(())
    }

    async fn set_proposition_result(&mut self, id: PropId, result: PropResult) -> StoreResult<bool> {
        let done = query("UPDATE propositions SET result = $2 WHERE id = $1 AND result = 'pending'")
            .bind(id)
            .bind(result.as_str())
            .execute(&mut *self.tx)
            .await?;
        Ok(done.rows_affected() == 1)
    }

    async fn get_bet(&mut self, id: BetId) -> StoreResult<Option<Bet>> {
        let sql = format!("SELECT {BET_COLUMNS} FROM bets WHERE id = $1 FOR UPDATE");
        let row = query_as::<_, BetRow>(&sql)
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?;
        row.map(Bet::try_from).transpose()
    }

    async fn insert_bet(&mut self, bet: &Bet) -> StoreResult<()> {
        query(
            "INSERT INTO bets \
             (id, user_id, bet_type, stake, combined_odds, potential_payout, status, placed_at, settled_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(bet.id)
        .bind(bet.user_id)
        .bind(bet.bet_type.as_str())
        .bind(bet.stake)
        .bind(bet.combined_odds)
        .bind(bet.potential_payout)
        .bind(bet.status.as_str())
        .bind(bet.placed_at)
        .bind(bet.settled_at)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| insert_error(e, "bet", bet.id))?;
        Ok(())
    }

    async fn transition_bet(
        &mut self,
        id: BetId,
        status: BetStatus,
        settled_at: DateTime<Utc>,
    ) -> StoreResult<bool> {
        let done = query(
            "UPDATE bets SET status = $2, settled_at = $3 WHERE id = $1 AND status = 'pending'",
        )
        .bind(id)
        .bind(status.as_str())
        .bind(settled_at)
        .execute(&mut *self.tx)
        .await?;
        Ok(done.rows_affected() == 1)
    }

    async fn bets_by_user(&mut self, user_id: UserId) -> StoreResult<Vec<Bet>> {
        let sql = format!("SELECT {BET_COLUMNS} FROM bets WHERE user_id = $1 ORDER BY placed_at DESC");
        let rows = query_as::<_, BetRow>(&sql)
            .bind(user_id)
            .fetch_all(&mut *self.tx)
            .await?;
        rows.into_iter().map(Bet::try_from).collect()
    }

    async fn insert_leg(&mut self, leg: &BetLeg) -> StoreResult<()> {
        query(
            "INSERT INTO bet_legs (id, bet_id, prop_id, side, odds, custom_line, result) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(leg.id)
        .bind(leg.bet_id)
        .bind(leg.prop_id)
        .bind(leg.side.as_str())
        .bind(leg.odds)
        .bind(leg.custom_line)
        .bind(leg.result.as_str())
        .execute(&mut *self.tx)
        .await
        .map_err(|e| insert_error(e, "bet leg", leg.id))?;
        Ok(())
    }

    async fn legs_by_bet(&mut self, bet_id: BetId) -> StoreResult<Vec<BetLeg>> {
        let sql = format!("SELECT {LEG_COLUMNS} FROM bet_legs WHERE bet_id = $1 ORDER BY seq");
        let rows = query_as::<_, BetLegRow>(&sql)
            .bind(bet_id)
            .fetch_all(&mut *self.tx)
            .await?;
        rows.into_iter().map(BetLeg::try_from).collect()
    }

    async fn legs_by_proposition(&mut self, prop_id: PropId) -> StoreResult<Vec<BetLeg>> {
        let sql = format!("SELECT {LEG_COLUMNS} FROM bet_legs WHERE prop_id = $1 ORDER BY seq");
        let rows = query_as::<_, BetLegRow>(&sql)
            .bind(prop_id)
            .fetch_all(&mut *self.tx)
            .await?;
        rows.into_iter().map(BetLeg::try_from).collect()
    }

    async fn set_leg_result(&mut self, id: LegId, result: LegResult) -> StoreResult<bool> {
        let done = query("UPDATE bet_legs SET result = $2 WHERE id = $1 AND result = 'pending'")
            .bind(id)
            .bind(result.as_str())
            .execute(&mut *self.tx)
            .await?;
        Ok(done.rows_affected() == 1)
    }

    async fn get_direct_bet(&mut self, id: DirectBetId) -> StoreResult<Option<DirectBet>> {
        let row = query_as::<_, DirectBetRow>(
            "SELECT id, user_id, game_ref, prop_ref, amount, prediction, odds, result, placed_at \
             FROM direct_bets WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;
        row.map(DirectBet::try_from).transpose()
    }

    async fn insert_direct_bet(&mut self, bet: &DirectBet) -> StoreResult<()> {
        query(
            "INSERT INTO direct_bets \
             (id, user_id, game_ref, prop_ref, amount, prediction, odds, result, placed_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(bet.id)
        .bind(bet.user_id)
        .bind(&bet.game_ref)
        .bind(&bet.prop_ref)
        .bind(bet.amount)
        .bind(&bet.prediction)
        .bind(bet.odds)
        .bind(bet.result.map(|r| r.as_str()))
        .bind(bet.placed_at)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| insert_error(e, "direct bet", bet.id))?;
        Ok(())
    }

    async fn settle_direct_bet(&mut self, id: DirectBetId, result: DirectResult) -> StoreResult<bool> {
        let done = query("UPDATE direct_bets SET result = $2 WHERE id = $1 AND result IS NULL")
            .bind(id)
            .bind(result.as_str())
            .execute(&mut *self.tx)
            .await?;
        Ok(done.rows_affected() == 1)
    }

    async fn commit(self) -> StoreResult<()> {
        self.tx.commit().await?;
        Ok(())
    }
}
