use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

pub mod grading;
pub mod history;
pub mod leaderboard;
pub mod ledger;
pub mod placement;

use crate::monitoring::metrics::METRICS;
use crate::odds::{self, OddsError};
use crate::storage::{RecordStore, StoreError, StoreTx};
use crate::types::BookConfig;
use crate::wager::{
    BetId, DirectBetId, DirectResult, Game, GradeResult, PropId, Proposition, Side, User, UserId,
};

pub use grading::{GradeTrigger, GradingReport, Resolution, Settlement};
pub use history::{BetView, LegView};
pub use leaderboard::LeaderboardEntry;
pub use ledger::LedgerEntry;
pub use placement::{BetRequest, DirectBetRequest, LegRequest};

#[derive(Debug, Error)]
pub enum WagerError {
    #[error("invalid actor: {0}")]
    InvalidActor(String),

    #[error("stake must be positive, got {0}")]
    InvalidStake(f64),

    #[error("insufficient balance: need {required}, have {available}")]
    InsufficientBalance { required: f64, available: f64 },

    #[error("bet has no legs")]
    EmptyBet,

    #[error("parlay needs at least {min} legs, got {got}")]
    ParlayTooShort { min: usize, got: usize },

    #[error("odds {odds} on proposition {prop_id} are not a valid price")]
    InvalidOdds { prop_id: PropId, odds: i32 },

    #[error("line {0} is not a finite number")]
    InvalidLine(f64),

    #[error("decimal odds {0} must be at least 1.0")]
    InvalidDecimalOdds(f64),

    #[error("proposition {0} is already graded")]
    PropositionClosed(PropId),

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: Uuid },

    #[error("consistency error: {0}")]
    Consistency(String),

    #[error("pricing error: {0}")]
    Odds(#[from] OddsError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// Coarse classification of a [`WagerError`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Consistency,
    Store,
}

impl WagerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            WagerError::InvalidActor(_)
            | WagerError::InvalidStake(_)
            | WagerError::InsufficientBalance { .. }
            | WagerError::EmptyBet
            | WagerError::ParlayTooShort { .. }
            | WagerError::InvalidOdds { .. }
            | WagerError::InvalidDecimalOdds(_)
            | WagerError::InvalidLine(_)
            | WagerError::PropositionClosed(_)
            | WagerError::Odds(OddsError::Overflow { .. }) => ErrorKind::Validation,
            WagerError::NotFound { .. } => ErrorKind::NotFound,
            WagerError::Consistency(_) | WagerError::Odds(_) => ErrorKind::Consistency,
            WagerError::Store(_) => ErrorKind::Store,
        }
    }

    fn not_found(entity: &'static str, id: Uuid) -> Self {
        WagerError::NotFound { entity, id }
    }
}

pub type WagerResult<T> = Result<T, WagerError>;

/// Entry point for placing, grading and reporting on paper wagers.
///
/// Every method runs as exactly one record-store transaction: it commits on
/// success and is discarded on any error, so a failed call can be retried in
/// full.
#[derive(Clone)]
pub struct Sportsbook<S> {
    store: S,
    config: BookConfig,
}

impl<S: RecordStore> Sportsbook<S> {
    pub fn new(store: S, config: BookConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &BookConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Return the user, creating it with the starting balance on first contact.
    pub async fn ensure_user(&self, user_id: UserId, username: &str) -> WagerResult<User> {
        let username = username.trim();
        if username.is_empty() {
            return Err(WagerError::InvalidActor("username is empty".to_string()));
        }
        let mut tx = self.store.begin().await?;
        if let Some(user) = tx.get_user(user_id).await? {
            return Ok(user);
        }
        let user = User::new(user_id, username, self.config.starting_balance);
        tx.insert_user(&user).await?;
        tx.commit().await?;
        info!(
            target: "engine",
            user_id = %user.id,
            username = %user.username,
            balance = user.virtual_balance,
            "user created"
        );
        Ok(user)
    }

    pub async fn user(&self, user_id: UserId) -> WagerResult<User> {
        let mut tx = self.store.begin().await?;
        tx.get_user(user_id)
            .await?
            .ok_or_else(|| WagerError::not_found("user", user_id))
    }

    pub async fn add_game(&self, game: &Game) -> WagerResult<()> {
        let mut tx = self.store.begin().await?;
        tx.insert_game(game).await?;
        tx.commit().await?;
        Ok(())
    }

    /// Insert a catalog line. Its game must already exist.
    pub async fn add_proposition(&self, prop: &Proposition) -> WagerResult<()> {
        let mut tx = self.store.begin().await?;
        if tx.get_game(prop.game_id).await?.is_none() {
            return Err(WagerError::not_found("game", prop.game_id));
        }
        tx.insert_proposition(prop).await?;
        tx.commit().await?;
        Ok(())
    }

    pub async fn proposition(&self, prop_id: PropId) -> WagerResult<Proposition> {
        let mut tx = self.store.begin().await?;
        tx.get_proposition(prop_id)
            .await?
            .ok_or_else(|| WagerError::not_found("proposition", prop_id))
    }

    /// Price a leg on `prop_id`, adjusting for a custom line if one is given.
    pub async fn quote_leg(
        &self,
        prop_id: PropId,
        side: Side,
        custom_line: Option<f64>,
    ) -> WagerResult<i32> {
        if let Some(line) = custom_line.filter(|l| !l.is_finite()) {
            return Err(WagerError::InvalidLine(line));
        }
        let prop = self.proposition(prop_id).await?;
        Ok(odds::quote(&prop, side, custom_line))
    }

    /// Place a single or parlay bet. Singles create one bet per leg.
    pub async fn place_bet(&self, req: &BetRequest) -> WagerResult<Vec<BetId>> {
        let mut tx = self.store.begin().await?;
        let bets = placement::place_bet(&mut tx, &self.config, req).await?;
        tx.commit().await?;
        for bet in &bets {
            METRICS.record_bet_placed(bet.bet_type.as_str(), bet.stake);
        }
        Ok(bets.into_iter().map(|b| b.id).collect())
    }

    pub async fn place_direct_bet(&self, req: &DirectBetRequest) -> WagerResult<DirectBetId> {
        let mut tx = self.store.begin().await?;
        let bet = placement::place_direct_bet(&mut tx, req).await?;
        tx.commit().await?;
        METRICS.record_bet_placed("direct", bet.amount);
        Ok(bet.id)
    }

    /// Run one grading request to completion.
    pub async fn settle(&self, trigger: GradeTrigger) -> WagerResult<GradingReport> {
        let mut tx = self.store.begin().await?;
        let report = grading::settle(&mut tx, trigger).await?;
        tx.commit().await?;

        METRICS.record_grading(trigger.label(), report.already_graded);
        for settlement in &report.settlements {
            METRICS.record_settlement(settlement.resolution.outcome, settlement.resolution.profit);
        }
        if !report.skipped.is_empty() {
            warn!(
                target: "engine",
                trigger = trigger.label(),
                skipped = report.skipped.len(),
                "skipped bets that were already settled"
            );
        }
        Ok(report)
    }

    pub async fn grade_proposition(
        &self,
        prop_id: PropId,
        result: GradeResult,
    ) -> WagerResult<GradingReport> {
        self.settle(GradeTrigger::Proposition { prop_id, result }).await
    }

    pub async fn grade_bet_direct(
        &self,
        bet_id: DirectBetId,
        result: DirectResult,
    ) -> WagerResult<GradingReport> {
        self.settle(GradeTrigger::DirectBet { bet_id, result }).await
    }

    pub async fn leaderboard(&self, limit: usize) -> WagerResult<Vec<LeaderboardEntry>> {
        let mut tx = self.store.begin().await?;
        leaderboard::top(&mut tx, limit).await
    }

    pub async fn bet_history(&self, user_id: UserId) -> WagerResult<Vec<BetView>> {
        let mut tx = self.store.begin().await?;
        history::bets_for_user(&mut tx, user_id).await
    }
}
