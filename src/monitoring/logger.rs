use serde::Serialize;
use tracing::info;

use crate::types::AppConfig;

#[derive(Serialize)]
struct StartupLog<'a> {
    event: &'a str,
    command: &'a str,
    starting_balance: f64,
    min_parlay_legs: usize,
    leaderboard_cache: bool,
}

pub fn log_startup(cfg: &AppConfig, command: &str) {
    let payload = StartupLog {
        event: "startup",
        command,
        starting_balance: cfg.book.starting_balance,
        min_parlay_legs: cfg.book.min_parlay_legs,
        leaderboard_cache: cfg.redis.is_some(),
    };
    info!(target: "sportsbook", startup = serde_json::to_string(&payload).unwrap_or_default().as_str());
}
