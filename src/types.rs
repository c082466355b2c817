use std::fs;

use anyhow::Context;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RedisConfig {
    pub url: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PostgresConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

/// Book-wide settlement parameters.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BookConfig {
    /// Virtual balance credited to a user on first contact.
    #[serde(default = "default_starting_balance")]
    pub starting_balance: f64,
    #[serde(default = "default_leaderboard_limit")]
    pub leaderboard_limit: usize,
    #[serde(default = "default_min_parlay_legs")]
    pub min_parlay_legs: usize,
    #[serde(default = "default_leaderboard_cache_ttl_secs")]
    pub leaderboard_cache_ttl_secs: u64,
}

impl Default for BookConfig {
    fn default() -> Self {
        Self {
            starting_balance: default_starting_balance(),
            leaderboard_limit: default_leaderboard_limit(),
            min_parlay_legs: default_min_parlay_legs(),
            leaderboard_cache_ttl_secs: default_leaderboard_cache_ttl_secs(),
        }
    }
}

fn default_max_connections() -> u32 {
    5
}

fn default_starting_balance() -> f64 {
    100.0
}

fn default_leaderboard_limit() -> usize {
    50
}

fn default_min_parlay_legs() -> usize {
    2
}

fn default_leaderboard_cache_ttl_secs() -> u64 {
    30
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AppConfig {
    pub postgres: PostgresConfig,
    /// Leaderboard caching is skipped when absent.
    #[serde(default)]
    pub redis: Option<RedisConfig>,
    #[serde(default)]
    pub book: BookConfig,
}

impl AppConfig {
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file at {path}"))?;
        let cfg: Self = toml::from_str(&contents)
            .with_context(|| format!("failed to deserialize TOML config at {path}"))?;
        Ok(cfg)
    }
}
