use redis::aio::ConnectionManager;
use redis::AsyncCommands;

use super::{create_redis_client, StoreResult};
use crate::engine::leaderboard::LeaderboardEntry;
use crate::types::RedisConfig;

const KEY_PREFIX: &str = "leaderboard:top";

/// Caches rendered leaderboard snapshots in Redis.
///
/// Snapshots are keyed by `leaderboard:top:{limit}` and expire after the
/// configured TTL. Grading invalidates every cached size.
pub struct LeaderboardCache {
    conn: ConnectionManager,
    ttl_secs: u64,
}

impl LeaderboardCache {
    pub async fn connect(cfg: &RedisConfig, ttl_secs: u64) -> anyhow::Result<Self> {
        let client = create_redis_client(cfg)?;
        let conn = ConnectionManager::new(client).await?;
        Ok(Self { conn, ttl_secs })
    }

    fn key(limit: usize) -> String {
        format!("{KEY_PREFIX}:{limit}")
    }

    fn pattern() -> String {
        format!("{KEY_PREFIX}:*")
    }

    pub async fn save(&mut self, limit: usize, entries: &[LeaderboardEntry]) -> StoreResult<()> {
        let val = serde_json::to_string(entries)?;
        let _: () = redis::cmd("SET")
            .arg(Self::key(limit))
            .arg(val)
            .arg("EX")
            .arg(self.ttl_secs)
            .query_async(&mut self.conn)
            .await?;
        Ok(())
    }

    pub async fn load(&mut self, limit: usize) -> StoreResult<Option<Vec<LeaderboardEntry>>> {
        let v: Option<String> = self.conn.get(Self::key(limit)).await?;
        match v {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    /// Drop every cached leaderboard size.
    ///
    /// Keys are found with incremental `SCAN` so a large keyspace never blocks
    /// the server.
    pub async fn invalidate(&mut self) -> StoreResult<()> {
        let mut keys: Vec<String> = Vec::new();
        {
            let mut iter: redis::AsyncIter<String> = self.conn.scan_match(Self::pattern()).await?;
            while let Some(key) = iter.next_item().await {
                keys.push(key);
            }
        }
        keys.sort();
        keys.dedup();
        if !keys.is_empty() {
            let _: () = self.conn.del(keys).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn glob_matches(pattern: &str, key: &str) -> bool {
        match pattern.strip_suffix('*') {
            Some(prefix) => key.starts_with(prefix),
            None => pattern == key,
        }
    }

    #[test]
    fn scan_pattern_covers_every_cached_size() {
        for limit in [1, 10, 50, 1000] {
            assert!(glob_matches(&LeaderboardCache::pattern(), &LeaderboardCache::key(limit)));
        }
        assert!(!glob_matches(&LeaderboardCache::pattern(), "leaderboard:other"));
    }
}
