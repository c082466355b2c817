use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use once_cell::sync::Lazy;
use serde::Serialize;
use tracing::info;

use crate::wager::Outcome;

/// Global settlement counters used across the book.
pub static METRICS: Lazy<Metrics> = Lazy::new(Metrics::default);

fn now_unix_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_else(|_| Duration::from_secs(0))
        .as_secs()
}

#[derive(Default)]
struct MetricsInner {
    bets_placed: AtomicU64,
    grading_requests: AtomicU64,
    grading_noops: AtomicU64,
    bets_won: AtomicU64,
    bets_lost: AtomicU64,
    bets_pushed: AtomicU64,
    last_event_ts: AtomicU64,
}

/// Lightweight metrics handle backed by atomics so it can be cloned cheaply.
#[derive(Clone, Default)]
pub struct Metrics {
    inner: Arc<MetricsInner>,
}

impl Metrics {
    fn touch(&self) {
        self.inner
            .last_event_ts
            .store(now_unix_secs(), Ordering::Relaxed);
    }

    pub fn record_bet_placed(&self, bet_type: &str, stake: f64) {
        self.inner.bets_placed.fetch_add(1, Ordering::Relaxed);
        self.touch();

        info!(
            target: "metrics",
            event = "bet_placed",
            bet_type = %bet_type,
            stake,
            total_placed = self.inner.bets_placed.load(Ordering::Relaxed),
            "bet placed"
        );
    }

    pub fn record_grading(&self, trigger: &str, noop: bool) {
        self.inner.grading_requests.fetch_add(1, Ordering::Relaxed);
        if noop {
            self.inner.grading_noops.fetch_add(1, Ordering::Relaxed);
        }
        self.touch();

        info!(
            target: "metrics",
            event = "grading",
            trigger = %trigger,
            noop,
            total_requests = self.inner.grading_requests.load(Ordering::Relaxed),
            "grading request completed"
        );
    }

    pub fn record_settlement(&self, outcome: Outcome, profit: f64) {
        let counter = match outcome {
            Outcome::Won => &self.inner.bets_won,
            Outcome::Lost => &self.inner.bets_lost,
            Outcome::Push => &self.inner.bets_pushed,
        };
        counter.fetch_add(1, Ordering::Relaxed);
        self.touch();

        info!(
            target: "metrics",
            event = "bet_settled",
            outcome = ?outcome,
            profit,
            "bet settled"
        );
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            bets_placed: self.inner.bets_placed.load(Ordering::Relaxed),
            grading_requests: self.inner.grading_requests.load(Ordering::Relaxed),
            grading_noops: self.inner.grading_noops.load(Ordering::Relaxed),
            bets_won: self.inner.bets_won.load(Ordering::Relaxed),
            bets_lost: self.inner.bets_lost.load(Ordering::Relaxed),
            bets_pushed: self.inner.bets_pushed.load(Ordering::Relaxed),
            last_event_ts: self.inner.last_event_ts.load(Ordering::Relaxed),
        }
    }
}

/// Serializable view of current counters.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub bets_placed: u64,
    pub grading_requests: u64,
    pub grading_noops: u64,
    pub bets_won: u64,
    pub bets_lost: u64,
    pub bets_pushed: u64,
    pub last_event_ts: u64,
}

impl MetricsSnapshot {
    pub fn bets_settled(&self) -> u64 {
        self.bets_won + self.bets_lost + self.bets_pushed
    }
}

pub fn log_metrics_snapshot(snapshot: &MetricsSnapshot) {
    info!(
        target: "metrics",
        event = "metrics_snapshot",
        bets_placed = snapshot.bets_placed,
        grading_requests = snapshot.grading_requests,
        grading_noops = snapshot.grading_noops,
        bets_settled = snapshot.bets_settled(),
        last_event_ts = snapshot.last_event_ts,
        "metrics snapshot"
    );
}
