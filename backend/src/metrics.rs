//! Counters for the raffle keeper service.
//!
//! All counters are backed by atomics for lock-free concurrent access.

use std::sync::atomic::{AtomicU64, Ordering};

/// Aggregated service metrics. Share via `Arc<Metrics>`.
#[derive(Default)]
pub struct Metrics {
    /// Entries accepted by the raffle.
    pub entries_accepted: AtomicU64,
    /// Entries rejected (underpaid, round closed, bad request).
    pub entries_rejected: AtomicU64,
    /// Rounds closed by upkeep, from the keeper or the manual trigger.
    pub upkeeps_performed: AtomicU64,
    /// Upkeep attempts refused by the oracle.
    pub upkeeps_failed: AtomicU64,
    /// Randomness requests handed to the fulfiller.
    pub requests_received: AtomicU64,
    /// Requests that completed with a paid winner.
    pub requests_fulfilled: AtomicU64,
    /// Requests that could not be fulfilled.
    pub requests_failed: AtomicU64,
    /// Fulfillments whose payout was refused.
    pub payouts_faulted: AtomicU64,
    /// Sum of request-to-fulfillment latencies in milliseconds.
    pub fulfillment_latency_sum_ms: AtomicU64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_entry(&self, accepted: bool) {
        let counter = if accepted {
            &self.entries_accepted
        } else {
            &self.entries_rejected
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_upkeep(&self) {
        self.upkeeps_performed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_upkeep_failure(&self) {
        self.upkeeps_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_request(&self) {
        self.requests_received.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a successful fulfillment with its latency.
    pub fn record_fulfillment(&self, latency_ms: u64) {
        self.requests_fulfilled.fetch_add(1, Ordering::Relaxed);
        self.fulfillment_latency_sum_ms
            .fetch_add(latency_ms, Ordering::Relaxed);
    }

    pub fn record_failure(&self) {
        self.requests_failed.fetch_add(1, Ordering::Relaxed);
    }

    /// A payout fault is also a failed fulfillment.
    pub fn record_payout_fault(&self) {
        self.payouts_faulted.fetch_add(1, Ordering::Relaxed);
        self.record_failure();
    }

    /// Average fulfillment latency in milliseconds, or 0 if none.
    pub fn avg_latency_ms(&self) -> u64 {
        let count = self.requests_fulfilled.load(Ordering::Relaxed);
        if count == 0 {
            return 0;
        }
        self.fulfillment_latency_sum_ms.load(Ordering::Relaxed) / count
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "entries_accepted": self.entries_accepted.load(Ordering::Relaxed),
            "entries_rejected": self.entries_rejected.load(Ordering::Relaxed),
            "upkeeps_performed": self.upkeeps_performed.load(Ordering::Relaxed),
            "upkeeps_failed": self.upkeeps_failed.load(Ordering::Relaxed),
            "requests_received": self.requests_received.load(Ordering::Relaxed),
            "requests_fulfilled": self.requests_fulfilled.load(Ordering::Relaxed),
            "requests_failed": self.requests_failed.load(Ordering::Relaxed),
            "payouts_faulted": self.payouts_faulted.load(Ordering::Relaxed),
            "avg_fulfillment_latency_ms": self.avg_latency_ms(),
            "total_fulfillment_latency_ms": self.fulfillment_latency_sum_ms.load(Ordering::Relaxed),
        })
    }
}
