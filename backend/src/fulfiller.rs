//! Fulfillment engine: consumes `RandomWordsRequested` events from the mock
//! coordinator and delivers randomness back to the raffle as the oracle
//! authority.
//!
//! Each fulfillment:
//! 1. Waits the configured oracle delay.
//! 2. Claims the pending request from the coordinator (at most once).
//! 3. Derives the words: HMAC-SHA256 over the request, expanded to `num_words`.
//! 4. Calls `fulfill_random_words`, which draws and pays the winner.
//!
//! Failures are not retried. A refused payout leaves the round calculating
//! with a payout fault recorded on the raffle.

use anyhow::Result;
use raffle::Raffle;
use raffle::errors::FulfillError;
use solana_sdk::pubkey::Pubkey;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::{mpsc, Semaphore};
use tracing::{error, info, instrument, warn};

use crate::coordinator::{CoordinatorError, MockCoordinator, RandomWordsRequested};
use crate::metrics::Metrics;
use crate::vrf::{compute_randomness, expand_randomness};

pub struct Fulfiller {
    raffle: Arc<Raffle>,
    coordinator: Arc<MockCoordinator>,
    hmac_secret: Vec<u8>,
    authority: Pubkey,
    metrics: Arc<Metrics>,
}

impl Fulfiller {
    pub fn new(
        raffle: Arc<Raffle>,
        coordinator: Arc<MockCoordinator>,
        hmac_secret: Vec<u8>,
        authority: Pubkey,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            raffle,
            coordinator,
            hmac_secret,
            authority,
            metrics,
        }
    }

    /// Claim, derive and deliver one request. Returns the time since it was issued.
    #[instrument(skip_all, fields(request_id = event.request_id))]
    pub fn fulfill_request(&self, event: &RandomWordsRequested) -> Result<Duration> {
        let pending = self.coordinator.take_pending(event.request_id)?;
        let request = &pending.request;

        let base = compute_randomness(&self.hmac_secret, &request.seed, request.round, event.request_id);
        let words = expand_randomness(&base, request.num_words);

        self.raffle
            .fulfill_random_words(&self.authority, event.request_id, &words)?;

        Ok(pending.requested_at.elapsed())
    }

    fn handle_outcome(&self, event: &RandomWordsRequested, outcome: Result<Duration>) {
        match outcome {
            Ok(latency) => {
                let latency_ms = latency.as_millis() as u64;
                self.metrics.record_fulfillment(latency_ms);
                info!(
                    request_id = event.request_id,
                    round = event.round,
                    winner = ?self.raffle.recent_winner(),
                    latency_ms,
                    "Fulfilled successfully"
                );
            }
            Err(e) => handle_fulfillment_error(event.request_id, e, &self.metrics),
        }
    }
}

fn handle_fulfillment_error(request_id: u64, error: anyhow::Error, metrics: &Metrics) {
    let err_str = format!("{error:#}");

    if let Some(FulfillError::PayoutFailed { winner, amount, .. }) = error.downcast_ref::<FulfillError>() {
        metrics.record_payout_fault();
        error!(
            request_id,
            winner = %winner,
            amount,
            error = %err_str,
            "Payout failed, round left calculating"
        );
        return;
    }

    let stale = matches!(
        error.downcast_ref::<CoordinatorError>(),
        Some(CoordinatorError::NonexistentRequest(_))
    ) || matches!(
        error.downcast_ref::<FulfillError>(),
        Some(FulfillError::UnknownRequest { .. })
    );
    metrics.record_failure();
    if stale {
        warn!(request_id, reason = %err_str, "Skipping stale request");
    } else {
        error!(request_id, error = %err_str, "Failed to fulfill");
    }
}

/// Main fulfiller loop.
pub async fn run_fulfiller(
    fulfiller: Arc<Fulfiller>,
    mut rx: mpsc::Receiver<RandomWordsRequested>,
    concurrency: usize,
    delay: Duration,
    pending_count: Arc<AtomicU64>,
) {
    let semaphore = Arc::new(Semaphore::new(concurrency));

    while let Some(event) = rx.recv().await {
        pending_count.fetch_add(1, Ordering::Relaxed);
        fulfiller.metrics.record_request();

        let permit = match semaphore.clone().acquire_owned().await {
            Ok(p) => p,
            Err(_) => {
                error!("Semaphore closed, stopping fulfiller");
                break;
            }
        };
        let fulfiller = fulfiller.clone();
        let pending = pending_count.clone();

        tokio::spawn(async move {
            let _permit = permit;

            info!(
                request_id = event.request_id,
                round = event.round,
                num_words = event.num_words,
                "Fulfilling randomness request"
            );
            tokio::time::sleep(delay).await;

            let outcome = fulfiller.fulfill_request(&event);
            fulfiller.handle_outcome(&event, outcome);

            pending.fetch_sub(1, Ordering::Relaxed);
        });
    }

    info!("Fulfiller channel closed, shutting down");
}
