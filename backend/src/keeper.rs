//! Upkeep keeper: the external trigger that closes due rounds.
//!
//! Polls [`Raffle::check_upkeep`] on a fixed interval and calls
//! [`Raffle::perform_upkeep`] when it reports true. The raffle re-checks the
//! condition itself, so losing a race to the manual HTTP trigger is harmless.

use raffle::Raffle;
use raffle::errors::UpkeepError;
use raffle::state::RequestId;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::metrics::Metrics;

/// Run the keeper loop forever.
pub async fn run_keeper(raffle: Arc<Raffle>, poll_interval: Duration, metrics: Arc<Metrics>) {
    info!(interval = ?poll_interval, "Starting upkeep keeper");

    let mut ticker = tokio::time::interval(poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        tick(&raffle, &metrics);
    }
}

/// One keeper pass. Returns the request id when a round was closed.
pub fn tick(raffle: &Raffle, metrics: &Metrics) -> Option<RequestId> {
    if !raffle.check_upkeep() {
        return None;
    }

    match raffle.perform_upkeep() {
        Ok(request_id) => {
            metrics.record_upkeep();
            info!(request_id, players = raffle.number_of_players(), "Upkeep performed");
            Some(request_id)
        }
        Err(e @ (UpkeepError::UpkeepNotNeeded { .. } | UpkeepError::AlreadyCalculating)) => {
            debug!(reason = %e, "Upkeep raced, skipping");
            None
        }
        Err(e) => {
            metrics.record_upkeep_failure();
            warn!(error = %e, "Upkeep failed, will retry");
            None
        }
    }
}
