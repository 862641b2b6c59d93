//! Raffle keeper service
//!
//! Hosts a raffle engine and plays every external role it needs. Runs four
//! concurrent subsystems:
//!
//! - **Keeper**: polls the upkeep condition and closes due rounds.
//! - **Fulfiller**: answers randomness requests from the mock coordinator.
//! - **Recorder**: persists a round snapshot after every event (optional).
//! - **HTTP server**: health checks, raffle queries, entries and manual upkeep.

use actix_web::{web, App, HttpServer};
use raffle::Raffle;
use raffle::clock::SystemClock;
use solana_sdk::signature::Signer;
use std::sync::Arc;
use std::sync::atomic::AtomicU64;
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

mod config;
mod coordinator;
mod events;
mod fulfiller;
mod http;
mod keeper;
mod metrics;
mod store;
mod treasury;
mod vrf;

#[cfg(test)]
mod test_support;

use config::AppConfig;
use coordinator::MockCoordinator;
use events::BroadcastSink;
use fulfiller::Fulfiller;
use http::AppState;
use metrics::Metrics;
use treasury::Treasury;

/// Randomness requests buffered between the coordinator and the fulfiller.
const REQUEST_QUEUE_CAPACITY: usize = 256;
/// Raffle events buffered for background subscribers.
const EVENT_BUFFER: usize = 1024;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenvy::dotenv().ok();

    fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,actix_web=warn")),
        )
        .with_target(true)
        .with_ansi(true)
        .init();

    let config = AppConfig::from_env().expect("invalid configuration");
    let authority = config.authority_keypair.pubkey();

    info!(
        authority = %authority,
        entrance_fee = config.raffle.entrance_fee,
        interval = config.raffle.interval,
        "Starting raffle keeper"
    );

    let metrics = Arc::new(Metrics::new());
    let pending_count = Arc::new(AtomicU64::new(0));
    let (coordinator, rx) = MockCoordinator::new(authority, REQUEST_QUEUE_CAPACITY);
    let coordinator = Arc::new(coordinator);
    let treasury = Arc::new(Treasury::new(
        config.treasury_float,
        config.payout_reject_list.iter().copied(),
    ));
    let sink = BroadcastSink::new(EVENT_BUFFER);
    let clock = Arc::new(SystemClock);

    let stored = config
        .state_path
        .as_deref()
        .map(store::load)
        .transpose()
        .expect("failed to load state snapshot")
        .flatten();
    let raffle = match &stored {
        Some(stored) => {
            let snapshot = &stored.round;
            info!(round = snapshot.round, state = %snapshot.state, "Restoring raffle from snapshot");
            Raffle::from_snapshot(
                config.raffle.clone(),
                snapshot,
                coordinator.clone(),
                treasury.clone(),
                clock,
            )
            .expect("state snapshot does not match configuration")
        }
        None => Raffle::new(config.raffle.clone(), coordinator.clone(), treasury.clone(), clock)
            .expect("invalid raffle configuration"),
    };
    let raffle = Arc::new(raffle.with_event_sink(Arc::new(sink.clone())));

    if let Some(stored) = &stored {
        // Deposits are not part of the snapshot; back the restored pot.
        if let Err(e) = treasury.deposit(stored.round.collected_balance) {
            warn!(error = %e, "Could not fund restored pot");
        }
        if let Err(e) = treasury.restore_credits(&stored.credited) {
            warn!(error = %e, "Could not restore credited balances");
        }
    }

    // A round restored mid-draw still needs its randomness.
    if let Some((request_id, request)) = raffle.pending_randomness_request() {
        if let Err(e) = coordinator.resume(request_id, &request) {
            warn!(request_id, error = %e, "Failed to resume pending request");
        }
    }

    // Background: persist a snapshot after every raffle event.
    if let Some(path) = config.state_path.clone() {
        tokio::spawn(store::run_recorder(
            raffle.clone(),
            treasury.clone(),
            path,
            sink.subscribe(),
        ));
    }

    // Background: close rounds as they become due.
    tokio::spawn(keeper::run_keeper(
        raffle.clone(),
        config.keeper_poll_interval,
        metrics.clone(),
    ));

    // Background: consume requests and deliver randomness.
    let fulfiller = Arc::new(Fulfiller::new(
        raffle.clone(),
        coordinator.clone(),
        config.hmac_secret.clone(),
        authority,
        metrics.clone(),
    ));
    tokio::spawn(fulfiller::run_fulfiller(
        fulfiller,
        rx,
        config.fulfillment_concurrency,
        config.fulfillment_delay,
        pending_count.clone(),
    ));

    let state = web::Data::new(AppState {
        raffle,
        coordinator,
        treasury,
        metrics,
        pending_count,
    });

    let addr = ("0.0.0.0", config.http_port);
    info!(port = config.http_port, "Starting HTTP server");

    HttpServer::new(move || App::new().app_data(state.clone()).configure(http::configure))
        .bind(addr)?
        .run()
        .await
}
