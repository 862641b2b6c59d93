//! HTTP surface: health checks, raffle queries, entries and the manual upkeep trigger.
//!
//! There is no fulfillment route. Randomness only reaches the raffle through
//! the in-process coordinator.

use actix_web::{web, HttpResponse};
use raffle::Raffle;
use raffle::errors::{EntryError, UpkeepError};
use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;
use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info};

use crate::coordinator::MockCoordinator;
use crate::metrics::Metrics;
use crate::treasury::Treasury;

/// Shared application state accessible from HTTP handlers.
pub struct AppState {
    pub raffle: Arc<Raffle>,
    pub coordinator: Arc<MockCoordinator>,
    pub treasury: Arc<Treasury>,
    pub metrics: Arc<Metrics>,
    /// Number of fulfillments currently in flight.
    pub pending_count: Arc<AtomicU64>,
}

#[derive(Debug, Deserialize)]
pub struct EnterRequest {
    /// Base58 participant pubkey.
    pub participant: String,
    /// Lamports paid.
    pub amount: u64,
}

#[derive(Debug, Serialize)]
struct PayoutFaultView {
    request_id: u64,
    winner: String,
    amount: u64,
    reason: String,
    at: i64,
}

#[derive(Debug, Serialize)]
struct RaffleView {
    entrance_fee: u64,
    number_of_players: usize,
    recent_winner: Option<String>,
    lottery_state: u8,
    lottery_state_name: &'static str,
    latest_timestamp: i64,
    interval: u64,
    balance: u64,
    round: u64,
    pending_request_id: Option<u64>,
    last_payout_fault: Option<PayoutFaultView>,
}

fn error_body(message: impl ToString) -> serde_json::Value {
    serde_json::json!({ "error": message.to_string() })
}

fn parse_pubkey(raw: &str) -> Result<Pubkey, HttpResponse> {
    Pubkey::from_str(raw.trim())
        .map_err(|_| HttpResponse::BadRequest().json(error_body(format!("invalid pubkey: {raw}"))))
}

/// Register every route on `cfg`.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health))
        .route("/status", web::get().to(status))
        .route("/metrics", web::get().to(metrics))
        .route("/raffle", web::get().to(raffle_info))
        .route("/raffle/players/{index}", web::get().to(player))
        .route("/raffle/enter", web::post().to(enter))
        .route("/raffle/upkeep", web::get().to(check_upkeep))
        .route("/raffle/upkeep", web::post().to(perform_upkeep))
        .route("/treasury/{pubkey}", web::get().to(treasury_balance));
}

/// Liveness check.
async fn health() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({"status": "ok"}))
}

async fn status(data: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "running",
        "pending_fulfillments": data.pending_count.load(Ordering::Relaxed),
        "unclaimed_requests": data.coordinator.pending_count(),
        "lottery_state": data.raffle.lottery_state().as_str(),
        "treasury_vault": data.treasury.vault(),
    }))
}

async fn metrics(data: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(data.metrics.to_json())
}

async fn raffle_info(data: web::Data<AppState>) -> HttpResponse {
    let raffle = &data.raffle;
    let current = raffle.view();
    let view = RaffleView {
        entrance_fee: raffle.entrance_fee(),
        number_of_players: current.number_of_players,
        recent_winner: current.recent_winner.map(|w| w.to_string()),
        lottery_state: current.state.into(),
        lottery_state_name: current.state.as_str(),
        latest_timestamp: current.latest_timestamp,
        interval: raffle.interval(),
        balance: current.balance,
        round: current.round,
        pending_request_id: current.pending_request,
        last_payout_fault: current.last_payout_fault.map(|f| PayoutFaultView {
            request_id: f.request_id,
            winner: f.winner.to_string(),
            amount: f.amount,
            reason: f.reason,
            at: f.at,
        }),
    };
    HttpResponse::Ok().json(view)
}

async fn player(data: web::Data<AppState>, index: web::Path<usize>) -> HttpResponse {
    match data.raffle.player(index.into_inner()) {
        Ok(player) => HttpResponse::Ok().json(serde_json::json!({ "player": player.to_string() })),
        Err(e) => HttpResponse::NotFound().json(error_body(e)),
    }
}

async fn enter(data: web::Data<AppState>, body: web::Json<EnterRequest>) -> HttpResponse {
    let participant = match parse_pubkey(&body.participant) {
        Ok(p) => p,
        Err(resp) => {
            data.metrics.record_entry(false);
            return resp;
        }
    };

    if let Err(e) = data.treasury.deposit(body.amount) {
        data.metrics.record_entry(false);
        return HttpResponse::Conflict().json(error_body(e));
    }

    match data.raffle.enter(&participant, body.amount) {
        Ok(()) => {
            data.metrics.record_entry(true);
            HttpResponse::Ok().json(serde_json::json!({
                "participant": participant.to_string(),
                "number_of_players": data.raffle.number_of_players(),
            }))
        }
        Err(e) => {
            data.treasury.refund(body.amount);
            data.metrics.record_entry(false);
            debug!(participant = %participant, error = %e, "Entry refused");
            match e {
                EntryError::InsufficientPayment { .. } => {
                    HttpResponse::BadRequest().json(error_body(e))
                }
                EntryError::RoundClosed | EntryError::BalanceOverflow => {
                    HttpResponse::Conflict().json(error_body(e))
                }
            }
        }
    }
}

async fn check_upkeep(data: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({ "upkeep_needed": data.raffle.check_upkeep() }))
}

/// Manual keeper trigger.
async fn perform_upkeep(data: web::Data<AppState>) -> HttpResponse {
    match data.raffle.perform_upkeep() {
        Ok(request_id) => {
            data.metrics.record_upkeep();
            info!(request_id, "Upkeep performed via HTTP");
            HttpResponse::Ok().json(serde_json::json!({ "request_id": request_id }))
        }
        Err(e) => {
            if matches!(e, UpkeepError::OracleUnavailable(_)) {
                data.metrics.record_upkeep_failure();
            }
            HttpResponse::Conflict().json(error_body(e))
        }
    }
}

async fn treasury_balance(data: web::Data<AppState>, pubkey: web::Path<String>) -> HttpResponse {
    match parse_pubkey(&pubkey) {
        Ok(key) => HttpResponse::Ok().json(serde_json::json!({
            "pubkey": key.to_string(),
            "balance": data.treasury.balance_of(&key),
        })),
        Err(resp) => resp,
    }
}
