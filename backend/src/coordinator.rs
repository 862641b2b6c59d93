//! In-process mock of a VRF coordinator.
//!
//! The raffle calls [`MockCoordinator::request_random_words`] while holding its
//! round lock, so registering a request never blocks: the id is recorded in
//! the pending table and a [`RandomWordsRequested`] event is pushed onto a
//! bounded channel with `try_send`. The fulfiller drains that channel and
//! claims each request with [`MockCoordinator::take_pending`].

use raffle::errors::OracleError;
use raffle::oracle::{RandomnessOracle, RandomnessRequest};
use raffle::state::RequestId;
use solana_sdk::pubkey::Pubkey;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Instant;
use tokio::sync::mpsc;
use tracing::{info, warn};

/// Emitted for every accepted randomness request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RandomWordsRequested {
    pub request_id: RequestId,
    pub round: u64,
    pub num_words: u32,
}

/// A request waiting for the fulfiller.
#[derive(Debug, Clone)]
pub struct PendingRequest {
    pub request: RandomnessRequest,
    pub requested_at: Instant,
}

#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinatorError {
    #[error("nonexistent request {0}")]
    NonexistentRequest(RequestId),
}

pub struct MockCoordinator {
    authority: Pubkey,
    next_id: AtomicU64,
    pending: Mutex<HashMap<RequestId, PendingRequest>>,
    tx: mpsc::Sender<RandomWordsRequested>,
}

impl MockCoordinator {
    /// Coordinator whose fulfillments are signed by `authority`, plus the
    /// receiving end of its request channel.
    pub fn new(
        authority: Pubkey,
        capacity: usize,
    ) -> (Self, mpsc::Receiver<RandomWordsRequested>) {
        let (tx, rx) = mpsc::channel(capacity);
        let coordinator = Self {
            authority,
            next_id: AtomicU64::new(1),
            pending: Mutex::new(HashMap::new()),
            tx,
        };
        (coordinator, rx)
    }

    /// Re-register a request issued by an earlier process, keeping its id.
    pub fn resume(&self, request_id: RequestId, request: &RandomnessRequest) -> Result<(), OracleError> {
        self.next_id.fetch_max(request_id.saturating_add(1), Ordering::SeqCst);
        info!(request_id, round = request.round, "Resuming pending request");
        self.register(request_id, request)
    }

    /// Remove a pending request so it is fulfilled at most once.
    pub fn take_pending(&self, request_id: RequestId) -> Result<PendingRequest, CoordinatorError> {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&request_id)
            .ok_or(CoordinatorError::NonexistentRequest(request_id))
    }

    pub fn pending_count(&self) -> usize {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn register(&self, request_id: RequestId, request: &RandomnessRequest) -> Result<(), OracleError> {
        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        pending.insert(
            request_id,
            PendingRequest {
                request: request.clone(),
                requested_at: Instant::now(),
            },
        );

        let event = RandomWordsRequested {
            request_id,
            round: request.round,
            num_words: request.num_words,
        };
        if let Err(e) = self.tx.try_send(event) {
            pending.remove(&request_id);
            warn!(request_id, error = %e, "Dropping randomness request");
            return Err(match e {
                mpsc::error::TrySendError::Full(_) => OracleError::QueueFull,
                mpsc::error::TrySendError::Closed(_) => OracleError::Closed,
            });
        }
        Ok(())
    }
}

impl RandomnessOracle for MockCoordinator {
    fn authority(&self) -> Pubkey {
        self.authority
    }

    fn request_random_words(&self, request: &RandomnessRequest) -> Result<RequestId, OracleError> {
        let request_id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.register(request_id, request)?;
        info!(
            request_id,
            round = request.round,
            num_words = request.num_words,
            "RandomWordsRequested"
        );
        Ok(request_id)
    }
}
