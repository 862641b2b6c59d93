//! One module per raffle transition, each exposing a `handler` that runs
//! against the locked [`Round`].

pub(crate) mod check_upkeep;
pub(crate) mod enter;
pub(crate) mod fulfill_random_words;
pub(crate) mod perform_upkeep;

use crate::events::EventSink;
use crate::state::{RaffleConfig, Round};

/// State a transition handler may touch, borrowed for the duration of one call.
pub(crate) struct Context<'a> {
    pub round: &'a mut Round,
    pub config: &'a RaffleConfig,
    /// Clock reading taken after the round lock was acquired.
    pub now: i64,
    pub events: &'a dyn EventSink,
}
