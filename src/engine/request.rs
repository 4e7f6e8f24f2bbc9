//! Single-flight request bookkeeping.
//!
//! The slot holds at most one [`PendingRequest`]. Settling consumes the
//! request, which drops its timer and its outcome sink together, so a request
//! can neither settle twice nor leave a live timer behind.

use super::error::EngineError;
use std::future::pending;
use std::pin::Pin;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::time::{sleep, Sleep};
use tracing::debug;

pub type BestMoveResult = Result<String, EngineError>;

/// Sequence number of a `go` command within a session
pub type SearchId = u64;

/// The one in-flight best-move request
#[derive(Debug)]
pub struct PendingRequest {
    /// Caller-supplied context recorded at dispatch (the orchestrator passes its epoch)
    pub tag: u64,
    pub search: SearchId,
    pub timeout: Duration,
    sink: oneshot::Sender<BestMoveResult>,
    timer: Pin<Box<Sleep>>,
}

impl PendingRequest {
    fn settle(self, outcome: BestMoveResult) {
        match &outcome {
            Ok(token) => debug!(tag = self.tag, search = self.search, "Resolved with {}", token),
            Err(e) => debug!(
                tag = self.tag,
                search = self.search,
                reason = e.kind(),
                "Rejected"
            ),
        }
        // The caller may have given up waiting; that is not an error here
        let _ = self.sink.send(outcome);
    }
}

/// What an inbound `bestmove` line meant for the slot
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BestMoveMatch {
    /// Answered the live request, which is now resolved
    Resolved,
    /// Answered a search whose request was already settled
    Stale,
    /// The live search reported no move; the request stays pending
    NoMove,
    /// No search was outstanding
    Unsolicited,
}

/// Holder of zero or one pending request, plus the accounting that ties
/// `bestmove` lines back to the `go` that produced them.
#[derive(Debug, Default)]
pub struct RequestSlot {
    pending: Option<PendingRequest>,
    searches_started: SearchId,
    searches_reported: SearchId,
}

impl RequestSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_occupied(&self) -> bool {
        self.pending.is_some()
    }

    pub fn pending(&self) -> Option<&PendingRequest> {
        self.pending.as_ref()
    }

    /// Searches sent whose `bestmove` has not arrived yet
    pub fn outstanding_searches(&self) -> u64 {
        self.searches_started - self.searches_reported
    }

    /// Record a newly sent `go` and park its request in the slot.
    ///
    /// The slot must be empty: callers settle any previous request first.
    pub fn install(
        &mut self,
        tag: u64,
        sink: oneshot::Sender<BestMoveResult>,
        timeout: Duration,
    ) -> SearchId {
        debug_assert!(self.pending.is_none(), "slot must be cleared before install");
        self.searches_started += 1;
        let search = self.searches_started;
        self.pending = Some(PendingRequest {
            tag,
            search,
            timeout,
            sink,
            timer: Box::pin(sleep(timeout)),
        });
        search
    }

    /// Settle and clear the pending request, if any. Returns whether one was settled.
    pub fn settle(&mut self, outcome: BestMoveResult) -> bool {
        match self.pending.take() {
            Some(request) => {
                request.settle(outcome);
                true
            }
            None => false,
        }
    }

    /// Attribute a `bestmove` line to the oldest unreported search.
    pub fn on_best_move(&mut self, token: Option<String>) -> BestMoveMatch {
        if self.searches_reported == self.searches_started {
            return BestMoveMatch::Unsolicited;
        }
        self.searches_reported += 1;
        let search = self.searches_reported;

        let is_live = self.pending.as_ref().is_some_and(|p| p.search == search);
        match (is_live, token) {
            (false, _) => BestMoveMatch::Stale,
            (true, None) => BestMoveMatch::NoMove,
            (true, Some(token)) => {
                self.settle(Ok(token));
                BestMoveMatch::Resolved
            }
        }
    }

    /// Completes when the pending request's deadline passes. Never completes while empty.
    pub async fn expired(&mut self) {
        match self.pending.as_mut() {
            Some(request) => request.timer.as_mut().await,
            None => pending().await,
        }
    }
}
