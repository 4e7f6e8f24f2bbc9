use super::error::EngineError;
use tokio::sync::watch;
use tracing::{info, warn};

/// Handshake progress of an engine session.
///
/// Moves only forward: `Uninitialized -> Initializing -> {Ready, Failed}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadinessState {
    Uninitialized,
    Initializing,
    Ready,
    Failed(String),
}

impl ReadinessState {
    /// Ready or Failed; no further transitions are possible
    pub fn is_settled(&self) -> bool {
        matches!(self, ReadinessState::Ready | ReadinessState::Failed(_))
    }
}

/// Write side of the readiness state. Owned by the engine session.
#[derive(Debug)]
pub struct ReadinessMonitor {
    state: watch::Sender<ReadinessState>,
}

impl ReadinessMonitor {
    pub fn new() -> Self {
        let (state, _) = watch::channel(ReadinessState::Uninitialized);
        Self { state }
    }

    pub fn state(&self) -> ReadinessState {
        self.state.borrow().clone()
    }

    /// A handle any number of callers can wait on
    pub fn subscribe(&self) -> ReadinessWaiter {
        ReadinessWaiter {
            state: self.state.subscribe(),
        }
    }

    /// `Uninitialized -> Initializing`
    pub fn begin(&self) -> bool {
        self.advance(|current| {
            (*current == ReadinessState::Uninitialized).then_some(ReadinessState::Initializing)
        })
    }

    /// `Initializing -> Ready`
    pub fn mark_ready(&self) -> bool {
        let changed = self.advance(|current| {
            (*current == ReadinessState::Initializing).then_some(ReadinessState::Ready)
        });
        if changed {
            info!("Engine is ready");
        }
        changed
    }

    /// Any unsettled state `-> Failed(reason)`. No effect once settled.
    pub fn mark_failed(&self, reason: impl Into<String>) -> bool {
        let reason = reason.into();
        let changed = self.advance(|current| {
            (!current.is_settled()).then(|| ReadinessState::Failed(reason.clone()))
        });
        if changed {
            warn!("Engine failed to initialize: {}", reason);
        }
        changed
    }

    fn advance(&self, next: impl FnOnce(&ReadinessState) -> Option<ReadinessState>) -> bool {
        self.state.send_if_modified(|current| match next(current) {
            Some(state) => {
                *current = state;
                true
            }
            None => false,
        })
    }
}

impl Default for ReadinessMonitor {
    fn default() -> Self {
        Self::new()
    }
}

/// Read side of the readiness state: a one-shot broadcast completion.
///
/// Waiting never re-triggers the handshake; every waiter, early or late,
/// observes the same settled outcome.
#[derive(Debug, Clone)]
pub struct ReadinessWaiter {
    state: watch::Receiver<ReadinessState>,
}

impl ReadinessWaiter {
    pub fn state(&self) -> ReadinessState {
        self.state.borrow().clone()
    }

    /// Resolve once the engine is `Ready`; fail with `Unavailable` once it is `Failed`.
    pub async fn wait_until_ready(&self) -> Result<(), EngineError> {
        let mut receiver = self.state.clone();
        let settled = receiver
            .wait_for(ReadinessState::is_settled)
            .await
            .map(|current| (*current).clone())
            // The monitor went away before the handshake finished
            .map_err(|_| EngineError::Unavailable("engine session closed".to_string()))?;

        match settled {
            ReadinessState::Ready => Ok(()),
            ReadinessState::Failed(reason) => Err(EngineError::Unavailable(reason)),
            ReadinessState::Uninitialized | ReadinessState::Initializing => Err(
                EngineError::Unavailable("engine session closed".to_string()),
            ),
        }
    }
}
