use crate::chess::Move;
use crate::engine::{EngineClient, EngineError, SearchHandle};
use std::fmt;
use std::time::Duration;
use tracing::debug;

/// Generation of the game state. Bumped by every reset so results computed
/// against an older state can be recognised and dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Epoch(u64);

impl Epoch {
    pub fn value(&self) -> u64 {
        self.0
    }

    pub(crate) fn advance(&mut self) {
        self.0 += 1;
    }
}

impl fmt::Display for Epoch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnState {
    Idle,
    AwaitingEngine { epoch: Epoch },
}

#[derive(Debug)]
enum TurnPlan {
    /// Already dispatched to the engine session
    Search { depth: u32, search: SearchHandle },
    /// Skip the engine and play a random move after a pause
    Mistake { delay: Duration },
}

/// An engine turn that has been started but not yet run.
///
/// Holds no borrow of the orchestrator, so it can run on another task while
/// the owner keeps handling resets. A search turn's request is queued with
/// the engine when the turn is created, so a reset that follows always
/// cancels it, however late `run` is first polled.
#[derive(Debug)]
pub struct PendingTurn {
    epoch: Epoch,
    plan: TurnPlan,
}

impl PendingTurn {
    pub(crate) fn search(engine: &EngineClient, fen: &str, epoch: Epoch, depth: u32) -> Self {
        debug!(epoch = epoch.value(), depth, "Asking engine for a move");
        let search = engine.dispatch(fen, depth, epoch.value());
        Self {
            epoch,
            plan: TurnPlan::Search { depth, search },
        }
    }

    pub(crate) fn mistake(epoch: Epoch, delay: Duration) -> Self {
        Self {
            epoch,
            plan: TurnPlan::Mistake { delay },
        }
    }

    pub fn epoch(&self) -> Epoch {
        self.epoch
    }

    /// Search depth, or `None` for a deliberate mistake
    pub fn depth(&self) -> Option<u32> {
        match self.plan {
            TurnPlan::Search { depth, .. } => Some(depth),
            TurnPlan::Mistake { .. } => None,
        }
    }

    pub async fn run(self) -> TurnCompletion {
        let result = match self.plan {
            TurnPlan::Search { search, .. } => TurnResult::Engine(search.outcome().await),
            TurnPlan::Mistake { delay } => {
                debug!(epoch = self.epoch.value(), "Playing a deliberate mistake");
                tokio::time::sleep(delay).await;
                TurnResult::Mistake
            }
        };

        TurnCompletion {
            epoch: self.epoch,
            result,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnResult {
    Engine(Result<String, EngineError>),
    Mistake,
}

/// What a finished turn produced, stamped with the epoch it was started in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnCompletion {
    pub epoch: Epoch,
    pub result: TurnResult,
}

/// What applying a completion did to the game
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    /// The engine's move was played
    Applied(Move),
    /// A deliberate random move was played
    RandomApplied(Move),
    /// The engine failed or answered nonsense; a random legal move was played instead
    FallbackApplied { mv: Move, reason: String },
    /// The game changed since the turn began; nothing was played
    Discarded,
}

impl TurnOutcome {
    pub fn played(&self) -> Option<Move> {
        match self {
            TurnOutcome::Applied(mv)
            | TurnOutcome::RandomApplied(mv)
            | TurnOutcome::FallbackApplied { mv, .. } => Some(*mv),
            TurnOutcome::Discarded => None,
        }
    }
}
