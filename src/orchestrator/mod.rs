//! Turn sequencing between the human, the rules and the engine.

pub use self::controller::{
    GameRecord, MoveOrchestrator, PlayError, DEFAULT_MISTAKE_DELAY,
};
pub use self::difficulty::{Difficulty, DifficultyProfile, UnknownDifficulty};
pub use self::rules::RulesEngine;
pub use self::turn::{Epoch, PendingTurn, TurnCompletion, TurnOutcome, TurnResult, TurnState};

mod controller;
mod difficulty;
mod rules;
mod turn;
