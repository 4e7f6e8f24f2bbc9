pub mod chess;
pub mod cli;
pub mod engine;
pub mod orchestrator;

// Re-export key types for easy testing
pub use chess::{Game, Move};
pub use engine::{EngineClient, EngineError};
pub use orchestrator::{Difficulty, MoveOrchestrator};
