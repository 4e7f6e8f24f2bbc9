use crate::chess::{ChessError, Color, Game, GameOutcome, Move};

/// The rules capability the orchestrator drives: legal move generation,
/// move application and terminal-state detection.
pub trait RulesEngine: Send {
    fn fen(&self) -> String;
    fn start_fen(&self) -> String;
    fn side_to_move(&self) -> Color;
    fn legal_moves(&self) -> Vec<Move>;
    /// Apply a legal move; an illegal one is rejected and changes nothing
    fn apply(&mut self, mv: Move) -> Result<(), ChessError>;
    fn undo(&mut self) -> Result<Move, ChessError>;
    fn restart(&mut self);
    fn outcome(&self) -> Option<GameOutcome>;
    fn history_uci(&self) -> Vec<String>;
    fn ply_count(&self) -> usize;
}

impl RulesEngine for Game {
    fn fen(&self) -> String {
        Game::fen(self)
    }

    fn start_fen(&self) -> String {
        Game::start_fen(self)
    }

    fn side_to_move(&self) -> Color {
        Game::side_to_move(self)
    }

    fn legal_moves(&self) -> Vec<Move> {
        Game::legal_moves(self)
    }

    fn apply(&mut self, mv: Move) -> Result<(), ChessError> {
        self.play(mv).map(|_| ())
    }

    fn undo(&mut self) -> Result<Move, ChessError> {
        Game::undo(self)
    }

    fn restart(&mut self) {
        Game::restart(self)
    }

    fn outcome(&self) -> Option<GameOutcome> {
        Game::outcome(self)
    }

    fn history_uci(&self) -> Vec<String> {
        Game::history_uci(self)
    }

    fn ply_count(&self) -> usize {
        self.history().len()
    }
}
