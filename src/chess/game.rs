use super::board::Board;
use super::moves::Move;
use super::{ChessError, Color, Piece, PieceType, Position};
use serde::Serialize;
use std::fmt;

/// How a game ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum GameOutcome {
    Checkmate { winner: Color },
    Stalemate,
    FiftyMoveRule,
    ThreefoldRepetition,
    InsufficientMaterial,
    Resignation { winner: Color },
}

impl GameOutcome {
    pub fn winner(&self) -> Option<Color> {
        match self {
            GameOutcome::Checkmate { winner } | GameOutcome::Resignation { winner } => {
                Some(*winner)
            }
            _ => None,
        }
    }
}

impl fmt::Display for GameOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GameOutcome::Checkmate { winner } => write!(f, "Checkmate. {winner} wins."),
            GameOutcome::Stalemate => write!(f, "Draw by stalemate."),
            GameOutcome::FiftyMoveRule => write!(f, "Draw by the fifty-move rule."),
            GameOutcome::ThreefoldRepetition => write!(f, "Draw by repetition."),
            GameOutcome::InsufficientMaterial => write!(f, "Draw by insufficient material."),
            GameOutcome::Resignation { winner } => {
                write!(f, "{} resigned. {winner} wins.", winner.opposite())
            }
        }
    }
}

/// One applied half-move, with enough state to take it back
#[derive(Debug, Clone)]
pub struct Ply {
    pub mv: Move,
    pub mover: Color,
    pub captured: Option<Piece>,
    before: Board,
}

/// A chess game: the current board plus the history needed for undo,
/// repetition detection and captured-piece bookkeeping.
#[derive(Debug, Clone)]
pub struct Game {
    start: Board,
    board: Board,
    history: Vec<Ply>,
}

impl Game {
    /// A game from the standard starting position
    pub fn new() -> Self {
        Self::from_board(Board::new())
    }

    pub fn from_fen(fen: &str) -> Result<Self, ChessError> {
        Ok(Self::from_board(Board::from_fen(fen)?))
    }

    fn from_board(board: Board) -> Self {
        Self {
            start: board.clone(),
            board,
            history: Vec::new(),
        }
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn fen(&self) -> String {
        self.board.to_fen()
    }

    /// FEN of the position the game started from
    pub fn start_fen(&self) -> String {
        self.start.to_fen()
    }

    pub fn side_to_move(&self) -> Color {
        self.board.active_color()
    }

    pub fn legal_moves(&self) -> Vec<Move> {
        self.board.legal_moves()
    }

    pub fn history(&self) -> &[Ply] {
        &self.history
    }

    /// Moves played so far, as engine move tokens
    pub fn history_uci(&self) -> Vec<String> {
        self.history.iter().map(|ply| ply.mv.to_uci()).collect()
    }

    /// Play a legal move. Illegal moves leave the game untouched.
    pub fn play(&mut self, mv: Move) -> Result<&Ply, ChessError> {
        if !self.board.is_legal_move(mv) {
            return Err(ChessError::IllegalMove {
                mv: mv.to_uci(),
                fen: self.fen(),
            });
        }

        let before = self.board.clone();
        let mover = before.active_color();
        let captured = self.board.make_move(mv)?;
        self.history.push(Ply {
            mv,
            mover,
            captured,
            before,
        });

        Ok(&self.history[self.history.len() - 1])
    }

    /// Take back the last half-move
    pub fn undo(&mut self) -> Result<Move, ChessError> {
        let ply = self.history.pop().ok_or(ChessError::EmptyHistory)?;
        self.board = ply.before;
        Ok(ply.mv)
    }

    /// Return to the position the game started from
    pub fn restart(&mut self) {
        self.board = self.start.clone();
        self.history.clear();
    }

    /// Pieces `color` has taken from the opponent, in capture order
    pub fn captured_by(&self, color: Color) -> Vec<Piece> {
        self.history
            .iter()
            .filter(|ply| ply.mover == color)
            .filter_map(|ply| ply.captured)
            .collect()
    }

    pub fn in_check(&self) -> bool {
        self.board.is_in_check(self.board.active_color())
    }

    /// Terminal state of the current position, if any
    pub fn outcome(&self) -> Option<GameOutcome> {
        let mover = self.board.active_color();
        if self.legal_moves().is_empty() {
            return Some(if self.board.is_in_check(mover) {
                GameOutcome::Checkmate {
                    winner: mover.opposite(),
                }
            } else {
                GameOutcome::Stalemate
            });
        }

        if self.board.halfmove_clock() >= 100 {
            return Some(GameOutcome::FiftyMoveRule);
        }

        if self.repetitions() >= 3 {
            return Some(GameOutcome::ThreefoldRepetition);
        }

        if self.insufficient_material() {
            return Some(GameOutcome::InsufficientMaterial);
        }

        None
    }

    /// How many times the current position has occurred, this one included
    fn repetitions(&self) -> usize {
        let key = self.board.repetition_key();
        1 + self
            .history
            .iter()
            .filter(|ply| ply.before.repetition_key() == key)
            .count()
    }

    fn insufficient_material(&self) -> bool {
        let mut minors = Vec::new();
        for (pos, piece) in self.board.pieces() {
            match piece.piece_type {
                PieceType::King => {}
                PieceType::Knight | PieceType::Bishop => minors.push((pos, piece)),
                _ => return false,
            }
        }

        match minors.as_slice() {
            [] | [_] => true,
            // Bishops only, all on squares of one colour
            many => {
                let square_shade = |(pos, _): &(Position, Piece)| (pos.file + pos.rank) % 2;
                many.iter().all(|(_, p)| p.piece_type == PieceType::Bishop)
                    && many.iter().all(|m| square_shade(m) == square_shade(&many[0]))
            }
        }
    }
}

impl Default for Game {
    fn default() -> Self {
        Self::new()
    }
}
