pub use self::board::{Board, CastlingRights, STARTING_FEN};
pub use self::error::ChessError;
pub use self::game::{Game, GameOutcome, Ply};
pub use self::moves::Move;
pub use self::piece::{Color, Piece, PieceType};
pub use self::position::Position;

mod board;
mod error;
mod game;
mod movegen;
mod moves;
mod piece;
mod position;
