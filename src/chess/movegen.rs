//! Legal move generation for [`Board`].
//!
//! Moves are generated pseudo-legally per piece and then filtered by playing
//! each one on a copy of the board and rejecting those that leave the mover's
//! king attacked. Simple rather than fast; the engine does the heavy lifting.

use super::board::Board;
use super::moves::Move;
use super::{Color, PieceType, Position};

const KNIGHT_STEPS: [(i8, i8); 8] = [
    (1, 2),
    (2, 1),
    (2, -1),
    (1, -2),
    (-1, -2),
    (-2, -1),
    (-2, 1),
    (-1, 2),
];

const KING_STEPS: [(i8, i8); 8] = [
    (1, 0),
    (1, 1),
    (0, 1),
    (-1, 1),
    (-1, 0),
    (-1, -1),
    (0, -1),
    (1, -1),
];

const ROOK_DIRECTIONS: [(i8, i8); 4] = [(1, 0), (-1, 0), (0, 1), (0, -1)];
const BISHOP_DIRECTIONS: [(i8, i8); 4] = [(1, 1), (1, -1), (-1, 1), (-1, -1)];

impl Board {
    /// Whether any piece of `by` attacks `target`
    pub fn is_square_attacked(&self, target: Position, by: Color) -> bool {
        // Pawns attack diagonally forward, so look one rank "behind" the target
        let pawn_rank_delta = -by.pawn_direction();
        for file_delta in [-1, 1] {
            if let Some(from) = target.offset(file_delta, pawn_rank_delta) {
                if self.holds(from, by, PieceType::Pawn) {
                    return true;
                }
            }
        }

        let leaper_hit = |steps: &[(i8, i8)], kind: PieceType| {
            steps.iter().any(|&(df, dr)| {
                target
                    .offset(df, dr)
                    .is_some_and(|from| self.holds(from, by, kind))
            })
        };
        if leaper_hit(&KNIGHT_STEPS, PieceType::Knight) || leaper_hit(&KING_STEPS, PieceType::King)
        {
            return true;
        }

        let slider_hit = |directions: &[(i8, i8)], kinds: [PieceType; 2]| {
            directions.iter().any(|&(df, dr)| {
                let mut current = target;
                while let Some(next) = current.offset(df, dr) {
                    if let Some(piece) = self.get_piece(next) {
                        return piece.color == by && kinds.contains(&piece.piece_type);
                    }
                    current = next;
                }
                false
            })
        };

        slider_hit(&ROOK_DIRECTIONS, [PieceType::Rook, PieceType::Queen])
            || slider_hit(&BISHOP_DIRECTIONS, [PieceType::Bishop, PieceType::Queen])
    }

    /// Whether `color`'s king is currently attacked
    pub fn is_in_check(&self, color: Color) -> bool {
        self.king_position(color)
            .is_some_and(|king| self.is_square_attacked(king, color.opposite()))
    }

    /// All legal moves for the side to move
    pub fn legal_moves(&self) -> Vec<Move> {
        let mover = self.active_color();
        self.pseudo_legal_moves()
            .into_iter()
            .filter(|mv| {
                let mut next = self.clone();
                next.make_move(*mv).is_ok() && !next.is_in_check(mover)
            })
            .collect()
    }

    /// Whether `mv` is among the legal moves of this position
    pub fn is_legal_move(&self, mv: Move) -> bool {
        self.legal_moves().contains(&mv)
    }

    fn holds(&self, pos: Position, color: Color, kind: PieceType) -> bool {
        self.get_piece(pos)
            .is_some_and(|p| p.color == color && p.piece_type == kind)
    }

    fn pseudo_legal_moves(&self) -> Vec<Move> {
        let mover = self.active_color();
        let mut moves = Vec::with_capacity(48);

        for (from, piece) in self.pieces().filter(|(_, p)| p.color == mover) {
            match piece.piece_type {
                PieceType::Pawn => self.pawn_moves(from, mover, &mut moves),
                PieceType::Knight => self.step_moves(from, &KNIGHT_STEPS, &mut moves),
                PieceType::King => {
                    self.step_moves(from, &KING_STEPS, &mut moves);
                    self.castling_moves(from, mover, &mut moves);
                }
                PieceType::Bishop => self.slide_moves(from, &BISHOP_DIRECTIONS, &mut moves),
                PieceType::Rook => self.slide_moves(from, &ROOK_DIRECTIONS, &mut moves),
                PieceType::Queen => {
                    self.slide_moves(from, &ROOK_DIRECTIONS, &mut moves);
                    self.slide_moves(from, &BISHOP_DIRECTIONS, &mut moves);
                }
            }
        }

        moves
    }

    fn is_target(&self, to: Position) -> bool {
        self.get_piece(to)
            .map_or(true, |p| p.color != self.active_color())
    }

    fn step_moves(&self, from: Position, steps: &[(i8, i8)], moves: &mut Vec<Move>) {
        for &(df, dr) in steps {
            if let Some(to) = from.offset(df, dr) {
                if self.is_target(to) {
                    moves.push(Move::new_unchecked(from, to, None));
                }
            }
        }
    }

    fn slide_moves(&self, from: Position, directions: &[(i8, i8)], moves: &mut Vec<Move>) {
        for &(df, dr) in directions {
            let mut current = from;
            while let Some(to) = current.offset(df, dr) {
                match self.get_piece(to) {
                    None => moves.push(Move::new_unchecked(from, to, None)),
                    Some(piece) => {
                        if piece.color != self.active_color() {
                            moves.push(Move::new_unchecked(from, to, None));
                        }
                        break;
                    }
                }
                current = to;
            }
        }
    }

    fn pawn_moves(&self, from: Position, mover: Color, moves: &mut Vec<Move>) {
        let direction = mover.pawn_direction();
        let start_rank = match mover {
            Color::White => 1,
            Color::Black => 6,
        };
        let promotion_rank = mover.opposite().back_rank();

        let push = |to: Position, moves: &mut Vec<Move>| {
            if to.rank == promotion_rank {
                for promotion in PieceType::PROMOTIONS {
                    moves.push(Move::new_unchecked(from, to, Some(promotion)));
                }
            } else {
                moves.push(Move::new_unchecked(from, to, None));
            }
        };

        if let Some(one) = from.offset(0, direction) {
            if self.get_piece(one).is_none() {
                push(one, moves);
                if from.rank == start_rank {
                    if let Some(two) = from.offset(0, 2 * direction) {
                        if self.get_piece(two).is_none() {
                            push(two, moves);
                        }
                    }
                }
            }
        }

        for file_delta in [-1, 1] {
            if let Some(to) = from.offset(file_delta, direction) {
                let captures = self.get_piece(to).is_some_and(|p| p.color != mover);
                if captures || Some(to) == self.en_passant_target() {
                    push(to, moves);
                }
            }
        }
    }

    fn castling_moves(&self, from: Position, mover: Color, moves: &mut Vec<Move>) {
        let rank = mover.back_rank();
        if from != Position::new_unchecked(4, rank) || self.is_in_check(mover) {
            return;
        }
        let enemy = mover.opposite();
        let rights = self.castling_rights();
        let empty = |files: &[u8]| {
            files
                .iter()
                .all(|&f| self.get_piece(Position::new_unchecked(f, rank)).is_none())
        };
        let safe = |files: &[u8]| {
            files
                .iter()
                .all(|&f| !self.is_square_attacked(Position::new_unchecked(f, rank), enemy))
        };
        let rook_home =
            |file: u8| self.holds(Position::new_unchecked(file, rank), mover, PieceType::Rook);

        if rights.kingside(mover) && rook_home(7) && empty(&[5, 6]) && safe(&[5, 6]) {
            moves.push(Move::new_unchecked(from, Position::new_unchecked(6, rank), None));
        }
        if rights.queenside(mover) && rook_home(0) && empty(&[1, 2, 3]) && safe(&[2, 3]) {
            moves.push(Move::new_unchecked(from, Position::new_unchecked(2, rank), None));
        }
    }
}
