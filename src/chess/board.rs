use super::moves::Move;
use super::{ChessError, Color, Piece, PieceType, Position};
use std::str::FromStr;

pub const STARTING_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

/// Castling rights for both players
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CastlingRights {
    pub white_kingside: bool,
    pub white_queenside: bool,
    pub black_kingside: bool,
    pub black_queenside: bool,
}

impl CastlingRights {
    /// Create new castling rights with all castling available
    pub fn new() -> Self {
        Self {
            white_kingside: true,
            white_queenside: true,
            black_kingside: true,
            black_queenside: true,
        }
    }

    pub fn none() -> Self {
        Self {
            white_kingside: false,
            white_queenside: false,
            black_kingside: false,
            black_queenside: false,
        }
    }

    /// Create castling rights from FEN notation (e.g., "KQkq", "Kq", "-")
    pub fn from_fen(fen: &str) -> Result<Self, ChessError> {
        if fen == "-" {
            return Ok(Self::none());
        }

        let mut rights = Self::none();
        for c in fen.chars() {
            let slot = match c {
                'K' => &mut rights.white_kingside,
                'Q' => &mut rights.white_queenside,
                'k' => &mut rights.black_kingside,
                'q' => &mut rights.black_queenside,
                _ => {
                    return Err(ChessError::InvalidFen(format!(
                        "Invalid castling rights character '{c}' (valid: K, Q, k, q, or - for none)"
                    )))
                }
            };
            if *slot {
                return Err(ChessError::InvalidFen(format!(
                    "Duplicate character '{c}' in castling rights '{fen}'"
                )));
            }
            *slot = true;
        }

        Ok(rights)
    }

    /// Convert to FEN notation
    pub fn to_fen(&self) -> String {
        let mut result = String::new();

        if self.white_kingside {
            result.push('K');
        }
        if self.white_queenside {
            result.push('Q');
        }
        if self.black_kingside {
            result.push('k');
        }
        if self.black_queenside {
            result.push('q');
        }

        if result.is_empty() {
            "-".to_string()
        } else {
            result
        }
    }

    pub fn kingside(&self, color: Color) -> bool {
        match color {
            Color::White => self.white_kingside,
            Color::Black => self.black_kingside,
        }
    }

    pub fn queenside(&self, color: Color) -> bool {
        match color {
            Color::White => self.white_queenside,
            Color::Black => self.black_queenside,
        }
    }

    /// Remove castling rights for a color (when king moves)
    pub fn remove_all_for_color(&mut self, color: Color) {
        match color {
            Color::White => {
                self.white_kingside = false;
                self.white_queenside = false;
            }
            Color::Black => {
                self.black_kingside = false;
                self.black_queenside = false;
            }
        }
    }

    /// Remove castling rights for a specific rook (when rook moves or is captured)
    pub fn remove_rook_rights(&mut self, rook_position: Position) {
        match (rook_position.file, rook_position.rank) {
            (0, 0) => self.white_queenside = false,
            (7, 0) => self.white_kingside = false,
            (0, 7) => self.black_queenside = false,
            (7, 7) => self.black_kingside = false,
            _ => {}
        }
    }
}

impl Default for CastlingRights {
    fn default() -> Self {
        Self::new()
    }
}

/// Represents a chess board with piece positions and game state
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Board {
    /// squares[rank][file] where rank 0 = rank 1, file 0 = file a
    squares: [[Option<Piece>; 8]; 8],

    active_color: Color,

    /// Increments after Black's move
    fullmove_number: u16,

    /// Halfmove counter for the 50-move rule (resets on pawn moves and captures)
    halfmove_clock: u16,

    castling_rights: CastlingRights,

    en_passant_target: Option<Position>,
}

impl Board {
    /// Create a new board with the standard starting position
    pub fn new() -> Self {
        let mut board = Self {
            squares: [[None; 8]; 8],
            active_color: Color::White,
            fullmove_number: 1,
            halfmove_clock: 0,
            castling_rights: CastlingRights::new(),
            en_passant_target: None,
        };

        board.setup_starting_position();
        board
    }

    /// Get the piece at the specified position, if any
    pub fn get_piece(&self, pos: Position) -> Option<Piece> {
        if pos.file > 7 || pos.rank > 7 {
            return None;
        }

        self.squares[pos.rank as usize][pos.file as usize]
    }

    /// Set a piece at the specified position
    pub fn set_piece(&mut self, pos: Position, piece: Option<Piece>) -> Result<(), ChessError> {
        if pos.file > 7 || pos.rank > 7 {
            let file = pos.file;
            let rank = pos.rank;
            return Err(ChessError::InvalidPosition(format!(
                "Position {pos}({file},{rank}) is out of bounds"
            )));
        }

        self.squares[pos.rank as usize][pos.file as usize] = piece;
        Ok(())
    }

    pub fn active_color(&self) -> Color {
        self.active_color
    }

    pub fn fullmove_number(&self) -> u16 {
        self.fullmove_number
    }

    pub fn halfmove_clock(&self) -> u16 {
        self.halfmove_clock
    }

    pub fn castling_rights(&self) -> &CastlingRights {
        &self.castling_rights
    }

    pub fn en_passant_target(&self) -> Option<Position> {
        self.en_passant_target
    }

    /// Every occupied square with its piece
    pub fn pieces(&self) -> impl Iterator<Item = (Position, Piece)> + '_ {
        Position::all_positions().filter_map(move |pos| self.get_piece(pos).map(|p| (pos, p)))
    }

    /// Square of the given side's king, if it has one
    pub fn king_position(&self, color: Color) -> Option<Position> {
        self.pieces()
            .find(|(_, p)| p.piece_type == PieceType::King && p.color == color)
            .map(|(pos, _)| pos)
    }

    fn setup_starting_position(&mut self) {
        self.squares = [[None; 8]; 8];

        let back_rank = [
            PieceType::Rook,
            PieceType::Knight,
            PieceType::Bishop,
            PieceType::Queen,
            PieceType::King,
            PieceType::Bishop,
            PieceType::Knight,
            PieceType::Rook,
        ];

        for (file, &piece_type) in back_rank.iter().enumerate() {
            self.squares[0][file] = Some(Piece::new(piece_type, Color::White));
            self.squares[1][file] = Some(Piece::new(PieceType::Pawn, Color::White));
            self.squares[6][file] = Some(Piece::new(PieceType::Pawn, Color::Black));
            self.squares[7][file] = Some(Piece::new(piece_type, Color::Black));
        }
    }

    /// Create a board from a FEN (Forsyth-Edwards Notation) string
    /// FEN format: piece_placement active_color castling_rights en_passant halfmove fullmove
    pub fn from_fen(fen: &str) -> Result<Board, ChessError> {
        let fen = fen.trim();
        if fen.is_empty() {
            return Err(ChessError::InvalidFen(
                "FEN string cannot be empty".to_string(),
            ));
        }

        let parts: Vec<&str> = fen.split_whitespace().collect();
        let [piece_placement, active_color, castling_rights, en_passant, halfmove_str, fullmove_str] =
            parts.as_slice()
        else {
            let found_count = parts.len();
            return Err(ChessError::InvalidFen(format!(
                "FEN must have exactly 6 fields (piece_placement active_color castling_rights en_passant halfmove fullmove), found {found_count}"
            )));
        };

        let ranks: Vec<&str> = piece_placement.split('/').collect();
        if ranks.len() != 8 {
            let found_ranks = ranks.len();
            return Err(ChessError::InvalidFen(format!(
                "Piece placement must have exactly 8 ranks separated by '/', found {found_ranks}"
            )));
        }

        let mut squares = [[None; 8]; 8];

        for (rank_idx, rank_str) in ranks.iter().enumerate() {
            let board_rank = 7 - rank_idx;
            let fen_rank_number = 8 - rank_idx;
            let mut file = 0;

            for c in rank_str.chars() {
                if let Some(empty_squares) = c.to_digit(10) {
                    let empty_squares = empty_squares as usize;
                    if empty_squares == 0 || file + empty_squares > 8 {
                        return Err(ChessError::InvalidFen(format!(
                            "Empty square count '{c}' in rank {fen_rank_number} would exceed 8 squares"
                        )));
                    }
                    file += empty_squares;
                } else {
                    if file >= 8 {
                        return Err(ChessError::InvalidFen(format!(
                            "Rank {fen_rank_number} has more than 8 squares"
                        )));
                    }
                    squares[board_rank][file] = Some(Self::char_to_piece(c)?);
                    file += 1;
                }
            }

            if file != 8 {
                return Err(ChessError::InvalidFen(format!(
                    "Rank {fen_rank_number} must represent exactly 8 squares, found {file}"
                )));
            }
        }

        let active_color = match *active_color {
            "w" => Color::White,
            "b" => Color::Black,
            _ => {
                return Err(ChessError::InvalidFen(format!(
                    "Invalid active color '{active_color}' (must be 'w' for White or 'b' for Black)"
                )))
            }
        };

        let en_passant_target = if *en_passant == "-" {
            None
        } else {
            let target = Position::from_str(en_passant)
                .map_err(|e| ChessError::InvalidFen(e.to_string()))?;
            if target.rank != 2 && target.rank != 5 {
                return Err(ChessError::InvalidFen(format!(
                    "Invalid en passant target '{en_passant}' (en passant squares must be on rank 3 or 6)"
                )));
            }
            Some(target)
        };

        let halfmove_clock = halfmove_str.parse::<u16>().map_err(|e| {
            ChessError::InvalidFen(format!(
                "Invalid halfmove clock '{halfmove_str}' (must be a non-negative integer): {e}"
            ))
        })?;

        let fullmove_number = fullmove_str.parse::<u16>().map_err(|e| {
            ChessError::InvalidFen(format!(
                "Invalid fullmove number '{fullmove_str}' (must be a positive integer): {e}"
            ))
        })?;
        if fullmove_number == 0 {
            return Err(ChessError::InvalidFen(
                "Fullmove number must be at least 1".to_string(),
            ));
        }

        let board = Board {
            squares,
            active_color,
            halfmove_clock,
            fullmove_number,
            castling_rights: CastlingRights::from_fen(castling_rights)?,
            en_passant_target,
        };

        for color in [Color::White, Color::Black] {
            let kings = board
                .pieces()
                .filter(|(_, p)| p.piece_type == PieceType::King && p.color == color)
                .count();
            if kings != 1 {
                return Err(ChessError::InvalidFen(format!(
                    "{color} must have exactly one king, found {kings}"
                )));
            }
        }

        Ok(board)
    }

    /// Converts the current board state to FEN notation
    pub fn to_fen(&self) -> String {
        let active_color = match self.active_color {
            Color::White => "w",
            Color::Black => "b",
        };
        let en_passant = match self.en_passant_target {
            Some(pos) => pos.to_string(),
            None => "-".to_string(),
        };

        format!(
            "{} {} {} {} {} {}",
            self.piece_placement(),
            active_color,
            self.castling_rights.to_fen(),
            en_passant,
            self.halfmove_clock,
            self.fullmove_number
        )
    }

    /// The first four FEN fields; equal keys mean the same position for repetition purposes
    pub fn repetition_key(&self) -> String {
        self.to_fen()
            .split_whitespace()
            .take(4)
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn piece_placement(&self) -> String {
        let mut ranks = Vec::with_capacity(8);

        for rank_idx in (0..8).rev() {
            let mut rank_string = String::new();
            let mut empty_count = 0;

            for file_idx in 0..8 {
                match self.squares[rank_idx][file_idx] {
                    Some(piece) => {
                        if empty_count > 0 {
                            rank_string.push_str(&empty_count.to_string());
                            empty_count = 0;
                        }
                        rank_string.push(piece.fen_char());
                    }
                    None => empty_count += 1,
                }
            }

            if empty_count > 0 {
                rank_string.push_str(&empty_count.to_string());
            }

            ranks.push(rank_string);
        }

        ranks.join("/")
    }

    fn char_to_piece(c: char) -> Result<Piece, ChessError> {
        let color = if c.is_ascii_uppercase() {
            Color::White
        } else {
            Color::Black
        };
        let piece_type = match c.to_ascii_uppercase() {
            'K' => PieceType::King,
            'Q' => PieceType::Queen,
            'R' => PieceType::Rook,
            'B' => PieceType::Bishop,
            'N' => PieceType::Knight,
            'P' => PieceType::Pawn,
            _ => {
                return Err(ChessError::InvalidFen(format!(
                    "Invalid piece character '{c}' (valid pieces: KQRBNPkqrbnp)"
                )))
            }
        };
        Ok(Piece::new(piece_type, color))
    }

    /// Render the board from the given side's perspective, with coordinate labels.
    /// Uses Unicode glyphs when `unicode` is set, FEN letters otherwise.
    pub fn render(&self, perspective: Color, unicode: bool) -> String {
        let files: Vec<u8> = match perspective {
            Color::White => (0..8).collect(),
            Color::Black => (0..8).rev().collect(),
        };
        let ranks: Vec<u8> = match perspective {
            Color::White => (0..8).rev().collect(),
            Color::Black => (0..8).collect(),
        };

        let file_labels: String = files
            .iter()
            .map(|f| ((f + b'a') as char).to_string())
            .collect::<Vec<_>>()
            .join(" ");

        let mut result = format!("  {file_labels}\n");
        for &rank in &ranks {
            let rank_number = rank + 1;
            let row: Vec<String> = files
                .iter()
                .map(|&file| match self.squares[rank as usize][file as usize] {
                    Some(piece) if unicode => piece.symbol().to_string(),
                    Some(piece) => piece.fen_char().to_string(),
                    None => ".".to_string(),
                })
                .collect();
            result.push_str(&format!("{rank_number} {} {rank_number}\n", row.join(" ")));
        }
        result.push_str(&format!("  {file_labels}"));

        result
    }

    /// Apply a move to the board without checking legality beyond basic sanity.
    ///
    /// Handles captures, castling, en passant, promotion, castling-right and
    /// counter bookkeeping. Returns the captured piece, if any.
    pub fn make_move(&mut self, mv: Move) -> Result<Option<Piece>, ChessError> {
        let source_piece = self.get_piece(mv.from).ok_or_else(|| {
            let from_pos = mv.from;
            ChessError::InvalidMove(format!("No piece at source position {from_pos}"))
        })?;

        if source_piece.color != self.active_color {
            return Err(ChessError::InvalidMove(format!(
                "Cannot move {source_piece_color} piece when it's {active_color}'s turn",
                source_piece_color = source_piece.color,
                active_color = self.active_color
            )));
        }

        if let Some(dest_piece) = self.get_piece(mv.to) {
            if dest_piece.color == self.active_color {
                return Err(ChessError::InvalidMove(format!(
                    "Cannot capture own piece at {to}",
                    to = mv.to
                )));
            }
        }

        let is_pawn_move = source_piece.piece_type == PieceType::Pawn;
        let is_castling = source_piece.piece_type == PieceType::King
            && mv.from.rank == mv.to.rank
            && mv.from.file.abs_diff(mv.to.file) == 2;
        let is_en_passant = is_pawn_move
            && Some(mv.to) == self.en_passant_target
            && mv.from.file != mv.to.file
            && self.get_piece(mv.to).is_none();

        let promotion_rank = self.active_color.opposite().back_rank();
        match mv.promotion {
            Some(_) if !is_pawn_move || mv.to.rank != promotion_rank => {
                return Err(ChessError::InvalidMove(
                    "Only pawns reaching the last rank can be promoted".to_string(),
                ));
            }
            None if is_pawn_move && mv.to.rank == promotion_rank => {
                return Err(ChessError::InvalidMove(
                    "Pawn promotion required when reaching the last rank".to_string(),
                ));
            }
            _ => {}
        }

        self.update_castling_rights(&mv, &source_piece);
        self.en_passant_target = None;

        let captured = if is_castling {
            self.apply_castling_move(&mv, source_piece)?;
            None
        } else if is_en_passant {
            self.apply_en_passant_move(&mv, source_piece)?
        } else {
            self.apply_standard_move(&mv, source_piece)?
        };

        if is_pawn_move && mv.from.rank.abs_diff(mv.to.rank) == 2 {
            let target_rank = (mv.from.rank + mv.to.rank) / 2;
            self.en_passant_target = Some(Position::new_unchecked(mv.to.file, target_rank));
        }

        if is_pawn_move || captured.is_some() {
            self.halfmove_clock = 0;
        } else {
            self.halfmove_clock = self.halfmove_clock.saturating_add(1);
        }
        if self.active_color == Color::Black {
            self.fullmove_number = self.fullmove_number.saturating_add(1);
        }
        self.active_color = self.active_color.opposite();

        Ok(captured)
    }

    fn apply_standard_move(
        &mut self,
        mv: &Move,
        piece: Piece,
    ) -> Result<Option<Piece>, ChessError> {
        let captured = self.get_piece(mv.to);
        let final_piece = match mv.promotion {
            Some(promotion_type) => Piece::new(promotion_type, piece.color),
            None => piece,
        };

        self.set_piece(mv.from, None)?;
        self.set_piece(mv.to, Some(final_piece))?;

        Ok(captured)
    }

    fn apply_castling_move(&mut self, mv: &Move, king: Piece) -> Result<(), ChessError> {
        let (rook_from_file, rook_to_file) = match mv.to.file {
            6 => (7, 5),
            2 => (0, 3),
            _ => {
                return Err(ChessError::InvalidMove(
                    "Invalid castling destination".to_string(),
                ))
            }
        };

        let rook_from = Position::new_unchecked(rook_from_file, mv.from.rank);
        let rook_to = Position::new_unchecked(rook_to_file, mv.from.rank);

        let rook = self
            .get_piece(rook_from)
            .filter(|r| r.piece_type == PieceType::Rook && r.color == king.color)
            .ok_or_else(|| {
                ChessError::InvalidMove(format!("No rook found at {rook_from} for castling"))
            })?;

        self.set_piece(mv.from, None)?;
        self.set_piece(mv.to, Some(king))?;
        self.set_piece(rook_from, None)?;
        self.set_piece(rook_to, Some(rook))?;

        Ok(())
    }

    fn apply_en_passant_move(
        &mut self,
        mv: &Move,
        pawn: Piece,
    ) -> Result<Option<Piece>, ChessError> {
        // The captured pawn sits beside the source square, on the destination file
        let captured_pawn_pos = Position::new_unchecked(mv.to.file, mv.from.rank);
        let captured = self
            .get_piece(captured_pawn_pos)
            .filter(|p| p.piece_type == PieceType::Pawn && p.color != pawn.color)
            .ok_or_else(|| {
                ChessError::InvalidMove("No pawn to capture for en passant".to_string())
            })?;

        self.set_piece(mv.from, None)?;
        self.set_piece(mv.to, Some(pawn))?;
        self.set_piece(captured_pawn_pos, None)?;

        Ok(Some(captured))
    }

    fn update_castling_rights(&mut self, mv: &Move, piece: &Piece) {
        if piece.piece_type == PieceType::King {
            self.castling_rights.remove_all_for_color(piece.color);
        }

        if piece.piece_type == PieceType::Rook {
            self.castling_rights.remove_rook_rights(mv.from);
        }

        if let Some(captured_piece) = self.get_piece(mv.to) {
            if captured_piece.piece_type == PieceType::Rook {
                self.castling_rights.remove_rook_rights(mv.to);
            }
        }
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

impl FromStr for Board {
    type Err = ChessError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_fen(s)
    }
}
