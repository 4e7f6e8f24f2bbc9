use super::error::ChessError;
use super::piece::PieceType;
use super::position::Position;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

/// Shape of a UCI move token: from-square, to-square, optional lowercase promotion.
fn uci_token_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^([a-h][1-8])([a-h][1-8])([qrbn])?$").expect("static regex is valid")
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Move {
    pub from: Position,
    pub to: Position,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub promotion: Option<PieceType>,
}

impl Move {
    /// Create a new move with validation
    pub fn new(
        from: Position,
        to: Position,
        promotion: Option<PieceType>,
    ) -> Result<Self, ChessError> {
        if from == to {
            return Err(ChessError::InvalidMove(
                "Source and destination positions cannot be the same".to_string(),
            ));
        }

        if let Some(piece_type) = promotion {
            if matches!(piece_type, PieceType::King | PieceType::Pawn) {
                return Err(ChessError::InvalidMove(
                    "Cannot promote to King or Pawn".to_string(),
                ));
            }
        }

        Ok(Self {
            from,
            to,
            promotion,
        })
    }

    /// Create a new move without validation (for internal use when validity is guaranteed)
    pub const fn new_unchecked(from: Position, to: Position, promotion: Option<PieceType>) -> Self {
        Self {
            from,
            to,
            promotion,
        }
    }

    pub fn is_promotion(&self) -> bool {
        self.promotion.is_some()
    }

    /// Decode an engine move token such as `e2e4` or `e7e8q`.
    ///
    /// Promotion letters must be lowercase, as the engine protocol emits them.
    pub fn from_uci(token: &str) -> Result<Self, ChessError> {
        let caps = uci_token_pattern().captures(token).ok_or_else(|| {
            ChessError::InvalidMove(format!(
                "Invalid move token '{token}'. Expected 'e2e4' or 'e7e8q' for promotion."
            ))
        })?;

        let from = caps[1].parse::<Position>()?;
        let to = caps[2].parse::<Position>()?;
        let promotion = match caps.get(3) {
            Some(letter) => Some(letter.as_str().parse::<PieceType>()?),
            None => None,
        };

        Self::new(from, to, promotion)
    }

    /// Encode as an engine move token
    pub fn to_uci(&self) -> String {
        let mut token = format!("{}{}", self.from, self.to);
        if let Some(promotion) = self.promotion {
            token.push(promotion.uci_char());
        }
        token
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_uci())
    }
}

impl FromStr for Move {
    type Err = ChessError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_uci(&s.trim().to_lowercase())
    }
}
