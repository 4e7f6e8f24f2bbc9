use crate::chess::Move;
use crate::orchestrator::Difficulty;

/// Validation error for lines typed during a game
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Invalid move: {0}")]
    InvalidMove(String),

    #[error("Invalid difficulty: {0}")]
    InvalidDifficulty(String),

    #[error("Unknown command: {0}")]
    UnknownCommand(String),
}

/// Result type for validation operations
pub type ValidationResult<T> = Result<T, ValidationError>;

/// A line of play-loop input, parsed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputCommand {
    Move(Move),
    New,
    Undo,
    Resign,
    Difficulty(Difficulty),
    Board,
    Moves,
    Export,
    Fen,
    Help,
    Quit,
    /// Blank line
    Nothing,
}

/// Parse one line typed at the game prompt
pub fn parse_input(line: &str) -> ValidationResult<InputCommand> {
    let mut words = line.split_whitespace();
    let Some(first) = words.next() else {
        return Ok(InputCommand::Nothing);
    };
    let rest: Vec<&str> = words.collect();

    let command = match first.to_lowercase().as_str() {
        "new" => InputCommand::New,
        "undo" | "takeback" => InputCommand::Undo,
        "resign" => InputCommand::Resign,
        "difficulty" | "level" => {
            return parse_difficulty(rest.first().copied()).map(InputCommand::Difficulty)
        }
        "board" | "show" => InputCommand::Board,
        "moves" | "history" => InputCommand::Moves,
        "export" => InputCommand::Export,
        "fen" => InputCommand::Fen,
        "help" | "?" => InputCommand::Help,
        "quit" | "exit" | "q" => InputCommand::Quit,
        _ => return validate_move(line).map(InputCommand::Move),
    };

    if !rest.is_empty() {
        return Err(ValidationError::UnknownCommand(format!(
            "'{}' takes no arguments",
            first
        )));
    }
    Ok(command)
}

fn parse_difficulty(name: Option<&str>) -> ValidationResult<Difficulty> {
    let name = name.ok_or_else(|| {
        ValidationError::InvalidDifficulty("missing level name".to_string())
    })?;
    name.parse::<Difficulty>()
        .map_err(|e| ValidationError::InvalidDifficulty(e.to_string()))
}

/// Validate move notation with detailed error messages
///
/// Moves are written as origin and destination squares, with an optional
/// promotion letter: e2e4, g8f6, e7e8q. Castling is the king's move (e1g1).
pub fn validate_move(input: &str) -> ValidationResult<Move> {
    let trimmed = input.trim();

    if trimmed.is_empty() {
        return Err(ValidationError::InvalidMove(
            "Move cannot be empty. Try moves like 'e2e4' or 'g1f3'".to_string(),
        ));
    }

    trimmed
        .parse::<Move>()
        .map_err(|_| ValidationError::InvalidMove(move_error_with_suggestions(trimmed)))
}

/// Generate a user-friendly error message for invalid moves
pub fn move_error_with_suggestions(invalid_move: &str) -> String {
    let mut suggestions = Vec::new();

    // Common mistake patterns and suggestions
    if invalid_move.contains(' ') {
        suggestions.push("remove spaces (use 'e2e4' not 'e2 e4')");
    }

    if invalid_move.contains('-') {
        if invalid_move.to_uppercase().starts_with("O-O") || invalid_move.starts_with("0-0") {
            suggestions.push("castle by moving the king two squares (e1g1, e1c1)");
        } else {
            suggestions.push("remove dashes (use 'e2e4' not 'e2-e4')");
        }
    }

    if invalid_move.len() < 4 {
        suggestions.push("give both squares (use 'e2e4' not 'e4')");
    }

    if invalid_move.len() > 5 && !invalid_move.contains(' ') && !invalid_move.contains('-') {
        suggestions.push("moves are 4 or 5 characters (e2e4, e7e8q)");
    }

    let mut message = format!("'{invalid_move}'");
    if !suggestions.is_empty() {
        message.push_str(&format!("; {}", suggestions.join(", ")));
    }
    message
}
