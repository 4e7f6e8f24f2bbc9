use crate::chess::ChessError;
use crate::cli::validation::ValidationError;
use crate::orchestrator::PlayError;
use std::fmt;

/// Unified error type for play-loop input with user-friendly messages
#[derive(Debug)]
pub enum CliError {
    /// The game refused the action
    Play(PlayError),
    /// Input validation error
    InvalidInput {
        field: String,
        value: String,
        suggestion: String,
    },
    /// User-friendly error with custom message
    UserError {
        message: String,
        suggestion: Option<String>,
    },
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Play(e) => write!(f, "{}", format_play_error(e)),
            CliError::InvalidInput {
                field,
                value,
                suggestion,
            } => {
                write!(
                    f,
                    "❌ Invalid {}: {}\n   💡 Suggestion: {}",
                    field, value, suggestion
                )
            }
            CliError::UserError {
                message,
                suggestion,
            } => {
                if let Some(suggestion) = suggestion {
                    write!(f, "❌ {}\n   💡 Suggestion: {}", message, suggestion)
                } else {
                    write!(f, "❌ {}", message)
                }
            }
        }
    }
}

impl std::error::Error for CliError {}

impl From<PlayError> for CliError {
    fn from(err: PlayError) -> Self {
        CliError::Play(err)
    }
}

impl From<ValidationError> for CliError {
    fn from(err: ValidationError) -> Self {
        match err {
            ValidationError::InvalidMove(detail) => CliError::InvalidInput {
                field: "move".to_string(),
                value: detail,
                suggestion: "Moves are written square to square, like e2e4 or e7e8q".to_string(),
            },
            ValidationError::InvalidDifficulty(detail) => CliError::InvalidInput {
                field: "difficulty".to_string(),
                value: detail,
                suggestion: "Use one of: easy, normal, hard, hell".to_string(),
            },
            ValidationError::UnknownCommand(detail) => CliError::UserError {
                message: detail,
                suggestion: Some("Type 'help' to list the commands".to_string()),
            },
        }
    }
}

/// Format refused game actions with user-friendly messages
fn format_play_error(error: &PlayError) -> String {
    match error {
        PlayError::NotYourTurn => {
            "⏳ It is not your turn\n   💡 Suggestion: Wait for the engine to move".to_string()
        }
        PlayError::EngineThinking => {
            "🤔 The engine is still thinking\n   💡 Suggestion: Wait for its move, or type 'undo' or 'new' to interrupt".to_string()
        }
        PlayError::GameOver(outcome) => {
            format!(
                "🏁 The game is over: {}\n   💡 Suggestion: Type 'new' to start another game",
                outcome
            )
        }
        PlayError::Illegal(ChessError::IllegalMove { mv, .. }) => {
            format!(
                "❌ Illegal move: {}\n   💡 Suggestion: Type 'board' to see the position",
                mv
            )
        }
        PlayError::Illegal(e) => format!("❌ {}", e),
    }
}

/// Print an error for the user; the game carries on
pub fn display_error(error: &CliError) {
    eprintln!("{}", error);
}
