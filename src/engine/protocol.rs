//! The slice of the UCI text protocol the client speaks.
//!
//! Outgoing: `uci`, `isready`, `position fen <FEN>`, `go depth <N>`, `stop`, `quit`.
//! Incoming: `readyok` and `bestmove <move> [...]`; everything else is ignored.

use std::fmt;

/// Move token an engine reports when the position has no legal move
pub const NO_MOVE: &str = "(none)";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Uci,
    IsReady,
    Position { fen: String },
    GoDepth(u32),
    Stop,
    Quit,
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Uci => write!(f, "uci"),
            Command::IsReady => write!(f, "isready"),
            Command::Position { fen } => write!(f, "position fen {}", fen),
            Command::GoDepth(depth) => write!(f, "go depth {}", depth),
            Command::Stop => write!(f, "stop"),
            Command::Quit => write!(f, "quit"),
        }
    }
}

/// An inbound line, classified
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineLine {
    ReadyOk,
    /// `None` when the engine reported the `(none)` sentinel or omitted the move
    BestMove(Option<String>),
    Other,
}

pub fn parse_line(line: &str) -> EngineLine {
    let mut tokens = line.split_whitespace();
    match tokens.next() {
        Some("readyok") => EngineLine::ReadyOk,
        Some("bestmove") => match tokens.next() {
            Some(NO_MOVE) | None => EngineLine::BestMove(None),
            Some(token) => EngineLine::BestMove(Some(token.to_string())),
        },
        _ => EngineLine::Other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_text() {
        assert_eq!(Command::Uci.to_string(), "uci");
        assert_eq!(Command::IsReady.to_string(), "isready");
        assert_eq!(
            Command::Position {
                fen: "8/8/8/8/8/8/8/K6k w - - 0 1".to_string()
            }
            .to_string(),
            "position fen 8/8/8/8/8/8/8/K6k w - - 0 1"
        );
        assert_eq!(Command::GoDepth(12).to_string(), "go depth 12");
        assert_eq!(Command::Stop.to_string(), "stop");
    }

    #[test]
    fn test_bestmove_takes_first_token_only() {
        assert_eq!(
            parse_line("bestmove e2e4 ponder e7e5"),
            EngineLine::BestMove(Some("e2e4".to_string()))
        );
        assert_eq!(
            parse_line("  bestmove   a7a8q  "),
            EngineLine::BestMove(Some("a7a8q".to_string()))
        );
    }

    #[test]
    fn test_sentinel_is_not_a_move() {
        assert_eq!(parse_line("bestmove (none)"), EngineLine::BestMove(None));
        assert_eq!(parse_line("bestmove"), EngineLine::BestMove(None));
    }

    #[test]
    fn test_other_lines() {
        assert_eq!(parse_line("readyok"), EngineLine::ReadyOk);
        assert_eq!(parse_line("uciok"), EngineLine::Other);
        assert_eq!(parse_line("info depth 5 score cp 20"), EngineLine::Other);
        assert_eq!(parse_line(""), EngineLine::Other);
        // A prefix match is not enough
        assert_eq!(parse_line("bestmoves e2e4"), EngineLine::Other);
    }
}
