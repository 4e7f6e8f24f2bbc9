use crate::chess::{Color, Game, Piece};
use crate::orchestrator::{Difficulty, MoveOrchestrator, TurnOutcome};

/// Display the board from the human's side, with captured pieces and status
pub fn display_game(orchestrator: &MoveOrchestrator<Game>, unicode: bool) {
    let game = orchestrator.rules();
    let human = orchestrator.human_color();
    let engine = orchestrator.engine_color();

    println!();
    println!(
        "Engine ({}): {}",
        engine,
        format_captured(&game.captured_by(engine), unicode)
    );
    println!("{}", game.board().render(human, unicode));
    println!(
        "You ({}):    {}",
        human,
        format_captured(&game.captured_by(human), unicode)
    );
    display_game_status(orchestrator);
}

/// One line describing whose move it is, or how the game ended
pub fn display_game_status(orchestrator: &MoveOrchestrator<Game>) {
    let game = orchestrator.rules();
    if let Some(outcome) = orchestrator.outcome() {
        println!("🏁 {}", outcome);
        println!("Type 'new' to play again or 'quit' to leave.");
        return;
    }

    let to_move = game.side_to_move();
    let check = if game.in_check() { " (check)" } else { "" };
    if to_move == orchestrator.human_color() {
        println!(
            "Move {}: your move as {}{}",
            game.board().fullmove_number(),
            to_move,
            check
        );
    } else {
        println!(
            "Move {}: {} to move{} [{}]",
            game.board().fullmove_number(),
            to_move,
            check,
            orchestrator.difficulty()
        );
    }
}

/// Pieces taken, worth-ordered, with the material total
pub fn format_captured(pieces: &[Piece], unicode: bool) -> String {
    if pieces.is_empty() {
        return "-".to_string();
    }

    let mut sorted = pieces.to_vec();
    sorted.sort_by_key(|p| std::cmp::Reverse(p.piece_type.value()));
    let glyphs: String = sorted
        .iter()
        .map(|p| if unicode { p.symbol() } else { p.fen_char() })
        .collect();
    let material: u32 = pieces.iter().map(|p| p.piece_type.value()).sum();
    format!("{} (+{})", glyphs, material)
}

/// Move list, one row per full move: `1. e2e4 e7e5`
pub fn format_move_history(moves: &[String], first_mover: Color) -> Vec<String> {
    let mut rows = Vec::new();
    let mut moves = moves.iter().map(String::as_str);

    // A game that started with Black to move leaves White's first slot empty
    let mut number = 1;
    if first_mover == Color::Black {
        if let Some(black) = moves.next() {
            rows.push(format!("{}. ... {}", number, black));
            number += 1;
        }
    }

    let remaining: Vec<&str> = moves.collect();
    for pair in remaining.chunks(2) {
        match pair {
            [white, black] => rows.push(format!("{}. {} {}", number, white, black)),
            [white] => rows.push(format!("{}. {}", number, white)),
            _ => {}
        }
        number += 1;
    }
    rows
}

pub fn display_move_history(orchestrator: &MoveOrchestrator<Game>) {
    let moves = orchestrator.rules().history_uci();
    if moves.is_empty() {
        println!("No moves yet.");
        return;
    }

    let first_mover = orchestrator
        .rules()
        .history()
        .first()
        .map_or(Color::White, |ply| ply.mover);
    for row in format_move_history(&moves, first_mover) {
        println!("  {}", row);
    }
}

/// Report what an engine turn did
pub fn display_turn_outcome(outcome: &TurnOutcome) {
    match outcome {
        TurnOutcome::Applied(mv) => println!("Engine plays {}", mv),
        TurnOutcome::RandomApplied(mv) => println!("Engine plays {} (a blunder?)", mv),
        TurnOutcome::FallbackApplied { mv, reason } => {
            println!("⚠️  Engine problem: {}", reason);
            println!("Engine plays {} (random)", mv);
        }
        TurnOutcome::Discarded => {}
    }
}

pub fn display_difficulties(current: Difficulty) {
    println!("{:<8} {:<8} {:<8}", "LEVEL", "DEPTH", "MISTAKES");
    for difficulty in Difficulty::ALL {
        let profile = difficulty.profile();
        let marker = if difficulty == current { " *" } else { "" };
        println!(
            "{:<8} {:<8} {:<8}{}",
            difficulty.name(),
            format!("{}-{}", profile.min_depth, profile.max_depth),
            format!("{:.0}%", profile.mistake_probability * 100.0),
            marker
        );
    }
}

pub fn display_help() {
    println!("Commands:");
    println!("  <move>             play a move, e.g. e2e4 or e7e8q");
    println!("  new                start a new game");
    println!("  undo               take back your last move");
    println!("  resign             give up the current game");
    println!("  difficulty <name>  easy, normal, hard or hell (from the next engine move)");
    println!("  board              show the board again");
    println!("  moves              list the moves played");
    println!("  export             print the game as JSON");
    println!("  fen                print the current position as FEN");
    println!("  help               show this list");
    println!("  quit               leave the game");
}

/// Check if terminal supports Unicode chess pieces
pub fn supports_unicode() -> bool {
    // Simple heuristic: check if TERM contains "xterm" or if we're in a modern terminal
    std::env::var("TERM")
        .map(|term| {
            term.contains("xterm")
                || term.contains("screen")
                || term.contains("tmux")
                || term == "alacritty"
                || term == "kitty"
        })
        .unwrap_or(false)
        || std::env::var("TERM_PROGRAM").is_ok() // macOS Terminal, iTerm2, etc.
}
