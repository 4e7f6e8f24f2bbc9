use crate::chess::{Color, Game};
use crate::cli::display;
use crate::cli::error_handler::{display_error, CliError};
use crate::cli::validation::{parse_input, InputCommand};
use crate::engine::{ClientConfig, EngineClient};
use crate::orchestrator::{Difficulty, MoveOrchestrator, TurnCompletion};
use anyhow::Result;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, warn};

/// Everything needed to start one interactive game
#[derive(Debug, Clone)]
pub struct GameSettings {
    pub engine_path: PathBuf,
    pub engine_args: Vec<String>,
    pub client: ClientConfig,
    pub difficulty: Difficulty,
    pub human: Color,
    pub mistake_delay: Duration,
}

enum Flow {
    Continue,
    Quit,
}

/// Play against the engine until the user quits or stdin closes.
///
/// Engine turns run on their own tasks so input stays live while the
/// engine thinks; resets typed meanwhile invalidate the running turn.
pub async fn run_game(settings: GameSettings) -> Result<()> {
    println!("Starting engine {}...", settings.engine_path.display());
    let engine =
        EngineClient::spawn_process(&settings.engine_path, &settings.engine_args, settings.client);
    let mut orchestrator = MoveOrchestrator::new(Game::new(), engine, settings.human.opposite())
        .with_difficulty(settings.difficulty)
        .with_mistake_delay(settings.mistake_delay);

    if let Err(e) = orchestrator.engine().wait_until_ready().await {
        display_error(&CliError::UserError {
            message: e.to_string(),
            suggestion: Some(
                "Set engine.path in the config file or pass --engine. Until then the engine side plays random moves."
                    .to_string(),
            ),
        });
    }

    let unicode = display::supports_unicode();
    let mut input = spawn_stdin_reader();
    let mut turns: JoinSet<TurnCompletion> = JoinSet::new();

    println!(
        "You play {} at {} difficulty. Type 'help' for commands.",
        orchestrator.human_color(),
        orchestrator.difficulty()
    );
    display::display_game(&orchestrator, unicode);

    loop {
        if let Some(turn) = orchestrator.begin_turn() {
            debug!(epoch = turn.epoch().value(), "Spawning engine turn");
            println!("Engine is thinking...");
            turns.spawn(turn.run());
        }
        prompt();

        tokio::select! {
            line = input.recv() => {
                let Some(line) = line else { break };
                match handle_input(&mut orchestrator, &line, unicode).await {
                    Ok(Flow::Continue) => {}
                    Ok(Flow::Quit) => break,
                    Err(e) => display_error(&e),
                }
            }
            Some(joined) = turns.join_next() => match joined {
                Ok(completion) => {
                    let outcome = orchestrator.finish_turn(completion);
                    if outcome.played().is_some() {
                        println!();
                        display::display_turn_outcome(&outcome);
                        display::display_game(&orchestrator, unicode);
                    }
                }
                Err(e) => warn!("Engine turn task failed: {}", e),
            },
            _ = tokio::signal::ctrl_c() => {
                println!();
                break;
            }
        }
    }

    turns.abort_all();
    orchestrator.engine().stop().await;
    println!("Goodbye!");
    Ok(())
}

async fn handle_input(
    orchestrator: &mut MoveOrchestrator<Game>,
    line: &str,
    unicode: bool,
) -> Result<Flow, CliError> {
    match parse_input(line)? {
        InputCommand::Nothing => {}
        InputCommand::Move(mv) => {
            orchestrator.play_human(mv)?;
            display::display_game(orchestrator, unicode);
        }
        InputCommand::New => {
            orchestrator.new_game(None).await;
            println!("New game.");
            display::display_game(orchestrator, unicode);
        }
        InputCommand::Undo => {
            let taken_back = orchestrator.undo().await?;
            if taken_back.is_empty() {
                println!("Nothing to undo.");
            } else {
                let moves: Vec<String> = taken_back.iter().map(|mv| mv.to_uci()).collect();
                println!("Took back {}", moves.join(", "));
                display::display_game(orchestrator, unicode);
            }
        }
        InputCommand::Resign => {
            let outcome = orchestrator.resign().await?;
            println!("🏳️  {}", outcome);
        }
        InputCommand::Difficulty(difficulty) => {
            orchestrator.set_difficulty(difficulty);
            println!("Difficulty set to {} from the engine's next move.", difficulty);
        }
        InputCommand::Board => display::display_game(orchestrator, unicode),
        InputCommand::Moves => display::display_move_history(orchestrator),
        InputCommand::Export => {
            let json = orchestrator
                .export_json()
                .map_err(|e| CliError::UserError {
                    message: format!("Could not export the game: {}", e),
                    suggestion: None,
                })?;
            println!("{}", json);
        }
        InputCommand::Fen => println!("{}", orchestrator.rules().fen()),
        InputCommand::Help => display::display_help(),
        InputCommand::Quit => return Ok(Flow::Quit),
    }
    Ok(Flow::Continue)
}

fn prompt() {
    print!("> ");
    // A failed flush only delays the prompt
    let _ = io::stdout().flush();
}

/// Forward stdin lines to the play loop.
///
/// Reads on a plain thread: a blocked read must not hold up runtime shutdown.
fn spawn_stdin_reader() -> mpsc::UnboundedReceiver<String> {
    let (tx, rx) = mpsc::unbounded_channel();
    std::thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if tx.send(line).is_err() {
                break;
            }
        }
    });
    rx
}
