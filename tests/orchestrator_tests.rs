//! Move orchestration: turn sequencing, the epoch guard and fallbacks

mod common;

use common::{auto_transport, ready_client, settle};
use knightfall::chess::{Color, Game, GameOutcome, Move, STARTING_FEN};
use knightfall::engine::{ClientConfig, EngineClient, EngineError};
use knightfall::orchestrator::{
    Difficulty, MoveOrchestrator, PlayError, TurnOutcome, TurnResult, TurnState,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::Duration;

fn mv(token: &str) -> Move {
    Move::from_uci(token).unwrap()
}

fn orchestrator(engine: EngineClient, engine_color: Color) -> MoveOrchestrator<Game> {
    MoveOrchestrator::new(Game::new(), engine, engine_color)
        .with_rng(StdRng::seed_from_u64(2024))
        .with_difficulty(Difficulty::Normal)
}

fn dead_engine() -> EngineClient {
    EngineClient::start(
        Err(EngineError::Unavailable("no engine configured".to_string())),
        ClientConfig::default(),
    )
}

#[tokio::test]
async fn test_engine_move_is_applied() {
    let (client, engine) = ready_client(ClientConfig::default()).await;
    let mut orchestrator = orchestrator(client, Color::White);

    let turn = orchestrator.begin_turn().expect("engine moves first as white");
    let depth = turn.depth().unwrap();
    assert!((5..=8).contains(&depth));
    let running = tokio::spawn(turn.run());
    settle().await;

    assert_eq!(
        engine.sent(),
        vec![
            format!("position fen {STARTING_FEN}"),
            format!("go depth {depth}"),
        ]
    );
    assert!(orchestrator.is_thinking());

    engine.reply("bestmove e2e4");
    let completion = running.await.unwrap();
    assert_eq!(completion.result, TurnResult::Engine(Ok("e2e4".to_string())));

    assert_eq!(
        orchestrator.finish_turn(completion),
        TurnOutcome::Applied(mv("e2e4"))
    );
    assert_eq!(orchestrator.rules().history_uci(), vec!["e2e4"]);
    assert_eq!(orchestrator.turn_state(), TurnState::Idle);

    // Now the human is on move
    assert!(orchestrator.begin_turn().is_none());
}

#[tokio::test]
async fn test_one_turn_per_epoch() {
    let (client, _engine) = ready_client(ClientConfig::default()).await;
    let mut orchestrator = orchestrator(client, Color::White);

    let first = orchestrator.begin_turn();
    assert!(first.is_some());
    assert!(orchestrator.begin_turn().is_none());
    assert_eq!(
        orchestrator.play_human(mv("e7e5")),
        Err(PlayError::EngineThinking)
    );
}

#[tokio::test]
async fn test_undo_while_engine_thinks_discards_its_move() {
    let (client, engine) = ready_client(ClientConfig::default()).await;
    let mut orchestrator = orchestrator(client, Color::Black);

    orchestrator.play_human(mv("e2e4")).unwrap();
    let epoch_before = orchestrator.epoch();
    let turn = orchestrator.begin_turn().unwrap();
    assert_eq!(turn.epoch(), epoch_before);
    let running = tokio::spawn(turn.run());
    settle().await;
    engine.clear();

    let taken_back = orchestrator.undo().await.unwrap();
    assert_eq!(taken_back, vec![mv("e2e4")]);
    assert!(orchestrator.epoch() > epoch_before);
    assert_eq!(engine.sent(), vec!["stop"]);

    let completion = running.await.unwrap();
    assert_eq!(completion.result, TurnResult::Engine(Err(EngineError::Cancelled)));
    assert_eq!(
        orchestrator.finish_turn(completion),
        TurnOutcome::Discarded
    );

    // The stopped search reports late; nothing reaches the board
    engine.reply("bestmove e7e5");
    settle().await;
    assert!(orchestrator.rules().history().is_empty());
    assert_eq!(orchestrator.rules().fen(), STARTING_FEN);
}

#[tokio::test]
async fn test_result_that_beats_the_reset_is_still_discarded() {
    let (client, engine) = ready_client(ClientConfig::default()).await;
    let mut orchestrator = orchestrator(client, Color::Black);

    orchestrator.play_human(mv("d2d4")).unwrap();
    let running = tokio::spawn(orchestrator.begin_turn().unwrap().run());
    settle().await;

    // The engine answers, but the human resets before the answer is applied
    engine.reply("bestmove d7d5");
    let completion = running.await.unwrap();
    orchestrator.new_game(None).await;

    assert_eq!(
        orchestrator.finish_turn(completion),
        TurnOutcome::Discarded
    );
    assert_eq!(orchestrator.rules().fen(), STARTING_FEN);
}

#[tokio::test]
async fn test_turn_started_before_a_reset_cannot_displace_the_current_one() {
    let (client, engine) = ready_client(ClientConfig::default()).await;
    let mut orchestrator = orchestrator(client, Color::Black);

    orchestrator.play_human(mv("e2e4")).unwrap();
    let stale_fen = orchestrator.rules().fen();
    let stale = orchestrator.begin_turn().unwrap();
    let stale_depth = stale.depth().unwrap();

    orchestrator.undo().await.unwrap();
    orchestrator.play_human(mv("d2d4")).unwrap();
    let current_fen = orchestrator.rules().fen();
    let current = orchestrator.begin_turn().unwrap();
    let current_depth = current.depth().unwrap();

    // The older turn is polled only after the current one
    let current_run = tokio::spawn(current.run());
    settle().await;
    let stale_run = tokio::spawn(stale.run());
    settle().await;

    assert_eq!(
        engine.sent(),
        vec![
            format!("position fen {stale_fen}"),
            format!("go depth {stale_depth}"),
            "stop".to_string(),
            format!("position fen {current_fen}"),
            format!("go depth {current_depth}"),
        ]
    );

    // The stopped search reports first, as a UCI engine does
    engine.reply("bestmove e7e5");
    let answer = engine.answer_last_search().unwrap();

    let completion = current_run.await.unwrap();
    assert_eq!(completion.result, TurnResult::Engine(Ok(answer.clone())));
    assert_eq!(
        orchestrator.finish_turn(completion),
        TurnOutcome::Applied(mv(&answer))
    );

    let completion = stale_run.await.unwrap();
    assert_eq!(completion.result, TurnResult::Engine(Err(EngineError::Cancelled)));
    assert_eq!(orchestrator.finish_turn(completion), TurnOutcome::Discarded);
    assert_eq!(orchestrator.rules().history_uci(), vec!["d2d4".to_string(), answer]);
}

#[tokio::test]
async fn test_unavailable_engine_falls_back_to_legal_moves() {
    let mut orchestrator = orchestrator(dead_engine(), Color::White);

    let mut plies = 0;
    while orchestrator.outcome().is_none() && plies < 60 {
        if orchestrator.rules().side_to_move() == Color::White {
            let legal = orchestrator.rules().legal_moves();
            match orchestrator.play_engine_turn().await {
                Some(TurnOutcome::FallbackApplied { mv, reason }) => {
                    assert!(legal.contains(&mv), "{mv} was not legal");
                    assert!(reason.contains("no engine configured"));
                }
                other => panic!("expected a fallback move, got {other:?}"),
            }
        } else {
            let reply = orchestrator.rules().legal_moves()[0];
            orchestrator.play_human(reply).unwrap();
        }
        plies += 1;
    }
    assert!(plies > 0);
}

#[tokio::test(start_paused = true)]
async fn test_timeout_falls_back_to_a_legal_move() {
    let config = ClientConfig {
        request_timeout: Duration::from_millis(500),
        ..ClientConfig::default()
    };
    let (client, engine) = ready_client(config).await;
    let mut orchestrator = orchestrator(client, Color::White);
    let legal = orchestrator.rules().legal_moves();

    match orchestrator.play_engine_turn().await {
        Some(TurnOutcome::FallbackApplied { mv, reason }) => {
            assert!(legal.contains(&mv));
            assert!(reason.contains("did not answer"));
        }
        other => panic!("expected a fallback move, got {other:?}"),
    }
    assert_eq!(engine.sent().last().map(String::as_str), Some("stop"));
    assert_eq!(orchestrator.rules().history().len(), 1);
}

#[tokio::test]
async fn test_transport_error_falls_back_to_a_legal_move() {
    let (client, engine) = ready_client(ClientConfig::default()).await;
    let mut orchestrator = orchestrator(client, Color::White);
    let legal = orchestrator.rules().legal_moves();

    let running = tokio::spawn(orchestrator.begin_turn().unwrap().run());
    settle().await;
    engine.fail("engine closed its output");

    let outcome = orchestrator.finish_turn(running.await.unwrap());
    match outcome {
        TurnOutcome::FallbackApplied { mv, .. } => assert!(legal.contains(&mv)),
        other => panic!("expected a fallback move, got {other:?}"),
    }
}

#[tokio::test]
async fn test_illegal_engine_move_falls_back() {
    let (client, engine) = ready_client(ClientConfig::default()).await;
    let mut orchestrator = orchestrator(client, Color::White);
    let legal = orchestrator.rules().legal_moves();

    for bogus in ["e2e5", "a1a8", "z9z9"] {
        orchestrator.new_game(None).await;
        let running = tokio::spawn(orchestrator.begin_turn().unwrap().run());
        settle().await;
        engine.reply(&format!("bestmove {bogus}"));

        match orchestrator.finish_turn(running.await.unwrap()) {
            TurnOutcome::FallbackApplied { mv, reason } => {
                assert!(legal.contains(&mv));
                assert!(reason.contains(bogus), "{reason}");
            }
            other => panic!("expected a fallback for {bogus}, got {other:?}"),
        }
    }
}

#[tokio::test(start_paused = true)]
async fn test_easy_level_makes_paced_mistakes() {
    let (handle, engine) = auto_transport();
    let client = EngineClient::start(Ok(handle), ClientConfig::default());
    client.wait_until_ready().await.unwrap();

    let mut orchestrator = MoveOrchestrator::new(Game::new(), client, Color::White)
        .with_rng(StdRng::seed_from_u64(99))
        .with_difficulty(Difficulty::Easy)
        .with_mistake_delay(Duration::from_millis(320));

    let mut mistakes = 0;
    let mut searches = 0;
    for _ in 0..40 {
        if orchestrator.outcome().is_some() {
            orchestrator.new_game(None).await;
        }

        let turn = orchestrator.begin_turn().unwrap();
        if let Some(depth) = turn.depth() {
            assert!((1..=2).contains(&depth));
        }
        let started = tokio::time::Instant::now();
        let completion = turn.run().await;
        let outcome = orchestrator.finish_turn(completion);

        match outcome {
            TurnOutcome::RandomApplied(_) => {
                assert!(started.elapsed() >= Duration::from_millis(320));
                mistakes += 1;
            }
            TurnOutcome::Applied(_) => searches += 1,
            other => panic!("unexpected outcome {other:?}"),
        }

        if orchestrator.outcome().is_none() {
            let reply = orchestrator.rules().legal_moves()[0];
            orchestrator.play_human(reply).unwrap();
        }
    }

    assert!(mistakes > 0, "easy level never blundered");
    assert!(searches > 0, "easy level never searched");
    // Mistakes never consult the engine
    let gos = engine.sent().iter().filter(|c| c.starts_with("go ")).count();
    assert_eq!(gos, searches);
}

#[tokio::test]
async fn test_hard_levels_search_deeper() {
    let (handle, engine) = auto_transport();
    let client = EngineClient::start(Ok(handle), ClientConfig::default());
    let mut orchestrator = orchestrator(client, Color::White);

    orchestrator.set_difficulty(Difficulty::Hell);
    assert!(matches!(
        orchestrator.play_engine_turn().await,
        Some(TurnOutcome::Applied(_))
    ));
    let depth: u32 = engine
        .sent()
        .iter()
        .find_map(|c| c.strip_prefix("go depth "))
        .unwrap()
        .parse()
        .unwrap();
    assert!((20..=22).contains(&depth));
}

#[tokio::test]
async fn test_undo_returns_the_move_to_the_human() {
    let (handle, _engine) = auto_transport();
    let client = EngineClient::start(Ok(handle), ClientConfig::default());
    let mut orchestrator = orchestrator(client, Color::Black);

    // Nothing to take back yet: no reset happens
    let epoch = orchestrator.epoch();
    assert_eq!(orchestrator.undo().await, Ok(vec![]));
    assert_eq!(orchestrator.epoch(), epoch);

    orchestrator.play_human(mv("g1f3")).unwrap();
    let reply = orchestrator.play_engine_turn().await.unwrap().played().unwrap();

    let taken_back = orchestrator.undo().await.unwrap();
    assert_eq!(taken_back, vec![reply, mv("g1f3")]);
    assert_eq!(orchestrator.rules().fen(), STARTING_FEN);
    assert_eq!(orchestrator.rules().side_to_move(), orchestrator.human_color());
}

#[tokio::test]
async fn test_engine_opens_when_human_plays_black() {
    let (handle, _engine) = auto_transport();
    let client = EngineClient::start(Ok(handle), ClientConfig::default());
    let mut orchestrator = orchestrator(client, Color::Black);

    assert!(orchestrator.begin_turn().is_none());
    assert_eq!(orchestrator.human_color(), Color::White);

    orchestrator.new_game(Some(Color::White)).await;
    assert_eq!(orchestrator.human_color(), Color::Black);
    assert_eq!(
        orchestrator.play_human(mv("e7e5")),
        Err(PlayError::NotYourTurn)
    );
    assert!(matches!(
        orchestrator.play_engine_turn().await,
        Some(TurnOutcome::Applied(_))
    ));
    assert_eq!(orchestrator.rules().side_to_move(), Color::Black);
}

#[tokio::test]
async fn test_resignation_ends_the_game() {
    let (client, engine) = ready_client(ClientConfig::default()).await;
    let mut orchestrator = orchestrator(client, Color::Black);

    orchestrator.play_human(mv("e2e4")).unwrap();
    let running = tokio::spawn(orchestrator.begin_turn().unwrap().run());
    settle().await;

    let outcome = orchestrator.resign().await.unwrap();
    assert_eq!(
        outcome,
        GameOutcome::Resignation {
            winner: Color::Black
        }
    );
    assert_eq!(engine.count("stop"), 1);
    assert_eq!(
        orchestrator.finish_turn(running.await.unwrap()),
        TurnOutcome::Discarded
    );

    assert!(orchestrator.begin_turn().is_none());
    assert!(matches!(
        orchestrator.play_human(mv("d2d4")),
        Err(PlayError::GameOver(_))
    ));
    assert!(matches!(orchestrator.undo().await, Err(PlayError::GameOver(_))));
    assert!(matches!(orchestrator.resign().await, Err(PlayError::GameOver(_))));

    orchestrator.new_game(None).await;
    assert!(orchestrator.outcome().is_none());
}

#[tokio::test]
async fn test_checkmate_stops_engine_turns() {
    let (handle, _engine) = auto_transport();
    let client = EngineClient::start(Ok(handle), ClientConfig::default());
    let mut orchestrator = MoveOrchestrator::new(
        // Fool's mate: White to move and already mated
        Game::from_fen("rnb1kbnr/pppp1ppp/8/4p3/6Pq/5P2/PPPPP2P/RNBQKBNR w KQkq - 1 3").unwrap(),
        client,
        Color::White,
    );

    assert_eq!(
        orchestrator.outcome(),
        Some(GameOutcome::Checkmate {
            winner: Color::Black
        })
    );
    assert!(orchestrator.begin_turn().is_none());
    assert!(orchestrator.play_engine_turn().await.is_none());
}

#[tokio::test]
async fn test_export_lists_moves_and_players() {
    let (handle, _engine) = auto_transport();
    let client = EngineClient::start(Ok(handle), ClientConfig::default());
    let mut orchestrator = orchestrator(client, Color::Black);

    orchestrator.play_human(mv("e2e4")).unwrap();
    orchestrator.play_engine_turn().await.unwrap();

    let json: serde_json::Value =
        serde_json::from_str(&orchestrator.export_json().unwrap()).unwrap();
    assert_eq!(json["human"], "white");
    assert_eq!(json["difficulty"], "normal");
    assert_eq!(json["start_fen"], STARTING_FEN);
    assert_eq!(json["moves"].as_array().unwrap().len(), 2);
    assert_eq!(json["moves"][0], "e2e4");
    assert!(json["outcome"].is_null());
}

/// Resets land at arbitrary points relative to dispatches, turn polling and
/// engine answers. Whatever the interleaving, a completion is applied only if
/// its epoch is still current, and then only as a legal move. The current
/// turn's search is never displaced by an older turn.
#[tokio::test]
async fn test_randomized_resets_never_apply_stale_results() {
    for seed in 0..8u64 {
        let mut driver = StdRng::seed_from_u64(seed);
        let (client, engine) = ready_client(ClientConfig::default()).await;
        let mut orchestrator = MoveOrchestrator::new(Game::new(), client, Color::Black)
            .with_rng(StdRng::seed_from_u64(seed + 100));

        let mut waiting = Vec::new();
        let mut running = Vec::new();
        let mut applied = 0;
        let mut discarded = 0;

        for _ in 0..250 {
            match driver.gen_range(0..10) {
                0..=1 => {
                    if let Some(turn) = orchestrator.begin_turn() {
                        waiting.push(turn);
                    }
                }
                2 => {
                    // Newest first, so older turns start running last
                    while let Some(turn) = waiting.pop() {
                        running.push(tokio::spawn(turn.run()));
                    }
                }
                3..=4 => {
                    engine.answer_last_search();
                }
                5 => {
                    let _ = orchestrator.undo().await;
                }
                6 => {
                    orchestrator.new_game(None).await;
                }
                _ => {
                    if orchestrator.outcome().is_some() {
                        orchestrator.new_game(None).await;
                    } else if orchestrator.rules().side_to_move() == orchestrator.human_color()
                        && !orchestrator.is_thinking()
                    {
                        let moves = orchestrator.rules().legal_moves();
                        let choice = moves[driver.gen_range(0..moves.len())];
                        orchestrator.play_human(choice).unwrap();
                    }
                }
            }
            settle().await;

            let (finished, still_running): (Vec<_>, Vec<_>) =
                running.into_iter().partition(|h| h.is_finished());
            running = still_running;

            for handle in finished {
                let completion = handle.await.unwrap();
                let current = orchestrator.epoch();
                let fen_before = orchestrator.rules().fen();
                let legal_before = orchestrator.rules().legal_moves();
                let plies_before = orchestrator.rules().history().len();

                let stale = completion.epoch != current;
                if !stale {
                    let lost = matches!(
                        completion.result,
                        TurnResult::Engine(Err(EngineError::Superseded | EngineError::Cancelled))
                    );
                    assert!(!lost, "seed {seed}: current turn lost its search");
                }
                let outcome = orchestrator.finish_turn(completion);

                if stale {
                    assert_eq!(outcome, TurnOutcome::Discarded);
                    assert_eq!(orchestrator.rules().fen(), fen_before);
                    discarded += 1;
                } else if let Some(played) = outcome.played() {
                    assert!(legal_before.contains(&played));
                    assert_eq!(orchestrator.rules().history().len(), plies_before + 1);
                    applied += 1;
                }
            }
        }

        assert!(applied > 0, "seed {seed}: no engine move was ever applied");
        assert!(discarded > 0, "seed {seed}: no stale result was ever discarded");
    }
}
