use super::difficulty::Difficulty;
use super::rules::RulesEngine;
use super::turn::{Epoch, PendingTurn, TurnCompletion, TurnOutcome, TurnResult, TurnState};
use crate::chess::{ChessError, Color, Game, GameOutcome, Move};
use crate::engine::EngineClient;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Pause before a deliberate mistake, so weak play does not look instant
pub const DEFAULT_MISTAKE_DELAY: Duration = Duration::from_millis(320);

/// Why a human action was refused
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlayError {
    #[error("It is not your turn")]
    NotYourTurn,

    #[error("The game is over: {0}")]
    GameOver(GameOutcome),

    #[error("The engine is thinking")]
    EngineThinking,

    #[error(transparent)]
    Illegal(#[from] ChessError),
}

/// Snapshot of a game for export
#[derive(Debug, Clone, Serialize)]
pub struct GameRecord {
    pub start_fen: String,
    pub fen: String,
    pub human: Color,
    pub difficulty: Difficulty,
    pub moves: Vec<String>,
    pub outcome: Option<GameOutcome>,
}

/// Sequences human and engine turns over one game.
///
/// Every reset (new game, undo, resignation) first stops the engine and then
/// advances the epoch. Engine results carry the epoch their turn started in
/// and are only applied if it is still current.
#[derive(Debug)]
pub struct MoveOrchestrator<R: RulesEngine = Game> {
    rules: R,
    engine: EngineClient,
    engine_color: Color,
    difficulty: Difficulty,
    epoch: Epoch,
    turn: TurnState,
    resigned: Option<Color>,
    rng: StdRng,
    mistake_delay: Duration,
}

impl<R: RulesEngine> MoveOrchestrator<R> {
    pub fn new(rules: R, engine: EngineClient, engine_color: Color) -> Self {
        Self {
            rules,
            engine,
            engine_color,
            difficulty: Difficulty::default(),
            epoch: Epoch::default(),
            turn: TurnState::Idle,
            resigned: None,
            rng: StdRng::from_entropy(),
            mistake_delay: DEFAULT_MISTAKE_DELAY,
        }
    }

    pub fn with_difficulty(mut self, difficulty: Difficulty) -> Self {
        self.difficulty = difficulty;
        self
    }

    pub fn with_mistake_delay(mut self, delay: Duration) -> Self {
        self.mistake_delay = delay;
        self
    }

    /// Use a fixed random source, for reproducible play
    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = rng;
        self
    }

    pub fn rules(&self) -> &R {
        &self.rules
    }

    pub fn engine(&self) -> &EngineClient {
        &self.engine
    }

    pub fn epoch(&self) -> Epoch {
        self.epoch
    }

    pub fn turn_state(&self) -> TurnState {
        self.turn
    }

    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    /// Takes effect from the next engine turn
    pub fn set_difficulty(&mut self, difficulty: Difficulty) {
        if self.difficulty != difficulty {
            info!("Difficulty changed from {} to {}", self.difficulty, difficulty);
            self.difficulty = difficulty;
        }
    }

    pub fn engine_color(&self) -> Color {
        self.engine_color
    }

    pub fn human_color(&self) -> Color {
        self.engine_color.opposite()
    }

    /// An engine turn from the current epoch is in flight
    pub fn is_thinking(&self) -> bool {
        matches!(self.turn, TurnState::AwaitingEngine { epoch } if epoch == self.epoch)
    }

    pub fn outcome(&self) -> Option<GameOutcome> {
        match self.resigned {
            Some(loser) => Some(GameOutcome::Resignation {
                winner: loser.opposite(),
            }),
            None => self.rules.outcome(),
        }
    }

    /// The engine is on move and no turn has been started for it yet
    pub fn is_engine_turn(&self) -> bool {
        !self.is_thinking()
            && self.rules.side_to_move() == self.engine_color
            && self.outcome().is_none()
    }

    /// Start an engine turn if one is due.
    ///
    /// Returns `None` when the human is on move, the game is over, or a turn
    /// for the current epoch is already in flight.
    pub fn begin_turn(&mut self) -> Option<PendingTurn> {
        if !self.is_engine_turn() {
            return None;
        }

        let profile = self.difficulty.profile();
        let turn = if profile.roll_mistake(&mut self.rng) {
            PendingTurn::mistake(self.epoch, self.mistake_delay)
        } else {
            let depth = profile.pick_depth(&mut self.rng);
            PendingTurn::search(&self.engine, &self.rules.fen(), self.epoch, depth)
        };

        debug!(
            epoch = self.epoch.value(),
            depth = turn.depth(),
            difficulty = %self.difficulty,
            "Engine turn started"
        );
        self.turn = TurnState::AwaitingEngine { epoch: self.epoch };
        Some(turn)
    }

    /// Apply a finished turn if its epoch is still current.
    pub fn finish_turn(&mut self, completion: TurnCompletion) -> TurnOutcome {
        if completion.epoch != self.epoch {
            warn!(
                "Discarding engine result from epoch {} (now {})",
                completion.epoch, self.epoch
            );
            return TurnOutcome::Discarded;
        }

        self.turn = TurnState::Idle;
        if let Some(outcome) = self.outcome() {
            debug!("Game already decided ({}), discarding engine result", outcome);
            return TurnOutcome::Discarded;
        }

        match completion.result {
            TurnResult::Mistake => match self.play_random() {
                Some(mv) => TurnOutcome::RandomApplied(mv),
                None => TurnOutcome::Discarded,
            },
            TurnResult::Engine(Ok(token)) => match self.apply_token(&token) {
                Ok(mv) => {
                    info!("Engine played {}", mv);
                    TurnOutcome::Applied(mv)
                }
                Err(e) => self.fallback(format!("engine move '{}' rejected: {}", token, e)),
            },
            TurnResult::Engine(Err(e)) => self.fallback(e.to_string()),
        }
    }

    /// Run one engine turn to completion
    pub async fn play_engine_turn(&mut self) -> Option<TurnOutcome> {
        let turn = self.begin_turn()?;
        let completion = turn.run().await;
        Some(self.finish_turn(completion))
    }

    /// Play a move for the human side
    pub fn play_human(&mut self, mv: Move) -> Result<(), PlayError> {
        if let Some(outcome) = self.outcome() {
            return Err(PlayError::GameOver(outcome));
        }
        if self.is_thinking() {
            return Err(PlayError::EngineThinking);
        }
        if self.rules.side_to_move() != self.human_color() {
            return Err(PlayError::NotYourTurn);
        }

        self.rules.apply(mv)?;
        debug!("Human played {}", mv);
        Ok(())
    }

    /// Start over from the initial position, optionally switching sides
    pub async fn new_game(&mut self, engine_color: Option<Color>) {
        self.reset().await;
        self.rules.restart();
        self.resigned = None;
        if let Some(color) = engine_color {
            self.engine_color = color;
        }
        info!(
            epoch = self.epoch.value(),
            "New game, engine plays {}", self.engine_color
        );
    }

    /// Take back moves until the human is on move again.
    ///
    /// Returns the moves taken back, most recent first. Nothing happens when
    /// there is no history.
    pub async fn undo(&mut self) -> Result<Vec<Move>, PlayError> {
        if let Some(outcome @ GameOutcome::Resignation { .. }) = self.outcome() {
            return Err(PlayError::GameOver(outcome));
        }
        if self.rules.ply_count() == 0 {
            return Ok(Vec::new());
        }

        self.reset().await;
        let mut taken_back = vec![self.rules.undo()?];
        if self.rules.side_to_move() != self.human_color() && self.rules.ply_count() > 0 {
            taken_back.push(self.rules.undo()?);
        }

        info!(epoch = self.epoch.value(), "Took back {} ply", taken_back.len());
        Ok(taken_back)
    }

    /// The human gives up
    pub async fn resign(&mut self) -> Result<GameOutcome, PlayError> {
        if let Some(outcome) = self.outcome() {
            return Err(PlayError::GameOver(outcome));
        }

        self.reset().await;
        self.resigned = Some(self.human_color());
        let outcome = GameOutcome::Resignation {
            winner: self.engine_color,
        };
        info!("{}", outcome);
        Ok(outcome)
    }

    pub fn record(&self) -> GameRecord {
        GameRecord {
            start_fen: self.rules.start_fen(),
            fen: self.rules.fen(),
            human: self.human_color(),
            difficulty: self.difficulty,
            moves: self.rules.history_uci(),
            outcome: self.outcome(),
        }
    }

    pub fn export_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.record())
    }

    /// Stop the engine, then invalidate everything started before now.
    ///
    /// The stop is acknowledged before the epoch moves, so the stopped
    /// request has settled by the time the new epoch exists.
    async fn reset(&mut self) {
        self.engine.stop().await;
        self.epoch.advance();
        self.turn = TurnState::Idle;
        debug!(epoch = self.epoch.value(), "Epoch advanced");
    }

    fn apply_token(&mut self, token: &str) -> Result<Move, ChessError> {
        let mv = Move::from_uci(token)?;
        self.rules.apply(mv)?;
        Ok(mv)
    }

    fn fallback(&mut self, reason: String) -> TurnOutcome {
        warn!("Engine turn failed ({}), playing a random move", reason);
        match self.play_random() {
            Some(mv) => TurnOutcome::FallbackApplied { mv, reason },
            None => TurnOutcome::Discarded,
        }
    }

    fn play_random(&mut self) -> Option<Move> {
        let mv = *self.rules.legal_moves().choose(&mut self.rng)?;
        match self.rules.apply(mv) {
            Ok(()) => Some(mv),
            Err(e) => {
                warn!("Random move {} was rejected: {}", mv, e);
                None
            }
        }
    }
}
