//! Common test utilities: a scripted stand-in for an engine process.
//!
//! The fake records every command the client sends and lets the test inject
//! engine output and failures at exactly the point it wants.

#![allow(dead_code)]

use knightfall::chess::Board;
use knightfall::engine::{
    ClientConfig, EngineClient, EventSender, Transport, TransportEvent, TransportHandle,
};
use std::sync::{Arc, Mutex};

/// A FEN with a handful of legal moves, for requests that just need a position
pub const SAMPLE_FEN: &str = "rnbqkbnr/pppp1ppp/8/4p3/4P3/8/PPPP1PPP/RNBQKBNR w KQkq e6 0 2";
pub const OTHER_FEN: &str = "r1bqkbnr/pppp1ppp/2n5/4p3/4P3/5N2/PPPP1PPP/RNBQKB1R w KQkq - 2 3";

struct RecordingTransport {
    sent: Arc<Mutex<Vec<String>>>,
    auto_reply: Option<EventSender>,
}

impl Transport for RecordingTransport {
    fn send(&mut self, command: &str) {
        let mut sent = self.sent.lock().unwrap();
        sent.push(command.to_string());

        // Behave like a very quick engine that always plays its first legal move
        if let Some(events) = &self.auto_reply {
            match command {
                "isready" => {
                    let _ = events.send(TransportEvent::Line("readyok".to_string()));
                }
                go if go.starts_with("go ") => {
                    let reply = last_position(&sent)
                        .and_then(|fen| first_legal_move(&fen))
                        .unwrap_or_else(|| "(none)".to_string());
                    let _ = events.send(TransportEvent::Line(format!("bestmove {reply}")));
                }
                _ => {}
            }
        }
    }
}

/// Test-side handle on the fake engine
#[derive(Clone)]
pub struct ScriptedEngine {
    sent: Arc<Mutex<Vec<String>>>,
    events: EventSender,
}

impl ScriptedEngine {
    /// Everything the client has sent so far
    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }

    /// Forget what was sent so far
    pub fn clear(&self) {
        self.sent.lock().unwrap().clear();
    }

    pub fn count(&self, command: &str) -> usize {
        self.sent().iter().filter(|c| c.as_str() == command).count()
    }

    /// Emit one line of engine output
    pub fn reply(&self, line: &str) {
        let _ = self.events.send(TransportEvent::Line(line.to_string()));
    }

    /// Report a broken channel
    pub fn fail(&self, reason: &str) {
        let _ = self.events.send(TransportEvent::Failed(reason.to_string()));
    }

    /// Answer the most recent `position` with its first legal move
    pub fn answer_last_search(&self) -> Option<String> {
        let mv = last_position(&self.sent()).and_then(|fen| first_legal_move(&fen))?;
        self.reply(&format!("bestmove {mv}"));
        Some(mv)
    }
}

fn last_position(sent: &[String]) -> Option<String> {
    sent.iter()
        .rev()
        .find_map(|c| c.strip_prefix("position fen "))
        .map(str::to_string)
}

fn first_legal_move(fen: &str) -> Option<String> {
    let board = Board::from_fen(fen).ok()?;
    board.legal_moves().first().map(|mv| mv.to_uci())
}

/// A transport the test drives by hand
pub fn scripted_transport() -> (TransportHandle, ScriptedEngine) {
    let sent = Arc::new(Mutex::new(Vec::new()));
    let (events_tx, events_rx) = tokio::sync::mpsc::unbounded_channel();
    let transport = RecordingTransport {
        sent: sent.clone(),
        auto_reply: None,
    };

    (
        TransportHandle::new(transport, events_rx),
        ScriptedEngine {
            sent,
            events: events_tx,
        },
    )
}

/// A transport that completes the handshake and answers every search at once
pub fn auto_transport() -> (TransportHandle, ScriptedEngine) {
    let sent = Arc::new(Mutex::new(Vec::new()));
    let (events_tx, events_rx) = tokio::sync::mpsc::unbounded_channel();
    let transport = RecordingTransport {
        sent: sent.clone(),
        auto_reply: Some(events_tx.clone()),
    };

    (
        TransportHandle::new(transport, events_rx),
        ScriptedEngine {
            sent,
            events: events_tx,
        },
    )
}

/// A client whose handshake has completed, with the handshake traffic cleared
pub async fn ready_client(config: ClientConfig) -> (EngineClient, ScriptedEngine) {
    let (handle, engine) = scripted_transport();
    let client = EngineClient::start(Ok(handle), config);
    engine.reply("readyok");
    client.wait_until_ready().await.unwrap();
    engine.clear();
    (client, engine)
}

/// Let spawned tasks and the session run until they block
pub async fn settle() {
    for _ in 0..50 {
        tokio::task::yield_now().await;
    }
}
