use super::error::{EngineError, Result};
use super::process::ProcessTransport;
use super::protocol::{parse_line, Command, EngineLine};
use super::readiness::{ReadinessMonitor, ReadinessState, ReadinessWaiter};
use super::request::{BestMoveMatch, BestMoveResult, RequestSlot};
use super::transport::{EventReceiver, Transport, TransportEvent, TransportHandle};
use std::future::pending;
use std::path::Path;
use std::pin::Pin;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{sleep, Sleep};
use tracing::{debug, error, info, instrument, warn};

/// Deadline for a single best-move request
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_millis(15_000);
/// Deadline for the `uci`/`isready` handshake
pub const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_millis(10_000);

/// Timing knobs for an engine session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientConfig {
    pub request_timeout: Duration,
    pub handshake_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            handshake_timeout: DEFAULT_HANDSHAKE_TIMEOUT,
        }
    }
}

enum SessionCommand {
    Dispatch {
        fen: String,
        depth: u32,
        tag: u64,
        reply: oneshot::Sender<BestMoveResult>,
    },
    Stop {
        ack: oneshot::Sender<()>,
    },
}

/// Request/response front end for a line-oriented engine.
///
/// Cheap to clone; every clone talks to the same session. The session task
/// owns the transport, readiness and the request slot and is their only
/// writer. It exits once every clone has been dropped.
#[derive(Debug, Clone)]
pub struct EngineClient {
    commands: mpsc::UnboundedSender<SessionCommand>,
    readiness: ReadinessWaiter,
}

/// A search handed to the session; resolves exactly once
#[derive(Debug)]
pub struct SearchHandle {
    outcome: oneshot::Receiver<BestMoveResult>,
}

impl SearchHandle {
    pub async fn outcome(self) -> Result<String> {
        // A dropped sink means the session shut down with the request in flight
        self.outcome.await.unwrap_or(Err(EngineError::Cancelled))
    }
}

/// A dispatch that arrived before the handshake finished
struct QueuedSearch {
    fen: String,
    depth: u32,
    tag: u64,
    reply: oneshot::Sender<BestMoveResult>,
}

impl std::fmt::Debug for SessionCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionCommand::Dispatch { depth, tag, .. } => f
                .debug_struct("Dispatch")
                .field("depth", depth)
                .field("tag", tag)
                .finish_non_exhaustive(),
            SessionCommand::Stop { .. } => f.write_str("Stop"),
        }
    }
}

impl EngineClient {
    /// Start a session over an already-acquired transport.
    ///
    /// A failed acquisition still yields a client: its readiness is `Failed`
    /// and every request is rejected with `Unavailable`.
    /// Must be called from within a tokio runtime.
    pub fn start(transport: Result<TransportHandle>, config: ClientConfig) -> Self {
        let readiness = ReadinessMonitor::new();
        let waiter = readiness.subscribe();
        let (command_tx, command_rx) = mpsc::unbounded_channel();

        let session = Session::open(transport, readiness, command_rx, config);
        tokio::spawn(session.run());

        Self {
            commands: command_tx,
            readiness: waiter,
        }
    }

    /// Spawn an engine binary and start a session over its pipes
    pub fn spawn_process(path: &Path, args: &[String], config: ClientConfig) -> Self {
        Self::start(ProcessTransport::spawn(path, args), config)
    }

    pub fn readiness(&self) -> ReadinessState {
        self.readiness.state()
    }

    pub async fn wait_until_ready(&self) -> Result<()> {
        self.readiness.wait_until_ready().await
    }

    /// Ask for the best move in `fen`, searching `depth` plies.
    pub async fn get_best_move(&self, fen: &str, depth: u32) -> Result<String> {
        self.get_best_move_tagged(fen, depth, 0).await
    }

    /// Like [`get_best_move`](Self::get_best_move), recording `tag` on the request.
    ///
    /// Any request still in flight is superseded. Rejects with `Unavailable`
    /// without sending anything if the engine never became ready.
    pub async fn get_best_move_tagged(&self, fen: &str, depth: u32, tag: u64) -> Result<String> {
        self.dispatch(fen, depth, tag).outcome().await
    }

    /// Queue a search with the session and return without waiting.
    ///
    /// The session sees dispatches and stops in the order they were made, so
    /// a [`stop`](Self::stop) issued after this call always settles this
    /// search. A search queued before the handshake finishes is held until
    /// `readyok`, or rejected with `Unavailable` if readiness fails.
    pub fn dispatch(&self, fen: &str, depth: u32, tag: u64) -> SearchHandle {
        let (reply, outcome) = oneshot::channel();
        let command = SessionCommand::Dispatch {
            fen: fen.to_string(),
            depth: depth.max(1),
            tag,
            reply,
        };
        if let Err(mpsc::error::SendError(SessionCommand::Dispatch { reply, .. })) =
            self.commands.send(command)
        {
            let _ = reply.send(Err(EngineError::Unavailable(
                "engine session closed".to_string(),
            )));
        }
        SearchHandle { outcome }
    }

    /// Cancel the in-flight request, if any. Returns once the session has
    /// settled it, so a following state change cannot race its outcome.
    pub async fn stop(&self) {
        let (ack, acked) = oneshot::channel();
        if self.commands.send(SessionCommand::Stop { ack }).is_ok() {
            let _ = acked.await;
        }
    }
}

/// State owned by the session task
struct Session {
    transport: Option<Box<dyn Transport>>,
    events: Option<EventReceiver>,
    readiness: ReadinessMonitor,
    slot: RequestSlot,
    queued: Option<QueuedSearch>,
    commands: mpsc::UnboundedReceiver<SessionCommand>,
    handshake_timer: Option<Pin<Box<Sleep>>>,
    /// Transport failure seen after the handshake completed
    fault: Option<String>,
    config: ClientConfig,
}

impl Session {
    fn open(
        transport: Result<TransportHandle>,
        readiness: ReadinessMonitor,
        commands: mpsc::UnboundedReceiver<SessionCommand>,
        config: ClientConfig,
    ) -> Self {
        let mut session = Self {
            transport: None,
            events: None,
            readiness,
            slot: RequestSlot::new(),
            queued: None,
            commands,
            handshake_timer: None,
            fault: None,
            config,
        };

        session.readiness.begin();
        match transport {
            Ok(handle) => {
                session.transport = Some(handle.sender);
                session.events = Some(handle.events);
                session.handshake_timer = Some(Box::pin(sleep(config.handshake_timeout)));
                session.send(Command::Uci);
                session.send(Command::IsReady);
            }
            Err(e) => {
                error!("Could not acquire engine transport: {}", e);
                let reason = match e {
                    EngineError::Unavailable(reason) | EngineError::TransportError(reason) => {
                        reason
                    }
                    other => other.to_string(),
                };
                session.readiness.mark_failed(reason);
            }
        }

        session
    }

    #[instrument(name = "engine_session", skip(self))]
    async fn run(mut self) {
        loop {
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(command) => self.on_command(command),
                    None => break,
                },
                event = next_event(&mut self.events) => self.on_event(event),
                () = self.slot.expired() => self.on_request_timeout(),
                () = handshake_expired(&mut self.handshake_timer) => self.on_handshake_timeout(),
            }
        }

        debug!("All engine clients dropped, closing session");
        self.reject_queued(EngineError::Cancelled);
        if self.slot.settle(Err(EngineError::Cancelled)) {
            self.send(Command::Stop);
        }
        self.readiness.mark_failed("engine session closed");
        self.send(Command::Quit);
    }

    fn send(&mut self, command: Command) {
        if let Some(transport) = self.transport.as_mut() {
            let text = command.to_string();
            debug!("engine <- {}", text);
            transport.send(&text);
        }
    }

    fn on_command(&mut self, command: SessionCommand) {
        match command {
            SessionCommand::Dispatch {
                fen,
                depth,
                tag,
                reply,
            } => self.dispatch(fen, depth, tag, reply),
            SessionCommand::Stop { ack } => {
                if self.reject_queued(EngineError::Cancelled) {
                    info!("Queued search cancelled");
                }
                if self.slot.settle(Err(EngineError::Cancelled)) {
                    info!("Search cancelled");
                    self.send(Command::Stop);
                }
                let _ = ack.send(());
            }
        }
    }

    fn dispatch(
        &mut self,
        fen: String,
        depth: u32,
        tag: u64,
        reply: oneshot::Sender<BestMoveResult>,
    ) {
        if let ReadinessState::Failed(reason) = self.readiness.state() {
            let _ = reply.send(Err(EngineError::Unavailable(reason)));
            return;
        }
        if let Some(fault) = &self.fault {
            let _ = reply.send(Err(EngineError::TransportError(fault.clone())));
            return;
        }
        if self.readiness.state() != ReadinessState::Ready {
            if let Some(older) = self.queued.take() {
                let _ = older.reply.send(Err(EngineError::Superseded));
            }
            debug!(tag, depth, "Holding search until the engine is ready");
            self.queued = Some(QueuedSearch {
                fen,
                depth,
                tag,
                reply,
            });
            return;
        }

        // The old request must be gone, timer included, before the new one exists
        if self.slot.settle(Err(EngineError::Superseded)) {
            info!("Superseding in-flight search");
            self.send(Command::Stop);
        }

        self.send(Command::Position { fen });
        self.send(Command::GoDepth(depth));
        let search = self.slot.install(tag, reply, self.config.request_timeout);
        debug!(tag, search, depth, "Search dispatched");
    }

    fn on_event(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::Line(line) => self.on_line(&line),
            TransportEvent::Failed(reason) => self.on_failure(reason),
        }
    }

    fn on_line(&mut self, line: &str) {
        match parse_line(line) {
            EngineLine::ReadyOk => {
                if self.readiness.mark_ready() {
                    self.handshake_timer = None;
                    if let Some(queued) = self.queued.take() {
                        self.dispatch(queued.fen, queued.depth, queued.tag, queued.reply);
                    }
                }
            }
            EngineLine::BestMove(token) => match self.slot.on_best_move(token) {
                BestMoveMatch::Resolved => {}
                BestMoveMatch::Stale => debug!("Ignoring bestmove from a settled search: {}", line),
                BestMoveMatch::NoMove => debug!("Engine reported no legal move"),
                BestMoveMatch::Unsolicited => debug!("Ignoring unsolicited line: {}", line),
            },
            EngineLine::Other => debug!("engine -> {}", line),
        }
    }

    fn on_failure(&mut self, reason: String) {
        error!("Engine transport failure: {}", reason);
        self.slot
            .settle(Err(EngineError::TransportError(reason.clone())));

        if self.readiness.state() == ReadinessState::Initializing {
            self.readiness.mark_failed(reason.clone());
            self.handshake_timer = None;
            self.reject_queued(EngineError::Unavailable(reason));
        } else if self.fault.is_none() {
            self.fault = Some(reason);
        }
        // Nothing more will arrive
        self.events = None;
    }

    fn on_request_timeout(&mut self) {
        let timeout = self
            .slot
            .pending()
            .map(|request| request.timeout)
            .unwrap_or(self.config.request_timeout);
        warn!("Engine did not answer within {:?}", timeout);
        if self.slot.settle(Err(EngineError::Timeout(timeout))) {
            self.send(Command::Stop);
        }
    }

    fn on_handshake_timeout(&mut self) {
        self.handshake_timer = None;
        self.readiness.mark_failed("handshake timed out");
        self.reject_queued(EngineError::Unavailable("handshake timed out".to_string()));
    }

    /// Settle a search still waiting for the handshake. Returns whether one was waiting.
    fn reject_queued(&mut self, error: EngineError) -> bool {
        match self.queued.take() {
            Some(queued) => {
                let _ = queued.reply.send(Err(error));
                true
            }
            None => false,
        }
    }
}

/// Next transport event; a closed stream reads as a failure, a missing one never yields.
async fn next_event(events: &mut Option<EventReceiver>) -> TransportEvent {
    match events.as_mut() {
        Some(receiver) => receiver
            .recv()
            .await
            .unwrap_or_else(|| TransportEvent::Failed("engine transport closed".to_string())),
        None => pending().await,
    }
}

async fn handshake_expired(timer: &mut Option<Pin<Box<Sleep>>>) {
    match timer.as_mut() {
        Some(timer) => timer.as_mut().await,
        None => pending().await,
    }
}
