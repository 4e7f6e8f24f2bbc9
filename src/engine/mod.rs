//! Asynchronous client for a UCI chess engine.
//!
//! One [`EngineClient`] drives one engine session: it performs the
//! `uci`/`isready` handshake, keeps at most one best-move search in flight,
//! and resolves every request exactly once.

mod client;
mod error;
mod process;
mod protocol;
mod readiness;
mod request;
mod transport;

pub use client::{
    ClientConfig, EngineClient, SearchHandle, DEFAULT_HANDSHAKE_TIMEOUT, DEFAULT_REQUEST_TIMEOUT,
};
pub use error::{EngineError, Result};
pub use process::ProcessTransport;
pub use protocol::{parse_line, Command, EngineLine, NO_MOVE};
pub use readiness::{ReadinessMonitor, ReadinessState, ReadinessWaiter};
pub use request::{BestMoveMatch, BestMoveResult, PendingRequest, RequestSlot, SearchId};
pub use transport::{EventReceiver, EventSender, Transport, TransportEvent, TransportHandle};
