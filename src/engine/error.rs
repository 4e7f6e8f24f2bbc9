use std::time::Duration;
use thiserror::Error;

/// Ways a best-move request can fail. Every rejection a caller of
/// [`EngineClient::get_best_move`](super::EngineClient::get_best_move) sees is one of these.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// The engine never became usable (spawn failure, handshake failure or timeout)
    #[error("Engine unavailable: {0}")]
    Unavailable(String),

    /// No `bestmove` arrived before the request deadline
    #[error("Engine did not answer within {0:?}")]
    Timeout(Duration),

    /// A newer request replaced this one while it was in flight
    #[error("Request superseded by a newer search")]
    Superseded,

    /// `stop()` was called while this request was in flight
    #[error("Request cancelled")]
    Cancelled,

    /// The channel to the engine failed
    #[error("Engine transport failed: {0}")]
    TransportError(String),
}

impl EngineError {
    /// Short label for log fields
    pub fn kind(&self) -> &'static str {
        match self {
            EngineError::Unavailable(_) => "unavailable",
            EngineError::Timeout(_) => "timeout",
            EngineError::Superseded => "superseded",
            EngineError::Cancelled => "cancelled",
            EngineError::TransportError(_) => "transport_error",
        }
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
