use tokio::sync::mpsc;

/// Something the engine side of the channel produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    Line(String),
    Failed(String),
}

pub type EventReceiver = mpsc::UnboundedReceiver<TransportEvent>;
pub type EventSender = mpsc::UnboundedSender<TransportEvent>;

/// Outbound half of an engine channel.
///
/// `send` is fire-and-forget: there is no acknowledgment, and delivery
/// problems surface later as [`TransportEvent::Failed`] on the event stream.
pub trait Transport: Send + 'static {
    fn send(&mut self, command: &str);
}

/// A connected transport: the outbound capability plus its inbound event stream
pub struct TransportHandle {
    pub sender: Box<dyn Transport>,
    pub events: EventReceiver,
}

impl TransportHandle {
    pub fn new(sender: impl Transport, events: EventReceiver) -> Self {
        Self {
            sender: Box::new(sender),
            events,
        }
    }
}

impl std::fmt::Debug for TransportHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportHandle").finish_non_exhaustive()
    }
}
