//! Peer transport port (driven/secondary port)
//!
//! This module defines the interface to the system-provided peer messaging
//! service. It offers two delivery tiers:
//!
//! - **Live message**: immediate, requires the peer to be reachable, and
//!   reports success or failure to the sender.
//! - **Durable context**: a single slot, last write wins. The transport
//!   hands the latest value to the peer whenever it next observes it,
//!   including after either process restarts.
//!
//! Inbound traffic is pushed to a [`TransportSink`] as [`TransportEvent`]s.
//! Events arrive on transport threads; the sink forwards them to the
//! coordinator's own context before any shared state is touched.

use thiserror::Error;
use tokio::sync::mpsc;

use crate::wire::WireMap;

/// Failures reported by the transport
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The session has not finished activating
    #[error("transport session not activated")]
    NotActivated,

    /// The peer cannot be reached right now
    #[error("peer not reachable")]
    NotReachable,

    /// A live message was rejected or lost
    #[error("live send failed: {0}")]
    SendFailed(String),

    /// The durable context could not be written
    #[error("context update failed: {0}")]
    ContextFailed(String),
}

/// Something that happened on the transport
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    /// The session became active (once per process lifetime)
    SessionActivated,
    /// A live message arrived from the peer
    MessageReceived(WireMap),
    /// The peer's durable context was delivered
    ContextReceived(WireMap),
    /// The peer became reachable or unreachable
    ReachabilityChanged(bool),
}

/// Port trait for the external peer messaging service
#[async_trait::async_trait]
pub trait IPeerTransport: Send + Sync {
    /// Whether the session has activated
    fn is_activated(&self) -> bool;

    /// Whether the peer is reachable for live messages
    fn is_reachable(&self) -> bool;

    /// Sends a live message, resolving once the peer accepted or rejected it
    async fn send_message(&self, message: WireMap) -> Result<(), TransportError>;

    /// Replaces the durable context with `context`
    fn update_context(&self, context: WireMap) -> Result<(), TransportError>;
}

/// Inbound side of the transport
///
/// Cloneable handle that redispatches transport callbacks onto the
/// receiving coordinator's queue.
#[derive(Debug, Clone)]
pub struct TransportSink {
    tx: mpsc::UnboundedSender<TransportEvent>,
}

impl TransportSink {
    pub fn new(tx: mpsc::UnboundedSender<TransportEvent>) -> Self {
        Self { tx }
    }

    /// Creates a sink and the receiver it feeds
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<TransportEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Forwards an event. Returns `false` when the receiver is gone.
    pub fn dispatch(&self, event: TransportEvent) -> bool {
        self.tx.send(event).is_ok()
    }
}
