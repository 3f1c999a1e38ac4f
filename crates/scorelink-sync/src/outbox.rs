//! Outbound delivery queue
//!
//! The coordinator never awaits the transport. It pushes [`Outbound`]
//! items onto an unbounded channel and a single outbox task delivers them
//! in order, so a slow live send cannot stall inbound processing and two
//! snapshots can never overtake each other.

use tokio::sync::{broadcast, mpsc};
use tracing::{debug, trace};

use scorelink_core::wire::{WireMap, WireMessage};
use scorelink_transport::TransportAdapter;

use crate::events::SyncEvent;

/// One queued delivery
#[derive(Debug)]
pub(crate) enum Outbound {
    /// A typed message, routed by the policy for its kind
    Message(WireMessage),
    /// A live message backed by a full state snapshot in the durable slot
    WithFallback {
        kind: &'static str,
        live: WireMap,
        durable: WireMap,
    },
}

impl Outbound {
    fn kind(&self) -> &'static str {
        match self {
            Outbound::Message(message) => message.kind(),
            Outbound::WithFallback { kind, .. } => kind,
        }
    }
}

/// Delivers queued items until every sender is dropped
pub(crate) async fn run_outbox(
    adapter: TransportAdapter,
    mut rx: mpsc::UnboundedReceiver<Outbound>,
    events: broadcast::Sender<SyncEvent>,
) {
    debug!("Outbox started");
    while let Some(item) = rx.recv().await {
        let kind = item.kind();
        trace!(kind, "Delivering queued item");
        let outcome = match item {
            Outbound::Message(message) => adapter.deliver_message(&message).await,
            Outbound::WithFallback { live, durable, .. } => {
                adapter.deliver_with_fallback(live, durable).await
            }
        };
        let _ = events.send(SyncEvent::Delivered { kind, outcome });
    }
    debug!("Outbox drained");
}
