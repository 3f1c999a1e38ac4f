//! TransportAdapter - uniform delivery over the two transport tiers
//!
//! The external transport offers a live message (needs the peer to be
//! reachable, reports success or failure) and a durable context slot (last
//! write wins, delivered whenever the peer next observes it). The adapter
//! picks between them according to a [`DeliveryPolicy`].
//!
//! ## Design Notes
//!
//! - Exactly one live attempt and at most one durable write per call. There
//!   are no retries at this layer; the next local change triggers a fresh
//!   delivery of the then-current state.
//! - Every attempt is logged with its outcome.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, info, warn};

use scorelink_core::ports::{IPeerTransport, TransportError};
use scorelink_core::wire::{WireMap, WireMessage};

// ============================================================================
// Policy and outcome
// ============================================================================

/// How a message is routed across the two delivery tiers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryPolicy {
    /// Live message if the peer is reachable, otherwise (or on failure)
    /// the durable context. Used for state snapshots.
    LiveThenDurable,
    /// Live message only. Used for commands, which must never sit in the
    /// durable slot where they could later be read back as state.
    LiveOnly,
    /// Live message if reachable, and always the durable context as well.
    /// Used for data-changed notifications.
    LiveAndDurable,
}

impl DeliveryPolicy {
    /// The policy for a given message kind
    pub fn for_message(message: &WireMessage) -> Self {
        match message {
            WireMessage::Sync(_) | WireMessage::Preferences(_) => DeliveryPolicy::LiveThenDurable,
            WireMessage::Command(_) => DeliveryPolicy::LiveOnly,
            WireMessage::Notification(_) => DeliveryPolicy::LiveAndDurable,
        }
    }
}

/// Which tier, if any, accepted a delivery
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// The peer accepted a live message
    Live,
    /// The value was written to the durable context
    Durable,
    /// Nothing accepted the value
    Dropped,
}

impl DeliveryOutcome {
    pub fn is_delivered(&self) -> bool {
        !matches!(self, DeliveryOutcome::Dropped)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryOutcome::Live => "live",
            DeliveryOutcome::Durable => "durable",
            DeliveryOutcome::Dropped => "dropped",
        }
    }
}

impl fmt::Display for DeliveryOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// TransportAdapter
// ============================================================================

/// Delivery front-end over an [`IPeerTransport`]
#[derive(Clone)]
pub struct TransportAdapter {
    transport: Arc<dyn IPeerTransport>,
}

impl TransportAdapter {
    pub fn new(transport: Arc<dyn IPeerTransport>) -> Self {
        Self { transport }
    }

    /// Delivers `map` live, falling back to the durable context
    pub async fn deliver(&self, map: WireMap) -> DeliveryOutcome {
        self.deliver_with(map, DeliveryPolicy::LiveThenDurable).await
    }

    /// Encodes and delivers a message using the policy for its kind
    pub async fn deliver_message(&self, message: &WireMessage) -> DeliveryOutcome {
        let policy = DeliveryPolicy::for_message(message);
        debug!(kind = message.kind(), ?policy, "Delivering message");
        self.deliver_with(message.encode(), policy).await
    }

    /// Delivers `map` according to `policy`
    pub async fn deliver_with(&self, map: WireMap, policy: DeliveryPolicy) -> DeliveryOutcome {
        match policy {
            DeliveryPolicy::LiveThenDurable => match self.try_live(map.clone()).await {
                Ok(()) => DeliveryOutcome::Live,
                Err(_) => self.write_durable(map),
            },
            DeliveryPolicy::LiveOnly => match self.try_live(map).await {
                Ok(()) => DeliveryOutcome::Live,
                Err(_) => DeliveryOutcome::Dropped,
            },
            DeliveryPolicy::LiveAndDurable => {
                let live = self.try_live(map.clone()).await;
                let durable = self.write_durable(map);
                if live.is_ok() {
                    DeliveryOutcome::Live
                } else {
                    durable
                }
            }
        }
    }

    /// Sends `live` as a live message; if that fails, writes `durable` to
    /// the context instead
    ///
    /// Used where the live message is partial (a preference delta, a
    /// command) but the durable slot must always hold complete state.
    pub async fn deliver_with_fallback(&self, live: WireMap, durable: WireMap) -> DeliveryOutcome {
        match self.try_live(live).await {
            Ok(()) => DeliveryOutcome::Live,
            Err(_) => self.write_durable(durable),
        }
    }

    async fn try_live(&self, map: WireMap) -> Result<(), TransportError> {
        if !self.transport.is_activated() {
            debug!("Live send skipped: session not activated");
            return Err(TransportError::NotActivated);
        }
        if !self.transport.is_reachable() {
            debug!("Live send skipped: peer not reachable");
            return Err(TransportError::NotReachable);
        }

        match self.transport.send_message(map).await {
            Ok(()) => {
                info!(tier = "live", "Delivered to peer");
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "Live send failed");
                Err(e)
            }
        }
    }

    fn write_durable(&self, map: WireMap) -> DeliveryOutcome {
        match self.transport.update_context(map) {
            Ok(()) => {
                info!(tier = "durable", "Wrote durable context");
                DeliveryOutcome::Durable
            }
            Err(e) => {
                warn!(error = %e, "Durable context write failed, dropping delivery");
                DeliveryOutcome::Dropped
            }
        }
    }
}

impl fmt::Debug for TransportAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransportAdapter")
            .field("activated", &self.transport.is_activated())
            .field("reachable", &self.transport.is_reachable())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use scorelink_core::domain::{Command, Notification, PreferenceSet};
    use scorelink_core::wire::SyncPayload;

    /// Records what reached each tier; behavior is toggled per test
    #[derive(Default)]
    struct FakeTransport {
        activated: bool,
        reachable: bool,
        fail_send: bool,
        fail_context: bool,
        sent: Mutex<Vec<WireMap>>,
        contexts: Mutex<Vec<WireMap>>,
    }

    impl FakeTransport {
        fn online() -> Self {
            Self {
                activated: true,
                reachable: true,
                ..Default::default()
            }
        }

        fn offline() -> Self {
            Self {
                activated: true,
                reachable: false,
                ..Default::default()
            }
        }
    }

    #[async_trait::async_trait]
    impl IPeerTransport for FakeTransport {
        fn is_activated(&self) -> bool {
            self.activated
        }

        fn is_reachable(&self) -> bool {
            self.reachable
        }

        async fn send_message(&self, message: WireMap) -> Result<(), TransportError> {
            if self.fail_send {
                return Err(TransportError::SendFailed("peer rejected".into()));
            }
            self.sent.lock().unwrap().push(message);
            Ok(())
        }

        fn update_context(&self, context: WireMap) -> Result<(), TransportError> {
            if self.fail_context {
                return Err(TransportError::ContextFailed("slot unavailable".into()));
            }
            self.contexts.lock().unwrap().push(context);
            Ok(())
        }
    }

    fn build(fake: FakeTransport) -> (TransportAdapter, Arc<FakeTransport>) {
        let fake = Arc::new(fake);
        (TransportAdapter::new(fake.clone()), fake)
    }

    fn snapshot_map() -> WireMap {
        SyncPayload::default().to_wire_map()
    }

    #[tokio::test]
    async fn test_deliver_prefers_live_when_reachable() {
        let (adapter, fake) = build(FakeTransport::online());
        assert_eq!(adapter.deliver(snapshot_map()).await, DeliveryOutcome::Live);
        assert_eq!(fake.sent.lock().unwrap().len(), 1);
        assert!(fake.contexts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_deliver_falls_back_to_durable_when_unreachable() {
        let (adapter, fake) = build(FakeTransport::offline());
        assert_eq!(adapter.deliver(snapshot_map()).await, DeliveryOutcome::Durable);
        assert!(fake.sent.lock().unwrap().is_empty());
        assert_eq!(fake.contexts.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_deliver_falls_back_on_live_failure() {
        let (adapter, fake) = build(FakeTransport {
            fail_send: true,
            ..FakeTransport::online()
        });
        let map = snapshot_map();
        assert_eq!(adapter.deliver(map.clone()).await, DeliveryOutcome::Durable);
        assert_eq!(fake.contexts.lock().unwrap().as_slice(), &[map]);
    }

    #[tokio::test]
    async fn test_deliver_drops_when_both_tiers_fail() {
        let (adapter, _fake) = build(FakeTransport {
            fail_context: true,
            ..FakeTransport::offline()
        });
        let outcome = adapter.deliver(snapshot_map()).await;
        assert_eq!(outcome, DeliveryOutcome::Dropped);
        assert!(!outcome.is_delivered());
    }

    #[tokio::test]
    async fn test_not_activated_skips_live() {
        let (adapter, fake) = build(FakeTransport {
            reachable: true,
            ..Default::default()
        });
        assert_eq!(adapter.deliver(snapshot_map()).await, DeliveryOutcome::Durable);
        assert!(fake.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_commands_never_reach_durable_slot() {
        let (adapter, fake) = build(FakeTransport::offline());
        let outcome = adapter
            .deliver_message(&WireMessage::Command(Command::ResetScores))
            .await;
        assert_eq!(outcome, DeliveryOutcome::Dropped);
        assert!(fake.contexts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_notifications_go_to_both_tiers() {
        let (adapter, fake) = build(FakeTransport::online());
        let outcome = adapter
            .deliver_message(&WireMessage::Notification(Notification::DataChanged))
            .await;
        assert_eq!(outcome, DeliveryOutcome::Live);
        assert_eq!(fake.sent.lock().unwrap().len(), 1);
        assert_eq!(fake.contexts.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_fallback_writes_the_durable_variant() {
        let (adapter, fake) = build(FakeTransport::offline());
        let delta = WireMessage::Preferences(PreferenceSet::new().with("k", true)).encode();
        let full = snapshot_map();

        let outcome = adapter.deliver_with_fallback(delta, full.clone()).await;

        assert_eq!(outcome, DeliveryOutcome::Durable);
        assert_eq!(fake.contexts.lock().unwrap().as_slice(), &[full]);
    }

    #[test]
    fn test_policy_per_message_kind() {
        assert_eq!(
            DeliveryPolicy::for_message(&WireMessage::Sync(SyncPayload::default())),
            DeliveryPolicy::LiveThenDurable
        );
        assert_eq!(
            DeliveryPolicy::for_message(&WireMessage::Command(Command::ReinitializeApp)),
            DeliveryPolicy::LiveOnly
        );
        assert_eq!(
            DeliveryPolicy::for_message(&WireMessage::Notification(Notification::DataChanged)),
            DeliveryPolicy::LiveAndDurable
        );
    }
}
