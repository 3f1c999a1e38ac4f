//! LoopbackTransport - two connected in-process endpoints
//!
//! Models the external peer-messaging service closely enough to exercise
//! the coordinator end to end:
//!
//! - Each endpoint must be activated before it can send; activation emits
//!   [`TransportEvent::SessionActivated`] once.
//! - Live messages need the link to be reachable and the peer activated.
//! - Each direction has a single durable slot. A write overwrites any value
//!   the peer has not observed yet; the value is handed over as soon as the
//!   link is reachable and the peer is activated.
//! - Counters record how many live messages and context writes each
//!   endpoint made.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, trace};

use scorelink_core::ports::{IPeerTransport, TransportError, TransportEvent, TransportSink};
use scorelink_core::wire::WireMap;

#[derive(Debug, Default)]
struct Endpoint {
    activated: bool,
    sink: Option<TransportSink>,
    /// Durable context written by the other side, not yet observed here
    pending_context: Option<WireMap>,
    messages_sent: u64,
    context_writes: u64,
    fail_next_send: bool,
}

#[derive(Debug)]
struct Link {
    reachable: bool,
    ends: [Endpoint; 2],
}

impl Link {
    fn dispatch(&self, side: usize, event: TransportEvent) -> bool {
        match &self.ends[side].sink {
            Some(sink) => sink.dispatch(event),
            None => false,
        }
    }

    /// Hands the pending durable context to `side` if it can observe it now
    fn flush_context(&mut self, side: usize) {
        if !self.reachable || !self.ends[side].activated {
            return;
        }
        if let Some(context) = self.ends[side].pending_context.take() {
            if self.dispatch(side, TransportEvent::ContextReceived(context.clone())) {
                trace!(side, "Durable context delivered");
            } else {
                self.ends[side].pending_context = Some(context);
            }
        }
    }
}

/// One end of an in-process transport pair
#[derive(Debug, Clone)]
pub struct LoopbackTransport {
    link: Arc<Mutex<Link>>,
    side: usize,
}

impl LoopbackTransport {
    /// Creates two connected endpoints; the link starts reachable and both
    /// sessions start inactive
    pub fn pair() -> (LoopbackTransport, LoopbackTransport) {
        let link = Arc::new(Mutex::new(Link {
            reachable: true,
            ends: [Endpoint::default(), Endpoint::default()],
        }));
        (
            LoopbackTransport {
                link: link.clone(),
                side: 0,
            },
            LoopbackTransport { link, side: 1 },
        )
    }

    fn lock(&self) -> MutexGuard<'_, Link> {
        self.link.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn peer(&self) -> usize {
        1 - self.side
    }

    /// Routes inbound events for this endpoint to `sink`
    pub fn attach(&self, sink: TransportSink) {
        let mut link = self.lock();
        link.ends[self.side].sink = Some(sink);
        link.flush_context(self.side);
    }

    /// Activates this endpoint's session
    ///
    /// The first call emits `SessionActivated` and hands over any durable
    /// context written while inactive. Later calls do nothing.
    pub fn activate(&self) {
        let mut link = self.lock();
        if link.ends[self.side].activated {
            return;
        }
        link.ends[self.side].activated = true;
        debug!(side = self.side, "Loopback session activated");
        link.dispatch(self.side, TransportEvent::SessionActivated);
        link.flush_context(self.side);
    }

    /// Connects or disconnects the link; both sides are told about it
    pub fn set_reachable(&self, reachable: bool) {
        let mut link = self.lock();
        if link.reachable == reachable {
            return;
        }
        link.reachable = reachable;
        debug!(reachable, "Loopback reachability changed");
        for side in 0..2 {
            link.dispatch(side, TransportEvent::ReachabilityChanged(reachable));
        }
        if reachable {
            link.flush_context(0);
            link.flush_context(1);
        }
    }

    /// Makes the next live send from this endpoint fail
    pub fn fail_next_send(&self) {
        self.lock().ends[self.side].fail_next_send = true;
    }

    /// Live messages this endpoint has sent successfully
    pub fn messages_sent(&self) -> u64 {
        self.lock().ends[self.side].messages_sent
    }

    /// Durable context writes made by this endpoint
    pub fn context_writes(&self) -> u64 {
        self.lock().ends[self.side].context_writes
    }

    /// Context written by this endpoint that the peer has not observed yet
    pub fn undelivered_context(&self) -> Option<WireMap> {
        self.lock().ends[self.peer()].pending_context.clone()
    }
}

#[async_trait::async_trait]
impl IPeerTransport for LoopbackTransport {
    fn is_activated(&self) -> bool {
        self.lock().ends[self.side].activated
    }

    fn is_reachable(&self) -> bool {
        self.lock().reachable
    }

    async fn send_message(&self, message: WireMap) -> Result<(), TransportError> {
        let mut link = self.lock();
        let (me, peer) = (self.side, self.peer());

        if !link.ends[me].activated {
            return Err(TransportError::NotActivated);
        }
        if !link.reachable {
            return Err(TransportError::NotReachable);
        }
        if link.ends[me].fail_next_send {
            link.ends[me].fail_next_send = false;
            return Err(TransportError::SendFailed("injected failure".into()));
        }
        if !link.ends[peer].activated {
            return Err(TransportError::SendFailed("peer session inactive".into()));
        }
        if !link.dispatch(peer, TransportEvent::MessageReceived(message)) {
            return Err(TransportError::SendFailed("peer not listening".into()));
        }

        link.ends[me].messages_sent += 1;
        Ok(())
    }

    fn update_context(&self, context: WireMap) -> Result<(), TransportError> {
        let mut link = self.lock();
        let (me, peer) = (self.side, self.peer());

        if !link.ends[me].activated {
            return Err(TransportError::NotActivated);
        }

        link.ends[peer].pending_context = Some(context);
        link.ends[me].context_writes += 1;
        link.flush_context(peer);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio::sync::mpsc::UnboundedReceiver;

    fn map(n: i64) -> WireMap {
        let mut m = WireMap::new();
        m.insert("n".into(), json!(n));
        m
    }

    fn wired() -> (
        LoopbackTransport,
        UnboundedReceiver<TransportEvent>,
        LoopbackTransport,
        UnboundedReceiver<TransportEvent>,
    ) {
        let (a, b) = LoopbackTransport::pair();
        let (sink_a, rx_a) = TransportSink::channel();
        let (sink_b, rx_b) = TransportSink::channel();
        a.attach(sink_a);
        b.attach(sink_b);
        (a, rx_a, b, rx_b)
    }

    #[tokio::test]
    async fn test_activation_fires_once() {
        let (a, mut rx_a, _b, _rx_b) = wired();
        a.activate();
        a.activate();
        assert_eq!(rx_a.try_recv().unwrap(), TransportEvent::SessionActivated);
        assert!(rx_a.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_live_message_reaches_peer() {
        let (a, _rx_a, b, mut rx_b) = wired();
        a.activate();
        b.activate();
        let _ = rx_b.try_recv();

        a.send_message(map(1)).await.unwrap();

        assert_eq!(rx_b.try_recv().unwrap(), TransportEvent::MessageReceived(map(1)));
        assert_eq!(a.messages_sent(), 1);
    }

    #[tokio::test]
    async fn test_send_requires_activation_and_reachability() {
        let (a, _rx_a, b, _rx_b) = wired();
        assert_eq!(a.send_message(map(1)).await, Err(TransportError::NotActivated));

        a.activate();
        b.activate();
        a.set_reachable(false);
        assert_eq!(a.send_message(map(1)).await, Err(TransportError::NotReachable));
        assert_eq!(a.messages_sent(), 0);
    }

    #[tokio::test]
    async fn test_durable_slot_is_last_write_wins() {
        let (a, _rx_a, b, mut rx_b) = wired();
        a.activate();
        b.activate();
        let _ = rx_b.try_recv();
        a.set_reachable(false);
        let _ = rx_b.try_recv();

        a.update_context(map(1)).unwrap();
        a.update_context(map(2)).unwrap();
        assert_eq!(a.undelivered_context(), Some(map(2)));
        assert!(rx_b.try_recv().is_err());

        a.set_reachable(true);
        assert_eq!(rx_b.try_recv().unwrap(), TransportEvent::ReachabilityChanged(true));
        assert_eq!(rx_b.try_recv().unwrap(), TransportEvent::ContextReceived(map(2)));
        assert!(rx_b.try_recv().is_err());
        assert_eq!(a.context_writes(), 2);
        assert_eq!(a.undelivered_context(), None);
    }

    #[tokio::test]
    async fn test_context_waits_for_peer_activation() {
        let (a, _rx_a, b, mut rx_b) = wired();
        a.activate();
        a.update_context(map(7)).unwrap();
        assert!(rx_b.try_recv().is_err());

        b.activate();
        assert_eq!(rx_b.try_recv().unwrap(), TransportEvent::SessionActivated);
        assert_eq!(rx_b.try_recv().unwrap(), TransportEvent::ContextReceived(map(7)));
    }

    #[tokio::test]
    async fn test_injected_send_failure_is_one_shot() {
        let (a, _rx_a, b, _rx_b) = wired();
        a.activate();
        b.activate();
        a.fail_next_send();
        assert!(matches!(
            a.send_message(map(1)).await,
            Err(TransportError::SendFailed(_))
        ));
        assert!(a.send_message(map(1)).await.is_ok());
    }
}
