//! Events published by the coordinator
//!
//! Subscribers (UI layers, tests, the CLI simulation) receive these on a
//! `tokio::sync::broadcast` channel. A lagging subscriber loses old events
//! but never blocks the coordinator.

use scorelink_core::domain::{Command, PreferenceSet, Role};
use scorelink_transport::DeliveryOutcome;

/// Where a change came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeOrigin {
    /// A local edit or a command issued on this device
    Local,
    /// A snapshot, command or preference set received from the peer
    Peer,
}

/// Something observable happened on this device
#[derive(Debug, Clone, PartialEq)]
pub enum SyncEvent {
    /// The transport session activated
    SessionActivated { role: Role },
    /// The stored teams changed
    TeamsChanged { origin: ChangeOrigin },
    /// The stored intervals changed
    IntervalsChanged { origin: ChangeOrigin },
    /// The peer issued a command and it was applied here
    CommandReceived(Command),
    /// Preferences changed; carries the full current set
    PreferencesChanged {
        origin: ChangeOrigin,
        preferences: PreferenceSet,
    },
    /// The peer hinted that shared data changed elsewhere
    DataChanged,
    /// An outbound message was handed to the transport
    Delivered {
        kind: &'static str,
        outcome: DeliveryOutcome,
    },
    /// An inbound message was dropped
    MessageIgnored { reason: String },
}
