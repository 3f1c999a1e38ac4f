//! Port definitions (hexagonal architecture interfaces)
//!
//! This module defines the port traits that form the boundaries of the
//! sync core. Ports are interfaces that the core depends on, but whose
//! implementations live in adapter crates.
//!
//! ## Ports Overview
//!
//! - [`IRecordStore`] - Transactional store of teams and intervals
//! - [`IPeerTransport`] - Live and durable delivery to the paired device
//! - [`IPreferenceStore`] - Key-value storage of boolean preferences

pub mod peer_transport;
pub mod preference_store;
pub mod record_store;

pub use peer_transport::{IPeerTransport, TransportError, TransportEvent, TransportSink};
pub use preference_store::IPreferenceStore;
pub use record_store::{IRecordStore, IStoreTransaction};
