//! ScoreLink Transport - Peer delivery
//!
//! Wraps the external peer-messaging service behind one delivery contract:
//! - Live message first, durable context as fallback
//! - Per-message-kind delivery policies
//! - An in-process paired transport for tests and simulation
//!
//! ## Modules
//!
//! - [`adapter`] - [`TransportAdapter`] and its [`DeliveryPolicy`] / [`DeliveryOutcome`]
//! - [`loopback`] - [`LoopbackTransport`], two connected in-process endpoints

pub mod adapter;
pub mod loopback;

pub use adapter::{DeliveryOutcome, DeliveryPolicy, TransportAdapter};
pub use loopback::LoopbackTransport;
