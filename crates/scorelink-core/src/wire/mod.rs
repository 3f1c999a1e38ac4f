//! Wire model
//!
//! Lossless conversion between store records and the flat, transport-safe
//! message shapes exchanged with the peer.
//!
//! - [`payload`] - [`SyncPayload`] and its record types, built from the store
//! - [`codec`] - [`WireMessage`] encode/decode with [`DecodeError`]

pub mod codec;
pub mod payload;

pub use codec::{DecodeError, WireMessage};
pub use payload::{to_payload, IntervalData, SyncPayload, TeamData};

/// The transport's native payload shape: a string-keyed map of
/// primitives, arrays and nested maps
pub type WireMap = serde_json::Map<String, serde_json::Value>;
