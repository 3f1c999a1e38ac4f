//! ScoreLink Core - Domain logic, ports and wire model
//!
//! This crate contains the hexagonal architecture core with:
//! - **Domain entities** - `Team`, `ScoreEvent`, `Interval`, `PreferenceSet`, `Command`
//! - **Port definitions** - Traits for adapters: `IRecordStore`, `IPeerTransport`, `IPreferenceStore`
//! - **Wire model** - `SyncPayload` and the typed `WireMessage` codec
//! - **Configuration** - YAML configuration with validation
//!
//! # Architecture
//!
//! The domain module contains pure scoreboard logic with no I/O.
//! Ports define trait interfaces that adapter crates implement.
//! The wire module converts between store records and the flat maps the
//! peer transport carries.

pub mod config;
pub mod domain;
pub mod ports;
pub mod wire;
