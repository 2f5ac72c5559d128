//! # Node Runtime Library
//!
//! Runs a roster of RPKI validators in one process. Every validator owns a
//! transaction consensus engine (rc-02) and an attack verdict instance (rc-03);
//! they share a replicated hash-chained ledger (rc-01).
//!
//! The main entry point is the `main.rs` binary. Tests drive
//! [`ValidatorCluster`] directly.
//!
//! ## Modules
//!
//! - `adapters/` - collaborators: detector, RPKI table, signer, rewards, ratings
//! - `container/` - configuration, validator nodes and the cluster
//! - `handlers/` - per-validator peer dispatch and maintenance loops
//! - `wiring/` - the in-process peer network

#![allow(clippy::type_complexity)]

pub mod adapters;
pub mod container;
pub mod errors;
pub mod handlers;
pub mod wiring;

pub use container::{
    ConfigError, NodeConfig, ObservationRecord, ReplaySummary, ShutdownReport, ValidatorCluster,
    ValidatorNode,
};
pub use errors::{NodeError, NodeResult};
pub use wiring::{InMemoryNetwork, PeerMessage};
