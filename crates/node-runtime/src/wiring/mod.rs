//! # Wiring
//!
//! Message plumbing between validators in one process.

pub mod network;

pub use network::{InMemoryNetwork, Inbox, PeerMessage};
