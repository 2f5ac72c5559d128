//! # Handlers
//!
//! Long-running tasks spawned per validator.

pub mod dispatch;
pub mod maintenance;

pub use dispatch::{PeerMessageHandler, DRAIN_TIMEOUT};
pub use maintenance::MaintenanceHandler;
