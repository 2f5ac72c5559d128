//! Domain layer for transaction consensus.
//!
//! Pure state: no I/O, no async. The service drives it.

pub mod config;
pub mod errors;
pub mod pool;
pub mod relevance;
pub mod sampling;
pub mod stats;
pub mod tracker;

pub use config::*;
pub use errors::*;
pub use pool::*;
pub use relevance::*;
pub use sampling::*;
pub use stats::*;
pub use tracker::*;
