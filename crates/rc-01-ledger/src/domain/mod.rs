//! Domain layer for the ledger: pure hashing and chain logic, no I/O.

mod block;
mod chain;
mod config;
mod errors;
mod file;
mod integrity;

pub use block::*;
pub use chain::*;
pub use config::*;
pub use errors::*;
pub use file::*;
pub use integrity::*;
