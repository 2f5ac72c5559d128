//! Domain layer for attack verdicts: proposals, tallying, log records.

pub mod config;
pub mod errors;
pub mod proposal;
pub mod verdict;

pub use config::*;
pub use errors::*;
pub use proposal::*;
pub use verdict::*;
