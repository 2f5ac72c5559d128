//! # Validator Container
//!
//! Owns every validator in the roster plus the state they share:
//! the replicated ledger, the reward ledger and the AS rating store.
//!
//! - `config` - roster, timeouts, storage location, secrets
//! - `node` - one validator identity and its engines
//! - `cluster` - builds nodes in dependency order and runs their loops

pub mod cluster;
pub mod config;
pub mod node;

pub use cluster::{ObservationRecord, ReplaySummary, ShutdownReport, ValidatorCluster};
pub use config::{default_roster, ConfigError, NodeConfig, LEDGER_FILE, VERDICT_DIR};
pub use node::{Engine, ValidatorNode, Verdicts};
