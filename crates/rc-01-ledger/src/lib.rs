//! # Ledger (rc-01)
//!
//! Append-only, hash-linked chain of blocks holding committed BGP
//! observation transactions.
//!
//! ## Domain Invariants
//!
//! | Invariant | Description |
//! |-----------|-------------|
//! | Self hash | `blockHash = SHA256(canonical(blockNumber, timestamp, previousHash, transactions, merkleRoot))` |
//! | Merkle root | `SHA256(H(tx_1) ‖ H(tx_2) ‖ …)` in list order; empty list gives the zero sentinel |
//! | Linkage | `block[i].previousHash == block[i-1].blockHash` for `i > 0` |
//! | Genesis | Block 0 has the zero sentinel as `previousHash` and no transactions |
//! | Fail closed | Replicas recompute every hash before accepting a block |
//!
//! ## Crate Structure
//!
//! - `domain/` - Block hashing, the shared `Chain` base, integrity reports
//! - `ports/` - The `Ledger` trait
//! - `adapters/` - `MemoryLedger`, `DiskLedger`, process lock
//! - `service/` - `ReplicaSet` and `ReplicatedLedger` (canonical + replicas)
//!
//! ## Usage
//!
//! ```ignore
//! let genesis = Block::genesis(unix_millis())?;
//! let canonical = Arc::new(MemoryLedger::new(genesis.clone()));
//! let replicas = Arc::new(ReplicaSet::new(&genesis, validators));
//! let ledger = ReplicatedLedger::new(canonical, replicas);
//! let block = ledger.append_transaction(entry)?;
//! ```

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

pub use adapters::{open_ledger, DiskLedger, LedgerLock, MemoryLedger};
pub use domain::{
    merkle_root, Block, BlockMetadata, BlockType, Chain, IntegrityReport, IntegrityViolation,
    LedgerConfig, LedgerError, LedgerFile, LedgerMetadata, LedgerResult, ReplicaRejection, LEDGER_FORMAT_VERSION,
};
pub use ports::Ledger;
pub use service::{ReplicaSet, ReplicatedLedger, ReplicationReport};

#[cfg(test)]
pub(crate) mod test_utils;
