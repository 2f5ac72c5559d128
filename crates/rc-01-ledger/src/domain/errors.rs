//! # Ledger Errors
//!
//! Every variant here is an internal invariant violation or an I/O failure:
//! callers propagate them instead of continuing with a suspect chain.

use std::fmt;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("Hash computation failed: {0}")]
    Hashing(#[from] serde_json::Error),

    #[error("Ledger has no genesis block")]
    MissingGenesis,

    #[error("Ledger I/O error at {path:?}: {message}")]
    Io { path: PathBuf, message: String },

    #[error("Ledger file {path:?} is malformed: {message}")]
    Malformed { path: PathBuf, message: String },

    #[error("Ledger file {path:?} failed integrity verification with {errors} error(s)")]
    CorruptChain { path: PathBuf, errors: usize },

    #[error("Ledger file {path:?} belongs to network {found}, expected {expected}")]
    NetworkMismatch {
        path: PathBuf,
        found: String,
        expected: String,
    },

    #[error("Ledger {path:?} is already in use by another process")]
    Locked { path: PathBuf },
}

pub type LedgerResult<T> = Result<T, LedgerError>;

/// Why a replica refused a block. Replicas never mutate on rejection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplicaRejection {
    /// Recomputed hash differs from the block's stated hash.
    HashMismatch { stated: String, computed: String },
    /// Recomputed Merkle root differs from the stated one.
    MerkleMismatch { stated: String, computed: String },
    /// `previousHash` does not point at the replica's tip.
    LinkageMismatch { expected: String, actual: String },
    /// Block number is not tip + 1.
    OutOfSequence { expected: u64, actual: u64 },
    /// The block could not be re-hashed at all.
    Unhashable(String),
    /// Replica was never seeded with a genesis block.
    MissingGenesis,
}

impl fmt::Display for ReplicaRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HashMismatch { stated, computed } => {
                write!(f, "hash mismatch: stated {}, computed {}", short(stated), short(computed))
            }
            Self::MerkleMismatch { stated, computed } => write!(
                f,
                "merkle root mismatch: stated {}, computed {}",
                short(stated),
                short(computed)
            ),
            Self::LinkageMismatch { expected, actual } => write!(
                f,
                "previous hash {} does not match tip {}",
                short(actual),
                short(expected)
            ),
            Self::OutOfSequence { expected, actual } => {
                write!(f, "block number {} out of sequence, expected {}", actual, expected)
            }
            Self::Unhashable(reason) => write!(f, "block could not be hashed: {}", reason),
            Self::MissingGenesis => write!(f, "replica has no genesis block"),
        }
    }
}

/// First 12 hex characters, for log lines.
pub(crate) fn short(hash: &str) -> &str {
    hash.get(..12).unwrap_or(hash)
}
