//! Error types for the transaction consensus engine.
//!
//! Only failures that leave the node in doubt are errors. Expected vote
//! races are values (`VoteRejection`), not `Err`.

use rc_01_ledger::LedgerError;
use shared_types::{EntityError, ValidatorId};
use std::fmt;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum ConsensusError {
    /// The canonical ledger refused a claimed transaction. Never retried.
    #[error("Ledger append failed for transaction {transaction_id}: {source}")]
    Ledger {
        transaction_id: String,
        #[source]
        source: LedgerError,
    },

    #[error("Transaction could not be canonicalized: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Entity(#[from] EntityError),

    #[error("Transaction {0} is already pending")]
    DuplicateTransaction(String),

    #[error("Transaction {0} was already committed")]
    AlreadyCommitted(String),

    #[error("Transaction {id} was observed by {observer}, not by this node")]
    ForeignTransaction { id: String, observer: ValidatorId },

    #[error(transparent)]
    Config(#[from] ConfigError),
}

pub type ConsensusResult<T> = Result<T, ConsensusError>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("Validator set is empty")]
    NoValidators,

    #[error("Quorum threshold {threshold} exceeds validator count {total}")]
    ThresholdExceedsValidators { threshold: usize, total: usize },

    #[error("Quorum threshold must be at least 1")]
    ZeroThreshold,

    #[error("Attack timeout {attack:?} must be longer than regular timeout {regular:?}")]
    TimeoutOrdering { regular: Duration, attack: Duration },

    #[error("Roster has {roster} validators but configuration says {configured}")]
    RosterMismatch { roster: usize, configured: usize },

    #[error("Local validator {0} is not in the roster")]
    NotInRoster(ValidatorId),
}

/// Why a vote was not recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VoteRejection {
    /// No pending tracker for the transaction. Benign race.
    UnknownTransaction,
    /// Vote arrived after the commit was claimed. Benign race.
    AlreadyCommitted,
    /// Same voter already voted on this transaction.
    Replay,
    /// Recording the vote would exceed the validator count.
    Overflow,
    /// Voter is not part of the validator set.
    UnknownVoter,
}

impl VoteRejection {
    /// Replays, overflows and unknown voters point at a hostile peer or a
    /// local bug and are logged loudly.
    pub fn is_security_relevant(&self) -> bool {
        matches!(self, Self::Replay | Self::Overflow | Self::UnknownVoter)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UnknownTransaction => "unknown_transaction",
            Self::AlreadyCommitted => "already_committed",
            Self::Replay => "replay",
            Self::Overflow => "overflow",
            Self::UnknownVoter => "unknown_voter",
        }
    }
}

impl fmt::Display for VoteRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
