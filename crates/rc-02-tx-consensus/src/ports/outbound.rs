//! Driven ports (outbound dependencies).

use async_trait::async_trait;
use rc_01_ledger::Block;
use shared_types::{CommittedTransaction, Transaction, ValidatorId, Vote, VoteChoice};

/// Point-to-point delivery to one peer validator.
///
/// Each call is bounded by the engine's `peer_send_timeout`; a failure to
/// one peer never stops delivery to the others.
#[async_trait]
pub trait PeerTransport: Send + Sync + 'static {
    async fn send_transaction(&self, peer: &ValidatorId, transaction: Transaction)
        -> Result<(), String>;

    async fn send_vote(&self, peer: &ValidatorId, vote: Vote) -> Result<(), String>;
}

/// The local validator's own view of the routing table.
pub trait KnowledgeBase: Send + Sync {
    /// `None` means no opinion: the node stays silent instead of voting.
    fn opinion(&self, transaction: &Transaction) -> Option<VoteChoice>;
}

/// Post-commit trigger (attack detection on the committed payload).
///
/// Runs after the ledger append and reward callbacks. Failures are logged
/// and never undo the commit.
#[async_trait]
pub trait CommitHook: Send + Sync {
    async fn on_commit(&self, entry: &CommittedTransaction, block: &Block) -> Result<(), String>;
}
