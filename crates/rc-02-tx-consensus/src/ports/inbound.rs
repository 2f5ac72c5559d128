//! Driving port (inbound API).

use crate::domain::{ConsensusResult, EngineStats};
use crate::service::{BroadcastReport, CommitReceipt, VoteOutcome};
use async_trait::async_trait;
use shared_types::{Transaction, Vote, VoteChoice};

/// Transaction consensus API, one instance per validator.
#[async_trait]
pub trait ConsensusApi: Send + Sync {
    /// Sign (if needed), register and fan out a locally observed transaction.
    async fn broadcast(&self, transaction: Transaction) -> ConsensusResult<BroadcastReport>;

    /// A peer's transaction: verify, consult the knowledge base, vote back.
    ///
    /// Returns the choice sent to the observer, or `None` when this node
    /// stayed silent.
    async fn handle_incoming_transaction(
        &self,
        transaction: Transaction,
    ) -> ConsensusResult<Option<VoteChoice>>;

    /// A peer's vote on one of this node's pending transactions.
    ///
    /// # Errors
    ///
    /// Only a failed ledger append. Rejected votes are `VoteOutcome::Rejected`.
    async fn handle_incoming_vote(&self, vote: Vote) -> ConsensusResult<VoteOutcome>;

    /// Commit every tracker whose class timeout elapsed.
    async fn timeout_sweep(&self) -> ConsensusResult<Vec<CommitReceipt>>;

    fn stats(&self) -> EngineStats;
}
