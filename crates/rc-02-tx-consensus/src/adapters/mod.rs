//! Trivial port implementations for nodes that do not wire a real one.

use crate::ports::{CommitHook, KnowledgeBase};
use async_trait::async_trait;
use rc_01_ledger::Block;
use shared_types::{CommittedTransaction, Transaction, VoteChoice};

/// Commit hook that does nothing.
pub struct NoopCommitHook;

#[async_trait]
impl CommitHook for NoopCommitHook {
    async fn on_commit(&self, _entry: &CommittedTransaction, _block: &Block) -> Result<(), String> {
        Ok(())
    }
}

/// Knowledge base with a fixed opinion on everything.
pub struct FixedOpinion(pub Option<VoteChoice>);

impl KnowledgeBase for FixedOpinion {
    fn opinion(&self, _transaction: &Transaction) -> Option<VoteChoice> {
        self.0
    }
}
