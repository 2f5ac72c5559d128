use crate::domain::{
    AttackProposal, VerdictBallot, VerdictChoice, VerdictRecord, VerdictResult, VerdictVoteOutcome,
};
use async_trait::async_trait;
use shared_types::{AttackFinding, Transaction, ValidatorId};

/// Attack verdict sub-consensus, one instance per validator.
#[async_trait]
pub trait AttackVerdictApi: Send + Sync {
    /// Open a proposal for a committed transaction and send it to every peer.
    ///
    /// `None` when this node already proposed for the transaction.
    async fn propose_attack(
        &self,
        transaction: &Transaction,
        attack: AttackFinding,
    ) -> VerdictResult<Option<AttackProposal>>;

    /// Register a peer's proposal, run the local detector and vote.
    async fn handle_incoming_proposal(
        &self,
        proposal: AttackProposal,
    ) -> VerdictResult<Option<VerdictChoice>>;

    /// A peer's verdict vote. Returns the executed verdict if this vote completed it.
    async fn handle_incoming_ballot(
        &self,
        ballot: VerdictBallot,
    ) -> VerdictResult<Option<VerdictRecord>>;

    /// Record one vote. Duplicates are an idempotent no-op.
    fn cast_vote(
        &self,
        proposal_id: &str,
        voter: &ValidatorId,
        choice: VerdictChoice,
        confidence: f64,
    ) -> VerdictVoteOutcome;

    /// Execute the verdict once enough votes exist. Idempotent after execution.
    async fn check_consensus(&self, proposal_id: &str) -> VerdictResult<Option<VerdictRecord>>;
}
