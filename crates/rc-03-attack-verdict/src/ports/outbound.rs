//! Driven ports (outbound dependencies).

use crate::domain::{AttackProposal, VerdictBallot, VerdictRecord, VerdictResult};
use async_trait::async_trait;
use shared_types::ValidatorId;

/// Delivery of proposals and verdict votes to one peer.
#[async_trait]
pub trait VerdictTransport: Send + Sync + 'static {
    async fn send_proposal(&self, peer: &ValidatorId, proposal: AttackProposal)
        -> Result<(), String>;

    async fn send_ballot(&self, peer: &ValidatorId, ballot: VerdictBallot) -> Result<(), String>;
}

/// Append-only audit log of executed verdicts.
pub trait VerdictLog: Send + Sync {
    fn append(&self, record: &VerdictRecord) -> VerdictResult<()>;

    /// Every record in append order.
    fn records(&self) -> VerdictResult<Vec<VerdictRecord>>;
}
