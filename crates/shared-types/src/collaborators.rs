//! # Collaborator Ports
//!
//! Boundaries to the systems the consensus machinery coordinates but does
//! not own: the token ledger, the AS rating store, the attack detector,
//! RPKI validation and signing.
//!
//! Fallible collaborators return `Result<_, String>`. Callers log the error
//! and carry on; a collaborator failure never undoes a ledger commit.

use crate::entities::{AsNumber, AttackFinding, Observation, RpkiValidation, Signature, ValidatorId};

/// Token-economy callbacks.
pub trait RewardLedger: Send + Sync {
    /// Reward a committed block: the committer plus every approving voter.
    fn award_block_commit(
        &self,
        committer: &ValidatorId,
        voters: &[ValidatorId],
        is_first: bool,
    ) -> Result<(), String>;

    fn award_special_reward(
        &self,
        recipient: &ValidatorId,
        amount: f64,
        reason: &str,
    ) -> Result<(), String>;

    fn apply_penalty(&self, offender: &ValidatorId, amount: f64, reason: &str)
        -> Result<(), String>;
}

/// Reputation callbacks for non-validator ASes.
pub trait RatingStore: Send + Sync {
    fn record_attack(&self, subject: AsNumber, attack_type: &str, details: &str)
        -> Result<(), String>;

    fn record_good_behavior(&self, subject: AsNumber, kind: &str) -> Result<(), String>;
}

/// Black-box attack heuristics. Must be free of side effects.
pub trait AttackDetector: Send + Sync {
    fn detect(&self, observation: &Observation) -> Result<Vec<AttackFinding>, String>;
}

/// RPKI/ROA validation. Audit metadata only; never gates consensus.
pub trait RpkiValidator: Send + Sync {
    fn validate(&self, observation: &Observation) -> RpkiValidation;
}

/// Opaque signing primitive bound to the local validator identity.
pub trait TransactionSigner: Send + Sync {
    fn sign(&self, payload: &[u8]) -> Signature;

    /// Verify `signature` over `payload` against the signer's known key.
    fn verify(&self, payload: &[u8], signature: &Signature) -> bool;
}
