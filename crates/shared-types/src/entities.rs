//! # Core Domain Entities
//!
//! ## Clusters
//!
//! - **Observation feed**: `Observation`, `AttackFinding`, `RpkiValidation`
//! - **Consensus**: `Transaction`, `TransactionPayload`, `Signature`, `Vote`
//! - **Ledger**: `CommittedTransaction`, `ConsensusStatus`

use crate::canonical::canonical_bytes;
use crate::errors::EntityError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

// =============================================================================
// CLUSTER A: IDENTITIES
// =============================================================================

/// Autonomous System number of an observed (non-validator) network.
pub type AsNumber = u32;

/// Identity of an RPKI validator node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValidatorId(String);

impl ValidatorId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for ValidatorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ValidatorId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Wall-clock unix time in milliseconds.
pub fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

// =============================================================================
// CLUSTER B: OBSERVATION FEED
// =============================================================================

/// One BGP announcement as seen by a validator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Observation {
    /// AS whose announcement is being judged.
    pub subject_asn: AsNumber,
    pub prefix: String,
    #[serde(default)]
    pub as_path: Vec<AsNumber>,
    /// Unix seconds of the announcement.
    pub timestamp: u64,
    #[serde(default)]
    pub is_attack: bool,
    #[serde(default)]
    pub label: String,
}

impl Observation {
    /// Origin AS: the last hop of the path, or the subject when the path is empty.
    pub fn origin_asn(&self) -> AsNumber {
        self.as_path.last().copied().unwrap_or(self.subject_asn)
    }

    /// Normalized prefix used as a cache and knowledge-base key.
    pub fn prefix_key(&self) -> String {
        normalize_prefix(&self.prefix)
    }
}

pub fn normalize_prefix(prefix: &str) -> String {
    prefix.trim().to_ascii_lowercase()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

/// Output of the attack detector for one observation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttackFinding {
    pub attack_type: String,
    pub severity: Severity,
    pub details: String,
}

/// Result of RPKI/ROA validation, attached to transactions for audit only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpkiValidation {
    pub valid: bool,
    pub status: String,
}

// =============================================================================
// CLUSTER C: CONSENSUS
// =============================================================================

/// Signature bytes plus the identity that produced them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    pub signer: ValidatorId,
    #[serde(with = "hex::serde")]
    pub bytes: Vec<u8>,
}

/// Observation claim carried by a transaction. Opaque to the consensus engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionPayload {
    pub prefix: String,
    pub as_path: Vec<AsNumber>,
    /// Unix seconds of the underlying announcement.
    pub timestamp: u64,
    pub is_attack: bool,
    pub label: String,
    #[serde(default)]
    pub detected_attacks: Vec<AttackFinding>,
    #[serde(default)]
    pub rpki: Option<RpkiValidation>,
}

/// An observation submitted for consensus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,
    pub observer_id: ValidatorId,
    pub subject_asn: AsNumber,
    pub payload: TransactionPayload,
    /// Unix milliseconds at creation.
    pub created_at: u64,
    pub is_attack: bool,
    #[serde(default)]
    pub signature: Option<Signature>,
}

/// Fields covered by a transaction signature (everything but the signature).
#[derive(Serialize)]
struct SigningView<'a> {
    id: &'a str,
    observer_id: &'a ValidatorId,
    subject_asn: AsNumber,
    payload: &'a TransactionPayload,
    created_at: u64,
    is_attack: bool,
}

impl Transaction {
    /// Build a transaction from an observation.
    ///
    /// `is_attack` is set when the feed flagged the observation or the
    /// detector produced at least one finding.
    pub fn new(
        observer_id: ValidatorId,
        observation: &Observation,
        detected_attacks: Vec<AttackFinding>,
        rpki: Option<RpkiValidation>,
    ) -> Result<Self, EntityError> {
        if observer_id.is_empty() {
            return Err(EntityError::EmptyObserver);
        }
        if observation.prefix.trim().is_empty() {
            return Err(EntityError::EmptyPrefix);
        }
        if observation.subject_asn == 0 {
            return Err(EntityError::ReservedAsn);
        }

        let is_attack = observation.is_attack || !detected_attacks.is_empty();
        Ok(Self {
            id: uuid::Uuid::new_v4().to_string(),
            observer_id,
            subject_asn: observation.subject_asn,
            payload: TransactionPayload {
                prefix: observation.prefix.clone(),
                as_path: observation.as_path.clone(),
                timestamp: observation.timestamp,
                is_attack,
                label: observation.label.clone(),
                detected_attacks,
                rpki,
            },
            created_at: unix_millis(),
            is_attack,
            signature: None,
        })
    }

    /// Canonical bytes covered by the signature.
    pub fn signing_payload(&self) -> Result<Vec<u8>, serde_json::Error> {
        canonical_bytes(&SigningView {
            id: &self.id,
            observer_id: &self.observer_id,
            subject_asn: self.subject_asn,
            payload: &self.payload,
            created_at: self.created_at,
            is_attack: self.is_attack,
        })
    }

    pub fn with_signature(mut self, signature: Signature) -> Self {
        self.signature = Some(signature);
        self
    }

    pub fn prefix_key(&self) -> String {
        normalize_prefix(&self.payload.prefix)
    }

    /// Rebuild the observation this transaction claims.
    pub fn observation(&self) -> Observation {
        Observation {
            subject_asn: self.subject_asn,
            prefix: self.payload.prefix.clone(),
            as_path: self.payload.as_path.clone(),
            timestamp: self.payload.timestamp,
            is_attack: self.payload.is_attack,
            label: self.payload.label.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteChoice {
    Approve,
    Reject,
}

/// One validator's opinion on a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
    pub transaction_id: String,
    pub voter_id: ValidatorId,
    pub choice: VoteChoice,
    /// Unix milliseconds when the vote was cast.
    pub timestamp: u64,
}

impl Vote {
    pub fn new(
        transaction_id: impl Into<String>,
        voter_id: ValidatorId,
        choice: VoteChoice,
    ) -> Result<Self, EntityError> {
        let transaction_id = transaction_id.into();
        if transaction_id.is_empty() {
            return Err(EntityError::EmptyTransactionId);
        }
        if voter_id.is_empty() {
            return Err(EntityError::EmptyVoter);
        }
        Ok(Self {
            transaction_id,
            voter_id,
            choice,
            timestamp: unix_millis(),
        })
    }

    pub fn is_approve(&self) -> bool {
        self.choice == VoteChoice::Approve
    }
}

// =============================================================================
// CLUSTER D: LEDGER ENTRIES
// =============================================================================

/// How a transaction reached the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConsensusStatus {
    /// Approve count reached the quorum threshold.
    Confirmed,
    /// Timed out with at least one but fewer than quorum approvals.
    InsufficientConsensus,
    /// Timed out with zero approvals.
    SingleWitness,
}

impl ConsensusStatus {
    pub fn classify(approve_count: usize, threshold: usize) -> Self {
        if approve_count >= threshold {
            Self::Confirmed
        } else if approve_count > 0 {
            Self::InsufficientConsensus
        } else {
            Self::SingleWitness
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Confirmed => "CONFIRMED",
            Self::InsufficientConsensus => "INSUFFICIENT_CONSENSUS",
            Self::SingleWitness => "SINGLE_WITNESS",
        }
    }
}

impl fmt::Display for ConsensusStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A transaction as written into a block, with the votes that carried it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommittedTransaction {
    pub transaction: Transaction,
    pub consensus_status: ConsensusStatus,
    pub approve_count: usize,
    pub reject_count: usize,
    /// Votes held when the commit was claimed, ordered by (timestamp, voter).
    pub signatures: Vec<Vote>,
    pub committed_by: ValidatorId,
    /// Unix milliseconds of the commit.
    pub committed_at: u64,
}

impl CommittedTransaction {
    pub fn approving_voters(&self) -> Vec<ValidatorId> {
        self.signatures
            .iter()
            .filter(|v| v.is_approve())
            .map(|v| v.voter_id.clone())
            .collect()
    }
}
