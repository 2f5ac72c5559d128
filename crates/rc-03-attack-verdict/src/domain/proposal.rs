//! # Attack Proposals
//!
//! A proposal asks the validator set whether a committed transaction is a
//! real attack. Votes are keyed by voter, and a proposal moves from
//! `Voting` to `Executed` exactly once.

use super::{tally, VerdictOutcome};
use serde::{Deserialize, Serialize};
use shared_types::{unix_millis, AsNumber, AttackFinding, Observation, Transaction, ValidatorId};
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProposalStatus {
    Voting,
    Executed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerdictChoice {
    Yes,
    No,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerdictVote {
    pub voter_id: ValidatorId,
    pub choice: VerdictChoice,
    /// In `[0, 1]`.
    pub confidence: f64,
    pub timestamp: u64,
}

/// A verdict vote in flight between validators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerdictBallot {
    pub proposal_id: String,
    pub voter_id: ValidatorId,
    pub choice: VerdictChoice,
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttackProposal {
    pub proposal_id: String,
    pub proposer_id: ValidatorId,
    /// Back-reference to the committed transaction.
    pub transaction_id: String,
    pub subject_asn: AsNumber,
    pub attack: AttackFinding,
    /// The announcement peers re-run their own detector against.
    pub observation: Observation,
    pub status: ProposalStatus,
    pub votes: BTreeMap<ValidatorId, VerdictVote>,
    pub created_at: u64,
}

impl AttackProposal {
    /// New proposal carrying the proposer's own YES vote (confidence 1.0).
    pub fn new(proposer: ValidatorId, transaction: &Transaction, attack: AttackFinding) -> Self {
        let now = unix_millis();
        let mut votes = BTreeMap::new();
        votes.insert(
            proposer.clone(),
            VerdictVote {
                voter_id: proposer.clone(),
                choice: VerdictChoice::Yes,
                confidence: 1.0,
                timestamp: now,
            },
        );
        Self {
            proposal_id: uuid::Uuid::new_v4().to_string(),
            proposer_id: proposer,
            transaction_id: transaction.id.clone(),
            subject_asn: transaction.subject_asn,
            attack,
            observation: transaction.observation(),
            status: ProposalStatus::Voting,
            votes,
            created_at: now,
        }
    }

    pub fn is_voting(&self) -> bool {
        self.status == ProposalStatus::Voting
    }

    pub fn total_votes(&self) -> usize {
        self.votes.len()
    }

    pub fn count(&self, choice: VerdictChoice) -> usize {
        self.votes.values().filter(|v| v.choice == choice).count()
    }

    pub fn voters(&self, choice: VerdictChoice) -> Vec<ValidatorId> {
        self.votes
            .values()
            .filter(|v| v.choice == choice)
            .map(|v| v.voter_id.clone())
            .collect()
    }

    pub fn outcome(&self) -> VerdictOutcome {
        tally(self.count(VerdictChoice::Yes), self.count(VerdictChoice::No))
    }
}

/// Result of offering one vote to a proposal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerdictVoteOutcome {
    Recorded { total_votes: usize },
    /// The voter already voted; idempotent no-op.
    Duplicate,
    /// The proposal already executed; vote ignored.
    Closed,
    UnknownProposal,
    UnknownVoter,
}

/// Ballots held for proposals not yet seen, capped per node.
const MAX_PARKED_PROPOSALS: usize = 1024;

/// Early ballots for one unseen proposal, at most one per voter.
#[derive(Debug)]
struct Parked {
    since: Instant,
    ballots: BTreeMap<ValidatorId, VerdictBallot>,
}

/// What one `expire` pass dropped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BookExpiry {
    pub proposals: usize,
    pub ballots: usize,
}

/// Proposals known to one node, plus the per-transaction dedup index.
///
/// Executed proposals and parked ballots are dropped by `expire` once older
/// than the retention; proposals still voting are kept.
#[derive(Debug, Default)]
pub struct ProposalBook {
    proposals: HashMap<String, AttackProposal>,
    by_transaction: HashMap<String, String>,
    executed_at: HashMap<String, Instant>,
    parked: HashMap<String, Parked>,
}

impl ProposalBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a proposal. False if its id or its transaction is already known.
    pub fn insert(&mut self, proposal: AttackProposal) -> bool {
        if self.proposals.contains_key(&proposal.proposal_id)
            || self.by_transaction.contains_key(&proposal.transaction_id)
        {
            return false;
        }
        let proposal_id = proposal.proposal_id.clone();
        self.by_transaction
            .insert(proposal.transaction_id.clone(), proposal_id.clone());
        self.proposals.insert(proposal_id.clone(), proposal);

        if let Some(parked) = self.parked.remove(&proposal_id) {
            for ballot in parked.ballots.into_values() {
                self.cast_vote(&proposal_id, &ballot.voter_id, ballot.choice, ballot.confidence);
            }
        }
        true
    }

    /// Hold a ballot that arrived before its proposal. It is applied when
    /// the proposal is inserted. A voter's later ballot for the same
    /// proposal is ignored. False when the park is full.
    pub fn park(&mut self, ballot: VerdictBallot, now: Instant) -> bool {
        if !self.parked.contains_key(&ballot.proposal_id)
            && self.parked.len() >= MAX_PARKED_PROPOSALS
        {
            return false;
        }
        self.parked
            .entry(ballot.proposal_id.clone())
            .or_insert_with(|| Parked {
                since: now,
                ballots: BTreeMap::new(),
            })
            .ballots
            .entry(ballot.voter_id.clone())
            .or_insert(ballot);
        true
    }

    pub fn parked_count(&self) -> usize {
        self.parked.values().map(|p| p.ballots.len()).sum()
    }

    /// Drop executed proposals and parked ballots at least `retention` old.
    pub fn expire(&mut self, now: Instant, retention: Duration) -> BookExpiry {
        let stale: Vec<String> = self
            .executed_at
            .iter()
            .filter(|(_, at)| now.saturating_duration_since(**at) >= retention)
            .map(|(id, _)| id.clone())
            .collect();
        for proposal_id in &stale {
            self.executed_at.remove(proposal_id);
            if let Some(proposal) = self.proposals.remove(proposal_id) {
                self.by_transaction.remove(&proposal.transaction_id);
            }
        }

        let parked_before = self.parked_count();
        self.parked
            .retain(|_, parked| now.saturating_duration_since(parked.since) < retention);

        BookExpiry {
            proposals: stale.len(),
            ballots: parked_before - self.parked_count(),
        }
    }

    pub fn get(&self, proposal_id: &str) -> Option<&AttackProposal> {
        self.proposals.get(proposal_id)
    }

    pub fn for_transaction(&self, transaction_id: &str) -> Option<&AttackProposal> {
        self.by_transaction
            .get(transaction_id)
            .and_then(|id| self.proposals.get(id))
    }

    pub fn cast_vote(
        &mut self,
        proposal_id: &str,
        voter: &ValidatorId,
        choice: VerdictChoice,
        confidence: f64,
    ) -> VerdictVoteOutcome {
        let Some(proposal) = self.proposals.get_mut(proposal_id) else {
            return VerdictVoteOutcome::UnknownProposal;
        };
        if proposal.votes.contains_key(voter) {
            return VerdictVoteOutcome::Duplicate;
        }
        if !proposal.is_voting() {
            return VerdictVoteOutcome::Closed;
        }
        proposal.votes.insert(
            voter.clone(),
            VerdictVote {
                voter_id: voter.clone(),
                choice,
                confidence: if confidence.is_finite() {
                    confidence.clamp(0.0, 1.0)
                } else {
                    0.0
                },
                timestamp: unix_millis(),
            },
        );
        VerdictVoteOutcome::Recorded {
            total_votes: proposal.votes.len(),
        }
    }

    /// Check-and-set `Voting -> Executed` once `min_votes` is reached.
    /// Returns the proposal as it stood at execution.
    pub fn try_execute(
        &mut self,
        proposal_id: &str,
        min_votes: usize,
        now: Instant,
    ) -> Option<AttackProposal> {
        let proposal = self.proposals.get_mut(proposal_id)?;
        if !proposal.is_voting() || proposal.total_votes() < min_votes {
            return None;
        }
        proposal.status = ProposalStatus::Executed;
        self.executed_at.insert(proposal_id.to_string(), now);
        Some(proposal.clone())
    }

    pub fn len(&self) -> usize {
        self.proposals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.proposals.is_empty()
    }

    pub fn voting_count(&self) -> usize {
        self.proposals.values().filter(|p| p.is_voting()).count()
    }
}
