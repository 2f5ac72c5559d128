use shared_types::{Transaction, ValidatorId, Vote};
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;

/// Bookkeeping for one pending transaction.
///
/// Votes are keyed by voter, so a second vote from the same validator can
/// never be stored.
#[derive(Debug, Clone)]
pub struct VoteTracker {
    transaction: Transaction,
    votes: HashMap<ValidatorId, Vote>,
    created_at: Instant,
    is_attack: bool,
}

impl VoteTracker {
    pub fn new(transaction: Transaction, created_at: Instant) -> Self {
        let is_attack = transaction.is_attack;
        Self {
            transaction,
            votes: HashMap::new(),
            created_at,
            is_attack,
        }
    }

    pub fn transaction(&self) -> &Transaction {
        &self.transaction
    }

    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    pub fn is_attack(&self) -> bool {
        self.is_attack
    }

    pub fn has_voted(&self, voter: &ValidatorId) -> bool {
        self.votes.contains_key(voter)
    }

    pub fn vote_count(&self) -> usize {
        self.votes.len()
    }

    pub fn approve_count(&self) -> usize {
        self.votes.values().filter(|v| v.is_approve()).count()
    }

    pub fn reject_count(&self) -> usize {
        self.votes.len() - self.approve_count()
    }

    /// Store a vote from a voter not seen before. Returns false otherwise.
    pub(crate) fn insert(&mut self, vote: Vote) -> bool {
        if self.votes.contains_key(&vote.voter_id) {
            return false;
        }
        self.votes.insert(vote.voter_id.clone(), vote);
        true
    }

    pub fn is_expired(&self, now: Instant, timeout: Duration) -> bool {
        now.saturating_duration_since(self.created_at) >= timeout
    }

    /// Votes ordered by `(timestamp, voter)`, the order written to the ledger.
    pub fn into_parts(self) -> (Transaction, Vec<Vote>) {
        let mut votes: Vec<Vote> = self.votes.into_values().collect();
        votes.sort_by(|a, b| {
            a.timestamp
                .cmp(&b.timestamp)
                .then_with(|| a.voter_id.cmp(&b.voter_id))
        });
        (self.transaction, votes)
    }
}
