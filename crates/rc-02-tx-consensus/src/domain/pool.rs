//! # Vote Pool
//!
//! Pending trackers plus the set of transaction ids whose commit has been
//! claimed. The engine wraps one pool in a single mutex; every method here
//! is a short, I/O-free critical section.
//!
//! ## Commit exclusivity
//!
//! `claim` and `claim_expired` are the only ways a tracker leaves the pool.
//! Both remove the tracker and insert its id into `committed` in the same
//! call, so quorum and timeout can never both win.
//!
//! ## Retention
//!
//! Committed ids are kept with their claim instant and dropped by
//! `prune_committed` once older than the retention. A vote that late is
//! rejected as `UnknownTransaction` instead of `AlreadyCommitted`.

use super::{VoteRejection, VoteTracker};
use shared_types::{AsNumber, Transaction, Vote};
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;

/// Counts after a vote was recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoteTally {
    pub approve: usize,
    pub reject: usize,
    pub subject_asn: AsNumber,
}

#[derive(Debug)]
pub struct VotePool {
    pending: HashMap<String, VoteTracker>,
    committed: HashMap<String, Instant>,
    /// Lifetime claims; unaffected by pruning.
    claims: usize,
    total_validators: usize,
}

impl VotePool {
    pub fn new(total_validators: usize) -> Self {
        Self {
            pending: HashMap::new(),
            committed: HashMap::new(),
            claims: 0,
            total_validators,
        }
    }

    /// Start tracking a transaction. False if it is already pending or committed.
    pub fn register(&mut self, transaction: Transaction, now: Instant) -> bool {
        if self.committed.contains_key(&transaction.id) || self.pending.contains_key(&transaction.id) {
            return false;
        }
        self.pending
            .insert(transaction.id.clone(), VoteTracker::new(transaction, now));
        true
    }

    /// Record one vote. Checks run in a fixed order: committed, unknown,
    /// replay, overflow.
    pub fn record_vote(&mut self, vote: Vote) -> Result<VoteTally, VoteRejection> {
        if self.committed.contains_key(&vote.transaction_id) {
            return Err(VoteRejection::AlreadyCommitted);
        }
        let tracker = self
            .pending
            .get_mut(&vote.transaction_id)
            .ok_or(VoteRejection::UnknownTransaction)?;

        if tracker.has_voted(&vote.voter_id) {
            return Err(VoteRejection::Replay);
        }
        if tracker.vote_count() >= self.total_validators {
            return Err(VoteRejection::Overflow);
        }
        tracker.insert(vote);

        Ok(VoteTally {
            approve: tracker.approve_count(),
            reject: tracker.reject_count(),
            subject_asn: tracker.transaction().subject_asn,
        })
    }

    /// Atomic check-and-set: take the tracker out and mark it committed.
    /// `None` means someone else already claimed it.
    pub fn claim(&mut self, transaction_id: &str, now: Instant) -> Option<VoteTracker> {
        let tracker = self.pending.remove(transaction_id)?;
        self.committed.insert(transaction_id.to_string(), now);
        self.claims += 1;
        Some(tracker)
    }

    /// Claim every tracker whose age reached its class timeout.
    pub fn claim_expired(
        &mut self,
        now: Instant,
        regular: Duration,
        attack: Duration,
    ) -> Vec<VoteTracker> {
        let expired: Vec<String> = self
            .pending
            .iter()
            .filter(|(_, t)| t.is_expired(now, if t.is_attack() { attack } else { regular }))
            .map(|(id, _)| id.clone())
            .collect();

        let mut claimed: Vec<VoteTracker> =
            expired.iter().filter_map(|id| self.claim(id, now)).collect();
        claimed.sort_by_key(|t| t.created_at());
        claimed
    }

    pub fn get(&self, transaction_id: &str) -> Option<&VoteTracker> {
        self.pending.get(transaction_id)
    }

    /// Forget committed ids claimed at least `retention` ago.
    pub fn prune_committed(&mut self, now: Instant, retention: Duration) -> usize {
        let before = self.committed.len();
        self.committed
            .retain(|_, claimed_at| now.saturating_duration_since(*claimed_at) < retention);
        before - self.committed.len()
    }

    pub fn is_committed(&self, transaction_id: &str) -> bool {
        self.committed.contains_key(transaction_id)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn committed_count(&self) -> usize {
        self.claims
    }

    /// Committed ids still held for stale-vote detection.
    pub fn retained_commits(&self) -> usize {
        self.committed.len()
    }
}
