use super::VoteRejection;
use serde::Serialize;
use shared_types::{ConsensusStatus, ValidatorId};
use std::collections::BTreeMap;

/// Outcome counters for sends to one peer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PeerDeliveryStats {
    pub sent: u64,
    pub failed: u64,
    pub timed_out: u64,
}

/// Read-only snapshot for health polling.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EngineStats {
    pub pending: usize,
    pub committed: usize,
    pub confirmed: u64,
    pub insufficient_consensus: u64,
    pub single_witness: u64,
    pub stale_votes: u64,
    pub replay_rejections: u64,
    pub overflow_rejections: u64,
    pub unknown_voter_rejections: u64,
    pub ledger_failures: u64,
    pub peers: BTreeMap<ValidatorId, PeerDeliveryStats>,
}

/// Mutable counters behind the engine's stats lock.
#[derive(Debug, Default)]
pub(crate) struct StatsCounters {
    pub confirmed: u64,
    pub insufficient_consensus: u64,
    pub single_witness: u64,
    pub stale_votes: u64,
    pub replay_rejections: u64,
    pub overflow_rejections: u64,
    pub unknown_voter_rejections: u64,
    pub ledger_failures: u64,
    pub peers: BTreeMap<ValidatorId, PeerDeliveryStats>,
}

/// Result of one peer send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Sent,
    Failed,
    TimedOut,
}

impl StatsCounters {
    pub fn record_commit(&mut self, status: ConsensusStatus) {
        match status {
            ConsensusStatus::Confirmed => self.confirmed += 1,
            ConsensusStatus::InsufficientConsensus => self.insufficient_consensus += 1,
            ConsensusStatus::SingleWitness => self.single_witness += 1,
        }
    }

    pub fn record_rejection(&mut self, rejection: VoteRejection) {
        match rejection {
            VoteRejection::UnknownTransaction | VoteRejection::AlreadyCommitted => {
                self.stale_votes += 1
            }
            VoteRejection::Replay => self.replay_rejections += 1,
            VoteRejection::Overflow => self.overflow_rejections += 1,
            VoteRejection::UnknownVoter => self.unknown_voter_rejections += 1,
        }
    }

    pub fn record_delivery(&mut self, peer: &ValidatorId, delivery: Delivery) {
        let stats = self.peers.entry(peer.clone()).or_default();
        match delivery {
            Delivery::Sent => stats.sent += 1,
            Delivery::Failed => stats.failed += 1,
            Delivery::TimedOut => stats.timed_out += 1,
        }
    }

    pub fn snapshot(&self, pending: usize, committed: usize) -> EngineStats {
        EngineStats {
            pending,
            committed,
            confirmed: self.confirmed,
            insufficient_consensus: self.insufficient_consensus,
            single_witness: self.single_witness,
            stale_votes: self.stale_votes,
            replay_rejections: self.replay_rejections,
            overflow_rejections: self.overflow_rejections,
            unknown_voter_rejections: self.unknown_voter_rejections,
            ledger_failures: self.ledger_failures,
            peers: self.peers.clone(),
        }
    }
}
