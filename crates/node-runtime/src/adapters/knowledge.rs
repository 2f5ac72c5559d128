//! # Observation Knowledge Base
//!
//! What this validator itself has seen. A peer's transaction is approved
//! when the same subject was seen announcing the prefix, rejected when the
//! prefix was only seen from other subjects, and left alone otherwise.

use parking_lot::RwLock;
use rc_02_tx_consensus::KnowledgeBase;
use shared_types::{AsNumber, Observation, Transaction, VoteChoice};
use std::collections::{BTreeSet, HashMap};

#[derive(Default)]
pub struct ObservationKnowledge {
    by_prefix: RwLock<HashMap<String, BTreeSet<AsNumber>>>,
}

impl ObservationKnowledge {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn learn(&self, observation: &Observation) {
        self.by_prefix
            .write()
            .entry(observation.prefix_key())
            .or_default()
            .insert(observation.subject_asn);
    }

    pub fn knows(&self, prefix_key: &str) -> bool {
        self.by_prefix.read().contains_key(prefix_key)
    }

    pub fn prefix_count(&self) -> usize {
        self.by_prefix.read().len()
    }
}

impl KnowledgeBase for ObservationKnowledge {
    fn opinion(&self, transaction: &Transaction) -> Option<VoteChoice> {
        let known = self.by_prefix.read();
        let subjects = known.get(&transaction.prefix_key())?;
        Some(if subjects.contains(&transaction.subject_asn) {
            VoteChoice::Approve
        } else {
            VoteChoice::Reject
        })
    }
}
