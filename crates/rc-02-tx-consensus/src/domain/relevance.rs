//! Peer relevance index: which validators are known to observe which ASes.

use parking_lot::RwLock;
use shared_types::{AsNumber, ValidatorId};
use std::collections::{BTreeSet, HashMap};

#[derive(Debug, Default)]
pub struct RelevanceIndex {
    observers: RwLock<HashMap<AsNumber, BTreeSet<ValidatorId>>>,
}

impl RelevanceIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn learn(&self, subject: AsNumber, validator: &ValidatorId) {
        let mut observers = self.observers.write();
        let known = observers.entry(subject).or_default();
        if !known.contains(validator) {
            known.insert(validator.clone());
        }
    }

    pub fn relevant(&self, subject: AsNumber) -> BTreeSet<ValidatorId> {
        self.observers
            .read()
            .get(&subject)
            .cloned()
            .unwrap_or_default()
    }

    /// Broadcast targets among `peers`.
    ///
    /// Falls back to every peer when no relevant peer is known, or when
    /// `min_targets` is set and fewer relevant peers than that are known.
    pub fn targets(
        &self,
        subject: AsNumber,
        peers: &[ValidatorId],
        min_targets: Option<usize>,
    ) -> Vec<ValidatorId> {
        let relevant = self.relevant(subject);
        let chosen: Vec<ValidatorId> = peers
            .iter()
            .filter(|p| relevant.contains(*p))
            .cloned()
            .collect();

        let too_few = min_targets.is_some_and(|min| chosen.len() < min);
        if chosen.is_empty() || too_few {
            peers.to_vec()
        } else {
            chosen
        }
    }
}
