//! Shared fixtures: N consensus engines over the node runtime's in-memory
//! network, delivering messages by hand so each scenario controls ordering.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::Mutex;

use node_runtime::adapters::{HmacSigner, InMemoryRatingStore, InMemoryRewardLedger, Keyring};
use node_runtime::container::default_roster;
use node_runtime::wiring::{Inbox, InMemoryNetwork, PeerMessage};
use rc_01_ledger::{Block, Ledger, MemoryLedger, ReplicaSet, ReplicatedLedger};
use rc_02_tx_consensus::{
    ConsensusApi, ConsensusConfig, ConsensusDependencies, ConsensusEngine, FixedOpinion,
    NoopCommitHook, VoteOutcome,
};
use shared_types::{Observation, Transaction, ValidatorId, Vote, VoteChoice};

pub type Engine = ConsensusEngine<InMemoryNetwork>;

pub const SECRET: [u8; 32] = [7u8; 32];

pub struct Validator {
    pub id: ValidatorId,
    pub engine: Arc<Engine>,
    inbox: Mutex<Inbox>,
}

pub struct Harness {
    pub network: Arc<InMemoryNetwork>,
    pub ledger: Arc<ReplicatedLedger>,
    pub rewards: Arc<InMemoryRewardLedger>,
    pub ratings: Arc<InMemoryRatingStore>,
    pub validators: BTreeMap<ValidatorId, Validator>,
}

/// `validators` engines, all voting `opinion` on every peer transaction.
pub fn harness(validators: usize, config: ConsensusConfig, opinion: Option<VoteChoice>) -> Harness {
    let roster = default_roster(validators);
    let genesis = Block::genesis(1_700_000_000_000).unwrap();
    let canonical: Arc<dyn Ledger> = Arc::new(MemoryLedger::with_label("canonical", genesis.clone()));
    let replicas = Arc::new(ReplicaSet::new(&genesis, roster.clone()));
    let ledger = Arc::new(ReplicatedLedger::new(canonical, replicas));
    let shared: Arc<dyn Ledger> = ledger.clone();

    let network = Arc::new(InMemoryNetwork::new());
    let rewards = Arc::new(InMemoryRewardLedger::default());
    let ratings = Arc::new(InMemoryRatingStore::new());
    let keyring = Arc::new(Keyring::derive(&SECRET, &roster));
    let config = ConsensusConfig {
        total_validators: validators,
        ..config
    };

    let validators = roster
        .iter()
        .map(|id| {
            let engine = ConsensusEngine::new(ConsensusDependencies {
                local_id: id.clone(),
                validators: roster.clone(),
                config: config.clone(),
                ledger: Arc::clone(&shared),
                transport: Arc::clone(&network),
                knowledge: Arc::new(FixedOpinion(opinion)),
                signer: Arc::new(HmacSigner::new(id.clone(), Arc::clone(&keyring))),
                rewards: rewards.clone(),
                ratings: ratings.clone(),
                commit_hook: Arc::new(NoopCommitHook),
            })
            .unwrap();
            let validator = Validator {
                id: id.clone(),
                engine: Arc::new(engine),
                inbox: Mutex::new(network.register(id.clone())),
            };
            (id.clone(), validator)
        })
        .collect();

    Harness {
        network,
        ledger,
        rewards,
        ratings,
        validators,
    }
}

impl Harness {
    pub fn validator(&self, id: &str) -> &Validator {
        &self.validators[&ValidatorId::new(id)]
    }

    pub fn engine(&self, id: &str) -> &Arc<Engine> {
        &self.validator(id).engine
    }

    /// Handle everything queued for `id`. Returns the outcomes of any votes.
    pub async fn deliver(&self, id: &str) -> Vec<VoteOutcome> {
        let validator = self.validator(id);
        let queued = {
            let mut inbox = validator.inbox.lock();
            let mut queued = Vec::new();
            while let Ok(message) = inbox.try_recv() {
                queued.push(message);
            }
            queued
        };

        let mut outcomes = Vec::new();
        for message in queued {
            match message {
                PeerMessage::Transaction(tx) => {
                    validator.engine.handle_incoming_transaction(tx).await.unwrap();
                }
                PeerMessage::Vote(vote) => {
                    outcomes.push(validator.engine.handle_incoming_vote(vote).await.unwrap());
                }
                PeerMessage::Proposal(_) | PeerMessage::Ballot(_) | PeerMessage::Committed(_) => {}
            }
            self.network.complete();
        }
        outcomes
    }

    pub fn replica_tips_agree(&self) -> bool {
        let canonical = self.ledger.tip().map(|b| b.block_hash);
        self.ledger
            .replicas()
            .tip_hashes()
            .values()
            .all(|tip| *tip == canonical)
    }
}

pub fn observation(subject: u32, prefix: &str, is_attack: bool) -> Observation {
    Observation {
        subject_asn: subject,
        prefix: prefix.to_string(),
        as_path: vec![3356, 1299, subject],
        timestamp: 1_700_000_000,
        is_attack,
        label: if is_attack { "hijack".into() } else { String::new() },
    }
}

pub fn transaction(observer: &str, subject: u32, is_attack: bool) -> Transaction {
    Transaction::new(
        ValidatorId::new(observer),
        &observation(subject, "203.0.113.0/24", is_attack),
        vec![],
        None,
    )
    .unwrap()
}

pub fn vote(transaction_id: &str, voter: &str, choice: VoteChoice) -> Vote {
    Vote::new(transaction_id, ValidatorId::new(voter), choice).unwrap()
}

pub fn ids(names: &[&str]) -> Vec<ValidatorId> {
    names.iter().map(|n| ValidatorId::new(*n)).collect()
}
