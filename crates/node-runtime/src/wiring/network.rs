//! # In-Process Peer Network
//!
//! Point-to-point delivery between validators living in one process. Each
//! registered validator owns an unbounded inbox; a send fails when the
//! recipient is unknown, partitioned away, or has stopped reading.
//!
//! ```text
//! engine ──send_*──▶ InMemoryNetwork ──PeerMessage──▶ inbox(peer) ──▶ dispatcher(peer)
//! ```

use async_trait::async_trait;
use parking_lot::RwLock;
use rc_01_ledger::Block;
use rc_02_tx_consensus::PeerTransport;
use rc_03_attack_verdict::{AttackProposal, VerdictBallot, VerdictTransport};
use shared_types::{Transaction, ValidatorId, Vote};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use tokio::sync::mpsc;
use tracing::debug;

/// Everything one validator can send another.
#[derive(Debug, Clone)]
pub enum PeerMessage {
    Transaction(Transaction),
    Vote(Vote),
    Proposal(AttackProposal),
    Ballot(VerdictBallot),
    /// A block the sender committed without opening an attack proposal.
    Committed(Block),
}

impl PeerMessage {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Transaction(_) => "transaction",
            Self::Vote(_) => "vote",
            Self::Proposal(_) => "proposal",
            Self::Ballot(_) => "ballot",
            Self::Committed(_) => "committed",
        }
    }
}

pub type Inbox = mpsc::UnboundedReceiver<PeerMessage>;

#[derive(Default)]
pub struct InMemoryNetwork {
    inboxes: RwLock<HashMap<ValidatorId, mpsc::UnboundedSender<PeerMessage>>>,
    partitioned: RwLock<HashSet<ValidatorId>>,
    delivered: RwLock<BTreeMap<&'static str, u64>>,
    dropped: AtomicU64,
    in_flight: AtomicUsize,
}

impl InMemoryNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create the inbox for `validator`. Registering again replaces it.
    pub fn register(&self, validator: ValidatorId) -> Inbox {
        let (tx, rx) = mpsc::unbounded_channel();
        self.inboxes.write().insert(validator, tx);
        rx
    }

    /// Cut a validator off: messages to it fail until `heal`.
    pub fn partition(&self, validator: &ValidatorId) {
        self.partitioned.write().insert(validator.clone());
    }

    pub fn heal(&self, validator: &ValidatorId) {
        self.partitioned.write().remove(validator);
    }

    /// Messages delivered so far, by kind.
    pub fn delivered(&self) -> BTreeMap<&'static str, u64> {
        self.delivered.read().clone()
    }

    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Messages queued or still being handled.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Called by a dispatcher once a message has been fully handled.
    pub fn complete(&self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }

    pub fn send(&self, peer: &ValidatorId, message: PeerMessage) -> Result<(), String> {
        let kind = message.kind();
        if self.partitioned.read().contains(peer) {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            return Err(format!("{} is partitioned", peer));
        }
        let sender = self.inboxes.read().get(peer).cloned();
        let Some(sender) = sender else {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            return Err(format!("{} is not on the network", peer));
        };
        // Counted before the send so the receiver can never complete first.
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        if sender.send(message).is_err() {
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            self.dropped.fetch_add(1, Ordering::Relaxed);
            return Err(format!("{} stopped receiving", peer));
        }
        debug!(peer = %peer, kind, "[node] Message queued");
        *self.delivered.write().entry(kind).or_insert(0) += 1;
        Ok(())
    }
}

#[async_trait]
impl PeerTransport for InMemoryNetwork {
    async fn send_transaction(&self, peer: &ValidatorId, transaction: Transaction) -> Result<(), String> {
        self.send(peer, PeerMessage::Transaction(transaction))
    }

    async fn send_vote(&self, peer: &ValidatorId, vote: Vote) -> Result<(), String> {
        self.send(peer, PeerMessage::Vote(vote))
    }
}

#[async_trait]
impl VerdictTransport for InMemoryNetwork {
    async fn send_proposal(&self, peer: &ValidatorId, proposal: AttackProposal) -> Result<(), String> {
        self.send(peer, PeerMessage::Proposal(proposal))
    }

    async fn send_ballot(&self, peer: &ValidatorId, ballot: VerdictBallot) -> Result<(), String> {
        self.send(peer, PeerMessage::Ballot(ballot))
    }
}
