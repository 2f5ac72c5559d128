//! # Validator Node
//!
//! One validator identity: its consensus engine, its attack-verdict
//! instance, its own knowledge of the routing table, and its ledger replica.

use std::sync::Arc;

use rc_01_ledger::{Block, Ledger, MemoryLedger};
use rc_02_tx_consensus::{
    BroadcastReport, CommitHook, ConsensusApi, ConsensusEngine, EngineStats,
};
use rc_03_attack_verdict::{AttackVerdictApi, AttackVerdictConsensus, VerdictCommitHook, VerdictLog};
use shared_types::{AttackDetector, Observation, RpkiValidator, Transaction, ValidatorId};
use tracing::{debug, error, info, warn};

use crate::adapters::ObservationKnowledge;
use crate::errors::NodeResult;
use crate::wiring::{InMemoryNetwork, PeerMessage};

pub type Engine = ConsensusEngine<InMemoryNetwork>;
pub type Verdicts = AttackVerdictConsensus<InMemoryNetwork>;
pub type VerdictHook = VerdictCommitHook<InMemoryNetwork>;

pub struct ValidatorNode {
    pub(crate) id: ValidatorId,
    pub(crate) engine: Arc<Engine>,
    pub(crate) verdicts: Arc<Verdicts>,
    pub(crate) commit_hook: Arc<VerdictHook>,
    pub(crate) knowledge: Arc<ObservationKnowledge>,
    pub(crate) detector: Arc<dyn AttackDetector>,
    pub(crate) rpki: Arc<dyn RpkiValidator>,
    pub(crate) replica: Option<Arc<MemoryLedger>>,
}

impl ValidatorNode {
    pub fn id(&self) -> &ValidatorId {
        &self.id
    }

    pub fn engine(&self) -> &Arc<Engine> {
        &self.engine
    }

    pub fn verdicts(&self) -> &Arc<Verdicts> {
        &self.verdicts
    }

    pub fn knowledge(&self) -> &ObservationKnowledge {
        &self.knowledge
    }

    pub fn verdict_log(&self) -> &Arc<dyn VerdictLog> {
        self.verdicts.log()
    }

    /// This validator's copy of the chain.
    pub fn replica(&self) -> Option<&Arc<MemoryLedger>> {
        self.replica.as_ref()
    }

    pub fn replica_height(&self) -> usize {
        self.replica.as_ref().map_or(0, |r| r.block_count())
    }

    pub fn stats(&self) -> EngineStats {
        self.engine.stats()
    }

    /// Record an announcement this validator saw, without submitting it.
    pub fn learn(&self, observation: &Observation) {
        self.knowledge.learn(observation);
    }

    /// Turn a local observation into a transaction and put it to a vote.
    ///
    /// Returns `None` when the sampling cache already holds a recent copy.
    pub async fn observe(&self, observation: Observation) -> NodeResult<Option<BroadcastReport>> {
        self.knowledge.learn(&observation);

        let findings = match self.detector.detect(&observation) {
            Ok(findings) => findings,
            Err(e) => {
                warn!(validator = %self.id, "[node] Attack detector failed: {}", e);
                Vec::new()
            }
        };
        let is_attack = observation.is_attack || !findings.is_empty();
        if !self.engine.should_submit(&observation, is_attack) {
            debug!(
                validator = %self.id,
                subject = observation.subject_asn,
                prefix = %observation.prefix,
                "[node] Sampled out, recently committed"
            );
            return Ok(None);
        }

        let rpki = self.rpki.validate(&observation);
        let transaction = Transaction::new(self.id.clone(), &observation, findings, Some(rpki))?;
        let report = self.engine.broadcast(transaction).await?;
        Ok(Some(report))
    }

    /// Route one peer message into the right subsystem. Failures are logged.
    pub async fn handle(&self, message: PeerMessage) {
        let kind = message.kind();
        let result = match message {
            PeerMessage::Transaction(tx) => self
                .engine
                .handle_incoming_transaction(tx)
                .await
                .map(|_| ())
                .map_err(|e| e.to_string()),
            PeerMessage::Vote(vote) => self
                .engine
                .handle_incoming_vote(vote)
                .await
                .map(|_| ())
                .map_err(|e| e.to_string()),
            PeerMessage::Proposal(proposal) => self
                .verdicts
                .handle_incoming_proposal(proposal)
                .await
                .map(|_| ())
                .map_err(|e| e.to_string()),
            PeerMessage::Ballot(ballot) => self
                .verdicts
                .handle_incoming_ballot(ballot)
                .await
                .map(|_| ())
                .map_err(|e| e.to_string()),
            PeerMessage::Committed(block) => self.inspect_committed(&block).await,
        };
        if let Err(e) = result {
            error!(validator = %self.id, kind, "[node] Handling peer message failed: {}", e);
        }
    }

    /// Run this node's detector over a block a peer committed without a
    /// proposal. Only a block that matches the local replica is inspected.
    async fn inspect_committed(&self, block: &Block) -> Result<(), String> {
        let replicated = self
            .replica
            .as_ref()
            .and_then(|replica| replica.block(block.block_number));
        match replicated {
            Some(local) if local.block_hash == block.block_hash => {}
            Some(_) => {
                warn!(validator = %self.id, block = block.block_number, "[node] ⚠️ Commit notice does not match replica");
                return Ok(());
            }
            None => {
                debug!(validator = %self.id, block = block.block_number, "[node] Commit notice for block not replicated here");
                return Ok(());
            }
        }

        for entry in &block.transactions {
            self.commit_hook.on_commit(entry, block).await?;
        }
        Ok(())
    }

    /// Commit everything whose timeout elapsed. Returns the number committed.
    pub async fn sweep(&self) -> usize {
        match self.engine.timeout_sweep().await {
            Ok(receipts) => {
                if !receipts.is_empty() {
                    info!(validator = %self.id, committed = receipts.len(), "[node] ⏱️ Timeout sweep");
                }
                receipts.len()
            }
            Err(e) => {
                error!(validator = %self.id, "[node] Timeout sweep failed: {}", e);
                0
            }
        }
    }

    /// Trim the long-lived caches: sampling entries, committed transaction
    /// ids, settled proposals and early ballots.
    pub fn expire_caches(&self) {
        let sampled = self.engine.expire_sampling();
        let committed = self.engine.prune_committed();
        let settled = self.verdicts.expire();
        if sampled + committed + settled.proposals + settled.ballots > 0 {
            debug!(
                validator = %self.id,
                sampled,
                committed,
                proposals = settled.proposals,
                ballots = settled.ballots,
                "[node] Caches trimmed"
            );
        }
    }
}
