//! # Validator Cluster
//!
//! Builds every validator in the roster and wires them together:
//!
//! ```text
//!                  ┌────────────── ReplicatedLedger ──────────────┐
//!                  │ canonical (disk or memory) + one replica/node │
//!                  └──────────────────────▲───────────────────────┘
//!                                         │ append
//! observe ──▶ ConsensusEngine ──commit──▶ ├──▶ VerdictCommitHook ──▶ AttackVerdictConsensus
//!                  ▲                                                        │
//!                  └──────── InMemoryNetwork ◀──── proposals/ballots/notices ┘
//! ```
//!
//! A commit that opened no proposal is announced to every peer, which runs
//! its own `VerdictCommitHook` on the replicated block.
//!
//! ## Thread Safety
//!
//! - Nodes are shared as `Arc<ValidatorNode>` between dispatchers and loops
//! - The ledger serializes appends; each engine owns its vote pool
//! - Shutdown is a `watch` channel every spawned task selects on

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use rc_01_ledger::{open_ledger, IntegrityReport, Ledger, LedgerError, ReplicaSet, ReplicatedLedger};
use rc_02_tx_consensus::{BroadcastReport, ConsensusDependencies, ConsensusEngine, EngineStats};
use rc_03_attack_verdict::{
    AttackVerdictConsensus, JsonlVerdictLog, MemoryVerdictLog, VerdictCommitHook,
    VerdictDependencies, VerdictLog,
};
use shared_types::{AttackDetector, Observation, RpkiValidator, ValidatorId};

use crate::adapters::{
    CommitNotifier, HeuristicDetector, HmacSigner, InMemoryRatingStore, InMemoryRewardLedger, Keyring,
    ObservationKnowledge, RoaTable,
};
use crate::container::{NodeConfig, ValidatorNode};
use crate::errors::{NodeError, NodeResult};
use crate::handlers::{MaintenanceHandler, PeerMessageHandler, DRAIN_TIMEOUT};
use crate::wiring::{InMemoryNetwork, Inbox};

/// One line of an observation feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservationRecord {
    /// Validators that saw the announcement. The first one submits it.
    /// Empty means every validator saw it.
    #[serde(default)]
    pub observed_by: Vec<ValidatorId>,
    #[serde(flatten)]
    pub observation: Observation,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReplaySummary {
    pub submitted: usize,
    pub sampled_out: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ShutdownReport {
    pub blocks: usize,
    pub transactions: usize,
    pub integrity_valid: bool,
    pub integrity_errors: Vec<String>,
    pub diverged_replicas: Vec<ValidatorId>,
    pub stats: BTreeMap<ValidatorId, EngineStats>,
}

pub struct ValidatorCluster {
    config: NodeConfig,
    network: Arc<InMemoryNetwork>,
    ledger: Arc<ReplicatedLedger>,
    rewards: Arc<InMemoryRewardLedger>,
    ratings: Arc<InMemoryRatingStore>,
    nodes: BTreeMap<ValidatorId, Arc<ValidatorNode>>,
    inboxes: Mutex<Vec<(ValidatorId, Inbox)>>,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
    next_submitter: AtomicUsize,
}

impl ValidatorCluster {
    /// Open the ledger and build every validator. Nothing runs until `start`.
    pub fn build(config: NodeConfig) -> NodeResult<Self> {
        Self::build_with_detectors(config, |_, shared| Arc::clone(shared))
    }

    /// Like `build`, with each validator's attack detector chosen by
    /// `detector_for`. It is handed the shared ROA-backed detector.
    pub fn build_with_detectors<F>(config: NodeConfig, detector_for: F) -> NodeResult<Self>
    where
        F: Fn(&ValidatorId, &Arc<dyn AttackDetector>) -> Arc<dyn AttackDetector>,
    {
        config.validate()?;

        let canonical = open_ledger(&config.ledger())?;
        let genesis = canonical.genesis().ok_or(LedgerError::MissingGenesis)?;
        let replicas = Arc::new(ReplicaSet::new(&genesis, config.validators.clone()));
        // A reloaded chain is replayed so every replica starts at the tip.
        for number in 1..canonical.block_count() as u64 {
            if let Some(block) = canonical.block(number) {
                replicas.replicate(&block);
            }
        }
        let ledger = Arc::new(ReplicatedLedger::new(canonical, replicas));
        let shared_ledger: Arc<dyn Ledger> = ledger.clone();

        let network = Arc::new(InMemoryNetwork::new());
        let rewards = Arc::new(InMemoryRewardLedger::new(config.rewards));
        let ratings = Arc::new(InMemoryRatingStore::new());
        let keyring = Arc::new(Keyring::derive(&config.hmac_secret, &config.validators));
        let roas = Arc::new(RoaTable::new(config.roas.clone()));
        let shared_detector: Arc<dyn AttackDetector> =
            Arc::new(HeuristicDetector::with_roas(roas.clone()));
        let rpki: Arc<dyn RpkiValidator> = roas;

        let mut nodes = BTreeMap::new();
        let mut inboxes = Vec::with_capacity(config.validators.len());
        for id in &config.validators {
            let detector = detector_for(id, &shared_detector);
            let log: Arc<dyn VerdictLog> = match config.verdict_log_path(id) {
                Some(path) => Arc::new(JsonlVerdictLog::open(path)?),
                None => Arc::new(MemoryVerdictLog::new()),
            };
            let verdicts = Arc::new(AttackVerdictConsensus::new(VerdictDependencies {
                local_id: id.clone(),
                validators: config.validators.clone(),
                config: config.verdict.clone(),
                transport: Arc::clone(&network),
                detector: Arc::clone(&detector),
                rewards: rewards.clone(),
                ratings: ratings.clone(),
                log,
            })?);

            let commit_hook = Arc::new(VerdictCommitHook::new(
                Arc::clone(&verdicts),
                Arc::clone(&detector),
            ));
            let knowledge = Arc::new(ObservationKnowledge::new());
            let engine = Arc::new(ConsensusEngine::new(ConsensusDependencies {
                local_id: id.clone(),
                validators: config.validators.clone(),
                config: config.consensus.clone(),
                ledger: Arc::clone(&shared_ledger),
                transport: Arc::clone(&network),
                knowledge: knowledge.clone(),
                signer: Arc::new(HmacSigner::new(id.clone(), Arc::clone(&keyring))),
                rewards: rewards.clone(),
                ratings: ratings.clone(),
                commit_hook: Arc::new(CommitNotifier::new(
                    id.clone(),
                    &config.validators,
                    Arc::clone(&commit_hook),
                    Arc::clone(&verdicts),
                    Arc::clone(&network),
                )),
            })?);

            inboxes.push((id.clone(), network.register(id.clone())));
            nodes.insert(
                id.clone(),
                Arc::new(ValidatorNode {
                    id: id.clone(),
                    engine,
                    verdicts,
                    commit_hook,
                    knowledge,
                    detector,
                    rpki: Arc::clone(&rpki),
                    replica: ledger.replicas().replica(id),
                }),
            );
        }

        info!(
            validators = nodes.len(),
            threshold = config.consensus.threshold(),
            network = %config.network,
            blocks = ledger.block_count(),
            "[node] 🏗️ Validator cluster built"
        );

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        Ok(Self {
            config,
            network,
            ledger,
            rewards,
            ratings,
            nodes,
            inboxes: Mutex::new(inboxes),
            shutdown_tx,
            shutdown_rx,
            tasks: Mutex::new(Vec::new()),
            next_submitter: AtomicUsize::new(0),
        })
    }

    /// Spawn one dispatcher and one maintenance loop per validator.
    /// A second call is a no-op.
    pub fn start(&self) {
        let inboxes = std::mem::take(&mut *self.inboxes.lock());
        if inboxes.is_empty() {
            return;
        }

        let mut tasks = self.tasks.lock();
        for (id, inbox) in inboxes {
            let Some(node) = self.nodes.get(&id) else { continue };

            let dispatcher = PeerMessageHandler::new(Arc::clone(node), Arc::clone(&self.network), inbox);
            tasks.push(tokio::spawn(dispatcher.run(self.shutdown_rx.clone())));

            let maintenance = MaintenanceHandler::new(
                Arc::clone(node),
                self.config.sweep_interval,
                self.config.cache_expiry_interval,
            );
            tasks.push(tokio::spawn(maintenance.run(self.shutdown_rx.clone())));
        }
        info!(tasks = tasks.len(), "[node] ✅ Validators running");
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    pub fn network(&self) -> &Arc<InMemoryNetwork> {
        &self.network
    }

    pub fn ledger(&self) -> &Arc<ReplicatedLedger> {
        &self.ledger
    }

    pub fn rewards(&self) -> &Arc<InMemoryRewardLedger> {
        &self.rewards
    }

    pub fn ratings(&self) -> &Arc<InMemoryRatingStore> {
        &self.ratings
    }

    pub fn node(&self, id: &ValidatorId) -> NodeResult<&Arc<ValidatorNode>> {
        self.nodes
            .get(id)
            .ok_or_else(|| NodeError::UnknownValidator(id.clone()))
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Arc<ValidatorNode>> {
        self.nodes.values()
    }

    /// Every observer learns the announcement, then the first one submits it.
    pub async fn ingest(&self, record: ObservationRecord) -> NodeResult<Option<BroadcastReport>> {
        let observers: Vec<&Arc<ValidatorNode>> = if record.observed_by.is_empty() {
            let all: Vec<_> = self.nodes.values().collect();
            // Rotate the submitter so no single validator commits everything.
            let start = self.next_submitter.fetch_add(1, Ordering::Relaxed) % all.len().max(1);
            all[start..].iter().chain(all[..start].iter()).copied().collect()
        } else {
            record
                .observed_by
                .iter()
                .map(|id| self.node(id))
                .collect::<NodeResult<Vec<_>>>()?
        };
        let Some((submitter, others)) = observers.split_first() else {
            return Ok(None);
        };

        for node in others {
            node.learn(&record.observation);
        }
        submitter.observe(record.observation).await
    }

    /// Replay a JSONL feed line by line. Bad lines are logged and counted.
    pub async fn replay_file(&self, path: &Path) -> NodeResult<ReplaySummary> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| NodeError::Feed {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;

        let mut summary = ReplaySummary::default();
        for (i, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let record: ObservationRecord = match serde_json::from_str(line) {
                Ok(record) => record,
                Err(e) => {
                    warn!(line = i + 1, "[node] Skipping malformed observation: {}", e);
                    summary.failed += 1;
                    continue;
                }
            };
            match self.ingest(record).await {
                Ok(Some(_)) => summary.submitted += 1,
                Ok(None) => summary.sampled_out += 1,
                Err(e) => {
                    warn!(line = i + 1, "[node] Observation not submitted: {}", e);
                    summary.failed += 1;
                }
            }
        }
        info!(
            submitted = summary.submitted,
            sampled_out = summary.sampled_out,
            failed = summary.failed,
            "[node] 📼 Observation feed replayed"
        );
        Ok(summary)
    }

    /// Wait until no peer message is queued or being handled.
    /// False if `limit` elapsed first.
    pub async fn settle(&self, limit: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + limit;
        while self.network.in_flight() > 0 {
            if tokio::time::Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        true
    }

    /// Run the timeout sweep on every validator now.
    pub async fn sweep_all(&self) -> usize {
        let mut committed = 0;
        for node in self.nodes.values() {
            committed += node.sweep().await;
        }
        committed
    }

    pub fn stats(&self) -> BTreeMap<ValidatorId, EngineStats> {
        self.nodes
            .iter()
            .map(|(id, node)| (id.clone(), node.stats()))
            .collect()
    }

    pub fn verify(&self) -> IntegrityReport {
        self.ledger.verify_integrity()
    }

    /// Stop every task, flush the ledger and verify what was written.
    pub async fn shutdown(&self) -> NodeResult<ShutdownReport> {
        info!("[node] Initiating graceful shutdown...");
        if let Err(e) = self.shutdown_tx.send(true) {
            error!("[node] Failed to send shutdown signal: {}", e);
        }

        // Dispatchers return only after their handlers drain, so nothing
        // appends once these joins complete.
        let stop_timeout = DRAIN_TIMEOUT + Duration::from_secs(1);
        let tasks = std::mem::take(&mut *self.tasks.lock());
        for task in tasks {
            if tokio::time::timeout(stop_timeout, task).await.is_err() {
                warn!(timeout = ?stop_timeout, "[node] Task did not stop in time");
            }
        }

        self.ledger.flush()?;
        let report = self.verify();
        if report.valid {
            info!(blocks = report.blocks_checked, "[node] 🔒 Ledger integrity verified");
        } else {
            for line in report.errors() {
                error!("[node] CRITICAL: {}", line);
            }
        }

        Ok(ShutdownReport {
            blocks: self.ledger.block_count(),
            transactions: self.ledger.transaction_count(),
            integrity_valid: report.valid,
            integrity_errors: report.errors(),
            diverged_replicas: self.ledger.replicas().diverged(),
            stats: self.stats(),
        })
    }
}
