//! Consensus engine: vote collection, commit-or-timeout, ledger write.
//!
//! # Lock discipline
//!
//! The pool mutex is held only for vote-map mutation and the commit claim.
//! Ledger appends, peer sends and collaborator callbacks all run after the
//! guard is dropped, so a slow commit never stalls votes on other
//! transactions. The pool lock and the ledger lock are never held together.

use crate::domain::{
    ConfigError, ConsensusConfig, ConsensusError, ConsensusResult, Delivery, EngineStats,
    RelevanceIndex, SamplingCache, SelfVotePolicy, StatsCounters, VotePool, VoteRejection,
    VoteTracker,
};
use crate::metrics;
use crate::ports::{CommitHook, ConsensusApi, KnowledgeBase, PeerTransport};
use async_trait::async_trait;
use parking_lot::Mutex;
use rc_01_ledger::Ledger;
use shared_types::{
    unix_millis, AsNumber, CommittedTransaction, ConsensusStatus, Observation, RatingStore,
    RewardLedger, Transaction, TransactionSigner, ValidatorId, Vote, VoteChoice,
};
use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};


/// What won the commit claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitTrigger {
    Quorum,
    Timeout,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitReceipt {
    pub transaction_id: String,
    pub status: ConsensusStatus,
    pub approve_count: usize,
    pub reject_count: usize,
    pub block_number: u64,
    pub block_hash: String,
    pub trigger: CommitTrigger,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VoteOutcome {
    Recorded {
        approve_count: usize,
        reject_count: usize,
    },
    /// This vote reached quorum and this call won the commit claim.
    Committed(CommitReceipt),
    Rejected(VoteRejection),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BroadcastReport {
    pub transaction_id: String,
    pub targets: Vec<ValidatorId>,
    pub delivered: Vec<ValidatorId>,
    pub failed: Vec<ValidatorId>,
    /// Set when the observer's own vote alone reached quorum.
    pub committed: Option<CommitReceipt>,
}

enum Outgoing {
    Transaction(Transaction),
    Vote(Vote),
}

impl Outgoing {
    fn kind(&self) -> &'static str {
        match self {
            Self::Transaction(_) => "transaction",
            Self::Vote(_) => "vote",
        }
    }
}

/// Dependencies for `ConsensusEngine`.
pub struct ConsensusDependencies<P> {
    pub local_id: ValidatorId,
    pub validators: Vec<ValidatorId>,
    pub config: ConsensusConfig,
    pub ledger: Arc<dyn Ledger>,
    pub transport: Arc<P>,
    pub knowledge: Arc<dyn KnowledgeBase>,
    pub signer: Arc<dyn TransactionSigner>,
    pub rewards: Arc<dyn RewardLedger>,
    pub ratings: Arc<dyn RatingStore>,
    pub commit_hook: Arc<dyn CommitHook>,
}

/// Transaction consensus for one validator.
pub struct ConsensusEngine<P: PeerTransport> {
    local_id: ValidatorId,
    config: ConsensusConfig,
    threshold: usize,
    roster: BTreeSet<ValidatorId>,
    peers: Vec<ValidatorId>,
    pool: Mutex<VotePool>,
    ledger: Arc<dyn Ledger>,
    transport: Arc<P>,
    knowledge: Arc<dyn KnowledgeBase>,
    signer: Arc<dyn TransactionSigner>,
    rewards: Arc<dyn RewardLedger>,
    ratings: Arc<dyn RatingStore>,
    commit_hook: Arc<dyn CommitHook>,
    sampling: SamplingCache,
    relevance: RelevanceIndex,
    first_commits: Mutex<HashSet<AsNumber>>,
    stats: Mutex<StatsCounters>,
}

impl<P: PeerTransport> ConsensusEngine<P> {
    /// # Errors
    ///
    /// `ConsensusError::Config` when the configuration is invalid, the
    /// roster size disagrees with `total_validators`, or the local
    /// validator is missing from the roster.
    pub fn new(deps: ConsensusDependencies<P>) -> ConsensusResult<Self> {
        deps.config.validate()?;

        let roster: BTreeSet<ValidatorId> = deps.validators.into_iter().collect();
        if roster.len() != deps.config.total_validators {
            return Err(ConfigError::RosterMismatch {
                roster: roster.len(),
                configured: deps.config.total_validators,
            }
            .into());
        }
        if !roster.contains(&deps.local_id) {
            return Err(ConfigError::NotInRoster(deps.local_id).into());
        }
        let peers = roster
            .iter()
            .filter(|v| **v != deps.local_id)
            .cloned()
            .collect();

        Ok(Self {
            threshold: deps.config.threshold(),
            pool: Mutex::new(VotePool::new(deps.config.total_validators)),
            local_id: deps.local_id,
            config: deps.config,
            roster,
            peers,
            ledger: deps.ledger,
            transport: deps.transport,
            knowledge: deps.knowledge,
            signer: deps.signer,
            rewards: deps.rewards,
            ratings: deps.ratings,
            commit_hook: deps.commit_hook,
            sampling: SamplingCache::new(),
            relevance: RelevanceIndex::new(),
            first_commits: Mutex::new(HashSet::new()),
            stats: Mutex::new(StatsCounters::default()),
        })
    }

    pub fn local_id(&self) -> &ValidatorId {
        &self.local_id
    }

    pub fn config(&self) -> &ConsensusConfig {
        &self.config
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }

    pub fn peers(&self) -> &[ValidatorId] {
        &self.peers
    }

    pub fn relevance(&self) -> &RelevanceIndex {
        &self.relevance
    }

    pub fn sampling(&self) -> &SamplingCache {
        &self.sampling
    }

    pub fn is_pending(&self, transaction_id: &str) -> bool {
        self.pool.lock().get(transaction_id).is_some()
    }

    pub fn is_committed(&self, transaction_id: &str) -> bool {
        self.pool.lock().is_committed(transaction_id)
    }

    /// `(approve, total)` votes held for a pending transaction.
    pub fn pending_votes(&self, transaction_id: &str) -> Option<(usize, usize)> {
        self.pool
            .lock()
            .get(transaction_id)
            .map(|t| (t.approve_count(), t.vote_count()))
    }

    /// Sampling check for a new local observation. Attacks always go through.
    pub fn should_submit(&self, observation: &Observation, is_attack: bool) -> bool {
        is_attack
            || self.sampling.should_submit(
                observation.subject_asn,
                &observation.prefix_key(),
                observation.timestamp,
                self.config.sampling_window,
            )
    }

    /// Drop sampling entries older than the window.
    pub fn expire_sampling(&self) -> usize {
        let removed = self
            .sampling
            .expire(Instant::now(), self.config.sampling_window);
        if removed > 0 {
            debug!(removed, "[rc-02] Expired sampling cache entries");
        }
        removed
    }

    /// Forget committed ids older than the commit retention.
    pub fn prune_committed(&self) -> usize {
        let removed = self
            .pool
            .lock()
            .prune_committed(Instant::now(), self.config.commit_retention());
        if removed > 0 {
            debug!(removed, "[rc-02] Pruned committed transaction ids");
        }
        removed
    }

    /// Committed ids currently held for stale-vote detection.
    pub fn retained_commits(&self) -> usize {
        self.pool.lock().retained_commits()
    }

    fn sign(&self, transaction: Transaction) -> ConsensusResult<Transaction> {
        if transaction.signature.is_some() {
            return Ok(transaction);
        }
        let payload = transaction.signing_payload()?;
        let signature = self.signer.sign(&payload);
        Ok(transaction.with_signature(signature))
    }

    fn signature_valid(&self, transaction: &Transaction) -> bool {
        let Some(signature) = &transaction.signature else {
            return false;
        };
        if signature.signer != transaction.observer_id {
            return false;
        }
        match transaction.signing_payload() {
            Ok(payload) => self.signer.verify(&payload, signature),
            Err(_) => false,
        }
    }

    /// Send to every target concurrently, each bounded by `peer_send_timeout`.
    async fn fan_out(&self, targets: &[ValidatorId], message: Outgoing) -> Vec<(ValidatorId, Delivery)> {
        let kind = message.kind();
        let message = Arc::new(message);
        let limit = self.config.peer_send_timeout;
        let mut tasks = JoinSet::new();

        for peer in targets {
            let transport = Arc::clone(&self.transport);
            let message = Arc::clone(&message);
            let peer = peer.clone();
            tasks.spawn(async move {
                let delivery = deliver(transport.as_ref(), &peer, &message, limit).await;
                (peer, delivery)
            });
        }

        let mut results = Vec::with_capacity(targets.len());
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(result) => results.push(result),
                Err(e) => error!("[rc-02] Peer send task failed: {}", e),
            }
        }

        let mut stats = self.stats.lock();
        for (peer, delivery) in &results {
            stats.record_delivery(peer, *delivery);
            if *delivery != Delivery::Sent {
                metrics::record_peer_send_failure();
                warn!(peer = %peer, kind, outcome = ?delivery, "[rc-02] Peer delivery failed");
            }
        }
        results
    }

    fn reject(&self, vote: &Vote, rejection: VoteRejection) -> VoteOutcome {
        self.stats.lock().record_rejection(rejection);
        metrics::record_vote_rejected(rejection.as_str());
        if rejection.is_security_relevant() {
            warn!(
                tx_id = %vote.transaction_id,
                voter = %vote.voter_id,
                reason = %rejection,
                "[rc-02] ⚠️ Vote rejected"
            );
        } else {
            debug!(
                tx_id = %vote.transaction_id,
                voter = %vote.voter_id,
                reason = %rejection,
                "[rc-02] Stale vote discarded"
            );
        }
        VoteOutcome::Rejected(rejection)
    }

    /// Claim the commit for `transaction_id`; `None` if someone else won.
    async fn try_commit(
        &self,
        transaction_id: &str,
        trigger: CommitTrigger,
    ) -> ConsensusResult<Option<CommitReceipt>> {
        let claimed = self.pool.lock().claim(transaction_id, Instant::now());
        match claimed {
            Some(tracker) => self.commit(tracker, trigger).await.map(Some),
            None => Ok(None),
        }
    }

    /// Write a claimed tracker to the ledger, then run side effects.
    async fn commit(
        &self,
        tracker: VoteTracker,
        trigger: CommitTrigger,
    ) -> ConsensusResult<CommitReceipt> {
        let (transaction, votes) = tracker.into_parts();
        let approve_count = votes.iter().filter(|v| v.is_approve()).count();
        let reject_count = votes.len() - approve_count;
        let status = ConsensusStatus::classify(approve_count, self.threshold);
        let transaction_id = transaction.id.clone();

        let entry = CommittedTransaction {
            transaction,
            consensus_status: status,
            approve_count,
            reject_count,
            signatures: votes,
            committed_by: self.local_id.clone(),
            committed_at: unix_millis(),
        };

        let block = match self.ledger.append_transaction(entry.clone()) {
            Ok(block) => block,
            Err(source) => {
                self.stats.lock().ledger_failures += 1;
                metrics::record_ledger_failure();
                error!(
                    tx_id = %transaction_id,
                    "[rc-02] ❌ Ledger append failed, transaction not committed: {}",
                    source
                );
                return Err(ConsensusError::Ledger {
                    transaction_id,
                    source,
                });
            }
        };

        info!(
            tx_id = %transaction_id,
            block = block.block_number,
            status = %status,
            approve = approve_count,
            reject = reject_count,
            trigger = ?trigger,
            "[rc-02] ✅ Transaction committed"
        );

        self.after_commit(&entry, &block).await;

        Ok(CommitReceipt {
            transaction_id,
            status,
            approve_count,
            reject_count,
            block_number: block.block_number,
            block_hash: block.block_hash,
            trigger,
        })
    }

    /// Side effects of a durable commit. Failures are logged, never returned.
    async fn after_commit(&self, entry: &CommittedTransaction, block: &rc_01_ledger::Block) {
        let transaction = &entry.transaction;
        let subject = transaction.subject_asn;

        self.sampling
            .record(subject, &transaction.prefix_key(), transaction.payload.timestamp);

        let is_first = self.first_commits.lock().insert(subject);
        let voters = entry.approving_voters();
        if let Err(e) = self
            .rewards
            .award_block_commit(&self.local_id, &voters, is_first)
        {
            warn!(tx_id = %transaction.id, "[rc-02] Block reward callback failed: {}", e);
        }

        if entry.consensus_status == ConsensusStatus::Confirmed && !transaction.is_attack {
            if let Err(e) = self
                .ratings
                .record_good_behavior(subject, "confirmed_announcement")
            {
                warn!(subject, "[rc-02] Rating callback failed: {}", e);
            }
        }

        if let Err(e) = self.commit_hook.on_commit(entry, block).await {
            warn!(tx_id = %transaction.id, "[rc-02] Commit hook failed: {}", e);
        }

        let pending = {
            let pool = self.pool.lock();
            pool.pending_count()
        };
        self.stats.lock().record_commit(entry.consensus_status);
        metrics::record_commit(entry.consensus_status.as_str());
        metrics::set_pending(pending);
    }
}

async fn deliver<P: PeerTransport>(
    transport: &P,
    peer: &ValidatorId,
    message: &Outgoing,
    limit: Duration,
) -> Delivery {
    let send = async {
        match message {
            Outgoing::Transaction(tx) => transport.send_transaction(peer, tx.clone()).await,
            Outgoing::Vote(vote) => transport.send_vote(peer, vote.clone()).await,
        }
    };
    match tokio::time::timeout(limit, send).await {
        Ok(Ok(())) => Delivery::Sent,
        Ok(Err(e)) => {
            debug!(peer = %peer, "[rc-02] Send error: {}", e);
            Delivery::Failed
        }
        Err(_) => Delivery::TimedOut,
    }
}

#[async_trait]
impl<P: PeerTransport> ConsensusApi for ConsensusEngine<P> {
    async fn broadcast(&self, transaction: Transaction) -> ConsensusResult<BroadcastReport> {
        if transaction.observer_id != self.local_id {
            return Err(ConsensusError::ForeignTransaction {
                id: transaction.id,
                observer: transaction.observer_id,
            });
        }
        let transaction = self.sign(transaction)?;
        let transaction_id = transaction.id.clone();
        let self_vote = match self.config.self_vote {
            SelfVotePolicy::Off => None,
            SelfVotePolicy::Counted => Some(Vote::new(
                transaction_id.clone(),
                self.local_id.clone(),
                VoteChoice::Approve,
            )?),
        };

        let (self_tally, pending) = {
            let mut pool = self.pool.lock();
            if pool.is_committed(&transaction_id) {
                return Err(ConsensusError::AlreadyCommitted(transaction_id));
            }
            if !pool.register(transaction.clone(), Instant::now()) {
                return Err(ConsensusError::DuplicateTransaction(transaction_id));
            }
            let tally = self_vote.and_then(|vote| pool.record_vote(vote).ok());
            (tally, pool.pending_count())
        };
        metrics::set_pending(pending);

        let min_targets = self
            .config
            .relevance_fallback_below_quorum
            .then_some(self.threshold);
        let targets = self
            .relevance
            .targets(transaction.subject_asn, &self.peers, min_targets);

        info!(
            tx_id = %transaction_id,
            subject = transaction.subject_asn,
            is_attack = transaction.is_attack,
            targets = targets.len(),
            "[rc-02] 📡 Broadcasting transaction"
        );

        let deliveries = self
            .fan_out(&targets, Outgoing::Transaction(transaction))
            .await;
        let (delivered, failed): (Vec<_>, Vec<_>) = deliveries
            .into_iter()
            .partition(|(_, d)| *d == Delivery::Sent);

        let committed = match self_tally {
            Some(tally) if tally.approve >= self.threshold => {
                self.try_commit(&transaction_id, CommitTrigger::Quorum).await?
            }
            _ => None,
        };

        Ok(BroadcastReport {
            transaction_id,
            targets,
            delivered: delivered.into_iter().map(|(p, _)| p).collect(),
            failed: failed.into_iter().map(|(p, _)| p).collect(),
            committed,
        })
    }

    async fn handle_incoming_transaction(
        &self,
        transaction: Transaction,
    ) -> ConsensusResult<Option<VoteChoice>> {
        let observer = transaction.observer_id.clone();
        if observer == self.local_id {
            debug!(tx_id = %transaction.id, "[rc-02] Ignoring own transaction echoed back");
            return Ok(None);
        }
        if !self.roster.contains(&observer) {
            warn!(tx_id = %transaction.id, observer = %observer, "[rc-02] ⚠️ Transaction from unknown observer");
            return Ok(None);
        }
        if !self.signature_valid(&transaction) {
            warn!(tx_id = %transaction.id, observer = %observer, "[rc-02] ⚠️ Invalid transaction signature, not voting");
            return Ok(None);
        }

        self.relevance.learn(transaction.subject_asn, &observer);

        let Some(choice) = self.knowledge.opinion(&transaction) else {
            debug!(tx_id = %transaction.id, "[rc-02] No local knowledge, abstaining");
            return Ok(None);
        };

        let vote = Vote::new(transaction.id.clone(), self.local_id.clone(), choice)?;
        debug!(tx_id = %transaction.id, observer = %observer, choice = ?choice, "[rc-02] Voting");
        self.fan_out(std::slice::from_ref(&observer), Outgoing::Vote(vote))
            .await;
        Ok(Some(choice))
    }

    async fn handle_incoming_vote(&self, vote: Vote) -> ConsensusResult<VoteOutcome> {
        if !self.roster.contains(&vote.voter_id) {
            return Ok(self.reject(&vote, VoteRejection::UnknownVoter));
        }

        let recorded = self.pool.lock().record_vote(vote.clone());
        let tally = match recorded {
            Ok(tally) => tally,
            Err(rejection) => return Ok(self.reject(&vote, rejection)),
        };

        if vote.is_approve() {
            self.relevance.learn(tally.subject_asn, &vote.voter_id);
        }
        debug!(
            tx_id = %vote.transaction_id,
            voter = %vote.voter_id,
            approve = tally.approve,
            reject = tally.reject,
            "[rc-02] Vote recorded"
        );

        if tally.approve >= self.threshold {
            if let Some(receipt) = self
                .try_commit(&vote.transaction_id, CommitTrigger::Quorum)
                .await?
            {
                return Ok(VoteOutcome::Committed(receipt));
            }
        }

        Ok(VoteOutcome::Recorded {
            approve_count: tally.approve,
            reject_count: tally.reject,
        })
    }

    async fn timeout_sweep(&self) -> ConsensusResult<Vec<CommitReceipt>> {
        let claimed = self.pool.lock().claim_expired(
            Instant::now(),
            self.config.regular_timeout,
            self.config.attack_timeout,
        );
        if claimed.is_empty() {
            return Ok(Vec::new());
        }
        debug!(count = claimed.len(), "[rc-02] Timeout sweep claimed transactions");

        let mut receipts = Vec::with_capacity(claimed.len());
        let mut first_error = None;
        for tracker in claimed {
            match self.commit(tracker, CommitTrigger::Timeout).await {
                Ok(receipt) => receipts.push(receipt),
                Err(e) => {
                    first_error.get_or_insert(e);
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(receipts),
        }
    }

    fn stats(&self) -> EngineStats {
        let (pending, committed) = {
            let pool = self.pool.lock();
            (pool.pending_count(), pool.committed_count())
        };
        self.stats.lock().snapshot(pending, committed)
    }
}
