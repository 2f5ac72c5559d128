//! Attack verdict service.
//!
//! The proposal book sits behind one mutex. The `Voting -> Executed`
//! transition happens under that lock; rewards, penalties, ratings, log
//! writes and peer sends happen after it is released.

use crate::domain::{
    AttackProposal, BookExpiry, ExecutionPolicy, ProposalBook, ProposalStatus, Verdict, VerdictBallot,
    VerdictChoice, VerdictConfig, VerdictRecord, VerdictResult, VerdictVoteOutcome,
};
use crate::metrics;
use crate::ports::{AttackVerdictApi, VerdictLog, VerdictTransport};
use async_trait::async_trait;
use parking_lot::Mutex;
use shared_types::{
    AttackDetector, AttackFinding, RatingStore, RewardLedger, Severity, Transaction, ValidatorId,
};
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};


/// Dependencies for `AttackVerdictConsensus`.
pub struct VerdictDependencies<T> {
    pub local_id: ValidatorId,
    pub validators: Vec<ValidatorId>,
    pub config: VerdictConfig,
    pub transport: Arc<T>,
    pub detector: Arc<dyn AttackDetector>,
    pub rewards: Arc<dyn RewardLedger>,
    pub ratings: Arc<dyn RatingStore>,
    pub log: Arc<dyn VerdictLog>,
}

pub struct AttackVerdictConsensus<T: VerdictTransport> {
    local_id: ValidatorId,
    config: VerdictConfig,
    roster: BTreeSet<ValidatorId>,
    peers: Vec<ValidatorId>,
    book: Mutex<ProposalBook>,
    transport: Arc<T>,
    detector: Arc<dyn AttackDetector>,
    rewards: Arc<dyn RewardLedger>,
    ratings: Arc<dyn RatingStore>,
    log: Arc<dyn VerdictLog>,
}

enum Outgoing {
    Proposal(AttackProposal),
    Ballot(VerdictBallot),
}

/// Confidence a YES vote carries, by the local finding's severity.
fn severity_confidence(severity: Severity) -> f64 {
    match severity {
        Severity::Critical => 1.0,
        Severity::High => 0.9,
        Severity::Medium => 0.7,
        Severity::Low => 0.5,
    }
}

impl<T: VerdictTransport> AttackVerdictConsensus<T> {
    pub fn new(deps: VerdictDependencies<T>) -> VerdictResult<Self> {
        let roster: BTreeSet<ValidatorId> = deps.validators.into_iter().collect();
        deps.config.validate(roster.len())?;
        let peers = roster
            .iter()
            .filter(|v| **v != deps.local_id)
            .cloned()
            .collect();

        Ok(Self {
            local_id: deps.local_id,
            config: deps.config,
            roster,
            peers,
            book: Mutex::new(ProposalBook::new()),
            transport: deps.transport,
            detector: deps.detector,
            rewards: deps.rewards,
            ratings: deps.ratings,
            log: deps.log,
        })
    }

    pub fn local_id(&self) -> &ValidatorId {
        &self.local_id
    }

    pub fn proposal(&self, proposal_id: &str) -> Option<AttackProposal> {
        self.book.lock().get(proposal_id).cloned()
    }

    pub fn proposal_for_transaction(&self, transaction_id: &str) -> Option<AttackProposal> {
        self.book.lock().for_transaction(transaction_id).cloned()
    }

    /// Proposals still collecting votes.
    pub fn open_proposals(&self) -> usize {
        self.book.lock().voting_count()
    }

    pub fn log(&self) -> &Arc<dyn VerdictLog> {
        &self.log
    }

    /// Drop executed proposals and early ballots older than the retention.
    /// Ballots for a dropped proposal are then parked, and expire in turn.
    pub fn expire(&self) -> BookExpiry {
        let expired = self
            .book
            .lock()
            .expire(Instant::now(), self.config.retention);
        if expired != BookExpiry::default() {
            debug!(
                proposals = expired.proposals,
                ballots = expired.ballots,
                "[rc-03] Expired settled proposals"
            );
        }
        expired
    }

    /// Ballots waiting for a proposal this node has not seen.
    pub fn parked_ballots(&self) -> usize {
        self.book.lock().parked_count()
    }

    /// Local detector's vote on a peer's proposal.
    ///
    /// `None` when the detector itself failed; the node then abstains.
    fn local_opinion(&self, proposal: &AttackProposal) -> Option<(VerdictChoice, f64)> {
        let findings = match self.detector.detect(&proposal.observation) {
            Ok(findings) => findings,
            Err(e) => {
                warn!(
                    proposal = %proposal.proposal_id,
                    "[rc-03] Attack detector failed, abstaining: {}",
                    e
                );
                return None;
            }
        };
        let agreeing = findings
            .iter()
            .filter(|f| f.attack_type == proposal.attack.attack_type)
            .map(|f| f.severity)
            .max();
        Some(match agreeing {
            Some(severity) => (VerdictChoice::Yes, severity_confidence(severity)),
            None if findings.is_empty() => (VerdictChoice::No, 1.0),
            // Flagged, but as something else.
            None => (VerdictChoice::No, 0.6),
        })
    }

    async fn fan_out(&self, message: Outgoing) {
        let message = Arc::new(message);
        let limit = self.config.peer_send_timeout;
        let mut tasks = JoinSet::new();

        for peer in &self.peers {
            let transport = Arc::clone(&self.transport);
            let message = Arc::clone(&message);
            let peer = peer.clone();
            tasks.spawn(async move {
                let send = async {
                    match message.as_ref() {
                        Outgoing::Proposal(p) => transport.send_proposal(&peer, p.clone()).await,
                        Outgoing::Ballot(b) => transport.send_ballot(&peer, b.clone()).await,
                    }
                };
                let result = match tokio::time::timeout(limit, send).await {
                    Ok(result) => result,
                    Err(_) => Err(format!("timed out after {:?}", limit)),
                };
                (peer, result)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((_, Ok(()))) => {}
                Ok((peer, Err(e))) => {
                    warn!(peer = %peer, "[rc-03] Verdict message not delivered: {}", e)
                }
                Err(e) => error!("[rc-03] Verdict send task failed: {}", e),
            }
        }
    }

    fn should_execute(&self, proposal: &AttackProposal) -> bool {
        match self.config.execution {
            ExecutionPolicy::ProposerOnly => proposal.proposer_id == self.local_id,
            ExecutionPolicy::Everywhere => true,
        }
    }

    /// Rewards, penalties and ratings for an executed verdict.
    /// Collaborator failures are logged; the verdict stands.
    fn apply_side_effects(&self, proposal: &AttackProposal, verdict: Verdict) {
        let report = |what: &str, result: Result<(), String>| {
            if let Err(e) = result {
                warn!(proposal = %proposal.proposal_id, "[rc-03] {} failed: {}", what, e);
            }
        };

        match verdict {
            Verdict::AttackConfirmed => {
                report(
                    "Rating update",
                    self.ratings.record_attack(
                        proposal.subject_asn,
                        &proposal.attack.attack_type,
                        &proposal.attack.details,
                    ),
                );
                report(
                    "Proposer reward",
                    self.rewards.award_special_reward(
                        &proposal.proposer_id,
                        self.config.proposer_reward,
                        "attack_proposal_confirmed",
                    ),
                );
                for voter in proposal.voters(VerdictChoice::Yes) {
                    report(
                        "Voter reward",
                        self.rewards.award_special_reward(
                            &voter,
                            self.config.voter_reward,
                            "attack_vote_correct",
                        ),
                    );
                }
            }
            Verdict::NotAttack => {
                report(
                    "False accusation penalty",
                    self.rewards.apply_penalty(
                        &proposal.proposer_id,
                        self.config.false_accusation_penalty,
                        "false_attack_accusation",
                    ),
                );
                for voter in proposal.voters(VerdictChoice::No) {
                    report(
                        "Voter reward",
                        self.rewards.award_special_reward(
                            &voter,
                            self.config.voter_reward,
                            "attack_vote_correct",
                        ),
                    );
                }
            }
            Verdict::Disputed => {}
        }
    }
}

#[async_trait]
impl<T: VerdictTransport> AttackVerdictApi for AttackVerdictConsensus<T> {
    async fn propose_attack(
        &self,
        transaction: &Transaction,
        attack: AttackFinding,
    ) -> VerdictResult<Option<AttackProposal>> {
        let proposal = AttackProposal::new(self.local_id.clone(), transaction, attack);
        let inserted = self.book.lock().insert(proposal.clone());
        if !inserted {
            debug!(tx_id = %transaction.id, "[rc-03] Proposal already exists for transaction");
            return Ok(None);
        }

        info!(
            proposal = %proposal.proposal_id,
            tx_id = %transaction.id,
            subject = proposal.subject_asn,
            attack = %proposal.attack.attack_type,
            "[rc-03] 🚨 Attack proposed"
        );
        metrics::record_proposal();
        self.fan_out(Outgoing::Proposal(proposal.clone())).await;
        self.check_consensus(&proposal.proposal_id).await?;
        Ok(Some(proposal))
    }

    async fn handle_incoming_proposal(
        &self,
        mut proposal: AttackProposal,
    ) -> VerdictResult<Option<VerdictChoice>> {
        if !self.roster.contains(&proposal.proposer_id) {
            warn!(
                proposal = %proposal.proposal_id,
                proposer = %proposal.proposer_id,
                "[rc-03] ⚠️ Proposal from unknown proposer"
            );
            return Ok(None);
        }

        // Only the proposer's own vote travels with the proposal; every
        // other vote must arrive as its own ballot.
        proposal.votes.retain(|voter, _| *voter == proposal.proposer_id);
        proposal.status = ProposalStatus::Voting;
        let proposal_id = proposal.proposal_id.clone();

        let known = {
            let mut book = self.book.lock();
            match book.get(&proposal_id) {
                Some(existing) => Some(existing.votes.contains_key(&self.local_id)),
                None => {
                    if !book.insert(proposal.clone()) {
                        debug!(
                            proposal = %proposal_id,
                            tx_id = %proposal.transaction_id,
                            "[rc-03] Competing proposal for transaction ignored"
                        );
                        return Ok(None);
                    }
                    None
                }
            }
        };
        if known == Some(true) {
            return Ok(None);
        }

        let Some((choice, confidence)) = self.local_opinion(&proposal) else {
            // Parked ballots may already have completed the vote.
            self.check_consensus(&proposal_id).await?;
            return Ok(None);
        };
        let outcome = self.cast_vote(&proposal_id, &self.local_id, choice, confidence);
        if !matches!(outcome, VerdictVoteOutcome::Recorded { .. }) {
            return Ok(None);
        }

        debug!(proposal = %proposal_id, choice = ?choice, "[rc-03] Verdict vote cast");
        self.fan_out(Outgoing::Ballot(VerdictBallot {
            proposal_id: proposal_id.clone(),
            voter_id: self.local_id.clone(),
            choice,
            confidence,
        }))
        .await;
        self.check_consensus(&proposal_id).await?;
        Ok(Some(choice))
    }

    async fn handle_incoming_ballot(
        &self,
        ballot: VerdictBallot,
    ) -> VerdictResult<Option<VerdictRecord>> {
        match self.cast_vote(
            &ballot.proposal_id,
            &ballot.voter_id,
            ballot.choice,
            ballot.confidence,
        ) {
            VerdictVoteOutcome::Recorded { .. } => self.check_consensus(&ballot.proposal_id).await,
            VerdictVoteOutcome::UnknownProposal => {
                // Ballots can overtake the proposal they refer to.
                if !self.book.lock().park(ballot, Instant::now()) {
                    warn!("[rc-03] Early ballot dropped, park is full");
                }
                Ok(None)
            }
            _ => Ok(None),
        }
    }

    fn cast_vote(
        &self,
        proposal_id: &str,
        voter: &ValidatorId,
        choice: VerdictChoice,
        confidence: f64,
    ) -> VerdictVoteOutcome {
        if !self.roster.contains(voter) {
            warn!(proposal = %proposal_id, voter = %voter, "[rc-03] ⚠️ Verdict vote from unknown voter");
            return VerdictVoteOutcome::UnknownVoter;
        }
        let outcome = self
            .book
            .lock()
            .cast_vote(proposal_id, voter, choice, confidence);
        match outcome {
            VerdictVoteOutcome::Duplicate => {
                debug!(proposal = %proposal_id, voter = %voter, "[rc-03] Duplicate verdict vote ignored")
            }
            VerdictVoteOutcome::Closed => {
                debug!(proposal = %proposal_id, voter = %voter, "[rc-03] Vote on executed proposal ignored")
            }
            _ => {}
        }
        outcome
    }

    async fn check_consensus(&self, proposal_id: &str) -> VerdictResult<Option<VerdictRecord>> {
        let executed = self
            .book
            .lock()
            .try_execute(proposal_id, self.config.min_votes, Instant::now());
        let Some(proposal) = executed else {
            return Ok(None);
        };

        let outcome = proposal.outcome();
        let apply = outcome.verdict != Verdict::Disputed && self.should_execute(&proposal);
        if apply {
            self.apply_side_effects(&proposal, outcome.verdict);
        }

        let record = VerdictRecord::new(&proposal, outcome, self.local_id.clone(), apply);
        metrics::record_verdict(&outcome.verdict.to_string());
        info!(
            proposal = %proposal.proposal_id,
            tx_id = %proposal.transaction_id,
            verdict = %outcome.verdict,
            confidence = %format!("{:.3}", outcome.confidence),
            yes = outcome.yes_votes,
            no = outcome.no_votes,
            side_effects = apply,
            "[rc-03] ⚖️ Verdict executed"
        );

        if let Err(e) = self.log.append(&record) {
            error!(proposal = %proposal.proposal_id, "[rc-03] Verdict log append failed: {}", e);
            return Err(e);
        }
        Ok(Some(record))
    }
}
