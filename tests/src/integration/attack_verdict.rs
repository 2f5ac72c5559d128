//! # Attack Verdict Flow
//!
//! Three validators over the in-memory network, real reward and rating
//! stores from the node runtime:
//!
//! 1. `validator-1` proposes (its own YES counts)
//! 2. Peers re-run their detector on the same announcement and broadcast a ballot
//! 3. Every node computes the verdict; only the proposer applies side effects

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::Arc;

    use parking_lot::Mutex;

    use node_runtime::adapters::{HeuristicDetector, InMemoryRatingStore, InMemoryRewardLedger};
    use node_runtime::wiring::{Inbox, InMemoryNetwork, PeerMessage};
    use rc_03_attack_verdict::{
        AttackVerdictApi, AttackVerdictConsensus, JsonlVerdictLog, MemoryVerdictLog, Verdict,
        VerdictConfig, VerdictDependencies, VerdictLog, VerdictRecord,
    };
    use shared_types::{AttackDetector, AttackFinding, Observation, Transaction, ValidatorId};

    use crate::integration::harness::{ids, observation};

    type Verdicts = AttackVerdictConsensus<InMemoryNetwork>;

    /// Detector that never sees an attack.
    struct Blind;

    impl AttackDetector for Blind {
        fn detect(&self, _: &Observation) -> Result<Vec<AttackFinding>, String> {
            Ok(vec![])
        }
    }

    struct Node {
        verdicts: Arc<Verdicts>,
        inbox: Mutex<Inbox>,
    }

    struct VerdictNet {
        network: Arc<InMemoryNetwork>,
        rewards: Arc<InMemoryRewardLedger>,
        ratings: Arc<InMemoryRatingStore>,
        nodes: BTreeMap<ValidatorId, Node>,
    }

    impl VerdictNet {
        /// One node per detector, named `validator-1..`.
        fn new(detectors: Vec<Arc<dyn AttackDetector>>, logs: Vec<Arc<dyn VerdictLog>>) -> Self {
            let roster = ids(&["validator-1", "validator-2", "validator-3"]);
            let network = Arc::new(InMemoryNetwork::new());
            let rewards = Arc::new(InMemoryRewardLedger::default());
            let ratings = Arc::new(InMemoryRatingStore::new());

            let nodes = roster
                .iter()
                .zip(detectors.into_iter().zip(logs))
                .map(|(id, (detector, log))| {
                    let verdicts = AttackVerdictConsensus::new(VerdictDependencies {
                        local_id: id.clone(),
                        validators: roster.clone(),
                        config: VerdictConfig::default(),
                        transport: Arc::clone(&network),
                        detector,
                        rewards: rewards.clone(),
                        ratings: ratings.clone(),
                        log,
                    })
                    .unwrap();
                    let node = Node {
                        verdicts: Arc::new(verdicts),
                        inbox: Mutex::new(network.register(id.clone())),
                    };
                    (id.clone(), node)
                })
                .collect();

            Self {
                network,
                rewards,
                ratings,
                nodes,
            }
        }

        fn node(&self, id: &str) -> &Arc<Verdicts> {
            &self.nodes[&ValidatorId::new(id)].verdicts
        }

        /// Handle everything queued for `id`; returns verdicts it executed.
        async fn deliver(&self, id: &str) -> Vec<VerdictRecord> {
            let node = &self.nodes[&ValidatorId::new(id)];
            let queued: Vec<PeerMessage> = {
                let mut inbox = node.inbox.lock();
                std::iter::from_fn(|| inbox.try_recv().ok()).collect()
            };

            let mut executed = Vec::new();
            for message in queued {
                match message {
                    PeerMessage::Proposal(proposal) => {
                        node.verdicts.handle_incoming_proposal(proposal).await.unwrap();
                    }
                    PeerMessage::Ballot(ballot) => {
                        if let Some(record) = node.verdicts.handle_incoming_ballot(ballot).await.unwrap() {
                            executed.push(record);
                        }
                    }
                    PeerMessage::Transaction(_) | PeerMessage::Vote(_) | PeerMessage::Committed(_) => {}
                }
                self.network.complete();
            }
            executed
        }
    }

    fn memory_logs() -> Vec<Arc<dyn VerdictLog>> {
        (0..3)
            .map(|_| Arc::new(MemoryVerdictLog::new()) as Arc<dyn VerdictLog>)
            .collect()
    }

    fn hijack() -> (Transaction, AttackFinding) {
        let observation = observation(64666, "192.0.2.0/24", true);
        let finding = HeuristicDetector::new().detect(&observation).unwrap().remove(0);
        let tx = Transaction::new(
            ValidatorId::new("validator-1"),
            &observation,
            vec![finding.clone()],
            None,
        )
        .unwrap();
        (tx, finding)
    }

    #[tokio::test]
    async fn test_two_yes_one_no_confirms_attack() {
        let heuristic: Arc<dyn AttackDetector> = Arc::new(HeuristicDetector::new());
        let net = VerdictNet::new(
            vec![heuristic.clone(), heuristic, Arc::new(Blind)],
            memory_logs(),
        );
        let (tx, finding) = hijack();

        let proposal = net
            .node("validator-1")
            .propose_attack(&tx, finding)
            .await
            .unwrap()
            .expect("new proposal");
        net.deliver("validator-2").await;
        net.deliver("validator-3").await;
        let executed = net.deliver("validator-1").await;

        assert_eq!(executed.len(), 1);
        let record = &executed[0];
        assert_eq!(record.proposal_id, proposal.proposal_id);
        assert_eq!(record.verdict, Verdict::AttackConfirmed);
        assert!((record.confidence - 2.0 / 3.0).abs() < 1e-3);
        assert_eq!((record.yes_votes, record.no_votes), (2, 1));
        assert!(record.side_effects_applied);

        let proposer_rewards = net.rewards.events("attack_proposal_confirmed");
        assert_eq!(proposer_rewards.len(), 1);
        assert_eq!(proposer_rewards[0].validator.as_str(), "validator-1");
        let mut yes_voters: Vec<_> = net
            .rewards
            .events("attack_vote_correct")
            .into_iter()
            .map(|e| e.validator)
            .collect();
        yes_voters.sort();
        assert_eq!(yes_voters, ids(&["validator-1", "validator-2"]));

        let rating = net.ratings.rating(64666).unwrap();
        assert_eq!(rating.attacks.len(), 1);
        assert_eq!(rating.attacks[0].attack_type, "prefix_hijack");

        // The late ballot changes nothing on the proposer.
        net.deliver("validator-2").await;
        assert!(net.node("validator-1").check_consensus(&proposal.proposal_id).await.unwrap().is_none());
        assert_eq!(net.ratings.rating(64666).unwrap().attacks.len(), 1);
    }

    #[tokio::test]
    async fn test_every_node_logs_the_same_verdict() {
        let heuristic: Arc<dyn AttackDetector> = Arc::new(HeuristicDetector::new());
        let net = VerdictNet::new(
            vec![heuristic.clone(), heuristic, Arc::new(Blind)],
            memory_logs(),
        );
        let (tx, finding) = hijack();
        net.node("validator-1").propose_attack(&tx, finding).await.unwrap();

        for _ in 0..2 {
            for id in ["validator-2", "validator-3", "validator-1"] {
                net.deliver(id).await;
            }
        }
        assert_eq!(net.network.in_flight(), 0);

        for id in ["validator-1", "validator-2", "validator-3"] {
            let records = net.node(id).log().records().unwrap();
            assert_eq!(records.len(), 1, "{}", id);
            assert_eq!(records[0].verdict, Verdict::AttackConfirmed);
            assert_eq!(records[0].side_effects_applied, id == "validator-1");
        }
        assert_eq!(net.rewards.events("attack_proposal_confirmed").len(), 1);
    }

    #[tokio::test]
    async fn test_false_accusation_penalises_proposer() {
        let net = VerdictNet::new(
            vec![
                Arc::new(HeuristicDetector::new()),
                Arc::new(Blind),
                Arc::new(Blind),
            ],
            memory_logs(),
        );
        let (tx, finding) = hijack();
        net.node("validator-1").propose_attack(&tx, finding).await.unwrap();
        net.deliver("validator-2").await;
        net.deliver("validator-3").await;
        let executed = net.deliver("validator-1").await;

        assert_eq!(executed[0].verdict, Verdict::NotAttack);
        assert!((executed[0].confidence - 2.0 / 3.0).abs() < 1e-3);

        let penalties = net.rewards.events("false_attack_accusation");
        assert_eq!(penalties.len(), 1);
        assert_eq!(penalties[0].validator.as_str(), "validator-1");
        assert!(penalties[0].amount < 0.0);
        let mut no_voters: Vec<_> = net
            .rewards
            .events("attack_vote_correct")
            .into_iter()
            .map(|e| e.validator)
            .collect();
        no_voters.sort();
        assert_eq!(no_voters, ids(&["validator-2", "validator-3"]));
        assert!(net.ratings.rating(64666).is_none());
    }

    #[tokio::test]
    async fn test_verdicts_persist_as_jsonl() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("verdicts").join("validator-1.jsonl");
        let mut logs = memory_logs();
        logs[0] = Arc::new(JsonlVerdictLog::open(&path).unwrap());

        let heuristic: Arc<dyn AttackDetector> = Arc::new(HeuristicDetector::new());
        let net = VerdictNet::new(vec![heuristic.clone(), heuristic.clone(), heuristic], logs);
        let (tx, finding) = hijack();
        net.node("validator-1").propose_attack(&tx, finding).await.unwrap();
        net.deliver("validator-2").await;
        net.deliver("validator-3").await;
        net.deliver("validator-1").await;

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 1);
        let record: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(record["transaction_id"], tx.id);
        assert_eq!(record["yes_votes"], 3);

        let reopened = JsonlVerdictLog::open(&path).unwrap();
        assert_eq!(reopened.records().unwrap().len(), 1);
    }
}
