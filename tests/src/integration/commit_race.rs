//! # Concurrency Races
//!
//! Several engines append into one replicated ledger at once, quorum votes
//! race the timeout sweep, and one voter's vote is replayed from many tasks.
//! Each race must leave exactly one effect behind.

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use rc_01_ledger::Ledger;
    use rc_02_tx_consensus::{
        ConsensusApi, ConsensusConfig, QuorumPolicy, SelfVotePolicy, VoteOutcome, VoteRejection,
    };
    use shared_types::VoteChoice;

    use crate::integration::harness::{harness, transaction, vote};

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_commits_keep_chain_linked() {
        // Every broadcast commits on its own self-vote.
        let config = ConsensusConfig {
            quorum: QuorumPolicy::Fixed(1),
            self_vote: SelfVotePolicy::Counted,
            ..ConsensusConfig::default()
        };
        let h = harness(4, config, None);
        let per_engine = 25u32;

        let mut tasks = Vec::new();
        for (n, validator) in h.validators.values().enumerate() {
            let engine = Arc::clone(&validator.engine);
            let observer = validator.id.as_str().to_string();
            tasks.push(tokio::spawn(async move {
                for i in 0..per_engine {
                    let subject = 65000 + n as u32 * 100 + i;
                    let report = engine.broadcast(transaction(&observer, subject, false)).await.unwrap();
                    assert!(report.committed.is_some());
                }
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        let total = 4 * per_engine as usize;
        assert_eq!(h.ledger.transaction_count(), total);
        assert_eq!(h.ledger.block_count(), total + 1);
        for number in 1..=total as u64 {
            assert_eq!(h.ledger.block(number).unwrap().block_number, number);
        }
        assert!(h.ledger.verify_integrity().valid);
        assert!(h.ledger.replicas().diverged().is_empty());
        assert!(h.replica_tips_agree());
        for report in h.ledger.replicas().verify_all().values() {
            assert!(report.valid);
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_quorum_vote_and_sweep_commit_once() {
        let config = ConsensusConfig {
            quorum: QuorumPolicy::Fixed(3),
            regular_timeout: Duration::from_millis(10),
            attack_timeout: Duration::from_millis(20),
            ..ConsensusConfig::default()
        };
        let h = harness(5, config, Some(VoteChoice::Approve));
        let observer = Arc::clone(h.engine("validator-1"));
        let rounds = 20u32;

        for round in 0..rounds {
            let tx_id = observer
                .broadcast(transaction("validator-1", 64600 + round, false))
                .await
                .unwrap()
                .transaction_id;
            for voter in ["validator-2", "validator-3"] {
                observer
                    .handle_incoming_vote(vote(&tx_id, voter, VoteChoice::Approve))
                    .await
                    .unwrap();
            }
            tokio::time::sleep(Duration::from_millis(12)).await;

            let voter = Arc::clone(&observer);
            let sweeper = Arc::clone(&observer);
            let last_vote = vote(&tx_id, "validator-4", VoteChoice::Approve);
            let vote_task = tokio::spawn(async move { voter.handle_incoming_vote(last_vote).await });
            let sweep_task = tokio::spawn(async move { sweeper.timeout_sweep().await });

            let by_vote = matches!(vote_task.await.unwrap().unwrap(), VoteOutcome::Committed(_));
            let by_sweep = sweep_task
                .await
                .unwrap()
                .unwrap()
                .iter()
                .filter(|r| r.transaction_id == tx_id)
                .count();
            assert_eq!(by_vote as usize + by_sweep, 1, "round {}", round);
        }

        assert_eq!(h.ledger.transaction_count(), rounds as usize);
        assert!(h.ledger.verify_integrity().valid);
        assert!(h.replica_tips_agree());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_replayed_vote_from_many_tasks_counts_once() {
        let config = ConsensusConfig {
            quorum: QuorumPolicy::Fixed(3),
            ..ConsensusConfig::default()
        };
        let h = harness(9, config, Some(VoteChoice::Approve));
        let observer = Arc::clone(h.engine("validator-1"));
        let tx_id = observer
            .broadcast(transaction("validator-1", 64700, false))
            .await
            .unwrap()
            .transaction_id;

        let tasks: Vec<_> = (0..16)
            .map(|_| {
                let engine = Arc::clone(&observer);
                let replay = vote(&tx_id, "validator-2", VoteChoice::Approve);
                tokio::spawn(async move { engine.handle_incoming_vote(replay).await.unwrap() })
            })
            .collect();

        let mut recorded = 0;
        let mut replays = 0;
        for task in tasks {
            match task.await.unwrap() {
                VoteOutcome::Recorded { .. } => recorded += 1,
                VoteOutcome::Rejected(VoteRejection::Replay) => replays += 1,
                other => panic!("unexpected outcome {:?}", other),
            }
        }
        assert_eq!((recorded, replays), (1, 15));
        assert_eq!(observer.pending_votes(&tx_id), Some((1, 1)));
        assert_eq!(observer.stats().replay_rejections, 15);
    }
}
