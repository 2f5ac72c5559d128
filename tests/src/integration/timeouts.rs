//! # Timeout-Driven Commits
//!
//! Transactions that never reach quorum are still written once their class
//! timeout elapses, annotated with how much agreement they collected.
//! Attack-flagged transactions wait for the longer attack timeout.
//!
//! Runs on a paused tokio clock; `advance` stands in for wall time.

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use rc_01_ledger::Ledger;
    use rc_02_tx_consensus::{
        CommitTrigger, ConsensusApi, ConsensusConfig, QuorumPolicy, VoteOutcome, VoteRejection,
    };
    use shared_types::{ConsensusStatus, VoteChoice};

    use crate::integration::harness::{harness, transaction, vote};

    const REGULAR: Duration = Duration::from_secs(60);
    const ATTACK: Duration = Duration::from_secs(180);

    fn config() -> ConsensusConfig {
        ConsensusConfig {
            quorum: QuorumPolicy::Fixed(3),
            regular_timeout: REGULAR,
            attack_timeout: ATTACK,
            ..ConsensusConfig::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_vote_commits_insufficient_at_timeout() {
        let h = harness(9, config(), Some(VoteChoice::Approve));
        let observer = h.engine("validator-1");
        let tx_id = observer
            .broadcast(transaction("validator-1", 64510, false))
            .await
            .unwrap()
            .transaction_id;

        h.deliver("validator-2").await;
        h.deliver("validator-1").await;
        assert_eq!(observer.pending_votes(&tx_id), Some((1, 1)));

        tokio::time::advance(REGULAR - Duration::from_secs(1)).await;
        assert!(observer.timeout_sweep().await.unwrap().is_empty());

        tokio::time::advance(Duration::from_secs(2)).await;
        let receipts = observer.timeout_sweep().await.unwrap();
        assert_eq!(receipts.len(), 1);
        assert_eq!(receipts[0].status, ConsensusStatus::InsufficientConsensus);
        assert_eq!(receipts[0].approve_count, 1);
        assert_eq!(receipts[0].trigger, CommitTrigger::Timeout);

        let entry = &h.ledger.tip().unwrap().transactions[0];
        assert_eq!(entry.consensus_status, ConsensusStatus::InsufficientConsensus);
        assert_eq!(entry.approve_count, 1);
        assert!(h.replica_tips_agree());

        // Peers that answer late find the transaction already written.
        h.deliver("validator-3").await;
        let late = h.deliver("validator-1").await;
        assert_eq!(late, vec![VoteOutcome::Rejected(VoteRejection::AlreadyCommitted)]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_votes_commits_single_witness() {
        let h = harness(9, config(), None);
        let observer = h.engine("validator-1");
        observer
            .broadcast(transaction("validator-1", 64511, false))
            .await
            .unwrap();
        for i in 2..=9 {
            h.deliver(&format!("validator-{}", i)).await;
        }
        assert!(h.deliver("validator-1").await.is_empty());

        tokio::time::advance(REGULAR + Duration::from_secs(1)).await;
        let receipts = observer.timeout_sweep().await.unwrap();
        assert_eq!(receipts[0].status, ConsensusStatus::SingleWitness);
        assert_eq!(observer.stats().single_witness, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_attack_replay_rejected_and_waits_for_attack_timeout() {
        let h = harness(9, config(), Some(VoteChoice::Approve));
        let observer = h.engine("validator-1");
        let tx_id = observer
            .broadcast(transaction("validator-1", 64666, true))
            .await
            .unwrap()
            .transaction_id;

        h.deliver("validator-2").await;
        h.deliver("validator-3").await;
        h.deliver("validator-1").await;
        assert_eq!(observer.pending_votes(&tx_id), Some((2, 2)));

        tokio::time::advance(Duration::from_secs(30)).await;
        let replay = observer
            .handle_incoming_vote(vote(&tx_id, "validator-2", VoteChoice::Approve))
            .await
            .unwrap();
        assert_eq!(replay, VoteOutcome::Rejected(VoteRejection::Replay));
        assert_eq!(observer.pending_votes(&tx_id), Some((2, 2)));
        assert_eq!(observer.stats().replay_rejections, 1);

        // Past the regular timeout an attack is still pending.
        tokio::time::advance(REGULAR).await;
        assert!(observer.timeout_sweep().await.unwrap().is_empty());
        assert!(observer.is_pending(&tx_id));

        // The replay did not restart the clock: 180s after broadcast it resolves.
        tokio::time::advance(ATTACK - REGULAR - Duration::from_secs(30)).await;
        let receipts = observer.timeout_sweep().await.unwrap();
        assert_eq!(receipts.len(), 1);
        assert_eq!(receipts[0].status, ConsensusStatus::InsufficientConsensus);
        assert_eq!(receipts[0].approve_count, 2);

        let entry = &h.ledger.tip().unwrap().transactions[0];
        assert!(entry.transaction.is_attack);
        assert_eq!(entry.signatures.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_quorum_after_nominal_timeout_is_confirmed() {
        let h = harness(9, config(), Some(VoteChoice::Approve));
        let observer = h.engine("validator-1");
        let tx_id = observer
            .broadcast(transaction("validator-1", 64512, false))
            .await
            .unwrap()
            .transaction_id;

        for peer in ["validator-2", "validator-3", "validator-4"] {
            h.deliver(peer).await;
        }
        tokio::time::advance(REGULAR + Duration::from_secs(5)).await;

        // The sweep has not run yet, so the quorum vote still wins.
        let outcomes = h.deliver("validator-1").await;
        assert!(matches!(outcomes.last(), Some(VoteOutcome::Committed(_))));
        assert!(observer.timeout_sweep().await.unwrap().is_empty());
        assert!(observer.is_committed(&tx_id));
        assert_eq!(h.ledger.tip().unwrap().transactions[0].consensus_status, ConsensusStatus::Confirmed);
    }
}
