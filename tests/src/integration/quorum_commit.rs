//! # Quorum Commit Flow
//!
//! Nine validators, fixed quorum of three:
//!
//! 1. `validator-1` broadcasts an observation to every peer
//! 2. Peers verify the HMAC signature and vote back to the observer only
//! 3. The third approve commits a `Confirmed` block to the shared ledger
//! 4. Every replica re-hashes and accepts the block
//! 5. Votes arriving after the commit are rejected as stale

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use rc_01_ledger::Ledger;
    use rc_02_tx_consensus::{
        CommitTrigger, ConsensusApi, ConsensusConfig, QuorumPolicy, VoteOutcome, VoteRejection,
    };
    use shared_types::{ConsensusStatus, Signature, ValidatorId, VoteChoice};

    use crate::integration::harness::{harness, ids, transaction};

    fn nine_validators() -> ConsensusConfig {
        ConsensusConfig {
            quorum: QuorumPolicy::Fixed(3),
            ..ConsensusConfig::default()
        }
    }

    #[tokio::test]
    async fn test_three_approvals_commit_confirmed() {
        let h = harness(9, nine_validators(), Some(VoteChoice::Approve));

        let report = h
            .engine("validator-1")
            .broadcast(transaction("validator-1", 64500, false))
            .await
            .unwrap();
        assert_eq!(report.delivered.len(), 8);
        assert!(report.committed.is_none());

        for peer in ["validator-2", "validator-3", "validator-4"] {
            assert!(h.deliver(peer).await.is_empty());
        }
        let outcomes = h.deliver("validator-1").await;
        assert_eq!(outcomes.len(), 3);
        assert!(matches!(outcomes[0], VoteOutcome::Recorded { approve_count: 1, .. }));
        assert!(matches!(outcomes[1], VoteOutcome::Recorded { approve_count: 2, .. }));
        let receipt = match &outcomes[2] {
            VoteOutcome::Committed(receipt) => receipt.clone(),
            other => panic!("expected commit, got {:?}", other),
        };
        assert_eq!(receipt.status, ConsensusStatus::Confirmed);
        assert_eq!(receipt.trigger, CommitTrigger::Quorum);
        assert_eq!(receipt.block_number, 1);

        let block = h.ledger.tip().unwrap();
        let entry = &block.transactions[0];
        assert_eq!(entry.transaction.id, report.transaction_id);
        assert_eq!(entry.approve_count, 3);
        assert_eq!(entry.signatures.len(), 3);
        assert_eq!(
            entry.approving_voters(),
            ids(&["validator-2", "validator-3", "validator-4"])
        );

        assert!(h.replica_tips_agree());
        assert!(h.ledger.replicas().diverged().is_empty());
        assert!(h.ledger.verify_integrity().valid);
    }

    #[tokio::test]
    async fn test_votes_after_commit_are_stale() {
        let h = harness(9, nine_validators(), Some(VoteChoice::Approve));
        let tx_id = h
            .engine("validator-1")
            .broadcast(transaction("validator-1", 64501, false))
            .await
            .unwrap()
            .transaction_id;

        for peer in ["validator-2", "validator-3", "validator-4"] {
            h.deliver(peer).await;
        }
        h.deliver("validator-1").await;
        assert!(h.engine("validator-1").is_committed(&tx_id));

        for peer in ["validator-5", "validator-6", "validator-7", "validator-8", "validator-9"] {
            h.deliver(peer).await;
        }
        let late = h.deliver("validator-1").await;
        assert_eq!(late.len(), 5);
        assert!(late
            .iter()
            .all(|o| *o == VoteOutcome::Rejected(VoteRejection::AlreadyCommitted)));

        let stats = h.engine("validator-1").stats();
        assert_eq!(stats.stale_votes, 5);
        assert_eq!(stats.confirmed, 1);
        assert_eq!(stats.pending, 0);
        assert_eq!(h.ledger.transaction_count(), 1);
    }

    #[tokio::test]
    async fn test_commit_rewards_committer_and_voters() {
        let h = harness(9, nine_validators(), Some(VoteChoice::Approve));
        h.engine("validator-1")
            .broadcast(transaction("validator-1", 64502, false))
            .await
            .unwrap();
        for peer in ["validator-2", "validator-3", "validator-4"] {
            h.deliver(peer).await;
        }
        h.deliver("validator-1").await;

        let commits = h.rewards.events("block_commit");
        assert_eq!(commits.len(), 1);
        assert_eq!(commits[0].validator.as_str(), "validator-1");
        // First commit for this subject carries the bonus.
        assert_eq!(commits[0].amount, 15.0);
        assert_eq!(h.rewards.events("approving_vote").len(), 3);

        let rating = h.ratings.rating(64502).unwrap();
        assert_eq!(rating.good_events, 1);
    }

    #[tokio::test]
    async fn test_rejections_never_reach_quorum() {
        let h = harness(9, nine_validators(), Some(VoteChoice::Reject));
        let tx_id = h
            .engine("validator-1")
            .broadcast(transaction("validator-1", 64503, false))
            .await
            .unwrap()
            .transaction_id;

        for i in 2..=9 {
            h.deliver(&format!("validator-{}", i)).await;
        }
        let outcomes = h.deliver("validator-1").await;
        assert_eq!(outcomes.len(), 8);
        assert!(h.engine("validator-1").is_pending(&tx_id));
        assert_eq!(h.engine("validator-1").pending_votes(&tx_id), Some((0, 8)));
        assert_eq!(h.ledger.block_count(), 1);
    }

    #[tokio::test]
    async fn test_partitioned_peers_do_not_block_broadcast() {
        let config = ConsensusConfig {
            peer_send_timeout: Duration::from_millis(200),
            ..nine_validators()
        };
        let h = harness(9, config, Some(VoteChoice::Approve));
        for peer in ["validator-2", "validator-3"] {
            h.network.partition(&ValidatorId::new(peer));
        }

        let report = h
            .engine("validator-1")
            .broadcast(transaction("validator-1", 64504, false))
            .await
            .unwrap();
        let mut failed = report.failed.clone();
        failed.sort();
        assert_eq!(failed, ids(&["validator-2", "validator-3"]));
        assert_eq!(report.delivered.len(), 6);

        let stats = h.engine("validator-1").stats();
        let peer = &stats.peers[&ValidatorId::new("validator-2")];
        assert_eq!(peer.failed, 1);
        assert_eq!(peer.sent, 0);

        for peer in ["validator-4", "validator-5", "validator-6"] {
            h.deliver(peer).await;
        }
        h.deliver("validator-1").await;
        assert_eq!(h.ledger.transaction_count(), 1);
    }

    #[tokio::test]
    async fn test_forged_signature_gets_no_vote() {
        let h = harness(9, nine_validators(), Some(VoteChoice::Approve));
        let mut forged = transaction("validator-1", 64505, false);
        forged.signature = Some(Signature {
            signer: ValidatorId::new("validator-1"),
            bytes: vec![0u8; 32],
        });

        let choice = h
            .engine("validator-2")
            .handle_incoming_transaction(forged)
            .await
            .unwrap();
        assert!(choice.is_none());
        assert!(h.deliver("validator-1").await.is_empty());
    }
}
