//! # Full Node Runtime
//!
//! The default nine-validator cluster with its dispatchers and maintenance
//! loops running, fed from a JSONL observation file, persisted to disk.

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use rc_01_ledger::Ledger;
    use node_runtime::adapters::Roa;
    use node_runtime::{NodeConfig, ObservationRecord, ValidatorCluster};
    use rc_03_attack_verdict::Verdict;
    use shared_types::{ConsensusStatus, Observation, ValidatorId};

    const SETTLE: Duration = Duration::from_secs(10);

    fn line(subject: u32, prefix: &str, label: &str, observed_by: &[&str], ts: u64) -> String {
        let record = ObservationRecord {
            observed_by: observed_by.iter().map(|id| ValidatorId::new(*id)).collect(),
            observation: Observation {
                subject_asn: subject,
                prefix: prefix.to_string(),
                as_path: vec![174, subject],
                timestamp: ts,
                is_attack: false,
                label: label.to_string(),
            },
        };
        serde_json::to_string(&record).unwrap()
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_feed_replay_commits_and_judges() {
        let dir = tempfile::tempdir().unwrap();
        let feed = dir.path().join("observations.jsonl");
        let lines = [
            line(13335, "1.1.1.0/24", "", &[], 1_700_000_000),
            line(15169, "8.8.8.0/24", "", &[], 1_700_000_001),
            // Origin does not match the ROA, so the detector flags a hijack.
            line(64666, "8.8.8.0/24", "", &["validator-4", "validator-5", "validator-6", "validator-7"], 1_700_000_002),
        ];
        std::fs::write(&feed, lines.join("\n")).unwrap();

        let config = NodeConfig {
            data_dir: Some(dir.path().join("data")),
            roas: vec![Roa {
                prefix: "8.8.8.0/24".into(),
                max_length: 24,
                origin: 15169,
            }],
            ..NodeConfig::default()
        };
        let cluster = ValidatorCluster::build(config.clone()).unwrap();
        cluster.start();

        let summary = cluster.replay_file(&feed).await.unwrap();
        assert_eq!(summary.submitted, 3);
        assert!(cluster.settle(SETTLE).await);

        let ledger = cluster.ledger();
        assert_eq!(ledger.transaction_count(), 3);
        let statuses: Vec<_> = (1..=3)
            .map(|n| ledger.block(n).unwrap().transactions[0].consensus_status)
            .collect();
        assert!(statuses.iter().all(|s| *s == ConsensusStatus::Confirmed));

        let hijack = ledger.block(3).unwrap().transactions.remove(0);
        assert!(hijack.transaction.is_attack);
        let rpki = hijack.transaction.payload.rpki.clone().expect("rpki result");
        assert_eq!(rpki.status, "invalid_origin");

        let proposer = cluster.node(&ValidatorId::new("validator-4")).unwrap();
        let records = proposer.verdict_log().records().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].verdict, Verdict::AttackConfirmed);
        assert!(cluster.ratings().score(64666) < node_runtime::adapters::INITIAL_SCORE);
        assert!(cluster.rewards().balance(&ValidatorId::new("validator-4")) > 0.0);

        let report = cluster.shutdown().await.unwrap();
        assert!(report.integrity_valid);
        assert!(report.diverged_replicas.is_empty());
        assert_eq!(report.blocks, 4);
        let confirmed: u64 = report.stats.values().map(|s| s.confirmed).sum();
        assert_eq!(confirmed, 3);
        drop(cluster);

        let verdict_file = dir.path().join("data").join("verdicts").join("validator-4.jsonl");
        assert!(std::fs::read_to_string(verdict_file).unwrap().lines().count() >= 1);

        let reopened = ValidatorCluster::build(config).unwrap();
        assert_eq!(reopened.ledger().transaction_count(), 3);
        assert!(reopened.verify().valid);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_background_sweep_resolves_unseen_observation() {
        let mut config = NodeConfig::default();
        config.consensus.regular_timeout = Duration::from_millis(50);
        config.consensus.attack_timeout = Duration::from_millis(200);
        config.sweep_interval = Duration::from_millis(20);
        let cluster = ValidatorCluster::build(config).unwrap();
        cluster.start();

        // Nobody else saw it, so every peer abstains.
        let record: ObservationRecord =
            serde_json::from_str(&line(64900, "100.64.0.0/16", "", &["validator-9"], 1_700_000_100)).unwrap();
        cluster.ingest(record).await.unwrap().expect("submitted");
        assert!(cluster.settle(SETTLE).await);

        let deadline = tokio::time::Instant::now() + SETTLE;
        while cluster.ledger().transaction_count() == 0 && tokio::time::Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        let entry = cluster.ledger().tip().unwrap().transactions.remove(0);
        assert_eq!(entry.consensus_status, ConsensusStatus::SingleWitness);
        assert_eq!(entry.committed_by, ValidatorId::new("validator-9"));

        cluster.shutdown().await.unwrap();
    }
}
