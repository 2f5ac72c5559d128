//! Shared fixtures for ledger unit tests.

use crate::domain::Block;
use crate::ports::Ledger;
use shared_types::{CommittedTransaction, ConsensusStatus, Observation, Transaction, ValidatorId};

pub fn committed(prefix: &str) -> CommittedTransaction {
    let observation = Observation {
        subject_asn: 64500,
        prefix: prefix.to_string(),
        as_path: vec![174, 64500],
        timestamp: 1_700_000_000,
        is_attack: false,
        label: "normal".into(),
    };
    CommittedTransaction {
        transaction: Transaction::new(ValidatorId::new("v1"), &observation, vec![], None).unwrap(),
        consensus_status: ConsensusStatus::Confirmed,
        approve_count: 3,
        reject_count: 0,
        signatures: vec![],
        committed_by: ValidatorId::new("v1"),
        committed_at: 1_700_000_000_000,
    }
}

pub fn genesis() -> Block {
    Block::genesis(1_700_000_000_000).unwrap()
}

/// Append `count` transactions and return the produced blocks.
pub fn fill<L: Ledger + ?Sized>(ledger: &L, count: usize) -> Vec<Block> {
    (0..count)
        .map(|i| ledger.append_transaction(committed(&format!("10.{}.0.0/16", i))).unwrap())
        .collect()
}
