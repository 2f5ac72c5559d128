//! # Replicated Ledger Service
//!
//! The canonical chain is one shared resource; each validator additionally
//! owns a private in-memory replica that re-verifies every block before
//! accepting it. A replica that rejects a block is marked diverged and
//! stops advancing: divergence is an operator signal, never auto-repaired.

use crate::adapters::MemoryLedger;
use crate::domain::{Block, IntegrityReport, LedgerResult};
use crate::ports::Ledger;
use parking_lot::{Mutex, RwLock};
use shared_types::{CommittedTransaction, ValidatorId};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, error};

struct Replica {
    ledger: Arc<MemoryLedger>,
    diverged: bool,
}

/// Result of pushing one block to every replica.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplicationReport {
    pub accepted: Vec<ValidatorId>,
    pub rejected: Vec<ValidatorId>,
    /// Replicas skipped because they diverged earlier.
    pub skipped: Vec<ValidatorId>,
}

/// One verified replica per validator, all seeded from the same genesis.
pub struct ReplicaSet {
    replicas: RwLock<BTreeMap<ValidatorId, Replica>>,
}

impl ReplicaSet {
    pub fn new(genesis: &Block, validators: impl IntoIterator<Item = ValidatorId>) -> Self {
        let replicas = validators
            .into_iter()
            .map(|id| {
                let ledger = MemoryLedger::with_label(format!("replica-{}", id), genesis.clone());
                (
                    id,
                    Replica {
                        ledger: Arc::new(ledger),
                        diverged: false,
                    },
                )
            })
            .collect();
        Self {
            replicas: RwLock::new(replicas),
        }
    }

    pub fn replica(&self, validator: &ValidatorId) -> Option<Arc<MemoryLedger>> {
        self.replicas
            .read()
            .get(validator)
            .map(|r| Arc::clone(&r.ledger))
    }

    pub fn len(&self) -> usize {
        self.replicas.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.replicas.read().is_empty()
    }

    /// Offer `block` to every healthy replica.
    pub fn replicate(&self, block: &Block) -> ReplicationReport {
        let mut report = ReplicationReport::default();
        let mut replicas = self.replicas.write();

        for (id, replica) in replicas.iter_mut() {
            if replica.diverged {
                report.skipped.push(id.clone());
                continue;
            }
            if replica.ledger.append_replicated_block(block) {
                report.accepted.push(id.clone());
            } else {
                error!(
                    validator = %id,
                    block = block.block_number,
                    "[rc-01] CRITICAL: replica diverged from canonical chain, halting replica"
                );
                replica.diverged = true;
                report.rejected.push(id.clone());
            }
        }
        report
    }

    pub fn diverged(&self) -> Vec<ValidatorId> {
        self.replicas
            .read()
            .iter()
            .filter(|(_, r)| r.diverged)
            .map(|(id, _)| id.clone())
            .collect()
    }

    pub fn tip_hashes(&self) -> BTreeMap<ValidatorId, Option<String>> {
        self.replicas
            .read()
            .iter()
            .map(|(id, r)| (id.clone(), r.ledger.tip().map(|b| b.block_hash)))
            .collect()
    }

    /// Integrity report per replica.
    pub fn verify_all(&self) -> BTreeMap<ValidatorId, IntegrityReport> {
        self.replicas
            .read()
            .iter()
            .map(|(id, r)| (id.clone(), r.ledger.verify_integrity()))
            .collect()
    }
}

/// Canonical ledger plus replica fan-out behind the plain `Ledger` API.
///
/// Appends are serialized so replicas see blocks in canonical order.
pub struct ReplicatedLedger {
    canonical: Arc<dyn Ledger>,
    replicas: Arc<ReplicaSet>,
    append_lock: Mutex<()>,
}

impl ReplicatedLedger {
    pub fn new(canonical: Arc<dyn Ledger>, replicas: Arc<ReplicaSet>) -> Self {
        Self {
            canonical,
            replicas,
            append_lock: Mutex::new(()),
        }
    }

    pub fn canonical(&self) -> &Arc<dyn Ledger> {
        &self.canonical
    }

    pub fn replicas(&self) -> &Arc<ReplicaSet> {
        &self.replicas
    }
}

impl Ledger for ReplicatedLedger {
    fn genesis(&self) -> Option<Block> {
        self.canonical.genesis()
    }

    fn append_transaction(&self, entry: CommittedTransaction) -> LedgerResult<Block> {
        let _guard = self.append_lock.lock();
        let block = self.canonical.append_transaction(entry)?;
        let report = self.replicas.replicate(&block);
        debug!(
            block = block.block_number,
            accepted = report.accepted.len(),
            rejected = report.rejected.len(),
            "[rc-01] Block replicated"
        );
        Ok(block)
    }

    fn append_replicated_block(&self, block: &Block) -> bool {
        let _guard = self.append_lock.lock();
        if !self.canonical.append_replicated_block(block) {
            return false;
        }
        self.replicas.replicate(block);
        true
    }

    fn verify_integrity(&self) -> IntegrityReport {
        self.canonical.verify_integrity()
    }

    fn tip(&self) -> Option<Block> {
        self.canonical.tip()
    }

    fn block(&self, number: u64) -> Option<Block> {
        self.canonical.block(number)
    }

    fn block_count(&self) -> usize {
        self.canonical.block_count()
    }

    fn transaction_count(&self) -> usize {
        self.canonical.transaction_count()
    }

    fn flush(&self) -> LedgerResult<()> {
        self.canonical.flush()
    }
}
