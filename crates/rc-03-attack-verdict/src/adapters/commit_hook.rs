use crate::ports::{AttackVerdictApi, VerdictTransport};
use crate::service::AttackVerdictConsensus;
use async_trait::async_trait;
use rc_01_ledger::Block;
use rc_02_tx_consensus::CommitHook;
use shared_types::{AttackDetector, CommittedTransaction};
use std::sync::Arc;
use tracing::debug;

/// Runs the attack detector on every committed payload and opens a
/// proposal for the most severe finding.
pub struct VerdictCommitHook<T: VerdictTransport> {
    verdicts: Arc<AttackVerdictConsensus<T>>,
    detector: Arc<dyn AttackDetector>,
}

impl<T: VerdictTransport> VerdictCommitHook<T> {
    pub fn new(verdicts: Arc<AttackVerdictConsensus<T>>, detector: Arc<dyn AttackDetector>) -> Self {
        Self { verdicts, detector }
    }
}

#[async_trait]
impl<T: VerdictTransport> CommitHook for VerdictCommitHook<T> {
    async fn on_commit(&self, entry: &CommittedTransaction, block: &Block) -> Result<(), String> {
        let findings = self.detector.detect(&entry.transaction.observation())?;
        let Some(finding) = findings.into_iter().max_by_key(|f| f.severity) else {
            return Ok(());
        };

        debug!(
            tx_id = %entry.transaction.id,
            block = block.block_number,
            attack = %finding.attack_type,
            "[rc-03] Committed transaction flagged by detector"
        );
        self.verdicts
            .propose_attack(&entry.transaction, finding)
            .await
            .map(|_| ())
            .map_err(|e| e.to_string())
    }
}
