//! # Commit Notice
//!
//! Wraps the committing node's verdict hook. When the committer's own
//! detector opened no proposal, every peer is sent a `Committed` notice so
//! its detector gets a look at the payload too. The notice is only sent
//! in that case: a proposal already in flight must not race a competing
//! one opened from the notice.

use std::sync::Arc;

use async_trait::async_trait;
use rc_01_ledger::Block;
use rc_02_tx_consensus::CommitHook;
use rc_03_attack_verdict::{AttackVerdictConsensus, VerdictCommitHook};
use shared_types::{CommittedTransaction, ValidatorId};
use tracing::{debug, warn};

use crate::wiring::{InMemoryNetwork, PeerMessage};

pub struct CommitNotifier {
    local_id: ValidatorId,
    peers: Vec<ValidatorId>,
    hook: Arc<VerdictCommitHook<InMemoryNetwork>>,
    verdicts: Arc<AttackVerdictConsensus<InMemoryNetwork>>,
    network: Arc<InMemoryNetwork>,
}

impl CommitNotifier {
    pub fn new(
        local_id: ValidatorId,
        validators: &[ValidatorId],
        hook: Arc<VerdictCommitHook<InMemoryNetwork>>,
        verdicts: Arc<AttackVerdictConsensus<InMemoryNetwork>>,
        network: Arc<InMemoryNetwork>,
    ) -> Self {
        let peers = validators
            .iter()
            .filter(|id| **id != local_id)
            .cloned()
            .collect();
        Self {
            local_id,
            peers,
            hook,
            verdicts,
            network,
        }
    }

    fn notify_peers(&self, block: &Block) {
        let mut sent = 0;
        for peer in &self.peers {
            match self.network.send(peer, PeerMessage::Committed(block.clone())) {
                Ok(()) => sent += 1,
                Err(e) => warn!(peer = %peer, block = block.block_number, "[node] Commit notice not delivered: {}", e),
            }
        }
        debug!(
            validator = %self.local_id,
            block = block.block_number,
            sent,
            "[node] Commit notice sent"
        );
    }
}

#[async_trait]
impl CommitHook for CommitNotifier {
    async fn on_commit(&self, entry: &CommittedTransaction, block: &Block) -> Result<(), String> {
        let result = self.hook.on_commit(entry, block).await;
        if self
            .verdicts
            .proposal_for_transaction(&entry.transaction.id)
            .is_none()
        {
            self.notify_peers(block);
        }
        result
    }
}
