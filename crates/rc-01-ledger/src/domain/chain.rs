//! # Chain
//!
//! Shared base behind every `Ledger` implementation: block construction,
//! replica acceptance and verification live here once, and the adapters
//! only add locking and persistence around it.

use super::{verify_blocks, Block, IntegrityReport, LedgerError, LedgerResult, ReplicaRejection};
use shared_types::CommittedTransaction;

#[derive(Debug, Clone, Default)]
pub struct Chain {
    blocks: Vec<Block>,
    transaction_count: usize,
}

impl Chain {
    pub fn from_genesis(genesis: Block) -> Self {
        Self::from_blocks(vec![genesis])
    }

    /// Adopt already-built blocks (e.g. loaded from disk). Not verified here.
    pub fn from_blocks(blocks: Vec<Block>) -> Self {
        let transaction_count = blocks.iter().map(|b| b.transactions.len()).sum();
        Self {
            blocks,
            transaction_count,
        }
    }

    pub fn tip(&self) -> Option<&Block> {
        self.blocks.last()
    }

    pub fn genesis(&self) -> Option<&Block> {
        self.blocks.first()
    }

    pub fn get(&self, number: u64) -> Option<&Block> {
        self.blocks.get(usize::try_from(number).ok()?)
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    pub fn transaction_count(&self) -> usize {
        self.transaction_count
    }

    /// Wrap one committed transaction in a new block linked to the tip.
    ///
    /// The block timestamp never goes backwards relative to the tip.
    pub fn append_transaction(
        &mut self,
        entry: CommittedTransaction,
        now_millis: u64,
    ) -> LedgerResult<Block> {
        let tip = self.tip().ok_or(LedgerError::MissingGenesis)?;
        let block = Block::new(
            tip.block_number + 1,
            now_millis.max(tip.timestamp),
            tip.block_hash.clone(),
            vec![entry],
        )?;
        self.push(block.clone());
        Ok(block)
    }

    /// Accept a block built elsewhere only after re-deriving its hashes and
    /// checking it extends the local tip. Nothing changes on rejection.
    pub fn append_replicated(&mut self, block: &Block) -> Result<(), ReplicaRejection> {
        let tip = self.tip().ok_or(ReplicaRejection::MissingGenesis)?;

        if block.block_number != tip.block_number + 1 {
            return Err(ReplicaRejection::OutOfSequence {
                expected: tip.block_number + 1,
                actual: block.block_number,
            });
        }

        let merkle = block
            .compute_merkle_root()
            .map_err(|e| ReplicaRejection::Unhashable(e.to_string()))?;
        if merkle != block.merkle_root {
            return Err(ReplicaRejection::MerkleMismatch {
                stated: block.merkle_root.clone(),
                computed: merkle,
            });
        }

        let computed = block
            .compute_hash()
            .map_err(|e| ReplicaRejection::Unhashable(e.to_string()))?;
        if computed != block.block_hash {
            return Err(ReplicaRejection::HashMismatch {
                stated: block.block_hash.clone(),
                computed,
            });
        }

        if block.previous_hash != tip.block_hash {
            return Err(ReplicaRejection::LinkageMismatch {
                expected: tip.block_hash.clone(),
                actual: block.previous_hash.clone(),
            });
        }

        self.push(block.clone());
        Ok(())
    }

    /// Drop the tip. Only used to undo an append whose persistence failed.
    pub(crate) fn pop(&mut self) -> Option<Block> {
        let block = self.blocks.pop()?;
        self.transaction_count -= block.transactions.len();
        Some(block)
    }

    pub fn verify(&self) -> IntegrityReport {
        verify_blocks(&self.blocks)
    }

    fn push(&mut self, block: Block) {
        self.transaction_count += block.transactions.len();
        self.blocks.push(block);
    }
}
