//! Block entity and hashing rules.

use super::LedgerResult;
use serde::{Deserialize, Serialize};
use shared_types::{canonical_bytes, sha256_hex, CommittedTransaction, ZERO_HASH};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockType {
    Genesis,
    Transaction,
}

/// Descriptive metadata. Not covered by the block hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockMetadata {
    pub block_type: BlockType,
    pub transaction_count: usize,
}

/// Atomic unit of the ledger. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    pub block_number: u64,
    /// Unix milliseconds.
    pub timestamp: u64,
    pub previous_hash: String,
    pub transactions: Vec<CommittedTransaction>,
    pub block_hash: String,
    pub merkle_root: String,
    pub metadata: BlockMetadata,
}

/// Every field of a block except its own hash and metadata.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HashView<'a> {
    block_number: u64,
    timestamp: u64,
    previous_hash: &'a str,
    transactions: &'a [CommittedTransaction],
    merkle_root: &'a str,
}

/// Flat concat-and-hash Merkle root over per-transaction canonical hashes.
pub fn merkle_root(transactions: &[CommittedTransaction]) -> LedgerResult<String> {
    if transactions.is_empty() {
        return Ok(ZERO_HASH.to_string());
    }
    let mut concatenated = String::with_capacity(transactions.len() * 64);
    for tx in transactions {
        concatenated.push_str(&sha256_hex(&canonical_bytes(tx)?));
    }
    Ok(sha256_hex(concatenated.as_bytes()))
}

impl Block {
    /// Build a block, deriving its Merkle root and hash.
    pub fn new(
        block_number: u64,
        timestamp: u64,
        previous_hash: String,
        transactions: Vec<CommittedTransaction>,
    ) -> LedgerResult<Self> {
        let block_type = if block_number == 0 {
            BlockType::Genesis
        } else {
            BlockType::Transaction
        };
        let mut block = Self {
            block_number,
            timestamp,
            previous_hash,
            metadata: BlockMetadata {
                block_type,
                transaction_count: transactions.len(),
            },
            merkle_root: merkle_root(&transactions)?,
            transactions,
            block_hash: String::new(),
        };
        block.block_hash = block.compute_hash()?;
        Ok(block)
    }

    /// Empty block 0 linked to the zero sentinel.
    ///
    /// Deterministic for a given timestamp: replicas seeded with a clone of
    /// the same genesis agree with the canonical chain from block 0.
    pub fn genesis(timestamp: u64) -> LedgerResult<Self> {
        Self::new(0, timestamp, ZERO_HASH.to_string(), Vec::new())
    }

    /// Recompute the hash from the current field values.
    pub fn compute_hash(&self) -> LedgerResult<String> {
        let bytes = canonical_bytes(&HashView {
            block_number: self.block_number,
            timestamp: self.timestamp,
            previous_hash: &self.previous_hash,
            transactions: &self.transactions,
            merkle_root: &self.merkle_root,
        })?;
        Ok(sha256_hex(&bytes))
    }

    pub fn compute_merkle_root(&self) -> LedgerResult<String> {
        merkle_root(&self.transactions)
    }

    pub fn is_genesis(&self) -> bool {
        self.block_number == 0
    }
}
