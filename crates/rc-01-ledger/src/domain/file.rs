//! On-disk document layout: one JSON document per chain instance.

use super::Block;
use serde::{Deserialize, Serialize};

pub const LEDGER_FORMAT_VERSION: &str = "1.0";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerMetadata {
    /// Unix milliseconds when the chain was created.
    pub created_at: u64,
    /// Unix milliseconds of the last write.
    pub last_updated: u64,
    pub total_blocks: usize,
    pub total_transactions: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerFile {
    pub version: String,
    pub network: String,
    pub blocks: Vec<Block>,
    pub metadata: LedgerMetadata,
}
