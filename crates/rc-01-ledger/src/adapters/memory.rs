use crate::domain::{Block, Chain, IntegrityReport, LedgerResult};
use crate::ports::Ledger;
use parking_lot::RwLock;
use shared_types::{unix_millis, CommittedTransaction};
use tracing::warn;

/// In-memory ledger. Used for per-validator replicas and for tests.
pub struct MemoryLedger {
    label: String,
    chain: RwLock<Chain>,
}

impl MemoryLedger {
    /// Seed a ledger with an existing genesis block.
    ///
    /// Replicas must be seeded with a clone of the canonical genesis so
    /// hashes agree from block 0.
    pub fn new(genesis: Block) -> Self {
        Self::with_label("memory", genesis)
    }

    pub fn with_label(label: impl Into<String>, genesis: Block) -> Self {
        Self {
            label: label.into(),
            chain: RwLock::new(Chain::from_genesis(genesis)),
        }
    }

    /// Fresh chain with a genesis stamped now.
    pub fn with_new_genesis() -> LedgerResult<Self> {
        Ok(Self::new(Block::genesis(unix_millis())?))
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn blocks(&self) -> Vec<Block> {
        self.chain.read().blocks().to_vec()
    }
}

impl Ledger for MemoryLedger {
    fn genesis(&self) -> Option<Block> {
        self.chain.read().genesis().cloned()
    }

    fn append_transaction(&self, entry: CommittedTransaction) -> LedgerResult<Block> {
        self.chain.write().append_transaction(entry, unix_millis())
    }

    fn append_replicated_block(&self, block: &Block) -> bool {
        match self.chain.write().append_replicated(block) {
            Ok(()) => true,
            Err(rejection) => {
                warn!(
                    ledger = %self.label,
                    block = block.block_number,
                    "[rc-01] Replicated block rejected: {}",
                    rejection
                );
                false
            }
        }
    }

    fn verify_integrity(&self) -> IntegrityReport {
        self.chain.read().verify()
    }

    fn tip(&self) -> Option<Block> {
        self.chain.read().tip().cloned()
    }

    fn block(&self, number: u64) -> Option<Block> {
        self.chain.read().get(number).cloned()
    }

    fn block_count(&self) -> usize {
        self.chain.read().block_count()
    }

    fn transaction_count(&self) -> usize {
        self.chain.read().transaction_count()
    }

    fn flush(&self) -> LedgerResult<()> {
        Ok(())
    }
}
