//! Driving port: the ledger API used by the consensus engine and operators.

use crate::domain::{Block, IntegrityReport, LedgerResult};
use shared_types::CommittedTransaction;

/// Append-only, hash-linked block store.
///
/// Implementations share hashing and verification through
/// [`crate::domain::Chain`] and differ only in locking and persistence.
pub trait Ledger: Send + Sync {
    /// Block 0. `None` only for a chain that was never initialized.
    fn genesis(&self) -> Option<Block>;

    /// Wrap one committed transaction in a new block linked to the tip.
    ///
    /// # Errors
    /// Hashing or persistence failures. These are internal invariant
    /// violations; callers must not retry blindly.
    fn append_transaction(&self, entry: CommittedTransaction) -> LedgerResult<Block>;

    /// Accept a block built by another ledger after recomputing its hash and
    /// checking linkage. Returns `false` and leaves state untouched otherwise.
    fn append_replicated_block(&self, block: &Block) -> bool;

    /// Walk every block and report every mismatch found.
    fn verify_integrity(&self) -> IntegrityReport;

    fn tip(&self) -> Option<Block>;

    fn block(&self, number: u64) -> Option<Block>;

    fn block_count(&self) -> usize;

    fn transaction_count(&self) -> usize;

    /// Persist any buffered state. No-op for in-memory ledgers.
    fn flush(&self) -> LedgerResult<()>;
}
