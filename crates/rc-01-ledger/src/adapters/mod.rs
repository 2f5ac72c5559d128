//! Adapters layer (Hexagonal Architecture)

mod disk;
mod lock;
mod memory;

pub use disk::DiskLedger;
pub use lock::LedgerLock;
pub use memory::MemoryLedger;

use crate::domain::{LedgerConfig, LedgerResult};
use crate::ports::Ledger;
use std::sync::Arc;

/// Open the canonical ledger described by `config`.
pub fn open_ledger(config: &LedgerConfig) -> LedgerResult<Arc<dyn Ledger>> {
    let ledger: Arc<dyn Ledger> = match &config.path {
        Some(path) => Arc::new(DiskLedger::open(path, config.network.clone())?),
        None => Arc::new(MemoryLedger::with_label(
            config.network.clone(),
            crate::domain::Block::genesis(shared_types::unix_millis())?,
        )),
    };
    Ok(ledger)
}
