//! # Disk Ledger
//!
//! Canonical chain persisted as one JSON document. Every write goes through
//! a temp file, `sync_all` and `rename`, so readers never observe a
//! truncated document. Writers are serialized by the chain mutex.

use super::LedgerLock;
use crate::domain::{
    Block, Chain, IntegrityReport, LedgerError, LedgerFile, LedgerMetadata, LedgerResult,
    LEDGER_FORMAT_VERSION,
};
use crate::ports::Ledger;
use parking_lot::Mutex;
use shared_types::{unix_millis, CommittedTransaction};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

pub struct DiskLedger {
    path: PathBuf,
    network: String,
    created_at: u64,
    chain: Mutex<Chain>,
    _lock: LedgerLock,
}

impl DiskLedger {
    /// Open the ledger at `path`, creating it with a fresh genesis if absent.
    ///
    /// An existing document is verified before use; a chain with any
    /// integrity violation is refused rather than repaired.
    pub fn open(path: impl AsRef<Path>, network: impl Into<String>) -> LedgerResult<Self> {
        let path = path.as_ref().to_path_buf();
        let network = network.into();
        let lock = LedgerLock::acquire(&path)?;

        if path.exists() {
            let file = Self::load(&path)?;
            if file.network != network {
                return Err(LedgerError::NetworkMismatch {
                    path,
                    found: file.network,
                    expected: network,
                });
            }
            let chain = Chain::from_blocks(file.blocks);
            let report = chain.verify();
            if !report.valid || chain.block_count() == 0 {
                for line in report.errors() {
                    error!(path = ?path, "[rc-01] {}", line);
                }
                return Err(LedgerError::CorruptChain {
                    path,
                    errors: report.violations.len().max(1),
                });
            }
            info!(
                path = ?path,
                blocks = chain.block_count(),
                transactions = chain.transaction_count(),
                "[rc-01] 💾 Loaded ledger"
            );
            return Ok(Self {
                path,
                network,
                created_at: file.metadata.created_at,
                chain: Mutex::new(chain),
                _lock: lock,
            });
        }

        let created_at = unix_millis();
        let ledger = Self {
            path,
            network,
            created_at,
            chain: Mutex::new(Chain::from_genesis(Block::genesis(created_at)?)),
            _lock: lock,
        };
        ledger.persist(&ledger.chain.lock())?;
        info!(path = ?ledger.path, "[rc-01] 📁 Created ledger with new genesis");
        Ok(ledger)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn network(&self) -> &str {
        &self.network
    }

    fn load(path: &Path) -> LedgerResult<LedgerFile> {
        let bytes = std::fs::read(path).map_err(|e| LedgerError::Io {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        serde_json::from_slice(&bytes).map_err(|e| LedgerError::Malformed {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Atomic write-via-temp-file-then-rename. Caller holds the chain lock.
    fn persist(&self, chain: &Chain) -> LedgerResult<()> {
        let io_err = |path: &Path, e: std::io::Error| LedgerError::Io {
            path: path.to_path_buf(),
            message: e.to_string(),
        };

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
        }

        let document = LedgerFile {
            version: LEDGER_FORMAT_VERSION.to_string(),
            network: self.network.clone(),
            blocks: chain.blocks().to_vec(),
            metadata: LedgerMetadata {
                created_at: self.created_at,
                last_updated: unix_millis(),
                total_blocks: chain.block_count(),
                total_transactions: chain.transaction_count(),
            },
        };
        let bytes = serde_json::to_vec_pretty(&document)?;

        let temp_path = self.path.with_extension("tmp");
        let mut file = std::fs::File::create(&temp_path).map_err(|e| io_err(&temp_path, e))?;
        file.write_all(&bytes).map_err(|e| io_err(&temp_path, e))?;
        file.sync_all().map_err(|e| io_err(&temp_path, e))?;
        std::fs::rename(&temp_path, &self.path).map_err(|e| io_err(&self.path, e))?;

        Ok(())
    }
}

impl Ledger for DiskLedger {
    fn genesis(&self) -> Option<Block> {
        self.chain.lock().genesis().cloned()
    }

    fn append_transaction(&self, entry: CommittedTransaction) -> LedgerResult<Block> {
        let mut chain = self.chain.lock();
        let block = chain.append_transaction(entry, unix_millis())?;
        if let Err(e) = self.persist(&chain) {
            // Memory must never run ahead of disk.
            chain.pop();
            return Err(e);
        }
        Ok(block)
    }

    fn append_replicated_block(&self, block: &Block) -> bool {
        let mut chain = self.chain.lock();
        if let Err(rejection) = chain.append_replicated(block) {
            warn!(
                path = ?self.path,
                block = block.block_number,
                "[rc-01] Replicated block rejected: {}",
                rejection
            );
            return false;
        }
        if let Err(e) = self.persist(&chain) {
            error!(path = ?self.path, "[rc-01] Failed to persist replicated block: {}", e);
            chain.pop();
            return false;
        }
        true
    }

    fn verify_integrity(&self) -> IntegrityReport {
        self.chain.lock().verify()
    }

    fn tip(&self) -> Option<Block> {
        self.chain.lock().tip().cloned()
    }

    fn block(&self, number: u64) -> Option<Block> {
        self.chain.lock().get(number).cloned()
    }

    fn block_count(&self) -> usize {
        self.chain.lock().block_count()
    }

    fn transaction_count(&self) -> usize {
        self.chain.lock().transaction_count()
    }

    fn flush(&self) -> LedgerResult<()> {
        let chain = self.chain.lock();
        self.persist(&chain)
    }
}
