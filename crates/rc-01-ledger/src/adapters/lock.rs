//! # Ledger File Lock
//!
//! Uses `fs2` for cross-platform file locking (flock on Unix, LockFile on
//! Windows) so two processes never write the same ledger document.

use crate::domain::{LedgerError, LedgerResult};
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Exclusive lock next to a ledger file. Released on drop (RAII).
pub struct LedgerLock {
    file: File,
    path: PathBuf,
}

impl LedgerLock {
    /// `<ledger>.lock` beside the ledger document.
    pub fn lock_path(ledger_path: &Path) -> PathBuf {
        let mut name = ledger_path.as_os_str().to_owned();
        name.push(".lock");
        PathBuf::from(name)
    }

    /// Acquire without waiting.
    ///
    /// # Errors
    ///
    /// `LedgerError::Locked` if another process holds the lock.
    pub fn acquire(ledger_path: &Path) -> LedgerResult<Self> {
        let path = Self::lock_path(ledger_path);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| LedgerError::Io {
                path: parent.to_path_buf(),
                message: e.to_string(),
            })?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(&path)
            .map_err(|e| LedgerError::Io {
                path: path.clone(),
                message: e.to_string(),
            })?;

        file.try_lock_exclusive()
            .map_err(|_| LedgerError::Locked { path: path.clone() })?;

        // Informational only.
        let _ = file.set_len(0);
        let _ = writeln!(file, "{}", std::process::id());

        Ok(Self { file, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for LedgerLock {
    fn drop(&mut self) {
        let _ = fs2::FileExt::unlock(&self.file);
        let _ = std::fs::remove_file(&self.path);
    }
}
