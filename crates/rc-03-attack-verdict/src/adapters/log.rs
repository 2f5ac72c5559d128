//! Verdict log backends.
//!
//! `JsonlVerdictLog` appends one JSON object per line and syncs after every
//! record. Lines are never rewritten.

use crate::domain::{VerdictError, VerdictRecord, VerdictResult};
use crate::ports::VerdictLog;
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

pub struct JsonlVerdictLog {
    path: PathBuf,
    file: Mutex<File>,
}

impl JsonlVerdictLog {
    pub fn open(path: impl AsRef<Path>) -> VerdictResult<Self> {
        let path = path.as_ref().to_path_buf();
        let io_err = |p: &Path, e: std::io::Error| VerdictError::Log {
            path: p.to_path_buf(),
            message: e.to_string(),
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| io_err(&path, e))?;

        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl VerdictLog for JsonlVerdictLog {
    fn append(&self, record: &VerdictRecord) -> VerdictResult<()> {
        let mut line = serde_json::to_vec(record)?;
        line.push(b'\n');

        let mut file = self.file.lock();
        file.write_all(&line)
            .and_then(|_| file.sync_data())
            .map_err(|e| VerdictError::Log {
                path: self.path.clone(),
                message: e.to_string(),
            })
    }

    fn records(&self) -> VerdictResult<Vec<VerdictRecord>> {
        // Hold the writer lock so a half-written line is never read.
        let _guard = self.file.lock();
        let content = std::fs::read_to_string(&self.path).map_err(|e| VerdictError::Log {
            path: self.path.clone(),
            message: e.to_string(),
        })?;

        content
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(i, line)| {
                serde_json::from_str(line).map_err(|e| VerdictError::MalformedLog {
                    path: self.path.clone(),
                    line: i + 1,
                    message: e.to_string(),
                })
            })
            .collect()
    }
}

/// In-memory verdict log for tests and ephemeral nodes.
#[derive(Default)]
pub struct MemoryVerdictLog {
    records: Mutex<Vec<VerdictRecord>>,
}

impl MemoryVerdictLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }
}

impl VerdictLog for MemoryVerdictLog {
    fn append(&self, record: &VerdictRecord) -> VerdictResult<()> {
        self.records.lock().push(record.clone());
        Ok(())
    }

    fn records(&self) -> VerdictResult<Vec<VerdictRecord>> {
        Ok(self.records.lock().clone())
    }
}
