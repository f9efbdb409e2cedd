//! Storage boundary traits
//!
//! The graph store only needs an append-only log of committed batches and
//! the ability to replay it. Services depend on the [`Journal`] trait so
//! tests can run against memory.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::{debug, warn};

use crate::domain::Record;

/// Durable, append-only record log.
pub trait Journal: Send + Sync {
    /// Persist one batch. Either the whole batch becomes durable or none of it.
    fn append(&self, batch: &[Record]) -> io::Result<()>;

    /// Read back every committed record in commit order.
    fn load(&self) -> io::Result<Vec<Record>>;

    /// Human-readable location for error messages.
    fn location(&self) -> String;
}

// ============================================================
// REAL IMPLEMENTATIONS
// ============================================================

/// JSON-lines journal: one line per committed batch.
#[derive(Debug)]
pub struct FileJournal {
    path: PathBuf,
    sync: bool,
    write_lock: Mutex<()>,
}

impl FileJournal {
    pub fn new(path: impl Into<PathBuf>, sync: bool) -> Self {
        Self {
            path: path.into(),
            sync,
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Cut an unterminated trailing line left behind by an interrupted write,
    /// so the next batch starts on a line of its own.
    fn truncate_torn_tail(&self, file: &mut File) -> io::Result<()> {
        let len = file.metadata()?.len();
        if len == 0 {
            return Ok(());
        }
        let mut last = [0u8; 1];
        file.seek(SeekFrom::Start(len - 1))?;
        file.read_exact(&mut last)?;
        if last[0] == b'\n' {
            return Ok(());
        }

        let mut content = Vec::new();
        file.seek(SeekFrom::Start(0))?;
        file.read_to_end(&mut content)?;
        let keep = content
            .iter()
            .rposition(|b| *b == b'\n')
            .map_or(0, |i| i + 1);
        warn!(
            "dropping {} bytes of torn trailing batch in {}",
            content.len() - keep,
            self.path.display()
        );
        file.set_len(keep as u64)
    }
}

impl Journal for FileJournal {
    fn append(&self, batch: &[Record]) -> io::Result<()> {
        if batch.is_empty() {
            return Ok(());
        }
        let mut line = serde_json::to_string(batch)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        line.push('\n');

        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| io::Error::other("journal write lock poisoned"))?;
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&self.path)?;
        self.truncate_torn_tail(&mut file)?;
        // single write so a batch is one line or nothing
        file.write_all(line.as_bytes())?;
        if self.sync {
            file.sync_data()?;
        }
        debug!("appended {} records to {}", batch.len(), self.path.display());
        Ok(())
    }

    fn load(&self) -> io::Result<Vec<Record>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let content = fs::read_to_string(&self.path)?;
        let complete = content.ends_with('\n');
        let lines: Vec<&str> = content.lines().collect();
        let mut records = Vec::new();

        for (i, line) in lines.iter().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<Vec<Record>>(line) {
                Ok(batch) => records.extend(batch),
                Err(e) if i + 1 == lines.len() && !complete => {
                    warn!(
                        "ignoring torn trailing batch in {}: {}",
                        self.path.display(),
                        e
                    );
                }
                Err(e) => {
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidData,
                        format!("{}:{}: {}", self.path.display(), i + 1, e),
                    ));
                }
            }
        }
        debug!("loaded {} records from {}", records.len(), self.path.display());
        Ok(records)
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}

/// Journal kept in memory; nothing survives the process.
#[derive(Debug, Default)]
pub struct MemoryJournal {
    batches: Mutex<Vec<Vec<Record>>>,
}

impl MemoryJournal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of committed batches.
    pub fn batch_count(&self) -> usize {
        self.batches.lock().map(|b| b.len()).unwrap_or(0)
    }
}

impl Journal for MemoryJournal {
    fn append(&self, batch: &[Record]) -> io::Result<()> {
        if batch.is_empty() {
            return Ok(());
        }
        self.batches
            .lock()
            .map_err(|_| io::Error::other("memory journal poisoned"))?
            .push(batch.to_vec());
        Ok(())
    }

    fn load(&self) -> io::Result<Vec<Record>> {
        let batches = self
            .batches
            .lock()
            .map_err(|_| io::Error::other("memory journal poisoned"))?;
        Ok(batches.iter().flatten().cloned().collect())
    }

    fn location(&self) -> String {
        "<memory>".to_string()
    }
}
