//! Persistence layer for Trader Scan
//!
//! Flat JSON ledgers (one per pipeline phase), the promising-traders list and
//! the CSV exports. Every file lives in a single data directory.

pub mod export;
pub mod ledger;
pub mod repository;

pub use ledger::{Ledger, UpsertOutcome};
pub use repository::*;

use std::path::{Path, PathBuf};
use thiserror::Error;

pub const QUICK_LEDGER_FILE: &str = "traders_quick.json";
pub const DETAILED_LEDGER_FILE: &str = "traders_detailed.json";
pub const PROMISING_FILE: &str = "promising_traders.json";

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed JSON in {}: {source}", .path.display())]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl StoreError {
    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Data directory holding every file the pipeline reads and writes
#[derive(Debug, Clone)]
pub struct Store {
    dir: PathBuf,
}

impl Store {
    /// Open (and create if needed) the data directory
    pub fn open(dir: impl AsRef<Path>) -> StoreResult<Self> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir).map_err(|e| StoreError::io(dir, e))?;
        Ok(Self {
            dir: dir.to_path_buf(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn quick_ledger_path(&self) -> PathBuf {
        self.dir.join(QUICK_LEDGER_FILE)
    }

    pub fn detailed_ledger_path(&self) -> PathBuf {
        self.dir.join(DETAILED_LEDGER_FILE)
    }

    pub fn promising_path(&self) -> PathBuf {
        self.dir.join(PROMISING_FILE)
    }

    pub fn load_quick(&self) -> StoreResult<QuickLedger> {
        Ledger::open(self.quick_ledger_path())
    }

    pub fn load_detailed(&self) -> StoreResult<DetailedLedger> {
        Ledger::open(self.detailed_ledger_path())
    }

    /// Read the promising list; `None` when no quick scan has written one yet
    pub fn load_promising(&self) -> StoreResult<Option<Vec<String>>> {
        promising::load(&self.promising_path())
    }

    pub fn save_promising(&self, addresses: &[String]) -> StoreResult<()> {
        promising::save(&self.promising_path(), addresses)
    }

    /// Path of a CSV export inside the data directory
    pub fn export_path(&self, file_name: &str) -> PathBuf {
        self.dir.join(file_name)
    }
}

/// Write `bytes` next to `path` and rename over it, so readers never see a
/// half-written file.
pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> StoreResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;
        }
    }

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    std::fs::write(&tmp, bytes).map_err(|e| StoreError::io(&tmp, e))?;
    std::fs::rename(&tmp, path).map_err(|e| StoreError::io(path, e))?;
    Ok(())
}
