//! Generic JSON ledger: address → latest record, read once and written once per run

use crate::{write_atomic, StoreError, StoreResult};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Whether an upsert created a new key or replaced an existing record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Updated,
}

/// On-disk mapping from trader identity to record.
///
/// Keys are kept sorted so the written file is stable between runs.
#[derive(Debug, Clone)]
pub struct Ledger<R> {
    path: PathBuf,
    records: BTreeMap<String, R>,
}

impl<R> Ledger<R>
where
    R: Serialize + DeserializeOwned,
{
    /// Load the ledger at `path`; a missing file yields an empty ledger.
    ///
    /// A file that exists but cannot be read or parsed is an error: replacing
    /// it with an empty ledger would wipe it on the next save.
    pub fn open(path: impl Into<PathBuf>) -> StoreResult<Self> {
        let path = path.into();
        if !path.exists() {
            debug!(path = %path.display(), "No ledger yet, starting empty");
            return Ok(Self::empty(path));
        }

        let raw = std::fs::read_to_string(&path).map_err(|e| StoreError::io(&path, e))?;
        let records = if raw.trim().is_empty() {
            BTreeMap::new()
        } else {
            serde_json::from_str(&raw).map_err(|source| StoreError::Malformed {
                path: path.clone(),
                source,
            })?
        };

        let ledger = Self { path, records };
        info!(path = %ledger.path.display(), records = ledger.len(), "Ledger loaded");
        Ok(ledger)
    }

    /// Write the ledger back to its file (pretty JSON, 2-space indent)
    pub fn save(&self) -> StoreResult<()> {
        let json = serde_json::to_string_pretty(&self.records)?;
        write_atomic(&self.path, json.as_bytes())?;
        info!(path = %self.path.display(), records = self.len(), "Ledger saved");
        Ok(())
    }
}

impl<R> Ledger<R> {
    pub fn empty(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            records: BTreeMap::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Insert or overwrite the record for `key`
    pub fn upsert(&mut self, key: impl Into<String>, record: R) -> UpsertOutcome {
        match self.records.insert(key.into(), record) {
            None => UpsertOutcome::Inserted,
            Some(_) => UpsertOutcome::Updated,
        }
    }

    pub fn get(&self, key: &str) -> Option<&R> {
        self.records.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut R> {
        self.records.get_mut(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.records.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &R)> {
        self.records.iter()
    }

    pub fn values(&self) -> impl Iterator<Item = &R> {
        self.records.values()
    }
}
