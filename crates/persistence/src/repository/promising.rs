//! Promising-traders list: a JSON array of addresses queued for deep analysis

use crate::{write_atomic, StoreError, StoreResult};
use std::path::Path;

/// Load the list; `None` when the file does not exist
pub fn load(path: &Path) -> StoreResult<Option<Vec<String>>> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = std::fs::read_to_string(path).map_err(|e| StoreError::io(path, e))?;
    let list = serde_json::from_str(&raw).map_err(|source| StoreError::Malformed {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(Some(list))
}

/// Replace the list with `addresses`
pub fn save(path: &Path, addresses: &[String]) -> StoreResult<()> {
    let json = serde_json::to_string_pretty(addresses)?;
    write_atomic(path, json.as_bytes())
}
