//! Run-level errors; per-trader failures are `ApiError`s that get counted, not raised

use persistence::StoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScanError {
    /// Ledger or export files cannot be read or written; the run is aborted
    #[error("storage failure: {0}")]
    Storage(#[from] StoreError),

    #[error("invalid run parameters: {0}")]
    Config(String),
}

pub type ScanResult<T> = Result<T, ScanError>;
