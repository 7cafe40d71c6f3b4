//! Persistence layer for focusguard
//!
//! Provides:
//! - The snapshot document (rules, bypasses, timers)
//! - A file-backed JSON store and an in-memory store
//! - Repository operations, each a single locked read-modify-write

mod json;
mod memory;
mod repository;
mod snapshot;
mod traits;

pub use json::*;
pub use memory::*;
pub use repository::*;
pub use snapshot::*;
pub use traits::*;

use focusguard_util::FocusError;
use std::path::PathBuf;
use thiserror::Error;

/// Store errors
#[derive(Debug, Error)]
pub enum StoreError {
    /// The document exists but does not parse
    #[error("Snapshot at {path} is corrupted: {message}")]
    Corrupted { path: PathBuf, message: String },

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Serialization(e.to_string())
    }
}

impl From<StoreError> for FocusError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Corrupted { .. } => FocusError::corrupted(e.to_string()),
            other => FocusError::store(other.to_string()),
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;
