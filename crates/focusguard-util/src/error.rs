//! Error types for focusguard

use thiserror::Error;

/// Core error type for focusguard operations
#[derive(Debug, Error)]
pub enum FocusError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Store error: {0}")]
    StoreError(String),

    /// The persisted snapshot exists but could not be parsed
    #[error("Storage corrupted: {0}")]
    StorageCorrupted(String),

    #[error("Host error: {0}")]
    HostError(String),
}

impl FocusError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::ValidationError(msg.into())
    }

    pub fn store(msg: impl Into<String>) -> Self {
        Self::StoreError(msg.into())
    }

    pub fn corrupted(msg: impl Into<String>) -> Self {
        Self::StorageCorrupted(msg.into())
    }

    pub fn host(msg: impl Into<String>) -> Self {
        Self::HostError(msg.into())
    }

    /// Whether the caller must choose between failing loudly and resetting storage
    pub fn is_corruption(&self) -> bool {
        matches!(self, Self::StorageCorrupted(_))
    }
}

pub type Result<T> = std::result::Result<T, FocusError>;
