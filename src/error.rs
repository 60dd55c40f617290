//! Error types for remote store calls and distribution submissions

use thiserror::Error;

/// Remote store error
#[derive(Debug, Error)]
pub enum StoreError {
    /// Transport fault (connect, timeout, TLS, body read)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Remote answered with a non-success status
    #[error("remote store returned {status}: {body}")]
    Status { status: u16, body: String },

    /// Project or table lookup yielded nothing
    #[error("{kind} '{name}' not found")]
    NotFound { kind: &'static str, name: String },

    /// Client settings rejected before any request is made
    #[error("Invalid store configuration: {0}")]
    Config(String),

    /// Payload did not have the expected shape
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    pub fn not_found(kind: &'static str, name: impl Into<String>) -> Self {
        StoreError::NotFound {
            kind,
            name: name.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }
}

/// Result type for remote store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Reasons a whole submission is refused before any line is processed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmitError {
    #[error("DistributionLog table not found. Run the setup flow first.")]
    LogTableMissing,

    #[error("Products table not found. Run the setup flow first.")]
    ProductsTableMissing,

    #[error("no devotee selected")]
    NoDevotee,
}
