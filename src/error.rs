//! Error types for tabfetch
//!
//! Centralized error handling using thiserror.

use thiserror::Error;

use crate::provider::ProviderError;

/// All error types that can escape the tabfetch library
#[derive(Debug, Error)]
pub enum TabfetchError {
    /// A provider failure that is not tied to a single tab; aborts the drain pass
    #[error("Fatal fetch error: {0}")]
    Fatal(#[from] ProviderError),

    /// Invalid configuration value
    #[error("Config error: {0}")]
    Config(String),
}

impl TabfetchError {
    /// Whether this error came out of a provider call
    pub fn is_fatal_fetch(&self) -> bool {
        matches!(self, TabfetchError::Fatal(_))
    }
}

/// Result type alias for tabfetch operations
pub type Result<T> = std::result::Result<T, TabfetchError>;
