//! Error types for the provider configuration core

use thiserror::Error;

/// Errors produced by provider configuration and activation operations
///
/// Structural failures (unknown ids, invalid fields, missing configuration)
/// are typed variants the caller must correct; connectivity failures inside
/// a connection test are ordinary [`ConnectionTestResult`] values and never
/// surface here.
///
/// [`ConnectionTestResult`]: crate::probe::ConnectionTestResult
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Provider id is not in the catalog
    #[error("Unknown provider: {0}")]
    UnknownProvider(String),

    /// Provider exists in the catalog but is not currently offerable
    #[error("Provider is disabled: {0}")]
    Disabled(String),

    /// Config update referenced a field not in the provider's descriptor
    #[error("Invalid field '{field}' for provider '{provider}'")]
    InvalidField { provider: String, field: String },

    /// Connection test attempted before required fields were present
    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    /// Provider does not expose a model-listing endpoint
    #[error("Model discovery not supported for provider: {0}")]
    Unsupported(String),

    /// Model discovery query failed
    #[error("Model discovery failed: {0}")]
    ProbeFailed(String),

    /// Persistence failure
    #[error(transparent)]
    Storage(#[from] jobcraft_storage::StorageError),

    /// Secret encryption/decryption failure
    #[error(transparent)]
    Security(#[from] jobcraft_security::SecurityError),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}
