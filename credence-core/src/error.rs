//! Error types for CREDENCE operations
//!
//! Only [`CredenceError`] crosses the resolver boundary. Provider failures
//! are data ([`ProviderFailure`]) recorded in the resolution trace, and a
//! legitimate "not found" is `Ok(None)`.

use std::time::Duration;
use thiserror::Error;

/// Why a single provider attempt did not produce a record.
///
/// Recoverable at the orchestration level: the chain moves on to the next
/// provider.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProviderFailure {
    #[error("timed out after {after:?}")]
    Timeout { after: Duration },

    #[error("no matching record")]
    NotFound,

    #[error("unexpected page structure: {reason}")]
    Parse { reason: String },

    #[error("transport error: {reason}")]
    Transport { reason: String },

    #[error("source unavailable: {reason}")]
    Unavailable { reason: String },
}

impl ProviderFailure {
    pub fn parse(reason: impl Into<String>) -> Self {
        Self::Parse {
            reason: reason.into(),
        }
    }

    pub fn transport(reason: impl Into<String>) -> Self {
        Self::Transport {
            reason: reason.into(),
        }
    }

    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable {
            reason: reason.into(),
        }
    }

    /// Short machine-friendly label for structured logs.
    pub fn kind(&self) -> &'static str {
        match self {
            ProviderFailure::Timeout { .. } => "timeout",
            ProviderFailure::NotFound => "not_found",
            ProviderFailure::Parse { .. } => "parse_error",
            ProviderFailure::Transport { .. } => "transport_error",
            ProviderFailure::Unavailable { .. } => "unavailable",
        }
    }
}

/// Cache store errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StorageError {
    #[error("Cache store unreachable: {reason}")]
    Unreachable { reason: String },

    #[error("Transaction failed: {reason}")]
    TransactionFailed { reason: String },

    #[error("Corrupt cache entry for {key}: {reason}")]
    Corrupt { key: String, reason: String },

    #[error("Storage lock poisoned")]
    LockPoisoned,
}

/// Query validation errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Required field missing: {field}")]
    RequiredFieldMissing { field: String },

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required configuration field: {field}")]
    MissingRequired { field: String },

    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

/// Master error type for the resolver boundary.
#[derive(Debug, Clone, Error)]
pub enum CredenceError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Resolution cancelled by caller")]
    Cancelled,
}

impl CredenceError {
    /// HTTP status the web layer should answer with for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            CredenceError::Validation(_) => 400,
            CredenceError::Cancelled => 499,
            CredenceError::Storage(_) | CredenceError::Config(_) => 500,
        }
    }

    /// Whether this is an internal failure (as opposed to a caller error).
    pub fn is_internal(&self) -> bool {
        matches!(self, CredenceError::Storage(_) | CredenceError::Config(_))
    }
}

/// Result type alias for CREDENCE operations.
pub type CredenceResult<T> = Result<T, CredenceError>;

// =============================================================================
// TESTS
// =============================================================================
