//! Error taxonomy for the receipt indexing and query engine.

use serde::{Deserialize, Serialize};

pub type Result<T> = std::result::Result<T, EngineError>;

/// A machine-readable description of an [`EngineError`], suitable for
/// logging or returning to a caller without exposing the `Display` text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub kind: &'static str,
    pub message: String,
    /// Populated for `Validation` errors: the offending field name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("validation error on field '{field}': {message}")]
    Validation { field: String, message: String },

    #[error("not found: {resource}")]
    NotFound { resource: String },

    #[error("storage error during {operation} on '{key}': {source}")]
    Storage {
        operation: String,
        key: String,
        #[source]
        source: object_store::Error,
    },

    #[error("pushdown scan failed on '{key}': {message}")]
    Pushdown { key: String, message: String },

    #[error("operation cancelled: {operation}")]
    Cancelled { operation: String },

    #[error("invalid configuration: {message}")]
    Config { message: String },
}

impl EngineError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
        }
    }

    pub fn storage(
        operation: impl Into<String>,
        key: impl Into<String>,
        source: object_store::Error,
    ) -> Self {
        Self::Storage {
            operation: operation.into(),
            key: key.into(),
            source,
        }
    }

    pub fn pushdown(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Pushdown {
            key: key.into(),
            message: message.into(),
        }
    }

    pub fn cancelled(operation: impl Into<String>) -> Self {
        Self::Cancelled {
            operation: operation.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// True iff the store reported the object as absent rather than a
    /// genuine I/O failure — callers use this to distinguish §7's
    /// `NotFoundError` from `StorageError` when wrapping a raw
    /// `object_store::Error`.
    pub fn is_not_found(source: &object_store::Error) -> bool {
        matches!(source, object_store::Error::NotFound { .. })
    }

    pub fn kind(&self) -> &'static str {
        match self {
            EngineError::Validation { .. } => "ValidationError",
            EngineError::NotFound { .. } => "NotFoundError",
            EngineError::Storage { .. } => "StorageError",
            EngineError::Pushdown { .. } => "PushdownError",
            EngineError::Cancelled { .. } => "CancelledError",
            EngineError::Config { .. } => "ConfigError",
        }
    }

    pub fn detail(&self) -> ErrorDetail {
        let field = match self {
            EngineError::Validation { field, .. } => Some(field.clone()),
            _ => None,
        };
        ErrorDetail {
            kind: self.kind(),
            message: self.to_string(),
            field,
        }
    }
}

/// Converts a raw store error into the right `EngineError` variant for a
/// given operation, following §7's rule that `NotFound` surfaces distinctly
/// from other I/O failures.
pub fn from_store_error(
    operation: impl Into<String>,
    key: impl Into<String>,
    source: object_store::Error,
) -> EngineError {
    let key = key.into();
    if EngineError::is_not_found(&source) {
        EngineError::not_found(key)
    } else {
        EngineError::storage(operation, key, source)
    }
}
