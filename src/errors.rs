//! # Error Handling Module
//!
//! ## Purpose
//! Centralized error handling for the document insights service, providing the
//! error taxonomy shared by the store, the aggregation query, and the API layer.
//!
//! ## Input/Output Specification
//! - **Input**: Error conditions from validation, storage, and configuration
//! - **Output**: Structured error types with context, mapped to HTTP statuses
//! - **Error Categories**: Validation, NotFound, Database, Configuration, Internal
//!
//! ## Key Features
//! - One error enum for the whole crate with a shared `Result` alias
//! - Automatic conversion from rusqlite and I/O errors
//! - Validation and not-found errors carry caller-correctable messages
//! - Store failures keep full detail for server-side logging while the API
//!   surfaces only a generic message

use thiserror::Error;

/// Result type used throughout the application
pub type Result<T> = std::result::Result<T, DashboardError>;

/// Error types for the document insights service
#[derive(Debug, Error)]
pub enum DashboardError {
    /// Bad or missing caller input; fully recoverable by correcting the request
    #[error("Validation failed for field '{field}': {reason}")]
    Validation { field: String, reason: String },

    /// Lookup of an entity that does not exist
    #[error("{entity} not found")]
    NotFound { entity: String },

    /// Underlying SQLite query or connection failure
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Configuration errors surfaced at startup
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Internal system errors
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl DashboardError {
    /// Build a validation error for a named input field
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        DashboardError::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Build a not-found error for a named entity
    pub fn not_found(entity: impl Into<String>) -> Self {
        DashboardError::NotFound {
            entity: entity.into(),
        }
    }

    /// Get error category for metrics and logging
    pub fn category(&self) -> &'static str {
        match self {
            DashboardError::Validation { .. } => "validation",
            DashboardError::NotFound { .. } => "not_found",
            DashboardError::Database(_) => "store",
            DashboardError::Config { .. } => "configuration",
            DashboardError::Internal { .. } => "internal",
        }
    }

    /// Whether the caller can recover by correcting the request
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            DashboardError::Validation { .. } | DashboardError::NotFound { .. }
        )
    }
}

impl From<std::io::Error> for DashboardError {
    fn from(err: std::io::Error) -> Self {
        DashboardError::Internal {
            message: format!("IO error: {}", err),
        }
    }
}
