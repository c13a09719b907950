//! Error types for sql-unbind

use thiserror::Error;

use crate::graph::DependencyGraph;

/// Errors that can occur while discovering and unbinding schema-bound dependents
#[derive(Error, Debug)]
pub enum UnbindError {
    #[error("Object not found in catalog: [{schema}].[{name}]")]
    ObjectNotFound { schema: String, name: String },

    #[error("Invalid object name '{name}': expected a one- or two-part name such as [Sales].[Orders]")]
    InvalidName { name: String },

    #[error(
        "Dependency traversal exceeded the maximum depth of {max_depth} ({} objects discovered so far)",
        .partial.len()
    )]
    DependencyDepthExceeded {
        max_depth: usize,
        /// Everything discovered before the ceiling was hit
        partial: Box<DependencyGraph>,
    },

    #[error("Catalog unavailable during {operation}: {message}")]
    CatalogUnavailable { operation: String, message: String },

    #[error(
        "Statement failed for {failed_entry} after {succeeded} entries were unbound: {message}"
    )]
    StatementExecutionFailed {
        /// The DDL text that was rejected
        statement: String,
        /// Object the failing statement belonged to
        failed_entry: String,
        /// Working-set entries unbound before the failure
        succeeded: usize,
        message: String,
    },

    #[error("Definition of {object} still carries SCHEMABINDING after rewrite")]
    VerificationFailed { object: String },

    #[error("Could not re-read {object} after applying its rewrite: {message}")]
    VerificationUnavailable { object: String, message: String },

    #[error("Run cancelled after {completed} entries ({remaining} remaining)")]
    Cancelled { completed: usize, remaining: usize },

    #[error("Invalid statement: {message}")]
    InvalidStatement { message: String },

    #[error("Invalid configuration: {message}")]
    Configuration { message: String },
}

impl UnbindError {
    /// Whether the whole run can safely be retried.
    ///
    /// Only `CatalogUnavailable` qualifies. The orchestrator raises it only
    /// before the first statement is applied; a read failure after that point
    /// is reported as `VerificationUnavailable`.
    pub fn is_retryable(&self) -> bool {
        matches!(self, UnbindError::CatalogUnavailable { .. })
    }

    pub(crate) fn catalog(operation: &str, err: impl std::fmt::Display) -> Self {
        UnbindError::CatalogUnavailable {
            operation: operation.to_string(),
            message: err.to_string(),
        }
    }
}

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, UnbindError>;
