//! Unified error type for the bill engine.

use sea_orm::{DbErr, SqlErr};
use thiserror::Error;

/// Every failure the engine can surface to its callers.
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid schedule, category assignment, or configuration file.
    #[error("Configuration error: {message}")]
    Config {
        /// What was wrong
        message: String,
    },

    /// Amount that is zero, negative, or not finite.
    #[error("Invalid amount: {amount}")]
    InvalidAmount {
        /// The rejected amount
        amount: f64,
    },

    /// No bill series with this id.
    #[error("Bill series not found: {id}")]
    SeriesNotFound {
        /// Requested series id
        id: i64,
    },

    /// No bill instance with this id.
    #[error("Bill instance not found: {id}")]
    InstanceNotFound {
        /// Requested instance id
        id: i64,
    },

    /// No category with this id in the budget.
    #[error("Category not found: {id}")]
    CategoryNotFound {
        /// Requested category id
        id: i64,
    },

    /// Another writer regenerated the same series concurrently. Safe to retry.
    #[error("Concurrent update detected on bill series {series_id}; retry the request")]
    Conflict {
        /// Series that was being reconciled
        series_id: i64,
    },

    /// Any other storage failure.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),

    /// Filesystem failure while bootstrapping.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Unreadable environment variable.
    #[error("Environment variable error: {0}")]
    EnvVar(#[from] std::env::VarError),
}

impl Error {
    /// Whether the caller may retry the same request unchanged.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }

    /// Maps a unique-constraint violation on a series' instances to [`Error::Conflict`].
    pub(crate) fn conflict_on_unique(err: DbErr, series_id: i64) -> Self {
        match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(_)) => Self::Conflict { series_id },
            _ => Self::Database(err),
        }
    }
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
