//! Error types shared by the storage adapters and the service layer.
//!
//! Two levels exist:
//!
//! - [`StorageError`] is returned by every [`crate::domain::repositories::UrlRepository`]
//!   implementation. `CodeAlreadyExists` is a collision signal that the service
//!   consumes by retrying with a new candidate.
//! - [`AppError`] is what the inbound boundary ([`crate::application::services::UrlService`])
//!   returns to its callers.

use thiserror::Error;

/// Errors produced by storage adapters.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The code has never been stored.
    #[error("code {0} not found")]
    NotFound(String),

    /// The code exists but was soft-deleted.
    #[error("code {0} was deleted")]
    UrlDeleted(String),

    /// The code is already occupied by another entry.
    #[error("code {0} already exists")]
    CodeAlreadyExists(String),

    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("corrupted storage record: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl StorageError {
    /// Returns true for the collision signal that triggers a retry.
    pub fn is_code_collision(&self) -> bool {
        matches!(self, Self::CodeAlreadyExists(_))
    }
}

/// Errors surfaced by the service layer.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("empty URL")]
    EmptyUrl { index: Option<usize> },

    #[error("invalid URL: {reason}")]
    InvalidUrl { index: Option<usize>, reason: String },

    #[error("short URL {0} not found")]
    NotFound(String),

    #[error("short URL {0} was deleted")]
    UrlDeleted(String),

    /// Every generated candidate collided.
    #[error("max retries exceeded for code generation after {attempts} attempts")]
    MaxRetriesExceeded { attempts: usize },

    /// The batch-delete worker has stopped and no longer accepts tasks.
    #[error("deletion queue is closed")]
    DeletionUnavailable,

    #[error(transparent)]
    Storage(StorageError),
}

impl AppError {
    /// Errors the caller should report as "not found".
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_) | Self::UrlDeleted(_))
    }

    /// Errors the caller should report as a server failure.
    pub fn is_server_error(&self) -> bool {
        matches!(
            self,
            Self::MaxRetriesExceeded { .. } | Self::DeletionUnavailable | Self::Storage(_)
        )
    }
}

impl From<StorageError> for AppError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::NotFound(code) => Self::NotFound(code),
            StorageError::UrlDeleted(code) => Self::UrlDeleted(code),
            other => Self::Storage(other),
        }
    }
}

/// Checks whether a database error is a primary-key violation on `urls.code`.
pub fn is_unique_violation_on_code(e: &sqlx::Error) -> bool {
    let Some(db_err) = e.as_database_error() else {
        return false;
    };

    if !db_err.is_unique_violation() {
        return false;
    }

    matches!(db_err.constraint(), Some("urls_pkey"))
}
