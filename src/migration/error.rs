use std::path::PathBuf;
use thiserror::Error;

use crate::gmail::RemoteError;
use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("no pending migrations")]
    NoPendingMigrations,

    #[error("unknown operation {0:?}")]
    UnknownOperation(String),

    #[error("malformed details for {operation}")]
    Decode {
        operation: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("unable to parse migration file {path}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Fatal, never retried.
    #[error("precondition failed: {0}")]
    Precondition(String),

    #[error("{context} failed")]
    Remote {
        context: String,
        #[source]
        source: RemoteError,
    },

    #[error("{context}: gave up after {attempts} attempts")]
    RetriesExhausted {
        context: String,
        attempts: u32,
        #[source]
        source: RemoteError,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl MigrationError {
    pub fn precondition(message: impl Into<String>) -> Self {
        MigrationError::Precondition(message.into())
    }
}

pub type MigrationResult<T> = std::result::Result<T, MigrationError>;
