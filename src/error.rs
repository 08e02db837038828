use std::path::PathBuf;

use thiserror::Error;

/// Failures that reach outside the workflow layer.
///
/// Validation problems and missing edit targets are not errors at this level;
/// the workflow turns them into re-rendered states. Everything here propagates
/// to the transport boundary.
#[derive(Debug, Error)]
pub enum Error {
    #[error("{resource} entry {id} not found")]
    NotFound { resource: &'static str, id: i32 },

    #[error("{resource} entry {id} already exists")]
    Conflict { resource: &'static str, id: i32 },

    #[error("no {resource} ids left to assign")]
    IdsExhausted { resource: &'static str },

    #[error("session required")]
    Unauthenticated,

    #[error("'{identity}' is not allowed to {operation}")]
    Forbidden {
        identity: String,
        operation: &'static str,
    },

    #[error("incorrect password or account does not exist")]
    InvalidCredentials,

    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

/// Storage failures. Never masked as an empty collection.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("I/O error on '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed snapshot '{}': {source}", path.display())]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("could not encode snapshot: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        Self::Persistence(PersistenceError::Database(err))
    }
}

impl Error {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;
