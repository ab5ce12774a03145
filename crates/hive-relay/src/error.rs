//! Error types for the relay.

use hive_db::DbError;
use hive_factions::{FactionError, FactionErrorKind};

/// Why an inbound event could not be applied.
///
/// `NotFound` and `AlreadyExists` reject a single event. `Malformed` and
/// `Upstream` abort the dispatch. None of them close the connection.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// A faction or member the event refers to does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The event would create something that already exists.
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// The envelope or its payload is not valid JSON of the expected shape.
    #[error("malformed event: {0}")]
    Malformed(#[from] serde_json::Error),

    /// The entity store failed.
    #[error("store error: {0}")]
    Upstream(DbError),

    /// The event is well-formed but describes an impossible transition.
    #[error("invalid event: {0}")]
    Invalid(String),
}

impl From<FactionError> for DispatchError {
    fn from(err: FactionError) -> Self {
        match err.kind() {
            FactionErrorKind::NotFound => Self::NotFound(err.to_string()),
            FactionErrorKind::AlreadyExists => Self::AlreadyExists(err.to_string()),
            FactionErrorKind::Invalid => Self::Invalid(err.to_string()),
        }
    }
}

impl From<DbError> for DispatchError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::Conflict(what) => Self::AlreadyExists(what),
            DbError::NotFound(what) => Self::NotFound(what),
            other => Self::Upstream(other),
        }
    }
}

/// The hub task has stopped and no longer accepts commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("connection hub is not running")]
pub struct HubClosed;

impl<T> From<tokio::sync::mpsc::error::SendError<T>> for HubClosed {
    fn from(_: tokio::sync::mpsc::error::SendError<T>) -> Self {
        Self
    }
}

impl From<tokio::sync::oneshot::error::RecvError> for HubClosed {
    fn from(_: tokio::sync::oneshot::error::RecvError) -> Self {
        Self
    }
}
