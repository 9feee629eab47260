use thiserror::Error;

use crate::db::models::Table;

/// Failure to retrieve a feed from ThingSpeak. Never retried here; the next
/// scheduled sync pass is the retry.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("invalid feed URL: {0}")]
    InvalidUrl(String),

    #[error("feed request failed: {0}")]
    Request(#[source] reqwest::Error),

    #[error("feed endpoint returned HTTP {status} for channel {channel_id}")]
    Status { channel_id: String, status: u16 },

    #[error("failed to read feed body: {0}")]
    Body(#[source] reqwest::Error),
}

/// A required greenhouse field could not be coerced; the whole row is dropped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoercionError {
    #[error("field {index} ({name}) is missing")]
    MissingField { index: usize, name: &'static str },

    #[error("field {name} is not a valid number: {value:?}")]
    InvalidNumber { name: &'static str, value: String },

    #[error("invalid time stamp {value:?}: {reason}")]
    InvalidTimeStamp { value: String, reason: String },
}

#[derive(Debug, Error)]
#[error("failed to write {table} row {time_stamp:?}: {source}")]
pub struct WriteError {
    pub table: Table,
    pub time_stamp: String,
    #[source]
    pub source: sqlx::Error,
}

/// Failure of a whole feed pass. Row-level problems are counted in
/// `BatchStats` instead.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("storage error: {0}")]
    Storage(#[from] sqlx::Error),

    #[error("no feed configured for table {0}")]
    NotConfigured(Table),
}
