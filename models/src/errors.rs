// models/src/errors.rs

pub use thiserror::Error;

/// Errors raised while validating, storing or reading patient records.
#[derive(Debug, Error)]
pub enum RecordError {
    /// Missing or malformed request fields, an unknown record kind, or a search without filters.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error("Not found: {0}")]
    NotFound(String),
    /// Any statement, connection or transaction failure reported by the store.
    #[error("Store failure: {0}")]
    StoreFailure(String),
    /// A row returned by the store could not be decoded into a record.
    #[error("Malformed result: {0}")]
    MalformedResult(String),
}

pub type RecordResult<T> = std::result::Result<T, RecordError>;

impl RecordError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        RecordError::InvalidArgument(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        RecordError::NotFound(msg.into())
    }
}

#[cfg(feature = "sqlx-errors")]
impl From<sqlx::Error> for RecordError {
    fn from(err: sqlx::Error) -> Self {
        RecordError::StoreFailure(err.to_string())
    }
}
