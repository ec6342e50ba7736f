//! Store error taxonomy.

use rusqlite::ErrorCode;
use seqmeta_core::{EntityRef, ParseError};

/// Errors that can occur reading or updating metadata columns.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No row exists for the entity
    #[error("entity not found: {0}")]
    EntityNotFound(EntityRef),

    /// A row already exists for the entity
    #[error("entity already exists: {0}")]
    EntityExists(EntityRef),

    /// The stored column does not hold valid JSON and needs manual repair
    #[error("stored metadata for {entity} is malformed: {source}")]
    MalformedStoredDocument {
        /// Entity whose column is corrupt
        entity: EntityRef,
        /// Parser diagnostic
        source: ParseError,
    },

    /// The patch body is not valid JSON, or nests too deeply to store
    #[error("invalid patch syntax: {0}")]
    InvalidPatchSyntax(#[source] ParseError),

    /// An initial document nests too deeply to store
    #[error("invalid document: {0}")]
    InvalidDocument(#[source] ParseError),

    /// The database is busy, locked, or unreachable; safe to retry
    #[error("storage unavailable: {0}")]
    StorageUnavailable(#[source] rusqlite::Error),

    /// Any other database failure
    #[error("storage error: {0}")]
    Sqlite(#[source] rusqlite::Error),
}

impl StoreError {
    /// Whether retrying the whole operation may succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::StorageUnavailable(_))
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        match err.sqlite_error_code() {
            Some(
                ErrorCode::DatabaseBusy
                | ErrorCode::DatabaseLocked
                | ErrorCode::SystemIoFailure
                | ErrorCode::CannotOpen
                | ErrorCode::DiskFull
                | ErrorCode::FileLockingProtocolFailed,
            ) => StoreError::StorageUnavailable(err),
            _ => StoreError::Sqlite(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use seqmeta_core::EntityKind;

    fn sqlite_failure(code: std::os::raw::c_int) -> rusqlite::Error {
        rusqlite::Error::SqliteFailure(rusqlite::ffi::Error::new(code), None)
    }

    #[test]
    fn busy_and_locked_are_retryable() {
        let busy = StoreError::from(sqlite_failure(rusqlite::ffi::SQLITE_BUSY));
        let locked = StoreError::from(sqlite_failure(rusqlite::ffi::SQLITE_LOCKED));
        let io = StoreError::from(sqlite_failure(rusqlite::ffi::SQLITE_IOERR));
        assert!(busy.is_retryable());
        assert!(locked.is_retryable());
        assert!(io.is_retryable());
    }

    #[test]
    fn other_failures_are_not_retryable() {
        let constraint = StoreError::from(sqlite_failure(rusqlite::ffi::SQLITE_CONSTRAINT));
        assert!(matches!(constraint, StoreError::Sqlite(_)));
        assert!(!constraint.is_retryable());
        assert!(!StoreError::from(rusqlite::Error::QueryReturnedNoRows).is_retryable());

        let entity = seqmeta_core::EntityRef::generate(EntityKind::Sample);
        assert!(!StoreError::EntityNotFound(entity).is_retryable());
    }

    #[test]
    fn messages_name_the_entity() {
        let entity = seqmeta_core::EntityRef::generate(EntityKind::Assay);
        let err = StoreError::MalformedStoredDocument {
            entity,
            source: ParseError::custom("truncated"),
        };
        let message = err.to_string();
        assert!(message.contains(&entity.to_string()));
        assert!(message.contains("truncated"));
    }
}
