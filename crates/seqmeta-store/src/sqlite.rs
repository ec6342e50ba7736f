//! `SQLite` persistence for entity metadata columns.

use crate::error::StoreError;
use crate::options::{ApplyStrategy, StoreOptions};
use rusqlite::types::ValueRef;
use rusqlite::{Connection, ErrorCode, OptionalExtension, TransactionBehavior};
use seqmeta_core::{codec, is_noop, merge_owned, EntityKind, EntityRef, JsonValue, ParseError};
use std::path::Path;

/// A metadata column with its bookkeeping fields.
#[derive(Debug, Clone, PartialEq)]
pub struct MetadataRecord {
    /// Owning entity
    pub entity: EntityRef,
    /// Current document
    pub document: JsonValue,
    /// Number of committed writes since creation
    pub version: i64,
    /// Time of the last write, milliseconds since UNIX epoch
    pub updated_at_ms: i64,
}

/// `SQLite`-backed metadata store.
///
/// Each entity kind has its own table; every row owns exactly one `meta`
/// column holding JSON text.
pub struct SqliteStore {
    conn: Connection,
    options: StoreOptions,
}

impl SqliteStore {
    /// Open or create a database file.
    ///
    /// # Errors
    ///
    /// Returns error if the database cannot be opened or initialized.
    pub fn open(path: &Path, options: StoreOptions) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        // WAL keeps readers off the writer's lock while a patch is applied.
        conn.pragma_update(None, "journal_mode", "WAL")?;
        Self::from_connection(conn, options)
    }

    /// Create an in-memory database (for testing).
    ///
    /// # Errors
    ///
    /// Returns error if the database cannot be created.
    pub fn in_memory() -> Result<Self, StoreError> {
        Self::in_memory_with(StoreOptions::default())
    }

    /// Create an in-memory database with explicit options.
    ///
    /// # Errors
    ///
    /// Returns error if the database cannot be created.
    pub fn in_memory_with(options: StoreOptions) -> Result<Self, StoreError> {
        Self::from_connection(Connection::open_in_memory()?, options)
    }

    fn from_connection(conn: Connection, options: StoreOptions) -> Result<Self, StoreError> {
        conn.busy_timeout(options.busy_timeout)?;
        let store = Self { conn, options };
        store.init_schema()?;
        tracing::debug!(strategy = %options.strategy, "Opened metadata store");
        Ok(store)
    }

    /// Options the store was opened with.
    #[must_use]
    pub fn options(&self) -> &StoreOptions {
        &self.options
    }

    /// Initialize database schema.
    fn init_schema(&self) -> Result<(), StoreError> {
        for kind in EntityKind::ALL {
            self.conn.execute_batch(&format!(
                r"
                CREATE TABLE IF NOT EXISTS {table} (
                    id TEXT PRIMARY KEY,
                    meta TEXT NOT NULL,
                    version INTEGER NOT NULL DEFAULT 0,
                    updated_at INTEGER NOT NULL
                );
                ",
                table = kind.table()
            ))?;
        }
        Ok(())
    }

    /// Create an entity of the given kind with a fresh id.
    ///
    /// # Errors
    ///
    /// Returns error if the insert fails.
    pub fn create_entity(
        &self,
        kind: EntityKind,
        initial: &JsonValue,
    ) -> Result<EntityRef, StoreError> {
        let entity = EntityRef::generate(kind);
        self.create_entity_with_id(&entity, initial)?;
        Ok(entity)
    }

    /// Create an entity with a caller-chosen id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::EntityExists`] if the id is taken,
    /// [`StoreError::InvalidDocument`] if `initial` nests deeper than
    /// [`codec::MAX_NESTING_DEPTH`], or a storage error if the insert fails.
    pub fn create_entity_with_id(
        &self,
        entity: &EntityRef,
        initial: &JsonValue,
    ) -> Result<(), StoreError> {
        codec::check_depth(initial).map_err(StoreError::InvalidDocument)?;

        let sql = format!(
            "INSERT INTO {} (id, meta, version, updated_at) VALUES (?1, ?2, 0, ?3)",
            entity.kind.table()
        );

        match self.conn.execute(
            &sql,
            (entity.id.to_string(), codec::to_string(initial), now_ms()),
        ) {
            Ok(_) => {
                tracing::debug!(entity = %entity, "Created entity");
                Ok(())
            }
            Err(err) if err.sqlite_error_code() == Some(ErrorCode::ConstraintViolation) => {
                Err(StoreError::EntityExists(*entity))
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Get the current metadata document of an entity.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::EntityNotFound`] or
    /// [`StoreError::MalformedStoredDocument`], or a storage error.
    pub fn get_metadata(&self, entity: &EntityRef) -> Result<JsonValue, StoreError> {
        self.get_record(entity).map(|record| record.document)
    }

    /// Get the metadata document together with its version and timestamp.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::EntityNotFound`] or
    /// [`StoreError::MalformedStoredDocument`], or a storage error.
    pub fn get_record(&self, entity: &EntityRef) -> Result<MetadataRecord, StoreError> {
        let sql = format!(
            "SELECT meta, version, updated_at FROM {} WHERE id = ?1",
            entity.kind.table()
        );

        let row = self
            .conn
            .query_row(&sql, [entity.id.to_string()], |row| {
                Ok((
                    row.get_ref(0).map(stored_bytes)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, i64>(2)?,
                ))
            })
            .optional()?;

        let Some((stored, version, updated_at_ms)) = row else {
            return Err(StoreError::EntityNotFound(*entity));
        };

        Ok(MetadataRecord {
            entity: *entity,
            document: decode_stored(entity, stored.as_deref())?,
            version,
            updated_at_ms,
        })
    }

    /// Delete an entity and its metadata column.
    ///
    /// Returns `true` if a row was removed.
    ///
    /// # Errors
    ///
    /// Returns error if the delete fails.
    pub fn delete_entity(&self, entity: &EntityRef) -> Result<bool, StoreError> {
        let deleted = self.conn.execute(
            &format!("DELETE FROM {} WHERE id = ?1", entity.kind.table()),
            [entity.id.to_string()],
        )?;
        tracing::debug!(entity = %entity, deleted, "Deleted entity");
        Ok(deleted > 0)
    }

    /// Parse a patch body and apply it with [`SqliteStore::apply_patch`].
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidPatchSyntax`] without touching storage if
    /// `body` is not valid JSON; otherwise as [`SqliteStore::apply_patch`].
    pub fn apply_patch_text(
        &mut self,
        entity: &EntityRef,
        body: &str,
    ) -> Result<JsonValue, StoreError> {
        let patch = codec::parse(body).map_err(StoreError::InvalidPatchSyntax)?;
        self.apply_patch(entity, &patch)
    }

    /// Merge `patch` into the entity's stored document and persist the result.
    ///
    /// The read, the merge and the write form one critical section with
    /// respect to every other writer of this database, so concurrent patches
    /// to the same entity take effect in some serial order and none is lost.
    /// Returns the document that is now stored.
    ///
    /// Transient failures ([`StoreError::StorageUnavailable`]) are retried
    /// according to the store's [`crate::RetryPolicy`].
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidPatchSyntax`] without touching storage if
    /// `patch` nests deeper than [`codec::MAX_NESTING_DEPTH`],
    /// [`StoreError::EntityNotFound`] if there is no row for the entity,
    /// [`StoreError::MalformedStoredDocument`] if the stored column is not
    /// valid JSON text, or a storage error.
    pub fn apply_patch(
        &mut self,
        entity: &EntityRef,
        patch: &JsonValue,
    ) -> Result<JsonValue, StoreError> {
        // A merged document is never deeper than its target or its patch, so
        // bounding the patch keeps every committed document readable.
        codec::check_depth(patch).map_err(StoreError::InvalidPatchSyntax)?;

        let retry = self.options.retry;
        let mut attempt = 1;

        loop {
            match self.apply_once(entity, patch) {
                Err(err) if err.is_retryable() && attempt < retry.max_attempts => {
                    let delay = retry.delay_after(attempt);
                    tracing::warn!(
                        entity = %entity,
                        attempt,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        error = %err,
                        "Storage unavailable, retrying metadata patch"
                    );
                    std::thread::sleep(delay);
                    attempt += 1;
                }
                result => return result,
            }
        }
    }

    fn apply_once(
        &mut self,
        entity: &EntityRef,
        patch: &JsonValue,
    ) -> Result<JsonValue, StoreError> {
        match self.options.strategy {
            ApplyStrategy::Transactional => self.apply_transactional(entity, patch),
            ApplyStrategy::InEngine => self.apply_in_engine(entity, patch),
        }
    }

    fn apply_transactional(
        &mut self,
        entity: &EntityRef,
        patch: &JsonValue,
    ) -> Result<JsonValue, StoreError> {
        let table = entity.kind.table();
        let id = entity.id.to_string();

        // IMMEDIATE takes the write lock up front; a deferred transaction
        // would let two writers read the same pre-image.
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        let stored = tx
            .query_row(
                &format!("SELECT meta FROM {table} WHERE id = ?1"),
                [&id],
                |row| row.get_ref(0).map(stored_bytes),
            )
            .optional()?;

        let Some(stored) = stored else {
            return Err(StoreError::EntityNotFound(*entity));
        };
        let current = decode_stored(entity, stored.as_deref())?;

        if is_noop(&current, patch) {
            tx.commit()?;
            tracing::debug!(entity = %entity, "Metadata patch left document unchanged");
            return Ok(current);
        }

        let merged = merge_owned(current, patch);
        let version: i64 = tx.query_row(
            &format!(
                "UPDATE {table} SET meta = ?1, version = version + 1, updated_at = ?2 \
                 WHERE id = ?3 RETURNING version"
            ),
            (codec::to_string(&merged), now_ms(), &id),
            |row| row.get(0),
        )?;
        tx.commit()?;

        tracing::debug!(entity = %entity, version, "Applied metadata patch");
        Ok(merged)
    }

    fn apply_in_engine(
        &self,
        entity: &EntityRef,
        patch: &JsonValue,
    ) -> Result<JsonValue, StoreError> {
        let table = entity.kind.table();

        let updated = self
            .conn
            .query_row(
                &format!(
                    "UPDATE {table} SET meta = json_patch(meta, ?1), version = version + 1, \
                     updated_at = ?2 WHERE id = ?3 AND typeof(meta) = 'text' AND json_valid(meta) \
                     RETURNING meta, version"
                ),
                (codec::to_string(patch), now_ms(), entity.id.to_string()),
                |row| Ok((row.get_ref(0).map(stored_bytes)?, row.get::<_, i64>(1)?)),
            )
            .optional()?;

        match updated {
            Some((stored, version)) => {
                let merged = decode_stored(entity, stored.as_deref())?;
                tracing::debug!(entity = %entity, version, "Applied metadata patch in engine");
                Ok(merged)
            }
            None => Err(self.diagnose_missed_update(entity)),
        }
    }

    /// Explain why the in-engine `UPDATE` matched no row.
    fn diagnose_missed_update(&self, entity: &EntityRef) -> StoreError {
        match self.get_record(entity) {
            Ok(_) => StoreError::MalformedStoredDocument {
                entity: *entity,
                source: ParseError::custom("stored text rejected by json_valid"),
            },
            Err(err) => err,
        }
    }
}

fn stored_bytes(value: ValueRef<'_>) -> Option<Vec<u8>> {
    match value {
        ValueRef::Text(bytes) => Some(bytes.to_vec()),
        _ => None,
    }
}

fn decode_stored(entity: &EntityRef, stored: Option<&[u8]>) -> Result<JsonValue, StoreError> {
    let parsed = match stored {
        Some(bytes) => codec::parse_slice(bytes),
        None => Err(ParseError::custom("column does not hold text")),
    };

    parsed.map_err(|source| {
        tracing::error!(entity = %entity, error = %source, "Stored metadata is malformed");
        StoreError::MalformedStoredDocument {
            entity: *entity,
            source,
        }
    })
}

fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
