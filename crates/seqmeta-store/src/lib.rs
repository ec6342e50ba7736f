//! # seqmeta Store
//!
//! Persistence for entity metadata columns.
//!
//! The central operation is [`SqliteStore::apply_patch`]: read the stored
//! document, merge a patch into it and write it back, as one critical
//! section against every other writer of the same database. Two strategies
//! are available:
//!
//! - **Transactional**: `BEGIN IMMEDIATE` takes the write lock before the
//!   read; the merge runs in-process.
//! - **In-engine**: a single `UPDATE ... json_patch(...) ... RETURNING`
//!   statement lets SQLite perform the merge under its own lock.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod options;
pub mod sqlite;

pub use error::StoreError;
pub use options::{ApplyStrategy, RetryPolicy, StoreOptions};
pub use sqlite::{MetadataRecord, SqliteStore};
