//! # seqmeta Core
//!
//! Metadata document model and merge semantics for seqmeta.
//!
//! Every sample, sequence, assay and analysis carries an open-ended `meta`
//! document. Clients update it with partial documents that follow RFC 7396
//! (JSON Merge Patch). This crate provides:
//! - Entity references addressing one metadata column
//! - A closed JSON value model with structural equality
//! - The parse/encode boundary (duplicate keys: last occurrence wins)
//! - The pure, total merge algorithm and patch derivation

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod codec;
pub mod entity;
pub mod merge;
pub mod value;

pub use codec::{check_depth, parse, parse_slice, ParseError, MAX_NESTING_DEPTH};
pub use entity::{EntityKind, EntityParseError, EntityRef};
pub use merge::{diff, is_noop, merge, merge_all, merge_owned};
pub use value::{JsonValue, Map};
