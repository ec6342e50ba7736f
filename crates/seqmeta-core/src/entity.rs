//! Entities that own a metadata document.
//!
//! Every sample, sequence, assay and analysis row carries exactly one
//! free-form `meta` column. An [`EntityRef`] addresses that column.

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

/// The kind of entity a metadata document is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    /// A biological sample
    Sample,
    /// A sequencing run output attached to a sample
    Sequence,
    /// An assay performed on a sample
    Assay,
    /// An analysis derived from sequences
    Analysis,
}

impl EntityKind {
    /// All entity kinds, in schema creation order.
    pub const ALL: [EntityKind; 4] = [
        EntityKind::Sample,
        EntityKind::Sequence,
        EntityKind::Assay,
        EntityKind::Analysis,
    ];

    /// Lower-case name used on the command line and in logs.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Sample => "sample",
            EntityKind::Sequence => "sequence",
            EntityKind::Assay => "assay",
            EntityKind::Analysis => "analysis",
        }
    }

    /// Name of the table holding rows of this kind.
    #[must_use]
    pub fn table(&self) -> &'static str {
        match self {
            EntityKind::Sample => "samples",
            EntityKind::Sequence => "sequences",
            EntityKind::Assay => "assays",
            EntityKind::Analysis => "analyses",
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = EntityParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EntityKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| EntityParseError::UnknownKind(s.to_string()))
    }
}

/// Reference to one entity's metadata column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityRef {
    /// Which table the entity lives in
    pub kind: EntityKind,
    /// Row identifier
    pub id: Uuid,
}

impl EntityRef {
    /// Create a reference to an existing entity.
    #[must_use]
    pub fn new(kind: EntityKind, id: Uuid) -> Self {
        Self { kind, id }
    }

    /// Mint a reference with a fresh random id.
    #[must_use]
    pub fn generate(kind: EntityKind) -> Self {
        Self::new(kind, Uuid::new_v4())
    }
}

impl std::fmt::Display for EntityRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}

impl FromStr for EntityRef {
    type Err = EntityParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, id) = s
            .split_once(':')
            .ok_or_else(|| EntityParseError::MissingSeparator(s.to_string()))?;
        let id = Uuid::parse_str(id).map_err(|e| EntityParseError::InvalidId(e.to_string()))?;
        Ok(Self::new(kind.parse()?, id))
    }
}

/// Errors from parsing entity kinds and references.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EntityParseError {
    /// Not one of sample, sequence, assay, analysis
    #[error("unknown entity kind: {0}")]
    UnknownKind(String),
    /// Reference was not of the form `kind:id`
    #[error("expected <kind>:<id>, got {0}")]
    MissingSeparator(String),
    /// Identifier was not a UUID
    #[error("invalid entity id: {0}")]
    InvalidId(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_tables_are_distinct() {
        let mut tables: Vec<_> = EntityKind::ALL.iter().map(EntityKind::table).collect();
        tables.sort_unstable();
        tables.dedup();
        assert_eq!(tables.len(), 4);
    }

    #[test]
    fn kind_from_str() {
        assert_eq!("assay".parse::<EntityKind>(), Ok(EntityKind::Assay));
        assert_eq!(
            "Sample".parse::<EntityKind>(),
            Err(EntityParseError::UnknownKind("Sample".to_string()))
        );
    }

    #[test]
    fn entity_ref_display_roundtrip() {
        let entity = EntityRef::generate(EntityKind::Analysis);
        let text = entity.to_string();
        assert!(text.starts_with("analysis:"));
        assert_eq!(text.parse::<EntityRef>().unwrap(), entity);
    }

    #[test]
    fn entity_ref_rejects_bad_input() {
        assert!(matches!(
            "sample".parse::<EntityRef>(),
            Err(EntityParseError::MissingSeparator(_))
        ));
        assert!(matches!(
            "sample:not-a-uuid".parse::<EntityRef>(),
            Err(EntityParseError::InvalidId(_))
        ));
    }

    #[test]
    fn kind_serializes_lowercase() {
        let json = serde_json::to_string(&EntityKind::Sequence).unwrap();
        assert_eq!(json, "\"sequence\"");
    }
}
