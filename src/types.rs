use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Field holding a record's identifier.
pub const ID_FIELD: &str = "_id";
/// Field holding a record's creation timestamp; the default sort key.
pub const CREATED_AT_FIELD: &str = "createdAt";

/// Record identifier, stored in records as a string under `_id`.
/// Generated ids are UUID v7; ids supplied by callers (seed data) are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DocumentId(pub String);

impl DocumentId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7().hyphenated().to_string())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Reads the id of a record, if it carries a non-empty string `_id`.
    #[must_use]
    pub fn of(record: &bson::Document) -> Option<Self> {
        match record.get(ID_FIELD) {
            Some(bson::Bson::String(s)) if !s.is_empty() => Some(Self(s.clone())),
            _ => None,
        }
    }
}

impl Default for DocumentId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DocumentId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<DocumentId> for bson::Bson {
    fn from(id: DocumentId) -> Self {
        Self::String(id.0)
    }
}
