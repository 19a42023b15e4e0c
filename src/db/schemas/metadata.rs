//! Bookkeeping fields shared by every stored document
//!
//! The collection wrapper stamps these on insert and screens `is_deleted`
//! on every read, so schema types and the workflow never touch them beyond
//! `metadata.updated_at` in their update documents.

use bson::DateTime;
use serde::{Deserialize, Serialize};

/// Timestamps and soft-delete state carried by every document
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct Metadata {
    /// Soft-delete flag; reads filter on this instead of removing rows
    #[serde(default)]
    pub is_deleted: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime>,
}

impl Metadata {
    /// Fresh metadata stamped with the current time
    pub fn new() -> Self {
        Self {
            is_deleted: false,
            deleted_at: None,
            updated_at: Some(DateTime::now()),
            created_at: Some(DateTime::now()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_metadata_is_live_and_stamped() {
        let metadata = Metadata::new();
        assert!(!metadata.is_deleted);
        assert!(metadata.deleted_at.is_none());
        assert!(metadata.created_at.is_some());
        assert!(metadata.updated_at.is_some());
    }

    #[test]
    fn test_unset_timestamps_are_omitted_from_documents() {
        let doc = bson::to_document(&Metadata::default()).unwrap();
        assert_eq!(doc.get_bool("is_deleted").unwrap(), false);
        assert!(!doc.contains_key("deleted_at"));
        assert!(!doc.contains_key("created_at"));
    }
}
