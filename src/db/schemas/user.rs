//! User document schema
//!
//! Stores login credentials and the workflow role.

use bson::{doc, oid::ObjectId, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::auth::roles::Role;
use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;

/// Collection name for users
pub const USER_COLLECTION: &str = "users";

/// User document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct UserDoc {
    /// MongoDB document ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    /// Common metadata (created_at, updated_at, is_deleted)
    #[serde(default)]
    pub metadata: Metadata,

    pub first_name: String,

    pub last_name: String,

    /// Login identifier, unique per user
    pub email: String,

    /// Argon2 password hash
    pub password_hash: String,

    /// Workflow role (employee or admin)
    #[serde(default)]
    pub role: Role,

    /// Whether the user account is active
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}

impl UserDoc {
    /// Create a new employee account. Admins are promoted after the fact,
    /// never created through registration.
    pub fn new(first_name: String, last_name: String, email: String, password_hash: String) -> Self {
        Self {
            _id: None,
            metadata: Metadata::new(),
            first_name,
            last_name,
            email,
            password_hash,
            role: Role::Employee,
            is_active: true,
        }
    }

    /// Display name used in request summaries
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

impl IntoIndexes for UserDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            // Unique index on email
            (
                doc! { "email": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("email_unique".to_string())
                        .build(),
                ),
            ),
            // Index on role for admin listings
            (
                doc! { "role": 1 },
                Some(
                    IndexOptions::builder()
                        .name("role_index".to_string())
                        .build(),
                ),
            ),
        ]
    }
}

impl MutMetadata for UserDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_user_defaults() {
        let user = UserDoc::new(
            "Ada".to_string(),
            "Lovelace".to_string(),
            "ada@example.com".to_string(),
            "$argon2id$fake".to_string(),
        );

        assert!(user._id.is_none());
        assert!(user.is_active);
        assert_eq!(user.role, Role::Employee);
        assert_eq!(user.full_name(), "Ada Lovelace");
    }

    #[test]
    fn test_email_index_is_unique() {
        let indices = UserDoc::into_indices();
        let (keys, opts) = &indices[0];
        assert_eq!(keys, &doc! { "email": 1 });
        assert_eq!(opts.as_ref().and_then(|o| o.unique), Some(true));
    }
}
