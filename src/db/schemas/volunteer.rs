//! Volunteer request document schema
//!
//! One request per (project, user) pair, enforced by a unique compound
//! index. Status moves monotonically: pending -> accepted or rejected,
//! accepted -> completed. The one exception is a completion whose points
//! award fails, which steps back to accepted so it can be retried.

use bson::{doc, oid::ObjectId, DateTime, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;

/// Collection name for volunteer requests
pub const VOLUNTEER_COLLECTION: &str = "volunteer_requests";

/// Request lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum VolunteerStatus {
    #[default]
    Pending,
    Accepted,
    Rejected,
    Completed,
}

impl VolunteerStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VolunteerStatus::Pending => "pending",
            VolunteerStatus::Accepted => "accepted",
            VolunteerStatus::Rejected => "rejected",
            VolunteerStatus::Completed => "completed",
        }
    }

    /// Whether an admin decision (accept/reject) is still possible
    pub fn is_pending(&self) -> bool {
        matches!(self, VolunteerStatus::Pending)
    }

    /// Whether an outcome can be recorded
    pub fn is_accepted(&self) -> bool {
        matches!(self, VolunteerStatus::Accepted)
    }
}

impl fmt::Display for VolunteerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Recorded outcome of a completed leadership
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VolunteerOutcome {
    Success,
    Failure,
}

impl VolunteerOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            VolunteerOutcome::Success => "success",
            VolunteerOutcome::Failure => "failure",
        }
    }

    /// Parse a client-supplied outcome string
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "success" => Some(VolunteerOutcome::Success),
            "failure" => Some(VolunteerOutcome::Failure),
            _ => None,
        }
    }
}

impl fmt::Display for VolunteerOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Volunteer request document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct VolunteerRequestDoc {
    /// MongoDB document ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    /// Common metadata (created_at, updated_at, is_deleted)
    #[serde(default)]
    pub metadata: Metadata,

    pub project_id: ObjectId,

    pub user_id: ObjectId,

    pub volunteered_at: DateTime,

    #[serde(default)]
    pub status: VolunteerStatus,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<VolunteerOutcome>,

    /// Signed points recorded at completion
    #[serde(skip_serializing_if = "Option::is_none")]
    pub points_awarded: Option<i64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime>,

    /// Admin notes from reject/complete decisions
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl VolunteerRequestDoc {
    /// Create a request in the given initial status.
    ///
    /// Self-volunteering records the request already accepted; the admin
    /// approval path creates it pending.
    pub fn new(project_id: ObjectId, user_id: ObjectId, status: VolunteerStatus) -> Self {
        Self {
            _id: None,
            metadata: Metadata::new(),
            project_id,
            user_id,
            volunteered_at: DateTime::now(),
            status,
            outcome: None,
            points_awarded: None,
            completed_at: None,
            notes: None,
        }
    }
}

// `volunteered_at` has no natural zero value, so Default cannot be derived
impl Default for VolunteerRequestDoc {
    fn default() -> Self {
        Self::new(
            ObjectId::default(),
            ObjectId::default(),
            VolunteerStatus::default(),
        )
    }
}

impl IntoIndexes for VolunteerRequestDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            // One request per (project, user)
            (
                doc! { "project_id": 1, "user_id": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("project_user_unique".to_string())
                        .build(),
                ),
            ),
            // Index on user for my-requests listings
            (
                doc! { "user_id": 1 },
                Some(
                    IndexOptions::builder()
                        .name("user_index".to_string())
                        .build(),
                ),
            ),
            // Index on status for admin triage
            (
                doc! { "status": 1 },
                Some(
                    IndexOptions::builder()
                        .name("status_index".to_string())
                        .build(),
                ),
            ),
        ]
    }
}

impl MutMetadata for VolunteerRequestDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_guards() {
        assert!(VolunteerStatus::Pending.is_pending());
        assert!(!VolunteerStatus::Pending.is_accepted());

        assert!(VolunteerStatus::Accepted.is_accepted());
        assert!(!VolunteerStatus::Accepted.is_pending());

        assert!(!VolunteerStatus::Rejected.is_pending());
        assert!(!VolunteerStatus::Rejected.is_accepted());

        assert!(!VolunteerStatus::Completed.is_pending());
        assert!(!VolunteerStatus::Completed.is_accepted());
    }

    #[test]
    fn test_outcome_parsing() {
        assert_eq!(
            VolunteerOutcome::parse("success"),
            Some(VolunteerOutcome::Success)
        );
        assert_eq!(
            VolunteerOutcome::parse("failure"),
            Some(VolunteerOutcome::Failure)
        );
        assert_eq!(VolunteerOutcome::parse("Success"), None);
        assert_eq!(VolunteerOutcome::parse(""), None);
    }

    #[test]
    fn test_project_user_index_is_unique_compound() {
        let indices = VolunteerRequestDoc::into_indices();
        let (keys, opts) = &indices[0];
        assert_eq!(keys, &doc! { "project_id": 1, "user_id": 1 });
        assert_eq!(opts.as_ref().and_then(|o| o.unique), Some(true));
    }

    #[test]
    fn test_new_request_carries_initial_status() {
        let request = VolunteerRequestDoc::new(
            ObjectId::new(),
            ObjectId::new(),
            VolunteerStatus::Accepted,
        );
        assert_eq!(request.status, VolunteerStatus::Accepted);
        assert!(request.outcome.is_none());
        assert!(request.points_awarded.is_none());
        assert!(request.completed_at.is_none());
    }
}
