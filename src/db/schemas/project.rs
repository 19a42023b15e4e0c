//! Project document schema
//!
//! Projects carry three team membership sets (coders, freelancers, lead
//! assignee) and at most one leader. Leadership changes only through the
//! volunteer workflow.

use bson::{doc, oid::ObjectId, DateTime, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;

/// Collection name for projects
pub const PROJECT_COLLECTION: &str = "projects";

/// Project lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    #[default]
    Planning,
    Active,
    OnHold,
    Completed,
    Cancelled,
}

impl ProjectStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectStatus::Planning => "planning",
            ProjectStatus::Active => "active",
            ProjectStatus::OnHold => "on_hold",
            ProjectStatus::Completed => "completed",
            ProjectStatus::Cancelled => "cancelled",
        }
    }

    /// Statuses a project can still be volunteered for
    pub fn open_for_volunteering() -> [&'static str; 2] {
        ["planning", "active"]
    }
}

impl fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Project priority, drives the points award
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProjectPriority {
    Low,
    #[default]
    Medium,
    High,
}

impl ProjectPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectPriority::Low => "low",
            ProjectPriority::Medium => "medium",
            ProjectPriority::High => "high",
        }
    }
}

impl fmt::Display for ProjectPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Project document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct ProjectDoc {
    /// MongoDB document ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    /// Common metadata (created_at, updated_at, is_deleted)
    #[serde(default)]
    pub metadata: Metadata,

    pub title: String,

    pub description: String,

    #[serde(default)]
    pub priority: ProjectPriority,

    #[serde(default)]
    pub status: ProjectStatus,

    /// Coders on the team
    #[serde(default)]
    pub coders: Vec<ObjectId>,

    /// Freelancers on the team
    #[serde(default)]
    pub freelancers: Vec<ObjectId>,

    /// Lead assignee, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lead_assignee: Option<ObjectId>,

    /// Current project leader. At most one holder; leadership is assigned
    /// with a conditional update so concurrent volunteers cannot both win.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_leader: Option<ObjectId>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<DateTime>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<DateTime>,
}

impl ProjectDoc {
    /// Whether a user belongs to any of the project's team sets
    pub fn is_team_member(&self, user_id: &ObjectId) -> bool {
        self.coders.contains(user_id)
            || self.freelancers.contains(user_id)
            || self.lead_assignee.as_ref() == Some(user_id)
    }

    pub fn has_leader(&self) -> bool {
        self.project_leader.is_some()
    }
}

impl IntoIndexes for ProjectDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            // Index on status for available-project listings
            (
                doc! { "status": 1 },
                Some(
                    IndexOptions::builder()
                        .name("status_index".to_string())
                        .build(),
                ),
            ),
            // Index on the leader for "who leads what" lookups
            (
                doc! { "project_leader": 1 },
                Some(
                    IndexOptions::builder()
                        .name("project_leader_index".to_string())
                        .build(),
                ),
            ),
        ]
    }
}

impl MutMetadata for ProjectDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn project_with_team(coder: ObjectId, freelancer: ObjectId, lead: ObjectId) -> ProjectDoc {
        ProjectDoc {
            title: "Data pipeline rebuild".to_string(),
            description: "Replace the nightly batch with streaming".to_string(),
            priority: ProjectPriority::High,
            status: ProjectStatus::Active,
            coders: vec![coder],
            freelancers: vec![freelancer],
            lead_assignee: Some(lead),
            ..Default::default()
        }
    }

    #[test]
    fn test_team_membership_covers_all_sets() {
        let coder = ObjectId::new();
        let freelancer = ObjectId::new();
        let lead = ObjectId::new();
        let outsider = ObjectId::new();

        let project = project_with_team(coder, freelancer, lead);

        assert!(project.is_team_member(&coder));
        assert!(project.is_team_member(&freelancer));
        assert!(project.is_team_member(&lead));
        assert!(!project.is_team_member(&outsider));
    }

    #[test]
    fn test_leader_absent_by_default() {
        let project = ProjectDoc::default();
        assert!(!project.has_leader());
    }

    #[test]
    fn test_status_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&ProjectStatus::OnHold).unwrap(),
            "\"on_hold\""
        );
        assert_eq!(
            serde_json::from_str::<ProjectPriority>("\"high\"").unwrap(),
            ProjectPriority::High
        );
    }
}
