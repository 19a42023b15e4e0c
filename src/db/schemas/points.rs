//! Points ledger document schema
//!
//! One ledger per user, created lazily on first award. Totals move only via
//! `$inc` and the transaction list only via `$push`, so concurrent awards
//! never lose updates.

use bson::{doc, oid::ObjectId, DateTime, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;

/// Collection name for points ledgers
pub const POINTS_COLLECTION: &str = "points";

/// What kind of activity produced a transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityType {
    /// Positive award for a successful project outcome
    ProjectCompletion,
    /// Negative award for a failed project outcome
    Penalty,
}

impl ActivityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityType::ProjectCompletion => "project_completion",
            ActivityType::Penalty => "penalty",
        }
    }
}

/// Context attached to a transaction
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct TransactionMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_id: Option<ObjectId>,

    /// Set on penalty transactions
    #[serde(skip_serializing_if = "Option::is_none")]
    pub penalty_reason: Option<String>,
}

/// A single append-only ledger entry
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct PointsTransaction {
    pub activity_type: ActivityType,

    /// Signed points delta
    pub points: i64,

    pub description: String,

    #[serde(default)]
    pub metadata: TransactionMetadata,

    pub created_at: DateTime,
}

/// Points ledger document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct PointsDoc {
    /// MongoDB document ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    /// Common metadata (created_at, updated_at, is_deleted)
    #[serde(default)]
    pub metadata: Metadata,

    /// The user this ledger belongs to
    pub employee_id: ObjectId,

    /// Running total across all time
    #[serde(default)]
    pub total_points: i64,

    /// Running total for the current month, reset out-of-band
    #[serde(default)]
    pub monthly_points: i64,

    /// Append-only transaction history
    #[serde(default)]
    pub transactions: Vec<PointsTransaction>,
}

impl IntoIndexes for PointsDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            // One ledger per user
            (
                doc! { "employee_id": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("employee_unique".to_string())
                        .build(),
                ),
            ),
        ]
    }
}

impl MutMetadata for PointsDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_employee_index_is_unique() {
        let indices = PointsDoc::into_indices();
        let (keys, opts) = &indices[0];
        assert_eq!(keys, &doc! { "employee_id": 1 });
        assert_eq!(opts.as_ref().and_then(|o| o.unique), Some(true));
    }

    #[test]
    fn test_activity_type_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&ActivityType::ProjectCompletion).unwrap(),
            "\"project_completion\""
        );
        assert_eq!(
            serde_json::to_string(&ActivityType::Penalty).unwrap(),
            "\"penalty\""
        );
    }

    #[test]
    fn test_fresh_ledger_is_zeroed() {
        let ledger = PointsDoc {
            employee_id: ObjectId::new(),
            ..Default::default()
        };
        assert_eq!(ledger.total_points, 0);
        assert_eq!(ledger.monthly_points, 0);
        assert!(ledger.transactions.is_empty());
    }
}
