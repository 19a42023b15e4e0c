//! Points scoring and ledger mutation
//!
//! Leaders earn double points on the project outcome: positive on success,
//! negative on failure. The ledger write is a single upsert built here so
//! the totals only ever move by `$inc` and history only grows by `$push`.

use bson::{doc, DateTime, Document};

use crate::db::schemas::{
    ActivityType, PointsTransaction, ProjectDoc, ProjectPriority, TransactionMetadata,
    VolunteerOutcome,
};
use crate::types::{ForemanError, Result};

/// Volunteer leaders earn double the base award
pub const LEADER_MULTIPLIER: i64 = 2;

/// Reason recorded on penalty transactions
pub const PENALTY_REASON: &str = "Project failed as volunteer leader";

/// Base points by project priority
pub fn base_points(priority: ProjectPriority) -> i64 {
    match priority {
        ProjectPriority::High => 50,
        ProjectPriority::Medium => 30,
        ProjectPriority::Low => 20,
    }
}

/// Signed award for a leadership outcome: doubled base points, positive on
/// success, negative on failure.
pub fn award(priority: ProjectPriority, outcome: VolunteerOutcome) -> i64 {
    let doubled = base_points(priority) * LEADER_MULTIPLIER;
    match outcome {
        VolunteerOutcome::Success => doubled,
        VolunteerOutcome::Failure => -doubled,
    }
}

/// Build the ledger entry for a recorded outcome
pub fn transaction_for(project: &ProjectDoc, outcome: VolunteerOutcome) -> PointsTransaction {
    let points = award(project.priority, outcome);

    let activity_type = match outcome {
        VolunteerOutcome::Success => ActivityType::ProjectCompletion,
        VolunteerOutcome::Failure => ActivityType::Penalty,
    };

    let penalty_reason = match outcome {
        VolunteerOutcome::Success => None,
        VolunteerOutcome::Failure => Some(PENALTY_REASON.to_string()),
    };

    PointsTransaction {
        activity_type,
        points,
        description: format!("Volunteer Leader - {} ({})", project.title, outcome),
        metadata: TransactionMetadata {
            project_id: project._id,
            penalty_reason,
        },
        created_at: DateTime::now(),
    }
}

/// Build the atomic upsert that applies a transaction to a user's ledger.
///
/// Paired with a `{ employee_id }` filter and `upsert: true`, this creates
/// the ledger on first award and accumulates thereafter without any
/// read-modify-write.
pub fn ledger_award_update(transaction: &PointsTransaction) -> Result<Document> {
    let entry = bson::to_bson(transaction)
        .map_err(|e| ForemanError::Database(format!("Failed to encode transaction: {}", e)))?;

    Ok(doc! {
        "$inc": {
            "total_points": transaction.points,
            "monthly_points": transaction.points,
        },
        "$push": { "transactions": entry },
        "$set": { "metadata.updated_at": DateTime::now() },
        "$setOnInsert": {
            "metadata.created_at": DateTime::now(),
            "metadata.is_deleted": false,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::oid::ObjectId;

    fn project(priority: ProjectPriority) -> ProjectDoc {
        ProjectDoc {
            _id: Some(ObjectId::new()),
            title: "Checkout rewrite".to_string(),
            priority,
            ..Default::default()
        }
    }

    #[test]
    fn test_award_table() {
        use ProjectPriority::*;
        use VolunteerOutcome::*;

        assert_eq!(award(High, Success), 100);
        assert_eq!(award(High, Failure), -100);
        assert_eq!(award(Medium, Success), 60);
        assert_eq!(award(Medium, Failure), -60);
        assert_eq!(award(Low, Success), 40);
        assert_eq!(award(Low, Failure), -40);
    }

    #[test]
    fn test_success_transaction() {
        let project = project(ProjectPriority::High);
        let tx = transaction_for(&project, VolunteerOutcome::Success);

        assert_eq!(tx.activity_type, ActivityType::ProjectCompletion);
        assert_eq!(tx.points, 100);
        assert_eq!(tx.description, "Volunteer Leader - Checkout rewrite (success)");
        assert_eq!(tx.metadata.project_id, project._id);
        assert!(tx.metadata.penalty_reason.is_none());
    }

    #[test]
    fn test_failure_transaction_carries_penalty_reason() {
        let project = project(ProjectPriority::Low);
        let tx = transaction_for(&project, VolunteerOutcome::Failure);

        assert_eq!(tx.activity_type, ActivityType::Penalty);
        assert_eq!(tx.points, -40);
        assert_eq!(tx.description, "Volunteer Leader - Checkout rewrite (failure)");
        assert_eq!(tx.metadata.penalty_reason.as_deref(), Some(PENALTY_REASON));
    }

    #[test]
    fn test_ledger_update_increments_both_totals() {
        let project = project(ProjectPriority::Medium);
        let tx = transaction_for(&project, VolunteerOutcome::Success);
        let update = ledger_award_update(&tx).unwrap();

        let inc = update.get_document("$inc").unwrap();
        assert_eq!(inc.get_i64("total_points").unwrap(), 60);
        assert_eq!(inc.get_i64("monthly_points").unwrap(), 60);

        let push = update.get_document("$push").unwrap();
        assert!(push.contains_key("transactions"));

        // Creation fields only apply on upsert insertion
        let on_insert = update.get_document("$setOnInsert").unwrap();
        assert!(on_insert.contains_key("metadata.created_at"));
    }

    #[test]
    fn test_ledger_update_applies_negative_award() {
        let project = project(ProjectPriority::High);
        let tx = transaction_for(&project, VolunteerOutcome::Failure);
        let update = ledger_award_update(&tx).unwrap();

        let inc = update.get_document("$inc").unwrap();
        assert_eq!(inc.get_i64("total_points").unwrap(), -100);
        assert_eq!(inc.get_i64("monthly_points").unwrap(), -100);
    }
}
