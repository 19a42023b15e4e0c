//! Points ledger endpoints
//!
//! - `GET /points/me` - The caller's ledger. Users who have never earned or
//!   lost points get a zeroed ledger rather than a 404.

use bson::doc;
use hyper::body::Incoming;
use hyper::{Method, Request, Response, StatusCode};
use serde::Serialize;
use std::sync::Arc;

use crate::db::schemas::{ActivityType, PointsDoc, PointsTransaction, POINTS_COLLECTION};
use crate::routes::{
    claims_user_id, cors_preflight, error_response, error_to_response, get_mongo, json_response,
    require_auth, FullBody,
};
use crate::server::AppState;

// =============================================================================
// Views
// =============================================================================

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TransactionView {
    pub activity_type: ActivityType,
    pub points: i64,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub penalty_reason: Option<String>,
    pub created_at: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct LedgerView {
    pub employee_id: String,
    pub total_points: i64,
    pub monthly_points: i64,
    pub transactions: Vec<TransactionView>,
}

fn transaction_to_view(tx: &PointsTransaction) -> TransactionView {
    TransactionView {
        activity_type: tx.activity_type,
        points: tx.points,
        description: tx.description.clone(),
        project_id: tx.metadata.project_id.map(|v| v.to_hex()),
        penalty_reason: tx.metadata.penalty_reason.clone(),
        created_at: tx.created_at.to_string(),
    }
}

pub(crate) fn ledger_to_view(ledger: &PointsDoc) -> LedgerView {
    LedgerView {
        employee_id: ledger.employee_id.to_hex(),
        total_points: ledger.total_points,
        monthly_points: ledger.monthly_points,
        transactions: ledger.transactions.iter().map(transaction_to_view).collect(),
    }
}

// =============================================================================
// Route Handler
// =============================================================================

/// Main handler for /points routes
pub async fn handle_points_request(
    req: Request<Incoming>,
    state: Arc<AppState>,
    path: &str,
) -> Response<FullBody> {
    let method = req.method().clone();
    let subpath = path.strip_prefix("/points").unwrap_or(path).to_string();

    match (method, subpath.as_str()) {
        (Method::GET, "/me") => handle_my_points(req, state).await,

        (Method::OPTIONS, _) => cors_preflight(),

        (_, "/me") => error_response(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed", None),

        _ => error_response(StatusCode::NOT_FOUND, "Not found", None),
    }
}

/// GET /points/me
async fn handle_my_points(req: Request<Incoming>, state: Arc<AppState>) -> Response<FullBody> {
    let claims = match require_auth(&req, &state) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let user_id = match claims_user_id(&claims) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    let mongo = match get_mongo(&state) {
        Ok(m) => m,
        Err(resp) => return resp,
    };
    let ledgers = match mongo.collection::<PointsDoc>(POINTS_COLLECTION).await {
        Ok(c) => c,
        Err(e) => return error_to_response(&e),
    };

    match ledgers.find_one(doc! { "employee_id": user_id }).await {
        Ok(Some(ledger)) => json_response(StatusCode::OK, &ledger_to_view(&ledger)),
        // No awards yet: answer with an empty ledger
        Ok(None) => json_response(
            StatusCode::OK,
            &LedgerView {
                employee_id: user_id.to_hex(),
                total_points: 0,
                monthly_points: 0,
                transactions: Vec::new(),
            },
        ),
        Err(e) => error_to_response(&e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schemas::TransactionMetadata;
    use bson::oid::ObjectId;

    #[test]
    fn test_ledger_view_serializes_camel_case() {
        let project_id = ObjectId::new();
        let ledger = PointsDoc {
            employee_id: ObjectId::new(),
            total_points: 40,
            monthly_points: 40,
            transactions: vec![
                PointsTransaction {
                    activity_type: ActivityType::ProjectCompletion,
                    points: 100,
                    description: "Volunteer Leader - Apollo (success)".to_string(),
                    metadata: TransactionMetadata {
                        project_id: Some(project_id),
                        penalty_reason: None,
                    },
                    created_at: bson::DateTime::now(),
                },
                PointsTransaction {
                    activity_type: ActivityType::Penalty,
                    points: -60,
                    description: "Volunteer Leader - Gemini (failure)".to_string(),
                    metadata: TransactionMetadata {
                        project_id: Some(ObjectId::new()),
                        penalty_reason: Some("Project failed as volunteer leader".to_string()),
                    },
                    created_at: bson::DateTime::now(),
                },
            ],
            ..Default::default()
        };

        let json = serde_json::to_value(ledger_to_view(&ledger)).unwrap();
        assert_eq!(json["totalPoints"], 40);
        assert_eq!(json["monthlyPoints"], 40);

        let txs = json["transactions"].as_array().unwrap();
        assert_eq!(txs[0]["activityType"], "project_completion");
        assert_eq!(txs[0]["points"], 100);
        assert_eq!(txs[0]["projectId"], project_id.to_hex());
        assert!(txs[0].get("penaltyReason").is_none());
        assert_eq!(txs[1]["activityType"], "penalty");
        assert_eq!(
            txs[1]["penaltyReason"],
            "Project failed as volunteer leader"
        );
    }
}
