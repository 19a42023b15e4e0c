//! Volunteer leadership endpoints
//!
//! ## Endpoints
//!
//! - `POST /volunteer-leader/volunteer/{projectId}` - Volunteer to lead (becomes leader immediately)
//! - `GET /volunteer-leader/requests` - All requests with user and project summaries (admin)
//! - `GET /volunteer-leader/my-requests` - Caller's requests with project summaries
//! - `PUT /volunteer-leader/accept/{requestId}` - Accept a pending request (admin)
//! - `PUT /volunteer-leader/reject/{requestId}` - Reject a pending request (admin)
//! - `PUT /volunteer-leader/complete/{requestId}` - Record outcome and move points (admin)
//! - `GET /volunteer-leader/available-projects` - Projects the caller could lead
//!
//! All endpoints require a bearer token. Admin endpoints additionally require
//! the admin role.

use hyper::body::Incoming;
use hyper::{Method, Request, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::db::schemas::{
    ProjectDoc, UserDoc, VolunteerOutcome, VolunteerRequestDoc, VolunteerStatus,
};
use crate::logging::EventType;
use crate::routes::projects::{project_to_view, ProjectView};
use crate::routes::{
    claims_user_id, cors_preflight, error_response, error_to_response, get_workflow,
    json_response, parse_object_id, parse_optional_json_body, require_admin, require_auth,
    FullBody,
};
use crate::server::AppState;
use crate::volunteer::{AvailableProject, RequestWithRefs};

// =============================================================================
// Views
// =============================================================================

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct UserSummary {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ProjectSummary {
    pub id: String,
    pub title: String,
    pub description: String,
    pub status: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RequestView {
    pub id: String,
    pub project_id: String,
    pub user_id: String,
    pub status: VolunteerStatus,
    pub volunteered_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<VolunteerOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub points_awarded: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<UserSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project: Option<ProjectSummary>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LeaderSummary {
    id: String,
    first_name: String,
    last_name: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AvailableProjectView {
    id: String,
    title: String,
    description: String,
    priority: String,
    status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    start_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    end_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    project_leader: Option<LeaderSummary>,
    has_volunteered: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    volunteer_status: Option<VolunteerStatus>,
    has_leader: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GrantResponse {
    message: String,
    request: RequestView,
    project: ProjectView,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DecisionResponse {
    message: String,
    request: RequestView,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CompletionResponse {
    message: String,
    request: RequestView,
    ledger: crate::routes::points::LedgerView,
}

fn oid_string(id: Option<bson::oid::ObjectId>) -> String {
    id.map(|v| v.to_hex()).unwrap_or_default()
}

pub(crate) fn user_to_summary(user: &UserDoc) -> UserSummary {
    UserSummary {
        id: oid_string(user._id),
        first_name: user.first_name.clone(),
        last_name: user.last_name.clone(),
        email: user.email.clone(),
    }
}

fn project_to_summary(project: &ProjectDoc) -> ProjectSummary {
    ProjectSummary {
        id: oid_string(project._id),
        title: project.title.clone(),
        description: project.description.clone(),
        status: project.status.as_str().to_string(),
    }
}

pub(crate) fn request_to_view(
    request: &VolunteerRequestDoc,
    user: Option<&UserDoc>,
    project: Option<&ProjectDoc>,
) -> RequestView {
    RequestView {
        id: oid_string(request._id),
        project_id: request.project_id.to_hex(),
        user_id: request.user_id.to_hex(),
        status: request.status,
        volunteered_at: request.volunteered_at.to_string(),
        outcome: request.outcome,
        points_awarded: request.points_awarded,
        completed_at: request.completed_at.map(|d| d.to_string()),
        notes: request.notes.clone(),
        created_at: request.metadata.created_at.map(|d| d.to_string()),
        user: user.map(user_to_summary),
        project: project.map(project_to_summary),
    }
}

fn refs_to_view(entry: &RequestWithRefs) -> RequestView {
    request_to_view(&entry.request, entry.user.as_ref(), entry.project.as_ref())
}

fn available_to_view(entry: &AvailableProject) -> AvailableProjectView {
    AvailableProjectView {
        id: oid_string(entry.project._id),
        title: entry.project.title.clone(),
        description: entry.project.description.clone(),
        priority: entry.project.priority.as_str().to_string(),
        status: entry.project.status.as_str().to_string(),
        start_date: entry.project.start_date.map(|d| d.to_string()),
        end_date: entry.project.end_date.map(|d| d.to_string()),
        project_leader: entry.leader.as_ref().map(|leader| LeaderSummary {
            id: oid_string(leader._id),
            first_name: leader.first_name.clone(),
            last_name: leader.last_name.clone(),
        }),
        has_volunteered: entry.has_volunteered,
        volunteer_status: entry.volunteer_status,
        has_leader: entry.has_leader,
    }
}

// =============================================================================
// Route Handler
// =============================================================================

/// Main handler for /volunteer-leader/* routes
pub async fn handle_volunteer_request(
    req: Request<Incoming>,
    state: Arc<AppState>,
    path: &str,
) -> Response<FullBody> {
    let method = req.method().clone();
    let subpath = path.strip_prefix("/volunteer-leader").unwrap_or(path).to_string();

    match (method, subpath.as_str()) {
        (Method::POST, p) if p.starts_with("/volunteer/") => {
            let id = p.trim_start_matches("/volunteer/").to_string();
            handle_volunteer(req, state, &id).await
        }

        (Method::GET, "/requests") => handle_list_requests(req, state).await,

        (Method::GET, "/my-requests") => handle_my_requests(req, state).await,

        (Method::PUT, p) if p.starts_with("/accept/") => {
            let id = p.trim_start_matches("/accept/").to_string();
            handle_accept(req, state, &id).await
        }

        (Method::PUT, p) if p.starts_with("/reject/") => {
            let id = p.trim_start_matches("/reject/").to_string();
            handle_reject(req, state, &id).await
        }

        (Method::PUT, p) if p.starts_with("/complete/") => {
            let id = p.trim_start_matches("/complete/").to_string();
            handle_complete(req, state, &id).await
        }

        (Method::GET, "/available-projects") => handle_available_projects(req, state).await,

        (Method::OPTIONS, _) => cors_preflight(),

        (_, "/requests") | (_, "/my-requests") | (_, "/available-projects") => error_response(
            StatusCode::METHOD_NOT_ALLOWED,
            "Method not allowed",
            None,
        ),

        _ => error_response(StatusCode::NOT_FOUND, "Not found", None),
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// POST /volunteer-leader/volunteer/{projectId}
async fn handle_volunteer(
    req: Request<Incoming>,
    state: Arc<AppState>,
    project_id: &str,
) -> Response<FullBody> {
    let claims = match require_auth(&req, &state) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let user_id = match claims_user_id(&claims) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    let project_id = match parse_object_id(project_id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    let workflow = match get_workflow(&state) {
        Ok(w) => w,
        Err(resp) => return resp,
    };

    match workflow.volunteer(project_id, user_id).await {
        Ok(grant) => {
            state
                .audit
                .log_volunteer(
                    &user_id.to_hex(),
                    &project_id.to_hex(),
                    &oid_string(grant.request._id),
                )
                .await;
            json_response(
                StatusCode::CREATED,
                &GrantResponse {
                    message: "You are now the leader of this project!".to_string(),
                    request: request_to_view(&grant.request, None, None),
                    project: project_to_view(&grant.project),
                },
            )
        }
        Err(e) => error_to_response(&e),
    }
}

/// GET /volunteer-leader/requests - Admin listing of all requests
async fn handle_list_requests(req: Request<Incoming>, state: Arc<AppState>) -> Response<FullBody> {
    if let Err(resp) = require_admin(&req, &state) {
        return resp;
    }

    let workflow = match get_workflow(&state) {
        Ok(w) => w,
        Err(resp) => return resp,
    };

    match workflow.list_requests().await {
        Ok(entries) => {
            let views: Vec<RequestView> = entries.iter().map(refs_to_view).collect();
            json_response(StatusCode::OK, &views)
        }
        Err(e) => error_to_response(&e),
    }
}

/// GET /volunteer-leader/my-requests
async fn handle_my_requests(req: Request<Incoming>, state: Arc<AppState>) -> Response<FullBody> {
    let claims = match require_auth(&req, &state) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let user_id = match claims_user_id(&claims) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    let workflow = match get_workflow(&state) {
        Ok(w) => w,
        Err(resp) => return resp,
    };

    match workflow.my_requests(user_id).await {
        Ok(entries) => {
            let views: Vec<RequestView> = entries.iter().map(refs_to_view).collect();
            json_response(StatusCode::OK, &views)
        }
        Err(e) => error_to_response(&e),
    }
}

/// PUT /volunteer-leader/accept/{requestId} - Admin accepts a pending request
async fn handle_accept(
    req: Request<Incoming>,
    state: Arc<AppState>,
    request_id: &str,
) -> Response<FullBody> {
    let claims = match require_admin(&req, &state) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let request_id = match parse_object_id(request_id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    let workflow = match get_workflow(&state) {
        Ok(w) => w,
        Err(resp) => return resp,
    };

    match workflow.accept(request_id).await {
        Ok(grant) => {
            state
                .audit
                .log_decision(EventType::RequestAccepted, &request_id.to_hex(), &claims.email)
                .await;
            json_response(
                StatusCode::OK,
                &GrantResponse {
                    message: "Volunteer request accepted".to_string(),
                    request: request_to_view(&grant.request, None, None),
                    project: project_to_view(&grant.project),
                },
            )
        }
        Err(e) => error_to_response(&e),
    }
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct RejectBody {
    notes: Option<String>,
}

/// PUT /volunteer-leader/reject/{requestId} - Admin rejects a pending request
async fn handle_reject(
    req: Request<Incoming>,
    state: Arc<AppState>,
    request_id: &str,
) -> Response<FullBody> {
    let claims = match require_admin(&req, &state) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let request_id = match parse_object_id(request_id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    let body: RejectBody = match parse_optional_json_body(req).await {
        Ok(b) => b,
        Err(e) => return error_to_response(&e),
    };

    let workflow = match get_workflow(&state) {
        Ok(w) => w,
        Err(resp) => return resp,
    };

    match workflow.reject(request_id, body.notes).await {
        Ok(request) => {
            state
                .audit
                .log_decision(EventType::RequestRejected, &request_id.to_hex(), &claims.email)
                .await;
            json_response(
                StatusCode::OK,
                &DecisionResponse {
                    message: "Volunteer request rejected".to_string(),
                    request: request_to_view(&request, None, None),
                },
            )
        }
        Err(e) => error_to_response(&e),
    }
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct CompleteBody {
    outcome: Option<String>,
    notes: Option<String>,
}

/// PUT /volunteer-leader/complete/{requestId} - Admin records the outcome
async fn handle_complete(
    req: Request<Incoming>,
    state: Arc<AppState>,
    request_id: &str,
) -> Response<FullBody> {
    let claims = match require_admin(&req, &state) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let request_id = match parse_object_id(request_id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    let body: CompleteBody = match parse_optional_json_body(req).await {
        Ok(b) => b,
        Err(e) => return error_to_response(&e),
    };

    let outcome = match body.outcome.as_deref().and_then(VolunteerOutcome::parse) {
        Some(o) => o,
        None => {
            return error_response(
                StatusCode::BAD_REQUEST,
                "Valid outcome required (success or failure)",
                None,
            )
        }
    };

    let workflow = match get_workflow(&state) {
        Ok(w) => w,
        Err(resp) => return resp,
    };

    match workflow.complete(request_id, outcome, body.notes).await {
        Ok(record) => {
            let verb = match outcome {
                VolunteerOutcome::Success => "awarded",
                VolunteerOutcome::Failure => "deducted",
            };
            let awarded = record.request.points_awarded.unwrap_or_default();

            state
                .audit
                .log_completion(
                    &request_id.to_hex(),
                    &record.request.project_id.to_hex(),
                    &claims.email,
                    outcome.as_str(),
                    awarded,
                )
                .await;

            json_response(
                StatusCode::OK,
                &CompletionResponse {
                    message: format!("Project outcome recorded. Points {}: {}", verb, awarded.abs()),
                    request: request_to_view(&record.request, None, None),
                    ledger: crate::routes::points::ledger_to_view(&record.ledger),
                },
            )
        }
        Err(e) => error_to_response(&e),
    }
}

/// GET /volunteer-leader/available-projects
async fn handle_available_projects(
    req: Request<Incoming>,
    state: Arc<AppState>,
) -> Response<FullBody> {
    let claims = match require_auth(&req, &state) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let user_id = match claims_user_id(&claims) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    let workflow = match get_workflow(&state) {
        Ok(w) => w,
        Err(resp) => return resp,
    };

    match workflow.available_projects(user_id).await {
        Ok(entries) => {
            let views: Vec<AvailableProjectView> = entries.iter().map(available_to_view).collect();
            json_response(StatusCode::OK, &views)
        }
        Err(e) => error_to_response(&e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schemas::{Metadata, ProjectPriority, ProjectStatus};
    use bson::oid::ObjectId;

    fn request() -> VolunteerRequestDoc {
        let mut r = VolunteerRequestDoc::new(
            ObjectId::new(),
            ObjectId::new(),
            VolunteerStatus::Completed,
        );
        r._id = Some(ObjectId::new());
        r.outcome = Some(VolunteerOutcome::Success);
        r.points_awarded = Some(100);
        r
    }

    #[test]
    fn test_request_view_serializes_camel_case() {
        let view = request_to_view(&request(), None, None);
        let json = serde_json::to_value(&view).unwrap();

        assert_eq!(json["status"], "completed");
        assert_eq!(json["outcome"], "success");
        assert_eq!(json["pointsAwarded"], 100);
        assert!(json.get("user").is_none());
        assert!(json.get("project").is_none());
    }

    #[test]
    fn test_request_view_includes_summaries_when_present() {
        let user = UserDoc {
            _id: Some(ObjectId::new()),
            first_name: "Alan".to_string(),
            last_name: "Turing".to_string(),
            email: "alan@example.com".to_string(),
            ..Default::default()
        };
        let project = ProjectDoc {
            _id: Some(ObjectId::new()),
            metadata: Metadata::new(),
            title: "Enigma".to_string(),
            description: "Break the rotor cipher".to_string(),
            priority: ProjectPriority::High,
            status: ProjectStatus::Active,
            ..Default::default()
        };

        let view = request_to_view(&request(), Some(&user), Some(&project));
        let json = serde_json::to_value(&view).unwrap();

        assert_eq!(json["user"]["firstName"], "Alan");
        assert_eq!(json["user"]["email"], "alan@example.com");
        assert_eq!(json["project"]["title"], "Enigma");
        assert_eq!(json["project"]["status"], "active");
    }

    #[test]
    fn test_available_view_annotations() {
        let leader = UserDoc {
            _id: Some(ObjectId::new()),
            first_name: "Katherine".to_string(),
            last_name: "Johnson".to_string(),
            ..Default::default()
        };
        let mut project = ProjectDoc {
            _id: Some(ObjectId::new()),
            title: "Trajectory".to_string(),
            priority: ProjectPriority::High,
            status: ProjectStatus::Planning,
            ..Default::default()
        };
        project.project_leader = leader._id;

        let entry = AvailableProject {
            project,
            has_volunteered: true,
            volunteer_status: Some(VolunteerStatus::Accepted),
            has_leader: true,
            leader: Some(leader),
        };

        let json = serde_json::to_value(available_to_view(&entry)).unwrap();
        assert_eq!(json["hasVolunteered"], true);
        assert_eq!(json["volunteerStatus"], "accepted");
        assert_eq!(json["hasLeader"], true);
        assert_eq!(json["projectLeader"]["firstName"], "Katherine");
        assert_eq!(json["priority"], "high");
    }
}
