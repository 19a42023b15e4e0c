//! Project endpoints
//!
//! ## Endpoints
//!
//! - `POST /projects` - Create a project (admin)
//! - `GET /projects` - List projects (admins see all, employees see their own)
//! - `GET /projects/{id}` - Fetch one project (admin or team member)

use bson::{doc, oid::ObjectId};
use futures::stream::StreamExt;
use hyper::body::Incoming;
use hyper::{Method, Request, Response, StatusCode};
use mongodb::options::FindOptions;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use crate::auth::Role;
use crate::db::schemas::{ProjectDoc, ProjectPriority, ProjectStatus, PROJECT_COLLECTION};
use crate::routes::{
    claims_user_id, cors_preflight, error_response, error_to_response, get_mongo, json_response,
    parse_json_body, parse_object_id, require_admin, require_auth, FullBody,
};
use crate::server::AppState;
use crate::types::ForemanError;

// =============================================================================
// Views
// =============================================================================

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ProjectView {
    pub id: String,
    pub title: String,
    pub description: String,
    pub priority: String,
    pub status: String,
    pub coders: Vec<String>,
    pub freelancers: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lead_assignee: Option<String>,
    pub project_leader: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

pub(crate) fn project_to_view(project: &ProjectDoc) -> ProjectView {
    ProjectView {
        id: project._id.map(|v| v.to_hex()).unwrap_or_default(),
        title: project.title.clone(),
        description: project.description.clone(),
        priority: project.priority.as_str().to_string(),
        status: project.status.as_str().to_string(),
        coders: project.coders.iter().map(|v| v.to_hex()).collect(),
        freelancers: project.freelancers.iter().map(|v| v.to_hex()).collect(),
        lead_assignee: project.lead_assignee.map(|v| v.to_hex()),
        project_leader: project.project_leader.map(|v| v.to_hex()),
        start_date: project.start_date.map(|d| d.to_string()),
        end_date: project.end_date.map(|d| d.to_string()),
        created_at: project.metadata.created_at.map(|d| d.to_string()),
    }
}

// =============================================================================
// Route Handler
// =============================================================================

/// Main handler for /projects routes
pub async fn handle_projects_request(
    req: Request<Incoming>,
    state: Arc<AppState>,
    path: &str,
) -> Response<FullBody> {
    let method = req.method().clone();
    let subpath = path.strip_prefix("/projects").unwrap_or(path).to_string();

    match (method, subpath.as_str()) {
        (Method::POST, "" | "/") => handle_create_project(req, state).await,

        (Method::GET, "" | "/") => handle_list_projects(req, state).await,

        (Method::GET, p) if p.starts_with('/') => {
            let id = p.trim_start_matches('/').to_string();
            handle_get_project(req, state, &id).await
        }

        (Method::OPTIONS, _) => cors_preflight(),

        (_, "" | "/") => error_response(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed", None),

        _ => error_response(StatusCode::NOT_FOUND, "Not found", None),
    }
}

// =============================================================================
// Handlers
// =============================================================================

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct CreateProjectBody {
    title: Option<String>,
    description: Option<String>,
    priority: Option<ProjectPriority>,
    status: Option<ProjectStatus>,
    #[serde(default)]
    coders: Vec<String>,
    #[serde(default)]
    freelancers: Vec<String>,
    lead_assignee: Option<String>,
    start_date: Option<String>,
    end_date: Option<String>,
}

fn parse_date(value: &str) -> Result<bson::DateTime, ForemanError> {
    chrono::DateTime::parse_from_rfc3339(value)
        .map(|dt| bson::DateTime::from_chrono(dt.with_timezone(&chrono::Utc)))
        .map_err(|_| ForemanError::Validation("Invalid date format (expected RFC 3339)".into()))
}

fn parse_id_list(values: &[String]) -> Result<Vec<ObjectId>, ForemanError> {
    values
        .iter()
        .map(|v| {
            ObjectId::parse_str(v).map_err(|_| ForemanError::Validation("Invalid ID format".into()))
        })
        .collect()
}

/// POST /projects - Admin creates a project
async fn handle_create_project(req: Request<Incoming>, state: Arc<AppState>) -> Response<FullBody> {
    let claims = match require_admin(&req, &state) {
        Ok(c) => c,
        Err(resp) => return resp,
    };

    let body: CreateProjectBody = match parse_json_body(req).await {
        Ok(b) => b,
        Err(e) => return error_to_response(&e),
    };

    let title = body.title.unwrap_or_default();
    let description = body.description.unwrap_or_default();
    if title.trim().is_empty() || description.trim().is_empty() {
        return error_response(
            StatusCode::BAD_REQUEST,
            "Title and description are required",
            None,
        );
    }

    let mut project = ProjectDoc {
        title: title.trim().to_string(),
        description: description.trim().to_string(),
        priority: body.priority.unwrap_or_default(),
        status: body.status.unwrap_or_default(),
        ..Default::default()
    };

    match parse_id_list(&body.coders) {
        Ok(ids) => project.coders = ids,
        Err(e) => return error_to_response(&e),
    }
    match parse_id_list(&body.freelancers) {
        Ok(ids) => project.freelancers = ids,
        Err(e) => return error_to_response(&e),
    }
    if let Some(raw) = body.lead_assignee.as_deref() {
        match ObjectId::parse_str(raw) {
            Ok(id) => project.lead_assignee = Some(id),
            Err(_) => return error_response(StatusCode::BAD_REQUEST, "Invalid ID format", None),
        }
    }
    if let Some(raw) = body.start_date.as_deref() {
        match parse_date(raw) {
            Ok(d) => project.start_date = Some(d),
            Err(e) => return error_to_response(&e),
        }
    }
    if let Some(raw) = body.end_date.as_deref() {
        match parse_date(raw) {
            Ok(d) => project.end_date = Some(d),
            Err(e) => return error_to_response(&e),
        }
    }

    let mongo = match get_mongo(&state) {
        Ok(m) => m,
        Err(resp) => return resp,
    };
    let projects = match mongo.collection::<ProjectDoc>(PROJECT_COLLECTION).await {
        Ok(c) => c,
        Err(e) => return error_to_response(&e),
    };

    match projects.insert_one(project.clone()).await {
        Ok(id) => {
            info!("Project '{}' created by {}", project.title, claims.email);
            project._id = Some(id);
            json_response(StatusCode::CREATED, &project_to_view(&project))
        }
        Err(e) => error_to_response(&e),
    }
}

/// GET /projects - Admins see everything, employees see projects they are on
async fn handle_list_projects(req: Request<Incoming>, state: Arc<AppState>) -> Response<FullBody> {
    let claims = match require_auth(&req, &state) {
        Ok(c) => c,
        Err(resp) => return resp,
    };

    let mongo = match get_mongo(&state) {
        Ok(m) => m,
        Err(resp) => return resp,
    };
    let projects = match mongo.collection::<ProjectDoc>(PROJECT_COLLECTION).await {
        Ok(c) => c,
        Err(e) => return error_to_response(&e),
    };

    let mut filter = doc! { "metadata.is_deleted": { "$ne": true } };
    if claims.role != Role::Admin {
        let user_id = match claims_user_id(&claims) {
            Ok(id) => id,
            Err(resp) => return resp,
        };
        filter.insert(
            "$or",
            vec![
                doc! { "coders": user_id },
                doc! { "freelancers": user_id },
                doc! { "lead_assignee": user_id },
                doc! { "project_leader": user_id },
            ],
        );
    }

    let options = FindOptions::builder()
        .sort(doc! { "metadata.created_at": -1 })
        .build();

    let mut cursor = match projects.inner().find(filter).with_options(options).await {
        Ok(c) => c,
        Err(e) => {
            return error_to_response(&ForemanError::Database(format!(
                "Failed to list projects: {}",
                e
            )))
        }
    };

    let mut views: Vec<ProjectView> = Vec::new();
    while let Some(result) = cursor.next().await {
        match result {
            Ok(doc) => views.push(project_to_view(&doc)),
            Err(e) => warn!("Skipping unreadable project: {}", e),
        }
    }

    json_response(StatusCode::OK, &views)
}

/// GET /projects/{id} - Admin or anyone on the project team
async fn handle_get_project(
    req: Request<Incoming>,
    state: Arc<AppState>,
    id: &str,
) -> Response<FullBody> {
    let claims = match require_auth(&req, &state) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let project_id = match parse_object_id(id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    let mongo = match get_mongo(&state) {
        Ok(m) => m,
        Err(resp) => return resp,
    };
    let projects = match mongo.collection::<ProjectDoc>(PROJECT_COLLECTION).await {
        Ok(c) => c,
        Err(e) => return error_to_response(&e),
    };

    let project = match projects.find_one(doc! { "_id": project_id }).await {
        Ok(Some(p)) => p,
        Ok(None) => return error_response(StatusCode::NOT_FOUND, "Project not found", None),
        Err(e) => return error_to_response(&e),
    };

    if claims.role != Role::Admin {
        let user_id = match claims_user_id(&claims) {
            Ok(id) => id,
            Err(resp) => return resp,
        };
        let on_team =
            project.is_team_member(&user_id) || project.project_leader == Some(user_id);
        if !on_team {
            return error_response(
                StatusCode::FORBIDDEN,
                "Not authorized to view this project",
                None,
            );
        }
    }

    json_response(StatusCode::OK, &project_to_view(&project))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schemas::Metadata;

    #[test]
    fn test_project_view_serializes_camel_case() {
        let leader = ObjectId::new();
        let project = ProjectDoc {
            _id: Some(ObjectId::new()),
            metadata: Metadata::new(),
            title: "Apollo".to_string(),
            description: "Guidance computer".to_string(),
            priority: ProjectPriority::High,
            status: ProjectStatus::Active,
            coders: vec![ObjectId::new()],
            project_leader: Some(leader),
            ..Default::default()
        };

        let json = serde_json::to_value(project_to_view(&project)).unwrap();
        assert_eq!(json["title"], "Apollo");
        assert_eq!(json["priority"], "high");
        assert_eq!(json["status"], "active");
        assert_eq!(json["projectLeader"], leader.to_hex());
        assert_eq!(json["coders"].as_array().unwrap().len(), 1);
        assert!(json.get("leadAssignee").is_none());
    }

    #[test]
    fn test_project_leader_is_null_not_omitted() {
        let project = ProjectDoc {
            title: "Mercury".to_string(),
            description: "Capsule".to_string(),
            ..Default::default()
        };

        let json = serde_json::to_value(project_to_view(&project)).unwrap();
        assert!(json["projectLeader"].is_null());
    }

    #[test]
    fn test_parse_date_accepts_rfc3339() {
        assert!(parse_date("2025-03-01T09:00:00Z").is_ok());
        assert!(parse_date("2025-03-01T09:00:00+02:00").is_ok());
        assert!(parse_date("yesterday").is_err());
    }

    #[test]
    fn test_parse_id_list_rejects_malformed() {
        let good = ObjectId::new().to_hex();
        assert_eq!(parse_id_list(&[good.clone()]).unwrap().len(), 1);
        assert!(parse_id_list(&[good, "nope".to_string()]).is_err());
    }
}
