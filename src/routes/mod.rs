//! HTTP routes for Foreman
//!
//! Handlers share one response envelope: successes are JSON bodies with
//! camelCase fields, failures are `{ "error": string, "details"?: string }`
//! with the status owned by `ForemanError::status_code`.

pub mod auth_routes;
pub mod health;
pub mod points;
pub mod projects;
pub mod volunteer;

pub use auth_routes::handle_auth_request;
pub use health::{health_check, readiness_check, version_info};
pub use points::handle_points_request;
pub use projects::handle_projects_request;
pub use volunteer::handle_volunteer_request;

use bson::oid::ObjectId;
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::{Request, Response, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{error, warn};

use crate::auth::{extract_token_from_header, Claims, JwtValidator, Role};
use crate::db::MongoClient;
use crate::server::AppState;
use crate::types::ForemanError;
use crate::volunteer::VolunteerWorkflow;

pub(crate) type FullBody = Full<Bytes>;

/// Error envelope returned by every failing endpoint
#[derive(Serialize)]
pub(crate) struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

pub(crate) fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response<FullBody> {
    let json = serde_json::to_string(body).unwrap_or_else(|_| "{}".to_string());
    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .body(Full::new(Bytes::from(json)))
        .unwrap()
}

pub(crate) fn error_response(
    status: StatusCode,
    error: &str,
    details: Option<&str>,
) -> Response<FullBody> {
    json_response(
        status,
        &ErrorBody {
            error: error.to_string(),
            details: details.map(|d| d.to_string()),
        },
    )
}

/// Centralized error-to-envelope mapping. Internal faults are logged with
/// their detail and answered generically.
pub(crate) fn error_to_response(err: &ForemanError) -> Response<FullBody> {
    if err.is_internal() {
        error!("{}", err);
    }
    error_response(err.status_code(), &err.public_message(), None)
}

/// Get MongoDB, or a 503 when running without a database (dev mode)
#[allow(clippy::result_large_err)]
pub(crate) fn get_mongo(state: &AppState) -> Result<&MongoClient, Response<FullBody>> {
    match &state.mongo {
        Some(m) => Ok(m),
        None => Err(error_response(
            StatusCode::SERVICE_UNAVAILABLE,
            "Database not available",
            Some("DB_UNAVAILABLE"),
        )),
    }
}

#[allow(clippy::result_large_err)]
pub(crate) fn get_workflow(state: &AppState) -> Result<VolunteerWorkflow, Response<FullBody>> {
    Ok(VolunteerWorkflow::new(get_mongo(state)?.clone()))
}

// =============================================================================
// Auth Helpers
// =============================================================================

pub(crate) fn get_auth_header(req: &Request<Incoming>) -> Option<&str> {
    req.headers()
        .get(hyper::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
}

#[allow(clippy::result_large_err)]
pub(crate) fn get_jwt_validator(state: &AppState) -> Result<JwtValidator, Response<FullBody>> {
    match &state.args.jwt_secret {
        Some(secret) => JwtValidator::new(secret.clone(), state.args.jwt_expiry_seconds).map_err(
            |e| {
                error_response(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    &format!("JWT config error: {e}"),
                    None,
                )
            },
        ),
        // Dev mode runs without configuration; everything else refuses auth
        None if state.args.dev_mode => Ok(JwtValidator::new_dev()),
        None => Err(error_response(
            StatusCode::NOT_IMPLEMENTED,
            "Authentication not enabled (missing JWT_SECRET)",
            None,
        )),
    }
}

/// Resolve the bearer credential to verified claims, or a 401 response.
/// The workflow trusts this identity; no database round-trip happens here.
#[allow(clippy::result_large_err)]
pub(crate) fn require_auth(
    req: &Request<Incoming>,
    state: &AppState,
) -> Result<Claims, Response<FullBody>> {
    let token = match extract_token_from_header(get_auth_header(req)) {
        Some(t) => t,
        None => {
            return Err(error_response(
                StatusCode::UNAUTHORIZED,
                "No token provided",
                None,
            ))
        }
    };

    let jwt = get_jwt_validator(state)?;
    let result = jwt.verify_token(&token);

    if !result.valid {
        warn!(
            "Rejected token: {}",
            result.error.as_deref().unwrap_or("invalid")
        );
        return Err(error_response(
            StatusCode::UNAUTHORIZED,
            "Invalid or expired token",
            None,
        ));
    }

    Ok(result.claims.unwrap())
}

/// Like `require_auth`, but additionally demands the admin role
#[allow(clippy::result_large_err)]
pub(crate) fn require_admin(
    req: &Request<Incoming>,
    state: &AppState,
) -> Result<Claims, Response<FullBody>> {
    let claims = require_auth(req, state)?;

    if !crate::auth::roles::has_role(claims.role, Role::Admin) {
        warn!("User {} denied admin access", claims.email);
        return Err(error_response(
            StatusCode::FORBIDDEN,
            "Admin access required",
            None,
        ));
    }

    Ok(claims)
}

// =============================================================================
// Request Helpers
// =============================================================================

/// Parse a path segment as an ObjectId, answering 400 on malformed input
#[allow(clippy::result_large_err)]
pub(crate) fn parse_object_id(value: &str) -> Result<ObjectId, Response<FullBody>> {
    ObjectId::parse_str(value)
        .map_err(|_| error_response(StatusCode::BAD_REQUEST, "Invalid ID format", None))
}

/// The authenticated caller's id from their claims
#[allow(clippy::result_large_err)]
pub(crate) fn claims_user_id(claims: &Claims) -> Result<ObjectId, Response<FullBody>> {
    ObjectId::parse_str(&claims.sub).map_err(|_| {
        error_response(StatusCode::UNAUTHORIZED, "Invalid token subject", None)
    })
}

pub(crate) async fn parse_json_body<T: for<'de> Deserialize<'de>>(
    req: Request<Incoming>,
) -> Result<T, ForemanError> {
    let body = req
        .collect()
        .await
        .map_err(|e| ForemanError::Validation(format!("Failed to read body: {}", e)))?;

    let bytes = body.to_bytes();
    if bytes.len() > 10240 {
        return Err(ForemanError::Validation("Request body too large".into()));
    }

    serde_json::from_slice(&bytes)
        .map_err(|e| ForemanError::Validation(format!("Invalid JSON: {}", e)))
}

/// Like `parse_json_body`, but an absent or empty body yields the default.
/// Used by endpoints whose body is entirely optional (e.g. reject notes).
pub(crate) async fn parse_optional_json_body<T>(req: Request<Incoming>) -> Result<T, ForemanError>
where
    T: for<'de> Deserialize<'de> + Default,
{
    let body = req
        .collect()
        .await
        .map_err(|e| ForemanError::Validation(format!("Failed to read body: {}", e)))?;

    let bytes = body.to_bytes();
    if bytes.is_empty() {
        return Ok(T::default());
    }
    if bytes.len() > 10240 {
        return Err(ForemanError::Validation("Request body too large".into()));
    }

    serde_json::from_slice(&bytes)
        .map_err(|e| ForemanError::Validation(format!("Invalid JSON: {}", e)))
}

/// CORS preflight response
pub(crate) fn cors_preflight() -> Response<FullBody> {
    Response::builder()
        .status(StatusCode::NO_CONTENT)
        .header("Access-Control-Allow-Origin", "*")
        .header("Access-Control-Allow-Headers", "*")
        .header("Access-Control-Allow-Methods", "GET, POST, PUT, DELETE, OPTIONS")
        .body(Full::new(Bytes::new()))
        .unwrap()
}
