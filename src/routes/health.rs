//! Health check endpoints
//!
//! Provides Kubernetes-style health probes:
//! - /health, /healthz - Liveness probe (is the service running?)
//! - /ready, /readyz - Readiness probe (is the service ready for traffic?)
//!
//! Liveness always answers 200 while the process is up. Readiness requires a
//! MongoDB handle, except in dev mode where the service may run without one.

use bytes::Bytes;
use http_body_util::Full;
use hyper::{Response, StatusCode};
use serde::Serialize;
use std::sync::Arc;

use crate::server::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    /// Overall health status (true if service is running)
    pub healthy: bool,
    /// 'online' when the database is reachable, 'degraded' otherwise
    pub status: &'static str,
    /// Service version
    pub version: &'static str,
    /// Seconds since process start
    pub uptime: u64,
    /// Current timestamp
    pub timestamp: String,
    /// Operating mode
    pub mode: String,
    /// Node identifier
    pub node_id: String,
    /// Database connection status
    pub database: DatabaseHealth,
    /// Error message if the database is not available
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Serialize)]
pub struct DatabaseHealth {
    /// Whether a MongoDB connection was established at startup
    pub connected: bool,
    /// Database name in use
    pub name: String,
}

/// Build health response with current state
fn build_health_response(state: &AppState) -> HealthResponse {
    let args = &state.args;
    let connected = state.mongo.is_some();

    let status = if connected { "online" } else { "degraded" };

    let error = if !connected && args.dev_mode {
        Some("Dev mode: running without MongoDB - API routes answer 503".to_string())
    } else if !connected {
        Some("MongoDB not connected".to_string())
    } else {
        None
    };

    HealthResponse {
        healthy: true, // Service is running
        status,
        version: env!("CARGO_PKG_VERSION"),
        uptime: state.started_at.elapsed().as_secs(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        mode: if args.dev_mode {
            "development".to_string()
        } else {
            "production".to_string()
        },
        node_id: args.node_id.to_string(),
        database: DatabaseHealth {
            connected,
            name: args.mongodb_db.clone(),
        },
        error,
    }
}

/// Handle liveness probe (/health, /healthz)
///
/// Returns 200 OK if the service is running. The body carries database status
/// for informational purposes; callers that need the database should check
/// `database.connected` or use the readiness probe.
pub fn health_check(state: Arc<AppState>) -> Response<Full<Bytes>> {
    let response = build_health_response(&state);

    let body = serde_json::to_string(&response)
        .unwrap_or_else(|_| r#"{"healthy":true,"error":"Serialization failed"}"#.to_string());

    // Liveness probe: always return 200 if service is running
    Response::builder()
        .status(StatusCode::OK)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .body(Full::new(Bytes::from(body)))
        .unwrap()
}

/// Handle readiness probe (/ready, /readyz)
///
/// Returns 200 OK only when the service can answer API traffic, meaning a
/// MongoDB connection was established. Dev mode is always ready so the HTTP
/// surface can be exercised without a database.
pub fn readiness_check(state: Arc<AppState>) -> Response<Full<Bytes>> {
    let response = build_health_response(&state);

    let is_ready = state.mongo.is_some() || state.args.dev_mode;

    let body = serde_json::to_string(&response)
        .unwrap_or_else(|_| r#"{"healthy":false,"error":"Serialization failed"}"#.to_string());

    let status = if is_ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .body(Full::new(Bytes::from(body)))
        .unwrap()
}

/// Version information for deployment verification
#[derive(Serialize)]
pub struct VersionResponse {
    /// Cargo package version
    pub version: &'static str,
    /// Git commit hash (short)
    pub commit: &'static str,
    /// Git commit hash (full)
    pub commit_full: &'static str,
    /// Build timestamp
    pub build_time: &'static str,
    /// Service name
    pub service: &'static str,
}

/// Handle version endpoint (/version)
///
/// Returns build information for deployment verification.
pub fn version_info() -> Response<Full<Bytes>> {
    let response = VersionResponse {
        version: env!("CARGO_PKG_VERSION"),
        commit: option_env!("GIT_COMMIT_SHORT").unwrap_or("unknown"),
        commit_full: option_env!("GIT_COMMIT_FULL").unwrap_or("unknown"),
        build_time: option_env!("BUILD_TIMESTAMP").unwrap_or("unknown"),
        service: "foreman",
    };

    let body = serde_json::to_string(&response)
        .unwrap_or_else(|_| r#"{"version":"unknown","commit":"unknown"}"#.to_string());

    Response::builder()
        .status(StatusCode::OK)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .body(Full::new(Bytes::from(body)))
        .unwrap()
}
