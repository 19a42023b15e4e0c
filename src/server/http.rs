//! HTTP server implementation
//!
//! Uses hyper http1 with TokioIo for async handling. Every route answers
//! JSON; bodies are `Full<Bytes>` throughout.

use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::config::Args;
use crate::db::MongoClient;
use crate::logging::AuditLogger;
use crate::routes;
use crate::types::ForemanError;

/// Shared application state
pub struct AppState {
    pub args: Args,
    pub mongo: Option<MongoClient>,
    /// JSONL audit trail for workflow decisions
    pub audit: AuditLogger,
    /// Process start, for uptime reporting
    pub started_at: Instant,
}

impl AppState {
    /// Create AppState without a database (dev mode without MongoDB)
    pub fn new(args: Args) -> Self {
        let audit = AuditLogger::new(args.node_id.to_string());
        Self {
            args,
            mongo: None,
            audit,
            started_at: Instant::now(),
        }
    }

    /// Create AppState with a connected database
    pub fn with_mongo(args: Args, mongo: MongoClient) -> Self {
        let audit = AuditLogger::new(args.node_id.to_string());
        Self {
            args,
            mongo: Some(mongo),
            audit,
            started_at: Instant::now(),
        }
    }
}

/// Run the HTTP server until the process is stopped
pub async fn run(state: Arc<AppState>) -> Result<(), ForemanError> {
    let listener = TcpListener::bind(state.args.listen).await?;

    info!(
        "Foreman listening on {} as node {}",
        state.args.listen, state.args.node_id
    );

    if state.args.dev_mode {
        warn!("Development mode enabled");
        if state.args.jwt_secret.is_none() {
            warn!("No JWT_SECRET configured - tokens use the insecure dev secret");
        }
    }

    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let state = Arc::clone(&state);
                tokio::spawn(async move {
                    let io = TokioIo::new(stream);

                    let service = service_fn(move |req| {
                        let state = Arc::clone(&state);
                        async move { handle_request(state, addr, req).await }
                    });

                    if let Err(err) = http1::Builder::new()
                        .preserve_header_case(true)
                        .title_case_headers(true)
                        .serve_connection(io, service)
                        .await
                    {
                        error!("Error serving connection from {}: {:?}", addr, err);
                    }
                });
            }
            Err(e) => {
                error!("Error accepting connection: {:?}", e);
            }
        }
    }
}

/// Route incoming HTTP requests
async fn handle_request(
    state: Arc<AppState>,
    addr: SocketAddr,
    req: Request<Incoming>,
) -> Result<Response<Full<Bytes>>, hyper::Error> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    info!("[{}] {} {}", addr, method, path);

    // Remove query string for matching
    let path = path.split('?').next().unwrap_or(&path).to_string();

    // Auth routes (/auth/*) consume the request
    if path.starts_with("/auth") {
        if let Some(response) = routes::handle_auth_request(req, Arc::clone(&state)).await {
            return Ok(response);
        }
        return Ok(not_found_response(&path));
    }

    // Workflow routes (/volunteer-leader/*)
    if path.starts_with("/volunteer-leader") {
        return Ok(routes::handle_volunteer_request(req, Arc::clone(&state), &path).await);
    }

    // Project routes (/projects, /projects/*)
    if path.starts_with("/projects") {
        return Ok(routes::handle_projects_request(req, Arc::clone(&state), &path).await);
    }

    // Points routes (/points/*)
    if path.starts_with("/points") {
        return Ok(routes::handle_points_request(req, Arc::clone(&state), &path).await);
    }

    let response = match (method, path.as_str()) {
        // Liveness probe - returns 200 if foreman is running
        (Method::GET, "/health") | (Method::GET, "/healthz") => {
            routes::health_check(Arc::clone(&state))
        }

        // Readiness probe - returns 200 only if MongoDB is connected
        (Method::GET, "/ready") | (Method::GET, "/readyz") => {
            routes::readiness_check(Arc::clone(&state))
        }

        // Version info for deployment verification
        (Method::GET, "/version") => routes::version_info(),

        // CORS preflight
        (Method::OPTIONS, _) => preflight_response(),

        _ => not_found_response(&path),
    };

    Ok(response)
}

/// CORS preflight response
fn preflight_response() -> Response<Full<Bytes>> {
    Response::builder()
        .status(StatusCode::OK)
        .header("Access-Control-Allow-Origin", "*")
        .header("Access-Control-Allow-Headers", "*")
        .header("Access-Control-Allow-Methods", "GET, POST, PUT, DELETE, OPTIONS")
        .body(Full::new(Bytes::new()))
        .unwrap()
}

/// Not found response
fn not_found_response(path: &str) -> Response<Full<Bytes>> {
    let body = serde_json::json!({
        "error": "Not Found",
        "path": path,
    });

    Response::builder()
        .status(StatusCode::NOT_FOUND)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .body(Full::new(Bytes::from(body.to_string())))
        .unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_response_includes_path() {
        let resp = not_found_response("/nowhere");
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_preflight_allows_put() {
        let resp = preflight_response();
        let methods = resp
            .headers()
            .get("Access-Control-Allow-Methods")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");
        assert!(methods.contains("PUT"));
    }
}
