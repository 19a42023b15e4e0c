//! Authentication HTTP routes
//!
//! ## Endpoints
//!
//! - `POST /auth/register` - Create an employee account and mint a token
//! - `POST /auth/login` - Email and password login
//! - `GET /auth/me` - Profile of the authenticated caller
//!
//! Registration always produces the employee role. Admin accounts come from
//! startup seeding (see `ADMIN_EMAIL` / `ADMIN_PASSWORD`), never from this
//! surface.

use bson::doc;
use hyper::body::Incoming;
use hyper::{Method, Request, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use crate::auth::{hash_password, verify_password, JwtValidator, Role, TokenInput};
use crate::db::schemas::{UserDoc, USER_COLLECTION};
use crate::routes::{
    claims_user_id, cors_preflight, error_response, error_to_response, get_jwt_validator,
    get_mongo, json_response, parse_json_body, require_auth, FullBody,
};
use crate::server::AppState;

// =============================================================================
// Request/Response Types
// =============================================================================

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RegisterRequest {
    first_name: String,
    last_name: String,
    email: String,
    password: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoginRequest {
    email: String,
    password: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct UserView {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub role: Role,
    pub is_active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AuthResponse {
    token: String,
    user: UserView,
    expires_at: u64,
}

pub(crate) fn user_to_view(user: &UserDoc) -> UserView {
    UserView {
        id: user._id.map(|v| v.to_hex()).unwrap_or_default(),
        first_name: user.first_name.clone(),
        last_name: user.last_name.clone(),
        email: user.email.clone(),
        role: user.role,
        is_active: user.is_active,
        created_at: user.metadata.created_at.map(|d| d.to_string()),
    }
}

/// Mint a token for `user` and wrap it with their profile
fn generate_auth_response(
    jwt: &JwtValidator,
    user: &UserDoc,
    status: StatusCode,
) -> Response<FullBody> {
    let input = TokenInput {
        user_id: user._id.map(|v| v.to_hex()).unwrap_or_default(),
        email: user.email.clone(),
        role: user.role,
    };

    match jwt.generate_token(input) {
        Ok(token) => {
            let verified = jwt.verify_token(&token);
            let expires_at = verified.claims.map(|c| c.exp).unwrap_or(0);

            json_response(
                status,
                &AuthResponse {
                    token,
                    user: user_to_view(user),
                    expires_at,
                },
            )
        }
        Err(e) => error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            &format!("Failed to generate token: {}", e),
            None,
        ),
    }
}

// =============================================================================
// Main Router
// =============================================================================

/// Handle auth-related HTTP requests.
///
/// Returns Some(response) if request was handled, None if not an auth route.
pub async fn handle_auth_request(
    req: Request<Incoming>,
    state: Arc<AppState>,
) -> Option<Response<FullBody>> {
    let path = req.uri().path();
    let method = req.method();

    // Only handle /auth/* routes
    if !path.starts_with("/auth") {
        return None;
    }

    // Handle CORS preflight
    if method == Method::OPTIONS {
        return Some(cors_preflight());
    }

    // Remove query string for matching
    let path = path.split('?').next().unwrap_or(path).to_string();

    let response = match (method.clone(), path.as_str()) {
        (Method::POST, "/auth/register") => handle_register(req, state).await,
        (Method::POST, "/auth/login") => handle_login(req, state).await,
        (Method::GET, "/auth/me") => handle_me(req, state).await,

        // Method not allowed
        (_, "/auth/register") | (_, "/auth/login") | (_, "/auth/me") => {
            error_response(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed", None)
        }

        _ => error_response(StatusCode::NOT_FOUND, "Not found", None),
    };

    Some(response)
}

// =============================================================================
// Handlers
// =============================================================================

/// POST /auth/register
async fn handle_register(req: Request<Incoming>, state: Arc<AppState>) -> Response<FullBody> {
    let jwt = match get_jwt_validator(&state) {
        Ok(j) => j,
        Err(resp) => return resp,
    };

    let body: RegisterRequest = match parse_json_body(req).await {
        Ok(b) => b,
        Err(e) => return error_to_response(&e),
    };

    let first_name = body.first_name.trim().to_string();
    let last_name = body.last_name.trim().to_string();
    let email = body.email.trim().to_lowercase();

    if first_name.is_empty() || last_name.is_empty() || email.is_empty() {
        return error_response(
            StatusCode::BAD_REQUEST,
            "First name, last name and email are required",
            None,
        );
    }
    if !email.contains('@') {
        return error_response(StatusCode::BAD_REQUEST, "Invalid email address", None);
    }
    if body.password.len() < 8 {
        return error_response(
            StatusCode::BAD_REQUEST,
            "Password must be at least 8 characters",
            None,
        );
    }

    let password_hash = match hash_password(&body.password) {
        Ok(h) => h,
        Err(e) => return error_to_response(&e),
    };

    let mongo = match get_mongo(&state) {
        Ok(m) => m,
        Err(resp) => return resp,
    };
    let users = match mongo.collection::<UserDoc>(USER_COLLECTION).await {
        Ok(c) => c,
        Err(e) => return error_to_response(&e),
    };

    let mut user = UserDoc::new(first_name, last_name, email, password_hash);

    // The unique email index turns concurrent duplicates into a 409
    match users.insert_one(user.clone()).await {
        Ok(id) => {
            info!("Registered user {}", user.email);
            state.audit.log_auth_attempt(true, &user.email).await;
            user._id = Some(id);
            generate_auth_response(&jwt, &user, StatusCode::CREATED)
        }
        Err(e) => error_to_response(&e),
    }
}

/// POST /auth/login
async fn handle_login(req: Request<Incoming>, state: Arc<AppState>) -> Response<FullBody> {
    let jwt = match get_jwt_validator(&state) {
        Ok(j) => j,
        Err(resp) => return resp,
    };

    let body: LoginRequest = match parse_json_body(req).await {
        Ok(b) => b,
        Err(e) => return error_to_response(&e),
    };

    let email = body.email.trim().to_lowercase();

    let mongo = match get_mongo(&state) {
        Ok(m) => m,
        Err(resp) => return resp,
    };
    let users = match mongo.collection::<UserDoc>(USER_COLLECTION).await {
        Ok(c) => c,
        Err(e) => return error_to_response(&e),
    };

    // One generic message for unknown email and wrong password
    let user = match users.find_one(doc! { "email": &email }).await {
        Ok(Some(u)) => u,
        Ok(None) => {
            warn!("Login failed for {}: unknown email", email);
            state.audit.log_auth_attempt(false, &email).await;
            return error_response(StatusCode::UNAUTHORIZED, "Invalid credentials", None);
        }
        Err(e) => return error_to_response(&e),
    };

    if !user.is_active {
        warn!("Login rejected for {}: account deactivated", email);
        state.audit.log_auth_attempt(false, &email).await;
        return error_response(StatusCode::FORBIDDEN, "Account is deactivated", None);
    }

    match verify_password(&body.password, &user.password_hash) {
        Ok(true) => {}
        Ok(false) => {
            warn!("Login failed for {}: bad password", email);
            state.audit.log_auth_attempt(false, &email).await;
            return error_response(StatusCode::UNAUTHORIZED, "Invalid credentials", None);
        }
        Err(e) => return error_to_response(&e),
    }

    info!("User {} logged in", user.email);
    state.audit.log_auth_attempt(true, &user.email).await;
    generate_auth_response(&jwt, &user, StatusCode::OK)
}

/// GET /auth/me
async fn handle_me(req: Request<Incoming>, state: Arc<AppState>) -> Response<FullBody> {
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
    let users = match mongo.collection::<UserDoc>(USER_COLLECTION).await {
        Ok(c) => c,
        Err(e) => return error_to_response(&e),
    };

    match users.find_one(doc! { "_id": user_id }).await {
        Ok(Some(user)) => json_response(StatusCode::OK, &user_to_view(&user)),
        Ok(None) => error_response(StatusCode::NOT_FOUND, "User not found", None),
        Err(e) => error_to_response(&e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::oid::ObjectId;

    #[test]
    fn test_user_view_hides_password_hash() {
        let user = UserDoc::new(
            "Grace".to_string(),
            "Hopper".to_string(),
            "grace@example.com".to_string(),
            "$argon2id$fake".to_string(),
        );

        let json = serde_json::to_value(user_to_view(&user)).unwrap();
        assert_eq!(json["firstName"], "Grace");
        assert_eq!(json["email"], "grace@example.com");
        assert_eq!(json["role"], "employee");
        assert_eq!(json["isActive"], true);
        assert!(json.get("passwordHash").is_none());
        assert!(json.get("password_hash").is_none());
    }

    #[test]
    fn test_auth_response_carries_token_and_expiry() {
        let jwt = JwtValidator::new_dev();
        let mut user = UserDoc::new(
            "Ada".to_string(),
            "Lovelace".to_string(),
            "ada@example.com".to_string(),
            "$argon2id$fake".to_string(),
        );
        user._id = Some(ObjectId::new());

        let resp = generate_auth_response(&jwt, &user, StatusCode::OK);
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[test]
    fn test_register_response_status_is_created() {
        let jwt = JwtValidator::new_dev();
        let mut user = UserDoc::new(
            "Edsger".to_string(),
            "Dijkstra".to_string(),
            "edsger@example.com".to_string(),
            "$argon2id$fake".to_string(),
        );
        user._id = Some(ObjectId::new());

        let resp = generate_auth_response(&jwt, &user, StatusCode::CREATED);
        assert_eq!(resp.status(), StatusCode::CREATED);
    }
}
