//! JWT token generation and validation
//!
//! Tokens are HS256-signed and carry the user's id, email, and role. Route
//! handlers trust a verified token's role without a database round-trip.

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::auth::roles::Role;
use crate::types::ForemanError;

const DEV_SECRET: &str = "dev-only-insecure-secret";
const DEV_EXPIRY_SECONDS: u64 = 3600;

/// Claims embedded in every token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject - the user's ObjectId as a hex string
    pub sub: String,

    /// Login email
    pub email: String,

    /// Workflow role at issue time
    pub role: Role,

    /// Issued at (unix seconds)
    pub iat: u64,

    /// Expiry (unix seconds)
    pub exp: u64,
}

/// Input for token generation
#[derive(Debug, Clone)]
pub struct TokenInput {
    pub user_id: String,
    pub email: String,
    pub role: Role,
}

/// Outcome of token verification
#[derive(Debug)]
pub struct TokenValidationResult {
    pub valid: bool,
    pub claims: Option<Claims>,
    pub error: Option<String>,
}

/// HS256 token generator and verifier
#[derive(Clone)]
pub struct JwtValidator {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    expiry_seconds: u64,
}

impl JwtValidator {
    /// Create a validator with the given secret
    pub fn new(secret: String, expiry_seconds: u64) -> Result<Self, ForemanError> {
        if secret.is_empty() {
            return Err(ForemanError::Auth("JWT secret must not be empty".into()));
        }

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            expiry_seconds,
        })
    }

    /// Create a validator with the fixed development secret
    pub fn new_dev() -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(DEV_SECRET.as_bytes()),
            decoding_key: DecodingKey::from_secret(DEV_SECRET.as_bytes()),
            expiry_seconds: DEV_EXPIRY_SECONDS,
        }
    }

    /// Generate a signed token for the given identity
    pub fn generate_token(&self, input: TokenInput) -> Result<String, ForemanError> {
        let now = chrono::Utc::now().timestamp() as u64;

        let claims = Claims {
            sub: input.user_id,
            email: input.email,
            role: input.role,
            iat: now,
            exp: now + self.expiry_seconds,
        };

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| ForemanError::Auth(format!("Failed to generate token: {}", e)))
    }

    /// Verify a token and extract its claims
    pub fn verify_token(&self, token: &str) -> TokenValidationResult {
        let validation = Validation::new(Algorithm::HS256);

        match decode::<Claims>(token, &self.decoding_key, &validation) {
            Ok(data) => TokenValidationResult {
                valid: true,
                claims: Some(data.claims),
                error: None,
            },
            Err(e) => TokenValidationResult {
                valid: false,
                claims: None,
                error: Some(e.to_string()),
            },
        }
    }

    /// Configured token lifetime in seconds
    pub fn expiry_seconds(&self) -> u64 {
        self.expiry_seconds
    }
}

/// Extract the bearer token from an Authorization header value
pub fn extract_token_from_header(header: Option<&str>) -> Option<String> {
    header
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validator() -> JwtValidator {
        JwtValidator::new("test-secret".to_string(), 3600).unwrap()
    }

    #[test]
    fn test_token_round_trip() {
        let jwt = validator();
        let token = jwt
            .generate_token(TokenInput {
                user_id: "507f1f77bcf86cd799439011".to_string(),
                email: "lead@example.com".to_string(),
                role: Role::Admin,
            })
            .unwrap();

        let result = jwt.verify_token(&token);
        assert!(result.valid);
        assert!(result.error.is_none());

        let claims = result.claims.unwrap();
        assert_eq!(claims.sub, "507f1f77bcf86cd799439011");
        assert_eq!(claims.email, "lead@example.com");
        assert_eq!(claims.role, Role::Admin);
        assert_eq!(claims.exp, claims.iat + 3600);
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let jwt = validator();
        let token = jwt
            .generate_token(TokenInput {
                user_id: "507f1f77bcf86cd799439011".to_string(),
                email: "lead@example.com".to_string(),
                role: Role::Employee,
            })
            .unwrap();

        let other = JwtValidator::new("different-secret".to_string(), 3600).unwrap();
        let result = other.verify_token(&token);
        assert!(!result.valid);
        assert!(result.claims.is_none());
        assert!(result.error.is_some());
    }

    #[test]
    fn test_expired_token_rejected() {
        let jwt = validator();

        // Craft a token that expired well past the default leeway
        let now = chrono::Utc::now().timestamp() as u64;
        let claims = Claims {
            sub: "507f1f77bcf86cd799439011".to_string(),
            email: "lead@example.com".to_string(),
            role: Role::Employee,
            iat: now - 7200,
            exp: now - 3600,
        };

        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(b"test-secret"),
        )
        .unwrap();

        let result = jwt.verify_token(&token);
        assert!(!result.valid);
    }

    #[test]
    fn test_garbage_token_rejected() {
        let result = validator().verify_token("not-a-jwt");
        assert!(!result.valid);
    }

    #[test]
    fn test_empty_secret_rejected() {
        assert!(JwtValidator::new(String::new(), 3600).is_err());
    }

    #[test]
    fn test_extract_token_from_header() {
        assert_eq!(
            extract_token_from_header(Some("Bearer abc123")),
            Some("abc123".to_string())
        );
        assert_eq!(extract_token_from_header(Some("Basic abc123")), None);
        assert_eq!(extract_token_from_header(Some("Bearer ")), None);
        assert_eq!(extract_token_from_header(None), None);
    }
}
