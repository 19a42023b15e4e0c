//! Shared error and result types

use hyper::StatusCode;
use thiserror::Error;

/// Domain error for foreman operations.
///
/// Variants map one-to-one onto HTTP status codes at the route boundary, so
/// handlers can bubble errors with `?` and let a single function own the
/// status policy. Workflow guard failures (already volunteered, request
/// already processed, project already led) are `Conflict` and answer 400;
/// only a raw index violation surfaces as `Duplicate` / 409.
#[derive(Error, Debug)]
pub enum ForemanError {
    /// Malformed input: bad JSON, missing fields, invalid ID format.
    #[error("{0}")]
    Validation(String),

    /// Missing or unverifiable bearer credential.
    #[error("{0}")]
    Unauthorized(String),

    /// Verified identity lacks the required role or relationship.
    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    /// Workflow state guard failed (request not pending, leader taken, ...).
    #[error("{0}")]
    Conflict(String),

    /// Unique index violation reported by the database. The payload keeps
    /// the driver detail; clients only ever see the fixed message.
    #[error("Duplicate value: {0}")]
    Duplicate(String),

    #[error("Database error: {0}")]
    Database(String),

    /// Internal auth machinery failure (token minting, hash init).
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Socket/file errors, only reachable at startup.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ForemanError {
    /// HTTP status this error answers with.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ForemanError::Validation(_) | ForemanError::Conflict(_) => StatusCode::BAD_REQUEST,
            ForemanError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ForemanError::Forbidden(_) => StatusCode::FORBIDDEN,
            ForemanError::NotFound(_) => StatusCode::NOT_FOUND,
            ForemanError::Duplicate(_) => StatusCode::CONFLICT,
            ForemanError::Database(_) | ForemanError::Auth(_) | ForemanError::Io(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Message safe to put in the response envelope. Internal failures get a
    /// generic message; the detail stays in the logs.
    pub fn public_message(&self) -> String {
        match self {
            ForemanError::Database(_) => "Database error".to_string(),
            ForemanError::Auth(_) => "Authentication error".to_string(),
            ForemanError::Io(_) => "Internal server error".to_string(),
            ForemanError::Duplicate(_) => "Duplicate field value entered".to_string(),
            other => other.to_string(),
        }
    }

    /// True when the route layer should log this at error level.
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            ForemanError::Database(_) | ForemanError::Auth(_) | ForemanError::Io(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, ForemanError>;

/// Classify a driver error, surfacing unique index violations (E11000) as
/// `Duplicate` so the route layer can answer 409 instead of 500.
pub fn map_write_error(context: &str, err: mongodb::error::Error) -> ForemanError {
    if is_duplicate_key(&err) {
        ForemanError::Duplicate(format!("{}: {}", context, err))
    } else {
        ForemanError::Database(format!("{}: {}", context, err))
    }
}

fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    use mongodb::error::{ErrorKind, WriteFailure};

    match err.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(we)) => we.code == 11000,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (ForemanError::Validation("bad".into()), StatusCode::BAD_REQUEST),
            (ForemanError::Conflict("taken".into()), StatusCode::BAD_REQUEST),
            (ForemanError::Unauthorized("no token".into()), StatusCode::UNAUTHORIZED),
            (ForemanError::Forbidden("not admin".into()), StatusCode::FORBIDDEN),
            (ForemanError::NotFound("gone".into()), StatusCode::NOT_FOUND),
            (ForemanError::Duplicate("E11000".into()), StatusCode::CONFLICT),
            (ForemanError::Database("down".into()), StatusCode::INTERNAL_SERVER_ERROR),
            (ForemanError::Auth("mint".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (err, expected) in cases {
            assert_eq!(err.status_code(), expected, "wrong status for {:?}", err);
        }
    }

    #[test]
    fn test_internal_errors_get_generic_message() {
        let err = ForemanError::Database("connection reset by peer".into());
        assert_eq!(err.public_message(), "Database error");
        assert!(err.is_internal());

        let err = ForemanError::NotFound("Project not found".into());
        assert_eq!(err.public_message(), "Project not found");
        assert!(!err.is_internal());
    }
}
