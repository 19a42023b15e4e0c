//! Authentication and authorization for Foreman
//!
//! Provides:
//! - JWT token generation and validation
//! - Role policy for workflow operations
//! - Password hashing with Argon2

pub mod jwt;
pub mod password;
pub mod roles;

pub use jwt::{extract_token_from_header, Claims, JwtValidator, TokenInput, TokenValidationResult};
pub use password::{hash_password, verify_password};
pub use roles::Role;
