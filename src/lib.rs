//! Foreman - project leadership workflow API
//!
//! Team members volunteer to lead projects they already work on. Admins
//! approve or reject, and when the project wraps up the leader earns double
//! points on success or loses them on failure.
//!
//! ## Services
//!
//! - **Auth**: Email/password accounts with JWT sessions and an admin role
//! - **Workflow**: Volunteer, accept, reject and complete operations backed
//!   by conditional MongoDB updates so concurrent decisions cannot race
//! - **Points**: Per-user append-only ledger moved by atomic upserts
//! - **Audit**: JSONL trail of every workflow decision

pub mod auth;
pub mod config;
pub mod db;
pub mod logging;
pub mod points;
pub mod routes;
pub mod server;
pub mod types;
pub mod volunteer;

pub use config::Args;
pub use server::{run, AppState};
pub use types::{ForemanError, Result};
