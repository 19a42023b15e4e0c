//! Configuration for Foreman
//!
//! CLI arguments and environment variable handling using clap.

use clap::Parser;
use std::net::SocketAddr;
use uuid::Uuid;

/// Foreman - project leadership workflow API
///
/// Team members volunteer to lead projects, admins approve, leaders earn
/// double points on the outcome.
#[derive(Parser, Debug, Clone)]
#[command(name = "foreman")]
#[command(about = "Project leadership workflow API with a gamified points ledger")]
pub struct Args {
    /// Unique node identifier for this instance
    #[arg(long, env = "NODE_ID", default_value_t = Uuid::new_v4())]
    pub node_id: Uuid,

    /// Address to listen on
    #[arg(long, env = "LISTEN", default_value = "0.0.0.0:8080")]
    pub listen: SocketAddr,

    /// Enable development mode (insecure fallback JWT secret)
    #[arg(long, env = "DEV_MODE", default_value = "false")]
    pub dev_mode: bool,

    /// MongoDB connection URI
    #[arg(long, env = "MONGODB_URI", default_value = "mongodb://localhost:27017")]
    pub mongodb_uri: String,

    /// MongoDB database name
    #[arg(long, env = "MONGODB_DB", default_value = "foreman")]
    pub mongodb_db: String,

    /// JWT secret for token signing (required in production)
    #[arg(long, env = "JWT_SECRET")]
    pub jwt_secret: Option<String>,

    /// JWT token expiry in seconds
    #[arg(long, env = "JWT_EXPIRY_SECONDS", default_value = "3600")]
    pub jwt_expiry_seconds: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Path for the JSONL audit trail (disabled when unset)
    #[arg(long, env = "AUDIT_LOG")]
    pub audit_log_path: Option<std::path::PathBuf>,

    /// Email for the bootstrap admin account (seeded at startup if absent)
    #[arg(long, env = "ADMIN_EMAIL")]
    pub admin_email: Option<String>,

    /// Password for the bootstrap admin account
    #[arg(long, env = "ADMIN_PASSWORD")]
    pub admin_password: Option<String>,
}

impl Args {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if !self.dev_mode && self.jwt_secret.is_none() {
            return Err("JWT_SECRET is required in production mode".to_string());
        }

        if self.admin_email.is_some() && self.admin_password.is_none() {
            return Err("ADMIN_PASSWORD is required when ADMIN_EMAIL is set".to_string());
        }

        Ok(())
    }
}
