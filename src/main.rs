//! Foreman - project leadership workflow API

use bson::doc;
use clap::Parser;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use foreman::{
    auth::{hash_password, Role},
    config::Args,
    db::schemas::{UserDoc, USER_COLLECTION},
    db::MongoClient,
    server,
    types::ForemanError,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    // Parse command line arguments
    let args = Args::parse();

    // Initialize tracing/logging
    let log_level = args.log_level.clone();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("foreman={},info", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Validate configuration
    if let Err(e) = args.validate() {
        error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    // Print startup banner
    info!("======================================");
    info!("  Foreman - Leadership Workflow API");
    info!("======================================");
    info!("Node ID: {}", args.node_id);
    info!("Listen: {}", args.listen);
    info!(
        "Mode: {}",
        if args.dev_mode { "DEVELOPMENT" } else { "PRODUCTION" }
    );
    info!("MongoDB: {} (db: {})", args.mongodb_uri, args.mongodb_db);
    if let Some(ref path) = args.audit_log_path {
        info!("Audit log: {}", path.display());
    }
    info!("======================================");

    // Connect to MongoDB (optional in dev mode)
    let mongo = match MongoClient::new(&args.mongodb_uri, &args.mongodb_db).await {
        Ok(client) => {
            info!("MongoDB connected successfully");
            Some(client)
        }
        Err(e) => {
            if args.dev_mode {
                warn!(
                    "MongoDB connection failed (dev mode, continuing without): {}",
                    e
                );
                None
            } else {
                error!("MongoDB connection failed: {}", e);
                std::process::exit(1);
            }
        }
    };

    // Seed the bootstrap admin account before accepting traffic
    if let Some(ref client) = mongo {
        if let Err(e) = seed_admin(client, &args).await {
            error!("Admin seeding failed: {}", e);
            std::process::exit(1);
        }
    } else if args.admin_email.is_some() {
        warn!("ADMIN_EMAIL set but MongoDB is unavailable; skipping admin seeding");
    }

    let state = match mongo {
        Some(client) => server::AppState::with_mongo(args.clone(), client),
        None => server::AppState::new(args.clone()),
    };

    // Open the audit trail if configured
    if let Some(ref path) = args.audit_log_path {
        if let Err(e) = state.audit.init_file(path.clone()).await {
            error!("Failed to open audit log {}: {}", path.display(), e);
            std::process::exit(1);
        }
    }

    let state = Arc::new(state);

    // Run the HTTP server
    if let Err(e) = server::run(state).await {
        error!("Server error: {}", e);
        std::process::exit(1);
    }

    Ok(())
}

/// Create the bootstrap admin account if `ADMIN_EMAIL` is configured.
///
/// Idempotent: an existing account with that email is left untouched, and a
/// concurrent seed from another instance losing the unique-index race is
/// treated as success.
async fn seed_admin(mongo: &MongoClient, args: &Args) -> Result<(), ForemanError> {
    let (email, password) = match (&args.admin_email, &args.admin_password) {
        (Some(e), Some(p)) => (e.trim().to_lowercase(), p.clone()),
        _ => return Ok(()),
    };

    let users = mongo.collection::<UserDoc>(USER_COLLECTION).await?;

    if users.find_one(doc! { "email": &email }).await?.is_some() {
        info!("Admin account {} already present", email);
        return Ok(());
    }

    let password_hash = hash_password(&password)?;
    let mut admin = UserDoc::new(
        "System".to_string(),
        "Admin".to_string(),
        email.clone(),
        password_hash,
    );
    admin.role = Role::Admin;

    match users.insert_one(admin).await {
        Ok(_) => {
            info!("Seeded admin account {}", email);
            Ok(())
        }
        // Another instance seeded first
        Err(ForemanError::Duplicate(_)) => {
            info!("Admin account {} already present", email);
            Ok(())
        }
        Err(e) => Err(e),
    }
}
