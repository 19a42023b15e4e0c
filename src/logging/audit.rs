//! Audit logging for leadership workflow decisions
//!
//! Logs workflow events in JSONL format so operators can answer "who approved
//! this and when" without querying MongoDB. File output is optional; events
//! are dropped silently when no file is configured.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{error, info};

/// Audit event types
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    /// A user volunteered to lead a project
    VolunteerSubmitted,
    /// An admin accepted a pending request
    RequestAccepted,
    /// An admin rejected a pending request
    RequestRejected,
    /// An admin recorded a project outcome and points moved
    ProjectCompleted,
    /// Login or registration attempt
    AuthAttempt,
}

/// Audit event for the workflow trail
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Event timestamp
    pub timestamp: DateTime<Utc>,
    /// Event type
    pub event_type: EventType,
    /// Node that handled the request
    pub node_id: String,
    /// User the event is about (the volunteer, the registrant)
    pub user_id: Option<String>,
    /// Admin who made the decision, when different from the subject
    pub actor: Option<String>,
    /// Project involved
    pub project_id: Option<String>,
    /// Volunteer request involved
    pub request_id: Option<String>,
    /// Recorded outcome (completion events)
    pub outcome: Option<String>,
    /// Signed points delta (completion events)
    pub points: Option<i64>,
    /// Additional metadata
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

impl AuditEvent {
    /// Create a new audit event
    pub fn new(event_type: EventType, node_id: String) -> Self {
        Self {
            timestamp: Utc::now(),
            event_type,
            node_id,
            user_id: None,
            actor: None,
            project_id: None,
            request_id: None,
            outcome: None,
            points: None,
            metadata: None,
        }
    }

    /// Set the subject user
    pub fn with_user(mut self, user_id: String) -> Self {
        self.user_id = Some(user_id);
        self
    }

    /// Set the deciding admin
    pub fn with_actor(mut self, actor: String) -> Self {
        self.actor = Some(actor);
        self
    }

    /// Set the project
    pub fn with_project(mut self, project_id: String) -> Self {
        self.project_id = Some(project_id);
        self
    }

    /// Set the volunteer request
    pub fn with_request(mut self, request_id: String) -> Self {
        self.request_id = Some(request_id);
        self
    }

    /// Set the outcome
    pub fn with_outcome(mut self, outcome: String) -> Self {
        self.outcome = Some(outcome);
        self
    }

    /// Set the points delta
    pub fn with_points(mut self, points: i64) -> Self {
        self.points = Some(points);
        self
    }

    /// Convert to JSONL line
    pub fn to_jsonl(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Audit logger that writes events to a JSONL file
#[derive(Clone)]
pub struct AuditLogger {
    inner: Arc<Mutex<AuditLoggerInner>>,
    node_id: String,
}

struct AuditLoggerInner {
    writer: Option<BufWriter<File>>,
}

impl AuditLogger {
    /// Create a new audit logger
    pub fn new(node_id: String) -> Self {
        Self {
            inner: Arc::new(Mutex::new(AuditLoggerInner { writer: None })),
            node_id,
        }
    }

    /// Initialize file logging to the specified path
    pub async fn init_file(&self, path: PathBuf) -> std::io::Result<()> {
        let file = OpenOptions::new().create(true).append(true).open(&path)?;

        let mut inner = self.inner.lock().await;
        inner.writer = Some(BufWriter::new(file));

        info!("Audit logging initialized to {}", path.display());
        Ok(())
    }

    /// Log an audit event
    pub async fn log(&self, event: AuditEvent) {
        let jsonl = match event.to_jsonl() {
            Ok(line) => line,
            Err(e) => {
                error!("Failed to serialize audit event: {}", e);
                return;
            }
        };

        let mut inner = self.inner.lock().await;

        if let Some(ref mut writer) = inner.writer {
            if let Err(e) = writeln!(writer, "{}", jsonl) {
                error!("Failed to write audit event: {}", e);
            }
            // Flush per event so the trail survives a crash
            if let Err(e) = writer.flush() {
                error!("Failed to flush audit log: {}", e);
            }
        }
    }

    /// Log a volunteer submission
    pub async fn log_volunteer(&self, user_id: &str, project_id: &str, request_id: &str) {
        let event = AuditEvent::new(EventType::VolunteerSubmitted, self.node_id.clone())
            .with_user(user_id.to_string())
            .with_project(project_id.to_string())
            .with_request(request_id.to_string());

        self.log(event).await;
    }

    /// Log an accept or reject decision
    pub async fn log_decision(&self, event_type: EventType, request_id: &str, actor: &str) {
        let event = AuditEvent::new(event_type, self.node_id.clone())
            .with_request(request_id.to_string())
            .with_actor(actor.to_string());

        self.log(event).await;
    }

    /// Log a recorded outcome with its points movement
    pub async fn log_completion(
        &self,
        request_id: &str,
        project_id: &str,
        actor: &str,
        outcome: &str,
        points: i64,
    ) {
        let event = AuditEvent::new(EventType::ProjectCompleted, self.node_id.clone())
            .with_request(request_id.to_string())
            .with_project(project_id.to_string())
            .with_actor(actor.to_string())
            .with_outcome(outcome.to_string())
            .with_points(points);

        self.log(event).await;
    }

    /// Log an authentication attempt
    pub async fn log_auth_attempt(&self, success: bool, email: &str) {
        let mut event = AuditEvent::new(EventType::AuthAttempt, self.node_id.clone())
            .with_user(email.to_string());

        event.metadata = Some(serde_json::json!({
            "success": success
        }));

        self.log(event).await;
    }

    /// Get the node ID
    pub fn node_id(&self) -> &str {
        &self.node_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serialization() {
        let event = AuditEvent::new(EventType::VolunteerSubmitted, "node-1".to_string())
            .with_user("user-123".to_string())
            .with_project("project-456".to_string());

        let jsonl = event.to_jsonl().unwrap();
        assert!(jsonl.contains("volunteer_submitted"));
        assert!(jsonl.contains("user-123"));
        assert!(jsonl.contains("project-456"));
    }

    #[test]
    fn test_completion_event_carries_points() {
        let event = AuditEvent::new(EventType::ProjectCompleted, "node-1".to_string())
            .with_outcome("failure".to_string())
            .with_points(-60);

        let jsonl = event.to_jsonl().unwrap();
        assert!(jsonl.contains("project_completed"));
        assert!(jsonl.contains("-60"));
        assert!(jsonl.contains("failure"));
    }

    #[test]
    fn test_auth_event_metadata() {
        let mut event = AuditEvent::new(EventType::AuthAttempt, "node-1".to_string())
            .with_user("grace@example.com".to_string());
        event.metadata = Some(serde_json::json!({ "success": false }));

        let jsonl = event.to_jsonl().unwrap();
        assert!(jsonl.contains("auth_attempt"));
        assert!(jsonl.contains("\"success\":false"));
    }

    #[tokio::test]
    async fn test_logger_without_file_drops_events() {
        let logger = AuditLogger::new("node-1".to_string());
        // No init_file call: logging must be a no-op, not an error
        logger.log_auth_attempt(true, "ada@example.com").await;
        assert_eq!(logger.node_id(), "node-1");
    }
}
