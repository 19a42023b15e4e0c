//! Logging infrastructure for Foreman
//!
//! Provides a JSONL audit trail of workflow decisions alongside the normal
//! tracing output.

pub mod audit;

pub use audit::{AuditEvent, AuditLogger, EventType};
