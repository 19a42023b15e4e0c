//! Database schemas for Foreman
//!
//! Defines MongoDB document structures for users, projects, volunteer
//! requests, and the points ledger.

mod metadata;
mod points;
mod project;
mod user;
mod volunteer;

pub use metadata::Metadata;
pub use points::{
    ActivityType, PointsDoc, PointsTransaction, TransactionMetadata, POINTS_COLLECTION,
};
pub use project::{ProjectDoc, ProjectPriority, ProjectStatus, PROJECT_COLLECTION};
pub use user::{UserDoc, USER_COLLECTION};
pub use volunteer::{
    VolunteerOutcome, VolunteerRequestDoc, VolunteerStatus, VOLUNTEER_COLLECTION,
};
