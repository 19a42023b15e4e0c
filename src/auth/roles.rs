//! Workflow roles and the policy checks route handlers gate on
//!
//! Every handler answers the same two questions: does the caller's role
//! suffice, and does the caller stand in the right relationship to the
//! resource? Both live here so the rules stay in one place.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Ordered workflow roles
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum Role {
    /// Team member - volunteers for leadership, reads own data
    #[default]
    Employee = 0,
    /// Approver - processes requests, manages projects, sees everything
    Admin = 1,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Employee => "employee",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Check whether an actual role satisfies a required one
pub fn has_role(actual: Role, required: Role) -> bool {
    actual >= required
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_ordering() {
        assert!(Role::Admin > Role::Employee);
    }

    #[test]
    fn test_admin_satisfies_everything() {
        assert!(has_role(Role::Admin, Role::Employee));
        assert!(has_role(Role::Admin, Role::Admin));
    }

    #[test]
    fn test_employee_cannot_act_as_admin() {
        assert!(has_role(Role::Employee, Role::Employee));
        assert!(!has_role(Role::Employee, Role::Admin));
    }

    #[test]
    fn test_role_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Role::Admin).unwrap(), "\"admin\"");
        assert_eq!(
            serde_json::from_str::<Role>("\"employee\"").unwrap(),
            Role::Employee
        );
    }
}
