//! Role-based permission declarations.
//!
//! # Invariants
//! - Permission string ids are stable and lowercase.
//! - Roles without a stored override use [`default_permissions`].

use crate::model::staff::StaffRole;
use crate::model::validation::ValidationError;
use crate::model::{new_record_id, Record, RecordId};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// One grantable capability inside an organization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    ManageStudents,
    ViewStudents,
    ManageStaff,
    TakeAttendance,
    LogMeals,
    ManageCurriculum,
    SendMessages,
    ManageSettings,
    ViewReports,
}

pub const PERMISSION_MANAGE_STUDENTS: &str = "manage_students";
pub const PERMISSION_VIEW_STUDENTS: &str = "view_students";
pub const PERMISSION_MANAGE_STAFF: &str = "manage_staff";
pub const PERMISSION_TAKE_ATTENDANCE: &str = "take_attendance";
pub const PERMISSION_LOG_MEALS: &str = "log_meals";
pub const PERMISSION_MANAGE_CURRICULUM: &str = "manage_curriculum";
pub const PERMISSION_SEND_MESSAGES: &str = "send_messages";
pub const PERMISSION_MANAGE_SETTINGS: &str = "manage_settings";
pub const PERMISSION_VIEW_REPORTS: &str = "view_reports";

const ALL_PERMISSIONS: &[Permission] = &[
    Permission::ManageStudents,
    Permission::ViewStudents,
    Permission::ManageStaff,
    Permission::TakeAttendance,
    Permission::LogMeals,
    Permission::ManageCurriculum,
    Permission::SendMessages,
    Permission::ManageSettings,
    Permission::ViewReports,
];

const TEACHER_PERMISSIONS: &[Permission] = &[
    Permission::ViewStudents,
    Permission::TakeAttendance,
    Permission::LogMeals,
    Permission::ManageCurriculum,
    Permission::SendMessages,
    Permission::ViewReports,
];

const ASSISTANT_PERMISSIONS: &[Permission] = &[
    Permission::ViewStudents,
    Permission::TakeAttendance,
    Permission::LogMeals,
];

const COOK_PERMISSIONS: &[Permission] = &[Permission::LogMeals];

const SUPPORTED_PERMISSION_STRINGS: &[&str] = &[
    PERMISSION_MANAGE_STUDENTS,
    PERMISSION_VIEW_STUDENTS,
    PERMISSION_MANAGE_STAFF,
    PERMISSION_TAKE_ATTENDANCE,
    PERMISSION_LOG_MEALS,
    PERMISSION_MANAGE_CURRICULUM,
    PERMISSION_SEND_MESSAGES,
    PERMISSION_MANAGE_SETTINGS,
    PERMISSION_VIEW_REPORTS,
];

impl Permission {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ManageStudents => PERMISSION_MANAGE_STUDENTS,
            Self::ViewStudents => PERMISSION_VIEW_STUDENTS,
            Self::ManageStaff => PERMISSION_MANAGE_STAFF,
            Self::TakeAttendance => PERMISSION_TAKE_ATTENDANCE,
            Self::LogMeals => PERMISSION_LOG_MEALS,
            Self::ManageCurriculum => PERMISSION_MANAGE_CURRICULUM,
            Self::SendMessages => PERMISSION_SEND_MESSAGES,
            Self::ManageSettings => PERMISSION_MANAGE_SETTINGS,
            Self::ViewReports => PERMISSION_VIEW_REPORTS,
        }
    }

    /// Short description for settings screens.
    pub fn description(self) -> &'static str {
        match self {
            Self::ManageStudents => "Create, edit and withdraw students and guardians.",
            Self::ViewStudents => "View student profiles, allergies and guardians.",
            Self::ManageStaff => "Create, edit and deactivate staff accounts.",
            Self::TakeAttendance => "Check students in and out and record absences.",
            Self::LogMeals => "Record meals and portions eaten.",
            Self::ManageCurriculum => "Plan and complete lessons for classes.",
            Self::SendMessages => "Send messages to guardians and staff.",
            Self::ManageSettings => "Change school settings and role permissions.",
            Self::ViewReports => "View attendance and dashboard reports.",
        }
    }

    pub fn all() -> &'static [Permission] {
        ALL_PERMISSIONS
    }
}

/// Returns supported permission string ids.
pub fn supported_permission_strings() -> &'static [&'static str] {
    SUPPORTED_PERMISSION_STRINGS
}

/// Parses one permission from its string id.
pub fn parse_permission(value: &str) -> Result<Permission, PermissionParseError> {
    let normalized = value.trim();
    if normalized.is_empty() {
        return Err(PermissionParseError::EmptyPermission);
    }

    ALL_PERMISSIONS
        .iter()
        .copied()
        .find(|permission| permission.as_str() == normalized)
        .ok_or_else(|| PermissionParseError::UnsupportedPermission(normalized.to_string()))
}

/// Built-in permission set for a role.
pub fn default_permissions(role: StaffRole) -> &'static [Permission] {
    match role {
        StaffRole::Admin | StaffRole::Director => ALL_PERMISSIONS,
        StaffRole::Teacher => TEACHER_PERMISSIONS,
        StaffRole::Assistant => ASSISTANT_PERMISSIONS,
        StaffRole::Cook => COOK_PERMISSIONS,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PermissionParseError {
    EmptyPermission,
    UnsupportedPermission(String),
}

impl Display for PermissionParseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyPermission => write!(f, "permission value must not be empty"),
            Self::UnsupportedPermission(value) => write!(f, "permission is unsupported: {value}"),
        }
    }
}

impl Error for PermissionParseError {}

/// Organization override of one role's permission set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RolePermissions {
    pub id: RecordId,
    pub role: StaffRole,
    #[serde(default)]
    pub permissions: Vec<Permission>,
}

impl RolePermissions {
    /// Creates an override with sorted, deduplicated permissions.
    pub fn new(role: StaffRole, permissions: &[Permission]) -> Self {
        let mut permissions = permissions.to_vec();
        permissions.sort();
        permissions.dedup();
        Self {
            id: new_record_id(),
            role,
            permissions,
        }
    }
}

impl Record for RolePermissions {
    const COLLECTION: &'static str = "role_permissions";

    fn id(&self) -> RecordId {
        self.id
    }

    fn validate(&self) -> Result<(), ValidationError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{
        default_permissions, parse_permission, supported_permission_strings, Permission,
        PermissionParseError, RolePermissions,
    };
    use crate::model::staff::StaffRole;

    #[test]
    fn parses_every_supported_string() {
        for value in supported_permission_strings() {
            let permission = parse_permission(value).expect("supported permission parses");
            assert_eq!(permission.as_str(), *value);
        }
    }

    #[test]
    fn rejects_empty_and_unknown_permissions() {
        assert_eq!(
            parse_permission("  "),
            Err(PermissionParseError::EmptyPermission)
        );
        assert_eq!(
            parse_permission("Take_Attendance"),
            Err(PermissionParseError::UnsupportedPermission(
                "Take_Attendance".to_string()
            ))
        );
    }

    #[test]
    fn string_ids_match_serde_names() {
        for permission in Permission::all() {
            let value = serde_json::to_value(permission).unwrap();
            assert_eq!(value, permission.as_str());
        }
    }

    #[test]
    fn default_role_sets_narrow_with_seniority() {
        assert_eq!(default_permissions(StaffRole::Admin), Permission::all());
        assert!(default_permissions(StaffRole::Teacher).contains(&Permission::TakeAttendance));
        assert!(!default_permissions(StaffRole::Teacher).contains(&Permission::ManageStaff));
        assert_eq!(default_permissions(StaffRole::Cook), &[Permission::LogMeals]);
    }

    #[test]
    fn role_override_dedups_and_sorts() {
        let role = RolePermissions::new(
            StaffRole::Assistant,
            &[Permission::LogMeals, Permission::ViewStudents, Permission::LogMeals],
        );
        assert_eq!(
            role.permissions,
            vec![Permission::ViewStudents, Permission::LogMeals]
        );
    }
}
