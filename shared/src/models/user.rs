//! User account models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::Language;

/// A dashboard user (store staff)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub name: String,
    pub email: Option<String>,
    pub role: UserRole,
    pub preferred_language: Language,
    pub created_at: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
}

/// What a user may do on the dashboard
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    /// Full access, including deleting inventory rows
    Admin,
    /// Stock counting, editing and syncing
    #[default]
    Staff,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Admin => "admin",
            UserRole::Staff => "staff",
        }
    }

    /// Unknown role strings fall back to the least privileged role
    pub fn from_db(value: &str) -> Self {
        match value {
            "admin" => UserRole::Admin,
            _ => UserRole::Staff,
        }
    }

    pub fn can_delete_products(&self) -> bool {
        matches!(self, UserRole::Admin)
    }
}

/// Security events written to the audit log
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SecurityEvent {
    LoginSuccess,
    LoginFailed,
    LoginLocked,
    Logout,
    PasswordChanged,
    PasswordChangeFailed,
}

impl SecurityEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            SecurityEvent::LoginSuccess => "login_success",
            SecurityEvent::LoginFailed => "login_failed",
            SecurityEvent::LoginLocked => "login_locked",
            SecurityEvent::Logout => "logout",
            SecurityEvent::PasswordChanged => "password_changed",
            SecurityEvent::PasswordChangeFailed => "password_change_failed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_roles_are_staff() {
        assert_eq!(UserRole::from_db("admin"), UserRole::Admin);
        assert_eq!(UserRole::from_db("manager"), UserRole::Staff);
        assert!(!UserRole::Staff.can_delete_products());
    }
}
