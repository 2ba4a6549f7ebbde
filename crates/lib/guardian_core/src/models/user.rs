//! Identity domain models.
//!
//! `User` is the public shape. The password hash only travels inside
//! `UserWithPassword`, which never leaves the store and credential verifier.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::media::MediaHandle;

/// Account role. Fixed at registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Citizen,
    Employee,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Citizen => "citizen",
            Role::Employee => "employee",
            Role::Admin => "admin",
        }
    }

    /// Whether this role may triage complaints.
    pub fn is_staff(&self) -> bool {
        matches!(self, Role::Employee | Role::Admin)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "citizen" => Ok(Role::Citizen),
            "employee" => Ok(Role::Employee),
            "admin" => Ok(Role::Admin),
            other => Err(format!("Unknown role '{other}'")),
        }
    }
}

/// Registered user without credential material.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub mobile: String,
    pub address: String,
    pub city: String,
    pub role: Role,
    pub avatar: Option<MediaHandle>,
    pub created_at: DateTime<Utc>,
}

/// User joined with the stored bcrypt hash (internal auth flows only).
#[derive(Debug, Clone)]
pub struct UserWithPassword {
    pub user: User,
    pub password_hash: String,
}

/// Validated registration record ready for insertion.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    /// Already normalized (trimmed, lowercased).
    pub email: String,
    pub password_hash: String,
    pub mobile: String,
    pub address: String,
    pub city: String,
    pub role: Role,
}

/// Normalize an email for storage and lookup.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_parses_case_insensitively() {
        assert_eq!("Employee".parse::<Role>(), Ok(Role::Employee));
        assert_eq!(" admin ".parse::<Role>(), Ok(Role::Admin));
        assert!("superuser".parse::<Role>().is_err());
    }

    #[test]
    fn only_employee_and_admin_are_staff() {
        assert!(!Role::Citizen.is_staff());
        assert!(Role::Employee.is_staff());
        assert!(Role::Admin.is_staff());
    }

    #[test]
    fn normalize_email_lowercases_and_trims() {
        assert_eq!(normalize_email("  Alice@Example.COM "), "alice@example.com");
    }
}
