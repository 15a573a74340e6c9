//! User model and related types

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use crate::error::AppError;

/// User privilege level
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema)]
#[serde(try_from = "i16", into = "i16")]
#[repr(i16)]
pub enum PrivilegeLevel {
    Banned = 0,
    User = 1,
    Admin = 2,
    SuperAdmin = 3,
}

impl PrivilegeLevel {
    pub fn is_admin(self) -> bool {
        self >= PrivilegeLevel::Admin
    }

    pub fn is_banned(self) -> bool {
        self == PrivilegeLevel::Banned
    }

    /// Levels a freshly created account may start with
    pub fn is_assignable_on_creation(self) -> bool {
        self != PrivilegeLevel::Banned
    }
}

impl TryFrom<i16> for PrivilegeLevel {
    type Error = String;

    fn try_from(v: i16) -> Result<Self, Self::Error> {
        match v {
            0 => Ok(PrivilegeLevel::Banned),
            1 => Ok(PrivilegeLevel::User),
            2 => Ok(PrivilegeLevel::Admin),
            3 => Ok(PrivilegeLevel::SuperAdmin),
            _ => Err(format!("invalid privilege level: {}", v)),
        }
    }
}

impl From<PrivilegeLevel> for i16 {
    fn from(level: PrivilegeLevel) -> Self {
        level as i16
    }
}

impl std::fmt::Display for PrivilegeLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            PrivilegeLevel::Banned => "banned",
            PrivilegeLevel::User => "user",
            PrivilegeLevel::Admin => "admin",
            PrivilegeLevel::SuperAdmin => "super admin",
        };
        write!(f, "{}", label)
    }
}

/// Internal row structure for database queries
#[derive(Debug, Clone, FromRow)]
pub struct UserRow {
    pub id: i32,
    pub username: String,
    pub password: String,
    pub level: i16,
}

impl TryFrom<UserRow> for User {
    type Error = AppError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        Ok(User {
            id: row.id,
            username: row.username,
            password: row.password,
            level: PrivilegeLevel::try_from(row.level).map_err(AppError::Internal)?,
        })
    }
}

/// Full user model as stored
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: i32,
    pub username: String,
    /// Hashed password (argon2)
    pub password: String,
    pub level: PrivilegeLevel,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.level.is_admin()
    }

    pub fn is_banned(&self) -> bool {
        self.level.is_banned()
    }

    pub fn identity(&self) -> Identity {
        Identity {
            id: self.id,
            username: self.username.clone(),
            level: self.level,
        }
    }
}

/// Public view of a user; never carries the credential
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Identity {
    pub id: i32,
    pub username: String,
    #[schema(value_type = i16)]
    pub level: PrivilegeLevel,
}

impl Identity {
    pub fn is_admin(&self) -> bool {
        self.level.is_admin()
    }
}

impl From<User> for Identity {
    fn from(user: User) -> Self {
        Identity {
            id: user.id,
            username: user.username,
            level: user.level,
        }
    }
}

/// Data handed to the store when creating a user
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub password_hash: String,
    pub level: PrivilegeLevel,
}

/// Create user request
#[derive(Debug, Clone, Deserialize, Serialize, Validate, ToSchema)]
pub struct CreateUser {
    #[validate(length(min = 1, message = "username required"))]
    pub username: String,
    #[validate(length(min = 1, message = "password required"))]
    pub password: String,
    #[schema(value_type = i16)]
    pub level: PrivilegeLevel,
}

/// Update user request; absent fields stay unchanged
#[derive(Debug, Clone, Default, Deserialize, Serialize, ToSchema)]
pub struct UpdateUser {
    pub password: Option<String>,
    #[schema(value_type = Option<i16>)]
    pub level: Option<PrivilegeLevel>,
}

/// Trim surrounding whitespace from a username
pub fn trim_username(username: &str) -> &str {
    username.trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_privilege_classification() {
        assert!(PrivilegeLevel::Banned.is_banned());
        assert!(!PrivilegeLevel::User.is_admin());
        assert!(PrivilegeLevel::Admin.is_admin());
        assert!(PrivilegeLevel::SuperAdmin.is_admin());
        assert!(!PrivilegeLevel::SuperAdmin.is_banned());
    }

    #[test]
    fn test_privilege_from_i16() {
        assert_eq!(PrivilegeLevel::try_from(2), Ok(PrivilegeLevel::Admin));
        assert!(PrivilegeLevel::try_from(4).is_err());
        assert!(PrivilegeLevel::try_from(-1).is_err());
    }

    #[test]
    fn test_privilege_serializes_as_integer() {
        let json = serde_json::to_string(&PrivilegeLevel::SuperAdmin).unwrap();
        assert_eq!(json, "3");
        let level: PrivilegeLevel = serde_json::from_str("1").unwrap();
        assert_eq!(level, PrivilegeLevel::User);
        assert!(serde_json::from_str::<PrivilegeLevel>("7").is_err());
    }

    #[test]
    fn test_identity_hides_password() {
        let user = User {
            id: 1,
            username: "alice".into(),
            password: "$argon2id$hash".into(),
            level: PrivilegeLevel::User,
        };
        let json = serde_json::to_value(user.identity()).unwrap();
        assert_eq!(json["username"], "alice");
        assert_eq!(json["level"], 1);
        assert!(json.get("password").is_none());
    }

    #[test]
    fn test_trim_username() {
        assert_eq!(trim_username("  bob "), "bob");
        assert_eq!(trim_username("   "), "");
    }
}
