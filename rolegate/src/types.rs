//! Common type definitions shared across the store, engine and API layers.
//!
//! # ID Types
//!
//! All entity IDs are store-assigned 64-bit integers wrapped in type aliases:
//!
//! - [`UserId`]: User account identifier
//! - [`RoleId`]: Role identifier
//! - [`PermissionId`]: Permission identifier
//!
//! # Login strategy
//!
//! [`LoginMethod`] selects which user column the login identifier is matched against.

use serde::{Deserialize, Serialize};
use std::fmt;

// Type aliases for IDs
pub type UserId = i64;
pub type RoleId = i64;
pub type PermissionId = i64;

/// Which column a login identifier is matched against.
///
/// `EmailOrUsername` tries both columns in one lookup; when one row matches by email and another
/// by username, the email match wins.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoginMethod {
    #[default]
    Email,
    Username,
    EmailOrUsername,
}

impl fmt::Display for LoginMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoginMethod::Email => write!(f, "email"),
            LoginMethod::Username => write!(f, "username"),
            LoginMethod::EmailOrUsername => write!(f, "email_or_username"),
        }
    }
}
