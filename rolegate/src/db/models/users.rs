//! Database models for users.

use crate::types::UserId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row of `rbac_user`.
///
/// `password_hash` is never serialized. Values handed out by the authenticator have it cleared.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub username: String,
    #[serde(skip_serializing, default)]
    pub password_hash: Option<String>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Drop the stored hash before the value leaves the engine
    pub fn without_secret(mut self) -> Self {
        self.password_hash = None;
        self
    }
}

/// Database request for creating a new user. New users are always active.
#[derive(Debug, Clone)]
pub struct UserCreateDBRequest {
    pub email: String,
    pub username: String,
    pub password_hash: Option<String>,
}

/// A single equality filter on a `rbac_user` column.
///
/// Lookups take a slice of these so the generated `WHERE` clause follows the caller's order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserLookup {
    Id(UserId),
    Email(String),
    Username(String),
    Active(bool),
}

impl UserLookup {
    pub fn column(&self) -> &'static str {
        match self {
            UserLookup::Id(_) => "id",
            UserLookup::Email(_) => "email",
            UserLookup::Username(_) => "username",
            UserLookup::Active(_) => "active",
        }
    }

    /// Whether a user row satisfies this filter
    pub fn matches(&self, user: &User) -> bool {
        match self {
            UserLookup::Id(id) => user.id == *id,
            UserLookup::Email(email) => user.email == *email,
            UserLookup::Username(username) => user.username == *username,
            UserLookup::Active(active) => user.active == *active,
        }
    }
}
