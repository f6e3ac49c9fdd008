//! Database models for permissions.

use crate::types::PermissionId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row of `rbac_permission`.
///
/// `(method, route)` is not unique. Route checks match both columns byte-for-byte.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Permission {
    pub id: PermissionId,
    pub name: String,
    pub method: String,
    pub route: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Database request for creating a permission
#[derive(Debug, Clone, Deserialize)]
pub struct PermissionCreateDBRequest {
    pub name: String,
    pub method: String,
    pub route: String,
    pub description: Option<String>,
}
