//! API models for the RBAC administration endpoints.

use serde::{Deserialize, Serialize};

use crate::types::{PermissionId, RoleId, UserId};

/// A user-role grant
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleAssignment {
    pub role_id: RoleId,
    pub user_id: UserId,
}

/// A role-permission grant
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RolePermission {
    pub role_id: RoleId,
    pub permission_id: PermissionId,
}

#[derive(Debug, Deserialize)]
pub struct UserRolesQuery {
    pub user_id: UserId,
}

#[derive(Debug, Deserialize)]
pub struct RolePermissionsQuery {
    pub role_id: RoleId,
}

/// One of the three access checks, evaluated for `user_id`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AccessCheck {
    Role { user_id: UserId, role: String },
    Permission { user_id: UserId, permission: String },
    Route { user_id: UserId, method: String, route: String },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AccessCheckResponse {
    pub granted: bool,
}
