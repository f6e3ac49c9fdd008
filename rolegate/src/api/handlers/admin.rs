//! RBAC administration.
//!
//! Every route here sits behind the bearer and RBAC guards, so callers need a permission for the
//! exact `(method, route)` pair. [`ADMIN_ROUTES`] lists those pairs; the bootstrap admin role is
//! granted all of them.

use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
};

use crate::{
    AppState,
    api::models::{
        admin::{AccessCheck, AccessCheckResponse, RoleAssignment, RolePermission, RolePermissionsQuery, UserRolesQuery},
        pagination::Pagination,
        users::UserResponse,
    },
    db::{
        errors::DbError,
        handlers::ListFilter,
        models::{
            permissions::{Permission, PermissionCreateDBRequest},
            roles::{Role, RoleCreateDBRequest},
        },
    },
    errors::Error,
};

/// `(permission name, method, route)` for every admin endpoint
pub const ADMIN_ROUTES: &[(&str, &str, &str)] = &[
    ("admin.users.list", "GET", "/admin/users"),
    ("admin.roles.list", "GET", "/admin/roles"),
    ("admin.roles.create", "POST", "/admin/roles"),
    ("admin.permissions.list", "GET", "/admin/permissions"),
    ("admin.permissions.create", "POST", "/admin/permissions"),
    ("admin.role-assignments.list", "GET", "/admin/role-assignments"),
    ("admin.role-assignments.create", "POST", "/admin/role-assignments"),
    ("admin.role-assignments.delete", "DELETE", "/admin/role-assignments"),
    ("admin.role-permissions.list", "GET", "/admin/role-permissions"),
    ("admin.role-permissions.create", "POST", "/admin/role-permissions"),
    ("admin.role-permissions.delete", "DELETE", "/admin/role-permissions"),
    ("admin.access-checks.create", "POST", "/admin/access-checks"),
];

fn not_empty(field: &str, value: &str) -> Result<(), Error> {
    if value.trim().is_empty() {
        return Err(Error::BadRequest {
            message: format!("{field} must not be empty"),
        });
    }
    Ok(())
}

#[tracing::instrument(skip_all)]
pub async fn list_users(State(state): State<AppState>, Query(pagination): Query<Pagination>) -> Result<Json<Vec<UserResponse>>, Error> {
    let users = state.auth.store().list_users(&ListFilter::from(&pagination)).await?;
    Ok(Json(users.into_iter().map(UserResponse::from).collect()))
}

#[tracing::instrument(skip_all)]
pub async fn list_roles(State(state): State<AppState>, Query(pagination): Query<Pagination>) -> Result<Json<Vec<Role>>, Error> {
    Ok(Json(state.auth.store().list_roles(&ListFilter::from(&pagination)).await?))
}

#[tracing::instrument(skip_all, fields(name = %request.name))]
pub async fn create_role(State(state): State<AppState>, Json(request): Json<RoleCreateDBRequest>) -> Result<(StatusCode, Json<Role>), Error> {
    not_empty("name", &request.name)?;
    let role = state.auth.store().create_role(&request).await?;
    Ok((StatusCode::CREATED, Json(role)))
}

#[tracing::instrument(skip_all)]
pub async fn list_permissions(State(state): State<AppState>, Query(pagination): Query<Pagination>) -> Result<Json<Vec<Permission>>, Error> {
    Ok(Json(state.auth.store().list_permissions(&ListFilter::from(&pagination)).await?))
}

#[tracing::instrument(skip_all, fields(name = %request.name))]
pub async fn create_permission(
    State(state): State<AppState>,
    Json(request): Json<PermissionCreateDBRequest>,
) -> Result<(StatusCode, Json<Permission>), Error> {
    not_empty("name", &request.name)?;
    not_empty("method", &request.method)?;
    not_empty("route", &request.route)?;
    let permission = state.auth.store().create_permission(&request).await?;
    Ok((StatusCode::CREATED, Json(permission)))
}

/// Roles held by a user
#[tracing::instrument(skip_all, fields(user_id = query.user_id))]
pub async fn list_role_assignments(State(state): State<AppState>, Query(query): Query<UserRolesQuery>) -> Result<Json<Vec<Role>>, Error> {
    Ok(Json(state.auth.store().user_roles(query.user_id).await?))
}

#[tracing::instrument(skip_all, fields(role_id = request.role_id, user_id = request.user_id))]
pub async fn assign_role(State(state): State<AppState>, Json(request): Json<RoleAssignment>) -> Result<StatusCode, Error> {
    state.auth.store().assign_role(request.role_id, request.user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[tracing::instrument(skip_all, fields(role_id = request.role_id, user_id = request.user_id))]
pub async fn revoke_role(State(state): State<AppState>, Json(request): Json<RoleAssignment>) -> Result<StatusCode, Error> {
    if !state.auth.store().revoke_role(request.role_id, request.user_id).await? {
        return Err(DbError::NotFound.into());
    }
    Ok(StatusCode::NO_CONTENT)
}

/// Permissions held by a role
#[tracing::instrument(skip_all, fields(role_id = query.role_id))]
pub async fn list_role_permissions(
    State(state): State<AppState>,
    Query(query): Query<RolePermissionsQuery>,
) -> Result<Json<Vec<Permission>>, Error> {
    Ok(Json(state.auth.store().role_permissions(query.role_id).await?))
}

#[tracing::instrument(skip_all, fields(role_id = request.role_id, permission_id = request.permission_id))]
pub async fn add_role_permission(State(state): State<AppState>, Json(request): Json<RolePermission>) -> Result<StatusCode, Error> {
    state.auth.store().add_permission(request.role_id, request.permission_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[tracing::instrument(skip_all, fields(role_id = request.role_id, permission_id = request.permission_id))]
pub async fn remove_role_permission(State(state): State<AppState>, Json(request): Json<RolePermission>) -> Result<StatusCode, Error> {
    if !state.auth.store().remove_permission(request.role_id, request.permission_id).await? {
        return Err(DbError::NotFound.into());
    }
    Ok(StatusCode::NO_CONTENT)
}

/// Evaluate a role, permission or route check for any user
#[tracing::instrument(skip_all)]
pub async fn check_access(State(state): State<AppState>, Json(check): Json<AccessCheck>) -> Result<Json<AccessCheckResponse>, Error> {
    let access = state.auth.access();
    let granted = match check {
        AccessCheck::Role { user_id, role } => access.has_role(user_id, &role).await?,
        AccessCheck::Permission { user_id, permission } => access.has_permission(user_id, &permission).await?,
        AccessCheck::Route { user_id, method, route } => access.can_access(user_id, &method, &route).await?,
    };
    Ok(Json(AccessCheckResponse { granted }))
}
