//! Deadline wrapper for identity stores.

use std::{future::Future, sync::Arc, time::Duration};

use super::IdentityStore;
use crate::{
    db::{
        errors::{DbError, Result},
        handlers::ListFilter,
        models::{
            permissions::{Permission, PermissionCreateDBRequest},
            roles::{Role, RoleCreateDBRequest},
            users::{User, UserCreateDBRequest, UserLookup},
        },
    },
    types::{PermissionId, RoleId, UserId},
};

/// Bounds every call on the inner store with `limit`.
///
/// An expired call is dropped, which cancels the in-flight query, and surfaces as
/// [`DbError::Timeout`].
#[derive(Clone)]
pub struct TimeoutStore {
    inner: Arc<dyn IdentityStore>,
    limit: Duration,
}

impl TimeoutStore {
    pub fn new(inner: Arc<dyn IdentityStore>, limit: Duration) -> Self {
        Self { inner, limit }
    }

    async fn bounded<T>(&self, operation: &'static str, call: impl Future<Output = Result<T>>) -> Result<T> {
        match tokio::time::timeout(self.limit, call).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(operation, limit = ?self.limit, "identity store call timed out");
                Err(DbError::Timeout { operation })
            }
        }
    }
}

#[async_trait::async_trait]
impl IdentityStore for TimeoutStore {
    async fn create_user(&self, request: &UserCreateDBRequest) -> Result<User> {
        self.bounded("create_user", self.inner.create_user(request)).await
    }

    async fn save_user(&self, user: &User) -> Result<User> {
        self.bounded("save_user", self.inner.save_user(user)).await
    }

    async fn delete_user(&self, id: UserId) -> Result<bool> {
        self.bounded("delete_user", self.inner.delete_user(id)).await
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>> {
        self.bounded("get_user", self.inner.get_user(id)).await
    }

    async fn find_user(&self, lookup: &[UserLookup]) -> Result<Option<User>> {
        self.bounded("find_user", self.inner.find_user(lookup)).await
    }

    async fn find_user_by_email_or_username(&self, identifier: &str) -> Result<Option<User>> {
        self.bounded(
            "find_user_by_email_or_username",
            self.inner.find_user_by_email_or_username(identifier),
        )
        .await
    }

    async fn list_users(&self, filter: &ListFilter) -> Result<Vec<User>> {
        self.bounded("list_users", self.inner.list_users(filter)).await
    }

    async fn user_roles(&self, user_id: UserId) -> Result<Vec<Role>> {
        self.bounded("user_roles", self.inner.user_roles(user_id)).await
    }

    async fn create_role(&self, request: &RoleCreateDBRequest) -> Result<Role> {
        self.bounded("create_role", self.inner.create_role(request)).await
    }

    async fn delete_role(&self, id: RoleId) -> Result<bool> {
        self.bounded("delete_role", self.inner.delete_role(id)).await
    }

    async fn get_role(&self, name: &str) -> Result<Option<Role>> {
        self.bounded("get_role", self.inner.get_role(name)).await
    }

    async fn list_roles(&self, filter: &ListFilter) -> Result<Vec<Role>> {
        self.bounded("list_roles", self.inner.list_roles(filter)).await
    }

    async fn assign_role(&self, role_id: RoleId, user_id: UserId) -> Result<()> {
        self.bounded("assign_role", self.inner.assign_role(role_id, user_id)).await
    }

    async fn revoke_role(&self, role_id: RoleId, user_id: UserId) -> Result<bool> {
        self.bounded("revoke_role", self.inner.revoke_role(role_id, user_id)).await
    }

    async fn add_permission(&self, role_id: RoleId, permission_id: PermissionId) -> Result<()> {
        self.bounded("add_permission", self.inner.add_permission(role_id, permission_id))
            .await
    }

    async fn remove_permission(&self, role_id: RoleId, permission_id: PermissionId) -> Result<bool> {
        self.bounded("remove_permission", self.inner.remove_permission(role_id, permission_id))
            .await
    }

    async fn role_permissions(&self, role_id: RoleId) -> Result<Vec<Permission>> {
        self.bounded("role_permissions", self.inner.role_permissions(role_id)).await
    }

    async fn create_permission(&self, request: &PermissionCreateDBRequest) -> Result<Permission> {
        self.bounded("create_permission", self.inner.create_permission(request)).await
    }

    async fn delete_permission(&self, id: PermissionId) -> Result<bool> {
        self.bounded("delete_permission", self.inner.delete_permission(id)).await
    }

    async fn get_permission(&self, name: &str) -> Result<Option<Permission>> {
        self.bounded("get_permission", self.inner.get_permission(name)).await
    }

    async fn list_permissions(&self, filter: &ListFilter) -> Result<Vec<Permission>> {
        self.bounded("list_permissions", self.inner.list_permissions(filter)).await
    }

    async fn has_role(&self, user_id: UserId, role_name: &str) -> Result<bool> {
        self.bounded("has_role", self.inner.has_role(user_id, role_name)).await
    }

    async fn has_permission(&self, user_id: UserId, permission_name: &str) -> Result<bool> {
        self.bounded("has_permission", self.inner.has_permission(user_id, permission_name))
            .await
    }

    async fn can_access(&self, user_id: UserId, method: &str, route: &str) -> Result<bool> {
        self.bounded("can_access", self.inner.can_access(user_id, method, route)).await
    }
}
