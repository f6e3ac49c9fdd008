//! PostgreSQL-backed identity store.

use sqlx::PgPool;

use super::IdentityStore;
use crate::{
    db::{
        errors::Result,
        handlers::{Grants, ListFilter, Permissions, Repository, Roles, Users},
        models::{
            permissions::{Permission, PermissionCreateDBRequest},
            roles::{Role, RoleCreateDBRequest},
            users::{User, UserCreateDBRequest, UserLookup},
        },
    },
    types::{PermissionId, RoleId, UserId},
};

/// Identity store over a connection pool. Every call checks out one connection.
#[derive(Clone)]
pub struct PgIdentityStore {
    pool: PgPool,
}

impl PgIdentityStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait::async_trait]
impl IdentityStore for PgIdentityStore {
    async fn create_user(&self, request: &UserCreateDBRequest) -> Result<User> {
        let mut conn = self.pool.acquire().await?;
        Users::new(&mut conn).create(request).await
    }

    async fn save_user(&self, user: &User) -> Result<User> {
        let mut conn = self.pool.acquire().await?;
        Users::new(&mut conn).save(user).await
    }

    async fn delete_user(&self, id: UserId) -> Result<bool> {
        let mut conn = self.pool.acquire().await?;
        Users::new(&mut conn).delete(id).await
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>> {
        let mut conn = self.pool.acquire().await?;
        Users::new(&mut conn).get_by_id(id).await
    }

    async fn find_user(&self, lookup: &[UserLookup]) -> Result<Option<User>> {
        let mut conn = self.pool.acquire().await?;
        Users::new(&mut conn).find(lookup).await
    }

    async fn find_user_by_email_or_username(&self, identifier: &str) -> Result<Option<User>> {
        let mut conn = self.pool.acquire().await?;
        Users::new(&mut conn).get_user_by_email_or_username(identifier).await
    }

    async fn list_users(&self, filter: &ListFilter) -> Result<Vec<User>> {
        let mut conn = self.pool.acquire().await?;
        Users::new(&mut conn).list(filter).await
    }

    async fn user_roles(&self, user_id: UserId) -> Result<Vec<Role>> {
        let mut conn = self.pool.acquire().await?;
        Grants::new(&mut conn).roles_for_user(user_id).await
    }

    async fn create_role(&self, request: &RoleCreateDBRequest) -> Result<Role> {
        let mut conn = self.pool.acquire().await?;
        Roles::new(&mut conn).create(request).await
    }

    async fn delete_role(&self, id: RoleId) -> Result<bool> {
        let mut conn = self.pool.acquire().await?;
        Roles::new(&mut conn).delete(id).await
    }

    async fn get_role(&self, name: &str) -> Result<Option<Role>> {
        let mut conn = self.pool.acquire().await?;
        Roles::new(&mut conn).get_by_name(name).await
    }

    async fn list_roles(&self, filter: &ListFilter) -> Result<Vec<Role>> {
        let mut conn = self.pool.acquire().await?;
        Roles::new(&mut conn).list(filter).await
    }

    async fn assign_role(&self, role_id: RoleId, user_id: UserId) -> Result<()> {
        let mut conn = self.pool.acquire().await?;
        Grants::new(&mut conn).assign_role(role_id, user_id).await
    }

    async fn revoke_role(&self, role_id: RoleId, user_id: UserId) -> Result<bool> {
        let mut conn = self.pool.acquire().await?;
        Grants::new(&mut conn).revoke_role(role_id, user_id).await
    }

    async fn add_permission(&self, role_id: RoleId, permission_id: PermissionId) -> Result<()> {
        let mut conn = self.pool.acquire().await?;
        Grants::new(&mut conn).add_permission(role_id, permission_id).await
    }

    async fn remove_permission(&self, role_id: RoleId, permission_id: PermissionId) -> Result<bool> {
        let mut conn = self.pool.acquire().await?;
        Grants::new(&mut conn).remove_permission(role_id, permission_id).await
    }

    async fn role_permissions(&self, role_id: RoleId) -> Result<Vec<Permission>> {
        let mut conn = self.pool.acquire().await?;
        Grants::new(&mut conn).permissions_for_role(role_id).await
    }

    async fn create_permission(&self, request: &PermissionCreateDBRequest) -> Result<Permission> {
        let mut conn = self.pool.acquire().await?;
        Permissions::new(&mut conn).create(request).await
    }

    async fn delete_permission(&self, id: PermissionId) -> Result<bool> {
        let mut conn = self.pool.acquire().await?;
        Permissions::new(&mut conn).delete(id).await
    }

    async fn get_permission(&self, name: &str) -> Result<Option<Permission>> {
        let mut conn = self.pool.acquire().await?;
        Permissions::new(&mut conn).get_by_name(name).await
    }

    async fn list_permissions(&self, filter: &ListFilter) -> Result<Vec<Permission>> {
        let mut conn = self.pool.acquire().await?;
        Permissions::new(&mut conn).list(filter).await
    }

    async fn has_role(&self, user_id: UserId, role_name: &str) -> Result<bool> {
        let mut conn = self.pool.acquire().await?;
        Grants::new(&mut conn).has_role(user_id, role_name).await
    }

    async fn has_permission(&self, user_id: UserId, permission_name: &str) -> Result<bool> {
        let mut conn = self.pool.acquire().await?;
        Grants::new(&mut conn).has_permission(user_id, permission_name).await
    }

    async fn can_access(&self, user_id: UserId, method: &str, route: &str) -> Result<bool> {
        let mut conn = self.pool.acquire().await?;
        Grants::new(&mut conn).can_access(user_id, method, route).await
    }
}
