//! Database repository for the user→role and role→permission relations.
//!
//! The three access checks are single `EXISTS` queries over the join tables, so a permission
//! reachable through several roles still answers `true` exactly once.

use crate::{
    db::{
        errors::Result,
        models::{permissions::Permission, roles::Role},
    },
    types::{PermissionId, RoleId, UserId},
};
use sqlx::PgConnection;
use tracing::instrument;

pub struct Grants<'c> {
    db: &'c mut PgConnection,
}

impl<'c> Grants<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    #[instrument(skip(self), err)]
    pub async fn assign_role(&mut self, role_id: RoleId, user_id: UserId) -> Result<()> {
        sqlx::query("INSERT INTO rbac_user_role (role_id, user_id) VALUES ($1, $2)")
            .bind(role_id)
            .bind(user_id)
            .execute(&mut *self.db)
            .await?;

        Ok(())
    }

    #[instrument(skip(self), err)]
    pub async fn revoke_role(&mut self, role_id: RoleId, user_id: UserId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM rbac_user_role WHERE role_id = $1 AND user_id = $2")
            .bind(role_id)
            .bind(user_id)
            .execute(&mut *self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self), err)]
    pub async fn add_permission(&mut self, role_id: RoleId, permission_id: PermissionId) -> Result<()> {
        sqlx::query("INSERT INTO rbac_role_permission (role_id, permission_id) VALUES ($1, $2)")
            .bind(role_id)
            .bind(permission_id)
            .execute(&mut *self.db)
            .await?;

        Ok(())
    }

    #[instrument(skip(self), err)]
    pub async fn remove_permission(&mut self, role_id: RoleId, permission_id: PermissionId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM rbac_role_permission WHERE role_id = $1 AND permission_id = $2")
            .bind(role_id)
            .bind(permission_id)
            .execute(&mut *self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self), err)]
    pub async fn roles_for_user(&mut self, user_id: UserId) -> Result<Vec<Role>> {
        let roles = sqlx::query_as::<_, Role>(
            r#"
            SELECT r.* FROM rbac_role r
            JOIN rbac_user_role ur ON ur.role_id = r.id
            WHERE ur.user_id = $1
            ORDER BY r.id
            "#,
        )
        .bind(user_id)
        .fetch_all(&mut *self.db)
        .await?;

        Ok(roles)
    }

    #[instrument(skip(self), err)]
    pub async fn permissions_for_role(&mut self, role_id: RoleId) -> Result<Vec<Permission>> {
        let permissions = sqlx::query_as::<_, Permission>(
            r#"
            SELECT p.* FROM rbac_permission p
            JOIN rbac_role_permission rp ON rp.permission_id = p.id
            WHERE rp.role_id = $1
            ORDER BY p.id
            "#,
        )
        .bind(role_id)
        .fetch_all(&mut *self.db)
        .await?;

        Ok(permissions)
    }

    #[instrument(skip(self), err)]
    pub async fn has_role(&mut self, user_id: UserId, role_name: &str) -> Result<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM rbac_user_role ur
                JOIN rbac_role r ON r.id = ur.role_id
                WHERE ur.user_id = $1 AND r.name = $2
            )
            "#,
        )
        .bind(user_id)
        .bind(role_name)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(exists)
    }

    #[instrument(skip(self), err)]
    pub async fn has_permission(&mut self, user_id: UserId, permission_name: &str) -> Result<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM rbac_user_role ur
                JOIN rbac_role_permission rp ON rp.role_id = ur.role_id
                JOIN rbac_permission p ON p.id = rp.permission_id
                WHERE ur.user_id = $1 AND p.name = $2
            )
            "#,
        )
        .bind(user_id)
        .bind(permission_name)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(exists)
    }

    #[instrument(skip(self), err)]
    pub async fn can_access(&mut self, user_id: UserId, method: &str, route: &str) -> Result<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM rbac_user_role ur
                JOIN rbac_role_permission rp ON rp.role_id = ur.role_id
                JOIN rbac_permission p ON p.id = rp.permission_id
                WHERE ur.user_id = $1 AND p.method = $2 AND p.route = $3
            )
            "#,
        )
        .bind(user_id)
        .bind(method)
        .bind(route)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(exists)
    }
}
