//! Database repository for permissions.

use crate::{
    db::{
        errors::Result,
        handlers::repository::{ListFilter, Repository},
        models::permissions::{Permission, PermissionCreateDBRequest},
    },
    types::PermissionId,
};
use sqlx::PgConnection;
use tracing::instrument;

pub struct Permissions<'c> {
    db: &'c mut PgConnection,
}

#[async_trait::async_trait]
impl<'c> Repository for Permissions<'c> {
    type CreateRequest = PermissionCreateDBRequest;
    type Response = Permission;
    type Id = PermissionId;

    #[instrument(skip(self, request), fields(name = %request.name, method = %request.method, route = %request.route), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let permission = sqlx::query_as::<_, Permission>(
            r#"
            INSERT INTO rbac_permission (name, method, route, description)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(&request.name)
        .bind(&request.method)
        .bind(&request.route)
        .bind(&request.description)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(permission)
    }

    #[instrument(skip(self), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let permission = sqlx::query_as::<_, Permission>("SELECT * FROM rbac_permission WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(permission)
    }

    #[instrument(skip(self), err)]
    async fn list(&mut self, filter: &ListFilter) -> Result<Vec<Self::Response>> {
        let permissions = sqlx::query_as::<_, Permission>("SELECT * FROM rbac_permission ORDER BY id LIMIT $1 OFFSET $2")
            .bind(filter.limit)
            .bind(filter.skip)
            .fetch_all(&mut *self.db)
            .await?;

        Ok(permissions)
    }

    #[instrument(skip(self), err)]
    async fn delete(&mut self, id: Self::Id) -> Result<bool> {
        let result = sqlx::query("DELETE FROM rbac_permission WHERE id = $1")
            .bind(id)
            .execute(&mut *self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

impl<'c> Permissions<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    #[instrument(skip(self), err)]
    pub async fn get_by_name(&mut self, name: &str) -> Result<Option<Permission>> {
        let permission = sqlx::query_as::<_, Permission>("SELECT * FROM rbac_permission WHERE name = $1")
            .bind(name)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(permission)
    }
}
