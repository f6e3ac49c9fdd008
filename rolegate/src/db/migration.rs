//! Schema bootstrap.
//!
//! [`Migration::initialize`] runs the embedded migrations and then checks that every index the
//! access checks rely on is present, so a hand-edited schema fails at startup rather than at the
//! first slow or duplicated lookup.

use sqlx::PgPool;
use thiserror::Error;
use tracing::{info, instrument};

use crate::db::errors::DbError;

/// Indexes the engine requires on the RBAC tables
pub const REQUIRED_INDEXES: [&str; 7] = [
    "rbac_user_email_idx",
    "rbac_user_username_idx",
    "rbac_permission_route_method_idx",
    "rbac_permission_name_idx",
    "rbac_role_name_idx",
    "rbac_user_role_role_user_idx",
    "rbac_role_permission_role_permission_idx",
];

#[derive(Error, Debug)]
pub enum MigrationError {
    #[error("failed to apply migrations: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error(transparent)]
    Database(#[from] DbError),

    #[error("schema is missing required indexes: {}", indexes.join(", "))]
    MissingIndexes { indexes: Vec<String> },
}

pub struct Migration<'a> {
    pool: &'a PgPool,
}

impl<'a> Migration<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Apply pending migrations and validate the resulting schema
    #[instrument(skip(self), err)]
    pub async fn initialize(&self) -> Result<(), MigrationError> {
        crate::migrator().run(self.pool).await?;
        self.validate().await?;
        info!("RBAC schema ready");
        Ok(())
    }

    /// Check that every required index exists in the current schema
    #[instrument(skip(self), err)]
    pub async fn validate(&self) -> Result<(), MigrationError> {
        let found = sqlx::query_scalar::<_, String>(
            "SELECT indexname::TEXT FROM pg_indexes WHERE schemaname = current_schema() AND indexname = ANY($1)",
        )
        .bind(&REQUIRED_INDEXES[..])
        .fetch_all(self.pool)
        .await
        .map_err(DbError::from)?;

        let indexes = missing_indexes(&found);
        if indexes.is_empty() {
            Ok(())
        } else {
            Err(MigrationError::MissingIndexes { indexes })
        }
    }
}

/// Required index names absent from `found`, in declaration order
pub fn missing_indexes(found: &[String]) -> Vec<String> {
    REQUIRED_INDEXES
        .iter()
        .filter(|required| !found.iter().any(|name| name == *required))
        .map(|name| name.to_string())
        .collect()
}
