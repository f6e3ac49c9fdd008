//! Database repository for users.

use crate::{
    db::{
        errors::{DbError, Result},
        handlers::repository::{ListFilter, Repository},
        models::users::{User, UserCreateDBRequest, UserLookup},
    },
    types::UserId,
};
use sqlx::{PgConnection, Postgres, QueryBuilder};
use tracing::instrument;

pub struct Users<'c> {
    db: &'c mut PgConnection,
}

/// Build `SELECT * FROM rbac_user WHERE <col> = $n AND ... LIMIT 1` with columns in the order
/// given. An empty lookup has no sensible meaning and is rejected.
pub fn user_lookup_query(lookup: &[UserLookup]) -> Result<QueryBuilder<'static, Postgres>> {
    if lookup.is_empty() {
        return Err(DbError::InvalidParams {
            message: "user lookup needs at least one field".to_string(),
        });
    }

    let mut query = QueryBuilder::new("SELECT * FROM rbac_user WHERE ");
    for (i, field) in lookup.iter().enumerate() {
        if i > 0 {
            query.push(" AND ");
        }
        query.push(field.column()).push(" = ");
        match field {
            UserLookup::Id(id) => query.push_bind(*id),
            UserLookup::Email(email) => query.push_bind(email.clone()),
            UserLookup::Username(username) => query.push_bind(username.clone()),
            UserLookup::Active(active) => query.push_bind(*active),
        };
    }
    query.push(" LIMIT 1");
    Ok(query)
}

#[async_trait::async_trait]
impl<'c> Repository for Users<'c> {
    type CreateRequest = UserCreateDBRequest;
    type Response = User;
    type Id = UserId;

    #[instrument(skip(self, request), fields(username = %request.username), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO rbac_user (email, username, password_hash, active)
            VALUES ($1, $2, $3, TRUE)
            RETURNING *
            "#,
        )
        .bind(&request.email)
        .bind(&request.username)
        .bind(&request.password_hash)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(user)
    }

    #[instrument(skip(self), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM rbac_user WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(user)
    }

    #[instrument(skip(self), err)]
    async fn list(&mut self, filter: &ListFilter) -> Result<Vec<Self::Response>> {
        let users = sqlx::query_as::<_, User>("SELECT * FROM rbac_user ORDER BY id LIMIT $1 OFFSET $2")
            .bind(filter.limit)
            .bind(filter.skip)
            .fetch_all(&mut *self.db)
            .await?;

        Ok(users)
    }

    #[instrument(skip(self), err)]
    async fn delete(&mut self, id: Self::Id) -> Result<bool> {
        let result = sqlx::query("DELETE FROM rbac_user WHERE id = $1")
            .bind(id)
            .execute(&mut *self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

impl<'c> Users<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    /// Write every mutable column of an existing user back to the table
    #[instrument(skip(self, user), fields(user_id = user.id), err)]
    pub async fn save(&mut self, user: &User) -> Result<User> {
        let saved = sqlx::query_as::<_, User>(
            r#"
            UPDATE rbac_user
            SET email = $2, username = $3, password_hash = $4, active = $5, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(user.id)
        .bind(&user.email)
        .bind(&user.username)
        .bind(&user.password_hash)
        .bind(user.active)
        .fetch_optional(&mut *self.db)
        .await?;

        saved.ok_or(DbError::NotFound)
    }

    #[instrument(skip(self), err)]
    pub async fn find(&mut self, lookup: &[UserLookup]) -> Result<Option<User>> {
        let mut query = user_lookup_query(lookup)?;
        let user = query.build_query_as::<User>().fetch_optional(&mut *self.db).await?;
        Ok(user)
    }

    #[instrument(skip(self), err)]
    pub async fn get_user_by_email_or_username(&mut self, identifier: &str) -> Result<Option<User>> {
        // A row matching by email sorts ahead of one matching by username
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT * FROM rbac_user
            WHERE email = $1 OR username = $1
            ORDER BY CASE WHEN email = $1 THEN 0 ELSE 1 END, id
            LIMIT 1
            "#,
        )
        .bind(identifier)
        .fetch_optional(&mut *self.db)
        .await?;

        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::PgPool;

    async fn create_user(conn: &mut PgConnection, email: &str, username: &str) -> User {
        Users::new(conn)
            .create(&UserCreateDBRequest {
                email: email.to_string(),
                username: username.to_string(),
                password_hash: Some("hash".to_string()),
            })
            .await
            .expect("Failed to create test user")
    }

    #[test]
    fn test_lookup_query_follows_field_order() {
        let query = user_lookup_query(&[UserLookup::Email("a@x.com".to_string()), UserLookup::Active(true)]).unwrap();
        assert_eq!(query.sql(), "SELECT * FROM rbac_user WHERE email = $1 AND active = $2 LIMIT 1");

        let query = user_lookup_query(&[UserLookup::Active(true), UserLookup::Email("a@x.com".to_string())]).unwrap();
        assert_eq!(query.sql(), "SELECT * FROM rbac_user WHERE active = $1 AND email = $2 LIMIT 1");
    }

    #[test]
    fn test_lookup_query_is_stable() {
        let lookup = [UserLookup::Username("alice".to_string()), UserLookup::Id(7)];
        let first = user_lookup_query(&lookup).unwrap().sql().to_string();
        let second = user_lookup_query(&lookup).unwrap().sql().to_string();
        assert_eq!(first, second);
    }

    #[test]
    fn test_empty_lookup_rejected() {
        assert!(matches!(user_lookup_query(&[]), Err(DbError::InvalidParams { .. })));
    }

    #[sqlx::test(migrations = "./migrations")]
    #[test_log::test]
    async fn test_create_and_get_user(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let user = create_user(&mut conn, "alice@x.com", "alice").await;

        assert!(user.active);
        assert_eq!(user.password_hash.as_deref(), Some("hash"));

        let mut repo = Users::new(&mut conn);
        assert_eq!(repo.get_by_id(user.id).await.unwrap(), Some(user.clone()));
        assert_eq!(repo.get_by_id(user.id + 1000).await.unwrap(), None);

        assert!(repo.delete(user.id).await.unwrap());
        assert!(!repo.delete(user.id).await.unwrap());
    }

    #[sqlx::test(migrations = "./migrations")]
    #[test_log::test]
    async fn test_email_or_username_prefers_email(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        // Created first, so it would win an id-only ordering
        let by_username = create_user(&mut conn, "bob@x.com", "shared").await;
        let by_email = create_user(&mut conn, "shared", "carol").await;

        let mut repo = Users::new(&mut conn);
        let found = repo.get_user_by_email_or_username("shared").await.unwrap().unwrap();
        assert_eq!(found.id, by_email.id);

        let found = repo.get_user_by_email_or_username("bob@x.com").await.unwrap().unwrap();
        assert_eq!(found.id, by_username.id);
        let found = repo.get_user_by_email_or_username("carol").await.unwrap().unwrap();
        assert_eq!(found.id, by_email.id);

        assert!(repo.get_user_by_email_or_username("nobody").await.unwrap().is_none());
    }

    #[sqlx::test(migrations = "./migrations")]
    #[test_log::test]
    async fn test_find_matches_every_field(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let alice = create_user(&mut conn, "alice@x.com", "alice").await;

        let mut repo = Users::new(&mut conn);
        let found = repo
            .find(&[UserLookup::Email("alice@x.com".to_string()), UserLookup::Active(true)])
            .await
            .unwrap();
        assert_eq!(found.map(|u| u.id), Some(alice.id));

        let found = repo
            .find(&[UserLookup::Username("alice".to_string()), UserLookup::Id(alice.id + 1)])
            .await
            .unwrap();
        assert!(found.is_none());

        assert!(matches!(repo.find(&[]).await, Err(DbError::InvalidParams { .. })));
    }

    #[sqlx::test(migrations = "./migrations")]
    #[test_log::test]
    async fn test_save_updates_every_column(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let mut alice = create_user(&mut conn, "alice@x.com", "alice").await;

        alice.email = "alice@y.com".to_string();
        alice.username = "alice2".to_string();
        alice.password_hash = Some("rehashed".to_string());
        alice.active = false;

        let mut repo = Users::new(&mut conn);
        let saved = repo.save(&alice).await.unwrap();
        assert_eq!(saved.email, "alice@y.com");
        assert_eq!(saved.username, "alice2");
        assert_eq!(saved.password_hash.as_deref(), Some("rehashed"));
        assert!(!saved.active);
        assert!(saved.updated_at >= alice.updated_at);

        alice.id += 1000;
        assert!(matches!(repo.save(&alice).await, Err(DbError::NotFound)));
    }

    #[sqlx::test(migrations = "./migrations")]
    #[test_log::test]
    async fn test_unique_violations_name_the_index(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let alice = create_user(&mut conn, "alice@x.com", "alice").await;
        let mut bob = create_user(&mut conn, "bob@x.com", "bob").await;

        let mut repo = Users::new(&mut conn);
        let request = UserCreateDBRequest {
            email: "alice@x.com".to_string(),
            username: "someone".to_string(),
            password_hash: None,
        };
        match repo.create(&request).await {
            Err(DbError::UniqueViolation { constraint, .. }) => assert_eq!(constraint.as_deref(), Some("rbac_user_email_idx")),
            other => panic!("expected unique violation, got {other:?}"),
        }

        bob.username = alice.username.clone();
        match repo.save(&bob).await {
            Err(DbError::UniqueViolation { constraint, .. }) => assert_eq!(constraint.as_deref(), Some("rbac_user_username_idx")),
            other => panic!("expected unique violation, got {other:?}"),
        }
    }
}
