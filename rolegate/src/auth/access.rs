//! Role, permission and route checks for an authenticated user.
//!
//! All three checks are pure reads with existence semantics: holding a permission through two
//! roles is the same as holding it through one, and a user with no roles is denied everything
//! without an error. Route checks compare method and route byte-for-byte, so a grant for
//! `GET /a` covers neither `POST /a` nor `GET /a/`.

use std::sync::Arc;

use tracing::{debug, instrument};

use crate::{errors::Result, store::IdentityStore, types::UserId};

#[derive(Clone)]
pub struct AccessControl {
    store: Arc<dyn IdentityStore>,
}

impl AccessControl {
    pub fn new(store: Arc<dyn IdentityStore>) -> Self {
        Self { store }
    }

    #[instrument(skip(self), err)]
    pub async fn has_role(&self, user_id: UserId, role_name: &str) -> Result<bool> {
        let granted = self.store.has_role(user_id, role_name).await?;
        debug!(granted, "role check");
        Ok(granted)
    }

    #[instrument(skip(self), err)]
    pub async fn has_permission(&self, user_id: UserId, permission_name: &str) -> Result<bool> {
        let granted = self.store.has_permission(user_id, permission_name).await?;
        debug!(granted, "permission check");
        Ok(granted)
    }

    #[instrument(skip(self), err)]
    pub async fn can_access(&self, user_id: UserId, method: &str, route: &str) -> Result<bool> {
        let granted = self.store.can_access(user_id, method, route).await?;
        debug!(granted, "route check");
        Ok(granted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::{
        permissions::PermissionCreateDBRequest, roles::RoleCreateDBRequest, users::UserCreateDBRequest,
    };
    use crate::errors::Error;
    use crate::store::InMemoryIdentityStore;
    use crate::test_utils::{FaultyStore, seed_user};

    async fn role(store: &InMemoryIdentityStore, name: &str) -> i64 {
        store
            .create_role(&RoleCreateDBRequest {
                name: name.to_string(),
                description: None,
            })
            .await
            .unwrap()
            .id
    }

    async fn permission(store: &InMemoryIdentityStore, name: &str, method: &str, route: &str) -> i64 {
        store
            .create_permission(&PermissionCreateDBRequest {
                name: name.to_string(),
                method: method.to_string(),
                route: route.to_string(),
                description: None,
            })
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn test_grant_and_revoke_role() {
        let store = Arc::new(InMemoryIdentityStore::new());
        let access = AccessControl::new(store.clone());
        let user = store
            .create_user(&UserCreateDBRequest {
                email: "u@x.com".to_string(),
                username: "u".to_string(),
                password_hash: None,
            })
            .await
            .unwrap();
        let editor = role(&store, "editor").await;
        let publish = permission(&store, "publish", "POST", "/articles").await;

        assert!(!access.has_permission(user.id, "publish").await.unwrap());

        store.assign_role(editor, user.id).await.unwrap();
        store.add_permission(editor, publish).await.unwrap();
        assert!(access.has_role(user.id, "editor").await.unwrap());
        assert!(access.has_permission(user.id, "publish").await.unwrap());

        store.revoke_role(editor, user.id).await.unwrap();
        assert!(!access.has_role(user.id, "editor").await.unwrap());
        assert!(!access.has_permission(user.id, "publish").await.unwrap());
    }

    #[tokio::test]
    async fn test_scenario_admin_delete_user() {
        let store = Arc::new(InMemoryIdentityStore::new());
        let access = AccessControl::new(store.clone());
        seed_user(&store, 7, "seven@x.com", "seven", "pw").await;
        seed_user(&store, 8, "eight@x.com", "eight", "pw").await;

        let admin = role(&store, "admin").await;
        let delete_user = permission(&store, "delete-user", "DELETE", "/users").await;
        store.assign_role(admin, 7).await.unwrap();
        store.add_permission(admin, delete_user).await.unwrap();

        assert!(access.has_permission(7, "delete-user").await.unwrap());
        assert!(!access.has_permission(8, "delete-user").await.unwrap());
    }

    #[tokio::test]
    async fn test_user_without_roles_is_denied_everything() {
        let store = Arc::new(InMemoryIdentityStore::new());
        let access = AccessControl::new(store.clone());
        seed_user(&store, 1, "lonely@x.com", "lonely", "pw").await;
        let admin = role(&store, "admin").await;
        let everything = permission(&store, "everything", "GET", "/").await;
        store.add_permission(admin, everything).await.unwrap();

        for user_id in [1, 999] {
            assert!(!access.has_role(user_id, "admin").await.unwrap());
            assert!(!access.has_permission(user_id, "everything").await.unwrap());
            assert!(!access.can_access(user_id, "GET", "/").await.unwrap());
        }
    }

    #[tokio::test]
    async fn test_can_access_is_exact() {
        let store = Arc::new(InMemoryIdentityStore::new());
        let access = AccessControl::new(store.clone());
        seed_user(&store, 1, "u@x.com", "u", "pw").await;
        let reader = role(&store, "reader").await;
        let read_a = permission(&store, "read-a", "GET", "/a").await;
        store.assign_role(reader, 1).await.unwrap();
        store.add_permission(reader, read_a).await.unwrap();

        assert!(access.can_access(1, "GET", "/a").await.unwrap());
        assert!(!access.can_access(1, "POST", "/a").await.unwrap());
        assert!(!access.can_access(1, "GET", "/a/").await.unwrap());
        assert!(!access.can_access(1, "get", "/a").await.unwrap());
        assert!(!access.can_access(1, "GET", "/A").await.unwrap());
        assert!(!access.can_access(1, "GET", "/a/b").await.unwrap());
    }

    #[tokio::test]
    async fn test_duplicate_grants_through_two_roles() {
        let store = Arc::new(InMemoryIdentityStore::new());
        let access = AccessControl::new(store.clone());
        seed_user(&store, 1, "u@x.com", "u", "pw").await;
        let first = role(&store, "first").await;
        let second = role(&store, "second").await;
        let shared = permission(&store, "shared", "GET", "/shared").await;
        for role_id in [first, second] {
            store.assign_role(role_id, 1).await.unwrap();
            store.add_permission(role_id, shared).await.unwrap();
        }

        assert!(access.has_permission(1, "shared").await.unwrap());
        store.revoke_role(first, 1).await.unwrap();
        assert!(access.has_permission(1, "shared").await.unwrap());
        store.revoke_role(second, 1).await.unwrap();
        assert!(!access.has_permission(1, "shared").await.unwrap());
    }

    #[tokio::test]
    async fn test_store_errors_are_not_denials() {
        let access = AccessControl::new(Arc::new(FaultyStore::failing()));
        assert!(matches!(access.can_access(1, "GET", "/a").await, Err(Error::Database(_))));
        assert!(matches!(access.has_role(1, "admin").await, Err(Error::Database(_))));
    }
}
