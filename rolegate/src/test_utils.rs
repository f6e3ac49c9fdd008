//! Test utilities: failing collaborators and a ready-to-use in-memory engine.

use std::sync::Arc;

use anyhow::anyhow;

use crate::{
    AppState,
    auth::{
        manager::{AuthManager, NewUser},
        password::{CredentialHasher, PlaintextHasher},
        session::{CacheError, MokaSessionCache, SessionCache},
        token::SequentialTokenGenerator,
    },
    config::Config,
    db::{
        errors::{DbError, Result},
        handlers::ListFilter,
        models::{
            permissions::{Permission, PermissionCreateDBRequest},
            roles::{Role, RoleCreateDBRequest},
            users::{User, UserCreateDBRequest, UserLookup},
        },
    },
    store::{IdentityStore, InMemoryIdentityStore},
    types::{PermissionId, RoleId, UserId},
};

#[derive(Debug, Clone, Copy)]
enum Fault {
    Fail,
    Stall,
}

/// Identity store whose every call either errors or never completes
pub struct FaultyStore {
    fault: Fault,
}

impl FaultyStore {
    pub fn failing() -> Self {
        Self { fault: Fault::Fail }
    }

    pub fn stalled() -> Self {
        Self { fault: Fault::Stall }
    }

    async fn trip<T>(&self) -> Result<T> {
        match self.fault {
            Fault::Fail => Err(DbError::Other(anyhow!("store unavailable"))),
            Fault::Stall => std::future::pending().await,
        }
    }
}

#[async_trait::async_trait]
impl IdentityStore for FaultyStore {
    async fn create_user(&self, _request: &UserCreateDBRequest) -> Result<User> {
        self.trip().await
    }

    async fn save_user(&self, _user: &User) -> Result<User> {
        self.trip().await
    }

    async fn delete_user(&self, _id: UserId) -> Result<bool> {
        self.trip().await
    }

    async fn get_user(&self, _id: UserId) -> Result<Option<User>> {
        self.trip().await
    }

    async fn find_user(&self, _lookup: &[UserLookup]) -> Result<Option<User>> {
        self.trip().await
    }

    async fn find_user_by_email_or_username(&self, _identifier: &str) -> Result<Option<User>> {
        self.trip().await
    }

    async fn list_users(&self, _filter: &ListFilter) -> Result<Vec<User>> {
        self.trip().await
    }

    async fn user_roles(&self, _user_id: UserId) -> Result<Vec<Role>> {
        self.trip().await
    }

    async fn create_role(&self, _request: &RoleCreateDBRequest) -> Result<Role> {
        self.trip().await
    }

    async fn delete_role(&self, _id: RoleId) -> Result<bool> {
        self.trip().await
    }

    async fn get_role(&self, _name: &str) -> Result<Option<Role>> {
        self.trip().await
    }

    async fn list_roles(&self, _filter: &ListFilter) -> Result<Vec<Role>> {
        self.trip().await
    }

    async fn assign_role(&self, _role_id: RoleId, _user_id: UserId) -> Result<()> {
        self.trip().await
    }

    async fn revoke_role(&self, _role_id: RoleId, _user_id: UserId) -> Result<bool> {
        self.trip().await
    }

    async fn add_permission(&self, _role_id: RoleId, _permission_id: PermissionId) -> Result<()> {
        self.trip().await
    }

    async fn remove_permission(&self, _role_id: RoleId, _permission_id: PermissionId) -> Result<bool> {
        self.trip().await
    }

    async fn role_permissions(&self, _role_id: RoleId) -> Result<Vec<Permission>> {
        self.trip().await
    }

    async fn create_permission(&self, _request: &PermissionCreateDBRequest) -> Result<Permission> {
        self.trip().await
    }

    async fn delete_permission(&self, _id: PermissionId) -> Result<bool> {
        self.trip().await
    }

    async fn get_permission(&self, _name: &str) -> Result<Option<Permission>> {
        self.trip().await
    }

    async fn list_permissions(&self, _filter: &ListFilter) -> Result<Vec<Permission>> {
        self.trip().await
    }

    async fn has_role(&self, _user_id: UserId, _role_name: &str) -> Result<bool> {
        self.trip().await
    }

    async fn has_permission(&self, _user_id: UserId, _permission_name: &str) -> Result<bool> {
        self.trip().await
    }

    async fn can_access(&self, _user_id: UserId, _method: &str, _route: &str) -> Result<bool> {
        self.trip().await
    }
}

/// Session cache whose every call either errors or never completes
pub struct FaultyCache {
    fault: Fault,
}

impl FaultyCache {
    pub fn failing() -> Self {
        Self { fault: Fault::Fail }
    }

    pub fn stalled() -> Self {
        Self { fault: Fault::Stall }
    }

    async fn trip<T>(&self) -> std::result::Result<T, CacheError> {
        match self.fault {
            Fault::Fail => Err(CacheError::Unavailable("connection refused".to_string())),
            Fault::Stall => std::future::pending().await,
        }
    }
}

#[async_trait::async_trait]
impl SessionCache for FaultyCache {
    async fn set_ex(&self, _key: &str, _value: &str, _ttl: std::time::Duration) -> std::result::Result<(), CacheError> {
        self.trip().await
    }

    async fn get(&self, _key: &str) -> std::result::Result<Option<String>, CacheError> {
        self.trip().await
    }

    async fn del(&self, _key: &str) -> std::result::Result<(), CacheError> {
        self.trip().await
    }
}

/// Insert an active user with a fixed id and a plaintext-hashed password
pub async fn seed_user(store: &InMemoryIdentityStore, id: UserId, email: &str, username: &str, password: &str) -> User {
    let now = chrono::Utc::now();
    store
        .insert_user(User {
            id,
            email: email.to_string(),
            username: username.to_string(),
            password_hash: Some(PlaintextHasher.hash(password).expect("plaintext hashing is infallible")),
            active: true,
            created_at: now,
            updated_at: now,
        })
        .await
        .expect("Failed to seed user")
}

/// In-memory store, moka cache, plaintext hasher and `session-N` tokens
pub struct TestHarness {
    pub store: Arc<InMemoryIdentityStore>,
    pub auth: AuthManager,
}

impl TestHarness {
    pub fn new() -> Self {
        let store = Arc::new(InMemoryIdentityStore::new());
        let auth = AuthManager::builder()
            .store(store.clone())
            .cache(Arc::new(MokaSessionCache::new(1_000)))
            .hasher(Arc::new(PlaintextHasher))
            .tokens(Arc::new(SequentialTokenGenerator::new("session")))
            .session(create_test_config().auth.session)
            .build();
        Self { store, auth }
    }

    pub async fn register(&self, email: &str, username: &str, password: &str) -> User {
        self.auth
            .register(&NewUser {
                email: email.to_string(),
                username: username.to_string(),
                password: password.to_string(),
            })
            .await
            .expect("Failed to register test user")
    }

    /// Register, then grant a role that holds exactly the given (name, method, route) permissions
    pub async fn register_with_permissions(&self, email: &str, username: &str, role: &str, permissions: &[(&str, &str, &str)]) -> User {
        let user = self.register(email, username, "s3cret").await;
        let role = self
            .store
            .create_role(&RoleCreateDBRequest {
                name: role.to_string(),
                description: None,
            })
            .await
            .expect("Failed to create test role");
        for (name, method, route) in permissions {
            let permission = self
                .store
                .create_permission(&PermissionCreateDBRequest {
                    name: name.to_string(),
                    method: method.to_string(),
                    route: route.to_string(),
                    description: None,
                })
                .await
                .expect("Failed to create test permission");
            self.store
                .add_permission(role.id, permission.id)
                .await
                .expect("Failed to grant test permission");
        }
        self.store.assign_role(role.id, user.id).await.expect("Failed to assign test role");
        user
    }

    pub fn app_state(&self) -> AppState {
        AppState::builder().auth(self.auth.clone()).config(create_test_config()).build()
    }
}

pub fn create_test_config() -> Config {
    let mut config = Config::default();
    config.auth.session.cookie_secure = false;
    config.auth.password.min_length = 4;
    config
}
