//! Identity store: the engine's view of users, roles, permissions and their relations.
//!
//! The engine only talks to [`IdentityStore`]. Two implementations ship with the crate:
//!
//! - [`PgIdentityStore`]: PostgreSQL through the [`crate::db`] repositories
//! - [`InMemoryIdentityStore`]: a single-process store for tests and embedding without a database
//!
//! [`TimeoutStore`] wraps either one and bounds every call with a deadline.
//!
//! "No row" is `Ok(None)` / `Ok(false)`; `Err` always means the store itself failed or rejected
//! the write. Deleting a user, role or permission removes its relation rows.

pub mod in_memory;
pub mod postgres;
pub mod timeout;

pub use in_memory::InMemoryIdentityStore;
pub use postgres::PgIdentityStore;
pub use timeout::TimeoutStore;

use crate::{
    db::{
        errors::Result,
        handlers::ListFilter,
        models::{
            permissions::{Permission, PermissionCreateDBRequest},
            roles::{Role, RoleCreateDBRequest},
            users::{User, UserCreateDBRequest, UserLookup},
        },
    },
    types::{PermissionId, RoleId, UserId},
};

#[async_trait::async_trait]
pub trait IdentityStore: Send + Sync {
    /// Insert a new, active user. The store assigns the id.
    async fn create_user(&self, request: &UserCreateDBRequest) -> Result<User>;

    /// Persist email, username, hash and active flag of an existing user
    async fn save_user(&self, user: &User) -> Result<User>;

    async fn delete_user(&self, id: UserId) -> Result<bool>;

    async fn get_user(&self, id: UserId) -> Result<Option<User>>;

    /// First user matching every field, checked in the given order
    async fn find_user(&self, lookup: &[UserLookup]) -> Result<Option<User>>;

    /// User whose email or username equals `identifier`, preferring the email match
    async fn find_user_by_email_or_username(&self, identifier: &str) -> Result<Option<User>>;

    async fn list_users(&self, filter: &ListFilter) -> Result<Vec<User>>;

    async fn user_roles(&self, user_id: UserId) -> Result<Vec<Role>>;

    async fn create_role(&self, request: &RoleCreateDBRequest) -> Result<Role>;

    async fn delete_role(&self, id: RoleId) -> Result<bool>;

    async fn get_role(&self, name: &str) -> Result<Option<Role>>;

    async fn list_roles(&self, filter: &ListFilter) -> Result<Vec<Role>>;

    async fn assign_role(&self, role_id: RoleId, user_id: UserId) -> Result<()>;

    /// Returns whether the user held the role
    async fn revoke_role(&self, role_id: RoleId, user_id: UserId) -> Result<bool>;

    async fn add_permission(&self, role_id: RoleId, permission_id: PermissionId) -> Result<()>;

    /// Returns whether the role held the permission
    async fn remove_permission(&self, role_id: RoleId, permission_id: PermissionId) -> Result<bool>;

    async fn role_permissions(&self, role_id: RoleId) -> Result<Vec<Permission>>;

    async fn create_permission(&self, request: &PermissionCreateDBRequest) -> Result<Permission>;

    async fn delete_permission(&self, id: PermissionId) -> Result<bool>;

    async fn get_permission(&self, name: &str) -> Result<Option<Permission>>;

    async fn list_permissions(&self, filter: &ListFilter) -> Result<Vec<Permission>>;

    async fn has_role(&self, user_id: UserId, role_name: &str) -> Result<bool>;

    async fn has_permission(&self, user_id: UserId, permission_name: &str) -> Result<bool>;

    /// Exact, case-sensitive match on both method and route
    async fn can_access(&self, user_id: UserId, method: &str, route: &str) -> Result<bool>;
}
