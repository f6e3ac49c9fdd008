//! In-memory identity store.
//!
//! Keeps every table in process memory behind a single lock. It enforces the same uniqueness and
//! reference rules as the PostgreSQL schema, reporting violations with the schema's index names,
//! so code exercised against it behaves the same against [`super::PgIdentityStore`]. Data is lost
//! on restart.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::RwLock;

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

#[derive(Default)]
struct Tables {
    users: BTreeMap<UserId, User>,
    roles: BTreeMap<RoleId, Role>,
    permissions: BTreeMap<PermissionId, Permission>,
    user_roles: BTreeSet<(UserId, RoleId)>,
    role_permissions: BTreeSet<(RoleId, PermissionId)>,
    last_user_id: UserId,
    last_role_id: RoleId,
    last_permission_id: PermissionId,
}

fn unique_violation(table: &str, constraint: &str) -> DbError {
    DbError::UniqueViolation {
        constraint: Some(constraint.to_string()),
        table: Some(table.to_string()),
        message: format!("duplicate key value violates unique constraint \"{constraint}\""),
    }
}

fn foreign_key_violation(table: &str, message: &str) -> DbError {
    DbError::ForeignKeyViolation {
        constraint: None,
        table: Some(table.to_string()),
        message: message.to_string(),
    }
}

fn page<T: Clone>(rows: impl Iterator<Item = T>, filter: &ListFilter) -> Vec<T> {
    rows.skip(filter.skip.max(0) as usize).take(filter.limit.max(0) as usize).collect()
}

impl Tables {
    fn check_user_unique(&self, id: Option<UserId>, email: &str, username: &str) -> Result<()> {
        for user in self.users.values().filter(|u| Some(u.id) != id) {
            if user.email == email {
                return Err(unique_violation("rbac_user", "rbac_user_email_idx"));
            }
            if user.username == username {
                return Err(unique_violation("rbac_user", "rbac_user_username_idx"));
            }
        }
        Ok(())
    }

    fn role_ids_for(&self, user_id: UserId) -> impl Iterator<Item = RoleId> + '_ {
        self.user_roles.iter().filter(move |(u, _)| *u == user_id).map(|(_, r)| *r)
    }

    fn permissions_for(&self, user_id: UserId) -> impl Iterator<Item = &Permission> + '_ {
        self.role_ids_for(user_id)
            .flat_map(move |role_id| {
                self.role_permissions
                    .iter()
                    .filter(move |(r, _)| *r == role_id)
                    .map(|(_, p)| *p)
            })
            .filter_map(move |permission_id| self.permissions.get(&permission_id))
    }
}

/// In-memory implementation of [`IdentityStore`].
#[derive(Clone, Default)]
pub struct InMemoryIdentityStore {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryIdentityStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a user row keeping its id. Later generated ids continue after the largest one seen.
    pub async fn insert_user(&self, user: User) -> Result<User> {
        let mut tables = self.tables.write().await;
        if tables.users.contains_key(&user.id) {
            return Err(unique_violation("rbac_user", "rbac_user_pkey"));
        }
        tables.check_user_unique(None, &user.email, &user.username)?;
        tables.last_user_id = tables.last_user_id.max(user.id);
        tables.users.insert(user.id, user.clone());
        Ok(user)
    }
}

#[async_trait::async_trait]
impl IdentityStore for InMemoryIdentityStore {
    async fn create_user(&self, request: &UserCreateDBRequest) -> Result<User> {
        let mut tables = self.tables.write().await;
        tables.check_user_unique(None, &request.email, &request.username)?;

        tables.last_user_id += 1;
        let now = Utc::now();
        let user = User {
            id: tables.last_user_id,
            email: request.email.clone(),
            username: request.username.clone(),
            password_hash: request.password_hash.clone(),
            active: true,
            created_at: now,
            updated_at: now,
        };
        tables.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn save_user(&self, user: &User) -> Result<User> {
        let mut tables = self.tables.write().await;
        if !tables.users.contains_key(&user.id) {
            return Err(DbError::NotFound);
        }
        tables.check_user_unique(Some(user.id), &user.email, &user.username)?;

        let mut saved = user.clone();
        saved.updated_at = Utc::now();
        tables.users.insert(saved.id, saved.clone());
        Ok(saved)
    }

    async fn delete_user(&self, id: UserId) -> Result<bool> {
        let mut tables = self.tables.write().await;
        let removed = tables.users.remove(&id).is_some();
        tables.user_roles.retain(|(user_id, _)| *user_id != id);
        Ok(removed)
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn find_user(&self, lookup: &[UserLookup]) -> Result<Option<User>> {
        if lookup.is_empty() {
            return Err(DbError::InvalidParams {
                message: "user lookup needs at least one field".to_string(),
            });
        }
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .values()
            .find(|user| lookup.iter().all(|field| field.matches(user)))
            .cloned())
    }

    async fn find_user_by_email_or_username(&self, identifier: &str) -> Result<Option<User>> {
        let tables = self.tables.read().await;
        let by_email = tables.users.values().find(|u| u.email == identifier);
        Ok(by_email
            .or_else(|| tables.users.values().find(|u| u.username == identifier))
            .cloned())
    }

    async fn list_users(&self, filter: &ListFilter) -> Result<Vec<User>> {
        Ok(page(self.tables.read().await.users.values().cloned(), filter))
    }

    async fn user_roles(&self, user_id: UserId) -> Result<Vec<Role>> {
        let tables = self.tables.read().await;
        Ok(tables
            .role_ids_for(user_id)
            .filter_map(|role_id| tables.roles.get(&role_id).cloned())
            .collect())
    }

    async fn create_role(&self, request: &RoleCreateDBRequest) -> Result<Role> {
        let mut tables = self.tables.write().await;
        if tables.roles.values().any(|r| r.name == request.name) {
            return Err(unique_violation("rbac_role", "rbac_role_name_idx"));
        }

        tables.last_role_id += 1;
        let now = Utc::now();
        let role = Role {
            id: tables.last_role_id,
            name: request.name.clone(),
            description: request.description.clone(),
            created_at: now,
            updated_at: now,
        };
        tables.roles.insert(role.id, role.clone());
        Ok(role)
    }

    async fn delete_role(&self, id: RoleId) -> Result<bool> {
        let mut tables = self.tables.write().await;
        let removed = tables.roles.remove(&id).is_some();
        tables.user_roles.retain(|(_, role_id)| *role_id != id);
        tables.role_permissions.retain(|(role_id, _)| *role_id != id);
        Ok(removed)
    }

    async fn get_role(&self, name: &str) -> Result<Option<Role>> {
        Ok(self.tables.read().await.roles.values().find(|r| r.name == name).cloned())
    }

    async fn list_roles(&self, filter: &ListFilter) -> Result<Vec<Role>> {
        Ok(page(self.tables.read().await.roles.values().cloned(), filter))
    }

    async fn assign_role(&self, role_id: RoleId, user_id: UserId) -> Result<()> {
        let mut tables = self.tables.write().await;
        if !tables.users.contains_key(&user_id) || !tables.roles.contains_key(&role_id) {
            return Err(foreign_key_violation("rbac_user_role", "user or role does not exist"));
        }
        if !tables.user_roles.insert((user_id, role_id)) {
            return Err(unique_violation("rbac_user_role", "rbac_user_role_role_user_idx"));
        }
        Ok(())
    }

    async fn revoke_role(&self, role_id: RoleId, user_id: UserId) -> Result<bool> {
        Ok(self.tables.write().await.user_roles.remove(&(user_id, role_id)))
    }

    async fn add_permission(&self, role_id: RoleId, permission_id: PermissionId) -> Result<()> {
        let mut tables = self.tables.write().await;
        if !tables.roles.contains_key(&role_id) || !tables.permissions.contains_key(&permission_id) {
            return Err(foreign_key_violation("rbac_role_permission", "role or permission does not exist"));
        }
        if !tables.role_permissions.insert((role_id, permission_id)) {
            return Err(unique_violation("rbac_role_permission", "rbac_role_permission_role_permission_idx"));
        }
        Ok(())
    }

    async fn remove_permission(&self, role_id: RoleId, permission_id: PermissionId) -> Result<bool> {
        Ok(self.tables.write().await.role_permissions.remove(&(role_id, permission_id)))
    }

    async fn role_permissions(&self, role_id: RoleId) -> Result<Vec<Permission>> {
        let tables = self.tables.read().await;
        Ok(tables
            .role_permissions
            .iter()
            .filter(|(r, _)| *r == role_id)
            .filter_map(|(_, p)| tables.permissions.get(p).cloned())
            .collect())
    }

    async fn create_permission(&self, request: &PermissionCreateDBRequest) -> Result<Permission> {
        let mut tables = self.tables.write().await;
        if tables.permissions.values().any(|p| p.name == request.name) {
            return Err(unique_violation("rbac_permission", "rbac_permission_name_idx"));
        }

        tables.last_permission_id += 1;
        let now = Utc::now();
        let permission = Permission {
            id: tables.last_permission_id,
            name: request.name.clone(),
            method: request.method.clone(),
            route: request.route.clone(),
            description: request.description.clone(),
            created_at: now,
            updated_at: now,
        };
        tables.permissions.insert(permission.id, permission.clone());
        Ok(permission)
    }

    async fn delete_permission(&self, id: PermissionId) -> Result<bool> {
        let mut tables = self.tables.write().await;
        let removed = tables.permissions.remove(&id).is_some();
        tables.role_permissions.retain(|(_, permission_id)| *permission_id != id);
        Ok(removed)
    }

    async fn get_permission(&self, name: &str) -> Result<Option<Permission>> {
        Ok(self.tables.read().await.permissions.values().find(|p| p.name == name).cloned())
    }

    async fn list_permissions(&self, filter: &ListFilter) -> Result<Vec<Permission>> {
        Ok(page(self.tables.read().await.permissions.values().cloned(), filter))
    }

    async fn has_role(&self, user_id: UserId, role_name: &str) -> Result<bool> {
        let tables = self.tables.read().await;
        Ok(tables
            .role_ids_for(user_id)
            .any(|role_id| tables.roles.get(&role_id).is_some_and(|r| r.name == role_name)))
    }

    async fn has_permission(&self, user_id: UserId, permission_name: &str) -> Result<bool> {
        let tables = self.tables.read().await;
        Ok(tables.permissions_for(user_id).any(|p| p.name == permission_name))
    }

    async fn can_access(&self, user_id: UserId, method: &str, route: &str) -> Result<bool> {
        let tables = self.tables.read().await;
        Ok(tables.permissions_for(user_id).any(|p| p.method == method && p.route == route))
    }
}
