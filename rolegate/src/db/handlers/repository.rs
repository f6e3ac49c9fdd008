//! Base repository trait for database operations.

/// Contains the Repository trait.
///
/// A repository is a data access layer for one RBAC table. It provides methods for creating,
/// reading, listing and deleting rows. Relations between tables live in [`super::Grants`].
use crate::db::errors::Result;

/// Offset pagination for list operations
#[derive(Debug, Clone, Copy)]
pub struct ListFilter {
    pub skip: i64,
    pub limit: i64,
}

impl ListFilter {
    pub fn new(skip: i64, limit: i64) -> Self {
        Self { skip, limit }
    }
}

impl Default for ListFilter {
    fn default() -> Self {
        Self { skip: 0, limit: 100 }
    }
}

/// Base repository trait providing common database operations
#[async_trait::async_trait]
pub trait Repository {
    /// The request type for creating entities
    type CreateRequest;

    /// The response type returned by operations
    type Response;

    /// The identifier type for lookups
    type Id: Send + Sync;

    /// Create a new entity
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response>;

    /// Get an entity by ID
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>>;

    /// List entities ordered by ID
    async fn list(&mut self, filter: &ListFilter) -> Result<Vec<Self::Response>>;

    /// Delete an entity by ID, returning whether a row was removed
    async fn delete(&mut self, id: Self::Id) -> Result<bool>;
}
