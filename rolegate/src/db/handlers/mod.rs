//! Repository implementations for database access.
//!
//! Each repository wraps a `&mut PgConnection`, so it works equally on a pooled connection or
//! inside a transaction:
//!
//! ```ignore
//! use rolegate::db::handlers::{Grants, Repository, Roles, Users};
//!
//! async fn example(pool: &sqlx::PgPool) -> Result<(), Box<dyn std::error::Error>> {
//!     let mut tx = pool.begin().await?;
//!
//!     let role = Roles::new(&mut tx).get_by_name("admin").await?.ok_or("missing role")?;
//!     if let Some(user) = Users::new(&mut tx).get_user_by_email_or_username("alice").await? {
//!         Grants::new(&mut tx).assign_role(role.id, user.id).await?;
//!     }
//!
//!     tx.commit().await?;
//!     Ok(())
//! }
//! ```
//!
//! - [`Users`]: user rows and ordered-field lookups
//! - [`Roles`]: role rows
//! - [`Permissions`]: permission rows
//! - [`Grants`]: user→role and role→permission relations plus the access checks over them

pub mod grants;
pub mod permissions;
pub mod repository;
pub mod roles;
pub mod users;

pub use grants::Grants;
pub use permissions::Permissions;
pub use repository::{ListFilter, Repository};
pub use roles::Roles;
pub use users::Users;
