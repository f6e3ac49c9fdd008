//! Database record models matching table schemas.
//!
//! These structs correspond to rows of the RBAC tables and are shared by the Postgres and
//! in-memory identity stores.
//!
//! - [`users`]: `rbac_user` rows and lookup fields
//! - [`roles`]: `rbac_role` rows
//! - [`permissions`]: `rbac_permission` rows

pub mod permissions;
pub mod roles;
pub mod users;
