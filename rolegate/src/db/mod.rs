//! PostgreSQL persistence for the RBAC model.
//!
//! This module implements the relational side of the identity store using SQLx. It follows the
//! repository pattern: one repository per table plus [`handlers::Grants`] for the join tables.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐
//! │  IdentityStore   │  (crate::store - engine-facing trait)
//! └────────┬─────────┘
//!          │
//!          ↓
//! ┌──────────────────┐
//! │   Repositories   │  (db::handlers - queries)
//! └────────┬─────────┘
//!          │
//!          ↓
//! ┌──────────────────┐
//! │      Models      │  (db::models - table rows)
//! └────────┬─────────┘
//!          │
//!          ↓
//! ┌──────────────────┐
//! │    PostgreSQL    │
//! └──────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`handlers`]: Repository implementations
//! - [`models`]: Row structures matching table schemas
//! - [`errors`]: Store error type
//! - [`migration`]: Schema bootstrap and index validation
//!
//! # Transactions
//!
//! Repositories borrow a `&mut PgConnection`, so several writes can be grouped by creating the
//! repositories from one transaction:
//!
//! ```ignore
//! let mut tx = pool.begin().await?;
//! let role = Roles::new(&mut tx).create(&request).await?;
//! Grants::new(&mut tx).assign_role(role.id, user_id).await?;
//! tx.commit().await?;
//! ```

pub mod errors;
pub mod handlers;
pub mod migration;
pub mod models;
