//! API request and response data models.
//!
//! API models are distinct from the database rows in [`crate::db::models`], so the stored shape
//! (notably password hashes) never reaches the wire by accident.

pub mod admin;
pub mod auth;
pub mod pagination;
pub mod users;
