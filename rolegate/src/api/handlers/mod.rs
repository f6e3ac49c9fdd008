//! HTTP request handlers.
//!
//! Handlers assume the guards in [`crate::build_router`] already ran: anything taking a
//! [`crate::auth::principal::Principal`] sits behind a session guard, and every `admin` handler
//! behind the RBAC guard as well.
//!
//! - [`admin`]: roles, permissions, grants and access checks
//! - [`auth`]: registration, login, cookie sessions and logout
//! - [`users`]: the current user

pub mod admin;
pub mod auth;
pub mod users;
