//! Authentication and authorization.
//!
//! The engine is built from injected parts, all composed by [`manager::AuthManager`]:
//!
//! - [`password`]: the secret hasher (Argon2id in production, a plaintext fake for tests)
//! - [`token`]: the session token generator
//! - [`authenticator`]: checks an identifier and secret against the identity store
//! - [`session`]: issues, verifies and revokes tokens over a TTL cache
//! - [`access`]: role, permission and route checks over the RBAC relations
//! - [`middleware`]: request guards that bind a [`principal::Principal`] to the request
//!
//! # Authentication
//!
//! Clients log in with an identifier and password. Depending on the configured
//! [`crate::types::LoginMethod`] the identifier is matched against the email, the username, or
//! both (email first). A successful login issues an opaque session token, delivered either as a
//! cookie or in the response body for use as `Authorization: Bearer <token>`.
//!
//! Login failures are distinct internally (unknown user, wrong secret, deactivated user) and
//! identical at the HTTP edge.
//!
//! # Authorization
//!
//! Users hold roles, roles hold permissions, and a permission names a `(method, route)` pair.
//! Route checks are exact string matches. A user with no roles is denied everything.

pub mod access;
pub mod authenticator;
pub mod manager;
pub mod middleware;
pub mod password;
pub mod principal;
pub mod session;
pub mod token;
pub mod utils;
