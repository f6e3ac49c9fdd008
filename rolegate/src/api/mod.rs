//! HTTP surface of the `rolegate` server.
//!
//! - **[`handlers`]**: Axum route handlers
//! - **[`models`]**: Request/response data structures for API communication
//!
//! # API Structure
//!
//! - **Authentication** (`/authentication/*`): registration, login, cookie sessions, logout
//! - **Users** (`/users/current*`): the authenticated user
//! - **Admin** (`/admin/*`): roles, permissions, grants and access checks, behind bearer + RBAC
//! - **Health** (`/healthz`)

pub mod handlers;
pub mod models;
