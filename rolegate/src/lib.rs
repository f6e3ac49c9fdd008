//! # rolegate: authentication and role-based access control for axum services
//!
//! `rolegate` verifies user credentials, issues opaque session tokens backed by a TTL cache, and
//! guards routes with cookie-session, bearer-token and RBAC middleware. It can be embedded in an
//! existing axum application or run as a standalone server.
//!
//! ## Overview
//!
//! The engine is assembled from injected parts. An [`store::IdentityStore`] holds users, roles,
//! permissions and the relations between them (PostgreSQL in production, in-memory for tests and
//! single-process embedding). A [`auth::session::SessionCache`] maps tokens to user ids and owns
//! their expiry. A [`auth::password::CredentialHasher`] and a [`auth::token::TokenGenerator`]
//! supply the two pluggable strategies. [`auth::manager::AuthManager`] composes them and is the
//! only handle application code needs.
//!
//! ### Request Flow
//!
//! A client logs in with an identifier and password and receives a token, either in the response
//! body or as a cookie. On later requests a guard extracts the token, asks the cache which user it
//! belongs to, loads that user and binds a [`auth::principal::Principal`] to the request. An RBAC
//! guard can then check the principal's permissions against the exact method and path of the
//! request. Any denial short-circuits with an empty 401 or 403 before the handler runs.
//!
//! ## Embedding
//!
//! ```no_run
//! use std::sync::Arc;
//! use axum::{Router, routing::get};
//! use rolegate::auth::{manager::AuthManager, middleware::{Guard, protect}, principal::Principal, session::MokaSessionCache};
//! use rolegate::store::InMemoryIdentityStore;
//!
//! # async fn example() {
//! let auth = AuthManager::builder()
//!     .store(Arc::new(InMemoryIdentityStore::new()))
//!     .cache(Arc::new(MokaSessionCache::new(10_000)))
//!     .build();
//!
//! let reports = Router::new().route("/reports", get(|principal: Principal| async move { principal.email }));
//! let app: Router = protect(reports, &auth, &[Guard::BearerToken, Guard::Rbac]);
//! # }
//! ```
//!
//! ## Standalone server
//!
//! ```no_run
//! use clap::Parser;
//! use rolegate::{Application, Config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let args = rolegate::config::Args::parse();
//!     let config = Config::load(&args)?;
//!     rolegate::telemetry::init_telemetry()?;
//!
//!     let app = Application::new(config).await?;
//!     app.serve(async {
//!         tokio::signal::ctrl_c().await.expect("Failed to listen for Ctrl+C");
//!     })
//!     .await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Configuration
//!
//! See the [`config`] module for configuration options.

pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod errors;
pub mod store;
pub mod telemetry;
pub mod types;

#[cfg(test)]
mod test_utils;

use std::{sync::Arc, time::Duration};

use axum::{
    Router,
    routing::{delete, get, post},
};
use bon::Builder;
use sqlx::{PgPool, postgres::PgPoolOptions};
use tokio::net::TcpListener;
use tower_http::trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::{Level, debug, info, instrument};

pub use config::Config;

use crate::{
    api::handlers::admin::ADMIN_ROUTES,
    auth::{
        manager::AuthManager,
        middleware::{Guard, protect},
        password::Argon2Hasher,
        session::MokaSessionCache,
    },
    config::DatabaseConfig,
    db::{
        errors::DbError,
        migration::Migration,
        models::{
            permissions::PermissionCreateDBRequest,
            roles::RoleCreateDBRequest,
            users::{UserCreateDBRequest, UserLookup},
        },
    },
    errors::Error,
    store::{IdentityStore, PgIdentityStore},
    types::UserId,
};

/// Name of the role granted every admin route at bootstrap
pub const ADMIN_ROLE: &str = "admin";

/// Application state shared across all request handlers.
///
/// # Example
///
/// ```ignore
/// let state = AppState::builder().auth(auth).config(config).build();
/// ```
#[derive(Clone, Builder)]
pub struct AppState {
    pub auth: AuthManager,
    pub config: Config,
}

/// Get the rolegate database migrator
pub fn migrator() -> sqlx::migrate::Migrator {
    sqlx::migrate!("./migrations")
}

fn ignore_duplicate<T>(result: Result<T, DbError>) -> Result<(), DbError> {
    match result {
        Ok(_) | Err(DbError::UniqueViolation { .. }) => Ok(()),
        Err(e) => Err(e),
    }
}

/// Create the initial admin user if it doesn't exist.
///
/// Idempotent: an existing user with this email gets its password reset, and the `admin` role,
/// one permission per entry of [`ADMIN_ROUTES`], and the grants tying them together are created
/// only where missing. The email doubles as the username.
#[instrument(skip(auth, password), err)]
pub async fn create_initial_admin_user(auth: &AuthManager, email: &str, password: &str) -> Result<UserId, Error> {
    let store = auth.store();
    let password_hash = auth.hash_password(password).await?;

    let user = match store.find_user(&[UserLookup::Email(email.to_string())]).await? {
        Some(mut existing) => {
            existing.password_hash = Some(password_hash);
            store.save_user(&existing).await?
        }
        None => {
            store
                .create_user(&UserCreateDBRequest {
                    email: email.to_string(),
                    username: email.to_string(),
                    password_hash: Some(password_hash),
                })
                .await?
        }
    };

    let role = match store.get_role(ADMIN_ROLE).await? {
        Some(role) => role,
        None => {
            store
                .create_role(&RoleCreateDBRequest {
                    name: ADMIN_ROLE.to_string(),
                    description: Some("Full access to the RBAC administration API".to_string()),
                })
                .await?
        }
    };

    for (name, method, route) in ADMIN_ROUTES {
        let permission = match store.get_permission(name).await? {
            Some(permission) => permission,
            None => {
                store
                    .create_permission(&PermissionCreateDBRequest {
                        name: name.to_string(),
                        method: method.to_string(),
                        route: route.to_string(),
                        description: None,
                    })
                    .await?
            }
        };
        ignore_duplicate(store.add_permission(role.id, permission.id).await)?;
    }

    ignore_duplicate(store.assign_role(role.id, user.id).await)?;
    debug!(user_id = user.id, "admin user ready");
    Ok(user.id)
}

/// Build the HTTP router: public auth routes, session-guarded user routes, and the admin API
/// behind bearer + RBAC guards.
pub fn build_router(state: AppState) -> Router {
    use crate::api::handlers::{admin, auth as auth_handlers, users};

    let auth = state.auth.clone();

    let public = Router::new()
        .route("/healthz", get(|| async { "OK" }))
        .route("/authentication/register", post(auth_handlers::register))
        .route("/authentication/login", post(auth_handlers::login))
        .route("/authentication/session", post(auth_handlers::create_session));

    let cookie_routes = protect(
        Router::new()
            .route("/authentication/session", delete(auth_handlers::delete_session))
            .route("/users/current/session", get(users::get_current_user)),
        &auth,
        &[Guard::SessionCookie],
    );

    let bearer_routes = protect(
        Router::new()
            .route("/authentication/logout", post(auth_handlers::logout))
            .route("/users/current", get(users::get_current_user)),
        &auth,
        &[Guard::BearerToken],
    );

    let admin_routes = protect(
        Router::new()
            .route("/admin/users", get(admin::list_users))
            .route("/admin/roles", get(admin::list_roles).post(admin::create_role))
            .route("/admin/permissions", get(admin::list_permissions).post(admin::create_permission))
            .route(
                "/admin/role-assignments",
                get(admin::list_role_assignments).post(admin::assign_role).delete(admin::revoke_role),
            )
            .route(
                "/admin/role-permissions",
                get(admin::list_role_permissions)
                    .post(admin::add_role_permission)
                    .delete(admin::remove_role_permission),
            )
            .route("/admin/access-checks", post(admin::check_access)),
        &auth,
        &[Guard::BearerToken, Guard::Rbac],
    );

    Router::new()
        .merge(public)
        .merge(cookie_routes)
        .merge(bearer_routes)
        .merge(admin_routes)
        .with_state(state)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
}

async fn connect(database: &DatabaseConfig) -> anyhow::Result<PgPool> {
    let settings = &database.pool;
    let mut options = PgPoolOptions::new()
        .max_connections(settings.max_connections)
        .min_connections(settings.min_connections)
        .acquire_timeout(Duration::from_secs(settings.acquire_timeout_secs));
    if settings.idle_timeout_secs > 0 {
        options = options.idle_timeout(Duration::from_secs(settings.idle_timeout_secs));
    }
    Ok(options.connect(&database.url).await?)
}

/// Build the production engine: PostgreSQL store, moka session cache, Argon2id hasher
pub fn auth_manager(config: &Config, store: Arc<dyn IdentityStore>) -> AuthManager {
    AuthManager::builder()
        .store(store)
        .cache(Arc::new(MokaSessionCache::new(config.auth.cache.max_capacity)))
        .hasher(Arc::new(Argon2Hasher::new(config.auth.password.argon2_params())))
        .login_method(config.auth.login_method)
        .session(config.auth.session.clone())
        .maybe_store_timeout(config.auth.store_timeout)
        .build()
}

pub struct Application {
    router: Router,
    config: Config,
    pool: PgPool,
}

impl Application {
    /// Connect, migrate, bootstrap the admin user and build the router
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        debug!("Starting rolegate with configuration: {:#?}", config);

        let pool = connect(&config.database).await?;
        Migration::new(&pool).initialize().await?;

        let auth = auth_manager(&config, Arc::new(PgIdentityStore::new(pool.clone())));

        match &config.admin_password {
            Some(password) => {
                create_initial_admin_user(&auth, &config.admin_email, password).await?;
            }
            None => info!("No admin password configured, skipping admin bootstrap"),
        }

        let state = AppState::builder().auth(auth).config(config.clone()).build();
        let router = build_router(state);

        Ok(Self { router, config, pool })
    }

    /// Start serving the application
    pub async fn serve<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let bind_addr = self.config.bind_address();
        let listener = TcpListener::bind(&bind_addr).await?;
        info!("rolegate listening on http://{}", bind_addr);

        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(shutdown)
            .await?;

        info!("Closing database connections...");
        self.pool.close().await;

        Ok(())
    }
}
