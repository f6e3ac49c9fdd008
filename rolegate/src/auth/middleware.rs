//! Request guards.
//!
//! Three independent guards, each an axum `from_fn_with_state` middleware over [`AuthManager`]:
//!
//! - [`require_session_cookie`]: verifies the session named by the configured cookie. On any
//!   failure the session is cleared and the response carries an expiring `Set-Cookie`.
//! - [`require_bearer_token`]: verifies the session named by `Authorization: <scheme> <token>`.
//! - [`require_rbac`]: checks the bound [`Principal`] against the request's method and path. Must
//!   run after one of the two above.
//!
//! A denial short-circuits the chain with an empty-bodied 401, 403 or 500; the protected handler
//! never runs. [`protect`] attaches a sequence of guards to a router in the order given.

use axum::{
    Router,
    extract::{OriginalUri, Request, State},
    http::{HeaderValue, header},
    middleware::{Next, from_fn_with_state},
    response::{IntoResponse, Response},
};
use tracing::{debug, instrument, warn};

use crate::{
    auth::{
        manager::AuthManager,
        principal::Principal,
        utils::{bearer_token, expired_session_cookie, session_cookie},
    },
    errors::{Error, Result},
};

/// Guard modes, see the module docs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Guard {
    SessionCookie,
    BearerToken,
    Rbac,
}

/// Attach `guards` to every route currently in `router`, running them in slice order.
///
/// Only routes added before this call are guarded, so call it after the routes are in place.
pub fn protect<S>(router: Router<S>, auth: &AuthManager, guards: &[Guard]) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    // The last layer applied is the outermost, so walk the guards backwards
    guards.iter().rev().fold(router, |router, guard| match guard {
        Guard::SessionCookie => router.route_layer(from_fn_with_state(auth.clone(), require_session_cookie)),
        Guard::BearerToken => router.route_layer(from_fn_with_state(auth.clone(), require_bearer_token)),
        Guard::Rbac => router.route_layer(from_fn_with_state(auth.clone(), require_rbac)),
    })
}

fn deny(error: &Error) -> Response {
    error.status_code().into_response()
}

/// Token → session → user → principal
async fn resolve_principal(auth: &AuthManager, token: &str) -> Result<Principal> {
    let user = auth.get_user_by_token(token).await?;
    if !user.active {
        return Err(Error::UserNotActive);
    }
    Ok(Principal::from(user))
}

#[instrument(skip_all, fields(path = %request.uri().path()))]
pub async fn require_session_cookie(State(auth): State<AuthManager>, mut request: Request, next: Next) -> Response {
    let headers = request.headers().clone();
    let resolved = match session_cookie(&headers, &auth.session_config().cookie_name) {
        Some(token) => resolve_principal(&auth, token).await,
        None => Err(Error::InvalidCookie),
    };

    match resolved {
        Ok(principal) => {
            debug!(user_id = principal.id, "session cookie verified");
            request.extensions_mut().insert(principal);
            next.run(request).await
        }
        Err(error) => {
            debug!(%error, "session cookie rejected");
            // Without a session cookie there is nothing to expire
            let cookie = match auth.clear_session(&headers).await {
                Ok(cookie) => Some(cookie),
                Err(Error::InvalidCookie) => None,
                Err(e) => {
                    warn!(error = %e, "failed to clear session");
                    Some(expired_session_cookie(auth.session_config()))
                }
            };

            let mut response = deny(&error);
            if let Some(cookie) = cookie {
                match HeaderValue::from_str(&cookie) {
                    Ok(value) => {
                        response.headers_mut().insert(header::SET_COOKIE, value);
                    }
                    Err(e) => warn!(error = %e, "session cookie is not a valid header value"),
                }
            }
            response
        }
    }
}

#[instrument(skip_all, fields(path = %request.uri().path()))]
pub async fn require_bearer_token(State(auth): State<AuthManager>, mut request: Request, next: Next) -> Response {
    let token = bearer_token(request.headers()).map(str::to_string);
    let resolved = match token {
        Ok(token) => resolve_principal(&auth, &token).await,
        Err(e) => Err(e),
    };

    match resolved {
        Ok(principal) => {
            debug!(user_id = principal.id, "bearer token verified");
            request.extensions_mut().insert(principal);
            next.run(request).await
        }
        Err(error) => {
            debug!(%error, "bearer token rejected");
            deny(&error)
        }
    }
}

#[instrument(skip_all, fields(method = %request.method(), path = %request.uri().path()))]
pub async fn require_rbac(State(auth): State<AuthManager>, request: Request, next: Next) -> Response {
    let Some(user_id) = Principal::from_extensions(request.extensions()).map(|p| p.id) else {
        debug!("no principal bound before route check");
        return deny(&Error::InvalidUserLogin);
    };
    let method = request.method().clone();

    // Nested routers see a stripped uri; authorize against the path the client sent
    let path = request
        .extensions()
        .get::<OriginalUri>()
        .map(|uri| uri.path().to_string())
        .unwrap_or_else(|| request.uri().path().to_string());

    match auth.access().can_access(user_id, method.as_str(), &path).await {
        Ok(true) => next.run(request).await,
        Ok(false) => {
            debug!(user_id, "route access denied");
            deny(&Error::Forbidden)
        }
        Err(error) => {
            warn!(user_id, %error, "route check failed");
            deny(&error)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        auth::{authenticator::LoginParams, manager::AuthManager, password::PlaintextHasher, session::MokaSessionCache},
        db::models::users::User,
        store::IdentityStore,
        test_utils::{FaultyStore, TestHarness},
    };
    use axum::{Json, routing::get, http::StatusCode};
    use axum_test::TestServer;
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };

    async fn whoami(principal: Principal) -> Json<Principal> {
        Json(principal)
    }

    fn guarded(auth: &AuthManager, guards: &[Guard]) -> TestServer {
        let router = Router::new().route("/reports", get(whoami).post(whoami));
        TestServer::new(protect(router, auth, guards)).unwrap()
    }

    async fn signed_in(harness: &TestHarness) -> (User, String) {
        let user = harness.register("alice@x.com", "alice", "s3cret").await;
        let (_, token) = harness.auth.sign_in(&LoginParams::new("alice@x.com", "s3cret")).await.unwrap();
        (user, token)
    }

    #[test_log::test(tokio::test)]
    async fn test_bearer_token_binds_principal() {
        let harness = TestHarness::new();
        let (alice, token) = signed_in(&harness).await;
        let server = guarded(&harness.auth, &[Guard::BearerToken]);

        let response = server.get("/reports").add_header("authorization", format!("Bearer {token}")).await;
        response.assert_status_ok();
        let principal: serde_json::Value = response.json();
        assert_eq!(principal["id"], alice.id);
        assert_eq!(principal["email"], "alice@x.com");
    }

    #[tokio::test]
    async fn test_bearer_token_rejections() {
        let harness = TestHarness::new();
        let (_, token) = signed_in(&harness).await;
        let server = guarded(&harness.auth, &[Guard::BearerToken]);

        // No scheme
        let response = server.get("/reports").add_header("authorization", token.clone()).await;
        response.assert_status(StatusCode::UNAUTHORIZED);
        assert!(response.text().is_empty());
        assert!(response.headers().get(header::SET_COOKIE).is_none());

        // Unknown token
        let response = server.get("/reports").add_header("authorization", "Bearer abc123").await;
        response.assert_status(StatusCode::UNAUTHORIZED);

        // No header at all
        server.get("/reports").await.assert_status(StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_revoked_token_rejected_on_next_request() {
        let harness = TestHarness::new();
        let (_, token) = signed_in(&harness).await;
        let server = guarded(&harness.auth, &[Guard::BearerToken]);

        server
            .get("/reports")
            .add_header("authorization", format!("Bearer {token}"))
            .await
            .assert_status_ok();

        harness.auth.sessions().revoke_session(&token).await.unwrap();

        server
            .get("/reports")
            .add_header("authorization", format!("Bearer {token}"))
            .await
            .assert_status(StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_session_for_deleted_or_deactivated_user_rejected() {
        let harness = TestHarness::new();
        let (mut alice, token) = signed_in(&harness).await;
        let server = guarded(&harness.auth, &[Guard::BearerToken]);

        alice.active = false;
        let stored = harness.store.get_user(alice.id).await.unwrap().unwrap();
        alice.password_hash = stored.password_hash;
        harness.store.save_user(&alice).await.unwrap();
        server
            .get("/reports")
            .add_header("authorization", format!("Bearer {token}"))
            .await
            .assert_status(StatusCode::UNAUTHORIZED);

        harness.store.delete_user(alice.id).await.unwrap();
        server
            .get("/reports")
            .add_header("authorization", format!("Bearer {token}"))
            .await
            .assert_status(StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_session_cookie_binds_principal() {
        let harness = TestHarness::new();
        let (alice, token) = signed_in(&harness).await;
        let server = guarded(&harness.auth, &[Guard::SessionCookie]);

        let response = server
            .get("/reports")
            .add_header("cookie", format!("theme=dark; rolegate_session={token}"))
            .await;
        response.assert_status_ok();
        let principal: serde_json::Value = response.json();
        assert_eq!(principal["id"], alice.id);
    }

    #[tokio::test]
    async fn test_session_cookie_failure_clears_cookie() {
        let harness = TestHarness::new();
        let server = guarded(&harness.auth, &[Guard::SessionCookie]);

        // Stale cookie
        let response = server.get("/reports").add_header("cookie", "rolegate_session=stale").await;
        response.assert_status(StatusCode::UNAUTHORIZED);
        let cookie = response.headers().get(header::SET_COOKIE).unwrap().to_str().unwrap().to_string();
        assert!(cookie.starts_with("rolegate_session=;"));
        assert!(cookie.contains("Max-Age=0"));

        // Missing or empty cookie leaves the response untouched
        let response = server.get("/reports").await;
        response.assert_status(StatusCode::UNAUTHORIZED);
        assert!(response.headers().get(header::SET_COOKIE).is_none());

        let response = server.get("/reports").add_header("cookie", "rolegate_session=").await;
        response.assert_status(StatusCode::UNAUTHORIZED);
        assert!(response.headers().get(header::SET_COOKIE).is_none());
    }

    #[tokio::test]
    async fn test_bearer_token_is_not_a_cookie() {
        let harness = TestHarness::new();
        let (_, token) = signed_in(&harness).await;
        let server = guarded(&harness.auth, &[Guard::SessionCookie]);

        server
            .get("/reports")
            .add_header("authorization", format!("Bearer {token}"))
            .await
            .assert_status(StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_denied_request_never_reaches_handler() {
        let harness = TestHarness::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let router = Router::new().route(
            "/reports",
            get(move || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    "ok"
                }
            }),
        );
        let server = TestServer::new(protect(router, &harness.auth, &[Guard::BearerToken, Guard::Rbac])).unwrap();

        server.get("/reports").add_header("authorization", "abc123").await.assert_status(StatusCode::UNAUTHORIZED);
        server
            .get("/reports")
            .add_header("authorization", "Bearer abc123")
            .await
            .assert_status(StatusCode::UNAUTHORIZED);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_rbac_checks_method_and_path() {
        let harness = TestHarness::new();
        harness
            .register_with_permissions("alice@x.com", "alice", "analyst", &[("read-reports", "GET", "/reports")])
            .await;
        let (_, token) = harness.auth.sign_in(&LoginParams::new("alice@x.com", "s3cret")).await.unwrap();
        let server = guarded(&harness.auth, &[Guard::BearerToken, Guard::Rbac]);

        server
            .get("/reports")
            .add_header("authorization", format!("Bearer {token}"))
            .await
            .assert_status_ok();

        let response = server.post("/reports").add_header("authorization", format!("Bearer {token}")).await;
        response.assert_status(StatusCode::FORBIDDEN);
        assert!(response.text().is_empty());
    }

    #[tokio::test]
    async fn test_rbac_uses_full_path_under_nesting() {
        let harness = TestHarness::new();
        harness
            .register_with_permissions("alice@x.com", "alice", "analyst", &[("read-reports", "GET", "/api/reports")])
            .await;
        let (_, token) = harness.auth.sign_in(&LoginParams::new("alice@x.com", "s3cret")).await.unwrap();

        let inner = protect(
            Router::new().route("/reports", get(whoami)),
            &harness.auth,
            &[Guard::BearerToken, Guard::Rbac],
        );
        let server = TestServer::new(Router::new().nest("/api", inner)).unwrap();

        server
            .get("/api/reports")
            .add_header("authorization", format!("Bearer {token}"))
            .await
            .assert_status_ok();
    }

    #[tokio::test]
    async fn test_rbac_without_principal_is_unauthorized() {
        let harness = TestHarness::new();
        let server = guarded(&harness.auth, &[Guard::Rbac]);

        server.get("/reports").await.assert_status(StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_rbac_store_failure_is_server_error() {
        let harness = TestHarness::new();
        let (alice, token) = signed_in(&harness).await;

        // Sessions come from the harness, route checks go to a failing store
        let failing = AuthManager::builder()
            .store(Arc::new(FaultyStore::failing()))
            .cache(Arc::new(MokaSessionCache::new(10)))
            .hasher(Arc::new(PlaintextHasher))
            .build();

        let router = protect(Router::new().route("/reports", get(whoami)), &failing, &[Guard::Rbac]);
        let router = router.layer(axum::middleware::from_fn(move |mut request: Request, next: Next| {
            let principal = Principal::from(alice.clone());
            async move {
                request.extensions_mut().insert(principal);
                next.run(request).await
            }
        }));
        let server = TestServer::new(router).unwrap();

        server
            .get("/reports")
            .add_header("authorization", format!("Bearer {token}"))
            .await
            .assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    }
}
