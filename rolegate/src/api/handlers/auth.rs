use axum::{Json, extract::State, http::HeaderMap};

use crate::{
    AppState,
    api::models::auth::{
        AuthResponse, AuthSuccessResponse, ClearSessionResponse, LoginRequest, RegisterRequest, RegisterResponse, SessionResponse,
        TokenResponse,
    },
    auth::{manager::NewUser, principal::Principal},
    errors::Error,
};

/// Register a new user account
#[tracing::instrument(skip_all)]
pub async fn register(State(state): State<AppState>, Json(request): Json<RegisterRequest>) -> Result<RegisterResponse, Error> {
    if !state.config.auth.allow_registration {
        return Err(Error::BadRequest {
            message: "User registration is disabled".to_string(),
        });
    }

    let password_config = &state.config.auth.password;
    if request.password.len() < password_config.min_length {
        return Err(Error::BadRequest {
            message: format!("Password must be at least {} characters", password_config.min_length),
        });
    }
    if request.password.len() > password_config.max_length {
        return Err(Error::BadRequest {
            message: format!("Password must be no more than {} characters", password_config.max_length),
        });
    }

    let user = state.auth.register(&NewUser::from(request)).await?;

    Ok(RegisterResponse {
        auth_response: AuthResponse {
            user: user.into(),
            message: "Registration successful".to_string(),
        },
    })
}

/// Log in and receive a bearer token
#[tracing::instrument(skip_all)]
pub async fn login(State(state): State<AppState>, Json(request): Json<LoginRequest>) -> Result<Json<TokenResponse>, Error> {
    let (user, token) = state.auth.sign_in(&request.into()).await?;

    Ok(Json(TokenResponse {
        user: user.into(),
        token,
        token_type: "Bearer".to_string(),
        expires_in: state.auth.session_config().timeout.as_secs(),
    }))
}

/// Log in and receive a session cookie
#[tracing::instrument(skip_all)]
pub async fn create_session(State(state): State<AppState>, Json(request): Json<LoginRequest>) -> Result<SessionResponse, Error> {
    let (user, cookie) = state.auth.sign_in_cookie(&request.into()).await?;

    Ok(SessionResponse {
        auth_response: AuthResponse {
            user: user.into(),
            message: "Login successful".to_string(),
        },
        cookie,
    })
}

/// Revoke the cookie session and expire the cookie
#[tracing::instrument(skip_all)]
pub async fn delete_session(State(state): State<AppState>, headers: HeaderMap) -> Result<ClearSessionResponse, Error> {
    let cookie = state.auth.clear_session(&headers).await?;

    Ok(ClearSessionResponse {
        auth_response: AuthSuccessResponse {
            message: "Session cleared".to_string(),
        },
        cookie,
    })
}

/// Revoke the bearer token of the current request
#[tracing::instrument(skip_all)]
pub async fn logout(State(state): State<AppState>, principal: Option<Principal>, headers: HeaderMap) -> Result<Json<AuthSuccessResponse>, Error> {
    state.auth.logout(principal.as_ref(), &headers).await?;

    Ok(Json(AuthSuccessResponse {
        message: "Logout successful".to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{build_router, store::IdentityStore, test_utils::TestHarness};
    use axum::http::{StatusCode, header};
    use axum_test::TestServer;
    use serde_json::json;

    fn server(harness: &TestHarness) -> TestServer {
        TestServer::new(build_router(harness.app_state())).unwrap()
    }

    async fn login_token(server: &TestServer) -> String {
        let response = server
            .post("/authentication/login")
            .json(&json!({"identifier": "alice@x.com", "password": "s3cret"}))
            .await;
        response.assert_status_ok();
        let body: TokenResponse = response.json();
        body.token
    }

    #[test_log::test(tokio::test)]
    async fn test_register_success() {
        let harness = TestHarness::new();
        let server = server(&harness);

        let response = server
            .post("/authentication/register")
            .json(&RegisterRequest {
                email: "alice@x.com".to_string(),
                username: "alice".to_string(),
                password: "s3cret".to_string(),
            })
            .await;

        response.assert_status(StatusCode::CREATED);
        let body: AuthResponse = response.json();
        assert_eq!(body.user.email, "alice@x.com");
        assert!(body.user.active);
        assert_eq!(body.message, "Registration successful");
        assert!(!response.text().contains("password"));
    }

    #[tokio::test]
    async fn test_register_duplicate_is_conflict() {
        let harness = TestHarness::new();
        harness.register("alice@x.com", "alice", "s3cret").await;
        let server = server(&harness);

        let response = server
            .post("/authentication/register")
            .json(&json!({"email": "alice@x.com", "username": "other", "password": "s3cret"}))
            .await;
        response.assert_status(StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_register_validation() {
        let harness = TestHarness::new();
        let server = server(&harness);

        let response = server
            .post("/authentication/register")
            .json(&json!({"email": "alice@x.com", "username": "alice", "password": "abc"}))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);

        let mut state = harness.app_state();
        state.config.auth.allow_registration = false;
        let closed = TestServer::new(build_router(state)).unwrap();
        let response = closed
            .post("/authentication/register")
            .json(&json!({"email": "alice@x.com", "username": "alice", "password": "s3cret"}))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_login_failures_are_indistinguishable() {
        let harness = TestHarness::new();
        let mut alice = harness.register("alice@x.com", "alice", "s3cret").await;
        harness.register("bob@x.com", "bob", "hunter2").await;
        let server = server(&harness);

        let unknown = server
            .post("/authentication/login")
            .json(&json!({"identifier": "nobody@x.com", "password": "s3cret"}))
            .await;
        let wrong = server
            .post("/authentication/login")
            .json(&json!({"identifier": "alice@x.com", "password": "nope"}))
            .await;

        alice.active = false;
        alice.password_hash = harness.store.get_user(alice.id).await.unwrap().unwrap().password_hash;
        harness.store.save_user(&alice).await.unwrap();
        let inactive = server
            .post("/authentication/login")
            .json(&json!({"identifier": "alice@x.com", "password": "s3cret"}))
            .await;

        for response in [&unknown, &wrong, &inactive] {
            response.assert_status(StatusCode::UNAUTHORIZED);
        }
        assert_eq!(unknown.text(), wrong.text());
        assert_eq!(wrong.text(), inactive.text());
    }

    #[tokio::test]
    async fn test_login_then_logout_revokes_token() {
        let harness = TestHarness::new();
        harness.register("alice@x.com", "alice", "s3cret").await;
        let server = server(&harness);
        let token = login_token(&server).await;

        let response = server
            .get("/users/current")
            .add_header("authorization", format!("Bearer {token}"))
            .await;
        response.assert_status_ok();

        server
            .post("/authentication/logout")
            .add_header("authorization", format!("Bearer {token}"))
            .await
            .assert_status_ok();

        server
            .get("/users/current")
            .add_header("authorization", format!("Bearer {token}"))
            .await
            .assert_status(StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_logout_without_principal_is_unauthorized() {
        let harness = TestHarness::new();
        let server = server(&harness);

        server.post("/authentication/logout").await.assert_status(StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_cookie_session_lifecycle() {
        let harness = TestHarness::new();
        harness.register("alice@x.com", "alice", "s3cret").await;
        let server = server(&harness);

        let response = server
            .post("/authentication/session")
            .json(&json!({"identifier": "alice@x.com", "password": "s3cret"}))
            .await;
        response.assert_status_ok();
        let set_cookie = response.headers().get(header::SET_COOKIE).unwrap().to_str().unwrap().to_string();
        let pair = set_cookie.split(';').next().unwrap().to_string();
        assert!(pair.starts_with("rolegate_session="));

        let response = server.get("/users/current/session").add_header("cookie", pair.clone()).await;
        response.assert_status_ok();
        let user: crate::api::models::users::UserResponse = response.json();
        assert_eq!(user.username, "alice");

        let response = server.delete("/authentication/session").add_header("cookie", pair.clone()).await;
        response.assert_status_ok();
        let cleared = response.headers().get(header::SET_COOKIE).unwrap().to_str().unwrap().to_string();
        assert!(cleared.contains("Max-Age=0"));

        // The cookie no longer names a live session
        let response = server.get("/users/current/session").add_header("cookie", pair).await;
        response.assert_status(StatusCode::UNAUTHORIZED);
        assert!(response.headers().get(header::SET_COOKIE).is_some());
    }

    #[tokio::test]
    async fn test_bearer_token_cannot_clear_cookie_session() {
        let harness = TestHarness::new();
        harness.register("alice@x.com", "alice", "s3cret").await;
        let server = server(&harness);
        let token = login_token(&server).await;

        server
            .delete("/authentication/session")
            .add_header("authorization", format!("Bearer {token}"))
            .await
            .assert_status(StatusCode::UNAUTHORIZED);

        // The bearer session survives
        server
            .get("/users/current")
            .add_header("authorization", format!("Bearer {token}"))
            .await
            .assert_status_ok();
    }
}
