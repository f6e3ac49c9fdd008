use axum::{
    Json,
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::warn;

use crate::{api::models::users::UserResponse, auth::authenticator::LoginParams, auth::manager::NewUser};

/// Request to register a new user
#[derive(Serialize, Deserialize)]
pub struct RegisterRequest {
    /// Email address (must be unique)
    pub email: String,
    /// Username (must be unique)
    pub username: String,
    /// Password (will be hashed)
    pub password: String,
}

impl fmt::Debug for RegisterRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisterRequest")
            .field("email", &self.email)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl From<RegisterRequest> for NewUser {
    fn from(request: RegisterRequest) -> Self {
        NewUser {
            email: request.email,
            username: request.username,
            password: request.password,
        }
    }
}

/// Request to log in. `identifier` is an email or username depending on the login method.
#[derive(Serialize, Deserialize)]
pub struct LoginRequest {
    pub identifier: String,
    pub password: String,
}

impl fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginRequest")
            .field("identifier", &self.identifier)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl From<LoginRequest> for LoginParams {
    fn from(request: LoginRequest) -> Self {
        LoginParams::new(request.identifier, request.password)
    }
}

/// Response after successful registration or cookie login
#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResponse {
    /// User information
    pub user: UserResponse,
    /// Success message
    pub message: String,
}

/// Response carrying a bearer token
#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub user: UserResponse,
    pub token: String,
    /// Always `Bearer`
    pub token_type: String,
    /// Token lifetime in seconds
    pub expires_in: u64,
}

/// Generic success response
#[derive(Debug, Serialize, Deserialize)]
pub struct AuthSuccessResponse {
    pub message: String,
}

fn with_cookie(cookie: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    match HeaderValue::from_str(cookie) {
        Ok(value) => {
            headers.insert(header::SET_COOKIE, value);
        }
        Err(e) => warn!(error = %e, "session cookie is not a valid header value"),
    }
    headers
}

/// Structured response for successful registration
pub struct RegisterResponse {
    pub auth_response: AuthResponse,
}

impl IntoResponse for RegisterResponse {
    fn into_response(self) -> Response {
        (StatusCode::CREATED, Json(self.auth_response)).into_response()
    }
}

/// Structured response for a successful cookie login
pub struct SessionResponse {
    pub auth_response: AuthResponse,
    pub cookie: String,
}

impl IntoResponse for SessionResponse {
    fn into_response(self) -> Response {
        (StatusCode::OK, with_cookie(&self.cookie), Json(self.auth_response)).into_response()
    }
}

/// Structured response for clearing a cookie session
pub struct ClearSessionResponse {
    pub auth_response: AuthSuccessResponse,
    pub cookie: String,
}

impl IntoResponse for ClearSessionResponse {
    fn into_response(self) -> Response {
        (StatusCode::OK, with_cookie(&self.cookie), Json(self.auth_response)).into_response()
    }
}
