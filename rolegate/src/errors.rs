use crate::auth::session::CacheError;
use crate::db::errors::DbError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error as ThisError;

#[derive(ThisError, Debug)]
pub enum Error {
    /// No user matches the login identifier
    #[error("No user matches the login identifier")]
    InvalidUser,

    /// The presented secret does not match the stored hash
    #[error("Password does not match")]
    InvalidPassword,

    /// The user exists but has been deactivated
    #[error("User is not active")]
    UserNotActive,

    /// Session cookie missing or malformed
    #[error("Session cookie missing or malformed")]
    InvalidCookie,

    /// Authorization header missing or not of the form `<scheme> <token>`
    #[error("Authorization header missing or malformed")]
    InvalidAuthorization,

    /// Session token unknown, expired, or unreadable
    #[error("Session is invalid or expired")]
    SessionInvalid,

    /// The session cache refused to store a new session
    #[error("Failed to create session")]
    SessionCreateFailed,

    /// A verified session points at a user that cannot be loaded
    #[error("User not found")]
    UserNotFound,

    /// No principal is bound to the request
    #[error("No authenticated user bound to request")]
    InvalidUserLogin,

    /// Authenticated, but not allowed to access the route
    #[error("Access denied")]
    Forbidden,

    /// Invalid request data or business rule violation
    #[error("{message}")]
    BadRequest { message: String },

    /// Generic internal service error
    #[error("Failed to {operation}")]
    Internal { operation: String },

    /// Identity store error
    #[error(transparent)]
    Database(#[from] DbError),

    /// Session cache error
    #[error(transparent)]
    Cache(#[from] CacheError),

    /// Unexpected error with full context chain
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::InvalidUser
            | Error::InvalidPassword
            | Error::UserNotActive
            | Error::InvalidCookie
            | Error::InvalidAuthorization
            | Error::SessionInvalid
            | Error::UserNotFound
            | Error::InvalidUserLogin => StatusCode::UNAUTHORIZED,
            Error::Forbidden => StatusCode::FORBIDDEN,
            Error::BadRequest { .. } => StatusCode::BAD_REQUEST,
            Error::SessionCreateFailed | Error::Internal { .. } | Error::Cache(_) | Error::Other(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Error::Database(db_err) => match db_err {
                DbError::NotFound => StatusCode::NOT_FOUND,
                DbError::UniqueViolation { .. } => StatusCode::CONFLICT,
                DbError::ForeignKeyViolation { .. } => StatusCode::BAD_REQUEST,
                DbError::CheckViolation { .. } => StatusCode::BAD_REQUEST,
                DbError::InvalidParams { .. } => StatusCode::BAD_REQUEST,
                DbError::Timeout { .. } | DbError::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    /// Returns a user-safe error message, without leaking internal implementation details.
    ///
    /// The three login failures share one message so a caller cannot tell which of identifier,
    /// secret or account state was wrong.
    pub fn user_message(&self) -> String {
        match self {
            Error::InvalidUser | Error::InvalidPassword | Error::UserNotActive => "Invalid credentials".to_string(),
            Error::InvalidCookie
            | Error::InvalidAuthorization
            | Error::SessionInvalid
            | Error::UserNotFound
            | Error::InvalidUserLogin => "Authentication required".to_string(),
            Error::Forbidden => "Access denied".to_string(),
            Error::BadRequest { message } => message.clone(),
            Error::Database(db_err) => match db_err {
                DbError::NotFound => "Resource not found".to_string(),
                DbError::UniqueViolation { constraint, .. } => match constraint.as_deref() {
                    Some("rbac_user_email_idx") => "An account with this email address already exists".to_string(),
                    Some("rbac_user_username_idx") => "This username is already taken".to_string(),
                    Some("rbac_role_name_idx") => "A role with this name already exists".to_string(),
                    Some("rbac_permission_name_idx") => "A permission with this name already exists".to_string(),
                    _ => "Resource already exists".to_string(),
                },
                DbError::ForeignKeyViolation { .. } => "Invalid reference to related resource".to_string(),
                DbError::CheckViolation { .. } | DbError::InvalidParams { .. } => "Invalid data provided".to_string(),
                DbError::Timeout { .. } | DbError::Other(_) => "Internal server error".to_string(),
            },
            Error::SessionCreateFailed | Error::Internal { .. } | Error::Cache(_) | Error::Other(_) => {
                "Internal server error".to_string()
            }
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        // Log full error details for debugging - different log levels based on severity
        match &self {
            Error::Database(DbError::Other(_) | DbError::Timeout { .. })
            | Error::Cache(_)
            | Error::SessionCreateFailed
            | Error::Internal { .. }
            | Error::Other(_) => {
                tracing::error!("Internal service error: {:#}", self);
            }
            Error::Database(_) => {
                tracing::warn!("Database constraint error: {}", self);
            }
            Error::BadRequest { .. } => {
                tracing::debug!("Client error: {}", self);
            }
            _ => {
                tracing::info!("Authentication error: {}", self);
            }
        }

        let status = self.status_code();
        (status, self.user_message()).into_response()
    }
}

/// Type alias for service operation results
pub type Result<T> = std::result::Result<T, Error>;
