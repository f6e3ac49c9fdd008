//! The authenticated identity bound to a request.
//!
//! Guards insert a [`Principal`] into the request extensions after verifying a session. Handlers
//! read it back either with the [`Principal`] extractor, which rejects with
//! [`Error::InvalidUserLogin`] when nothing was bound, or with `Option<Principal>`, or directly with
//! [`Principal::from_extensions`]. None of these can panic on a missing or foreign value.

use axum::{
    extract::{FromRequestParts, OptionalFromRequestParts},
    http::{Extensions, request::Parts},
};
use serde::Serialize;
use std::convert::Infallible;

use crate::{db::models::users::User, errors::Error, types::UserId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Principal {
    pub id: UserId,
    pub email: String,
    pub username: String,
    pub active: bool,
}

impl From<User> for Principal {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            username: user.username,
            active: user.active,
        }
    }
}

impl Principal {
    /// The principal bound to these extensions, if any
    pub fn from_extensions(extensions: &Extensions) -> Option<&Principal> {
        extensions.get::<Principal>()
    }
}

impl<S> FromRequestParts<S> for Principal
where
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Principal::from_extensions(&parts.extensions).cloned().ok_or(Error::InvalidUserLogin)
    }
}

impl<S> OptionalFromRequestParts<S> for Principal
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Option<Self>, Self::Rejection> {
        Ok(Principal::from_extensions(&parts.extensions).cloned())
    }
}
