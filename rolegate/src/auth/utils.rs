//! Authentication header helpers.

use axum::http::{HeaderMap, header};

use crate::{
    config::SessionConfig,
    errors::{Error, Result},
};

/// Token from an `Authorization: <scheme> <token>` header.
///
/// The value must split on single spaces into exactly two non-empty parts. The scheme itself is
/// not checked.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str> {
    let value = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(Error::InvalidAuthorization)?;

    let parts: Vec<&str> = value.split(' ').collect();
    match parts.as_slice() {
        [scheme, token] if !scheme.is_empty() && !token.is_empty() => Ok(*token),
        _ => Err(Error::InvalidAuthorization),
    }
}

/// First non-empty value of the cookie named `name`
pub fn session_cookie<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|cookies| cookies.split(';'))
        .filter_map(|cookie| cookie.trim().split_once('='))
        .find(|(cookie_name, value)| *cookie_name == name && !value.is_empty())
        .map(|(_, value)| value)
}

/// `Set-Cookie` value delivering `token` for the configured session lifetime
pub fn session_cookie_header(token: &str, config: &SessionConfig) -> String {
    let mut cookie = format!(
        "{}={}; Path=/; HttpOnly; SameSite={}; Max-Age={}",
        config.cookie_name,
        token,
        config.cookie_same_site,
        config.timeout.as_secs()
    );
    if config.cookie_secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// `Set-Cookie` value that makes the client drop the session cookie
pub fn expired_session_cookie(config: &SessionConfig) -> String {
    let mut cookie = format!(
        "{}=; Path=/; HttpOnly; SameSite={}; Max-Age=0",
        config.cookie_name, config.cookie_same_site
    );
    if config.cookie_secure {
        cookie.push_str("; Secure");
    }
    cookie
}
