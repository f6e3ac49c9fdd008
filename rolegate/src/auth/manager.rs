//! Composition root for the engine.
//!
//! [`AuthManager`] owns the injected collaborators (identity store, session cache, hasher, token
//! generator) and exposes the account-level operations built from them: register, authenticate,
//! sign in, clear a cookie session, log out, and resolve a token to its user. It is cheap to clone
//! and is the state the request guards run with.

use std::{fmt, sync::Arc, time::Duration};

use axum::http::HeaderMap;
use bon::bon;
use serde::Deserialize;
use tracing::{debug, instrument, warn};

use crate::{
    auth::{
        access::AccessControl,
        authenticator::{Authenticator, LoginParams},
        password::{Argon2Hasher, CredentialHasher},
        principal::Principal,
        session::{SessionCache, SessionStore},
        token::{RandomTokenGenerator, TokenGenerator},
        utils::{bearer_token, expired_session_cookie, session_cookie, session_cookie_header},
    },
    config::SessionConfig,
    db::models::users::{User, UserCreateDBRequest},
    errors::{Error, Result},
    store::{IdentityStore, TimeoutStore},
    types::LoginMethod,
};

/// Registration input
#[derive(Clone, Deserialize)]
pub struct NewUser {
    pub email: String,
    pub username: String,
    pub password: String,
}

impl fmt::Debug for NewUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewUser")
            .field("email", &self.email)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Clone)]
pub struct AuthManager {
    store: Arc<dyn IdentityStore>,
    hasher: Arc<dyn CredentialHasher>,
    authenticator: Authenticator,
    access: AccessControl,
    sessions: SessionStore,
    session: SessionConfig,
}

#[bon]
impl AuthManager {
    /// Build a manager. The hasher defaults to Argon2id, the token generator to 256 random bits,
    /// the login method to email. With `store_timeout` set, every store and cache call is bounded.
    #[builder]
    pub fn new(
        store: Arc<dyn IdentityStore>,
        cache: Arc<dyn SessionCache>,
        hasher: Option<Arc<dyn CredentialHasher>>,
        tokens: Option<Arc<dyn TokenGenerator>>,
        #[builder(default)] login_method: LoginMethod,
        #[builder(default)] session: SessionConfig,
        store_timeout: Option<Duration>,
    ) -> Self {
        let store: Arc<dyn IdentityStore> = match store_timeout {
            Some(limit) => Arc::new(TimeoutStore::new(store, limit)),
            None => store,
        };
        let hasher: Arc<dyn CredentialHasher> = match hasher {
            Some(hasher) => hasher,
            None => Arc::new(Argon2Hasher::default()),
        };
        let tokens: Arc<dyn TokenGenerator> = match tokens {
            Some(tokens) => tokens,
            None => Arc::new(RandomTokenGenerator),
        };

        Self {
            authenticator: Authenticator::new(store.clone(), hasher.clone(), login_method),
            access: AccessControl::new(store.clone()),
            sessions: SessionStore::new(cache, tokens).with_timeout(store_timeout),
            store,
            hasher,
            session,
        }
    }
}

impl AuthManager {
    pub fn store(&self) -> &Arc<dyn IdentityStore> {
        &self.store
    }

    pub fn access(&self) -> &AccessControl {
        &self.access
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    pub fn session_config(&self) -> &SessionConfig {
        &self.session
    }

    /// Hash a secret on a blocking thread
    pub async fn hash_password(&self, password: &str) -> Result<String> {
        let hasher = self.hasher.clone();
        let password = password.to_string();
        tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|e| Error::Internal {
                operation: format!("spawn password hashing task: {e}"),
            })?
    }

    /// Create an active user with a hashed secret. Duplicate email or username surfaces as the
    /// store's unique violation.
    #[instrument(skip(self, new_user), fields(email = %new_user.email, username = %new_user.username), err)]
    pub async fn register(&self, new_user: &NewUser) -> Result<User> {
        let password_hash = self.hash_password(&new_user.password).await?;
        let user = self
            .store
            .create_user(&UserCreateDBRequest {
                email: new_user.email.clone(),
                username: new_user.username.clone(),
                password_hash: Some(password_hash),
            })
            .await?;

        debug!(user_id = user.id, "user registered");
        Ok(user.without_secret())
    }

    pub async fn authenticate(&self, params: &LoginParams) -> Result<User> {
        self.authenticator.authenticate(params).await
    }

    /// Authenticate and issue a session token for the configured lifetime
    #[instrument(skip_all, err)]
    pub async fn sign_in(&self, params: &LoginParams) -> Result<(User, String)> {
        let user = self.authenticator.authenticate(params).await?;
        let token = self.sessions.issue_session(user.id, self.session.timeout).await?;
        Ok((user, token))
    }

    /// Authenticate and return the `Set-Cookie` value carrying a new session
    #[instrument(skip_all, err)]
    pub async fn sign_in_cookie(&self, params: &LoginParams) -> Result<(User, String)> {
        let (user, token) = self.sign_in(params).await?;
        Ok((user, session_cookie_header(&token, &self.session)))
    }

    /// Revoke the session named by the request's cookie and return the `Set-Cookie` value that
    /// expires it on the client
    #[instrument(skip_all, err)]
    pub async fn clear_session(&self, headers: &HeaderMap) -> Result<String> {
        let token = session_cookie(headers, &self.session.cookie_name).ok_or(Error::InvalidCookie)?;
        self.sessions.revoke_session(token).await?;
        Ok(expired_session_cookie(&self.session))
    }

    /// Revoke the bearer token of an authenticated request. Cookies are left alone.
    #[instrument(skip_all, err)]
    pub async fn logout(&self, principal: Option<&Principal>, headers: &HeaderMap) -> Result<()> {
        let principal = principal.ok_or(Error::InvalidUserLogin)?;
        let token = bearer_token(headers)?;
        self.sessions.revoke_session(token).await?;
        debug!(user_id = principal.id, "logged out");
        Ok(())
    }

    /// Resolve a session token to its user
    #[instrument(skip_all, err)]
    pub async fn get_user_by_token(&self, token: &str) -> Result<User> {
        let user_id = self.sessions.verify_session(token).await?;
        match self.store.get_user(user_id).await {
            Ok(Some(user)) => Ok(user.without_secret()),
            Ok(None) => Err(Error::UserNotFound),
            Err(e) => {
                warn!(user_id, error = %e, "failed to load session user");
                Err(Error::UserNotFound)
            }
        }
    }
}
