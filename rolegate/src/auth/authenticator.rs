//! Credential verification.

use std::{fmt, sync::Arc};

use serde::Deserialize;
use tracing::{debug, instrument};

use crate::{
    auth::password::CredentialHasher,
    db::models::users::{User, UserLookup},
    errors::{Error, Result},
    store::IdentityStore,
    types::LoginMethod,
};

/// Login identifier (email or username, depending on [`LoginMethod`]) and secret
#[derive(Clone, Deserialize)]
pub struct LoginParams {
    pub identifier: String,
    pub password: String,
}

impl LoginParams {
    pub fn new(identifier: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for LoginParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginParams")
            .field("identifier", &self.identifier)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Checks login credentials against the identity store. Read-only.
#[derive(Clone)]
pub struct Authenticator {
    store: Arc<dyn IdentityStore>,
    hasher: Arc<dyn CredentialHasher>,
    login_method: LoginMethod,
}

impl Authenticator {
    pub fn new(store: Arc<dyn IdentityStore>, hasher: Arc<dyn CredentialHasher>, login_method: LoginMethod) -> Self {
        Self {
            store,
            hasher,
            login_method,
        }
    }

    pub fn login_method(&self) -> LoginMethod {
        self.login_method
    }

    async fn lookup(&self, identifier: &str) -> Result<Option<User>> {
        let user = match self.login_method {
            LoginMethod::Email => self.store.find_user(&[UserLookup::Email(identifier.to_string())]).await?,
            LoginMethod::Username => self.store.find_user(&[UserLookup::Username(identifier.to_string())]).await?,
            LoginMethod::EmailOrUsername => self.store.find_user_by_email_or_username(identifier).await?,
        };
        Ok(user)
    }

    /// Resolve the user for `params`.
    ///
    /// Fails with [`Error::InvalidUser`] when no user matches, [`Error::InvalidPassword`] when the
    /// secret is wrong, and [`Error::UserNotActive`] for a deactivated user with the right secret.
    /// The returned user never carries its hash.
    #[instrument(skip(self, params), fields(identifier = %params.identifier, method = %self.login_method), err)]
    pub async fn authenticate(&self, params: &LoginParams) -> Result<User> {
        let Some(mut user) = self.lookup(&params.identifier).await? else {
            return Err(Error::InvalidUser);
        };

        // A user without a stored hash cannot log in with a password
        let Some(hash) = user.password_hash.take() else {
            debug!(user_id = user.id, "user has no password hash");
            return Err(Error::InvalidPassword);
        };

        let hasher = self.hasher.clone();
        let password = params.password.clone();
        let valid = tokio::task::spawn_blocking(move || hasher.verify(&password, &hash))
            .await
            .map_err(|e| Error::Internal {
                operation: format!("spawn password verification task: {e}"),
            })??;

        if !valid {
            return Err(Error::InvalidPassword);
        }
        if !user.active {
            return Err(Error::UserNotActive);
        }

        debug!(user_id = user.id, "credentials verified");
        Ok(user)
    }
}
