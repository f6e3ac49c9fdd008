//! Session issue, verification and revocation over a TTL key-value cache.
//!
//! A session is a `token → user id` entry in a [`SessionCache`]. The cache is the only source of
//! truth: the engine keeps no local copy and no negative cache, so a revoked or expired token is
//! rejected on the very next request.

use std::{sync::Arc, time::Duration};

use moka::{Expiry, future::Cache};
use thiserror::Error;
use tracing::{debug, instrument, warn};

use crate::{
    auth::token::TokenGenerator,
    errors::{Error, Result},
    types::UserId,
};

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("session cache unavailable: {0}")]
    Unavailable(String),

    #[error("session cache did not answer within {0:?}")]
    Timeout(Duration),
}

/// `SET key value EX ttl` / `GET` / `DEL` semantics.
#[async_trait::async_trait]
pub trait SessionCache: Send + Sync {
    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> std::result::Result<(), CacheError>;

    async fn get(&self, key: &str) -> std::result::Result<Option<String>, CacheError>;

    /// Deleting an absent key is not an error
    async fn del(&self, key: &str) -> std::result::Result<(), CacheError>;
}

#[derive(Debug, Clone)]
struct CachedSession {
    value: String,
    ttl: Duration,
}

/// Each entry expires after the TTL it was written with
struct PerEntryTtl;

impl Expiry<String, CachedSession> for PerEntryTtl {
    fn expire_after_create(&self, _key: &String, value: &CachedSession, _created_at: std::time::Instant) -> Option<Duration> {
        Some(value.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &CachedSession,
        _updated_at: std::time::Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// In-process session cache on moka with per-entry expiry.
///
/// Suitable for a single instance. Deployments with several instances put a shared cache behind
/// [`SessionCache`] instead.
#[derive(Clone)]
pub struct MokaSessionCache {
    cache: Cache<String, CachedSession>,
}

impl MokaSessionCache {
    pub fn new(max_capacity: u64) -> Self {
        let cache = Cache::builder().max_capacity(max_capacity).expire_after(PerEntryTtl).build();
        Self { cache }
    }
}

#[async_trait::async_trait]
impl SessionCache for MokaSessionCache {
    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> std::result::Result<(), CacheError> {
        let entry = CachedSession {
            value: value.to_string(),
            ttl,
        };
        self.cache.insert(key.to_string(), entry).await;
        Ok(())
    }

    async fn get(&self, key: &str) -> std::result::Result<Option<String>, CacheError> {
        Ok(self.cache.get(key).await.map(|entry| entry.value))
    }

    async fn del(&self, key: &str) -> std::result::Result<(), CacheError> {
        self.cache.invalidate(key).await;
        Ok(())
    }
}

/// Issues, verifies and revokes session tokens.
#[derive(Clone)]
pub struct SessionStore {
    cache: Arc<dyn SessionCache>,
    tokens: Arc<dyn TokenGenerator>,
    timeout: Option<Duration>,
}

impl SessionStore {
    pub fn new(cache: Arc<dyn SessionCache>, tokens: Arc<dyn TokenGenerator>) -> Self {
        Self {
            cache,
            tokens,
            timeout: None,
        }
    }

    /// Bound every cache call with `timeout`
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    async fn bounded<T>(
        &self,
        call: impl Future<Output = std::result::Result<T, CacheError>>,
    ) -> std::result::Result<T, CacheError> {
        match self.timeout {
            Some(limit) => tokio::time::timeout(limit, call).await.map_err(|_| CacheError::Timeout(limit))?,
            None => call.await,
        }
    }

    /// Store a fresh token for `user_id` that expires after `ttl`
    #[instrument(skip(self), err)]
    pub async fn issue_session(&self, user_id: UserId, ttl: Duration) -> Result<String> {
        if ttl.is_zero() {
            warn!("refusing to issue a session with zero ttl");
            return Err(Error::SessionCreateFailed);
        }

        let token = self.tokens.generate();
        match self.bounded(self.cache.set_ex(&token, &user_id.to_string(), ttl)).await {
            Ok(()) => {
                debug!("session issued");
                Ok(token)
            }
            Err(e) => {
                warn!(error = %e, "failed to write session");
                Err(Error::SessionCreateFailed)
            }
        }
    }

    /// Resolve a token to the user id it was issued for
    #[instrument(skip_all, err)]
    pub async fn verify_session(&self, token: &str) -> Result<UserId> {
        let value = match self.bounded(self.cache.get(token)).await {
            Ok(Some(value)) => value,
            Ok(None) => return Err(Error::SessionInvalid),
            Err(e) => {
                warn!(error = %e, "failed to read session");
                return Err(Error::SessionInvalid);
            }
        };

        value.parse::<UserId>().map_err(|_| {
            warn!("session entry does not hold a user id");
            Error::SessionInvalid
        })
    }

    /// Remove a token. Unknown or already revoked tokens are fine.
    #[instrument(skip_all, err)]
    pub async fn revoke_session(&self, token: &str) -> Result<()> {
        self.bounded(self.cache.del(token)).await?;
        debug!("session revoked");
        Ok(())
    }
}
