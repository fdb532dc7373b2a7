//! On-demand access token cache.
//!
//! [`AccessTokens`] is built from a finalized registry and a [`TokenSource`].
//! Each declared token has its own slot guarded by an async mutex, so at most
//! one fetch runs per token identifier while fetches for different tokens
//! proceed independently.
//!
//! # Example
//!
//! ```rust,ignore
//! use tokenwright_core::{tokens, TokenId};
//!
//! let mut registry = tokens::create_access_tokens()?;
//! registry.manage_token("billing")?.add_scopes(["uid", "billing.read"])?.build();
//!
//! let tokens = registry.start(MyHttpSource::new());
//! let token = tokens.get(&TokenId::new("billing")).await?;
//! ```

use std::collections::HashMap;

use chrono::Utc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::builder::AccessTokensBuilder;
use crate::config::AccessTokensConfig;
use crate::error::TokenError;
use crate::model::{ScopeSet, TokenId};
use crate::token::{AccessToken, TokenRequest, TokenSource};

/// Runtime access to every declared token.
pub struct AccessTokens<S: TokenSource> {
    config: AccessTokensConfig,
    source: S,
    slots: HashMap<TokenId, Mutex<Option<AccessToken>>>,
}

impl<S: TokenSource> AccessTokens<S> {
    /// Create the cache for a finalized configuration.
    pub fn new(config: AccessTokensConfig, source: S) -> Self {
        let slots = config
            .iter()
            .map(|c| (c.token_id().clone(), Mutex::new(None)))
            .collect();
        info!(
            endpoint = %config.endpoint(),
            tokens = config.len(),
            "access tokens configured"
        );
        Self {
            config,
            source,
            slots,
        }
    }

    /// The configuration snapshot this cache serves.
    pub fn config(&self) -> &AccessTokensConfig {
        &self.config
    }

    /// Get a valid access token, fetching a new one if necessary.
    ///
    /// A cached token is returned while more than the configured share of its
    /// lifetime remains. Otherwise scopes are resolved (dynamic providers are
    /// invoked here) and the source is asked for a new token. If either step
    /// fails and the cached token has not yet expired, the cached token is
    /// returned.
    pub async fn get(&self, token_id: &TokenId) -> Result<AccessToken, TokenError> {
        let (configuration, slot) = self
            .config
            .get(token_id)
            .zip(self.slots.get(token_id))
            .ok_or_else(|| TokenError::UnknownTokenId {
                token_id: token_id.clone(),
            })?;

        let mut cached = slot.lock().await;
        let refresh_percent_left = self.config.refresh_percent_left();
        if let Some(token) = cached.as_ref().filter(|t| !t.needs_refresh(refresh_percent_left)) {
            return Ok(token.clone());
        }

        let fetched = match configuration.resolve_scopes() {
            Ok(scopes) => self.fetch(token_id, &scopes).await,
            Err(e) => Err(TokenError::from(e)),
        };

        match fetched {
            Ok(token) => {
                info!(
                    token_id = %token_id,
                    expires_in_secs = (token.expires_at - Utc::now()).num_seconds(),
                    "access token refreshed"
                );
                *cached = Some(token.clone());
                Ok(token)
            }
            Err(e) => match cached.as_ref().filter(|t| !t.is_expired()) {
                Some(token) => {
                    warn!(token_id = %token_id, error = %e, "refresh failed, using cached token");
                    Ok(token.clone())
                }
                None => {
                    warn!(token_id = %token_id, error = %e, "refresh failed");
                    Err(e)
                }
            },
        }
    }

    async fn fetch(&self, token_id: &TokenId, scopes: &ScopeSet) -> Result<AccessToken, TokenError> {
        debug!(token_id = %token_id, scopes = scopes.len(), "fetching access token");
        let request = TokenRequest {
            endpoint: self.config.endpoint(),
            token_id,
            scopes,
        };
        self.source.fetch(&request).await
    }

    /// Drop the cached token so the next [`get`](Self::get) fetches a new one.
    pub async fn invalidate(&self, token_id: &TokenId) -> Result<(), TokenError> {
        let slot = self
            .slots
            .get(token_id)
            .ok_or_else(|| TokenError::UnknownTokenId {
                token_id: token_id.clone(),
            })?;
        *slot.lock().await = None;
        debug!(token_id = %token_id, "cached token invalidated");
        Ok(())
    }
}

impl AccessTokensBuilder {
    /// Finish configuration and start serving tokens from `source`.
    pub fn start<S: TokenSource>(self, source: S) -> AccessTokens<S> {
        AccessTokens::new(self.freeze(), source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConfigError;
    use crate::model::scope_set;
    use async_trait::async_trait;
    use chrono::Duration;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex as StdMutex};
    use url::Url;

    /// Source that hands out numbered tokens and records requested scopes.
    #[derive(Default)]
    struct CountingSource {
        calls: AtomicUsize,
        lifetime_secs: i64,
        issued_secs_ago: i64,
        fail: AtomicBool,
        requested: StdMutex<Vec<ScopeSet>>,
    }

    impl CountingSource {
        fn new(lifetime_secs: i64) -> Self {
            Self {
                lifetime_secs,
                ..Default::default()
            }
        }
    }

    #[async_trait]
    impl TokenSource for CountingSource {
        async fn fetch(&self, request: &TokenRequest<'_>) -> Result<AccessToken, TokenError> {
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            self.requested.lock().unwrap().push(request.scopes.clone());
            if self.fail.load(Ordering::SeqCst) {
                return Err(TokenError::FetchFailed {
                    message: "endpoint unavailable".to_string(),
                });
            }
            Ok(AccessToken::new(
                format!("{}-{}", request.token_id, n),
                Duration::seconds(self.lifetime_secs),
            )
            .with_issued_at(Utc::now() - Duration::seconds(self.issued_secs_ago))
            .with_scopes(request.scopes.clone()))
        }
    }

    fn registry() -> AccessTokensBuilder {
        AccessTokensBuilder::new(Url::parse("https://auth.example.com/oauth2/access_token").unwrap())
    }

    #[tokio::test]
    async fn test_get_caches_valid_token() {
        let source = Arc::new(CountingSource::new(3600));
        let mut registry = registry();
        registry.manage_token("svc").unwrap().add_scope("uid").build();
        let tokens = registry.start(source.clone());

        let first = tokens.get(&TokenId::new("svc")).await.unwrap();
        let second = tokens.get(&TokenId::new("svc")).await.unwrap();

        assert_eq!(first.value, second.value);
        assert_eq!(first.value.expose(), "svc-0");
        assert_eq!(first.scopes, scope_set(["uid"]));
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_expired_token_is_refetched() {
        let source = Arc::new(CountingSource::new(0));
        let mut registry = registry();
        registry.manage_token("svc").unwrap().add_scope("uid").build();
        let tokens = registry.start(source.clone());

        tokens.get(&TokenId::new("svc")).await.unwrap();
        let second = tokens.get(&TokenId::new("svc")).await.unwrap();

        assert_eq!(second.value.expose(), "svc-1");
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_dynamic_scopes_resolved_per_fetch() {
        let source = Arc::new(CountingSource::new(0));
        let tenant = Arc::new(AtomicUsize::new(0));
        let counter = tenant.clone();
        let mut registry = registry();
        registry
            .manage_token("tenant")
            .unwrap()
            .add_dynamic_scope(move || format!("tenant-{}", counter.fetch_add(1, Ordering::SeqCst)))
            .build();
        let tokens = registry.start(source.clone());

        tokens.get(&TokenId::new("tenant")).await.unwrap();
        tokens.get(&TokenId::new("tenant")).await.unwrap();

        let requested = source.requested.lock().unwrap().clone();
        assert_eq!(requested, vec![scope_set(["tenant-0"]), scope_set(["tenant-1"])]);
    }

    #[tokio::test]
    async fn test_concurrent_gets_share_one_fetch() {
        let source = Arc::new(CountingSource::new(3600));
        let mut registry = registry();
        registry.manage_token("svc").unwrap().add_scope("uid").build();
        let tokens = registry.start(source.clone());

        let id = TokenId::new("svc");
        let (a, b) = tokio::join!(tokens.get(&id), tokens.get(&id));

        assert_eq!(a.unwrap().value, b.unwrap().value);
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unknown_token_id() {
        let tokens = registry().start(Arc::new(CountingSource::new(3600)));
        let result = tokens.get(&TokenId::new("missing")).await;
        assert!(matches!(result, Err(TokenError::UnknownTokenId { .. })));
        assert!(tokens.invalidate(&TokenId::new("missing")).await.is_err());
    }

    #[tokio::test]
    async fn test_fetch_failure_propagates() {
        let source = Arc::new(CountingSource {
            fail: AtomicBool::new(true),
            ..CountingSource::new(3600)
        });
        let mut registry = registry();
        registry.manage_token("svc").unwrap().add_scope("uid").build();
        let tokens = registry.start(source);

        let result = tokens.get(&TokenId::new("svc")).await;
        assert!(matches!(result, Err(TokenError::FetchFailed { .. })));
    }

    #[tokio::test]
    async fn test_invalidate_forces_refetch() {
        let source = Arc::new(CountingSource::new(3600));
        let mut registry = registry();
        registry.manage_token("svc").unwrap().add_scope("uid").build();
        let tokens = registry.start(source.clone());
        let id = TokenId::new("svc");

        tokens.get(&id).await.unwrap();
        tokens.invalidate(&id).await.unwrap();
        let token = tokens.get(&id).await.unwrap();

        assert_eq!(token.value.expose(), "svc-1");
    }

    /// Token issued 50 minutes into a one hour lifetime: due for refresh, not expired.
    fn aging_source() -> Arc<CountingSource> {
        Arc::new(CountingSource {
            issued_secs_ago: 3000,
            ..CountingSource::new(3600)
        })
    }

    #[tokio::test]
    async fn test_failed_refresh_falls_back_to_cached_token() {
        let source = aging_source();
        let mut registry = registry();
        registry.manage_token("svc").unwrap().add_scope("uid").build();
        let tokens = registry.start(source.clone());
        let id = TokenId::new("svc");

        let first = tokens.get(&id).await.unwrap();
        assert!(first.needs_refresh(40));
        assert!(!first.is_expired());

        source.fail.store(true, Ordering::SeqCst);
        let second = tokens.get(&id).await.unwrap();

        assert_eq!(second.value.expose(), "svc-0");
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_failed_scope_resolution_falls_back_to_cached_token() {
        let source = aging_source();
        let resolutions = Arc::new(AtomicUsize::new(0));
        let counter = resolutions.clone();
        let mut registry = registry();
        registry
            .manage_token("tenant")
            .unwrap()
            .add_dynamic_scopes(move || match counter.fetch_add(1, Ordering::SeqCst) {
                0 => scope_set(["tenant-a"]),
                _ => ScopeSet::new(),
            })
            .build();
        let tokens = registry.start(source.clone());
        let id = TokenId::new("tenant");

        tokens.get(&id).await.unwrap();
        let second = tokens.get(&id).await.unwrap();

        assert_eq!(second.value.expose(), "tenant-0");
        assert_eq!(resolutions.load(Ordering::SeqCst), 2);
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failed_scope_resolution_without_cache_propagates() {
        let mut registry = registry();
        registry
            .manage_token("tenant")
            .unwrap()
            .add_dynamic_scopes(ScopeSet::new)
            .build();
        let tokens = registry.start(aging_source());

        let result = tokens.get(&TokenId::new("tenant")).await;
        assert!(matches!(result, Err(TokenError::Scopes(ConfigError::EmptyScopes { .. }))));
    }
}
