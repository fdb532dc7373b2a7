//! Fluent builder chain for declaring managed tokens.
//!
//! This module provides:
//! - [`AccessTokensBuilder`] - The registry every token is declared in
//! - [`AccessTokenConfigurationBuilder`] - Cursor for one token identifier
//! - [`StaticScopeBuilder`] - Accumulates fixed scope values
//! - [`DynamicScopeBuilder`] - Accumulates scope provider functions
//!
//! The cursor and scope builders hold a mutable borrow of the registry, so
//! only one declaration can be in progress at a time. Finishing a scope
//! builder registers the configuration and hands the registry back for the
//! next declaration.
//!
//! # Example
//!
//! ```
//! use tokenwright_core::{AccessTokensBuilder, TokenId, Url};
//!
//! # fn main() -> Result<(), tokenwright_core::ConfigError> {
//! let mut registry =
//!     AccessTokensBuilder::new(Url::parse("https://auth.example.com/token").unwrap());
//!
//! registry
//!     .manage_token("svc")?
//!     .add_scopes(["uid", "read"])?
//!     .build()
//!     .manage_token("svc2")?
//!     .add_dynamic_scope(|| "dynamic-scope")
//!     .build();
//!
//! let config = registry.freeze();
//! assert_eq!(config.len(), 2);
//! assert!(config.get(&TokenId::new("svc2")).unwrap().scope_resolution().is_dynamic());
//! # Ok(())
//! # }
//! ```

use tracing::debug;
use url::Url;

use crate::config::{AccessTokenConfiguration, AccessTokensConfig, DEFAULT_REFRESH_PERCENT_LEFT};
use crate::error::ConfigError;
use crate::model::{Scope, ScopeSet, TokenId};
use crate::scope::{ScopeProvider, ScopeResolution};

/// Registry of token declarations for one process.
///
/// Entries keep their registration order and each token identifier may be
/// registered once.
#[derive(Debug)]
pub struct AccessTokensBuilder {
    endpoint: Url,
    refresh_percent_left: u8,
    configurations: Vec<AccessTokenConfiguration>,
}

impl AccessTokensBuilder {
    /// Create an empty registry for tokens issued by `endpoint`.
    pub fn new(endpoint: Url) -> Self {
        Self {
            endpoint,
            refresh_percent_left: DEFAULT_REFRESH_PERCENT_LEFT,
            configurations: Vec::new(),
        }
    }

    /// Set the share of a token's lifetime (1-99 percent) that may remain
    /// before the engine fetches a replacement.
    pub fn refresh_percent_left(&mut self, percent: u8) -> Result<&mut Self, ConfigError> {
        if !(1..=99).contains(&percent) {
            return Err(ConfigError::InvalidSetting {
                message: format!("refresh_percent_left must be between 1 and 99, got {}", percent),
            });
        }
        self.refresh_percent_left = percent;
        Ok(self)
    }

    /// Start declaring a token.
    ///
    /// Fails with [`ConfigError::InvalidTokenId`] for an empty identifier and
    /// with [`ConfigError::DuplicateTokenId`] if the identifier is already
    /// registered.
    pub fn manage_token(
        &mut self,
        token_id: impl Into<TokenId>,
    ) -> Result<AccessTokenConfigurationBuilder<'_>, ConfigError> {
        let token_id = token_id.into();
        if token_id.is_blank() {
            return Err(ConfigError::InvalidTokenId);
        }
        if self.contains(&token_id) {
            return Err(ConfigError::DuplicateTokenId { token_id });
        }

        debug!(token_id = %token_id, "declaring token");
        Ok(AccessTokenConfigurationBuilder {
            token_id,
            registry: self,
        })
    }

    /// Append a finalized configuration.
    ///
    /// Only reachable through a scope builder's `build`, after
    /// [`manage_token`](Self::manage_token) has checked the identifier.
    pub(crate) fn add_access_token_configuration(
        &mut self,
        config: AccessTokenConfiguration,
    ) -> &mut Self {
        debug_assert!(!self.contains(config.token_id()));
        debug!(
            token_id = %config.token_id(),
            kind = config.scope_resolution().kind(),
            "registered token configuration"
        );
        self.configurations.push(config);
        self
    }

    /// The token endpoint.
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Check if a token identifier is already registered.
    pub fn contains(&self, token_id: &TokenId) -> bool {
        self.configurations.iter().any(|c| c.token_id() == token_id)
    }

    /// Number of registered tokens.
    pub fn len(&self) -> usize {
        self.configurations.len()
    }

    /// Check if no tokens are registered.
    pub fn is_empty(&self) -> bool {
        self.configurations.is_empty()
    }

    /// Take an immutable snapshot of the registered configurations.
    pub fn freeze(&self) -> AccessTokensConfig {
        AccessTokensConfig::new(
            self.endpoint.clone(),
            self.refresh_percent_left,
            self.configurations.clone(),
        )
    }
}

/// Cursor over the registry for a single token identifier.
///
/// Obtained from [`AccessTokensBuilder::manage_token`]. Choosing how scopes are
/// supplied moves the cursor into a [`StaticScopeBuilder`] or a
/// [`DynamicScopeBuilder`].
#[derive(Debug)]
pub struct AccessTokenConfigurationBuilder<'a> {
    token_id: TokenId,
    registry: &'a mut AccessTokensBuilder,
}

impl<'a> AccessTokenConfigurationBuilder<'a> {
    /// The identifier being declared.
    pub fn token_id(&self) -> &TokenId {
        &self.token_id
    }

    /// Start a fixed scope set with one scope.
    pub fn add_scope(self, scope: impl Into<Scope>) -> StaticScopeBuilder<'a> {
        let mut scopes = ScopeSet::new();
        scopes.insert(scope.into());
        StaticScopeBuilder { parent: self, scopes }
    }

    /// Start a fixed scope set from a collection of scopes.
    ///
    /// The values are copied; fails with [`ConfigError::EmptyScopes`] if the
    /// collection is empty.
    pub fn add_scopes<I, S>(self, scopes: I) -> Result<StaticScopeBuilder<'a>, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: Into<Scope>,
    {
        let scopes = non_empty(&self.token_id, scopes)?;
        Ok(StaticScopeBuilder { parent: self, scopes })
    }

    /// Start a dynamic scope set from a provider of a single scope.
    pub fn add_dynamic_scope<F, S>(self, provider: F) -> DynamicScopeBuilder<'a>
    where
        F: Fn() -> S + Send + Sync + 'static,
        S: Into<Scope>,
    {
        DynamicScopeBuilder {
            parent: self,
            provider: single_scope_provider(provider),
        }
    }

    /// Start a dynamic scope set from a provider of a scope set.
    pub fn add_dynamic_scopes<F>(self, provider: F) -> DynamicScopeBuilder<'a>
    where
        F: Fn() -> ScopeSet + Send + Sync + 'static,
    {
        DynamicScopeBuilder {
            parent: self,
            provider: ScopeProvider::new(provider),
        }
    }

    fn finish(self, scopes: ScopeResolution) -> &'a mut AccessTokensBuilder {
        let Self { token_id, registry } = self;
        registry.add_access_token_configuration(AccessTokenConfiguration::new(token_id, scopes))
    }
}

/// Accumulates a fixed set of scopes for one token.
#[derive(Debug)]
pub struct StaticScopeBuilder<'a> {
    parent: AccessTokenConfigurationBuilder<'a>,
    scopes: ScopeSet,
}

impl<'a> StaticScopeBuilder<'a> {
    /// Add one scope. Duplicates collapse.
    pub fn add_scope(mut self, scope: impl Into<Scope>) -> Self {
        self.scopes.insert(scope.into());
        self
    }

    /// Add a collection of scopes. Fails with [`ConfigError::EmptyScopes`] if
    /// the collection is empty.
    pub fn add_scopes<I, S>(mut self, scopes: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: Into<Scope>,
    {
        let scopes = non_empty(&self.parent.token_id, scopes)?;
        self.scopes.extend(scopes);
        Ok(self)
    }

    /// Scopes accumulated so far.
    pub fn scopes(&self) -> &ScopeSet {
        &self.scopes
    }

    /// Register the token with its fixed scopes and return the registry.
    pub fn build(self) -> &'a mut AccessTokensBuilder {
        self.parent.finish(ScopeResolution::Static(self.scopes))
    }
}

/// Accumulates scope providers for one token.
///
/// Providers are composed, not called: the registered provider invokes each
/// supplied provider at resolution time and unions the results.
#[derive(Debug)]
pub struct DynamicScopeBuilder<'a> {
    parent: AccessTokenConfigurationBuilder<'a>,
    provider: ScopeProvider,
}

impl<'a> DynamicScopeBuilder<'a> {
    /// Add a provider of a single scope.
    pub fn add_scope<F, S>(mut self, provider: F) -> Self
    where
        F: Fn() -> S + Send + Sync + 'static,
        S: Into<Scope>,
    {
        self.provider = self.provider.union(single_scope_provider(provider));
        self
    }

    /// Add a provider of a scope set.
    pub fn add_scopes<F>(mut self, provider: F) -> Self
    where
        F: Fn() -> ScopeSet + Send + Sync + 'static,
    {
        self.provider = self.provider.union(ScopeProvider::new(provider));
        self
    }

    /// Register the token with its provider and return the registry.
    pub fn build(self) -> &'a mut AccessTokensBuilder {
        self.parent.finish(ScopeResolution::Dynamic(self.provider))
    }
}

fn non_empty<I, S>(token_id: &TokenId, scopes: I) -> Result<ScopeSet, ConfigError>
where
    I: IntoIterator<Item = S>,
    S: Into<Scope>,
{
    let scopes: ScopeSet = scopes.into_iter().map(Into::into).collect();
    if scopes.is_empty() {
        return Err(ConfigError::EmptyScopes {
            token_id: token_id.clone(),
        });
    }
    Ok(scopes)
}

fn single_scope_provider<F, S>(provider: F) -> ScopeProvider
where
    F: Fn() -> S + Send + Sync + 'static,
    S: Into<Scope>,
{
    ScopeProvider::new(move || {
        let mut scopes = ScopeSet::new();
        scopes.insert(provider().into());
        scopes
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::scope_set;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn registry() -> AccessTokensBuilder {
        AccessTokensBuilder::new(Url::parse("https://auth.example.com/oauth2/access_token").unwrap())
    }

    #[test]
    fn test_static_scopes_are_deduplicated() {
        let mut registry = registry();
        registry
            .manage_token("svc")
            .unwrap()
            .add_scopes(["uid", "read", "uid"])
            .unwrap()
            .build();

        let config = registry.freeze();
        let svc = config.get(&TokenId::new("svc")).unwrap();
        assert_eq!(svc.resolve_scopes().unwrap(), scope_set(["read", "uid"]));
    }

    #[test]
    fn test_static_union_ignores_call_order() {
        let mut registry = registry();
        registry
            .manage_token("a")
            .unwrap()
            .add_scope("x")
            .add_scopes(["y", "z"])
            .unwrap()
            .build()
            .manage_token("b")
            .unwrap()
            .add_scopes(["z", "y"])
            .unwrap()
            .add_scope("x")
            .build();

        let config = registry.freeze();
        let a = config.get(&TokenId::new("a")).unwrap().resolve_scopes().unwrap();
        let b = config.get(&TokenId::new("b")).unwrap().resolve_scopes().unwrap();
        assert_eq!(a, b);
        assert_eq!(a, scope_set(["x", "y", "z"]));
    }

    #[test]
    fn test_static_scopes_are_copied() {
        let mut caller_scopes = vec!["uid".to_string()];
        let mut registry = registry();
        registry
            .manage_token("svc")
            .unwrap()
            .add_scopes(caller_scopes.iter().cloned())
            .unwrap()
            .build();
        caller_scopes.push("write".to_string());

        let config = registry.freeze();
        let svc = config.get(&TokenId::new("svc")).unwrap();
        assert_eq!(svc.resolve_scopes().unwrap(), scope_set(["uid"]));
    }

    #[test]
    fn test_empty_static_scopes_rejected() {
        let mut registry = registry();
        let err = registry
            .manage_token("svc")
            .unwrap()
            .add_scopes(Vec::<String>::new())
            .unwrap_err();

        assert!(matches!(err, ConfigError::EmptyScopes { .. }));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_empty_scopes_on_static_builder_rejected() {
        let mut registry = registry();
        let err = registry
            .manage_token("svc")
            .unwrap()
            .add_scope("uid")
            .add_scopes(Vec::<&str>::new())
            .unwrap_err();

        assert!(matches!(err, ConfigError::EmptyScopes { .. }));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_duplicate_token_id_rejected() {
        let mut registry = registry();
        registry.manage_token("svc").unwrap().add_scope("uid").build();

        let result = registry.manage_token("svc");
        match result {
            Err(ConfigError::DuplicateTokenId { token_id }) => assert_eq!(token_id.as_str(), "svc"),
            other => panic!("expected duplicate token error, got {:?}", other),
        }

        let result = registry
            .manage_token(TokenId::new("svc"))
            .map(|b| b.add_dynamic_scope(|| "x").build().len());
        assert!(matches!(result, Err(ConfigError::DuplicateTokenId { .. })));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_blank_token_id_rejected() {
        let mut registry = registry();
        assert!(matches!(registry.manage_token(""), Err(ConfigError::InvalidTokenId)));
        assert!(matches!(registry.manage_token("   "), Err(ConfigError::InvalidTokenId)));
    }

    #[test]
    fn test_dynamic_provider_not_invoked_during_assembly() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let mut registry = registry();
        registry
            .manage_token("tenant")
            .unwrap()
            .add_dynamic_scopes(move || {
                counter.fetch_add(1, Ordering::SeqCst);
                scope_set(["tenant-a"])
            })
            .add_scope(|| "audit")
            .build();

        let config = registry.freeze();
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        let tenant = config.get(&TokenId::new("tenant")).unwrap();
        assert_eq!(tenant.resolve_scopes().unwrap(), scope_set(["audit", "tenant-a"]));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_dynamic_provider_results_may_change() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let mut registry = registry();
        registry
            .manage_token("svc")
            .unwrap()
            .add_dynamic_scopes(move || match counter.fetch_add(1, Ordering::SeqCst) {
                0 => scope_set(["a"]),
                _ => scope_set(["b"]),
            })
            .build();

        let config = registry.freeze();
        let svc = config.get(&TokenId::new("svc")).unwrap();
        assert_eq!(svc.resolve_scopes().unwrap(), scope_set(["a"]));
        assert_eq!(svc.resolve_scopes().unwrap(), scope_set(["b"]));
    }

    #[test]
    fn test_dynamic_empty_result_rejected_at_resolution() {
        let mut registry = registry();
        registry
            .manage_token("svc")
            .unwrap()
            .add_dynamic_scopes(ScopeSet::new)
            .build();

        let config = registry.freeze();
        let result = config.get(&TokenId::new("svc")).unwrap().resolve_scopes();
        assert!(matches!(result, Err(ConfigError::EmptyScopes { .. })));
    }

    #[test]
    fn test_registration_order_preserved() {
        let mut registry = registry();
        for id in ["zeta", "alpha", "mid"] {
            registry.manage_token(id).unwrap().add_scope("uid").build();
        }

        let config = registry.freeze();
        let ids: Vec<&str> = config.token_ids().into_iter().map(TokenId::as_str).collect();
        assert_eq!(ids, vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn test_refresh_percent_left_bounds() {
        let mut registry = registry();
        assert!(registry.refresh_percent_left(0).is_err());
        assert!(matches!(
            registry.refresh_percent_left(100),
            Err(ConfigError::InvalidSetting { .. })
        ));
        registry.refresh_percent_left(1).unwrap();
        registry.refresh_percent_left(99).unwrap();
        registry.refresh_percent_left(25).unwrap();
        assert_eq!(registry.freeze().refresh_percent_left(), 25);
    }
}
