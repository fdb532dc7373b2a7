//! Finalized token configuration.
//!
//! This module provides:
//! - [`AccessTokenConfiguration`] - One token identifier and its scope resolution
//! - [`AccessTokensConfig`] - The immutable snapshot handed to the engine

use std::collections::HashMap;
use std::sync::Arc;

use url::Url;

use crate::error::ConfigError;
use crate::model::{ScopeSet, TokenId};
use crate::scope::ScopeResolution;

/// Default share of a token's lifetime (in percent) that may remain before
/// the token is fetched again.
pub const DEFAULT_REFRESH_PERCENT_LEFT: u8 = 40;

/// Immutable pairing of a token identifier with its scope resolution.
#[derive(Debug, Clone)]
pub struct AccessTokenConfiguration {
    token_id: TokenId,
    scopes: ScopeResolution,
}

impl AccessTokenConfiguration {
    pub(crate) fn new(token_id: TokenId, scopes: ScopeResolution) -> Self {
        Self { token_id, scopes }
    }

    /// The identifier this configuration is registered under.
    pub fn token_id(&self) -> &TokenId {
        &self.token_id
    }

    /// The scope resolution strategy.
    pub fn scope_resolution(&self) -> &ScopeResolution {
        &self.scopes
    }

    /// Resolve the current scopes for this token.
    ///
    /// Dynamic providers are invoked on every call. A provider that yields no
    /// scopes is rejected with [`ConfigError::EmptyScopes`].
    pub fn resolve_scopes(&self) -> Result<ScopeSet, ConfigError> {
        let scopes = self.scopes.resolve();
        if scopes.is_empty() {
            return Err(ConfigError::EmptyScopes {
                token_id: self.token_id.clone(),
            });
        }
        Ok(scopes)
    }
}

#[derive(Debug)]
struct Snapshot {
    endpoint: Url,
    refresh_percent_left: u8,
    entries: Vec<AccessTokenConfiguration>,
    index: HashMap<TokenId, usize>,
}

/// Immutable snapshot of every configured token.
///
/// Produced by [`AccessTokensBuilder::freeze`](crate::AccessTokensBuilder::freeze).
/// Cloning is cheap; clones share the same entries.
#[derive(Debug, Clone)]
pub struct AccessTokensConfig {
    inner: Arc<Snapshot>,
}

impl AccessTokensConfig {
    pub(crate) fn new(
        endpoint: Url,
        refresh_percent_left: u8,
        entries: Vec<AccessTokenConfiguration>,
    ) -> Self {
        let index = entries
            .iter()
            .enumerate()
            .map(|(i, c)| (c.token_id.clone(), i))
            .collect();
        Self {
            inner: Arc::new(Snapshot {
                endpoint,
                refresh_percent_left,
                entries,
                index,
            }),
        }
    }

    /// The token endpoint all tokens are requested from.
    pub fn endpoint(&self) -> &Url {
        &self.inner.endpoint
    }

    /// Percentage of lifetime left at which a cached token is replaced.
    pub fn refresh_percent_left(&self) -> u8 {
        self.inner.refresh_percent_left
    }

    /// Look up the configuration for a token.
    pub fn get(&self, token_id: &TokenId) -> Option<&AccessTokenConfiguration> {
        self.inner
            .index
            .get(token_id)
            .map(|&i| &self.inner.entries[i])
    }

    /// Iterate configurations in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &AccessTokenConfiguration> {
        self.inner.entries.iter()
    }

    /// Token identifiers in registration order.
    pub fn token_ids(&self) -> Vec<&TokenId> {
        self.iter().map(AccessTokenConfiguration::token_id).collect()
    }

    /// Number of configured tokens.
    pub fn len(&self) -> usize {
        self.inner.entries.len()
    }

    /// Check if no tokens are configured.
    pub fn is_empty(&self) -> bool {
        self.inner.entries.is_empty()
    }
}
