//! Access tokens and the source they are fetched from.
//!
//! This module provides:
//! - [`Secret`] - A wrapper for token values that prevents accidental logging
//! - [`AccessToken`] - A fetched access token with its lifetime
//! - [`TokenRequest`] - Everything a source needs to fetch one token
//! - [`TokenSource`] - Trait for the token endpoint exchange

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use url::Url;
use zeroize::Zeroize;

use crate::error::TokenError;
use crate::model::{ScopeSet, TokenId};

/// A secret value that prevents accidental exposure in logs.
///
/// The inner value is only accessible via [`expose()`](Secret::expose) and is
/// zeroed when dropped. Debug and Display show `[REDACTED]`.
#[derive(Clone)]
pub struct Secret(String);

impl Secret {
    /// Create a new secret from a string value.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Expose the secret value.
    ///
    /// Use sparingly and never log the result.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl Drop for Secret {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

impl std::fmt::Debug for Secret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Secret([REDACTED])")
    }
}

impl std::fmt::Display for Secret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[REDACTED]")
    }
}

impl PartialEq for Secret {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Eq for Secret {}

/// An access token returned by a [`TokenSource`].
#[derive(Debug, Clone)]
pub struct AccessToken {
    /// The bearer value.
    pub value: Secret,

    /// Token type (usually "Bearer").
    pub token_type: String,

    /// When the token was issued.
    pub issued_at: DateTime<Utc>,

    /// When the token stops being accepted.
    pub expires_at: DateTime<Utc>,

    /// Scopes the token was requested with.
    pub scopes: ScopeSet,
}

impl AccessToken {
    /// Create a bearer token issued now and valid for `lifetime`.
    pub fn new(value: impl Into<String>, lifetime: Duration) -> Self {
        let issued_at = Utc::now();
        Self {
            value: Secret::new(value),
            token_type: "Bearer".to_string(),
            issued_at,
            expires_at: issued_at + lifetime,
            scopes: ScopeSet::new(),
        }
    }

    /// Set the scopes the token was issued for.
    pub fn with_scopes(mut self, scopes: ScopeSet) -> Self {
        self.scopes = scopes;
        self
    }

    /// Override the issue time.
    pub fn with_issued_at(mut self, issued_at: DateTime<Utc>) -> Self {
        let lifetime = self.expires_at - self.issued_at;
        self.issued_at = issued_at;
        self.expires_at = issued_at + lifetime;
        self
    }

    /// Check if this token has expired.
    pub fn is_expired(&self) -> bool {
        self.expires_at <= Utc::now()
    }

    /// Percentage (0-100) of the token's lifetime still remaining at `now`.
    pub fn percent_left_at(&self, now: DateTime<Utc>) -> u8 {
        let lifetime = (self.expires_at - self.issued_at).num_milliseconds();
        if lifetime <= 0 {
            return 0;
        }
        let left = (self.expires_at - now).num_milliseconds().clamp(0, lifetime);
        (left * 100 / lifetime) as u8
    }

    /// Whether the token should be replaced given the refresh threshold.
    pub fn needs_refresh(&self, refresh_percent_left: u8) -> bool {
        self.is_expired() || self.percent_left_at(Utc::now()) <= refresh_percent_left
    }
}

/// A request for one access token.
#[derive(Debug)]
pub struct TokenRequest<'a> {
    /// The token endpoint.
    pub endpoint: &'a Url,

    /// The token being requested.
    pub token_id: &'a TokenId,

    /// Scopes resolved for this request.
    pub scopes: &'a ScopeSet,
}

/// Performs the exchange with the token endpoint.
///
/// Implementations own the HTTP client, client credentials and any retry
/// policy. The engine calls [`fetch`](TokenSource::fetch) at most once at a
/// time per token identifier.
#[async_trait]
pub trait TokenSource: Send + Sync {
    /// Fetch a fresh access token.
    async fn fetch(&self, request: &TokenRequest<'_>) -> Result<AccessToken, TokenError>;
}

#[async_trait]
impl<T: TokenSource + ?Sized> TokenSource for Arc<T> {
    async fn fetch(&self, request: &TokenRequest<'_>) -> Result<AccessToken, TokenError> {
        (**self).fetch(request).await
    }
}
