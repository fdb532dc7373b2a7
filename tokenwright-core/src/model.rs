//! Domain model types for tokenwright.
//!
//! This module defines the identifiers used throughout the crate:
//! - [`TokenId`] - Caller-chosen key naming one managed credential slot
//! - [`Scope`] - An opaque authorization scope value
//! - [`ScopeSet`] - A deduplicated set of scopes

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Identifier for a managed access token (e.g., "billing", "tenant-sync").
///
/// The identifier is the lookup key for a live token, so it must be unique
/// within one registry. Emptiness is checked when the identifier is handed to
/// [`AccessTokensBuilder::manage_token`](crate::AccessTokensBuilder::manage_token).
///
/// # Examples
///
/// ```
/// use tokenwright_core::TokenId;
///
/// let billing = TokenId::new("billing");
/// assert_eq!(billing.as_str(), "billing");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenId(String);

impl TokenId {
    /// Create a new token ID.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the token ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the identifier is empty or whitespace only.
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for TokenId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for TokenId {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&TokenId> for TokenId {
    fn from(id: &TokenId) -> Self {
        id.clone()
    }
}

/// A single OAuth scope value.
///
/// Scopes carry no internal structure; two scopes are the same scope when
/// their values are equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Scope(String);

impl Scope {
    /// Create a new scope.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Get the scope as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Scope {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for Scope {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

/// A deduplicated set of scopes.
///
/// Ordering only makes output deterministic; membership is what matters.
pub type ScopeSet = BTreeSet<Scope>;

/// Build a [`ScopeSet`] from anything that yields scope-like values.
///
/// ```
/// use tokenwright_core::model::scope_set;
///
/// let scopes = scope_set(["read", "uid", "read"]);
/// assert_eq!(scopes.len(), 2);
/// ```
pub fn scope_set<I, S>(values: I) -> ScopeSet
where
    I: IntoIterator<Item = S>,
    S: Into<Scope>,
{
    values.into_iter().map(Into::into).collect()
}

/// Render scopes as the space-delimited `scope` parameter of a token request.
pub fn scope_param(scopes: &ScopeSet) -> String {
    scopes
        .iter()
        .map(Scope::as_str)
        .collect::<Vec<_>>()
        .join(" ")
}
