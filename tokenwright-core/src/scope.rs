//! Scope resolution strategies.
//!
//! A token's scopes are either fixed when the token is declared
//! ([`ScopeResolution::Static`]) or computed each time a token is requested
//! ([`ScopeResolution::Dynamic`]). Keeping the two apart lets the engine skip
//! calling a function for scopes that never change.

use std::fmt;
use std::sync::Arc;

use crate::model::ScopeSet;

/// A zero-argument function yielding the current scopes for a token.
///
/// Providers may be called from any thread, repeatedly, and may return a
/// different set on each call (e.g., tenant-scoped tokens). The engine calls a
/// provider at most once at a time per token identifier.
#[derive(Clone)]
pub struct ScopeProvider(Arc<dyn Fn() -> ScopeSet + Send + Sync>);

impl ScopeProvider {
    /// Wrap a function as a scope provider.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn() -> ScopeSet + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    /// Invoke the provider.
    pub fn get(&self) -> ScopeSet {
        (self.0)()
    }

    /// Compose two providers into one that unions their results.
    ///
    /// Neither provider is invoked until the composed provider is.
    pub fn union(self, other: ScopeProvider) -> ScopeProvider {
        ScopeProvider::new(move || {
            let mut scopes = self.get();
            scopes.extend(other.get());
            scopes
        })
    }
}

impl fmt::Debug for ScopeProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ScopeProvider(<fn>)")
    }
}

/// How a token's scopes are determined.
#[derive(Debug, Clone)]
pub enum ScopeResolution {
    /// Scopes fixed at configuration time. Never empty.
    Static(ScopeSet),

    /// Scopes recomputed by invoking the provider on every resolution.
    Dynamic(ScopeProvider),
}

impl ScopeResolution {
    /// Produce the current scope set.
    ///
    /// Static scopes are cloned; dynamic scopes invoke the provider.
    pub fn resolve(&self) -> ScopeSet {
        match self {
            Self::Static(scopes) => scopes.clone(),
            Self::Dynamic(provider) => provider.get(),
        }
    }

    /// Whether scopes are recomputed on each resolution.
    pub fn is_dynamic(&self) -> bool {
        matches!(self, Self::Dynamic(_))
    }

    /// Short label for the strategy, used in logs and CLI output.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Static(_) => "static",
            Self::Dynamic(_) => "dynamic",
        }
    }
}
