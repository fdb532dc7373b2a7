//! # Tokenwright Core
//!
//! Declare the access tokens a process needs once at startup, then ask for a
//! valid token by name whenever one is needed.
//!
//! This crate provides:
//! - A fluent builder chain for declaring token identifiers and their scopes
//! - Static scopes fixed at startup and dynamic scopes computed per request
//! - An immutable configuration snapshot for the token engine
//! - TOML declaration files and environment-based endpoint lookup
//! - An on-demand token cache over a pluggable [`TokenSource`]
//!
//! ## Quick Start
//!
//! ```rust
//! use tokenwright_core::{tokens, TokenId, Url};
//!
//! # fn main() -> Result<(), tokenwright_core::ConfigError> {
//! let endpoint = Url::parse("https://auth.example.com/oauth2/access_token").unwrap();
//! let mut registry = tokens::create_access_tokens_with_uri(endpoint);
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
//! let svc2 = config.get(&TokenId::new("svc2")).unwrap();
//! assert_eq!(svc2.resolve_scopes()?.len(), 1);
//! # Ok(())
//! # }
//! ```

pub mod builder;
pub mod config;
pub mod declaration;
pub mod engine;
pub mod error;
pub mod model;
pub mod scope;
pub mod token;
pub mod tokens;

// Re-export commonly used types at crate root
pub use model::{
    TokenId,
    Scope,
    ScopeSet,
};

pub use scope::{
    ScopeProvider,
    ScopeResolution,
};

pub use builder::{
    AccessTokensBuilder,
    AccessTokenConfigurationBuilder,
    StaticScopeBuilder,
    DynamicScopeBuilder,
};

pub use config::{
    AccessTokenConfiguration,
    AccessTokensConfig,
};

pub use token::{
    AccessToken,
    Secret,
    TokenRequest,
    TokenSource,
};

pub use engine::AccessTokens;

pub use declaration::TokensDeclaration;

pub use error::{ConfigError, Error, TokenError};

pub use url::Url;
