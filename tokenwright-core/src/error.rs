//! Error types for tokenwright.

use thiserror::Error;

use crate::model::TokenId;

/// Error raised while assembling a token configuration.
///
/// Every variant is fatal to the step that produced it; nothing is retried or
/// collected for later reporting.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A token was declared with no scopes.
    #[error("no scopes configured for token {token_id}")]
    EmptyScopes { token_id: TokenId },

    /// A token identifier was registered more than once.
    #[error("token {token_id} is already configured")]
    DuplicateTokenId { token_id: TokenId },

    /// A token identifier was empty.
    #[error("token identifier must not be empty")]
    InvalidTokenId,

    /// A required external setting was absent or malformed.
    #[error("missing configuration: {message}")]
    MissingConfiguration { message: String },

    /// A registry setting was out of range.
    #[error("invalid setting: {message}")]
    InvalidSetting { message: String },

    /// A declaration file could not be read or interpreted.
    #[error("invalid declaration: {message}")]
    Declaration { message: String },
}

/// Error raised while obtaining an access token at runtime.
#[derive(Debug, Error)]
pub enum TokenError {
    /// No configuration exists for the requested token.
    #[error("no token configured for {token_id}")]
    UnknownTokenId { token_id: TokenId },

    /// Scope resolution failed.
    #[error("scope resolution failed: {0}")]
    Scopes(#[from] ConfigError),

    /// The token source could not produce a token.
    #[error("token fetch failed: {message}")]
    FetchFailed { message: String },
}

/// Top-level error type encompassing all tokenwright errors.
#[derive(Debug, Error)]
pub enum Error {
    /// Error from configuration assembly.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Error from token acquisition.
    #[error("token error: {0}")]
    Token(#[from] TokenError),
}

