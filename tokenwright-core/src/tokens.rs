//! Entry points for creating an [`AccessTokensBuilder`].
//!
//! If the environment exposes the token endpoint via `OAUTH2_ACCESS_TOKEN_URL`,
//! use [`create_access_tokens`]; otherwise pass the URL explicitly with
//! [`create_access_tokens_with_uri`].

use url::Url;

use crate::builder::AccessTokensBuilder;
use crate::error::ConfigError;

/// Environment variable holding the token endpoint URL.
pub const ACCESS_TOKEN_URL_ENV: &str = "OAUTH2_ACCESS_TOKEN_URL";

/// Create a registry for tokens issued by `access_token_uri`.
pub fn create_access_tokens_with_uri(access_token_uri: Url) -> AccessTokensBuilder {
    AccessTokensBuilder::new(access_token_uri)
}

/// Create a registry reading the token endpoint from `OAUTH2_ACCESS_TOKEN_URL`.
///
/// Fails with [`ConfigError::MissingConfiguration`] if the variable is unset
/// or does not hold an absolute URL.
pub fn create_access_tokens() -> Result<AccessTokensBuilder, ConfigError> {
    let value = std::env::var(ACCESS_TOKEN_URL_ENV).ok();
    let endpoint = endpoint_from_env_value(value.as_deref())?;
    Ok(create_access_tokens_with_uri(endpoint))
}

pub(crate) fn endpoint_from_env_value(value: Option<&str>) -> Result<Url, ConfigError> {
    let value = value.ok_or_else(|| ConfigError::MissingConfiguration {
        message: format!("environment variable {} not set", ACCESS_TOKEN_URL_ENV),
    })?;
    parse_endpoint(value).map_err(|e| ConfigError::MissingConfiguration {
        message: format!(
            "environment variable {} cannot be converted to a URL: {}",
            ACCESS_TOKEN_URL_ENV, e
        ),
    })
}

pub(crate) fn parse_endpoint(value: &str) -> Result<Url, url::ParseError> {
    Url::parse(value.trim())
}
