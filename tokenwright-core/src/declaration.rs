//! Token declarations loaded from TOML files.
//!
//! A declaration file describes a registry without code:
//!
//! ```toml
//! token_endpoint = "https://auth.example.com/oauth2/access_token"
//! refresh_percent_left = 40
//!
//! [[tokens]]
//! id = "billing"
//! scopes = ["uid", "billing.read"]
//!
//! [[tokens]]
//! id = "tenant-sync"
//! scopes_from_env = "TENANT_SYNC_SCOPES"
//! ```
//!
//! Entries are replayed through the regular builder chain, so a file is held
//! to exactly the same rules as code. `scopes_from_env` declares dynamic
//! scopes: the variable is read every time scopes are resolved.

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::builder::AccessTokensBuilder;
use crate::error::ConfigError;
use crate::model::{Scope, ScopeSet};
use crate::tokens::{ACCESS_TOKEN_URL_ENV, endpoint_from_env_value, parse_endpoint};

/// File name looked up in the platform configuration directory.
pub const DEFAULT_FILE_NAME: &str = "tokens.toml";

/// Top-level contents of a declaration file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TokensDeclaration {
    /// Token endpoint. Falls back to `OAUTH2_ACCESS_TOKEN_URL` when absent.
    #[serde(default)]
    pub token_endpoint: Option<String>,

    /// Refresh threshold in percent of token lifetime.
    #[serde(default)]
    pub refresh_percent_left: Option<u8>,

    /// Declared tokens, in registration order.
    #[serde(default)]
    pub tokens: Vec<TokenDeclaration>,
}

/// One declared token.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TokenDeclaration {
    /// Token identifier.
    pub id: String,

    /// Fixed scopes.
    #[serde(default)]
    pub scopes: Option<Vec<String>>,

    /// Environment variable read for scopes at every resolution.
    #[serde(default)]
    pub scopes_from_env: Option<String>,
}

impl TokensDeclaration {
    /// Parse a declaration from TOML text.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        toml::from_str(contents).map_err(|e| ConfigError::Declaration {
            message: e.to_string(),
        })
    }

    /// Read and parse a declaration file.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::Declaration {
            message: format!("failed to read {}: {}", path.display(), e),
        })?;
        debug!(path = %path.display(), "loaded token declaration");
        Self::from_toml_str(&contents).map_err(|e| match e {
            ConfigError::Declaration { message } => ConfigError::Declaration {
                message: format!("{}: {}", path.display(), message),
            },
            other => other,
        })
    }

    /// Default declaration path in the platform configuration directory.
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("com", "raibid-labs", "tokenwright")
            .map(|d| d.config_dir().join(DEFAULT_FILE_NAME))
    }

    /// Replay the declaration through the builder chain.
    pub fn into_builder(self) -> Result<AccessTokensBuilder, ConfigError> {
        let endpoint = match self.token_endpoint.as_deref() {
            Some(value) => parse_endpoint(value).map_err(|e| ConfigError::Declaration {
                message: format!("invalid token_endpoint '{}': {}", value, e),
            })?,
            None => endpoint_from_env_value(std::env::var(ACCESS_TOKEN_URL_ENV).ok().as_deref())?,
        };

        let mut builder = AccessTokensBuilder::new(endpoint);
        if let Some(percent) = self.refresh_percent_left {
            builder.refresh_percent_left(percent)?;
        }
        for token in self.tokens {
            token.register(&mut builder)?;
        }
        Ok(builder)
    }
}

impl TokenDeclaration {
    fn register(self, builder: &mut AccessTokensBuilder) -> Result<(), ConfigError> {
        match (self.scopes, self.scopes_from_env) {
            (Some(scopes), None) => {
                builder.manage_token(self.id)?.add_scopes(scopes)?.build();
            }
            (None, Some(var)) => {
                builder
                    .manage_token(self.id)?
                    .add_dynamic_scopes(move || scopes_from_env(&var))
                    .build();
            }
            _ => {
                return Err(ConfigError::Declaration {
                    message: format!(
                        "token '{}' must set exactly one of `scopes` or `scopes_from_env`",
                        self.id
                    ),
                });
            }
        }
        Ok(())
    }
}

fn scopes_from_env(var: &str) -> ScopeSet {
    split_scopes(&std::env::var(var).unwrap_or_default())
}

/// Split a scope list separated by whitespace or commas.
fn split_scopes(value: &str) -> ScopeSet {
    value
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|s| !s.is_empty())
        .map(Scope::from)
        .collect()
}
