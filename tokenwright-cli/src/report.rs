//! Summaries of a loaded configuration for `tokenwright check`.

use std::fmt;

use serde::Serialize;
use tokenwright_core::{AccessTokensConfig, ScopeResolution};

/// Serializable view of a configuration snapshot.
///
/// Dynamic scopes are listed without invoking their providers.
#[derive(Debug, Serialize)]
pub struct Summary {
    pub endpoint: String,
    pub refresh_percent_left: u8,
    pub tokens: Vec<TokenSummary>,
}

#[derive(Debug, Serialize)]
pub struct TokenSummary {
    pub id: String,
    pub kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scopes: Option<Vec<String>>,
}

impl Summary {
    pub fn from_config(config: &AccessTokensConfig) -> Self {
        let tokens = config
            .iter()
            .map(|c| TokenSummary {
                id: c.token_id().to_string(),
                kind: c.scope_resolution().kind(),
                scopes: match c.scope_resolution() {
                    ScopeResolution::Static(scopes) => {
                        Some(scopes.iter().map(|s| s.to_string()).collect())
                    }
                    ScopeResolution::Dynamic(_) => None,
                },
            })
            .collect();

        Self {
            endpoint: config.endpoint().to_string(),
            refresh_percent_left: config.refresh_percent_left(),
            tokens,
        }
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Endpoint: {}", self.endpoint)?;
        writeln!(f, "Refresh at: {}% lifetime left", self.refresh_percent_left)?;
        writeln!(f, "Tokens ({}):", self.tokens.len())?;
        for token in &self.tokens {
            match &token.scopes {
                Some(scopes) => writeln!(f, "  {} [{}] {}", token.id, token.kind, scopes.join(" "))?,
                None => writeln!(f, "  {} [{}] resolved per request", token.id, token.kind)?,
            }
        }
        Ok(())
    }
}
