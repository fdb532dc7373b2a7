//! Tokenwright CLI
//!
//! Command-line interface for validating and inspecting token declaration
//! files.
//!
//! # Usage
//!
//! ```bash
//! # Validate the declaration and list configured tokens
//! tokenwright check
//!
//! # Resolve the current scopes of one token
//! tokenwright --config ./tokens.toml scopes billing
//!
//! # Show the token endpoint in use
//! tokenwright endpoint
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand, ValueEnum};
use tokenwright_core::{AccessTokensConfig, TokenId, TokensDeclaration};
use tracing::debug;
use tracing_subscriber::{EnvFilter, fmt};

mod report;

#[derive(Parser)]
#[command(name = "tokenwright")]
#[command(about = "Validate and inspect access token declarations")]
#[command(version)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Declaration file (defaults to tokens.toml in the platform config directory)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, global = true, value_enum, default_value_t = Format::Text)]
    format: Format,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate the declaration and list configured tokens
    Check,

    /// Resolve the current scopes of a token
    Scopes {
        /// Token identifier
        token_id: String,
    },

    /// Show the token endpoint
    Endpoint,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Text,
    Json,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = load_config(cli.config)?;

    match cli.command {
        Commands::Check => check(&config, cli.format),
        Commands::Scopes { token_id } => scopes(&config, &token_id, cli.format),
        Commands::Endpoint => {
            println!("{}", config.endpoint());
            Ok(())
        }
    }
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<PathBuf>) -> Result<AccessTokensConfig> {
    let path = path
        .or_else(TokensDeclaration::default_path)
        .ok_or_else(|| anyhow!("no declaration file given and no config directory available"))?;
    debug!("Loading declaration from {:?}", path);

    let declaration = TokensDeclaration::load_from_path(&path)
        .with_context(|| format!("Failed to load declaration from {:?}", path))?;
    let registry = declaration
        .into_builder()
        .with_context(|| format!("Invalid declaration in {:?}", path))?;

    Ok(registry.freeze())
}

fn check(config: &AccessTokensConfig, format: Format) -> Result<()> {
    let summary = report::Summary::from_config(config);
    match format {
        Format::Json => println!("{}", serde_json::to_string_pretty(&summary)?),
        Format::Text => print!("{}", summary),
    }
    Ok(())
}

fn scopes(config: &AccessTokensConfig, token_id: &str, format: Format) -> Result<()> {
    let token_id = TokenId::new(token_id);
    let configuration = config
        .get(&token_id)
        .ok_or_else(|| anyhow!("token '{}' is not declared", token_id))?;
    let scopes = configuration
        .resolve_scopes()
        .with_context(|| format!("Failed to resolve scopes for '{}'", token_id))?;

    match format {
        Format::Json => {
            let scopes: Vec<&str> = scopes.iter().map(|s| s.as_str()).collect();
            println!("{}", serde_json::to_string(&scopes)?);
        }
        Format::Text => {
            for scope in &scopes {
                println!("{}", scope);
            }
        }
    }
    Ok(())
}
