//! CLI definitions and override-token parsing.
//!
//! The CLI structure uses clap's derive macros, with the `--config` flag
//! accepting space-separated `KEY=VALUE` tokens that feed the
//! explicit-argument layer.

use crate::error::ConfigError;
use clap::{Parser, Subcommand, ValueEnum};
use serde_json::Value;
use std::collections::BTreeMap;

/// Output format for the resolve subcommand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Aligned text table
    #[default]
    Text,
    /// Pretty-printed JSON audit snapshot
    Json,
}

/// Layered configuration resolver
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Environment code to resolve (overrides ENV_CODE)
    #[arg(short, long, global = true)]
    pub env: Option<String>,

    /// Path to a dotenv file supplying overrides
    #[arg(long, global = true)]
    pub env_file: Option<String>,

    /// Space-separated KEY=VALUE override tokens
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Logging output: 0/off, 1/stdout, 2/stderr (default), or filename
    #[arg(short, long, default_value = "2", global = true)]
    pub log: String,

    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Resolve the configuration and print an audit snapshot (default)
    Resolve {
        /// Output format
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Print a single resolved field (opaque fields included)
    Get {
        /// Field name
        name: String,
    },

    /// List registered environments
    Envs,
}

/// Parse a `--config` token string (`"A=1 B=2"`) into an explicit-argument
/// map. Values arrive as strings, like any other text layer.
pub fn parse_override_tokens(tokens: &str) -> Result<BTreeMap<String, Value>, ConfigError> {
    let mut map = BTreeMap::new();
    for token in tokens.split_whitespace() {
        let (key, value) = token
            .split_once('=')
            .ok_or_else(|| ConfigError::invalid_token(token))?;
        if key.is_empty() {
            return Err(ConfigError::invalid_token(token));
        }
        map.insert(key.to_string(), Value::String(value.to_string()));
    }
    Ok(map)
}

/// Scan raw process arguments for `--config` tokens.
///
/// Used by the memoized global load so command-line overrides behave exactly
/// like constructor arguments.
pub fn overrides_from_args(
    mut args: impl Iterator<Item = String>,
) -> Result<BTreeMap<String, Value>, ConfigError> {
    let mut map = BTreeMap::new();
    while let Some(arg) = args.next() {
        let tokens = if arg == "--config" || arg == "-c" {
            match args.next() {
                Some(tokens) => tokens,
                None => break,
            }
        } else if let Some(tokens) = arg.strip_prefix("--config=") {
            tokens.to_string()
        } else {
            continue;
        };
        map.append(&mut parse_override_tokens(&tokens)?);
    }
    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_single_token() {
        let map = parse_override_tokens("COMPONENT_NAME=renamed").unwrap();
        assert_eq!(map.get("COMPONENT_NAME").unwrap(), &json!("renamed"));
    }

    #[test]
    fn test_parse_multiple_tokens() {
        let map = parse_override_tokens("A=1 B=two C=").unwrap();
        assert_eq!(map.get("A").unwrap(), &json!("1"));
        assert_eq!(map.get("B").unwrap(), &json!("two"));
        // An empty value is still an explicit override.
        assert_eq!(map.get("C").unwrap(), &json!(""));
    }

    #[test]
    fn test_parse_rejects_malformed_token() {
        assert!(matches!(
            parse_override_tokens("NOT_A_PAIR").unwrap_err(),
            ConfigError::InvalidOverrideToken { .. }
        ));
        assert!(matches!(
            parse_override_tokens("=missing_key").unwrap_err(),
            ConfigError::InvalidOverrideToken { .. }
        ));
    }

    #[test]
    fn test_overrides_from_args() {
        let args = [
            "serve".to_string(),
            "--config".to_string(),
            "A=1 B=2".to_string(),
            "--config=C=3".to_string(),
            "--other".to_string(),
        ];
        let map = overrides_from_args(args.into_iter()).unwrap();
        assert_eq!(map.get("A").unwrap(), &json!("1"));
        assert_eq!(map.get("B").unwrap(), &json!("2"));
        assert_eq!(map.get("C").unwrap(), &json!("3"));
        assert_eq!(map.len(), 3);
    }

    #[test]
    fn test_overrides_from_args_without_flag() {
        let map = overrides_from_args(["serve".to_string()].into_iter()).unwrap();
        assert!(map.is_empty());
    }
}
