//! Structured error types for configuration resolution.
//!
//! Every error is fatal for the current resolution attempt: there is no
//! partial or degraded configuration. Errors carry the offending field name
//! and the declaration site or layer responsible.

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors raised while classifying, resolving, or reading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Attempt to resolve an abstract base environment directly.
    #[error("environment '{env_code}' is an abstract base and cannot be resolved directly")]
    AbstractInstantiation { env_code: String },

    /// A field declaration violates an authoring rule (derived field with a
    /// non-unset default, resolver reading an untyped or not-yet-resolved
    /// field, and similar).
    #[error("invalid declaration for field '{field}': {reason}")]
    InvalidFieldDeclaration { field: String, reason: String },

    /// A subclass redeclares an ancestor's opaque field as a plain value.
    /// The plain value would be shadowed by the inherited computed accessor
    /// and silently never take effect.
    #[error(
        "field '{field}' declared as {child_kind} in '{env_code}' shadows an opaque \
         declaration in ancestor '{ancestor_code}'"
    )]
    AmbiguousOverrideShadowing {
        field: String,
        env_code: String,
        ancestor_code: String,
        child_kind: String,
    },

    /// A supplied dotenv path could not be read or parsed.
    #[error("cannot read dotenv file {path:?}: {source}")]
    SourceRead {
        path: PathBuf,
        #[source]
        source: dotenvy::Error,
    },

    /// Environment code not present in the registry.
    #[error("unknown environment code '{code}'")]
    UnknownEnvironment { code: String },

    /// Field name not declared by the selected configuration class.
    #[error("unknown configuration field '{field}'")]
    UnknownField { field: String },

    /// A `--config` token was not of the form `KEY=VALUE`.
    #[error("malformed override token '{token}': expected KEY=VALUE")]
    InvalidOverrideToken { token: String },
}

impl ConfigError {
    // Convenience constructors

    pub fn abstract_instantiation(env_code: &str) -> Self {
        Self::AbstractInstantiation {
            env_code: env_code.to_string(),
        }
    }

    pub fn invalid_declaration(field: &str, reason: impl Into<String>) -> Self {
        Self::InvalidFieldDeclaration {
            field: field.to_string(),
            reason: reason.into(),
        }
    }

    pub fn shadowed(field: &str, env_code: &str, ancestor_code: &str, child_kind: &str) -> Self {
        Self::AmbiguousOverrideShadowing {
            field: field.to_string(),
            env_code: env_code.to_string(),
            ancestor_code: ancestor_code.to_string(),
            child_kind: child_kind.to_string(),
        }
    }

    pub fn source_read(path: &Path, source: dotenvy::Error) -> Self {
        Self::SourceRead {
            path: path.to_path_buf(),
            source,
        }
    }

    pub fn unknown_environment(code: &str) -> Self {
        Self::UnknownEnvironment {
            code: code.to_string(),
        }
    }

    pub fn unknown_field(field: &str) -> Self {
        Self::UnknownField {
            field: field.to_string(),
        }
    }

    pub fn invalid_token(token: &str) -> Self {
        Self::InvalidOverrideToken {
            token: token.to_string(),
        }
    }
}

/// Result type for configuration operations.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;
