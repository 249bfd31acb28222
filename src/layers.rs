//! Override layer stack.
//!
//! Five ordered sources supply raw values for plain and derived fields,
//! lowest to highest precedence: base-class defaults, subclass overrides,
//! dotenv-file values, process environment variables, and explicit arguments
//! (constructor map or `--config KEY=VALUE` tokens). A higher layer's value
//! always wins. Opaque fields never consult the layers above the subclass
//! level; a dotenv entry or environment variable matching an opaque field's
//! name is silently ignored for that field.

use crate::classify::{ClassifiedField, FieldTable};
use crate::error::ConfigError;
use crate::schema::FieldKind;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::trace;

/// Override source, lowest to highest precedence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum OverrideLayer {
    /// Base-class static default
    Default = 0,
    /// Subclass-declared override (inheritance)
    SubclassOverride = 1,
    /// Value from a supplied dotenv file
    DotenvFile = 2,
    /// Process environment variable named exactly like the field
    EnvironmentVariable = 3,
    /// Constructor argument or `--config KEY=VALUE` token (highest)
    ExplicitArgument = 4,
}

impl std::fmt::Display for OverrideLayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OverrideLayer::Default => write!(f, "default"),
            OverrideLayer::SubclassOverride => write!(f, "subclass"),
            OverrideLayer::DotenvFile => write!(f, "dotenv"),
            OverrideLayer::EnvironmentVariable => write!(f, "env"),
            OverrideLayer::ExplicitArgument => write!(f, "explicit"),
        }
    }
}

/// External value sources for one resolution.
#[derive(Debug, Clone, Default)]
pub struct LayeredSources {
    /// Environment code overriding the `ENV_CODE` selector variable.
    pub env_code: Option<String>,
    /// Optional dotenv file. A missing or unreadable file at a supplied path
    /// is fatal; no path means the layer is skipped.
    pub dotenv_path: Option<PathBuf>,
    /// Explicit-argument layer: constructor map or parsed `--config` tokens.
    pub explicit: BTreeMap<String, Value>,
}

impl LayeredSources {
    pub fn new() -> Self {
        Self::default()
    }

    /// Select the environment explicitly instead of via `ENV_CODE`.
    pub fn with_env_code(mut self, code: impl Into<String>) -> Self {
        self.env_code = Some(code.into());
        self
    }

    /// Supply a dotenv file path.
    pub fn with_dotenv(mut self, path: impl Into<PathBuf>) -> Self {
        self.dotenv_path = Some(path.into());
        self
    }

    /// Add one explicit-argument override.
    pub fn with_arg(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.explicit.insert(key.into(), value.into());
        self
    }

    /// Replace the explicit-argument map.
    pub fn with_args(mut self, args: BTreeMap<String, Value>) -> Self {
        self.explicit = args;
        self
    }
}

/// A raw field value together with the layer that supplied it.
#[derive(Debug, Clone)]
pub struct RawValue {
    pub value: Value,
    pub layer: OverrideLayer,
}

/// Read a dotenv file into a key/value map without touching the process
/// environment. The environment-variable layer must keep outranking dotenv
/// entries, which rules out loading them into the environment itself.
pub(crate) fn read_dotenv(path: &Path) -> Result<BTreeMap<String, String>, ConfigError> {
    let iter = dotenvy::from_path_iter(path).map_err(|e| ConfigError::source_read(path, e))?;
    let mut map = BTreeMap::new();
    for item in iter {
        let (key, value) = item.map_err(|e| ConfigError::source_read(path, e))?;
        map.insert(key, value);
    }
    Ok(map)
}

/// Apply layers 1-5 to a single plain or derived field.
fn raw_value(
    field: &ClassifiedField,
    root_code: &str,
    dotenv: &BTreeMap<String, String>,
    explicit: &BTreeMap<String, Value>,
) -> RawValue {
    // Layers 1 and 2: the classifier already encodes subclass-over-parent, so
    // the most-derived static default stands in for both.
    let declaring_layer = if field.declared_in == root_code {
        OverrideLayer::Default
    } else {
        OverrideLayer::SubclassOverride
    };
    let mut raw = RawValue {
        value: field.default.clone(),
        layer: declaring_layer,
    };

    if let Some(value) = dotenv.get(field.name) {
        raw = RawValue {
            value: Value::String(value.clone()),
            layer: OverrideLayer::DotenvFile,
        };
    }

    // Always consulted, independent of dotenv presence.
    if let Ok(value) = std::env::var(field.name) {
        raw = RawValue {
            value: Value::String(value),
            layer: OverrideLayer::EnvironmentVariable,
        };
    }

    if let Some(value) = explicit.get(field.name) {
        raw = RawValue {
            value: value.clone(),
            layer: OverrideLayer::ExplicitArgument,
        };
    }

    raw
}

/// Resolve the raw value of every plain and derived field in the table.
///
/// Opaque fields are skipped by construction; they have no entry in the
/// returned map.
pub(crate) fn resolve_raw(
    table: &FieldTable,
    root_code: &str,
    sources: &LayeredSources,
) -> Result<BTreeMap<&'static str, RawValue>, ConfigError> {
    let dotenv = match &sources.dotenv_path {
        Some(path) => read_dotenv(path)?,
        None => BTreeMap::new(),
    };

    let mut raw = BTreeMap::new();
    for field in table.fields() {
        if field.kind == FieldKind::Opaque {
            continue;
        }
        let value = raw_value(field, root_code, &dotenv, &sources.explicit);
        trace!(field = field.name, layer = %value.layer, "raw value resolved");
        raw.insert(field.name, value);
    }
    Ok(raw)
}
