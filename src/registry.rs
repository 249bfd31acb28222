//! Environment registry and selection.
//!
//! Maps environment codes to configuration classes. Exactly one concrete
//! class is selected per process: an explicit code argument wins, then the
//! `ENV_CODE` process variable, then the registry's default code.

use crate::error::ConfigError;
use crate::schema::ConfigClass;
use std::sync::Arc;

/// Process environment variable naming the active environment code.
pub const ENV_CODE_VAR: &str = "ENV_CODE";

/// A registered environment.
#[derive(Debug, Clone)]
pub struct EnvEntry {
    /// Coarse grouping, e.g. "local" or "deployed".
    pub env_type: &'static str,
    /// Unique short code used by the selector.
    pub code: &'static str,
    pub long_name: &'static str,
    pub description: &'static str,
    pub class: Arc<ConfigClass>,
}

/// Registry of selectable environments.
#[derive(Debug, Clone)]
pub struct EnvironmentRegistry {
    entries: Vec<EnvEntry>,
    default_code: &'static str,
}

impl EnvironmentRegistry {
    /// Build a registry from entries and a documented default code.
    pub fn new(entries: Vec<EnvEntry>, default_code: &'static str) -> Self {
        Self {
            entries,
            default_code,
        }
    }

    /// Registry of the built-in environments, defaulting to local.
    pub fn builtin() -> Self {
        Self::new(crate::envs::builtin_entries(), crate::envs::LOCAL_ENV_CODE)
    }

    pub fn entries(&self) -> &[EnvEntry] {
        &self.entries
    }

    pub fn default_code(&self) -> &'static str {
        self.default_code
    }

    /// Look up an environment by code.
    pub fn get(&self, code: &str) -> Result<&EnvEntry, ConfigError> {
        self.entries
            .iter()
            .find(|entry| entry.code == code)
            .ok_or_else(|| ConfigError::unknown_environment(code))
    }

    /// Select the active environment: explicit code, else `ENV_CODE`, else
    /// the default code.
    pub fn select(&self, explicit: Option<&str>) -> Result<&EnvEntry, ConfigError> {
        let code = match explicit {
            Some(code) => code.to_string(),
            None => std::env::var(ENV_CODE_VAR)
                .unwrap_or_else(|_| self.default_code.to_string()),
        };
        self.get(&code)
    }
}
