//! Process-wide resolution cache.
//!
//! Memoizes the fully-resolved configuration singleton. Cache hits are
//! lock-free; concurrent misses coalesce into exactly one resolution, and
//! every waiting caller receives the same snapshot. Invalidation discards the
//! snapshot so the next load re-reads the dotenv and environment-variable
//! layers fresh; it is intended for test and administrative callers only.

use crate::cli::overrides_from_args;
use crate::error::ConfigError;
use crate::layers::LayeredSources;
use crate::registry::EnvironmentRegistry;
use crate::resolved::ResolvedConfig;
use crate::resolver::resolve_class;
use arc_swap::ArcSwapOption;
use std::sync::{Arc, Mutex, OnceLock};
use tracing::{debug, info};

/// Memoizing cache in front of an environment registry.
pub struct ConfigCache {
    registry: EnvironmentRegistry,
    slot: ArcSwapOption<ResolvedConfig>,
    resolve_lock: Mutex<()>,
}

impl ConfigCache {
    pub fn new(registry: EnvironmentRegistry) -> Self {
        Self {
            registry,
            slot: ArcSwapOption::empty(),
            resolve_lock: Mutex::new(()),
        }
    }

    pub fn registry(&self) -> &EnvironmentRegistry {
        &self.registry
    }

    /// Load the resolved configuration, resolving on a miss.
    ///
    /// On a hit the memoized snapshot is returned without re-reading any
    /// layer; `sources` only matter for the resolution that fills the cache.
    pub fn load(&self, sources: &LayeredSources) -> Result<Arc<ResolvedConfig>, ConfigError> {
        if let Some(config) = self.slot.load_full() {
            return Ok(config);
        }

        // Single-flight: concurrent misses wait here and then observe the
        // winner's snapshot in the double-check.
        let _guard = self
            .resolve_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(config) = self.slot.load_full() {
            return Ok(config);
        }

        debug!("configuration cache miss; resolving");
        let entry = self.registry.select(sources.env_code.as_deref())?;
        let resolved = Arc::new(resolve_class(&entry.class, sources)?);
        self.slot.store(Some(resolved.clone()));
        info!(environment = entry.code, fields = resolved.len(), "configuration resolved");
        Ok(resolved)
    }

    /// Current snapshot without triggering resolution.
    pub fn peek(&self) -> Option<Arc<ResolvedConfig>> {
        self.slot.load_full()
    }

    /// Discard the memoized snapshot. Held references stay valid and
    /// unchanged; the next load resolves fresh.
    pub fn invalidate(&self) {
        self.slot.store(None);
        debug!("configuration cache invalidated");
    }
}

impl std::fmt::Debug for ConfigCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigCache")
            .field("registry", &self.registry)
            .field("cached", &self.slot.load().is_some())
            .finish_non_exhaustive()
    }
}

static GLOBAL: OnceLock<ConfigCache> = OnceLock::new();

fn global() -> &'static ConfigCache {
    GLOBAL.get_or_init(|| ConfigCache::new(EnvironmentRegistry::builtin()))
}

/// Load the process configuration from the built-in registry, memoized.
///
/// Scans the process arguments for `--config KEY=VALUE` tokens; they feed the
/// explicit-argument layer exactly like constructor arguments, so a process
/// must not supply both for the same field.
pub fn load_configuration() -> Result<Arc<ResolvedConfig>, ConfigError> {
    let explicit = overrides_from_args(std::env::args().skip(1))?;
    global().load(&LayeredSources::new().with_args(explicit))
}

/// Load the process configuration with explicit sources, memoized.
pub fn load_configuration_with(
    sources: &LayeredSources,
) -> Result<Arc<ResolvedConfig>, ConfigError> {
    global().load(sources)
}

/// Discard the global snapshot (test/admin entry point).
pub fn invalidate_configuration() {
    global().invalidate();
}
