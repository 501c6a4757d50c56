//! Configuration Module
//!
//! Handles loading and managing cache configuration from environment variables.

use std::env;

use crate::engine::EngineKind;

/// Cache configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Total memory budget in megabytes; 0 disables the ceiling
    pub max_memory_mb: u64,
    /// Default TTL in seconds for puts without explicit TTL; 0 selects the
    /// one-day fallback
    pub default_ttl_secs: u64,
    /// Cleanup daemon wake-up interval in seconds; 0 disables the daemon
    pub cleanup_interval_secs: u64,
    /// Which embedded storage engine backs the cache
    pub engine: EngineKind,
    /// Rebuild the expiry index from surviving records instead of
    /// destroying the prior store at open
    pub recover: bool,
}

impl CacheConfig {
    /// Creates a new CacheConfig by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `MAX_MEMORY_MB` - Memory budget in MB, 0 = unlimited (default: 0)
    /// - `DEFAULT_TTL` - Default TTL in seconds (default: 0)
    /// - `CLEANUP_INTERVAL` - Cleanup frequency in seconds (default: 1)
    /// - `ENGINE` - Storage engine, "sled" or "redb" (default: sled)
    /// - `RECOVER` - "true" to reopen an existing store (default: false)
    pub fn from_env() -> Self {
        Self::from_vars(|name| env::var(name).ok())
    }

    /// Builds a config from a variable lookup. `from_env` is this with the
    /// process environment plugged in; tests supply their own lookup so
    /// they never touch shared process state.
    fn from_vars(var: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            max_memory_mb: var("MAX_MEMORY_MB")
                .and_then(|v| v.parse().ok())
                .unwrap_or(0),
            default_ttl_secs: var("DEFAULT_TTL")
                .and_then(|v| v.parse().ok())
                .unwrap_or(0),
            cleanup_interval_secs: var("CLEANUP_INTERVAL")
                .and_then(|v| v.parse().ok())
                .unwrap_or(1),
            engine: var("ENGINE")
                .and_then(|v| v.parse().ok())
                .unwrap_or_default(),
            recover: var("RECOVER")
                .and_then(|v| v.parse().ok())
                .unwrap_or(false),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_memory_mb: 0,
            default_ttl_secs: 0,
            cleanup_interval_secs: 1,
            engine: EngineKind::Sled,
            recover: false,
        }
    }
}
