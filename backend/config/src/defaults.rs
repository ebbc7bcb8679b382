//! Config defaults: applies default values to a parsed config.

use crate::schema::{
    CacheConfig, ExecutorDefaults, HoldfastConfig, LoggingConfig, DEFAULT_FRESHNESS_WINDOW_MS,
    DEFAULT_MAX_RETRIES, DEFAULT_RETRY_DELAY_MS, DEFAULT_TIMEOUT_MS,
};

/// Default cache backend.
pub const DEFAULT_CACHE_BACKEND: &str = "file";

/// Default cache directory name inside the config directory.
pub const DEFAULT_CACHE_DIR: &str = "cache";

/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Apply all defaults to a freshly loaded config.
pub fn apply_all_defaults(config: HoldfastConfig) -> HoldfastConfig {
    let config = apply_executor_defaults(config);
    let config = apply_cache_defaults(config);
    apply_logging_defaults(config)
}

fn apply_executor_defaults(mut config: HoldfastConfig) -> HoldfastConfig {
    let defaults = config.defaults.get_or_insert_with(ExecutorDefaults::default);
    defaults.timeout_ms.get_or_insert(DEFAULT_TIMEOUT_MS);
    defaults.max_retries.get_or_insert(DEFAULT_MAX_RETRIES);
    defaults.retry_delay_ms.get_or_insert(DEFAULT_RETRY_DELAY_MS);
    defaults.freshness_window_ms.get_or_insert(DEFAULT_FRESHNESS_WINDOW_MS);
    config
}

/// The cache path is resolved relative to the config directory at startup,
/// so only the backend kind is defaulted here.
fn apply_cache_defaults(mut config: HoldfastConfig) -> HoldfastConfig {
    let cache = config.cache.get_or_insert_with(CacheConfig::default);
    if cache.backend.is_none() {
        cache.backend = Some(DEFAULT_CACHE_BACKEND.to_string());
    }
    config
}

fn apply_logging_defaults(mut config: HoldfastConfig) -> HoldfastConfig {
    let logging = config.logging.get_or_insert_with(LoggingConfig::default);
    if logging.level.is_none() {
        logging.level = Some(DEFAULT_LOG_LEVEL.to_string());
    }
    config
}
