//! Holdfast configuration schema.
//!
//! Typed for serde YAML/JSON deserialization. Every field of the file format
//! is optional; [`crate::defaults`] fills in what the user left out.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Root of `config.yaml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HoldfastConfig {
    /// Executor settings applied to every operation unless overridden
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub defaults: Option<ExecutorDefaults>,

    /// Named operations with per-operation overrides
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub operations: HashMap<String, OperationConfig>,

    /// Cache persistence settings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache: Option<CacheConfig>,

    /// Logging configuration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logging: Option<LoggingConfig>,
}

// ---------------------------------------------------------------------------
// Executor settings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ExecutorDefaults {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_retries: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_delay_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub freshness_window_ms: Option<u64>,
}

/// Overrides for one named operation.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct OperationConfig {
    /// Cache key; defaults to the operation name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_key: Option<String>,
    #[serde(default, flatten)]
    pub overrides: ExecutorDefaults,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backend: Option<String>, // "memory" | "file" | "sqlite"
    /// Directory (file backend) or database path (sqlite backend)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoggingConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<String>,
}

// ---------------------------------------------------------------------------
// Resolved executor configuration
// ---------------------------------------------------------------------------

pub const DEFAULT_TIMEOUT_MS: u64 = 5_000;
pub const DEFAULT_MAX_RETRIES: u32 = 2;
pub const DEFAULT_RETRY_DELAY_MS: u64 = 1_000;
pub const DEFAULT_FRESHNESS_WINDOW_MS: u64 = 3_600_000;

/// Fully resolved settings for one executor instance.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ExecutorConfig {
    pub cache_key: String,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
    #[serde(default = "default_freshness_window_ms")]
    pub freshness_window_ms: u64,
}

fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}

fn default_max_retries() -> u32 {
    DEFAULT_MAX_RETRIES
}

fn default_retry_delay_ms() -> u64 {
    DEFAULT_RETRY_DELAY_MS
}

fn default_freshness_window_ms() -> u64 {
    DEFAULT_FRESHNESS_WINDOW_MS
}

impl ExecutorConfig {
    /// Settings with every default applied.
    pub fn new(cache_key: impl Into<String>) -> Self {
        Self {
            cache_key: cache_key.into(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_delay_ms: DEFAULT_RETRY_DELAY_MS,
            freshness_window_ms: DEFAULT_FRESHNESS_WINDOW_MS,
        }
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_retry_delay_ms(mut self, retry_delay_ms: u64) -> Self {
        self.retry_delay_ms = retry_delay_ms;
        self
    }

    pub fn with_freshness_window_ms(mut self, freshness_window_ms: u64) -> Self {
        self.freshness_window_ms = freshness_window_ms;
        self
    }

    /// Apply any overrides that are set.
    pub fn merged(mut self, overrides: &ExecutorDefaults) -> Self {
        if let Some(v) = overrides.timeout_ms {
            self.timeout_ms = v;
        }
        if let Some(v) = overrides.max_retries {
            self.max_retries = v;
        }
        if let Some(v) = overrides.retry_delay_ms {
            self.retry_delay_ms = v;
        }
        if let Some(v) = overrides.freshness_window_ms {
            self.freshness_window_ms = v;
        }
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn freshness_window(&self) -> Duration {
        Duration::from_millis(self.freshness_window_ms)
    }
}

impl HoldfastConfig {
    /// Resolve the executor settings for a named operation.
    ///
    /// Unknown names get the global defaults and use the name as cache key.
    pub fn executor_config(&self, name: &str) -> ExecutorConfig {
        let op = self.operations.get(name);
        let cache_key = op
            .and_then(|o| o.cache_key.clone())
            .unwrap_or_else(|| name.to_string());

        let mut config = ExecutorConfig::new(cache_key);
        if let Some(defaults) = &self.defaults {
            config = config.merged(defaults);
        }
        if let Some(op) = op {
            config = config.merged(&op.overrides);
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn executor_config_defaults() {
        let cfg = ExecutorConfig::new("reports");
        assert_eq!(cfg.timeout(), Duration::from_secs(5));
        assert_eq!(cfg.max_retries, 2);
        assert_eq!(cfg.retry_delay(), Duration::from_secs(1));
        assert_eq!(cfg.freshness_window(), Duration::from_secs(3_600));
    }

    #[test]
    fn executor_config_fills_missing_fields() {
        let cfg: ExecutorConfig = serde_json::from_str(r#"{"cacheKey": "k", "maxRetries": 5}"#).unwrap();
        assert_eq!(cfg.max_retries, 5);
        assert_eq!(cfg.timeout_ms, DEFAULT_TIMEOUT_MS);
    }

    #[test]
    fn operation_overrides_beat_defaults() {
        let yaml = r#"
defaults:
  timeoutMs: 8000
  maxRetries: 4
operations:
  reports:
    cacheKey: report-list
    maxRetries: 1
"#;
        let cfg: HoldfastConfig = serde_yaml::from_str(yaml).unwrap();
        let reports = cfg.executor_config("reports");
        assert_eq!(reports.cache_key, "report-list");
        assert_eq!(reports.timeout_ms, 8000);
        assert_eq!(reports.max_retries, 1);

        let other = cfg.executor_config("customers");
        assert_eq!(other.cache_key, "customers");
        assert_eq!(other.max_retries, 4);
        assert_eq!(other.retry_delay_ms, DEFAULT_RETRY_DELAY_MS);
    }
}
