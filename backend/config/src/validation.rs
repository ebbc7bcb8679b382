//! Config validation: schema checks with user-friendly error messages.

use crate::schema::{ExecutorDefaults, HoldfastConfig};
use thiserror::Error;

/// Retry counts above this are almost certainly a typo.
const MAX_SENSIBLE_RETRIES: u32 = 10;

/// A config validation error with field path and message.
#[derive(Debug, Error)]
#[error("Config validation error at '{path}': {message}")]
pub struct ConfigValidationError {
    pub path: String,
    pub message: String,
}

/// A collection of validation errors found in one pass.
#[derive(Debug, Default)]
pub struct ValidationReport {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    fn error(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }

    fn warn(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }
}

/// Validate the config and return a report of all errors and warnings.
pub fn validate(config: &HoldfastConfig) -> ValidationReport {
    let mut report = ValidationReport::default();
    if let Some(defaults) = &config.defaults {
        validate_executor("defaults", defaults, &mut report);
    }
    validate_operations(config, &mut report);
    validate_cache(config, &mut report);
    validate_logging(config, &mut report);
    report
}

fn validate_executor(path: &str, settings: &ExecutorDefaults, report: &mut ValidationReport) {
    if settings.timeout_ms == Some(0) {
        report.error(format!("{path}.timeoutMs"), "timeoutMs must be > 0");
    }
    if let Some(retries) = settings.max_retries {
        if retries > MAX_SENSIBLE_RETRIES {
            report.warn(
                format!("{path}.maxRetries"),
                format!("maxRetries {retries} is unusually high; delays grow linearly with each retry"),
            );
        }
    }
    if settings.max_retries.unwrap_or(0) > 0 && settings.retry_delay_ms == Some(0) {
        report.warn(
            format!("{path}.retryDelayMs"),
            "retryDelayMs of 0 retries immediately without backoff",
        );
    }
    if settings.freshness_window_ms == Some(0) {
        report.warn(
            format!("{path}.freshnessWindowMs"),
            "freshnessWindowMs of 0 disables cache seeding",
        );
    }
}

fn validate_operations(config: &HoldfastConfig, report: &mut ValidationReport) {
    for (name, op) in &config.operations {
        let path = format!("operations.{name}");
        if name.trim().is_empty() {
            report.error("operations", "Operation name cannot be empty");
        }
        if let Some(key) = &op.cache_key {
            if key.trim().is_empty() {
                report.error(format!("{path}.cacheKey"), "cacheKey cannot be empty");
            }
        }
        validate_executor(&path, &op.overrides, report);
    }
}

fn validate_cache(config: &HoldfastConfig, report: &mut ValidationReport) {
    let Some(cache) = &config.cache else { return };
    if let Some(backend) = &cache.backend {
        if !matches!(backend.as_str(), "memory" | "file" | "sqlite") {
            report.error(
                "cache.backend",
                format!("Unknown cache backend '{backend}'. Use 'memory', 'file', or 'sqlite'"),
            );
        }
        if backend == "memory" && cache.path.is_some() {
            report.warn("cache.path", "path is ignored by the memory backend");
        }
    }
}

fn validate_logging(config: &HoldfastConfig, report: &mut ValidationReport) {
    let Some(logging) = &config.logging else { return };
    if let Some(level) = &logging.level {
        if !matches!(
            level.to_ascii_lowercase().as_str(),
            "trace" | "debug" | "info" | "warn" | "error"
        ) {
            report.warn(
                "logging.level",
                format!("'{level}' is not a plain level; it will be parsed as a filter directive"),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{CacheConfig, OperationConfig};

    #[test]
    fn empty_config_is_valid() {
        let report = validate(&HoldfastConfig::default());
        assert!(report.is_valid(), "errors: {:?}", report.errors);
    }

    #[test]
    fn zero_timeout_is_error() {
        let mut cfg = HoldfastConfig::default();
        cfg.defaults = Some(ExecutorDefaults {
            timeout_ms: Some(0),
            ..Default::default()
        });
        let report = validate(&cfg);
        assert!(!report.is_valid());
        assert_eq!(report.errors[0].path, "defaults.timeoutMs");
    }

    #[test]
    fn empty_cache_key_is_error() {
        let mut cfg = HoldfastConfig::default();
        cfg.operations.insert(
            "reports".to_string(),
            OperationConfig {
                cache_key: Some("  ".to_string()),
                ..Default::default()
            },
        );
        let report = validate(&cfg);
        assert!(report.errors.iter().any(|e| e.path == "operations.reports.cacheKey"));
    }

    #[test]
    fn unknown_backend_is_error() {
        let mut cfg = HoldfastConfig::default();
        cfg.cache = Some(CacheConfig {
            backend: Some("redis".to_string()),
            path: None,
        });
        let report = validate(&cfg);
        assert!(!report.is_valid());
        assert!(report.errors[0].message.contains("redis"));
    }

    #[test]
    fn high_retry_count_is_warning() {
        let mut cfg = HoldfastConfig::default();
        cfg.defaults = Some(ExecutorDefaults {
            max_retries: Some(50),
            ..Default::default()
        });
        let report = validate(&cfg);
        assert!(report.is_valid());
        assert_eq!(report.warnings.len(), 1);
    }
}
