//! `holdfast-config`: Holdfast runtime configuration management.
//!
//! Provides:
//! - Typed config schema (executor defaults, named operations, cache, logging)
//! - YAML read/write
//! - Default value application
//! - Schema validation

pub mod defaults;
pub mod io;
pub mod schema;
pub mod validation;

// Re-export most-used types at crate root.
pub use defaults::apply_all_defaults;
pub use io::{config_dir, config_file_path, load_config, write_config};
pub use schema::{
    CacheConfig, ExecutorConfig, ExecutorDefaults, HoldfastConfig, LoggingConfig, OperationConfig,
};
pub use validation::{validate, ConfigValidationError, ValidationReport};

use anyhow::Result;
use std::path::Path;

/// Load, apply defaults to, and validate a config file.
///
/// This is the main entry point for loading a config at runtime. Validation
/// problems are logged; the returned report lets callers decide whether to
/// refuse to start.
pub async fn load_and_prepare(path: &Path) -> Result<(HoldfastConfig, ValidationReport)> {
    let config = load_config(path).await?;
    let config = apply_all_defaults(config);

    let report = validate(&config);
    for warning in &report.warnings {
        tracing::warn!(path = %warning.path, message = %warning.message, "Config warning");
    }
    for error in &report.errors {
        tracing::error!(path = %error.path, message = %error.message, "Config error");
    }

    Ok((config, report))
}
