//! Startup wiring shared by all commands: config loading, logging and the
//! cache backend.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tracing::debug;

use holdfast_cache::{CacheStore, FileBackend, KvBackend, MemoryBackend, SqliteBackend};
use holdfast_config::defaults::{DEFAULT_CACHE_BACKEND, DEFAULT_CACHE_DIR, DEFAULT_LOG_LEVEL};
use holdfast_config::{config_dir, config_file_path, load_and_prepare, HoldfastConfig, ValidationReport};

/// Default SQLite file name inside the config directory.
pub const DEFAULT_SQLITE_FILE: &str = "cache.db";

pub struct Runtime {
    pub config_dir: PathBuf,
    pub config_path: PathBuf,
    pub config: HoldfastConfig,
    pub report: ValidationReport,
}

impl Runtime {
    /// Load the config from `config_path`, or the default location.
    pub async fn load(config_path: Option<PathBuf>) -> Result<Self> {
        let (config_dir, config_path) = match config_path {
            Some(path) => {
                let dir = path
                    .parent()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| PathBuf::from("."));
                (dir, path)
            }
            None => {
                let dir = config_dir();
                let path = config_file_path(&dir);
                (dir, path)
            }
        };

        let (config, report) = load_and_prepare(&config_path).await?;
        Ok(Self {
            config_dir,
            config_path,
            config,
            report,
        })
    }

    /// Start the global logger. Without a configured log directory only the
    /// console sink is installed.
    pub fn init_logging(&self) {
        let logging = self.config.logging.clone().unwrap_or_default();
        let level = logging.level.as_deref().unwrap_or(DEFAULT_LOG_LEVEL);
        match logging.dir {
            Some(dir) => logging::init_logger(self.resolve(&dir), level),
            None => logging::init_console_logger(level),
        }
    }

    /// Resolve a config-relative path.
    pub fn resolve(&self, path: &str) -> PathBuf {
        let path = Path::new(path);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.config_dir.join(path)
        }
    }

    pub fn open_backend(&self) -> Result<Arc<dyn KvBackend>> {
        let cache = self.config.cache.clone().unwrap_or_default();
        let kind = cache.backend.as_deref().unwrap_or(DEFAULT_CACHE_BACKEND);
        debug!(backend = kind, "Opening cache backend");

        let backend: Arc<dyn KvBackend> = match kind {
            "memory" => Arc::new(MemoryBackend::new()),
            "file" => {
                let dir = self.resolve(cache.path.as_deref().unwrap_or(DEFAULT_CACHE_DIR));
                Arc::new(FileBackend::open(&dir)?)
            }
            "sqlite" => {
                let path = self.resolve(cache.path.as_deref().unwrap_or(DEFAULT_SQLITE_FILE));
                if let Some(parent) = path.parent() {
                    std::fs::create_dir_all(parent)
                        .with_context(|| format!("Failed to create {}", parent.display()))?;
                }
                Arc::new(SqliteBackend::open(&path.to_string_lossy())?)
            }
            other => bail!("unknown cache backend '{other}'"),
        };
        Ok(backend)
    }

    pub fn cache_store(&self) -> Result<CacheStore> {
        Ok(CacheStore::new(self.open_backend()?))
    }
}
