//! Key-value persistence primitives the cache store writes through.
//!
//! Backends are plain string stores; they know nothing about entries,
//! timestamps or freshness.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, RwLock};

use anyhow::{anyhow, bail, Context, Result};
use rusqlite::{params, Connection, OptionalExtension};
use sha2::{Digest, Sha256};
use tracing::{debug, info};

/// Raw string storage keyed by cache key.
pub trait KvBackend: Send + Sync {
    /// Human-readable backend name for logs.
    fn name(&self) -> &str;

    fn get(&self, key: &str) -> Result<Option<String>>;

    fn set(&self, key: &str, value: &str) -> Result<()>;

    fn remove(&self, key: &str) -> Result<()>;
}

// ---------------------------------------------------------------------------
// In-memory
// ---------------------------------------------------------------------------

/// Process-local backend. An optional byte quota makes `set` fail the way a
/// full browser storage area would.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    entries: RwLock<HashMap<String, String>>,
    quota_bytes: Option<usize>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Limit the total size of stored keys and values.
    pub fn with_quota(quota_bytes: usize) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            quota_bytes: Some(quota_bytes),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl KvBackend for MemoryBackend {
    fn name(&self) -> &str {
        "memory"
    }

    fn get(&self, key: &str) -> Result<Option<String>> {
        let entries = self
            .entries
            .read()
            .map_err(|_| anyhow!("memory backend lock poisoned"))?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| anyhow!("memory backend lock poisoned"))?;

        if let Some(quota) = self.quota_bytes {
            let used: usize = entries
                .iter()
                .filter(|(k, _)| k.as_str() != key)
                .map(|(k, v)| k.len() + v.len())
                .sum();
            let needed = used + key.len() + value.len();
            if needed > quota {
                bail!("storage quota exceeded ({needed} > {quota} bytes)");
            }
        }

        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| anyhow!("memory backend lock poisoned"))?;
        entries.remove(key);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// File
// ---------------------------------------------------------------------------

/// Readable characters kept from a key in its file name.
const FILE_PREFIX_CHARS: usize = 48;

/// One JSON file per key inside a directory.
#[derive(Debug, Clone)]
pub struct FileBackend {
    dir: PathBuf,
}

impl FileBackend {
    /// Open (and create if needed) a cache directory.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create cache directory: {}", dir.display()))?;
        info!(path = %dir.display(), "File cache opened");
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Map a cache key onto a file name that is safe on every platform.
    ///
    /// The name is a short sanitised prefix for humans followed by the
    /// SHA-256 of the full key, so distinct keys never share a file and long
    /// keys stay under filesystem name limits.
    fn path_for(&self, key: &str) -> PathBuf {
        let prefix: String = key
            .chars()
            .take(FILE_PREFIX_CHARS)
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '-' | '_') {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        let digest = hex::encode(Sha256::digest(key.as_bytes()));
        self.dir.join(format!("{prefix}-{digest}.json"))
    }
}

impl KvBackend for FileBackend {
    fn name(&self) -> &str {
        "file"
    }

    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key);
        match std::fs::read_to_string(&path) {
            Ok(raw) => Ok(Some(raw)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("Failed to read {}", path.display())),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let path = self.path_for(key);

        // Write to temp file, then rename, so readers never see half an entry.
        let tmp_path = path.with_extension("json.tmp");
        std::fs::write(&tmp_path, value.as_bytes())
            .with_context(|| format!("Failed to write temp cache file: {}", tmp_path.display()))?;
        std::fs::rename(&tmp_path, &path)
            .with_context(|| format!("Failed to rename temp cache file to: {}", path.display()))?;

        debug!(path = %path.display(), "Wrote cache file");
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let path = self.path_for(key);
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("Failed to remove {}", path.display())),
        }
    }
}

// ---------------------------------------------------------------------------
// SQLite
// ---------------------------------------------------------------------------

/// SQLite-backed key-value table.
pub struct SqliteBackend {
    conn: Mutex<Connection>,
}

impl SqliteBackend {
    /// Open or create the cache database at the given path.
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path).context("Failed to open SQLite cache database")?;
        let backend = Self {
            conn: Mutex::new(conn),
        };
        backend.init_schema()?;
        info!(path = %path, "SQLite cache opened");
        Ok(backend)
    }

    /// Create an in-memory database (for testing).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory SQLite")?;
        let backend = Self {
            conn: Mutex::new(conn),
        };
        backend.init_schema()?;
        Ok(backend)
    }

    fn conn(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow!("SQLite cache connection lock poisoned"))
    }

    fn init_schema(&self) -> Result<()> {
        self.conn()?.execute_batch(
            "PRAGMA journal_mode=WAL;
            CREATE TABLE IF NOT EXISTS cache_entries (
                key        TEXT PRIMARY KEY,
                value      TEXT NOT NULL,
                updated_at INTEGER NOT NULL
            );",
        )?;
        Ok(())
    }
}

impl KvBackend for SqliteBackend {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn get(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .conn()?
            .query_row(
                "SELECT value FROM cache_entries WHERE key = ?1",
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.conn()?.execute(
            "INSERT INTO cache_entries (key, value, updated_at)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET
               value = excluded.value,
               updated_at = excluded.updated_at",
            params![key, value, chrono::Utc::now().timestamp_millis()],
        )?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.conn()?
            .execute("DELETE FROM cache_entries WHERE key = ?1", params![key])?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exercise(backend: &dyn KvBackend) {
        assert_eq!(backend.get("reports").unwrap(), None);
        backend.set("reports", "{\"a\":1}").unwrap();
        assert_eq!(backend.get("reports").unwrap().as_deref(), Some("{\"a\":1}"));
        backend.set("reports", "{\"a\":2}").unwrap();
        assert_eq!(backend.get("reports").unwrap().as_deref(), Some("{\"a\":2}"));
        backend.remove("reports").unwrap();
        assert_eq!(backend.get("reports").unwrap(), None);
        // Removing a missing key is not an error.
        backend.remove("reports").unwrap();
    }

    #[test]
    fn memory_backend_roundtrip() {
        exercise(&MemoryBackend::new());
    }

    #[test]
    fn file_backend_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        exercise(&FileBackend::open(dir.path()).unwrap());
    }

    #[test]
    fn file_backend_keeps_similar_keys_apart() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FileBackend::open(dir.path()).unwrap();
        backend.set("reports/2024", "A").unwrap();
        backend.set("reports?2024", "B").unwrap();
        assert_eq!(backend.get("reports/2024").unwrap().as_deref(), Some("A"));
        assert_eq!(backend.get("reports?2024").unwrap().as_deref(), Some("B"));
    }

    #[test]
    fn file_backend_accepts_long_keys() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FileBackend::open(dir.path()).unwrap();
        let key = format!("https://api.example.com/reports?filter={}", "x".repeat(300));
        assert!(key.len() > 255);
        backend.set(&key, "{\"a\":1}").unwrap();
        assert_eq!(backend.get(&key).unwrap().as_deref(), Some("{\"a\":1}"));
        backend.remove(&key).unwrap();
        assert_eq!(backend.get(&key).unwrap(), None);
    }

    #[test]
    fn sqlite_backend_roundtrip() {
        exercise(&SqliteBackend::in_memory().unwrap());
    }

    #[test]
    fn memory_quota_rejects_oversized_write() {
        let backend = MemoryBackend::with_quota(16);
        backend.set("k", "small").unwrap();
        let err = backend.set("k2", "this value does not fit").unwrap_err();
        assert!(err.to_string().contains("quota exceeded"));
        // Overwriting the existing key within budget still works.
        backend.set("k", "tiny").unwrap();
        assert_eq!(backend.len(), 1);
    }

    #[test]
    fn file_backend_sanitizes_keys() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FileBackend::open(dir.path()).unwrap();
        backend.set("../reports/2024?q=1", "[]").unwrap();
        let files: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .collect();
        assert_eq!(files.len(), 1);
        assert!(files[0].path().starts_with(dir.path()));
        assert_eq!(backend.get("../reports/2024?q=1").unwrap().as_deref(), Some("[]"));
    }

    #[test]
    fn sqlite_backend_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.db");
        let path = path.to_str().unwrap();
        SqliteBackend::open(path).unwrap().set("k", "v").unwrap();
        let reopened = SqliteBackend::open(path).unwrap();
        assert_eq!(reopened.get("k").unwrap().as_deref(), Some("v"));
    }
}
