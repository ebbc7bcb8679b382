//! Cache Store: timestamped snapshots of the last successful result.
//!
//! Every method is infallible from the caller's point of view. Caching is an
//! optimization, so read and write failures are logged and swallowed.

use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use holdfast_core::{Clock, HoldfastError, SystemClock};

use crate::backend::KvBackend;

/// Default freshness window: one hour.
pub const DEFAULT_FRESHNESS_WINDOW: Duration = Duration::from_millis(3_600_000);

/// A persisted snapshot. Serialized as `{ "data": ..., "timestamp": <epoch ms> }`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CacheEntry<T> {
    pub data: T,
    #[serde(rename = "timestamp")]
    pub stored_at_epoch_millis: i64,
}

impl<T> CacheEntry<T> {
    pub fn age_millis(&self, now_millis: i64) -> i64 {
        now_millis - self.stored_at_epoch_millis
    }

    /// Fresh entries are strictly younger than the window.
    pub fn is_fresh(&self, now_millis: i64, window: Duration) -> bool {
        self.age_millis(now_millis) < window.as_millis() as i64
    }
}

/// Reads and writes cache entries through a [`KvBackend`].
#[derive(Clone)]
pub struct CacheStore {
    backend: Arc<dyn KvBackend>,
    clock: Arc<dyn Clock>,
    freshness_window: Duration,
}

impl CacheStore {
    pub fn new(backend: Arc<dyn KvBackend>) -> Self {
        Self {
            backend,
            clock: Arc::new(SystemClock),
            freshness_window: DEFAULT_FRESHNESS_WINDOW,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_freshness_window(mut self, window: Duration) -> Self {
        self.freshness_window = window;
        self
    }

    pub fn freshness_window(&self) -> Duration {
        self.freshness_window
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    pub fn now_millis(&self) -> i64 {
        self.clock.now_millis()
    }

    /// Read the entry for `key`, regardless of age.
    ///
    /// Unreadable or malformed values are treated as absent.
    pub fn read<T: DeserializeOwned>(&self, key: &str) -> Option<CacheEntry<T>> {
        match self.try_read(key) {
            Ok(entry) => entry,
            Err(e) => {
                warn!(key = %key, backend = self.backend.name(), error = %e, "Ignoring unreadable cache entry");
                None
            }
        }
    }

    /// Read the entry for `key` only if it is inside the freshness window.
    ///
    /// Expired entries are left in place.
    pub fn read_fresh<T: DeserializeOwned>(&self, key: &str) -> Option<CacheEntry<T>> {
        let entry = self.read::<T>(key)?;
        let now = self.clock.now_millis();
        if entry.is_fresh(now, self.freshness_window) {
            Some(entry)
        } else {
            debug!(
                key = %key,
                age_ms = entry.age_millis(now),
                window_ms = self.freshness_window.as_millis() as u64,
                "Cache entry expired"
            );
            None
        }
    }

    /// Store `data` under `key`, stamped with the current time.
    pub fn write<T: Serialize>(&self, key: &str, data: &T) {
        if let Err(e) = self.try_write(key, data) {
            warn!(key = %key, backend = self.backend.name(), error = %e, "Failed to write cache entry");
        }
    }

    /// Best-effort delete.
    pub fn remove(&self, key: &str) {
        if let Err(e) = self.backend.remove(key) {
            warn!(key = %key, backend = self.backend.name(), error = %e, "Failed to remove cache entry");
        }
    }

    fn try_read<T: DeserializeOwned>(&self, key: &str) -> Result<Option<CacheEntry<T>>, HoldfastError> {
        let Some(raw) = self
            .backend
            .get(key)
            .map_err(|e| HoldfastError::CacheIo(format!("{e:#}")))?
        else {
            return Ok(None);
        };
        let entry = serde_json::from_str(&raw)
            .map_err(|e| HoldfastError::CacheIo(format!("malformed entry: {e}")))?;
        Ok(Some(entry))
    }

    fn try_write<T: Serialize>(&self, key: &str, data: &T) -> Result<(), HoldfastError> {
        let entry = CacheEntry {
            data,
            stored_at_epoch_millis: self.clock.now_millis(),
        };
        let raw = serde_json::to_string(&entry)
            .map_err(|e| HoldfastError::CacheIo(format!("serialize entry: {e}")))?;
        self.backend
            .set(key, &raw)
            .map_err(|e| HoldfastError::CacheIo(format!("{e:#}")))?;
        debug!(key = %key, bytes = raw.len(), "Cache entry written");
        Ok(())
    }
}
