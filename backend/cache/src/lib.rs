//! `holdfast-cache`: best-effort persisted snapshots for Holdfast executors.
//!
//! Provides:
//! - `CacheStore`: timestamped entries with a freshness window
//! - `KvBackend` implementations: in-memory, one-file-per-key, SQLite

pub mod backend;
pub mod store;

pub use backend::{FileBackend, KvBackend, MemoryBackend, SqliteBackend};
pub use store::{CacheEntry, CacheStore, DEFAULT_FRESHNESS_WINDOW};
