//! `holdfast cache`: inspect or drop persisted snapshots.

use anyhow::{Context, Result};
use clap::Subcommand;
use serde_json::{json, Value};

use holdfast_cache::KvBackend;

use crate::runtime::Runtime;
use crate::terminal_output::{note_success, note_warn, render_fields, supports_color};

#[derive(Debug, Clone, Subcommand)]
pub enum CacheCommand {
    /// Print the cached entry for a key with its age and freshness
    Show { key: String },
    /// Remove the cached entry for a key
    Clear { key: String },
}

pub fn run(runtime: &Runtime, command: CacheCommand) -> Result<bool> {
    match command {
        CacheCommand::Show { key } => show(runtime, &key),
        CacheCommand::Clear { key } => clear(runtime, &key),
    }
}

fn show(runtime: &Runtime, key: &str) -> Result<bool> {
    let window = runtime.config.executor_config(key).freshness_window();
    let store = runtime.cache_store()?.with_freshness_window(window);

    let Some(entry) = store.read::<Value>(key) else {
        note_warn(&format!("no cached entry for '{key}'"));
        return Ok(false);
    };

    let now = store.now_millis();
    let age_ms = entry.age_millis(now);
    let fresh = entry.is_fresh(now, window);

    eprint!(
        "{}",
        render_fields(
            &[
                ("key", key.to_string()),
                ("backend", store.backend_name().to_string()),
                ("age_ms", age_ms.to_string()),
                ("fresh", fresh.to_string()),
            ],
            supports_color(),
        )
    );
    let out = json!({
        "key": key,
        "ageMs": age_ms,
        "fresh": fresh,
        "entry": entry,
    });
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(true)
}

fn clear(runtime: &Runtime, key: &str) -> Result<bool> {
    remove_entry(runtime.open_backend()?.as_ref(), key)?;
    note_success(&format!("cleared '{key}'"));
    Ok(true)
}

/// Unlike `CacheStore::remove`, a failed delete is reported to the caller.
fn remove_entry(backend: &dyn KvBackend, key: &str) -> Result<()> {
    backend
        .remove(key)
        .with_context(|| format!("Failed to clear '{key}' from the {} cache", backend.name()))
}
