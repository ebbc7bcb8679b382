//! Terminal output helpers: notes on stderr and an aligned key/value block
//! for human-readable summaries.

use holdfast_core::{ExecutionState, Status};

const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";
const RED: &str = "\x1b[31m";
const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";
const CYAN: &str = "\x1b[36m";

/// Check if the terminal supports color output.
pub fn supports_color() -> bool {
    std::env::var("NO_COLOR").is_err()
        && (std::env::var("COLORTERM").is_ok()
            || std::env::var("TERM").map(|t| t != "dumb").unwrap_or(false))
}

fn note(color: &str, glyph: &str, plain: &str, msg: &str) {
    if supports_color() {
        eprintln!("{color}{BOLD}{glyph}{RESET} {msg}");
    } else {
        eprintln!("{plain}: {msg}");
    }
}

pub fn note_info(msg: &str) {
    note(CYAN, "ℹ", "INFO", msg);
}

pub fn note_warn(msg: &str) {
    note(YELLOW, "⚠", "WARN", msg);
}

pub fn note_error(msg: &str) {
    note(RED, "✗", "ERROR", msg);
}

pub fn note_success(msg: &str) {
    note(GREEN, "✓", "OK", msg);
}

/// Render `(label, value)` pairs with the labels padded to one width.
pub fn render_fields(fields: &[(&str, String)], color: bool) -> String {
    let width = fields.iter().map(|(k, _)| k.len()).max().unwrap_or(0);
    let mut out = String::new();
    for (label, value) in fields {
        if color {
            out.push_str(&format!("  {DIM}{label:<width$}{RESET}  {value}\n"));
        } else {
            out.push_str(&format!("  {label:<width$}  {value}\n"));
        }
    }
    out
}

/// One-line human summary of a final execution state.
pub fn state_summary<T>(state: &ExecutionState<T>) -> String {
    match state.status {
        Status::Success => "fetched fresh data".to_string(),
        Status::Failed if state.has_stale_data() => format!(
            "failed ({}); showing cached data",
            state.error_message.as_deref().unwrap_or_default()
        ),
        Status::Failed => format!(
            "failed: {}",
            state.error_message.as_deref().unwrap_or_default()
        ),
        Status::Idle | Status::Loading => "did not finish".to_string(),
    }
}
