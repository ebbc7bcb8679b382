//! Log Redaction Layer
//!
//! Operation error messages often echo the request that failed. Credentials
//! embedded in them are scrubbed before they reach any log sink.

use regex::Regex;
use std::sync::LazyLock;

static BEARER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Bearer\s+[A-Za-z0-9\-._~+/]+=*").unwrap());
static SECRET_KEY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(?:sk|pk|rk)-[A-Za-z0-9_\-]{16,}").unwrap());
static URL_USERINFO_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?P<scheme>[a-zA-Z][a-zA-Z0-9+.\-]*://)[^/\s:@]+:[^/\s@]+@").unwrap());
static QUERY_SECRET_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?P<name>[?&](?:access_token|api_key|apikey|token|key|secret)=)[^&\s#]+").unwrap()
});

/// Redacts credentials in a string.
pub fn redact_sensitive_data(input: &str) -> String {
    let redacted = BEARER_RE.replace_all(input, "Bearer [REDACTED]");
    let redacted = SECRET_KEY_RE.replace_all(&redacted, "[REDACTED_KEY]");
    let redacted = URL_USERINFO_RE.replace_all(&redacted, "${scheme}[REDACTED]@");
    let redacted = QUERY_SECRET_RE.replace_all(&redacted, "${name}[REDACTED]");
    redacted.into_owned()
}
