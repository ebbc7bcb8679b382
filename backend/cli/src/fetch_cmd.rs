//! `holdfast fetch`: GET a URL through a cached, retrying executor and print
//! the final state.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use clap::Args;
use serde_json::Value;
use tracing::{debug, info};

use holdfast_config::ExecutorConfig;
use holdfast_core::{CancellationToken, Operation};
use holdfast_executor::OperationExecutor;

use crate::runtime::Runtime;
use crate::terminal_output::{note_error, note_success, note_warn, state_summary};

#[derive(Debug, Clone, Args)]
pub struct FetchArgs {
    /// URL to GET; the response body must be JSON
    pub url: String,

    /// Cache key (defaults to the URL)
    #[arg(long)]
    pub key: Option<String>,

    /// Per-attempt deadline in milliseconds
    #[arg(long)]
    pub timeout_ms: Option<u64>,

    /// Retries after the first attempt
    #[arg(long)]
    pub max_retries: Option<u32>,

    /// Base retry delay in milliseconds; attempt n waits n times this
    #[arg(long)]
    pub retry_delay_ms: Option<u64>,
}

impl FetchArgs {
    pub fn cache_key(&self) -> &str {
        self.key.as_deref().unwrap_or(&self.url)
    }

    /// Layer command-line flags over the configured settings.
    pub fn apply(&self, mut config: ExecutorConfig) -> ExecutorConfig {
        if let Some(v) = self.timeout_ms {
            config = config.with_timeout_ms(v);
        }
        if let Some(v) = self.max_retries {
            config = config.with_max_retries(v);
        }
        if let Some(v) = self.retry_delay_ms {
            config = config.with_retry_delay_ms(v);
        }
        config
    }
}

/// A JSON GET request that stops as soon as its abort signal fires.
pub struct HttpGet {
    client: reqwest::Client,
    url: String,
}

impl HttpGet {
    pub fn new(client: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }

    async fn get(&self) -> Result<Value> {
        let resp = self
            .client
            .get(&self.url)
            .send()
            .await
            .with_context(|| format!("request to {} failed", self.url))?;

        let status = resp.status();
        if !status.is_success() {
            bail!("HTTP {} from {}", status.as_u16(), self.url);
        }
        resp.json::<Value>().await.context("response body is not valid JSON")
    }
}

#[async_trait]
impl Operation<Value> for HttpGet {
    async fn run(&self, cancel: CancellationToken) -> Result<Value> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => bail!("request aborted"),
            out = self.get() => out,
        }
    }
}

/// Returns whether fresh data was fetched.
pub async fn run(runtime: &Runtime, args: FetchArgs) -> Result<bool> {
    let key = args.cache_key().to_string();
    let config = args.apply(runtime.config.executor_config(&key));
    debug!(?config, "Resolved executor settings");

    let client = reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(10))
        .build()
        .context("Failed to build HTTP client")?;

    let executor = OperationExecutor::<Value>::new(config, runtime.cache_store()?, HttpGet::new(client, &args.url));
    if executor.state().is_from_cache {
        note_warn(&format!("serving cached copy of '{key}' while refreshing"));
    }

    info!(url = %args.url, cache_key = %key, "Fetching");
    let fresh = executor.execute().await.is_some();
    let state = executor.state();
    executor.dispose();

    println!("{}", serde_json::to_string_pretty(&state)?);
    if fresh {
        note_success(&state_summary(&state));
    } else {
        note_error(&state_summary(&state));
    }
    Ok(fresh)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Harness {
        #[command(flatten)]
        args: FetchArgs,
    }

    fn parse(argv: &[&str]) -> FetchArgs {
        Harness::parse_from(std::iter::once("fetch").chain(argv.iter().copied())).args
    }

    #[test]
    fn key_defaults_to_url() {
        let args = parse(&["https://api.example.com/reports"]);
        assert_eq!(args.cache_key(), "https://api.example.com/reports");

        let args = parse(&["https://api.example.com/reports", "--key", "reports"]);
        assert_eq!(args.cache_key(), "reports");
    }

    #[test]
    fn flags_override_config() {
        let args = parse(&["http://x", "--max-retries", "0", "--timeout-ms", "250"]);
        let config = args.apply(ExecutorConfig::new("x").with_retry_delay_ms(40));
        assert_eq!(config.max_retries, 0);
        assert_eq!(config.timeout_ms, 250);
        assert_eq!(config.retry_delay_ms, 40);
    }

    #[tokio::test]
    async fn aborted_request_fails_fast() {
        let op = HttpGet::new(reqwest::Client::new(), "http://192.0.2.1:9/never");
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = op.run(cancel).await.unwrap_err();
        assert_eq!(err.to_string(), "request aborted");
    }
}
