// # HTTP IP Fetcher
//
// This crate provides the HTTP lookup used by the public IP race.
//
// ## Purpose
//
// Each call issues a single GET against one lookup service (e.g.
// checkip.amazonaws.com, api.ipify.org) and returns the body as-is.
// The core crate sanitizes the body, parses it and picks the winner.
//
// ## Architecture
//
// One `reqwest::Client` is shared by every request of a race, so the
// concurrent lookups reuse its connection pool.

use dyndns_core::traits::IpFetcher;
use dyndns_core::{Error, Result};

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Per-request timeout, independent of the race cap
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

/// Public IP fetcher over plain HTTP(S) GET
#[derive(Debug, Clone)]
pub struct HttpIpFetcher {
    client: reqwest::Client,
}

impl HttpIpFetcher {
    /// Create a fetcher with the default request timeout
    pub fn new() -> Self {
        Self::with_timeout(Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS))
    }

    /// Create a fetcher with a custom per-request timeout
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(timeout)
                .user_agent(concat!("dyndns/", env!("CARGO_PKG_VERSION")))
                .build()
                .unwrap_or_default(),
        }
    }

    /// Create a fetcher around an existing client
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    async fn get_body(&self, endpoint: &str) -> Result<String> {
        let response = self
            .client
            .get(endpoint)
            .send()
            .await
            .map_err(|e| Error::http(format!("Request to {} failed: {}", endpoint, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::http(format!("{} returned {}", endpoint, status)));
        }

        response
            .text()
            .await
            .map_err(|e| Error::http(format!("Failed to read response from {}: {}", endpoint, e)))
    }
}

impl Default for HttpIpFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl IpFetcher for HttpIpFetcher {
    async fn fetch(&self, endpoint: &str, cancel: &CancellationToken) -> Result<String> {
        debug!("GET {}", endpoint);

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(Error::Cancelled),
            result = self.get_body(endpoint) => result,
        }
    }
}
