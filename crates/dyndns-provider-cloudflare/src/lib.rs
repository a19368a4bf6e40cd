// # Cloudflare Record API
//
// This crate provides the Cloudflare implementation of `RecordApi` for the
// dynamic DNS reconciler.
//
// ## Behaviour
//
// - ✅ One HTTP request per call (record-id lookup or record write)
// - ✅ Full error propagation; the run decides what is fatal
// - ✅ HTTP timeout configured (30 seconds)
// - ✅ Dry-run mode for safe testing
// - ✅ Cancellation aborts the in-flight request
// - ❌ NO retry or backoff
// - ❌ NO caching of record ids between runs
// - ❌ NO background tasks
//
// ## Security Requirements
//
// - API token NEVER appears in logs; only its first three characters
// - Construction fails fast if the token is empty
//
// ## API Reference
//
// - Cloudflare API v4: https://developers.cloudflare.com/api/
// - List DNS Records: GET `/zones/:zone_id/dns_records?type=A&name=...`
// - Update DNS Record: PUT `/zones/:zone_id/dns_records/:record_id`

use async_trait::async_trait;
use dyndns_core::config::{AuthToken, ProviderConfig};
use dyndns_core::traits::RecordApi;
use dyndns_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::net::Ipv4Addr;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Cloudflare API base URL
pub const CLOUDFLARE_API_BASE: &str = "https://api.cloudflare.com/client/v4";

/// Default HTTP timeout for API requests (30 seconds)
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Record listing envelope; only the fields the lookup needs
#[derive(Debug, Deserialize)]
struct ListRecordsResponse {
    #[serde(default)]
    result: Option<Vec<RecordEntry>>,
}

#[derive(Debug, Deserialize)]
struct RecordEntry {
    #[serde(default)]
    id: Option<String>,
}

/// Body of the record write
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpdateRecordRequest<'a> {
    #[serde(rename = "type")]
    pub record_type: &'static str,
    pub name: &'a str,
    pub content: String,
    /// 1 selects Cloudflare's automatic TTL
    pub ttl: u32,
    pub proxied: bool,
}

impl<'a> UpdateRecordRequest<'a> {
    /// Unproxied A record with automatic TTL
    pub fn a_record(name: &'a str, ip: Ipv4Addr) -> Self {
        Self {
            record_type: "A",
            name,
            content: ip.to_string(),
            ttl: 1,
            proxied: false,
        }
    }
}

/// Extract the first record id from a listing response
///
/// Anything other than a success status with at least one identified
/// record is reported as [`Error::RecordNotFound`] with the literal
/// status and body.
pub fn record_id_from_response(
    status: u16,
    body: &str,
    zone_id: &str,
    record_name: &str,
) -> Result<String> {
    let not_found = || Error::record_not_found(zone_id, record_name, status, body);

    if !(200..300).contains(&status) {
        return Err(not_found());
    }

    let parsed: ListRecordsResponse = serde_json::from_str(body).map_err(|_| not_found())?;

    parsed
        .result
        .and_then(|records| records.into_iter().next())
        .and_then(|record| record.id)
        .filter(|id| !id.is_empty())
        .ok_or_else(not_found)
}

/// Log a hint for statuses with a well-known cause
fn log_status_hint(status: u16) {
    match status {
        401 | 403 => tracing::warn!(
            "Authentication failed: invalid API token or insufficient permissions (status {})",
            status
        ),
        429 => tracing::warn!("Rate limit exceeded (status {})", status),
        500..=599 => tracing::warn!("Cloudflare server error (status {})", status),
        _ => {}
    }
}

/// Cloudflare record API client
///
/// # Dry-Run Mode
///
/// When `dry_run` is true, the provider will:
/// - Perform the record-id lookup
/// - Log the intended PUT payload
/// - **NOT** actually modify the record
///
/// # Security
///
/// The Debug implementation does NOT expose the API token.
pub struct CloudflareProvider {
    /// ⚠️ NEVER log this value in full
    api_token: AuthToken,

    /// API base URL, without trailing slash
    api_base: String,

    /// HTTP client for API requests
    client: reqwest::Client,

    /// Dry-run mode: if true, look up the record but skip the write
    dry_run: bool,
}

impl std::fmt::Debug for CloudflareProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudflareProvider")
            .field("api_token", &"<REDACTED>")
            .field("api_base", &self.api_base)
            .field("dry_run", &self.dry_run)
            .finish()
    }
}

impl CloudflareProvider {
    /// Create a new Cloudflare provider against the public API
    ///
    /// # Parameters
    ///
    /// - `api_token`: Cloudflare API token with Zone:DNS:Edit permissions
    /// - `dry_run`: If true, perform the lookup but skip the write
    ///
    /// # Errors
    ///
    /// Fails if the token is empty or the HTTP client cannot be built.
    pub fn new(api_token: AuthToken, dry_run: bool) -> Result<Self> {
        if api_token.is_empty() {
            return Err(Error::config("Cloudflare API token cannot be empty"));
        }

        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::provider("cloudflare", format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            api_token,
            api_base: CLOUDFLARE_API_BASE.to_string(),
            client,
            dry_run,
        })
    }

    /// Create a provider from configuration
    pub fn from_config(config: &ProviderConfig) -> Result<Self> {
        match config {
            ProviderConfig::Cloudflare {
                api_token,
                api_base,
                dry_run,
            } => {
                if *dry_run {
                    tracing::warn!(
                        "Cloudflare provider running in DRY-RUN mode - no changes will be made"
                    );
                }

                let provider = Self::new(api_token.clone(), *dry_run)?;
                Ok(match api_base {
                    Some(base) => provider.with_api_base(base),
                    None => provider,
                })
            }
        }
    }

    /// Point the provider at a different API base URL
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    /// Replace the HTTP client
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    fn records_url(&self, zone_id: &str) -> String {
        format!("{}/zones/{}/dns_records", self.api_base, zone_id)
    }

    /// Send a request and collect `(status, body)`, honouring cancellation
    async fn exchange(
        &self,
        request: impl Future<Output = reqwest::Result<reqwest::Response>>,
        cancel: &CancellationToken,
    ) -> Result<(u16, String)> {
        let exchange = async {
            let response = request
                .await
                .map_err(|e| Error::provider("cloudflare", format!("HTTP request failed: {}", e)))?;
            let status = response.status().as_u16();
            let body = response.text().await.map_err(|e| {
                Error::provider("cloudflare", format!("Failed to read response: {}", e))
            })?;
            Ok((status, body))
        };

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(Error::Cancelled),
            result = exchange => result,
        }
    }
}

#[async_trait]
impl RecordApi for CloudflareProvider {
    /// # API Call
    ///
    /// ```http
    /// GET /zones/:zone_id/dns_records?type=A&name=home.example.com
    /// Authorization: Bearer <token>
    /// ```
    async fn fetch_record_id(
        &self,
        zone_id: &str,
        record_name: &str,
        cancel: &CancellationToken,
    ) -> Result<String> {
        tracing::debug!(
            "Looking up record id: {} in zone {} (token {})",
            record_name,
            zone_id,
            self.api_token
        );

        let request = self
            .client
            .get(self.records_url(zone_id))
            .bearer_auth(self.api_token.expose())
            .query(&[("type", "A"), ("name", record_name)])
            .send();

        let (status, body) = self.exchange(request, cancel).await?;
        log_status_hint(status);

        let record_id = record_id_from_response(status, &body, zone_id, record_name)?;
        tracing::debug!("Found record ID: {}", record_id);
        Ok(record_id)
    }

    /// # API Call
    ///
    /// ```http
    /// PUT /zones/:zone_id/dns_records/:record_id
    /// {"type":"A","name":"home.example.com","content":"1.2.3.4","ttl":1,"proxied":false}
    /// ```
    async fn update_record(
        &self,
        zone_id: &str,
        record_id: &str,
        record_name: &str,
        ip: Ipv4Addr,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let url = format!("{}/{}", self.records_url(zone_id), record_id);
        let payload = serde_json::to_string(&UpdateRecordRequest::a_record(record_name, ip))?;

        tracing::info!(
            "{} Cloudflare DNS record: {} -> {} [mode: {}]",
            if self.dry_run { "Would update" } else { "Updating" },
            record_name,
            ip,
            if self.dry_run { "DRY-RUN" } else { "LIVE" }
        );

        if self.dry_run {
            tracing::info!(
                "[DRY-RUN] Would send PUT request to {} with payload: {}",
                url,
                payload
            );
            return Ok(());
        }

        let request = self
            .client
            .put(&url)
            .bearer_auth(self.api_token.expose())
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(payload.clone())
            .send();

        let (status, body) = self.exchange(request, cancel).await?;

        if !(200..300).contains(&status) {
            log_status_hint(status);
            return Err(Error::RemoteUpdate {
                status,
                request: payload,
                response: body,
            });
        }

        tracing::info!("DNS record updated successfully: {} -> {}", record_name, ip);
        Ok(())
    }

    fn provider_name(&self) -> &'static str {
        "cloudflare"
    }
}
