// # Record API Trait
//
// Defines the interface for looking up and rewriting one A record through
// a DNS provider's HTTP API.
//
// ## Implementations
//
// - Cloudflare: `dyndns-provider-cloudflare` crate
//
// ## Usage
//
// ```rust,ignore
// use dyndns_core::RecordApi;
//
// let id = api.fetch_record_id(zone_id, "home.example.com", &cancel).await?;
// api.update_record(zone_id, &id, "home.example.com", ip, &cancel).await?;
// ```

use async_trait::async_trait;
use std::net::Ipv4Addr;
use tokio_util::sync::CancellationToken;

/// Trait for DNS record-management implementations
///
/// The implementation owns its credentials. The reconciler only passes
/// identifiers and the address to publish.
///
/// # Trust Level: Untrusted
///
/// ## Allowed Capabilities
/// - ✅ HTTP/HTTPS API calls to the provider endpoint only
/// - ✅ Parse provider-specific responses
///
/// ## Forbidden Capabilities
/// - ❌ Spawn tasks or threads
/// - ❌ Retry or back off
/// - ❌ Decide whether an update is needed (owned by the `Reconciler`)
/// - ❌ Log or return the full credential
#[async_trait]
pub trait RecordApi: Send + Sync {
    /// Find the identifier of the record named `record_name` in `zone_id`
    ///
    /// The first match is used. A response that is not a success, cannot
    /// be decoded, lists no records or lacks an identifier is reported as
    /// [`Error::RecordNotFound`](crate::Error::RecordNotFound) carrying the
    /// status and raw body.
    async fn fetch_record_id(
        &self,
        zone_id: &str,
        record_name: &str,
        cancel: &CancellationToken,
    ) -> Result<String, crate::Error>;

    /// Replace the record's content with `ip`
    ///
    /// Writes an A record with automatic TTL and no proxying. A rejected
    /// write is reported as [`Error::RemoteUpdate`](crate::Error::RemoteUpdate).
    async fn update_record(
        &self,
        zone_id: &str,
        record_id: &str,
        record_name: &str,
        ip: Ipv4Addr,
        cancel: &CancellationToken,
    ) -> Result<(), crate::Error>;

    /// Get the provider name (for logging/debugging)
    fn provider_name(&self) -> &'static str;
}
