// # IP Fetcher Trait
//
// Defines the interface for asking a single public IP lookup service
// which address the caller appears to come from.
//
// ## Implementations
//
// - HTTP GET: `dyndns-ip-http` crate
//
// ## Usage
//
// ```rust,ignore
// use dyndns_core::IpFetcher;
// use tokio_util::sync::CancellationToken;
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let fetcher = /* IpFetcher implementation */;
//     let cancel = CancellationToken::new();
//
//     let body = fetcher.fetch("https://api.ipify.org", &cancel).await?;
//     println!("raw answer: {body}");
//
//     Ok(())
// }
// ```

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

/// Trait for public IP lookup implementations
///
/// A fetcher performs exactly one request against one endpoint and hands
/// back the body untouched. Sanitizing and parsing the body, choosing a
/// winner between endpoints and cancelling the losers all belong to the
/// race in the core crate.
///
/// # Thread Safety
///
/// The race issues every request concurrently through a single shared
/// fetcher, so implementations must be `Send + Sync`.
///
/// # Trust Level: Untrusted
///
/// ## Allowed Capabilities
/// - ✅ One HTTP/HTTPS request to the given endpoint
/// - ✅ Return the response body or an error
///
/// ## Forbidden Capabilities
/// - ❌ Spawn tasks or threads
/// - ❌ Retry or back off (a failed endpoint simply loses the race)
/// - ❌ Parse or validate the address
/// - ❌ Outlive the cancellation token
#[async_trait]
pub trait IpFetcher: Send + Sync {
    /// Fetch the response body of one lookup endpoint
    ///
    /// # Cancellation
    ///
    /// Once `cancel` fires the implementation must stop waiting on the
    /// network and return [`Error::Cancelled`](crate::Error::Cancelled).
    ///
    /// # Returns
    ///
    /// - `Ok(String)`: Raw body of a successful response
    /// - `Err(Error)`: Transport failure, non-success status or cancellation
    async fn fetch(
        &self,
        endpoint: &str,
        cancel: &CancellationToken,
    ) -> Result<String, crate::Error>;
}
