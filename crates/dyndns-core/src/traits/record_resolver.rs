// # Record Resolver Trait
//
// Defines how the currently published addresses of a record are observed.
// The default implementation is [`SystemResolver`](crate::SystemResolver),
// which goes through the host's configured resolver.

use async_trait::async_trait;
use std::net::IpAddr;
use tokio_util::sync::CancellationToken;

/// Trait for local record resolution
///
/// Resolution is a read-only observation. Implementations must not
/// filter by address family: every address the resolver returns is
/// handed back and the comparison decides what matters.
#[async_trait]
pub trait RecordResolver: Send + Sync {
    /// Resolve `record_name` to the addresses it currently publishes
    ///
    /// # Returns
    ///
    /// - `Ok(Vec<IpAddr>)`: Possibly empty list of addresses
    /// - `Err(Error)`: Resolution failed or was cancelled
    async fn resolve(
        &self,
        record_name: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<IpAddr>, crate::Error>;
}
