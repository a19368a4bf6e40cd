//! System resolver
//!
//! [`RecordResolver`] backed by the host's configured resolver through
//! `tokio::net::lookup_host`.

use crate::traits::RecordResolver;
use crate::{Error, Result};
use async_trait::async_trait;
use std::net::IpAddr;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Resolves records with the operating system's resolver
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemResolver;

impl SystemResolver {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl RecordResolver for SystemResolver {
    async fn resolve(&self, record_name: &str, cancel: &CancellationToken) -> Result<Vec<IpAddr>> {
        let lookup = tokio::net::lookup_host((record_name, 0));

        let addrs = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(Error::Cancelled),
            result = lookup => result
                .map_err(|e| Error::local_resolution(record_name, e.to_string()))?,
        };

        let mut addresses: Vec<IpAddr> = Vec::new();
        for addr in addrs {
            let ip = addr.ip();
            if !addresses.contains(&ip) {
                addresses.push(ip);
            }
        }

        debug!("Resolved {} to {:?}", record_name, addresses);
        Ok(addresses)
    }
}
