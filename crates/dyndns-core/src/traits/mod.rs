//! Core traits for the reconciler
//!
//! This module defines the abstract interfaces that all implementations must follow.
//!
//! - [`IpFetcher`]: Fetch the raw answer of one public IP lookup service
//! - [`RecordApi`]: Look up and rewrite a record through a provider API
//! - [`RecordResolver`]: Resolve the published record locally

pub mod ip_fetcher;
pub mod record_api;
pub mod record_resolver;

pub use ip_fetcher::IpFetcher;
pub use record_api::RecordApi;
pub use record_resolver::RecordResolver;
