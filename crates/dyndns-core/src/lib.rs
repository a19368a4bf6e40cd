// # dyndns-core
//
// Core library for the one-shot dynamic DNS reconciler.
//
// ## Architecture Overview
//
// This library provides the core functionality for keeping one A record
// pointed at the host's public address:
// - **IpFetcher**: Trait for querying one public IP lookup service
// - **RecordApi**: Trait for looking up and rewriting a record via a provider API
// - **RecordResolver**: Trait for resolving the published record locally
// - **Reconciler**: Races the lookups, compares, and writes only on divergence
//
// ## Design Principles
//
// 1. **Separation of Concerns**: Core logic is separate from implementations
// 2. **Stateless**: Nothing persists between runs; every run starts fresh
// 3. **Bounded**: One cancellation token and one deadline govern every request
// 4. **Library-First**: All core functionality can be used as a library

pub mod traits;
pub mod engine;
pub mod config;
pub mod context;
pub mod error;
pub mod events;
pub mod race;
pub mod resolver;

// Re-export core types for convenience
pub use traits::{IpFetcher, RecordApi, RecordResolver};
pub use engine::Reconciler;
pub use config::{AuthToken, DdnsConfig, EngineConfig, ProviderConfig};
pub use context::RunContext;
pub use error::{Error, Result};
pub use events::{EventSink, RunEvent, RunOutcome};
pub use race::{parse_public_ip, sanitize_ip_response};
pub use resolver::SystemResolver;
