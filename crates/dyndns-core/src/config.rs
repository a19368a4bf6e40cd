//! Configuration types for the reconciler
//!
//! This module defines all configuration structures used throughout the crate.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Built-in public IP lookup services, raced against each other
pub const DEFAULT_IP_PROVIDERS: &[&str] = &[
    "https://checkip.amazonaws.com",
    "https://api.ipify.org",
    "https://api.my-ip.io/ip",
];

/// Main reconciler configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DdnsConfig {
    /// Zone identifier in the record-management API
    pub zone_id: String,

    /// DNS record name (e.g., "home.example.com")
    pub record_name: String,

    /// DNS provider configuration
    pub provider: ProviderConfig,

    /// Public IP lookup endpoints, in declaration order
    #[serde(default = "default_ip_providers")]
    pub ip_providers: Vec<String>,

    /// Optional engine settings
    #[serde(default)]
    pub engine: EngineConfig,
}

impl DdnsConfig {
    /// Create a configuration for one record with default engine settings
    pub fn new(
        zone_id: impl Into<String>,
        record_name: impl Into<String>,
        provider: ProviderConfig,
    ) -> Self {
        Self {
            zone_id: zone_id.into(),
            record_name: record_name.into(),
            provider,
            ip_providers: default_ip_providers(),
            engine: EngineConfig::default(),
        }
    }

    /// Replace the public IP lookup endpoints
    pub fn with_ip_providers(mut self, ip_providers: Vec<String>) -> Self {
        self.ip_providers = ip_providers;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.zone_id.trim().is_empty() {
            return Err(crate::Error::config("Zone ID cannot be empty"));
        }

        if self.record_name.trim().is_empty() {
            return Err(crate::Error::config("Record name cannot be empty"));
        }

        self.provider.validate()?;

        if self.ip_providers.is_empty() {
            return Err(crate::Error::config(
                "At least one public IP provider is required",
            ));
        }

        for url in &self.ip_providers {
            if !url.starts_with("https://") && !url.starts_with("http://") {
                return Err(crate::Error::config(format!(
                    "Public IP provider must use HTTP or HTTPS scheme. Got: {}",
                    url
                )));
            }
        }

        self.engine.validate()
    }
}

/// Bearer token for the record-management API
///
/// The value is never printed: `Debug` and `Display` redact it and
/// [`AuthToken::truncated`] is the only diagnostic view.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AuthToken(String);

impl AuthToken {
    /// Wrap a raw token
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// The raw token, for building the Authorization header
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// At most the first three characters, for diagnostics
    pub fn truncated(&self) -> &str {
        match self.0.char_indices().nth(3) {
            Some((idx, _)) => &self.0[..idx],
            None => &self.0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AuthToken(<REDACTED>)")
    }
}

impl fmt::Display for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}***", self.truncated())
    }
}

/// DNS provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProviderConfig {
    /// Cloudflare provider
    Cloudflare {
        /// Cloudflare API token
        api_token: AuthToken,
        /// API base URL override (defaults to the public v4 endpoint)
        #[serde(default)]
        api_base: Option<String>,
        /// Perform lookups but skip the record write
        #[serde(default)]
        dry_run: bool,
    },
}

impl ProviderConfig {
    /// Cloudflare configuration with the public API and live writes
    pub fn cloudflare(api_token: impl Into<String>) -> Self {
        ProviderConfig::Cloudflare {
            api_token: AuthToken::new(api_token),
            api_base: None,
            dry_run: false,
        }
    }

    /// Validate the provider configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            ProviderConfig::Cloudflare { api_token, .. } => {
                if api_token.is_empty() {
                    return Err(crate::Error::config("Cloudflare API token cannot be empty"));
                }
                Ok(())
            }
        }
    }

    /// Get the provider type name
    pub fn type_name(&self) -> &str {
        match self {
            ProviderConfig::Cloudflare { .. } => "cloudflare",
        }
    }
}

/// Engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Hard cap on the public IP race (in seconds)
    #[serde(default = "default_race_timeout_secs")]
    pub race_timeout_secs: u64,

    /// Overall budget for one run (in seconds)
    ///
    /// The race cap is further bounded by this: whichever is shorter wins.
    #[serde(default = "default_run_timeout_secs")]
    pub run_timeout_secs: u64,

    /// Capacity of the run event channel
    ///
    /// When full, new events are dropped (with a warning log).
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
}

impl EngineConfig {
    pub fn race_timeout(&self) -> Duration {
        Duration::from_secs(self.race_timeout_secs)
    }

    pub fn run_timeout(&self) -> Duration {
        Duration::from_secs(self.run_timeout_secs)
    }

    /// Validate the engine configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.race_timeout_secs == 0 {
            return Err(crate::Error::config("Race timeout must be > 0"));
        }
        if self.run_timeout_secs == 0 {
            return Err(crate::Error::config("Run timeout must be > 0"));
        }
        if self.event_channel_capacity == 0 {
            return Err(crate::Error::config("Event channel capacity must be > 0"));
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            race_timeout_secs: default_race_timeout_secs(),
            run_timeout_secs: default_run_timeout_secs(),
            event_channel_capacity: default_event_channel_capacity(),
        }
    }
}

fn default_ip_providers() -> Vec<String> {
    DEFAULT_IP_PROVIDERS.iter().map(|s| s.to_string()).collect()
}

fn default_race_timeout_secs() -> u64 {
    15
}

fn default_run_timeout_secs() -> u64 {
    60
}

fn default_event_channel_capacity() -> usize {
    100
}
