//! Reconciliation engine
//!
//! The Reconciler is responsible for:
//! - Racing the public IP providers
//! - Resolving the published record locally, concurrently with the race
//! - Deciding whether the record is stale
//! - Fetching the record identifier and writing the new address, only when stale
//!
//! ## Architecture
//!
//! ```text
//!                     ┌──────────────┐
//!                     │  Reconciler  │── RunEvent ──▶ events
//!                     └──────────────┘
//!                            │
//!             ┌──────────────┴──────────────┐
//!             ▼   (concurrently)            ▼
//!     ┌───────────────┐             ┌────────────────┐
//!     │ ProviderRace  │             │ RecordResolver │
//!     │ (IpFetcher×N) │             │ (local lookup) │
//!     └───────────────┘             └────────────────┘
//!             │                             │
//!             └────────────┬────────────────┘
//!                          ▼
//!                       compare ── equal ──▶ AlreadyCurrent
//!                          │
//!                        differ
//!                          ▼
//!                 ┌─────────────────┐
//!                 │    RecordApi    │ fetch_record_id → update_record
//!                 └─────────────────┘
//!                          ▼
//!                       Updated
//! ```
//!
//! ## Run Flow
//!
//! 1. Derive a [`RunContext`] from the caller's token
//! 2. Race providers and resolve the record locally, in parallel
//! 3. If the record already publishes the public IP, stop
//! 4. Otherwise fetch the record id, then write the new address
//!
//! The record id is fetched only after the comparison so the common
//! "nothing to do" run issues no request against the record API.

use crate::config::{DdnsConfig, ProviderConfig};
use crate::context::RunContext;
use crate::error::{Error, Result};
use crate::events::{EventSink, RunEvent, RunOutcome};
use crate::race::ProviderRace;
use crate::traits::{IpFetcher, RecordApi, RecordResolver};
use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// One-shot DNS reconciler
///
/// ## Lifecycle
///
/// 1. Create with [`Reconciler::new()`]
/// 2. Call [`Reconciler::run()`] once per invocation
/// 3. Drain the returned event receiver for telemetry
///
/// A reconciler holds no state between runs; calling `run` again simply
/// repeats the whole flow.
pub struct Reconciler {
    /// Fetcher used for every race request
    ip_fetcher: Box<dyn IpFetcher>,

    /// Local resolver for the published record
    resolver: Box<dyn RecordResolver>,

    /// Record-management API
    record_api: Box<dyn RecordApi>,

    zone_id: String,
    record_name: String,

    /// Lookup endpoints, in declaration order
    ip_providers: Vec<String>,

    /// Hard cap on the race
    race_timeout: Duration,

    /// Budget for a whole run
    run_timeout: Duration,

    /// Event sender for external monitoring
    events: EventSink,
}

impl Reconciler {
    /// Create a new reconciler
    ///
    /// # Parameters
    ///
    /// - `ip_fetcher`: Public IP lookup implementation
    /// - `resolver`: Local resolver for the published record
    /// - `record_api`: Record-management API implementation
    /// - `config`: Reconciler configuration
    ///
    /// # Returns
    ///
    /// A tuple of (reconciler, event_receiver) where event_receiver yields run events
    pub fn new(
        ip_fetcher: Box<dyn IpFetcher>,
        resolver: Box<dyn RecordResolver>,
        record_api: Box<dyn RecordApi>,
        config: DdnsConfig,
    ) -> Result<(Self, mpsc::Receiver<RunEvent>)> {
        config.validate()?;

        match &config.provider {
            ProviderConfig::Cloudflare { .. } => {
                debug!(
                    "Reconciler configured for {} (record API: {})",
                    config.provider.type_name(),
                    record_api.provider_name()
                );
            }
        }

        let (events, rx) = EventSink::channel(config.engine.event_channel_capacity);

        let reconciler = Self {
            ip_fetcher,
            resolver,
            record_api,
            zone_id: config.zone_id,
            record_name: config.record_name,
            ip_providers: config.ip_providers,
            race_timeout: config.engine.race_timeout(),
            run_timeout: config.engine.run_timeout(),
            events,
        };

        Ok((reconciler, rx))
    }

    /// Run one reconciliation
    ///
    /// # Parameters
    ///
    /// - `cancel`: External cancellation signal (e.g. cancelled on SIGINT)
    ///
    /// # Returns
    ///
    /// - `Ok(RunOutcome)`: The record is now current
    /// - `Err(Error::Cancelled)`: `cancel` fired before the run completed
    /// - `Err(Error::DeadlineExceeded)`: The run budget elapsed
    /// - `Err(Error)`: Any other fatal failure
    pub async fn run(&self, cancel: &CancellationToken) -> Result<RunOutcome> {
        let ctx = RunContext::new(cancel, self.run_timeout);
        let _guard = ctx.token().clone().drop_guard();

        info!(
            "Reconciling {} in zone {}",
            self.record_name, self.zone_id
        );
        self.events.emit(RunEvent::RunStarted {
            zone_id: self.zone_id.clone(),
            record_name: self.record_name.clone(),
        });

        let result = tokio::select! {
            biased;
            _ = ctx.token().cancelled() => Err(Error::Cancelled),
            _ = tokio::time::sleep_until(ctx.deadline()) => Err(Error::DeadlineExceeded(ctx.budget())),
            result = self.reconcile(&ctx) => result,
        };

        // Tear down anything still in flight before reporting
        ctx.cancel();

        match &result {
            Ok(outcome) => {
                self.events.emit(RunEvent::RunFinished {
                    outcome: outcome.clone(),
                });
            }
            Err(e) if e.is_cancellation() => {
                info!("Run interrupted before completion");
                self.events.emit(RunEvent::RunFailed {
                    error: e.to_string(),
                    cancelled: true,
                });
            }
            Err(e) => {
                error!("Run failed: {}", e);
                self.events.emit(RunEvent::RunFailed {
                    error: e.to_string(),
                    cancelled: false,
                });
            }
        }

        result
    }

    async fn reconcile(&self, ctx: &RunContext) -> Result<RunOutcome> {
        let race = ProviderRace::new(self.ip_fetcher.as_ref(), self.race_timeout, &self.events);

        let (public_ip, published) = tokio::try_join!(
            race.run(&self.ip_providers, ctx),
            self.resolve_published(ctx),
        )?;

        let update_required = !publishes(&published, public_ip);
        self.events.emit(RunEvent::Compared {
            public_ip,
            published: published.clone(),
            update_required,
        });

        if !update_required {
            info!("{} already points at {}", self.record_name, public_ip);
            ctx.cancel();
            return Ok(RunOutcome::AlreadyCurrent { ip: public_ip });
        }

        info!(
            "{} publishes {:?}, updating to {}",
            self.record_name, published, public_ip
        );

        let record_id = self
            .record_api
            .fetch_record_id(&self.zone_id, &self.record_name, ctx.token())
            .await?;
        debug!("Record id for {}: {}", self.record_name, record_id);
        self.events.emit(RunEvent::RecordIdFetched {
            record_id: record_id.clone(),
        });

        self.record_api
            .update_record(
                &self.zone_id,
                &record_id,
                &self.record_name,
                public_ip,
                ctx.token(),
            )
            .await?;
        info!("Updated {} -> {}", self.record_name, public_ip);
        self.events.emit(RunEvent::RecordUpdated {
            record_id: record_id.clone(),
            ip: public_ip,
        });

        Ok(RunOutcome::Updated {
            ip: public_ip,
            record_id,
            previous: published,
        })
    }

    async fn resolve_published(&self, ctx: &RunContext) -> Result<Vec<IpAddr>> {
        let addresses = self
            .resolver
            .resolve(&self.record_name, ctx.token())
            .await?;

        self.events.emit(RunEvent::LocalResolved {
            record_name: self.record_name.clone(),
            addresses: addresses.clone(),
        });

        Ok(addresses)
    }
}

/// Whether any published address equals `ip`, including IPv4-mapped IPv6
fn publishes(published: &[IpAddr], ip: Ipv4Addr) -> bool {
    published.iter().any(|addr| match addr {
        IpAddr::V4(v4) => *v4 == ip,
        IpAddr::V6(v6) => v6.to_ipv4_mapped() == Some(ip),
    })
}
