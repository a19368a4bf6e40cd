// # dyndns - one-shot dynamic DNS reconciler
//
// This binary is a THIN integration layer: it parses arguments, installs
// logging, wires signals to a cancellation token and runs the reconciler
// from dyndns-core exactly once. All DNS logic lives in dyndns-core.
//
// ## Configuration
//
// Positional arguments, each with an environment fallback:
// - `ZONE_ID` / `DDNS_ZONE_ID`: Cloudflare zone identifier
// - `RECORD` / `DDNS_RECORD`: record to keep current (e.g. home.example.com)
// - `AUTH_TOKEN` / `DDNS_API_TOKEN`: Cloudflare API token
//
// Options:
// - `--log-level` / `DDNS_LOG_LEVEL`: trace, debug, info, warn, error
// - `--dry-run` / `DDNS_DRY_RUN`: look up the record but skip the write
// - `--race-timeout` / `DDNS_RACE_TIMEOUT`: public IP race cap (seconds)
// - `--run-timeout` / `DDNS_RUN_TIMEOUT`: whole-run budget (seconds)
// - `--ip-provider URL`: repeatable, replaces the built-in lookup services
//
// ## Example
//
// ```bash
// dyndns 023e105f4ecef8ad9ca31a8372d0c353 home.example.com "$CF_TOKEN"
// ```
//
// Meant to be invoked repeatedly from a scheduler; nothing persists
// between invocations.

use anyhow::Result;
use clap::Parser;
use dyndns_core::config::{AuthToken, DdnsConfig, ProviderConfig};
use dyndns_core::{Reconciler, RunEvent, RunOutcome, SystemResolver};
use dyndns_ip_http::HttpIpFetcher;
use dyndns_provider_cloudflare::CloudflareProvider;
use std::process::ExitCode;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{Level, debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

/// Upper bound on waiting for queued events after the run
const EVENT_FLUSH_TIMEOUT: Duration = Duration::from_secs(5);

/// Upper bound on waiting for blocking work (e.g. a stalled getaddrinfo) at exit
const RUNTIME_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(1);

/// Exit codes for different termination scenarios
///
/// - 0: Record updated or already current
/// - 1: Configuration or startup error
/// - 2: Run failed
/// - 130: Interrupted by a signal (128 + SIGINT)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DyndnsExitCode {
    Success = 0,
    ConfigError = 1,
    RuntimeError = 2,
    Interrupted = 130,
}

impl From<DyndnsExitCode> for ExitCode {
    fn from(code: DyndnsExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Command-line options
#[derive(Parser)]
#[command(name = "dyndns", version)]
#[command(about = "Point a Cloudflare A record at this host's public IPv4 address", long_about = None)]
struct Cli {
    /// Cloudflare zone identifier
    #[arg(env = "DDNS_ZONE_ID")]
    zone_id: String,

    /// Record name to keep current (e.g. home.example.com)
    #[arg(env = "DDNS_RECORD")]
    record: String,

    /// Cloudflare API token with Zone:DNS:Edit permission
    #[arg(env = "DDNS_API_TOKEN", hide_env_values = true)]
    auth_token: String,

    /// Log level
    #[arg(
        long,
        env = "DDNS_LOG_LEVEL",
        default_value = "info",
        value_parser = ["trace", "debug", "info", "warn", "error"]
    )]
    log_level: String,

    /// Look up the record but do not write it
    #[arg(long, env = "DDNS_DRY_RUN")]
    dry_run: bool,

    /// Hard cap on the public IP race, in seconds
    #[arg(long, env = "DDNS_RACE_TIMEOUT", default_value_t = 15)]
    race_timeout: u64,

    /// Budget for the whole run, in seconds
    #[arg(long, env = "DDNS_RUN_TIMEOUT", default_value_t = 60)]
    run_timeout: u64,

    /// Public IP lookup service; repeat to race several
    #[arg(long = "ip-provider", value_name = "URL")]
    ip_providers: Vec<String>,

    /// Cloudflare API base URL override
    #[arg(long, env = "DDNS_API_BASE", hide = true)]
    api_base: Option<String>,
}

impl Cli {
    /// Build and validate the reconciler configuration
    fn into_config(self) -> dyndns_core::Result<DdnsConfig> {
        let provider = ProviderConfig::Cloudflare {
            api_token: AuthToken::new(self.auth_token),
            api_base: self.api_base,
            dry_run: self.dry_run,
        };

        let mut config = DdnsConfig::new(self.zone_id, self.record, provider);
        if !self.ip_providers.is_empty() {
            config = config.with_ip_providers(self.ip_providers);
        }
        config.engine.race_timeout_secs = self.race_timeout;
        config.engine.run_timeout_secs = self.run_timeout;

        config.validate()?;
        Ok(config)
    }
}

fn parse_level(level: &str) -> Level {
    match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // --help and --version also land here
            let _ = e.print();
            return if e.use_stderr() {
                DyndnsExitCode::ConfigError.into()
            } else {
                DyndnsExitCode::Success.into()
            };
        }
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(parse_level(&cli.log_level))
        .with_writer(std::io::stderr)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return DyndnsExitCode::ConfigError.into();
    }

    let config = match cli.into_config() {
        Ok(config) => config,
        Err(e) => {
            error!("Configuration validation error: {}", e);
            return DyndnsExitCode::ConfigError.into();
        }
    };

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return DyndnsExitCode::RuntimeError.into();
        }
    };

    block_then_shutdown(rt, run(config), RUNTIME_SHUTDOWN_TIMEOUT).into()
}

/// Drive `future` to completion, then tear the runtime down without waiting
/// longer than `grace` for leftover blocking tasks
fn block_then_shutdown<F: std::future::Future>(
    rt: tokio::runtime::Runtime,
    future: F,
    grace: Duration,
) -> F::Output {
    let output = rt.block_on(future);
    rt.shutdown_timeout(grace);
    output
}

/// Wire collaborators, run once and map the result to an exit code
async fn run(config: DdnsConfig) -> DyndnsExitCode {
    let dry_run = match &config.provider {
        ProviderConfig::Cloudflare {
            api_token, dry_run, ..
        } => {
            info!(
                "Starting dyndns for {} in zone {} (token {})",
                config.record_name, config.zone_id, api_token
            );
            *dry_run
        }
    };

    let record_api = match CloudflareProvider::from_config(&config.provider) {
        Ok(provider) => provider,
        Err(e) => {
            error!("Failed to create Cloudflare provider: {}", e);
            return DyndnsExitCode::ConfigError;
        }
    };

    let (reconciler, events) = match Reconciler::new(
        Box::new(HttpIpFetcher::new()),
        Box::new(SystemResolver::new()),
        Box::new(record_api),
        config,
    ) {
        Ok(pair) => pair,
        Err(e) => {
            error!("Failed to create reconciler: {}", e);
            return DyndnsExitCode::ConfigError;
        }
    };

    let cancel = CancellationToken::new();
    let signal_cancel = cancel.clone();
    let signals = tokio::spawn(async move {
        match wait_for_shutdown_signal().await {
            Ok(signal) => {
                info!("Received {}, cancelling run", signal);
                signal_cancel.cancel();
            }
            Err(e) => warn!("Signal handling unavailable: {}", e),
        }
    });
    let drain = tokio::spawn(log_events(events));

    let result = reconciler.run(&cancel).await;

    signals.abort();
    // Dropping the reconciler closes the event channel
    drop(reconciler);
    if tokio::time::timeout(EVENT_FLUSH_TIMEOUT, drain).await.is_err() {
        warn!("Event flush did not finish within {:?}", EVENT_FLUSH_TIMEOUT);
    }

    match result {
        Ok(RunOutcome::AlreadyCurrent { ip }) => {
            println!("Already up-to-date: {}", ip);
            DyndnsExitCode::Success
        }
        Ok(RunOutcome::Updated { ip, .. }) => {
            if dry_run {
                println!("Dry run, would update to: {}", ip);
            } else {
                println!("Updated to: {}", ip);
            }
            DyndnsExitCode::Success
        }
        Err(e) if e.is_cancellation() => {
            warn!("Run interrupted");
            DyndnsExitCode::Interrupted
        }
        Err(e) => {
            error!("{}", e);
            DyndnsExitCode::RuntimeError
        }
    }
}

/// Telemetry sink: record every run event in the log
async fn log_events(mut events: mpsc::Receiver<RunEvent>) {
    while let Some(event) = events.recv().await {
        match event {
            RunEvent::RunStarted {
                zone_id,
                record_name,
            } => debug!(%zone_id, %record_name, "run started"),
            RunEvent::RaceStarted { providers } => debug!(providers, "race started"),
            RunEvent::ProviderFailed {
                endpoint,
                reason,
                remaining,
                elapsed,
            } => debug!(%endpoint, %reason, remaining, ?elapsed, "provider failed"),
            RunEvent::RaceWon {
                endpoint,
                ip,
                abandoned,
                elapsed,
            } => debug!(%endpoint, %ip, abandoned, ?elapsed, "race won"),
            RunEvent::RaceFailed {
                attempted,
                timed_out,
            } => debug!(attempted, timed_out, "race failed"),
            RunEvent::LocalResolved {
                record_name,
                addresses,
            } => debug!(%record_name, ?addresses, "record resolved locally"),
            RunEvent::Compared {
                public_ip,
                published,
                update_required,
            } => debug!(%public_ip, ?published, update_required, "compared"),
            RunEvent::RecordIdFetched { record_id } => debug!(%record_id, "record id fetched"),
            RunEvent::RecordUpdated { record_id, ip } => {
                debug!(%record_id, %ip, "record updated")
            }
            RunEvent::RunFinished { outcome } => debug!(?outcome, "run finished"),
            RunEvent::RunFailed { error, cancelled } => {
                debug!(%error, cancelled, "run failed")
            }
        }
    }
}

/// Wait for SIGTERM or SIGINT
///
/// # Returns
///
/// The name of the signal received, or an error if handlers cannot be installed.
#[cfg(unix)]
async fn wait_for_shutdown_signal() -> Result<&'static str> {
    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGINT handler: {}", e))?;

    let received = tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    };
    Ok(received)
}

/// Wait for CTRL-C
///
/// Fallback implementation for non-Unix platforms.
#[cfg(not(unix))]
async fn wait_for_shutdown_signal() -> Result<&'static str> {
    tokio::signal::ctrl_c()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to wait for CTRL-C: {}", e))?;
    Ok("SIGINT")
}
