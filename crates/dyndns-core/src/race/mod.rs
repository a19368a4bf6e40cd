//! Public IP race
//!
//! Every configured lookup endpoint is queried at once. The first response
//! that sanitizes to a valid IPv4 address wins and the remaining requests
//! are cancelled. Individual failures only shrink the working set; the
//! race fails once the set is empty or the race cap expires.
//!
//! ```text
//!   endpoint A ──┐
//!   endpoint B ──┼── FuturesUnordered ── first valid IPv4 ──▶ winner
//!   endpoint C ──┘        │                                    │
//!                         └── failures: warn + shrink          └── cancel rest
//! ```

use crate::context::RunContext;
use crate::events::{EventSink, RunEvent};
use crate::traits::IpFetcher;
use crate::{Error, Result};
use futures_util::stream::{FuturesUnordered, StreamExt};
use std::net::Ipv4Addr;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Keep only the characters that may appear in a dotted-quad address
pub fn sanitize_ip_response(body: &str) -> String {
    body.chars().filter(|c| c.is_ascii_digit() || *c == '.').collect()
}

/// Turn a raw provider response into an IPv4 address
pub fn parse_public_ip(body: &str) -> Result<Ipv4Addr> {
    let sanitized = sanitize_ip_response(body);
    sanitized.parse::<Ipv4Addr>().map_err(|_| {
        Error::invalid_input(format!(
            "Response is not an IPv4 address (sanitized: {:?})",
            sanitized
        ))
    })
}

/// One race across the configured lookup endpoints
pub(crate) struct ProviderRace<'a> {
    fetcher: &'a dyn IpFetcher,
    cap: Duration,
    events: &'a EventSink,
}

impl<'a> ProviderRace<'a> {
    pub(crate) fn new(fetcher: &'a dyn IpFetcher, cap: Duration, events: &'a EventSink) -> Self {
        Self {
            fetcher,
            cap,
            events,
        }
    }

    /// Resolve the public address from the first endpoint to answer validly
    ///
    /// # Returns
    ///
    /// - `Ok(Ipv4Addr)`: The winning address
    /// - `Err(Error::AllProvidersFailed)`: Every endpoint failed, or the race
    ///   cap expired first (`timed_out: true`)
    /// - `Err(Error::DeadlineExceeded)`: The run deadline expired first
    /// - `Err(Error::Cancelled)`: The run was cancelled
    pub(crate) async fn run(&self, endpoints: &[String], ctx: &RunContext) -> Result<Ipv4Addr> {
        let attempted = endpoints.len();
        let started = Instant::now();
        let scope = ctx.race_scope(self.cap);
        let _guard = scope.token().clone().drop_guard();

        info!("Racing {} public IP providers", attempted);
        self.events.emit(RunEvent::RaceStarted {
            providers: attempted,
        });

        let token = scope.token();
        let fetcher = self.fetcher;
        let mut pending: FuturesUnordered<_> = endpoints
            .iter()
            .map(move |endpoint| async move {
                (endpoint.as_str(), fetcher.fetch(endpoint, token).await)
            })
            .collect();
        let mut in_flight: Vec<&str> = endpoints.iter().map(String::as_str).collect();

        let deadline = tokio::time::sleep_until(scope.deadline());
        tokio::pin!(deadline);

        loop {
            let (endpoint, result) = tokio::select! {
                biased;

                _ = token.cancelled() => {
                    debug!("Race cancelled with {} requests in flight", in_flight.len());
                    return Err(Error::Cancelled);
                }

                _ = &mut deadline => {
                    scope.cancel();

                    if !scope.limited_by_race() {
                        return Err(Error::DeadlineExceeded(ctx.budget()));
                    }

                    let elapsed = started.elapsed();
                    while let Some(endpoint) = in_flight.pop() {
                        self.provider_failed(endpoint, "timed out", in_flight.len(), elapsed);
                    }
                    return Err(self.exhausted(attempted, true));
                }

                next = pending.next() => match next {
                    Some(done) => done,
                    None => return Err(self.exhausted(attempted, false)),
                },
            };

            if let Some(pos) = in_flight.iter().position(|e| *e == endpoint) {
                in_flight.remove(pos);
            }

            match result.and_then(|body| parse_public_ip(&body)) {
                Ok(ip) => {
                    let abandoned = pending.len();
                    let elapsed = started.elapsed();
                    scope.cancel();

                    info!(
                        "Public IP {} from {} after {:?} ({} requests abandoned)",
                        ip, endpoint, elapsed, abandoned
                    );
                    self.events.emit(RunEvent::RaceWon {
                        endpoint: endpoint.to_string(),
                        ip,
                        abandoned,
                        elapsed,
                    });
                    return Ok(ip);
                }
                Err(Error::Cancelled) if token.is_cancelled() => {
                    return Err(Error::Cancelled);
                }
                Err(e) => {
                    self.provider_failed(endpoint, &e.to_string(), pending.len(), started.elapsed());
                }
            }
        }
    }

    fn provider_failed(&self, endpoint: &str, reason: &str, remaining: usize, elapsed: Duration) {
        warn!(
            "Public IP provider {} failed after {:?}: {} ({} left)",
            endpoint, elapsed, reason, remaining
        );
        self.events.emit(RunEvent::ProviderFailed {
            endpoint: endpoint.to_string(),
            reason: reason.to_string(),
            remaining,
            elapsed,
        });
    }

    fn exhausted(&self, attempted: usize, timed_out: bool) -> Error {
        self.events.emit(RunEvent::RaceFailed {
            attempted,
            timed_out,
        });
        Error::AllProvidersFailed {
            attempted,
            timed_out,
        }
    }
}
