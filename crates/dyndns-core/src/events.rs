//! Run events
//!
//! Telemetry for a run is a stream of [`RunEvent`] values pushed onto a
//! bounded channel. Emission never blocks and never fails the run: a full
//! channel drops the event with a warning, a closed one drops it silently.

use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{trace, warn};

/// Final outcome of a successful run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// The record was rewritten to the new address
    Updated {
        /// Address now published
        ip: Ipv4Addr,
        /// Identifier of the record that was written
        record_id: String,
        /// Addresses the record resolved to before the write
        previous: Vec<IpAddr>,
    },

    /// The record already pointed at the public address
    AlreadyCurrent {
        /// The public (and published) address
        ip: Ipv4Addr,
    },
}

impl RunOutcome {
    /// The public IP address this run settled on
    pub fn ip(&self) -> Ipv4Addr {
        match self {
            RunOutcome::Updated { ip, .. } | RunOutcome::AlreadyCurrent { ip } => *ip,
        }
    }

    pub fn was_updated(&self) -> bool {
        matches!(self, RunOutcome::Updated { .. })
    }
}

/// Events emitted by the reconciler during a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunEvent {
    /// Run started
    RunStarted {
        zone_id: String,
        record_name: String,
    },

    /// Public IP race started
    RaceStarted {
        providers: usize,
    },

    /// One provider failed to produce a usable address
    ProviderFailed {
        endpoint: String,
        reason: String,
        /// Providers still in flight after this one was dropped
        remaining: usize,
        /// Time from race start until this provider was given up on
        elapsed: Duration,
    },

    /// A provider answered with a valid address first
    RaceWon {
        endpoint: String,
        ip: Ipv4Addr,
        /// Requests still in flight that were cancelled
        abandoned: usize,
        /// Time from race start until the winning answer
        elapsed: Duration,
    },

    /// No provider produced a usable address
    RaceFailed {
        attempted: usize,
        timed_out: bool,
    },

    /// Local resolution of the published record finished
    LocalResolved {
        record_name: String,
        addresses: Vec<IpAddr>,
    },

    /// Public and published addresses were compared
    Compared {
        public_ip: Ipv4Addr,
        published: Vec<IpAddr>,
        update_required: bool,
    },

    /// The remote record identifier was fetched
    RecordIdFetched {
        record_id: String,
    },

    /// The remote record was written
    RecordUpdated {
        record_id: String,
        ip: Ipv4Addr,
    },

    /// Run finished successfully
    RunFinished {
        outcome: RunOutcome,
    },

    /// Run failed or was interrupted
    RunFailed {
        error: String,
        cancelled: bool,
    },
}

/// Fire-and-forget sender half of the event channel
#[derive(Debug, Clone)]
pub struct EventSink {
    tx: mpsc::Sender<RunEvent>,
}

impl EventSink {
    /// Create a sink and the receiver that observes it
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<RunEvent>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }

    /// Emit an event without waiting
    pub fn emit(&self, event: RunEvent) {
        match self.tx.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) => {
                warn!(
                    "Event channel full, dropping event {:?}. Consider increasing event_channel_capacity.",
                    event
                );
            }
            Err(TrySendError::Closed(_)) => {
                trace!("Event receiver dropped, discarding event");
            }
        }
    }
}
