//! Run-scoped cancellation and deadline
//!
//! Two nested scopes exist per run:
//!
//! ```text
//! external token (signal)
//!   └── RunContext   (child token, run deadline)
//!         └── RaceScope (child token, min(run deadline, now + race cap))
//! ```
//!
//! Cancelling a parent always cancels its children. A child may cancel
//! itself (the race does so once it has a winner) without touching the
//! parent. Only the [`Reconciler`](crate::Reconciler) creates a
//! `RunContext`; everything below it observes or derives from it.

use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Cancellation signal and deadline shared by every operation of one run
#[derive(Debug)]
pub struct RunContext {
    token: CancellationToken,
    deadline: Instant,
    budget: Duration,
}

impl RunContext {
    /// Derive a run context from the caller's cancellation signal
    pub(crate) fn new(external: &CancellationToken, budget: Duration) -> Self {
        Self {
            token: external.child_token(),
            deadline: Instant::now() + budget,
            budget,
        }
    }

    /// The run-wide cancellation token
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Absolute deadline of the run
    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    /// Total budget the deadline was computed from
    pub fn budget(&self) -> Duration {
        self.budget
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Abort everything still in flight under this run
    pub(crate) fn cancel(&self) {
        self.token.cancel();
    }

    /// Derive the race-local scope, capped at `cap` from now
    pub(crate) fn race_scope(&self, cap: Duration) -> RaceScope {
        let capped_at = Instant::now() + cap;
        let (deadline, limited_by_race) = if capped_at <= self.deadline {
            (capped_at, true)
        } else {
            (self.deadline, false)
        };

        RaceScope {
            token: self.token.child_token(),
            deadline,
            limited_by_race,
        }
    }
}

/// Cancellation scope owned by one provider race
#[derive(Debug)]
pub(crate) struct RaceScope {
    token: CancellationToken,
    deadline: Instant,
    limited_by_race: bool,
}

impl RaceScope {
    pub(crate) fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub(crate) fn deadline(&self) -> Instant {
        self.deadline
    }

    /// True when the race cap, not the run deadline, is the binding limit
    pub(crate) fn limited_by_race(&self) -> bool {
        self.limited_by_race
    }

    /// Cancel every request issued under this scope
    pub(crate) fn cancel(&self) {
        self.token.cancel();
    }
}
