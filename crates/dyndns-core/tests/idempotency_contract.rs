//! Contract Test: Idempotence
//!
//! Constraints verified:
//! - Repeated runs without an IP change never touch the record API
//! - A run after a successful update sees the new value and does nothing
//! - No state is carried between runs

mod common;

use common::*;
use dyndns_core::{Reconciler, RunOutcome};
use tokio_test::assert_ok;
use tokio_util::sync::CancellationToken;

#[tokio::test]
async fn repeated_runs_stay_current_without_api_calls() {
    let fetcher = ScriptedIpFetcher::new()
        .endpoint("https://ip-a.test", 5, Reply::Body("198.51.100.9".into()))
        .endpoint("https://ip-b.test", 15, Reply::Body("198.51.100.9".into()));
    let api = MockRecordApi::new("rec-1");

    let (reconciler, _events) = Reconciler::new(
        Box::new(ScriptedIpFetcher::sharing_counters_with(&fetcher)),
        Box::new(FixedResolver::new(published(&[v4(198, 51, 100, 9)]))),
        Box::new(MockRecordApi::sharing_counters_with(&api)),
        minimal_config(fetcher.endpoints()),
    )
    .expect("reconciler construction succeeds");

    let cancel = CancellationToken::new();
    let first = assert_ok!(reconciler.run(&cancel).await);
    let second = assert_ok!(reconciler.run(&cancel).await);

    let expected = RunOutcome::AlreadyCurrent { ip: v4(198, 51, 100, 9) };
    assert_eq!(first, expected);
    assert_eq!(second, expected);
    assert_eq!(api.fetch_call_count(), 0);
    assert_eq!(api.update_call_count(), 0);

    // The external token is never consumed by a run
    assert!(!cancel.is_cancelled());
}

#[tokio::test]
async fn run_after_update_is_a_no_op() {
    let fetcher = ScriptedIpFetcher::new()
        .endpoint("https://ip-a.test", 5, Reply::Body("198.51.100.9".into()));
    let resolver = FixedResolver::new(published(&[v4(198, 51, 100, 8)]));
    let api = MockRecordApi::new("rec-1").publishing_to(&resolver);

    let (reconciler, _events) = Reconciler::new(
        Box::new(fetcher),
        Box::new(resolver.clone()),
        Box::new(MockRecordApi::sharing_counters_with(&api)),
        minimal_config(vec!["https://ip-a.test".to_string()]),
    )
    .expect("reconciler construction succeeds");

    let cancel = CancellationToken::new();
    let first = assert_ok!(reconciler.run(&cancel).await);
    assert!(first.was_updated());
    assert_eq!(resolver.published(), published(&[v4(198, 51, 100, 9)]));

    let second = assert_ok!(reconciler.run(&cancel).await);
    assert_eq!(second, RunOutcome::AlreadyCurrent { ip: v4(198, 51, 100, 9) });

    assert_eq!(api.fetch_call_count(), 1);
    assert_eq!(api.update_call_count(), 1);
    assert_eq!(resolver.resolve_call_count(), 2);
}
