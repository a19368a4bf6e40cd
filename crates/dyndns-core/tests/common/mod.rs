//! Test doubles and common utilities for reconciliation contract tests
//!
//! This module provides minimal test doubles that script collaborator
//! behaviour and count every call the reconciler makes.

#![allow(dead_code)]

use dyndns_core::config::{DdnsConfig, EngineConfig, ProviderConfig};
use dyndns_core::error::{Error, Result};
use dyndns_core::events::RunEvent;
use dyndns_core::traits::{IpFetcher, RecordApi, RecordResolver};
use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

pub const ZONE_ID: &str = "023e105f4ecef8ad9ca31a8372d0c353";
pub const RECORD_NAME: &str = "home.example.com";

/// What a scripted endpoint answers
#[derive(Debug, Clone)]
pub enum Reply {
    /// Successful response with this body
    Body(String),
    /// Transport-level failure
    Fail(String),
    /// Never answers; only cancellation ends the request
    Hang,
}

/// An IpFetcher whose endpoints answer from a script
pub struct ScriptedIpFetcher {
    script: HashMap<String, (Duration, Reply)>,
    /// Call counter for fetch()
    fetch_call_count: Arc<AtomicUsize>,
    /// Requests that ran to completion without being cancelled
    completed_count: Arc<AtomicUsize>,
    /// Requests that observed cancellation
    cancelled_count: Arc<AtomicUsize>,
}

impl ScriptedIpFetcher {
    pub fn new() -> Self {
        Self {
            script: HashMap::new(),
            fetch_call_count: Arc::new(AtomicUsize::new(0)),
            completed_count: Arc::new(AtomicUsize::new(0)),
            cancelled_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Answer `endpoint` with `reply` after `delay_ms`
    pub fn endpoint(mut self, endpoint: &str, delay_ms: u64, reply: Reply) -> Self {
        self.script.insert(
            endpoint.to_string(),
            (Duration::from_millis(delay_ms), reply),
        );
        self
    }

    /// Endpoints in insertion-independent, sorted order
    pub fn endpoints(&self) -> Vec<String> {
        let mut endpoints: Vec<String> = self.script.keys().cloned().collect();
        endpoints.sort();
        endpoints
    }

    pub fn fetch_call_count(&self) -> usize {
        self.fetch_call_count.load(Ordering::SeqCst)
    }

    pub fn completed_count(&self) -> usize {
        self.completed_count.load(Ordering::SeqCst)
    }

    pub fn cancelled_count(&self) -> usize {
        self.cancelled_count.load(Ordering::SeqCst)
    }

    /// Create a fetcher with the same script that shares counters with `other`
    pub fn sharing_counters_with(other: &Self) -> Self {
        Self {
            script: other.script.clone(),
            fetch_call_count: Arc::clone(&other.fetch_call_count),
            completed_count: Arc::clone(&other.completed_count),
            cancelled_count: Arc::clone(&other.cancelled_count),
        }
    }
}

#[async_trait::async_trait]
impl IpFetcher for ScriptedIpFetcher {
    async fn fetch(&self, endpoint: &str, cancel: &CancellationToken) -> Result<String> {
        self.fetch_call_count.fetch_add(1, Ordering::SeqCst);

        let (delay, reply) = match self.script.get(endpoint) {
            Some(entry) => entry.clone(),
            None => return Err(Error::http(format!("unscripted endpoint {}", endpoint))),
        };

        let answer = async {
            tokio::time::sleep(delay).await;
            match reply {
                Reply::Body(body) => Ok(body),
                Reply::Fail(message) => Err(Error::http(message)),
                Reply::Hang => std::future::pending().await,
            }
        };

        tokio::select! {
            _ = cancel.cancelled() => {
                self.cancelled_count.fetch_add(1, Ordering::SeqCst);
                Err(Error::Cancelled)
            }
            result = answer => {
                self.completed_count.fetch_add(1, Ordering::SeqCst);
                result
            }
        }
    }
}

/// A RecordResolver returning whatever the shared record currently publishes
#[derive(Clone)]
pub struct FixedResolver {
    published: Arc<Mutex<Vec<IpAddr>>>,
    failure: Option<String>,
    resolve_call_count: Arc<AtomicUsize>,
}

impl FixedResolver {
    pub fn new(published: Vec<IpAddr>) -> Self {
        Self {
            published: Arc::new(Mutex::new(published)),
            failure: None,
            resolve_call_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// A resolver whose lookups always fail
    pub fn failing(message: &str) -> Self {
        Self {
            failure: Some(message.to_string()),
            ..Self::new(Vec::new())
        }
    }

    pub fn published(&self) -> Vec<IpAddr> {
        self.published.lock().unwrap().clone()
    }

    pub fn resolve_call_count(&self) -> usize {
        self.resolve_call_count.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl RecordResolver for FixedResolver {
    async fn resolve(&self, record_name: &str, cancel: &CancellationToken) -> Result<Vec<IpAddr>> {
        self.resolve_call_count.fetch_add(1, Ordering::SeqCst);

        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        if let Some(message) = &self.failure {
            return Err(Error::local_resolution(record_name, message.clone()));
        }
        Ok(self.published())
    }
}

/// A mock RecordApi that tracks calls
pub struct MockRecordApi {
    /// Identifier handed out by fetch_record_id(); None means "no records"
    record_id: Option<String>,
    /// Status the write is rejected with, if any
    reject_update_with: Option<u16>,
    /// Lookups never answer until cancelled
    hang_lookup: bool,
    /// Record the writes land in, so a follow-up run sees them
    backing: Option<Arc<Mutex<Vec<IpAddr>>>>,
    /// Call counter for fetch_record_id()
    fetch_call_count: Arc<AtomicUsize>,
    /// Call counter for update_record()
    update_call_count: Arc<AtomicUsize>,
    /// Addresses sent to update_record()
    written: Arc<Mutex<Vec<(String, Ipv4Addr)>>>,
}

impl MockRecordApi {
    pub fn new(record_id: &str) -> Self {
        Self {
            record_id: Some(record_id.to_string()),
            reject_update_with: None,
            hang_lookup: false,
            backing: None,
            fetch_call_count: Arc::new(AtomicUsize::new(0)),
            update_call_count: Arc::new(AtomicUsize::new(0)),
            written: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// A zone where the lookup lists no records
    pub fn without_records() -> Self {
        Self {
            record_id: None,
            ..Self::new("unused")
        }
    }

    /// Reject every write with `status`
    pub fn rejecting_updates(mut self, status: u16) -> Self {
        self.reject_update_with = Some(status);
        self
    }

    /// Lookups stall until the run is cancelled
    pub fn hanging_lookups(mut self) -> Self {
        self.hang_lookup = true;
        self
    }

    /// Publish successful writes through `resolver`
    pub fn publishing_to(mut self, resolver: &FixedResolver) -> Self {
        self.backing = Some(Arc::clone(&resolver.published));
        self
    }

    pub fn fetch_call_count(&self) -> usize {
        self.fetch_call_count.load(Ordering::SeqCst)
    }

    pub fn update_call_count(&self) -> usize {
        self.update_call_count.load(Ordering::SeqCst)
    }

    /// (record id, address) pairs that were written
    pub fn written(&self) -> Vec<(String, Ipv4Addr)> {
        self.written.lock().unwrap().clone()
    }

    /// Create a new MockRecordApi that shares counters with an existing one
    pub fn sharing_counters_with(other: &Self) -> Self {
        Self {
            record_id: other.record_id.clone(),
            reject_update_with: other.reject_update_with,
            hang_lookup: other.hang_lookup,
            backing: other.backing.clone(),
            fetch_call_count: Arc::clone(&other.fetch_call_count),
            update_call_count: Arc::clone(&other.update_call_count),
            written: Arc::clone(&other.written),
        }
    }
}

#[async_trait::async_trait]
impl RecordApi for MockRecordApi {
    async fn fetch_record_id(
        &self,
        zone_id: &str,
        record_name: &str,
        cancel: &CancellationToken,
    ) -> Result<String> {
        self.fetch_call_count.fetch_add(1, Ordering::SeqCst);

        if self.hang_lookup {
            cancel.cancelled().await;
            return Err(Error::Cancelled);
        }

        match &self.record_id {
            Some(id) => Ok(id.clone()),
            None => Err(Error::record_not_found(
                zone_id,
                record_name,
                200,
                r#"{"result":[],"success":true,"errors":[],"messages":[]}"#,
            )),
        }
    }

    async fn update_record(
        &self,
        _zone_id: &str,
        record_id: &str,
        record_name: &str,
        ip: Ipv4Addr,
        _cancel: &CancellationToken,
    ) -> Result<()> {
        self.update_call_count.fetch_add(1, Ordering::SeqCst);

        if let Some(status) = self.reject_update_with {
            return Err(Error::RemoteUpdate {
                status,
                request: format!(
                    r#"{{"type":"A","name":"{}","content":"{}","ttl":1,"proxied":false}}"#,
                    record_name, ip
                ),
                response: r#"{"success":false}"#.to_string(),
            });
        }

        self.written
            .lock()
            .unwrap()
            .push((record_id.to_string(), ip));
        if let Some(backing) = &self.backing {
            *backing.lock().unwrap() = vec![IpAddr::V4(ip)];
        }
        Ok(())
    }

    fn provider_name(&self) -> &'static str {
        "mock"
    }
}

/// Helper to create a minimal config for testing
pub fn minimal_config(ip_providers: Vec<String>) -> DdnsConfig {
    DdnsConfig {
        zone_id: ZONE_ID.to_string(),
        record_name: RECORD_NAME.to_string(),
        provider: ProviderConfig::cloudflare("test-token"),
        ip_providers,
        engine: EngineConfig {
            race_timeout_secs: 2,
            run_timeout_secs: 10,
            event_channel_capacity: 100,
        },
    }
}

pub fn v4(a: u8, b: u8, c: u8, d: u8) -> Ipv4Addr {
    Ipv4Addr::new(a, b, c, d)
}

pub fn published(addrs: &[Ipv4Addr]) -> Vec<IpAddr> {
    addrs.iter().map(|a| IpAddr::V4(*a)).collect()
}

/// Collect every event currently buffered on the channel
pub fn drain_events(rx: &mut mpsc::Receiver<RunEvent>) -> Vec<RunEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}
