//! Test doubles and common utilities for engine contract tests
//!
//! The doubles record every call they receive in a shared journal so tests
//! can assert on the exact order of outbound operations.

#![allow(dead_code)]

use cfddns_core::config::{DdnsConfig, ProviderConfig, RecordConfig, RecordNotFoundPolicy};
use cfddns_core::engine::EngineEvent;
use cfddns_core::error::{Error, Result};
use cfddns_core::traits::{DnsProvider, IpResolver};
use std::collections::{HashMap, HashSet, VecDeque};
use std::net::Ipv4Addr;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

pub const BASE_NAME: &str = "home.example.com";
pub const WILDCARD_NAME: &str = "*.home.example.com";
pub const ZONE_ID: &str = "zone-1";
pub const BASE_ID: &str = "rec-base";
pub const WILDCARD_ID: &str = "rec-wild";

/// One outbound call observed by a test double
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Resolve,
    Find(String),
    Update {
        record_id: String,
        record_name: String,
        ip: Ipv4Addr,
    },
}

impl Call {
    pub fn find(name: &str) -> Self {
        Call::Find(name.to_string())
    }

    pub fn update(record_id: &str, record_name: &str, ip: Ipv4Addr) -> Self {
        Call::Update {
            record_id: record_id.to_string(),
            record_name: record_name.to_string(),
            ip,
        }
    }
}

/// Shared, ordered record of calls across resolver and provider
#[derive(Debug, Clone, Default)]
pub struct Journal {
    calls: Arc<Mutex<Vec<Call>>>,
}

impl Journal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| pred(c)).count()
    }
}

/// An IpResolver that replays scripted results, then keeps returning a default IP
pub struct ScriptedResolver {
    journal: Journal,
    ip: Ipv4Addr,
    script: Mutex<VecDeque<Result<Ipv4Addr>>>,
    hang: bool,
}

impl ScriptedResolver {
    pub fn new(journal: &Journal, ip: Ipv4Addr) -> Self {
        Self {
            journal: journal.clone(),
            ip,
            script: Mutex::new(VecDeque::new()),
            hang: false,
        }
    }

    /// Queue a result for the next unscripted call
    pub fn then(self, result: Result<Ipv4Addr>) -> Self {
        self.script.lock().unwrap().push_back(result);
        self
    }

    /// Never complete a lookup
    pub fn hanging(mut self) -> Self {
        self.hang = true;
        self
    }
}

#[async_trait::async_trait]
impl IpResolver for ScriptedResolver {
    async fn resolve(&self) -> Result<Ipv4Addr> {
        self.journal.push(Call::Resolve);
        if self.hang {
            std::future::pending::<()>().await;
        }
        let scripted = self.script.lock().unwrap().pop_front();
        scripted.unwrap_or(Ok(self.ip))
    }

    fn resolver_name(&self) -> &'static str {
        "scripted"
    }
}

/// A DnsProvider backed by an in-memory name → id table
pub struct MockDnsProvider {
    journal: Journal,
    records: HashMap<String, String>,
    failing_finds: HashSet<String>,
    failing_updates: HashSet<String>,
    hanging_finds: HashSet<String>,
    hanging_updates: HashSet<String>,
}

impl MockDnsProvider {
    /// A provider holding both the base and the wildcard record
    pub fn new(journal: &Journal) -> Self {
        Self::empty(journal)
            .with_record(BASE_NAME, BASE_ID)
            .with_record(WILDCARD_NAME, WILDCARD_ID)
    }

    /// A provider holding no records at all
    pub fn empty(journal: &Journal) -> Self {
        Self {
            journal: journal.clone(),
            records: HashMap::new(),
            failing_finds: HashSet::new(),
            failing_updates: HashSet::new(),
            hanging_finds: HashSet::new(),
            hanging_updates: HashSet::new(),
        }
    }

    pub fn with_record(mut self, name: &str, id: &str) -> Self {
        self.records.insert(name.to_string(), id.to_string());
        self
    }

    pub fn without_record(mut self, name: &str) -> Self {
        self.records.remove(name);
        self
    }

    /// Lookups of `name` fail with a network error
    pub fn failing_find(mut self, name: &str) -> Self {
        self.failing_finds.insert(name.to_string());
        self
    }

    /// Updates of `name` fail with a network error
    pub fn failing_update(mut self, name: &str) -> Self {
        self.failing_updates.insert(name.to_string());
        self
    }

    /// Lookups of `name` never complete
    pub fn hanging_find(mut self, name: &str) -> Self {
        self.hanging_finds.insert(name.to_string());
        self
    }

    /// Updates of `name` never complete
    pub fn hanging_update(mut self, name: &str) -> Self {
        self.hanging_updates.insert(name.to_string());
        self
    }
}

#[async_trait::async_trait]
impl DnsProvider for MockDnsProvider {
    async fn find_record(&self, _zone_id: &str, record_name: &str) -> Result<String> {
        self.journal.push(Call::find(record_name));

        if self.hanging_finds.contains(record_name) {
            std::future::pending::<()>().await;
        }
        if self.failing_finds.contains(record_name) {
            return Err(Error::network("HTTP 503 Service Unavailable"));
        }

        self.records
            .get(record_name)
            .cloned()
            .ok_or_else(|| Error::not_found(record_name))
    }

    async fn update_record(
        &self,
        _zone_id: &str,
        record_id: &str,
        record_name: &str,
        new_ip: Ipv4Addr,
    ) -> Result<()> {
        self.journal.push(Call::update(record_id, record_name, new_ip));

        if self.hanging_updates.contains(record_name) {
            std::future::pending::<()>().await;
        }
        if self.failing_updates.contains(record_name) {
            return Err(Error::network("HTTP 500 Internal Server Error"));
        }
        Ok(())
    }

    fn provider_name(&self) -> &'static str {
        "mock"
    }
}

/// Helper to create a minimal DdnsConfig for testing
pub fn minimal_config(policy: RecordNotFoundPolicy) -> DdnsConfig {
    let mut config = DdnsConfig::new(
        ProviderConfig::Cloudflare {
            api_key: "test-key".to_string(),
            api_mail: "test@example.com".to_string(),
        },
        RecordConfig::new(ZONE_ID, BASE_NAME),
    );
    config.engine.on_record_not_found = policy;
    config.engine.event_channel_capacity = 100;
    config
}

/// The calls of one fully successful cycle
pub fn full_cycle(ip: Ipv4Addr) -> Vec<Call> {
    vec![
        Call::Resolve,
        Call::find(BASE_NAME),
        Call::update(BASE_ID, BASE_NAME, ip),
        Call::find(WILDCARD_NAME),
        Call::update(WILDCARD_ID, WILDCARD_NAME, ip),
    ]
}

/// Receive events until `sleeps` Sleeping events were seen
pub async fn wait_for_sleeps(
    rx: &mut mpsc::Receiver<EngineEvent>,
    sleeps: usize,
) -> Vec<EngineEvent> {
    let mut events = Vec::new();
    let mut seen = 0;
    while let Some(event) = rx.recv().await {
        let is_sleep = matches!(event, EngineEvent::Sleeping { .. });
        events.push(event);
        if is_sleep {
            seen += 1;
            if seen == sleeps {
                break;
            }
        }
    }
    events
}

/// Drain whatever is left in the channel
pub fn drain(rx: &mut mpsc::Receiver<EngineEvent>) -> Vec<EngineEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}
