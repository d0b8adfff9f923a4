//! Configuration types for the updater
//!
//! The configuration is built once at startup and handed to the engine by
//! value. The engine never mutates it: per-cycle record targets are derived
//! from it fresh every cycle.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default IP echo service. Returns the caller's address as a plain-text body.
pub const DEFAULT_IP_ECHO_URL: &str = "https://api.ipify.org";

/// Prefix that turns a hostname into its wildcard form
pub const WILDCARD_PREFIX: &str = "*.";

/// Main configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DdnsConfig {
    /// IP resolver configuration
    #[serde(default)]
    pub ip_resolver: IpResolverConfig,

    /// DNS provider configuration
    pub provider: ProviderConfig,

    /// The managed record
    pub record: RecordConfig,

    /// Optional engine settings
    #[serde(default)]
    pub engine: EngineConfig,
}

impl DdnsConfig {
    /// Create a configuration with default resolver and engine settings
    pub fn new(provider: ProviderConfig, record: RecordConfig) -> Self {
        Self {
            ip_resolver: IpResolverConfig::default(),
            provider,
            record,
            engine: EngineConfig::default(),
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        self.ip_resolver.validate()?;
        self.provider.validate()?;
        self.record.validate()?;
        self.engine.validate()?;
        Ok(())
    }
}

/// IP resolver configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IpResolverConfig {
    /// URL of the echo service
    pub url: String,
}

impl IpResolverConfig {
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.url.trim().is_empty() {
            return Err(crate::Error::config("IP echo URL cannot be empty"));
        }
        if !self.url.starts_with("https://") && !self.url.starts_with("http://") {
            return Err(crate::Error::config(format!(
                "IP echo URL must use HTTP or HTTPS scheme. Got: {}",
                self.url
            )));
        }
        Ok(())
    }
}

impl Default for IpResolverConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_IP_ECHO_URL.to_string(),
        }
    }
}

/// DNS provider configuration
#[derive(Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProviderConfig {
    /// Cloudflare with legacy global-key authentication
    Cloudflare {
        /// Global API key
        api_key: String,
        /// Account email the key belongs to
        api_mail: String,
    },
}

impl ProviderConfig {
    /// Validate the provider configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            ProviderConfig::Cloudflare { api_key, api_mail } => {
                if api_key.trim().is_empty() {
                    return Err(crate::Error::config("Cloudflare API key cannot be empty"));
                }
                if api_mail.trim().is_empty() {
                    return Err(crate::Error::config(
                        "Cloudflare account email cannot be empty",
                    ));
                }
                Ok(())
            }
        }
    }

    /// Get the provider type name
    pub fn type_name(&self) -> &'static str {
        match self {
            ProviderConfig::Cloudflare { .. } => "cloudflare",
        }
    }
}

// Keeps the API key out of logs.
impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderConfig::Cloudflare { api_mail, .. } => f
                .debug_struct("Cloudflare")
                .field("api_key", &"<REDACTED>")
                .field("api_mail", api_mail)
                .finish(),
        }
    }
}

/// The managed record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordConfig {
    /// Zone the record lives in
    pub zone_id: String,

    /// Base hostname (e.g. "home.example.com"); never starts with `*.`
    pub name: String,

    /// Record id known at startup, if any
    ///
    /// Ids are always looked up fresh each cycle; this is only compared
    /// against the located base record.
    #[serde(default)]
    pub record_id: Option<String>,
}

impl RecordConfig {
    /// Create a new record configuration
    pub fn new(zone_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            zone_id: zone_id.into(),
            name: name.into(),
            record_id: None,
        }
    }

    /// Set the initially known record id
    pub fn with_record_id(mut self, record_id: impl Into<String>) -> Self {
        self.record_id = Some(record_id.into());
        self
    }

    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.zone_id.trim().is_empty() {
            return Err(crate::Error::config("Zone ID cannot be empty"));
        }
        if self.name.trim().is_empty() {
            return Err(crate::Error::config("Record name cannot be empty"));
        }
        if self.name.starts_with(WILDCARD_PREFIX) {
            return Err(crate::Error::config(format!(
                "Record name must be the base hostname, not a wildcard. Got: {}",
                self.name
            )));
        }
        Ok(())
    }

    /// The two targets updated every cycle, base first
    pub fn targets(&self) -> [RecordTarget; 2] {
        [
            RecordTarget {
                zone_id: self.zone_id.clone(),
                name: self.name.clone(),
                kind: TargetKind::Base,
            },
            RecordTarget {
                zone_id: self.zone_id.clone(),
                name: wildcard_name(&self.name),
                kind: TargetKind::Wildcard,
            },
        ]
    }
}

/// Derive the wildcard form of a hostname.
///
/// Idempotent: a name that is already a wildcard is returned unchanged.
pub fn wildcard_name(name: &str) -> String {
    if name.starts_with(WILDCARD_PREFIX) {
        name.to_string()
    } else {
        format!("{WILDCARD_PREFIX}{name}")
    }
}

/// Which of the two managed names a target is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetKind {
    Base,
    Wildcard,
}

impl std::fmt::Display for TargetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TargetKind::Base => f.write_str("base"),
            TargetKind::Wildcard => f.write_str("wildcard"),
        }
    }
}

/// One record to locate and update within a cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordTarget {
    pub zone_id: String,
    pub name: String,
    pub kind: TargetKind,
}

/// What the engine does when a record cannot be located
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordNotFoundPolicy {
    /// Stop the engine with the lookup error
    #[default]
    Fail,
    /// Abandon the rest of the cycle and try again after the interval
    Retry,
    /// Skip this target and carry on with the next one
    Skip,
}

impl std::str::FromStr for RecordNotFoundPolicy {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "fail" => Ok(Self::Fail),
            "retry" => Ok(Self::Retry),
            "skip" => Ok(Self::Skip),
            other => Err(crate::Error::config(format!(
                "Unknown record-not-found policy '{}'. Valid: fail, retry, skip",
                other
            ))),
        }
    }
}

/// Engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Pause between cycles (in seconds)
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,

    /// Deadline for each outbound call (in seconds)
    #[serde(default = "default_call_timeout_secs")]
    pub call_timeout_secs: u64,

    /// Behavior when a record lookup fails
    #[serde(default)]
    pub on_record_not_found: RecordNotFoundPolicy,

    /// Capacity of the engine event channel
    ///
    /// When full, new events are dropped with a warning.
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.interval_secs == 0 {
            return Err(crate::Error::config("Update interval must be > 0"));
        }
        if self.call_timeout_secs == 0 {
            return Err(crate::Error::config("Call timeout must be > 0"));
        }
        if self.event_channel_capacity == 0 {
            return Err(crate::Error::config("Event channel capacity must be > 0"));
        }
        Ok(())
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_secs)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            call_timeout_secs: default_call_timeout_secs(),
            on_record_not_found: RecordNotFoundPolicy::default(),
            event_channel_capacity: default_event_channel_capacity(),
        }
    }
}

fn default_interval_secs() -> u64 {
    300
}

fn default_call_timeout_secs() -> u64 {
    30
}

fn default_event_channel_capacity() -> usize {
    1000
}
