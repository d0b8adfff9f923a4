// Daemon configuration
//
// Everything is read from the environment once at startup. Each Cloudflare
// setting has a short primary name and a `CLOUDFLARE_*` fallback; the first
// non-empty value wins.

use anyhow::{Context, Result};
use cfddns_core::config::{
    DdnsConfig, EngineConfig, IpResolverConfig, ProviderConfig, RecordConfig,
    RecordNotFoundPolicy,
};
use tracing::Level;

/// Fully-resolved daemon configuration
#[derive(Debug, Clone)]
pub struct DaemonConfig {
    /// Configuration handed to the engine and its collaborators
    pub ddns: DdnsConfig,

    /// Max level for the log subscriber
    pub log_level: Level,
}

impl DaemonConfig {
    /// Load configuration from process environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = required(&lookup, "API_KEY", "CLOUDFLARE_API_KEY")?;
        let api_mail = required(&lookup, "API_MAIL", "CLOUDFLARE_API_MAIL")?;
        let zone_id = required(&lookup, "ZONE_ID", "CLOUDFLARE_ZONE_ID")?;
        let record_name = required(&lookup, "RECORD_NAME", "CLOUDFLARE_RECORD_NAME")?;

        let mut record = RecordConfig::new(zone_id, record_name);
        if let Some(record_id) = first_set(&lookup, &["RECORD_ID", "CLOUDFLARE_RECORD_ID"]) {
            record = record.with_record_id(record_id);
        }

        let mut engine = EngineConfig::default();
        if let Some(secs) = first_set(&lookup, &["DDNS_INTERVAL_SECS"]) {
            engine.interval_secs = secs
                .parse()
                .with_context(|| format!("DDNS_INTERVAL_SECS is not a number: {}", secs))?;
        }
        if let Some(secs) = first_set(&lookup, &["DDNS_CALL_TIMEOUT_SECS"]) {
            engine.call_timeout_secs = secs
                .parse()
                .with_context(|| format!("DDNS_CALL_TIMEOUT_SECS is not a number: {}", secs))?;
        }
        if let Some(policy) = first_set(&lookup, &["DDNS_ON_RECORD_NOT_FOUND"]) {
            engine.on_record_not_found = policy
                .parse::<RecordNotFoundPolicy>()
                .context("DDNS_ON_RECORD_NOT_FOUND")?;
        }

        let mut ip_resolver = IpResolverConfig::default();
        if let Some(url) = first_set(&lookup, &["DDNS_IP_ECHO_URL"]) {
            ip_resolver.url = url;
        }

        let log_level = match first_set(&lookup, &["DDNS_LOG_LEVEL"]) {
            Some(level) => parse_level(&level)?,
            None => Level::INFO,
        };

        let ddns = DdnsConfig {
            ip_resolver,
            provider: ProviderConfig::Cloudflare { api_key, api_mail },
            record,
            engine,
        };
        ddns.validate().context("Invalid configuration")?;

        Ok(Self { ddns, log_level })
    }
}

/// First non-empty value among `keys`, trimmed
fn first_set<F>(lookup: &F, keys: &[&str]) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    keys.iter()
        .filter_map(|key| lookup(key))
        .map(|value| value.trim().to_string())
        .find(|value| !value.is_empty())
}

fn required<F>(lookup: &F, primary: &str, fallback: &str) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    first_set(lookup, &[primary, fallback]).with_context(|| {
        format!(
            "{} is required. Set it via: export {}=... (or {})",
            primary, primary, fallback
        )
    })
}

fn parse_level(level: &str) -> Result<Level> {
    match level.to_lowercase().as_str() {
        "trace" => Ok(Level::TRACE),
        "debug" => Ok(Level::DEBUG),
        "info" => Ok(Level::INFO),
        "warn" => Ok(Level::WARN),
        "error" => Ok(Level::ERROR),
        _ => anyhow::bail!(
            "DDNS_LOG_LEVEL '{}' is not valid. \
            Valid levels: trace, debug, info, warn, error",
            level
        ),
    }
}
