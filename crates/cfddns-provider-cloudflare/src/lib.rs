// # Cloudflare DNS Provider
//
// This crate provides the Cloudflare DNS provider for the updater.
//
// ## Behavior
//
// - One HTTP request per trait call: a GET to locate, a PATCH to update
// - Every failure is returned to the engine, which owns the failure policy
// - No caching of record ids between calls
// - No short-circuit when the record already holds the address
//
// ## Authentication
//
// Uses the legacy global API key scheme: every request carries
// `X-Auth-Key` and `X-Auth-Email`. The key is marked sensitive on the
// header and never appears in logs or in `Debug` output.
//
// ## API Reference
//
// - Cloudflare API v4: https://developers.cloudflare.com/api/
// - List DNS Records: GET `/zones/:zone_id/dns_records?name=...`
// - Patch DNS Record: PATCH `/zones/:zone_id/dns_records/:record_id`

use async_trait::async_trait;
use cfddns_core::config::ProviderConfig;
use cfddns_core::traits::{select_record, DnsProvider, DnsRecord};
use cfddns_core::{Error, Result};
use reqwest::header::{HeaderMap, HeaderValue};
use serde::Deserialize;
use std::net::Ipv4Addr;
use std::time::Duration;

/// Cloudflare API base URL
pub const CLOUDFLARE_API_BASE: &str = "https://api.cloudflare.com/client/v4";

const AUTH_KEY_HEADER: &str = "X-Auth-Key";
const AUTH_EMAIL_HEADER: &str = "X-Auth-Email";

/// Envelope shared by every Cloudflare v4 response
#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    success: bool,
    #[serde(default)]
    errors: Vec<ApiMessage>,
    result: Option<T>,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct RecordEntry {
    id: String,
    name: String,
    #[serde(rename = "type", default)]
    record_type: String,
    #[serde(default)]
    content: String,
}

impl From<RecordEntry> for DnsRecord {
    fn from(entry: RecordEntry) -> Self {
        DnsRecord {
            id: entry.id,
            name: entry.name,
            record_type: entry.record_type,
            content: entry.content,
        }
    }
}

impl<T> ApiResponse<T> {
    /// Fail when Cloudflare reports `success: false` despite a 2xx status
    fn into_result(self, operation: &str) -> Result<Option<T>> {
        if self.success {
            return Ok(self.result);
        }

        let details = self
            .errors
            .iter()
            .map(|e| format!("{} ({})", e.message, e.code))
            .collect::<Vec<_>>()
            .join("; ");

        Err(Error::network(format!(
            "Cloudflare rejected {}: {}",
            operation,
            if details.is_empty() { "no details" } else { details.as_str() }
        )))
    }
}

/// Cloudflare DNS provider
///
/// Stateless and single-shot: retry and scheduling belong to the engine.
pub struct CloudflareProvider {
    /// Account email sent as `X-Auth-Email`
    api_mail: String,

    /// API base URL, overridable for tests
    base_url: String,

    /// HTTP client carrying the auth headers
    client: reqwest::Client,
}

// Custom Debug implementation that hides the credentials
impl std::fmt::Debug for CloudflareProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudflareProvider")
            .field("api_key", &"<REDACTED>")
            .field("api_mail", &self.api_mail)
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl CloudflareProvider {
    /// Create a new Cloudflare provider
    ///
    /// # Parameters
    ///
    /// - `api_key`: Global API key of the account
    /// - `api_mail`: Email address of the account
    /// - `timeout`: Deadline for each HTTP request
    ///
    /// # Errors
    ///
    /// `Error::Config` when a credential is empty or cannot be sent as a
    /// header value, or when the HTTP client cannot be built.
    pub fn new(
        api_key: impl Into<String>,
        api_mail: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let api_key = api_key.into();
        let api_mail = api_mail.into();

        if api_key.trim().is_empty() {
            return Err(Error::config("Cloudflare API key cannot be empty"));
        }
        if api_mail.trim().is_empty() {
            return Err(Error::config("Cloudflare account email cannot be empty"));
        }

        let mut key_value = HeaderValue::from_str(&api_key)
            .map_err(|_| Error::config("Cloudflare API key contains invalid characters"))?;
        key_value.set_sensitive(true);

        let mail_value = HeaderValue::from_str(&api_mail)
            .map_err(|_| Error::config("Cloudflare account email contains invalid characters"))?;

        let mut headers = HeaderMap::new();
        headers.insert(AUTH_KEY_HEADER, key_value);
        headers.insert(AUTH_EMAIL_HEADER, mail_value);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            api_mail,
            base_url: CLOUDFLARE_API_BASE.to_string(),
            client,
        })
    }

    /// Create from configuration
    pub fn from_config(config: &ProviderConfig, timeout: Duration) -> Result<Self> {
        match config {
            ProviderConfig::Cloudflare { api_key, api_mail } => {
                Self::new(api_key.clone(), api_mail.clone(), timeout)
            }
        }
    }

    /// Point the provider at a different API root
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Build `{base}/zones/{zone_id}/dns_records[/{record_id}]`
    ///
    /// Ids are appended as single path segments, so `/` or `?` inside an id
    /// is percent-encoded instead of changing the endpoint.
    fn records_url(&self, zone_id: &str, record_id: Option<&str>) -> Result<reqwest::Url> {
        let mut url = reqwest::Url::parse(&self.base_url)
            .map_err(|e| Error::config(format!("Invalid Cloudflare API URL: {}", e)))?;

        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| Error::config("Cloudflare API URL cannot hold a path"))?;
            segments.pop_if_empty().extend(["zones", zone_id, "dns_records"]);
            if let Some(record_id) = record_id {
                segments.push(record_id);
            }
        }

        Ok(url)
    }

    /// Map a non-success HTTP status to an error, passing 2xx responses through
    async fn check_status(
        response: reqwest::Response,
        operation: &str,
    ) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unable to read error response".to_string());

        Err(match status.as_u16() {
            401 | 403 => Error::network(format!(
                "Authentication failed during {}: invalid API key/email or insufficient permissions. Status: {}",
                operation, status
            )),
            429 => Error::network(format!(
                "Rate limit exceeded during {}. Status: {}",
                operation, status
            )),
            500..=599 => Error::network(format!(
                "Cloudflare server error during {}: {} - {}",
                operation, status, error_text
            )),
            _ => Error::network(format!(
                "{} failed: {} - {}",
                operation, status, error_text
            )),
        })
    }
}

#[async_trait]
impl DnsProvider for CloudflareProvider {
    /// Locate a record by exact name
    ///
    /// ```http
    /// GET /zones/:zone_id/dns_records?name=home.example.com
    /// X-Auth-Key: <key>
    /// X-Auth-Email: <email>
    /// ```
    async fn find_record(&self, zone_id: &str, record_name: &str) -> Result<String> {
        tracing::debug!("Looking up record id for {}", record_name);

        let response = self
            .client
            .get(self.records_url(zone_id, None)?)
            .query(&[("name", record_name)])
            .send()
            .await
            .map_err(|e| Error::network(format!("HTTP request failed: {}", e)))?;

        let response = Self::check_status(response, "record lookup").await?;

        let body: ApiResponse<Vec<RecordEntry>> = response
            .json()
            .await
            .map_err(|e| Error::network(format!("Failed to parse response: {}", e)))?;

        let records: Vec<DnsRecord> = body
            .into_result("record lookup")?
            .unwrap_or_default()
            .into_iter()
            .map(DnsRecord::from)
            .collect();

        let record = select_record(&records, record_name)
            .ok_or_else(|| Error::not_found(format!("DNS record not found: {}", record_name)))?;

        tracing::debug!("Found record id {} for {}", record.id, record_name);
        Ok(record.id.clone())
    }

    /// Point an A record at `new_ip`
    ///
    /// ```http
    /// PATCH /zones/:zone_id/dns_records/:record_id
    /// {"type": "A", "name": "home.example.com", "content": "203.0.113.7"}
    /// ```
    async fn update_record(
        &self,
        zone_id: &str,
        record_id: &str,
        record_name: &str,
        new_ip: Ipv4Addr,
    ) -> Result<()> {
        let url = self.records_url(zone_id, Some(record_id))?;
        let payload = serde_json::json!({
            "type": "A",
            "name": record_name,
            "content": new_ip.to_string(),
        });

        let response = self
            .client
            .patch(url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| Error::network(format!("HTTP request failed: {}", e)))?;

        let response = Self::check_status(response, "record update").await?;

        let body: ApiResponse<serde_json::Value> = response
            .json()
            .await
            .map_err(|e| Error::network(format!("Failed to parse response: {}", e)))?;
        body.into_result("record update")?;

        tracing::debug!("Cloudflare accepted {} -> {}", record_name, new_ip);
        Ok(())
    }

    fn provider_name(&self) -> &'static str {
        "cloudflare"
    }
}
