// # HTTP IP Resolver
//
// This crate provides an HTTP-based IP resolver for the updater.
//
// ## Architecture
//
// Sends one GET to an external echo service (e.g. api.ipify.org) that
// answers with the caller's address as the whole plain-text body. There is
// no polling here: the engine calls `resolve()` once per cycle.
//
// ## Body Format
//
// The body must hold exactly one whitespace-delimited token that parses as
// an IPv4 address. Surrounding whitespace (a trailing newline, for
// instance) is ignored.

use cfddns_core::config::IpResolverConfig;
use cfddns_core::traits::IpResolver;
use cfddns_core::{Error, Result};

use std::net::Ipv4Addr;
use std::time::Duration;

/// HTTP echo-service IP resolver
#[derive(Debug, Clone)]
pub struct HttpIpResolver {
    /// URL to fetch IP from
    url: String,

    /// HTTP client
    client: reqwest::Client,
}

impl HttpIpResolver {
    /// Create a new HTTP IP resolver
    ///
    /// # Parameters
    ///
    /// - `url`: URL to fetch IP from (e.g., "https://api.ipify.org")
    /// - `timeout`: Deadline for each request
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            url: url.into(),
            client,
        })
    }

    /// Create from configuration
    pub fn from_config(config: &IpResolverConfig, timeout: Duration) -> Result<Self> {
        config.validate()?;
        Self::new(config.url.clone(), timeout)
    }

    /// The echo URL in use
    pub fn url(&self) -> &str {
        &self.url
    }
}

/// Parse an echo-service body into an IPv4 address
///
/// Exactly one whitespace-delimited token is accepted. An empty body, more
/// than one token, or a token that is not an IPv4 address is a network
/// failure: the service did not answer the way it is supposed to.
pub fn parse_ip_body(body: &str) -> Result<Ipv4Addr> {
    let mut tokens = body.split_whitespace();

    let token = tokens
        .next()
        .ok_or_else(|| Error::network("Empty response from IP echo service"))?;

    if tokens.next().is_some() {
        return Err(Error::network(format!(
            "Unexpected multi-token response from IP echo service: {:?}",
            body.trim()
        )));
    }

    token
        .parse::<Ipv4Addr>()
        .map_err(|_| Error::network(format!("Invalid IPv4 address: {}", token)))
}

#[async_trait::async_trait]
impl IpResolver for HttpIpResolver {
    async fn resolve(&self) -> Result<Ipv4Addr> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| Error::network(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(Error::network(format!(
                "HTTP error: {}",
                response.status()
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| Error::network(format!("Failed to read response: {}", e)))?;

        let ip = parse_ip_body(&body)?;
        tracing::debug!("Echo service {} reported {}", self.url, ip);
        Ok(ip)
    }

    fn resolver_name(&self) -> &'static str {
        "http"
    }
}
