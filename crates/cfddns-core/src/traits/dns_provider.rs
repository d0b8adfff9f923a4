// # DNS Provider Trait
//
// Defines the interface for locating and updating DNS records via provider
// APIs.
//
// ## Implementations
//
// - Cloudflare: `cfddns-provider-cloudflare` crate
//
// ## Usage
//
// ```rust,ignore
// use cfddns_core::DnsProvider;
//
// #[tokio::main]
// async fn main() -> cfddns_core::Result<()> {
//     let provider = /* DnsProvider implementation */;
//
//     let record_id = provider.find_record("zone-id", "home.example.com").await?;
//     provider.update_record(
//         "zone-id",
//         &record_id,
//         "home.example.com",
//         std::net::Ipv4Addr::new(203, 0, 113, 7),
//     ).await?;
//
//     Ok(())
// }
// ```

use async_trait::async_trait;
use std::net::Ipv4Addr;

/// A DNS record as reported by the provider
///
/// Records are owned by the provider. The updater only reads and updates
/// them; it never creates or deletes one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DnsRecord {
    /// Opaque provider-side identifier
    pub id: String,
    /// Fully-qualified record name
    pub name: String,
    /// Record type ("A" for the records managed here)
    pub record_type: String,
    /// Record content (the IP address for A records)
    pub content: String,
}

/// Pick the first record whose name equals `record_name` exactly.
///
/// Comparison is case-sensitive and order is the provider's. Near-matches
/// (different case, suffix matches) never qualify.
pub fn select_record<'a>(records: &'a [DnsRecord], record_name: &str) -> Option<&'a DnsRecord> {
    records.iter().find(|record| record.name == record_name)
}

/// Trait for DNS provider implementations
///
/// Providers are single-shot: each method performs one API round trip and
/// reports success or failure. Retry, scheduling and failure policy belong
/// to the engine.
#[async_trait]
pub trait DnsProvider: Send + Sync {
    /// Locate a record's identifier by exact name
    ///
    /// # Parameters
    ///
    /// - `zone_id`: The zone to search
    /// - `record_name`: The exact record name (e.g. "*.home.example.com")
    ///
    /// # Returns
    ///
    /// - `Ok(String)`: The record id of the first exact match
    /// - `Err(Error::NotFound)`: No record with that exact name
    /// - `Err(Error::Network)`: Transport or API failure
    async fn find_record(&self, zone_id: &str, record_name: &str) -> Result<String, crate::Error>;

    /// Point an A record at a new address
    ///
    /// No short-circuit when the address is unchanged: every call is a full
    /// round trip.
    ///
    /// # Returns
    ///
    /// - `Ok(())`: The provider accepted the update
    /// - `Err(Error::Network)`: Transport or API failure
    async fn update_record(
        &self,
        zone_id: &str,
        record_id: &str,
        record_name: &str,
        new_ip: Ipv4Addr,
    ) -> Result<(), crate::Error>;

    /// Get the provider name (for logging)
    fn provider_name(&self) -> &'static str;
}
