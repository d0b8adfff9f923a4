//! Collaborator traits for the updater
//!
//! The engine talks to the outside world only through these interfaces.
//!
//! - [`IpResolver`]: Discover the current public IPv4 address
//! - [`DnsProvider`]: Locate and update DNS records via a provider API

pub mod ip_resolver;
pub mod dns_provider;

pub use ip_resolver::IpResolver;
pub use dns_provider::{DnsProvider, DnsRecord, select_record};
