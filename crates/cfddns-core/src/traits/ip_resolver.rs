// # IP Resolver Trait
//
// Defines the interface for discovering the caller's public IPv4 address.
//
// ## Implementations
//
// - HTTP echo service: `cfddns-ip-http` crate
//
// ## Usage
//
// ```rust,ignore
// use cfddns_core::IpResolver;
//
// #[tokio::main]
// async fn main() -> cfddns_core::Result<()> {
//     let resolver = /* IpResolver implementation */;
//
//     let ip = resolver.resolve().await?;
//     println!("Public IP: {}", ip);
//
//     Ok(())
// }
// ```

use async_trait::async_trait;
use std::net::Ipv4Addr;

/// Trait for public IP resolvers
///
/// A resolver performs exactly one lookup per call. It does not cache the
/// result, does not retry and does not compare against earlier results:
/// the engine resolves afresh every cycle and owns all scheduling.
///
/// Any failure (transport, status, unparseable body) is reported as a
/// network failure so the engine can skip the rest of the cycle.
#[async_trait]
pub trait IpResolver: Send + Sync {
    /// Resolve the current public IPv4 address
    ///
    /// # Returns
    ///
    /// - `Ok(Ipv4Addr)`: The current public address
    /// - `Err(Error::Network)`: If the lookup failed for any reason
    async fn resolve(&self) -> Result<Ipv4Addr, crate::Error>;

    /// Get the resolver name (for logging)
    fn resolver_name(&self) -> &'static str;
}
