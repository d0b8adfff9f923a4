// # cfddns-core
//
// Core library for a polling dynamic-DNS updater.
//
// ## Architecture Overview
//
// - **IpResolver**: Trait for discovering the current public IPv4 address
// - **DnsProvider**: Trait for locating and updating DNS records via a provider API
// - **DdnsEngine**: The reconciliation loop that ties them together on a schedule
//
// ## Cycle
//
// Every interval the engine resolves the public IP once, then locates and
// updates the base record, then locates and updates its wildcard form
// (`*.` + base). Both targets are derived from the immutable configuration
// each cycle.

pub mod traits;
pub mod engine;
pub mod config;
pub mod error;

// Re-export core types for convenience
pub use traits::{IpResolver, DnsProvider, DnsRecord};
pub use engine::{DdnsEngine, EngineEvent, CycleOutcome, CycleState};
pub use config::{DdnsConfig, EngineConfig, IpResolverConfig, ProviderConfig, RecordConfig, RecordNotFoundPolicy};
pub use error::{Error, Result};
