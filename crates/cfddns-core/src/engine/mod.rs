//! Core reconciliation engine
//!
//! The DdnsEngine is responsible for:
//! - Resolving the public IP once per cycle via IpResolver
//! - Locating the base and wildcard records via DnsProvider
//! - Pushing the resolved IP to both records
//! - Sleeping a fixed interval, then starting over
//!
//! ## Cycle
//!
//! ```text
//! Idle ─▶ ResolvingIp ─▶ LocatingRecord(base) ─▶ UpdatingRecord(base)
//!   ▲          │                                          │
//!   │          │ (failure)                                ▼
//!   │          │                 LocatingRecord(wildcard) ─▶ UpdatingRecord(wildcard)
//!   │          ▼                                                     │
//!   └──── Sleeping ◀─────────────────────────────────────────────────┘
//! ```
//!
//! ## Failure Policy
//!
//! - IP resolution failure: logged, rest of the cycle skipped
//! - Record location failure: handled per [`RecordNotFoundPolicy`]
//!   (default: stop the engine)
//! - Record update failure: logged, next target still attempted
//!
//! Every outbound call is bounded by the configured call timeout.

use crate::config::{DdnsConfig, RecordConfig, RecordNotFoundPolicy, RecordTarget, TargetKind};
use crate::error::{Error, Result};
use crate::traits::{DnsProvider, IpResolver};
use std::future::Future;
use std::net::Ipv4Addr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Events emitted by the DdnsEngine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// Engine started
    Started {
        record_name: String,
        interval: Duration,
    },

    /// A new cycle began
    CycleStarted {
        cycle: u64,
    },

    /// Public IP resolved
    IpResolved {
        ip: Ipv4Addr,
    },

    /// Public IP could not be resolved; the cycle was skipped
    IpResolutionFailed {
        error: String,
    },

    /// Record id located
    RecordLocated {
        record_name: String,
        record_id: String,
    },

    /// Record could not be located
    RecordLocateFailed {
        record_name: String,
        error: String,
    },

    /// Record now points at the resolved IP
    RecordUpdated {
        record_name: String,
        ip: Ipv4Addr,
    },

    /// Record update failed
    RecordUpdateFailed {
        record_name: String,
        error: String,
    },

    /// Engine is pausing before the next cycle
    Sleeping {
        duration: Duration,
    },

    /// Engine stopped
    Stopped {
        reason: String,
    },
}

/// Position within a cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleState {
    Idle,
    ResolvingIp,
    LocatingRecord(TargetKind),
    UpdatingRecord(TargetKind),
    Sleeping,
}

impl std::fmt::Display for CycleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CycleState::Idle => f.write_str("idle"),
            CycleState::ResolvingIp => f.write_str("resolving-ip"),
            CycleState::LocatingRecord(kind) => write!(f, "locating-{}-record", kind),
            CycleState::UpdatingRecord(kind) => write!(f, "updating-{}-record", kind),
            CycleState::Sleeping => f.write_str("sleeping"),
        }
    }
}

/// How a cycle ended, when it did not stop the engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Both targets were attempted
    Completed {
        ip: Ipv4Addr,
        /// Targets updated successfully
        updated: usize,
        /// Targets whose update failed
        failed: usize,
        /// Targets skipped because they could not be located
        skipped: usize,
    },

    /// The public IP could not be resolved; no record calls were made
    IpUnavailable,

    /// A record could not be located and the rest of the cycle was abandoned
    Deferred {
        record_name: String,
    },
}

/// Core DDNS engine
///
/// ## Lifecycle
///
/// 1. Create with [`DdnsEngine::new()`]
/// 2. Start with [`DdnsEngine::run()`], passing a cancellation token
/// 3. Engine runs until the token is cancelled or a record lookup fails
///    under [`RecordNotFoundPolicy::Fail`]
///
/// ## Threading
///
/// All work happens sequentially on the task that calls `run()`. Cycles
/// never overlap and the base and wildcard targets are never processed
/// concurrently.
pub struct DdnsEngine {
    /// Public IP resolver
    resolver: Box<dyn IpResolver>,

    /// DNS provider for locating and updating records
    provider: Box<dyn DnsProvider>,

    /// The managed record; never mutated
    record: RecordConfig,

    /// Pause between cycles
    interval: Duration,

    /// Deadline for each outbound call
    call_timeout: Duration,

    /// What to do when a record cannot be located
    on_record_not_found: RecordNotFoundPolicy,

    /// Number of cycles started
    cycles: AtomicU64,

    /// Event sender for external monitoring
    event_tx: mpsc::Sender<EngineEvent>,
}

impl DdnsEngine {
    /// Create a new DDNS engine
    ///
    /// # Parameters
    ///
    /// - `resolver`: IP resolver implementation
    /// - `provider`: DNS provider implementation
    /// - `config`: Validated before use
    ///
    /// # Returns
    ///
    /// A tuple of (engine, event_receiver) where event_receiver yields engine events
    pub fn new(
        resolver: Box<dyn IpResolver>,
        provider: Box<dyn DnsProvider>,
        config: DdnsConfig,
    ) -> Result<(Self, mpsc::Receiver<EngineEvent>)> {
        config.validate()?;

        let (tx, rx) = mpsc::channel(config.engine.event_channel_capacity);

        let engine = Self {
            resolver,
            provider,
            interval: config.engine.interval(),
            call_timeout: config.engine.call_timeout(),
            on_record_not_found: config.engine.on_record_not_found,
            record: config.record,
            cycles: AtomicU64::new(0),
            event_tx: tx,
        };

        Ok((engine, rx))
    }

    /// Run the engine
    ///
    /// The first cycle starts immediately; each following cycle starts one
    /// interval after the previous one finished, whatever its outcome.
    ///
    /// # Returns
    ///
    /// - `Ok(())`: `shutdown` was cancelled
    /// - `Err(Error)`: A record could not be located under the `fail` policy
    pub async fn run(&self, shutdown: CancellationToken) -> Result<()> {
        info!(
            "Managing {} and {} every {:?} via {} (IP from {})",
            self.record.name,
            crate::config::wildcard_name(&self.record.name),
            self.interval,
            self.provider.provider_name(),
            self.resolver.resolver_name()
        );
        self.emit_event(EngineEvent::Started {
            record_name: self.record.name.clone(),
            interval: self.interval,
        });

        loop {
            let result = tokio::select! {
                biased;

                _ = shutdown.cancelled() => {
                    self.stop("Shutdown signal");
                    return Ok(());
                }

                result = self.run_cycle() => result,
            };

            if let Err(e) = result {
                error!("Stopping engine: {}", e);
                self.emit_event(EngineEvent::Stopped {
                    reason: e.to_string(),
                });
                return Err(e);
            }

            self.transition(CycleState::Sleeping);
            self.emit_event(EngineEvent::Sleeping {
                duration: self.interval,
            });

            tokio::select! {
                biased;

                _ = shutdown.cancelled() => {
                    self.stop("Shutdown signal");
                    return Ok(());
                }

                _ = tokio::time::sleep(self.interval) => {}
            }

            self.transition(CycleState::Idle);
        }
    }

    /// Perform a single cycle without sleeping
    ///
    /// # Returns
    ///
    /// - `Ok(CycleOutcome)`: The cycle ended in a recoverable way
    /// - `Err(Error)`: A record could not be located under the `fail` policy
    pub async fn run_cycle(&self) -> Result<CycleOutcome> {
        let cycle = self.cycles.fetch_add(1, Ordering::Relaxed) + 1;
        debug!("Starting cycle {}", cycle);
        self.emit_event(EngineEvent::CycleStarted { cycle });

        self.transition(CycleState::ResolvingIp);
        let ip = match self
            .call("resolve public IP", self.resolver.resolve())
            .await
        {
            Ok(ip) => {
                info!("Public IP resolved: {}", ip);
                self.emit_event(EngineEvent::IpResolved { ip });
                ip
            }
            Err(e) => {
                warn!("Failed to resolve public IP, skipping cycle: {}", e);
                self.emit_event(EngineEvent::IpResolutionFailed {
                    error: e.to_string(),
                });
                return Ok(CycleOutcome::IpUnavailable);
            }
        };

        let mut updated = 0;
        let mut failed = 0;
        let mut skipped = 0;

        for target in self.record.targets() {
            let record_id = match self.locate(&target).await {
                Ok(record_id) => record_id,
                Err(e) => match self.on_record_not_found {
                    RecordNotFoundPolicy::Fail => {
                        error!("Failed to locate {} record {}: {}", target.kind, target.name, e);
                        return Err(e);
                    }
                    RecordNotFoundPolicy::Retry => {
                        warn!(
                            "Failed to locate {} record {}, retrying next cycle: {}",
                            target.kind, target.name, e
                        );
                        return Ok(CycleOutcome::Deferred {
                            record_name: target.name,
                        });
                    }
                    RecordNotFoundPolicy::Skip => {
                        warn!(
                            "Failed to locate {} record {}, skipping: {}",
                            target.kind, target.name, e
                        );
                        skipped += 1;
                        continue;
                    }
                },
            };

            self.transition(CycleState::UpdatingRecord(target.kind));
            let operation = format!("update record {}", target.name);
            let result = self
                .call(
                    &operation,
                    self.provider
                        .update_record(&target.zone_id, &record_id, &target.name, ip),
                )
                .await;

            match result {
                Ok(()) => {
                    info!("Successfully updated DNS record {} to {}", target.name, ip);
                    updated += 1;
                    self.emit_event(EngineEvent::RecordUpdated {
                        record_name: target.name,
                        ip,
                    });
                }
                Err(e) => {
                    error!("Failed to update DNS record {}: {}", target.name, e);
                    failed += 1;
                    self.emit_event(EngineEvent::RecordUpdateFailed {
                        record_name: target.name,
                        error: e.to_string(),
                    });
                }
            }
        }

        Ok(CycleOutcome::Completed {
            ip,
            updated,
            failed,
            skipped,
        })
    }

    /// Locate one target's record id
    async fn locate(&self, target: &RecordTarget) -> Result<String> {
        self.transition(CycleState::LocatingRecord(target.kind));
        let operation = format!("locate record {}", target.name);

        match self
            .call(
                &operation,
                self.provider.find_record(&target.zone_id, &target.name),
            )
            .await
        {
            Ok(record_id) => {
                info!("Found {} record {} (id: {})", target.kind, target.name, record_id);

                if target.kind == TargetKind::Base
                    && let Some(configured) = self.record.record_id.as_deref()
                    && configured != record_id
                {
                    warn!(
                        "Configured record id {} differs from provider id {} for {}",
                        configured, record_id, target.name
                    );
                }

                self.emit_event(EngineEvent::RecordLocated {
                    record_name: target.name.clone(),
                    record_id: record_id.clone(),
                });
                Ok(record_id)
            }
            Err(e) => {
                self.emit_event(EngineEvent::RecordLocateFailed {
                    record_name: target.name.clone(),
                    error: e.to_string(),
                });
                Err(e)
            }
        }
    }

    /// Run an outbound call under the call timeout
    async fn call<T>(&self, operation: &str, call: impl Future<Output = Result<T>>) -> Result<T> {
        match tokio::time::timeout(self.call_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(Error::timeout(operation, self.call_timeout)),
        }
    }

    fn transition(&self, state: CycleState) {
        debug!(state = %state, "Cycle state transition");
    }

    fn stop(&self, reason: &str) {
        info!("{}, engine stopped", reason);
        self.emit_event(EngineEvent::Stopped {
            reason: reason.to_string(),
        });
    }

    /// Emit an engine event
    ///
    /// Dropped with a warning when the channel is full, silently when
    /// nobody is listening.
    fn emit_event(&self, event: EngineEvent) {
        if let Err(mpsc::error::TrySendError::Full(_)) = self.event_tx.try_send(event) {
            warn!("Event channel full, dropping event. Consider increasing event_channel_capacity.");
        }
    }
}
