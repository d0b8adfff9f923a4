// # cfddnsd - Cloudflare DDNS Daemon
//
// Thin integration layer: all update logic lives in cfddns-core. The daemon
// is responsible for:
// 1. Reading configuration from the environment (and `.env` when present)
// 2. Initializing logging and the runtime
// 3. Building the IP resolver and the Cloudflare provider
// 4. Running the engine until a shutdown signal or a fatal error
//
// ## Configuration
//
// ### Cloudflare (each falls back to a `CLOUDFLARE_*` name)
// - `API_KEY`: Global API key (required)
// - `API_MAIL`: Account email (required)
// - `ZONE_ID`: Zone id (required)
// - `RECORD_NAME`: Base hostname; its wildcard is updated too (required)
// - `RECORD_ID`: Known base record id, checked against the lookup (optional)
//
// ### Engine
// - `DDNS_INTERVAL_SECS`: Pause between cycles (default 300)
// - `DDNS_CALL_TIMEOUT_SECS`: Deadline per outbound call (default 30)
// - `DDNS_ON_RECORD_NOT_FOUND`: fail, retry or skip (default fail)
// - `DDNS_IP_ECHO_URL`: Echo service (default https://api.ipify.org)
// - `DDNS_LOG_LEVEL`: trace, debug, info, warn, error (default info)
//
// ## Example
//
// ```bash
// export API_KEY=your_global_key
// export API_MAIL=you@example.com
// export ZONE_ID=023e105f4ecef8ad9ca31a8372d0c353
// export RECORD_NAME=home.example.com
//
// cfddnsd
// ```

mod config;

use anyhow::{Context, Result};
use cfddns_core::DdnsEngine;
use cfddns_core::engine::EngineEvent;
use cfddns_ip_http::HttpIpResolver;
use cfddns_provider_cloudflare::CloudflareProvider;
use config::DaemonConfig;
use std::process::ExitCode;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};
use tracing_subscriber::FmtSubscriber;

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

/// Exit codes for different termination scenarios
///
/// These codes follow systemd conventions:
/// - 0: Clean shutdown
/// - 1: Configuration or startup error
/// - 2: Runtime error (the engine gave up)
#[derive(Debug, Clone, Copy)]
enum DdnsExitCode {
    /// Clean shutdown (normal exit)
    CleanShutdown = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error
    RuntimeError = 2,
}

impl From<DdnsExitCode> for ExitCode {
    fn from(code: DdnsExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

fn main() -> ExitCode {
    // A missing .env file is fine; the environment may already be set
    let _ = dotenvy::dotenv();

    let config = match DaemonConfig::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {:#}", e);
            return DdnsExitCode::ConfigError.into();
        }
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(config.log_level)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return DdnsExitCode::ConfigError.into();
    }

    info!("Starting cfddnsd");

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return DdnsExitCode::RuntimeError.into();
        }
    };

    let result = rt.block_on(async {
        let (engine, events) = match build_engine(config) {
            Ok(parts) => parts,
            Err(e) => {
                error!("Startup error: {:#}", e);
                return DdnsExitCode::ConfigError;
            }
        };

        if let Err(e) = run_daemon(engine, events).await {
            error!("Daemon error: {:#}", e);
            DdnsExitCode::RuntimeError
        } else {
            DdnsExitCode::CleanShutdown
        }
    });

    result.into()
}

/// Build the resolver, the provider and the engine from configuration
fn build_engine(config: DaemonConfig) -> Result<(DdnsEngine, mpsc::Receiver<EngineEvent>)> {
    let ddns = config.ddns;
    let call_timeout = ddns.engine.call_timeout();

    let resolver = HttpIpResolver::from_config(&ddns.ip_resolver, call_timeout)
        .context("Failed to create IP resolver")?;
    let provider = CloudflareProvider::from_config(&ddns.provider, call_timeout)
        .context("Failed to create Cloudflare provider")?;

    info!(
        "Managing {} and its wildcard in zone {} (interval {}s, echo {})",
        ddns.record.name,
        ddns.record.zone_id,
        ddns.engine.interval_secs,
        resolver.url()
    );

    let parts = DdnsEngine::new(Box::new(resolver), Box::new(provider), ddns)
        .context("Failed to create engine")?;
    Ok(parts)
}

/// Run the engine until a shutdown signal or a fatal error
async fn run_daemon(engine: DdnsEngine, mut events: mpsc::Receiver<EngineEvent>) -> Result<()> {
    let shutdown = CancellationToken::new();

    let event_logger = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            debug!("Engine event: {:?}", event);
        }
    });

    let signal_listener = {
        let shutdown = shutdown.clone();
        let mut listener = ShutdownListener::new()?;
        tokio::spawn(async move {
            tokio::select! {
                signal = listener.recv() => {
                    info!("Received shutdown signal: {}", signal);
                    shutdown.cancel();
                }
                _ = shutdown.cancelled() => {}
            }
        })
    };

    let result = engine.run(shutdown.clone()).await;

    // Release the signal listener if the engine stopped on its own
    shutdown.cancel();
    let _ = signal_listener.await;

    // Engine dropped: its sender is gone, so the logger drains and exits
    drop(engine);
    let _ = event_logger.await;

    result.context("Engine stopped")?;
    info!("Shutting down cfddnsd");
    Ok(())
}

/// Waits for SIGTERM or SIGINT
#[cfg(unix)]
struct ShutdownListener {
    sigterm: tokio::signal::unix::Signal,
    sigint: tokio::signal::unix::Signal,
}

#[cfg(unix)]
impl ShutdownListener {
    fn new() -> Result<Self> {
        let sigterm =
            signal(SignalKind::terminate()).context("Failed to setup SIGTERM handler")?;
        let sigint = signal(SignalKind::interrupt()).context("Failed to setup SIGINT handler")?;
        Ok(Self { sigterm, sigint })
    }

    async fn recv(&mut self) -> &'static str {
        tokio::select! {
            _ = self.sigterm.recv() => "SIGTERM",
            _ = self.sigint.recv() => "SIGINT",
        }
    }
}

/// Waits for CTRL-C
///
/// Fallback implementation for non-Unix platforms.
#[cfg(not(unix))]
struct ShutdownListener;

#[cfg(not(unix))]
impl ShutdownListener {
    fn new() -> Result<Self> {
        Ok(Self)
    }

    async fn recv(&mut self) -> &'static str {
        match tokio::signal::ctrl_c().await {
            Ok(()) => "SIGINT",
            Err(e) => {
                error!("Failed to wait for CTRL-C: {}", e);
                std::future::pending().await
            }
        }
    }
}
