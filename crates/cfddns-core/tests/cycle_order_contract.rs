//! Contract Test: Cycle Order
//!
//! Verifies the shape of a healthy cycle.
//!
//! Constraints verified:
//! - One cycle is exactly: resolve, locate base, update base,
//!   locate wildcard, update wildcard, then one sleep
//! - Records are re-pushed every cycle even when the IP is unchanged
//! - The wildcard name is derived fresh and never double-prefixed
//! - Cycles are spaced by the configured interval

mod common;

use cfddns_core::engine::{CycleOutcome, EngineEvent};
use cfddns_core::{DdnsEngine, RecordNotFoundPolicy};
use common::*;
use std::net::Ipv4Addr;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const IP: Ipv4Addr = Ipv4Addr::new(203, 0, 113, 7);

#[tokio::test]
async fn single_cycle_calls_in_order() {
    let journal = Journal::new();
    let (engine, _event_rx) = DdnsEngine::new(
        Box::new(ScriptedResolver::new(&journal, IP)),
        Box::new(MockDnsProvider::new(&journal)),
        minimal_config(RecordNotFoundPolicy::Fail),
    )
    .expect("engine construction succeeds");

    let outcome = engine.run_cycle().await.expect("cycle succeeds");

    assert_eq!(
        outcome,
        CycleOutcome::Completed {
            ip: IP,
            updated: 2,
            failed: 0,
            skipped: 0,
        }
    );
    assert_eq!(journal.calls(), full_cycle(IP));
}

#[tokio::test(start_paused = true)]
async fn run_sleeps_once_after_each_cycle() {
    let journal = Journal::new();
    let (engine, mut event_rx) = DdnsEngine::new(
        Box::new(ScriptedResolver::new(&journal, IP)),
        Box::new(MockDnsProvider::new(&journal)),
        minimal_config(RecordNotFoundPolicy::Fail),
    )
    .expect("engine construction succeeds");

    let shutdown = CancellationToken::new();
    let engine_handle = {
        let shutdown = shutdown.clone();
        tokio::spawn(async move { engine.run(shutdown).await })
    };

    let events = wait_for_sleeps(&mut event_rx, 1).await;
    shutdown.cancel();
    engine_handle.await.unwrap().expect("clean shutdown");

    assert_eq!(journal.calls(), full_cycle(IP));

    let expected = vec![
        EngineEvent::Started {
            record_name: BASE_NAME.to_string(),
            interval: Duration::from_secs(300),
        },
        EngineEvent::CycleStarted { cycle: 1 },
        EngineEvent::IpResolved { ip: IP },
        EngineEvent::RecordLocated {
            record_name: BASE_NAME.to_string(),
            record_id: BASE_ID.to_string(),
        },
        EngineEvent::RecordUpdated {
            record_name: BASE_NAME.to_string(),
            ip: IP,
        },
        EngineEvent::RecordLocated {
            record_name: WILDCARD_NAME.to_string(),
            record_id: WILDCARD_ID.to_string(),
        },
        EngineEvent::RecordUpdated {
            record_name: WILDCARD_NAME.to_string(),
            ip: IP,
        },
        EngineEvent::Sleeping {
            duration: Duration::from_secs(300),
        },
    ];
    assert_eq!(events, expected);
}

#[tokio::test]
async fn unchanged_ip_is_pushed_again() {
    let journal = Journal::new();
    let (engine, _event_rx) = DdnsEngine::new(
        Box::new(ScriptedResolver::new(&journal, IP)),
        Box::new(MockDnsProvider::new(&journal)),
        minimal_config(RecordNotFoundPolicy::Fail),
    )
    .expect("engine construction succeeds");

    engine.run_cycle().await.expect("first cycle succeeds");
    engine.run_cycle().await.expect("second cycle succeeds");

    let mut expected = full_cycle(IP);
    expected.extend(full_cycle(IP));
    assert_eq!(journal.calls(), expected);
}

#[tokio::test]
async fn wildcard_name_never_double_prefixes() {
    let journal = Journal::new();
    let (engine, _event_rx) = DdnsEngine::new(
        Box::new(ScriptedResolver::new(&journal, IP)),
        Box::new(MockDnsProvider::new(&journal)),
        minimal_config(RecordNotFoundPolicy::Fail),
    )
    .expect("engine construction succeeds");

    for _ in 0..3 {
        engine.run_cycle().await.expect("cycle succeeds");
    }

    let looked_up: Vec<Call> = journal
        .calls()
        .into_iter()
        .filter(|c| matches!(c, Call::Find(_)))
        .collect();

    assert_eq!(
        looked_up,
        vec![
            Call::find(BASE_NAME),
            Call::find(WILDCARD_NAME),
            Call::find(BASE_NAME),
            Call::find(WILDCARD_NAME),
            Call::find(BASE_NAME),
            Call::find(WILDCARD_NAME),
        ]
    );
    assert!(
        !journal
            .calls()
            .iter()
            .any(|c| matches!(c, Call::Find(name) if name.starts_with("*.*.")))
    );
}

#[tokio::test(start_paused = true)]
async fn cycles_are_spaced_by_interval() {
    let journal = Journal::new();
    let mut config = minimal_config(RecordNotFoundPolicy::Fail);
    config.engine.interval_secs = 120;

    let (engine, mut event_rx) = DdnsEngine::new(
        Box::new(ScriptedResolver::new(&journal, IP)),
        Box::new(MockDnsProvider::new(&journal)),
        config,
    )
    .expect("engine construction succeeds");

    let start = tokio::time::Instant::now();
    let shutdown = CancellationToken::new();
    let engine_handle = {
        let shutdown = shutdown.clone();
        tokio::spawn(async move { engine.run(shutdown).await })
    };

    let mut cycle_starts = Vec::new();
    while let Some(event) = event_rx.recv().await {
        if let EngineEvent::CycleStarted { .. } = event {
            cycle_starts.push(tokio::time::Instant::now() - start);
            if cycle_starts.len() == 3 {
                break;
            }
        }
    }
    shutdown.cancel();
    engine_handle.await.unwrap().expect("clean shutdown");

    assert_eq!(
        cycle_starts,
        vec![
            Duration::ZERO,
            Duration::from_secs(120),
            Duration::from_secs(240),
        ]
    );
}

#[tokio::test]
async fn configured_record_id_is_informational() {
    // A stale RECORD_ID must not be used for updates
    let journal = Journal::new();
    let mut config = minimal_config(RecordNotFoundPolicy::Fail);
    config.record = config.record.with_record_id("stale-id");

    let (engine, _event_rx) = DdnsEngine::new(
        Box::new(ScriptedResolver::new(&journal, IP)),
        Box::new(MockDnsProvider::new(&journal)),
        config,
    )
    .expect("engine construction succeeds");

    engine.run_cycle().await.expect("cycle succeeds");

    assert_eq!(journal.calls(), full_cycle(IP));
}

#[test]
fn wildcard_base_name_is_rejected() {
    let journal = Journal::new();
    let mut config = minimal_config(RecordNotFoundPolicy::Fail);
    config.record.name = WILDCARD_NAME.to_string();

    let result = DdnsEngine::new(
        Box::new(ScriptedResolver::new(&journal, IP)),
        Box::new(MockDnsProvider::new(&journal)),
        config,
    );

    assert!(matches!(result, Err(cfddns_core::Error::Config(_))));
}
