// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use proptest::prelude::*;
use std::collections::HashSet;
use std::time::Duration;
use tokio::time::timeout;

#[test]
fn from_guid_renders_sixteen_hex_bytes() {
    let id = MessageId::from_guid(0x0123_4567_89ab_cdef);
    assert_eq!(id.as_str(), "0123456789abcdef");
    assert_eq!(id.as_bytes().len(), MSG_ID_LENGTH);
}

#[test]
fn compose_places_worker_in_top_bits() {
    let guid = compose_guid(1023, 5).unwrap();
    let id = MessageId::from_guid(guid);
    assert_eq!(id.worker_id(), 1023);
    assert_eq!(id.sequence(), 5);
}

#[test]
fn compose_rejects_exhausted_sequence() {
    assert_eq!(compose_guid(0, MAX_SEQUENCE + 1), Err(IdError::Exhausted));
    assert!(compose_guid(0, MAX_SEQUENCE).is_ok());
}

#[test]
fn compose_rejects_oversized_worker() {
    assert_eq!(compose_guid(1024, 0), Err(IdError::WorkerId(1024)));
    assert!(GuidFactory::new(1024).is_err());
}

#[test]
fn factory_never_repeats() {
    let factory = GuidFactory::new(3).unwrap();
    let ids: HashSet<_> = (0..10_000).map(|_| factory.next_id().unwrap()).collect();
    assert_eq!(ids.len(), 10_000);
    assert!(ids.iter().all(|id| id.worker_id() == 3));
}

#[test]
fn factories_with_same_worker_share_the_sequence() {
    let a = GuidFactory::new(9).unwrap();
    let b = GuidFactory::new(9).unwrap();
    let ids: HashSet<_> = (0..1_000)
        .flat_map(|_| [a.next_id().unwrap(), b.next_id().unwrap()])
        .collect();
    assert_eq!(ids.len(), 2_000);
}

proptest! {
    #[test]
    fn guid_survives_rendering(worker in 0u16..1024, sequence in 0u64..=MAX_SEQUENCE) {
        let guid = compose_guid(worker, sequence).unwrap();
        let id = MessageId::from_guid(guid);
        prop_assert_eq!(id.guid(), guid);
        prop_assert_eq!(id.worker_id(), worker);
        prop_assert_eq!(id.sequence(), sequence);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_consumers_receive_distinct_ids() {
    let (_shutdown_tx, shutdown_rx) = watch::channel(false);
    let (source, _handle) = spawn(17, shutdown_rx).unwrap();

    let consumers = 8;
    let per_consumer = 12_500;
    let tasks: Vec<_> = (0..consumers)
        .map(|_| {
            let source = source.clone();
            tokio::spawn(async move {
                let mut ids = Vec::with_capacity(per_consumer);
                for _ in 0..per_consumer {
                    ids.push(source.next().await.unwrap());
                }
                ids
            })
        })
        .collect();

    let mut all = HashSet::new();
    for task in tasks {
        for id in task.await.unwrap() {
            assert!(all.insert(id), "duplicate id {}", id);
        }
    }
    assert_eq!(all.len(), consumers * per_consumer);
    assert!(all.iter().all(|id| id.worker_id() == 17));
}

#[tokio::test]
async fn generator_exits_on_shutdown() {
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let (source, handle) = spawn(1, shutdown_rx).unwrap();
    source.next().await.unwrap();

    shutdown_tx.send_replace(true);

    timeout(Duration::from_secs(1), handle)
        .await
        .expect("generator should stop promptly")
        .unwrap();
}

#[tokio::test]
async fn generator_exits_when_shutdown_sender_dropped() {
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let (_source, handle) = spawn(1, shutdown_rx).unwrap();

    drop(shutdown_tx);

    timeout(Duration::from_secs(1), handle)
        .await
        .expect("generator should stop promptly")
        .unwrap();
}

#[tokio::test]
async fn generator_exits_when_sources_dropped() {
    let (_shutdown_tx, shutdown_rx) = watch::channel(false);
    let (source, handle) = spawn(1, shutdown_rx).unwrap();

    drop(source);

    timeout(Duration::from_secs(1), handle)
        .await
        .expect("generator should stop promptly")
        .unwrap();
}

#[tokio::test]
async fn source_reports_stopped_after_drain() {
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let (source, handle) = spawn(1, shutdown_rx).unwrap();
    shutdown_tx.send_replace(true);
    handle.await.unwrap();

    // Abandoned IDs may still be buffered; drain them
    let mut drained = 0;
    let result = loop {
        match source.next().await {
            Ok(_) => drained += 1,
            Err(e) => break e,
        }
    };
    assert_eq!(result, IdError::Stopped);
    assert!(drained <= ID_BUFFER_CAPACITY);
}

#[tokio::test]
async fn generator_started_after_shutdown_exits_immediately() {
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    shutdown_tx.send_replace(true);
    let (_source, handle) = spawn(1, shutdown_rx).unwrap();

    timeout(Duration::from_secs(1), handle)
        .await
        .expect("generator should not start producing")
        .unwrap();
}
