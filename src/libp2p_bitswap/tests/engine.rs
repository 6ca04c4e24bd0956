// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use std::{sync::Arc, time::Duration};

use libp2p::PeerId;
use pretty_assertions::assert_eq;

use super::network::{TestEngine, cid_of, init_logging, wait_until};
use crate::{db::MemoryDB, libp2p_bitswap::*};

type Outbound = flume::Receiver<(PeerId, Vec<BitswapMessage>)>;

fn new_engine() -> (Arc<TestEngine>, Arc<MemoryDB>, Outbound) {
    init_logging();
    let store = Arc::new(MemoryDB::default());
    let (tx, rx) = flume::unbounded();
    let engine = Arc::new(BitswapEngine::new(
        BitswapConfig::default(),
        store.clone(),
        tx,
    ));
    (engine, store, rx)
}

fn online_engine() -> (Arc<TestEngine>, Arc<MemoryDB>, Outbound) {
    let (engine, store, rx) = new_engine();
    assert!(engine.go_online());
    (engine, store, rx)
}

struct FailingTransport;

impl BitswapTransport for FailingTransport {
    fn send(&self, _: &PeerId, _: Vec<BitswapMessage>) -> anyhow::Result<()> {
        anyhow::bail!("connection reset")
    }
}

#[tokio::test]
async fn offline_operations_fail_without_side_effects() {
    let (engine, _store, rx) = new_engine();
    let cid = cid_of(b"x");
    let peer = PeerId::random();

    assert!(matches!(engine.stat(), Err(BitswapError::NotOnline)));
    assert!(matches!(engine.wantlist(None), Err(BitswapError::NotOnline)));
    assert!(matches!(engine.unwant(&cid), Err(BitswapError::NotOnline)));
    assert!(matches!(engine.want(cid, 1), Err(BitswapError::NotOnline)));
    assert!(matches!(engine.ledger(&peer), Err(BitswapError::NotOnline)));
    assert!(matches!(engine.peers(), Err(BitswapError::NotOnline)));
    assert!(matches!(
        engine.notify_new_blocks(&[cid]),
        Err(BitswapError::NotOnline)
    ));
    assert!(matches!(
        engine.fetch_block(cid, Duration::from_millis(10)).await,
        Err(BitswapError::NotOnline)
    ));
    let err = engine.stat().unwrap_err();
    assert!(err.to_string().contains("online mode"));

    // ignored while offline
    engine.on_peer_connected(peer);
    engine.on_peer_message(
        peer,
        vec![BitswapMessage::Request(BitswapRequest::new_block(cid))],
    );

    assert!(engine.go_online());
    let stats = engine.stat().unwrap();
    assert_eq!(stats.wantlist_size, 0);
    assert_eq!(stats.peers_connected, 0);
    assert!(engine.wantlist(None).unwrap().is_empty());
    assert!(engine.wantlist(Some(&peer)).unwrap().is_empty());
    assert!(rx.is_empty());
}

#[tokio::test]
async fn unwant_of_unknown_cid_is_a_noop() {
    let (engine, _store, _rx) = online_engine();
    engine.want(cid_of(b"a"), 1).unwrap();
    engine.unwant(&cid_of(b"b")).unwrap();
    engine.unwant(&cid_of(b"b")).unwrap();
    assert_eq!(engine.stat().unwrap().wantlist_size, 1);
}

#[tokio::test]
async fn want_then_unwant() {
    let (engine, _store, _rx) = online_engine();
    let cid = cid_of(b"a");
    engine.want(cid, 1).unwrap();
    engine.want(cid, 3).unwrap();
    assert_eq!(engine.wantlist(None).unwrap(), vec![cid]);
    engine.unwant(&cid).unwrap();
    assert!(engine.wantlist(None).unwrap().is_empty());
    assert_eq!(engine.stat().unwrap().wantlist, vec![]);
}

#[tokio::test]
async fn fetch_without_peers_times_out() {
    let (engine, _store, _rx) = online_engine();
    let cid = cid_of(b"nobody has this");

    let fetch = tokio::spawn({
        let engine = engine.clone();
        async move { engine.fetch_block(cid, Duration::from_millis(100)).await }
    });
    assert!(wait_until(|| engine.wantlist(None).unwrap() == vec![cid]).await);

    assert!(matches!(fetch.await.unwrap(), Err(BitswapError::Timeout)));
    assert!(engine.wantlist(None).unwrap().is_empty());
}

#[tokio::test]
async fn unwant_cancels_fetch_even_if_block_arrives_right_after() {
    let (engine, store, _rx) = online_engine();
    let data = b"late block".to_vec();
    let cid = cid_of(&data);
    let peer = PeerId::random();

    let fetch = tokio::spawn({
        let engine = engine.clone();
        async move { engine.fetch_block(cid, Duration::from_secs(10)).await }
    });
    assert!(wait_until(|| engine.wantlist(None).unwrap() == vec![cid]).await);

    engine.unwant(&cid).unwrap();
    engine.on_peer_message(
        peer,
        vec![BitswapMessage::Response(cid, BitswapResponse::Block(data))],
    );

    assert!(matches!(fetch.await.unwrap(), Err(BitswapError::Canceled)));
    let stats = engine.stat().unwrap();
    assert_eq!(stats.blocks_received, 1);
    assert_eq!(stats.dup_blks_received, 1);
    // nobody wanted it anymore
    assert!(store.is_empty());
}

#[tokio::test]
async fn shutdown_cancels_fetches() {
    let (engine, _store, _rx) = online_engine();
    let cid = cid_of(b"a");

    let fetch = tokio::spawn({
        let engine = engine.clone();
        async move { engine.fetch_block(cid, Duration::from_secs(10)).await }
    });
    assert!(wait_until(|| !engine.wantlist(None).unwrap().is_empty()).await);

    engine.shutdown();
    assert!(matches!(fetch.await.unwrap(), Err(BitswapError::Canceled)));
    assert_eq!(engine.mode(), Mode::Stopped);
    assert!(!engine.go_online());
    assert!(matches!(engine.stat(), Err(BitswapError::NotOnline)));
}

#[tokio::test]
async fn standing_want_outlives_fetch_timeout() {
    let (engine, _store, _rx) = online_engine();
    let cid = cid_of(b"a");
    engine.want(cid, 1).unwrap();
    assert!(matches!(
        engine.fetch_block(cid, Duration::from_millis(20)).await,
        Err(BitswapError::Timeout)
    ));
    assert_eq!(engine.wantlist(None).unwrap(), vec![cid]);
}

#[tokio::test]
async fn concurrent_fetches_share_one_want() {
    let (engine, _store, rx) = online_engine();
    let peer = PeerId::random();
    engine.on_peer_connected(peer);
    let data = b"shared".to_vec();
    let cid = cid_of(&data);

    let fetches = (0..3)
        .map(|_| {
            let engine = engine.clone();
            tokio::spawn(async move { engine.fetch_block(cid, Duration::from_secs(10)).await })
        })
        .collect::<Vec<_>>();
    assert!(wait_until(|| engine.stat().unwrap().wantlist_size == 1).await);
    // let every fetch register
    tokio::time::sleep(Duration::from_millis(50)).await;

    engine.on_peer_message(
        peer,
        vec![BitswapMessage::Response(
            cid,
            BitswapResponse::Block(data.clone()),
        )],
    );
    for fetch in fetches {
        assert_eq!(fetch.await.unwrap().unwrap(), data);
    }

    let sent = rx.drain().collect::<Vec<_>>();
    let wants = sent
        .iter()
        .flat_map(|(_, messages)| messages)
        .filter(|m| matches!(m, BitswapMessage::Request(r) if !r.cancel))
        .count();
    assert_eq!(wants, 1);
    assert!(engine.wantlist(None).unwrap().is_empty());
    let stats = engine.stat().unwrap();
    assert_eq!(stats.blocks_received, 1);
    assert_eq!(stats.dup_blks_received, 0);
}

#[tokio::test]
async fn store_hit_returns_immediately() {
    let (engine, store, rx) = online_engine();
    let cid = store.put(b"local");
    assert_eq!(
        engine
            .fetch_block(cid, Duration::from_millis(10))
            .await
            .unwrap(),
        b"local".to_vec()
    );
    assert!(engine.wantlist(None).unwrap().is_empty());
    assert!(rx.is_empty());
}

#[tokio::test]
async fn dropping_a_fetch_releases_its_want() {
    let (engine, _store, _rx) = online_engine();
    let cid = cid_of(b"a");
    let outer = tokio::time::timeout(
        Duration::from_millis(20),
        engine.fetch_block(cid, Duration::from_secs(10)),
    )
    .await;
    assert!(outer.is_err());
    assert!(engine.wantlist(None).unwrap().is_empty());
    assert_eq!(engine.stat().unwrap().wantlist_size, 0);
}

#[tokio::test]
async fn blocks_not_matching_their_cid_are_ignored() {
    let (engine, store, _rx) = online_engine();
    let data = b"genuine".to_vec();
    let cid = cid_of(&data);
    let peer = PeerId::random();

    let fetch = tokio::spawn({
        let engine = engine.clone();
        async move { engine.fetch_block(cid, Duration::from_secs(10)).await }
    });
    assert!(wait_until(|| engine.wantlist(None).unwrap() == vec![cid]).await);

    engine.on_peer_message(
        peer,
        vec![BitswapMessage::Response(
            cid,
            BitswapResponse::Block(b"forged".to_vec()),
        )],
    );
    assert_eq!(engine.wantlist(None).unwrap(), vec![cid]);
    assert!(store.is_empty());

    engine.on_peer_message(
        peer,
        vec![BitswapMessage::Response(
            cid,
            BitswapResponse::Block(data.clone()),
        )],
    );
    assert_eq!(fetch.await.unwrap().unwrap(), data);
    assert_eq!(engine.stat().unwrap().blocks_received, 1);
    assert_eq!(store.get(&cid).unwrap(), Some(data));
}

#[tokio::test]
async fn inbound_wants_are_answered_from_the_store() {
    let (engine, store, rx) = online_engine();
    let peer = PeerId::random();
    let present = store.put(b"present");
    let missing = cid_of(b"missing");

    engine.on_peer_message(
        peer,
        vec![
            BitswapMessage::Request(BitswapRequest::new_block(present)),
            BitswapMessage::Request(BitswapRequest::new_have(missing).send_dont_have(true)),
            BitswapMessage::Request(BitswapRequest::new_block(cid_of(b"quiet"))),
        ],
    );

    let (to, messages) = rx.try_recv().unwrap();
    assert_eq!(to, peer);
    assert_eq!(
        messages,
        vec![
            BitswapMessage::Response(present, BitswapResponse::Block(b"present".to_vec())),
            BitswapMessage::Response(missing, BitswapResponse::Have(false)),
        ]
    );
    assert!(rx.is_empty());

    // served and answered entries are dropped, the silent one stays
    assert_eq!(
        engine.wantlist(Some(&peer)).unwrap(),
        vec![cid_of(b"quiet")]
    );
    let ledger = engine.ledger(&peer).unwrap();
    assert_eq!(ledger.state, ConnectionState::Connected);
    assert_eq!(ledger.blocks_sent, 1);
    assert_eq!(ledger.sent, b"present".len() as u64);
    assert_eq!(ledger.exchanged, 2);
}

#[tokio::test]
async fn cancel_removes_peer_want() {
    let (engine, _store, _rx) = online_engine();
    let peer = PeerId::random();
    let cid = cid_of(b"a");
    engine.on_peer_message(
        peer,
        vec![BitswapMessage::Request(BitswapRequest::new_block(cid))],
    );
    assert_eq!(engine.wantlist(Some(&peer)).unwrap(), vec![cid]);
    engine.on_peer_message(
        peer,
        vec![BitswapMessage::Request(BitswapRequest::new_cancel(cid))],
    );
    assert!(engine.wantlist(Some(&peer)).unwrap().is_empty());
}

#[tokio::test]
async fn new_peers_get_the_wantlist_by_priority() {
    let (engine, _store, rx) = online_engine();
    let low = cid_of(b"low");
    let high = cid_of(b"high");
    engine.want(low, 1).unwrap();
    engine.want(high, 10).unwrap();
    assert!(rx.is_empty());

    let peer = PeerId::random();
    engine.on_peer_connected(peer);
    let (to, messages) = rx.try_recv().unwrap();
    assert_eq!(to, peer);
    let cids = messages
        .iter()
        .map(|m| match m {
            BitswapMessage::Request(r) => r.cid,
            other => panic!("unexpected {other:?}"),
        })
        .collect::<Vec<_>>();
    assert_eq!(cids, vec![high, low]);
    assert_eq!(engine.peers().unwrap(), vec![peer]);

    // later wants are broadcast
    let extra = cid_of(b"extra");
    engine.want(extra, 1).unwrap();
    let (_, messages) = rx.try_recv().unwrap();
    assert_eq!(
        messages,
        vec![BitswapMessage::Request(
            BitswapRequest::new_block(extra).send_dont_have(true)
        )]
    );
}

#[tokio::test]
async fn disconnect_drops_session_and_keeps_totals() {
    let (engine, store, _rx) = online_engine();
    let peer = PeerId::random();
    let cid = store.put(b"served");
    engine.on_peer_connected(peer);
    engine.on_peer_message(
        peer,
        vec![
            BitswapMessage::Request(BitswapRequest::new_block(cid)),
            BitswapMessage::Request(BitswapRequest::new_block(cid_of(b"other"))),
        ],
    );
    assert_eq!(engine.wantlist(Some(&peer)).unwrap().len(), 1);

    engine.on_peer_disconnected(&peer);
    assert!(engine.wantlist(Some(&peer)).unwrap().is_empty());
    assert!(engine.peers().unwrap().is_empty());
    let stats = engine.stat().unwrap();
    assert_eq!(stats.peers_connected, 0);
    assert_eq!(stats.blocks_sent, 1);
    assert_eq!(stats.data_sent, b"served".len() as u64);
    assert_eq!(
        engine.ledger(&peer).unwrap().state,
        ConnectionState::Disconnected
    );
}

#[tokio::test]
async fn transport_failures_are_not_accounted() {
    init_logging();
    let engine = BitswapEngine::new(
        BitswapConfig::default(),
        Arc::new(MemoryDB::default()),
        FailingTransport,
    );
    assert!(engine.go_online());
    let peer = PeerId::random();
    engine.on_peer_connected(peer);
    assert!(matches!(
        engine
            .fetch_block(cid_of(b"a"), Duration::from_millis(20))
            .await,
        Err(BitswapError::Timeout)
    ));
    let ledger = engine.ledger(&peer).unwrap();
    assert_eq!(ledger.exchanged, 0);
    assert_eq!(ledger.sent, 0);
}

#[tokio::test]
async fn notify_satisfies_local_wants() {
    let (engine, store, _rx) = online_engine();
    let data = b"out of band".to_vec();
    let cid = cid_of(&data);
    let fetch = tokio::spawn({
        let engine = engine.clone();
        async move { engine.fetch_block(cid, Duration::from_secs(10)).await }
    });
    assert!(wait_until(|| engine.wantlist(None).unwrap() == vec![cid]).await);

    store.put_keyed(&cid, &data);
    engine.notify_new_blocks(&[cid, cid_of(b"unknown")]).unwrap();
    assert_eq!(fetch.await.unwrap().unwrap(), data);
    assert!(engine.wantlist(None).unwrap().is_empty());
}

/// Hands `data` to the engine from a blocking thread, like a swarm task would.
fn deliver(
    engine: &Arc<TestEngine>,
    peer: PeerId,
    cid: Cid,
    data: &[u8],
) -> tokio::task::JoinHandle<()> {
    let engine = engine.clone();
    let data = data.to_vec();
    tokio::task::spawn_blocking(move || {
        engine.on_peer_message(
            peer,
            vec![BitswapMessage::Response(cid, BitswapResponse::Block(data))],
        )
    })
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn block_racing_a_fetch_is_stored_before_it_is_returned() {
    let (engine, store, _rx) = online_engine();
    let peer = PeerId::random();
    for i in 0..500 {
        let data = format!("racing block {i}").into_bytes();
        let cid = cid_of(&data);
        let fetch = tokio::spawn({
            let engine = engine.clone();
            async move { engine.fetch_block(cid, Duration::from_millis(5)).await }
        });
        let delivered = deliver(&engine, peer, cid, &data);

        let result = tokio::time::timeout(Duration::from_secs(5), fetch)
            .await
            .expect("fetch never settled")
            .unwrap();
        delivered.await.unwrap();
        match result {
            Ok(got) => {
                assert_eq!(got, data);
                assert_eq!(store.get(&cid).unwrap(), Some(data));
            }
            Err(e) => assert!(matches!(e, BitswapError::Timeout), "{e}"),
        }
    }
    assert!(engine.wantlist(None).unwrap().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn racing_unwant_arrival_and_timeouts_settle_every_fetch() {
    let (engine, store, _rx) = online_engine();
    let peer = PeerId::random();
    let rounds = 300;
    for i in 0..rounds {
        let data = format!("contended block {i}").into_bytes();
        let cid = cid_of(&data);
        let fetches = (0..3u64)
            .map(|j| {
                let engine = engine.clone();
                let timeout = Duration::from_millis(1 + (i + j) % 4);
                tokio::spawn(async move { engine.fetch_block(cid, timeout).await })
            })
            .collect::<Vec<_>>();
        let unwant = tokio::spawn({
            let engine = engine.clone();
            async move {
                tokio::task::yield_now().await;
                engine.unwant(&cid).unwrap();
            }
        });
        let delivered = deliver(&engine, peer, cid, &data);

        for fetch in fetches {
            let result = tokio::time::timeout(Duration::from_secs(5), fetch)
                .await
                .expect("fetch never settled")
                .unwrap();
            match result {
                Ok(got) => {
                    assert_eq!(got, data);
                    assert_eq!(store.get(&cid).unwrap(), Some(data.clone()));
                }
                Err(BitswapError::Canceled | BitswapError::Timeout) => {}
                Err(e) => panic!("unexpected fetch error: {e}"),
            }
        }
        unwant.await.unwrap();
        delivered.await.unwrap();
    }
    let stats = engine.stat().unwrap();
    assert_eq!(stats.blocks_received, rounds);
    assert_eq!(stats.wantlist_size, 0);
}
