// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use std::time::Duration;

use ahash::HashMap;
use itertools::Itertools as _;
use libp2p::PeerId;
use parking_lot::Mutex;
use scopeguard::ScopeGuard;
use tracing::{debug, info, trace, warn};

use crate::libp2p_bitswap::{prefix::Prefix, *};

/// Terminal state of a pending fetch, delivered to every waiter.
#[derive(Clone, Debug)]
enum Resolution {
    Block(Vec<u8>),
    Canceled,
}

#[derive(Debug)]
struct Waiter {
    id: u64,
    tx: flume::Sender<Resolution>,
}

#[derive(Debug, Default)]
struct PendingFetch {
    waiters: Vec<Waiter>,
}

impl PendingFetch {
    fn resolve(self, resolution: Resolution) {
        for waiter in self.waiters {
            // the receiver is gone when the fetch future was dropped
            _ = waiter.tx.send(resolution.clone());
        }
    }
}

#[derive(Debug, Default)]
struct EngineState {
    /// What this node wants.
    wantlist: WantList,
    sessions: HashMap<PeerId, PeerSession>,
    pending: HashMap<Cid, PendingFetch>,
    stats: StatsAggregator,
    next_waiter_id: u64,
}

impl EngineState {
    fn session(&mut self, peer: PeerId) -> &mut PeerSession {
        if !self.sessions.contains_key(&peer) {
            debug!(%peer, "new bitswap session");
            self.sessions.insert(peer, PeerSession::new(peer));
            metrics::peer_container_capacity().set(self.sessions.capacity() as _);
        }
        self.sessions
            .entry(peer)
            .or_insert_with(|| PeerSession::new(peer))
    }

    /// Ledger to account confirmed traffic with `peer` to. Falls back to the
    /// historical totals when the session ended in the meantime.
    fn ledger_mut(&mut self, peer: &PeerId) -> &mut Ledger {
        match self.sessions.get_mut(peer) {
            Some(session) => &mut session.ledger,
            None => self.stats.historical_mut(),
        }
    }

    fn connected_peers(&self) -> Vec<PeerId> {
        self.sessions.keys().copied().collect()
    }

    /// Peers other than `except` whose want-list holds `cid`.
    fn peers_wanting(
        &self,
        cid: &Cid,
        except: Option<&PeerId>,
    ) -> Vec<(PeerId, RequestType)> {
        self.sessions
            .values()
            .filter(|s| Some(&s.peer) != except)
            .filter_map(|s| s.wantlist.get(cid).map(|e| (s.peer, e.want_type)))
            .collect()
    }

    fn update_pending_gauge(&self) {
        metrics::pending_fetch_container_capacity().set(self.pending.capacity() as _);
    }
}

/// A `go-bitswap` compatible block exchange engine.
///
/// The engine keeps the local want-list, one [`PeerSession`] per peer and the
/// table of block fetches waiting for data. It is bound to a block store and
/// to a [`BitswapTransport`]; the network layer drives it through
/// [`BitswapEngine::on_peer_message`], [`BitswapEngine::on_peer_connected`]
/// and [`BitswapEngine::on_peer_disconnected`].
///
/// All caller facing operations fail with [`BitswapError::NotOnline`] until
/// [`BitswapEngine::go_online`] is called.
pub struct BitswapEngine<S, T> {
    config: BitswapConfig,
    store: S,
    transport: T,
    mode: ModeGate,
    state: Mutex<EngineState>,
}

impl<S: BitswapStoreReadWrite, T: BitswapTransport> BitswapEngine<S, T> {
    pub fn new(config: BitswapConfig, store: S, transport: T) -> Self {
        Self {
            config,
            store,
            transport,
            mode: ModeGate::default(),
            state: Mutex::new(EngineState::default()),
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode.mode()
    }

    pub fn is_online(&self) -> bool {
        self.mode.is_online()
    }

    /// Called once the transport is ready. Returns `false` if the engine was
    /// already online or has been shut down.
    pub fn go_online(&self) -> bool {
        let switched = self.mode.go_online();
        if switched {
            info!("bitswap engine is online");
        }
        switched
    }

    /// Stops the engine for good. Outstanding fetches fail with
    /// [`BitswapError::Canceled`].
    pub fn shutdown(&self) {
        let pending = {
            let mut state = self.state.lock();
            // flipped under the lock so no fetch can register afterwards
            if !self.mode.stop() {
                return;
            }
            state.wantlist.clear();
            let pending = std::mem::take(&mut state.pending);
            state.update_pending_gauge();
            debug!(fetches = pending.len(), "canceling block fetches on shutdown");
            pending
        };
        for (_, fetch) in pending {
            fetch.resolve(Resolution::Canceled);
        }
        info!("bitswap engine stopped");
    }

    pub fn stat(&self) -> Result<BitswapStats, BitswapError> {
        self.mode.require_online()?;
        let state = self.state.lock();
        Ok(state.stats.snapshot(state.sessions.values(), &state.wantlist))
    }

    /// The local want-list when `peer` is `None`, otherwise the want-list we
    /// believe `peer` holds. Unknown peers want nothing.
    pub fn wantlist(&self, peer: Option<&PeerId>) -> Result<Vec<Cid>, BitswapError> {
        self.mode.require_online()?;
        let state = self.state.lock();
        Ok(match peer {
            None => state.wantlist.cids(),
            Some(peer) => state
                .sessions
                .get(peer)
                .map(|s| s.wantlist.cids())
                .unwrap_or_default(),
        })
    }

    pub fn ledger(&self, peer: &PeerId) -> Result<BitswapLedger, BitswapError> {
        self.mode.require_online()?;
        let state = self.state.lock();
        Ok(state
            .sessions
            .get(peer)
            .map(PeerSession::snapshot)
            .unwrap_or_else(|| BitswapLedger::empty(*peer)))
    }

    pub fn peers(&self) -> Result<Vec<PeerId>, BitswapError> {
        self.mode.require_online()?;
        Ok(self.state.lock().connected_peers())
    }

    /// Adds a standing want for `cid`, broadcast to every connected peer when
    /// it is new. It stays until the block arrives or [`Self::unwant`] is
    /// called.
    pub fn want(&self, cid: Cid, priority: i32) -> Result<(), BitswapError> {
        self.mode.require_online()?;
        let newly_wanted = {
            let mut state = self.state.lock();
            self.mode.require_online()?;
            state.wantlist.want_with(
                cid,
                priority,
                RequestType::Block,
                self.config.send_dont_have,
            )
        };
        if newly_wanted {
            self.broadcast(&[BitswapRequest::new_block(cid)
                .priority(priority)
                .send_dont_have(self.config.send_dont_have)]);
        }
        Ok(())
    }

    /// Drops the local want for `cid` no matter how many contexts hold it.
    /// Every fetch waiting for it fails with [`BitswapError::Canceled`].
    pub fn unwant(&self, cid: &Cid) -> Result<(), BitswapError> {
        self.mode.require_online()?;
        let removed = {
            let mut guard = self.state.lock();
            let state = &mut *guard;
            if let Some(fetch) = state.pending.remove(cid) {
                debug!(%cid, waiters = fetch.waiters.len(), "canceling block fetch");
                fetch.resolve(Resolution::Canceled);
                state.update_pending_gauge();
            }
            state.wantlist.remove(cid).is_some()
        };
        if removed {
            self.broadcast(&[BitswapRequest::new_cancel(*cid)]);
        }
        Ok(())
    }

    /// [`Self::fetch_block`] with the configured timeout.
    pub async fn get_block(&self, cid: Cid) -> Result<Vec<u8>, BitswapError> {
        self.fetch_block(cid, self.config.fetch_timeout).await
    }

    /// Returns the block for `cid`, asking connected peers for it when the
    /// store does not have it.
    ///
    /// Dropping the returned future releases its want like a timeout does.
    pub async fn fetch_block(&self, cid: Cid, timeout: Duration) -> Result<Vec<u8>, BitswapError> {
        self.mode.require_online()?;
        if let Some(data) = self.load(&cid) {
            return Ok(data);
        }

        let (tx, rx) = flume::bounded(1);
        let (id, newly_wanted) = {
            let mut guard = self.state.lock();
            self.mode.require_online()?;
            let state = &mut *guard;
            let id = state.next_waiter_id;
            state.next_waiter_id += 1;
            state
                .pending
                .entry(cid)
                .or_default()
                .waiters
                .push(Waiter { id, tx });
            state.update_pending_gauge();
            let newly_wanted = state.wantlist.want_with(
                cid,
                self.config.default_priority,
                RequestType::Block,
                self.config.send_dont_have,
            );
            (id, newly_wanted)
        };
        let guard = scopeguard::guard((), move |()| {
            self.release_waiter(&cid, id);
        });

        if newly_wanted {
            trace!(%cid, "broadcasting want");
            self.broadcast(&[BitswapRequest::new_block(cid)
                .priority(self.config.default_priority)
                .send_dont_have(self.config.send_dont_have)]);
        }
        // the block may have landed between the first lookup and registration
        if let Some(data) = self.load(&cid) {
            self.satisfy_local(&cid, &data);
        }

        let outcome = tokio::time::timeout(timeout, rx.recv_async()).await;
        ScopeGuard::into_inner(guard);
        let resolution = match outcome {
            Ok(Ok(resolution)) => resolution,
            Ok(Err(_)) => Resolution::Canceled,
            Err(_) => {
                if self.release_waiter(&cid, id) {
                    debug!(%cid, "block fetch timed out");
                    return Err(BitswapError::Timeout);
                }
                // taken out of the table right at the deadline, whoever took
                // it sends the resolution or drops the sender
                rx.recv_async().await.unwrap_or(Resolution::Canceled)
            }
        };
        match resolution {
            Resolution::Block(data) => Ok(data),
            Resolution::Canceled => Err(BitswapError::Canceled),
        }
    }

    /// Announces blocks that were put into the store out of band. Local wants
    /// for them are satisfied and peers that asked for them are served.
    pub fn notify_new_blocks(&self, cids: &[Cid]) -> Result<(), BitswapError> {
        self.mode.require_online()?;
        for cid in cids {
            let Some(data) = self.load(cid) else {
                debug!("{}", BitswapError::NotFound(*cid));
                continue;
            };
            self.satisfy_local(cid, &data);
            self.serve_peers(cid, &data, None);
        }
        Ok(())
    }

    /// Handles a batch of messages received from `peer`. Sessions are created
    /// on demand for peers the transport has not announced yet.
    pub fn on_peer_message(&self, peer: PeerId, messages: Vec<BitswapMessage>) {
        if !self.mode.is_online() {
            debug!(%peer, "ignoring bitswap message while not online");
            return;
        }

        let mut requests = vec![];
        let mut blocks = vec![];
        {
            let mut state = self.state.lock();
            let session = state.session(peer);
            session.ledger.exchanged += 1;
            for message in messages {
                match message {
                    BitswapMessage::Request(request) => {
                        let counter = match (request.cancel, request.ty) {
                            (true, _) => metrics::message_counter_inbound_request_cancel(),
                            (false, RequestType::Have) => {
                                metrics::message_counter_inbound_request_have()
                            }
                            (false, RequestType::Block) => {
                                metrics::message_counter_inbound_request_block()
                            }
                        };
                        counter.inc();
                        session.wantlist.apply(&request);
                        if !request.cancel {
                            requests.push(request);
                        }
                    }
                    BitswapMessage::Response(cid, BitswapResponse::Have(have)) => {
                        if have {
                            metrics::message_counter_inbound_response_have_yes().inc();
                        } else {
                            metrics::message_counter_inbound_response_have_no().inc();
                        }
                        trace!(%peer, %cid, have, "block presence");
                    }
                    BitswapMessage::Response(cid, BitswapResponse::Block(data)) => {
                        metrics::message_counter_inbound_response_block().inc();
                        blocks.push((cid, data));
                    }
                }
            }
        }

        let answers = requests
            .iter()
            .filter_map(|request| {
                self.handle_inbound_request(request)
                    .map(|response| BitswapMessage::Response(request.cid, response))
            })
            .collect_vec();
        if !answers.is_empty() {
            self.send(&peer, answers);
        }

        for (cid, data) in blocks {
            self.on_block_received(&peer, cid, data);
        }
    }

    /// Opens a session for `peer` and sends it the whole local want-list.
    pub fn on_peer_connected(&self, peer: PeerId) {
        if !self.mode.is_online() {
            debug!(%peer, "ignoring peer connection while not online");
            return;
        }
        let wants = {
            let mut state = self.state.lock();
            state.session(peer);
            state
                .wantlist
                .sorted_by_priority()
                .into_iter()
                .map(|entry| BitswapMessage::Request(entry.to_request()))
                .collect_vec()
        };
        if !wants.is_empty() {
            self.send(&peer, wants);
        }
    }

    /// Ends the session of `peer`. Its want-list is dropped and its ledger is
    /// kept in the historical totals. Fetches keep waiting for other peers.
    pub fn on_peer_disconnected(&self, peer: &PeerId) {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        if let Some(session) = state.sessions.remove(peer) {
            state.stats.retire(&session);
            metrics::peer_container_capacity().set(state.sessions.capacity() as _);
            debug!(%peer, dropped_wants = session.wantlist.len(), "bitswap session closed");
        }
    }

    fn on_block_received(&self, peer: &PeerId, cid: Cid, data: Vec<u8>) {
        if !is_valid_block(&cid, &data) {
            metrics::message_counter_inbound_response_block_invalid().inc();
            warn!(%peer, "{}", BitswapError::InvalidBlock(cid));
            return;
        }

        let (fetch, removed) = {
            let mut guard = self.state.lock();
            let state = &mut *guard;
            let fetch = state.pending.remove(&cid);
            if fetch.is_some() {
                state.update_pending_gauge();
            }
            let removed = state.wantlist.remove(&cid).is_some();
            let wanted = fetch.is_some() || removed;
            state
                .ledger_mut(peer)
                .record_received(data.len() as u64, !wanted);
            (fetch, removed)
        };
        if fetch.is_none() && !removed {
            trace!(%peer, %cid, "duplicate block");
            return;
        }

        let stored = match self.store.insert(&cid, &data) {
            Ok(()) => {
                metrics::message_counter_inbound_response_block_update_db().inc();
                true
            }
            Err(e) => {
                metrics::message_counter_inbound_response_block_update_db_failure().inc();
                warn!(%cid, "{}", BitswapError::Store(e));
                false
            }
        };
        if let Some(fetch) = fetch {
            fetch.resolve(Resolution::Block(data.clone()));
        }
        // fetches that registered while the block was being stored
        self.satisfy_local(&cid, &data);
        if removed {
            self.broadcast(&[BitswapRequest::new_cancel(cid)]);
        }
        if stored {
            self.serve_peers(&cid, &data, Some(peer));
        }
    }

    /// Sends `data` to every peer other than `except` that asked for it,
    /// or its presence to peers that only asked whether we have it.
    fn serve_peers(&self, cid: &Cid, data: &[u8], except: Option<&PeerId>) {
        let targets = self.state.lock().peers_wanting(cid, except);
        for (peer, want_type) in targets {
            let response = match want_type {
                RequestType::Block => BitswapResponse::Block(data.to_vec()),
                RequestType::Have => BitswapResponse::Have(true),
            };
            self.send(&peer, vec![BitswapMessage::Response(*cid, response)]);
        }
    }

    /// Resolves local interest in `cid` with `data` already in the store.
    fn satisfy_local(&self, cid: &Cid, data: &[u8]) {
        let removed = {
            let mut guard = self.state.lock();
            let state = &mut *guard;
            if let Some(fetch) = state.pending.remove(cid) {
                fetch.resolve(Resolution::Block(data.to_vec()));
                state.update_pending_gauge();
            }
            state.wantlist.remove(cid).is_some()
        };
        if removed {
            self.broadcast(&[BitswapRequest::new_cancel(*cid)]);
        }
    }

    /// Removes a waiter that gave up and releases its want reference.
    /// Returns `false` if the waiter was already resolved.
    fn release_waiter(&self, cid: &Cid, id: u64) -> bool {
        let removed = {
            let mut guard = self.state.lock();
            let state = &mut *guard;
            let Some(fetch) = state.pending.get_mut(cid) else {
                return false;
            };
            let Some(pos) = fetch.waiters.iter().position(|w| w.id == id) else {
                return false;
            };
            fetch.waiters.swap_remove(pos);
            if fetch.waiters.is_empty() {
                state.pending.remove(cid);
                state.update_pending_gauge();
            }
            state.wantlist.release(cid)
        };
        if removed {
            self.broadcast(&[BitswapRequest::new_cancel(*cid)]);
        }
        true
    }

    fn handle_inbound_request(&self, request: &BitswapRequest) -> Option<BitswapResponse> {
        match request.ty {
            RequestType::Have => {
                let have = self.store.contains(&request.cid).unwrap_or_else(|e| {
                    warn!(cid = %request.cid, "{}", BitswapError::Store(e));
                    false
                });
                if have || request.send_dont_have {
                    Some(BitswapResponse::Have(have))
                } else {
                    None
                }
            }
            RequestType::Block => {
                if let Some(data) = self.load(&request.cid) {
                    Some(BitswapResponse::Block(data))
                } else if request.send_dont_have {
                    Some(BitswapResponse::Have(false))
                } else {
                    None
                }
            }
        }
    }

    fn load(&self, cid: &Cid) -> Option<Vec<u8>> {
        self.store.get(cid).unwrap_or_else(|e| {
            warn!(%cid, "{}", BitswapError::Store(e));
            None
        })
    }

    fn broadcast(&self, requests: &[BitswapRequest]) {
        let peers = self.state.lock().connected_peers();
        for peer in peers {
            let messages = requests
                .iter()
                .cloned()
                .map(BitswapMessage::Request)
                .collect();
            self.send(&peer, messages);
        }
    }

    /// Hands `messages` to the transport as one frame. The ledger of `peer`
    /// is only updated once the transport accepted the frame. Returns `false`
    /// on a transport failure, which is logged and otherwise ignored.
    fn send(&self, peer: &PeerId, messages: Vec<BitswapMessage>) -> bool {
        let mut blocks = vec![];
        let mut presences = vec![];
        for message in &messages {
            match message {
                BitswapMessage::Request(request) => {
                    let counter = match (request.cancel, request.ty) {
                        (true, _) => metrics::message_counter_outbound_request_cancel(),
                        (false, RequestType::Have) => {
                            metrics::message_counter_outbound_request_have()
                        }
                        (false, RequestType::Block) => {
                            metrics::message_counter_outbound_request_block()
                        }
                    };
                    counter.inc();
                }
                BitswapMessage::Response(cid, BitswapResponse::Have(_)) => {
                    metrics::message_counter_outbound_response_have().inc();
                    presences.push(*cid);
                }
                BitswapMessage::Response(cid, BitswapResponse::Block(data)) => {
                    metrics::message_counter_outbound_response_block().inc();
                    blocks.push((*cid, data.len() as u64));
                }
            }
        }

        if let Err(source) = self.transport.send(peer, messages) {
            warn!(
                "{}",
                BitswapError::Transport {
                    peer: *peer,
                    source
                }
            );
            return false;
        }

        let mut guard = self.state.lock();
        let state = &mut *guard;
        let ledger = state.ledger_mut(peer);
        ledger.exchanged += 1;
        ledger.record_sent(blocks.len() as u64, blocks.iter().map(|(_, len)| len).sum());
        if let Some(session) = state.sessions.get_mut(peer) {
            for (cid, _) in &blocks {
                session.wantlist.remove_type(cid, RequestType::Block);
            }
            for cid in &presences {
                session.wantlist.remove_type(cid, RequestType::Have);
            }
        }
        true
    }
}

fn is_valid_block(cid: &Cid, data: &[u8]) -> bool {
    matches!(Prefix::from(cid).to_cid(data), Ok(computed) if computed == *cid)
}
