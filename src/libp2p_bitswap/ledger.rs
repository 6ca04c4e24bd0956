// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use std::ops::AddAssign;

use libp2p::PeerId;

use crate::libp2p_bitswap::*;

/// Counters of what was exchanged with a peer.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Ledger {
    pub blocks_sent: u64,
    pub blocks_received: u64,
    pub data_sent: u64,
    pub data_received: u64,
    /// Blocks received that nobody wanted anymore.
    pub dup_blocks_received: u64,
    pub dup_data_received: u64,
    /// Inbound and outbound frames.
    pub exchanged: u64,
}

impl Ledger {
    pub fn record_sent(&mut self, blocks: u64, bytes: u64) {
        self.blocks_sent += blocks;
        self.data_sent += bytes;
    }

    pub fn record_received(&mut self, bytes: u64, duplicate: bool) {
        self.blocks_received += 1;
        self.data_received += bytes;
        if duplicate {
            self.dup_blocks_received += 1;
            self.dup_data_received += bytes;
        }
    }

    /// Bytes sent per byte received, `go-bitswap` style.
    pub fn debt_ratio(&self) -> f64 {
        self.data_sent as f64 / (self.data_received as f64 + 1.0)
    }
}

impl AddAssign<&Ledger> for Ledger {
    fn add_assign(&mut self, rhs: &Ledger) {
        self.blocks_sent += rhs.blocks_sent;
        self.blocks_received += rhs.blocks_received;
        self.data_sent += rhs.data_sent;
        self.data_received += rhs.data_received;
        self.dup_blocks_received += rhs.dup_blocks_received;
        self.dup_data_received += rhs.dup_data_received;
        self.exchanged += rhs.exchanged;
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ConnectionState {
    Connected,
    Disconnected,
}

/// Everything the engine tracks about one peer.
#[derive(Debug)]
pub struct PeerSession {
    pub peer: PeerId,
    /// What we believe the peer wants.
    pub wantlist: WantList,
    pub ledger: Ledger,
}

impl PeerSession {
    pub fn new(peer: PeerId) -> Self {
        Self {
            peer,
            wantlist: WantList::new(),
            ledger: Ledger::default(),
        }
    }

    pub fn snapshot(&self) -> BitswapLedger {
        BitswapLedger::new(self.peer, ConnectionState::Connected, self.ledger)
    }
}

/// Ledger of a single peer as reported to callers.
#[derive(Clone, Debug, PartialEq)]
pub struct BitswapLedger {
    pub peer: PeerId,
    pub state: ConnectionState,
    /// Debt ratio, see [`Ledger::debt_ratio`].
    pub value: f64,
    pub sent: u64,
    pub recv: u64,
    pub exchanged: u64,
    pub blocks_sent: u64,
    pub blocks_received: u64,
}

impl BitswapLedger {
    fn new(peer: PeerId, state: ConnectionState, ledger: Ledger) -> Self {
        Self {
            peer,
            state,
            value: ledger.debt_ratio(),
            sent: ledger.data_sent,
            recv: ledger.data_received,
            exchanged: ledger.exchanged,
            blocks_sent: ledger.blocks_sent,
            blocks_received: ledger.blocks_received,
        }
    }

    /// Ledger of a peer we have never talked to, or no longer do.
    pub fn empty(peer: PeerId) -> Self {
        Self::new(peer, ConnectionState::Disconnected, Ledger::default())
    }
}

/// Snapshot of the engine, decoupled from its live state.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BitswapStats {
    pub blocks_sent: u64,
    pub blocks_received: u64,
    pub data_sent: u64,
    pub data_received: u64,
    pub dup_blks_received: u64,
    pub dup_data_received: u64,
    pub peers_connected: usize,
    pub wantlist_size: usize,
    pub wantlist: Vec<Cid>,
    pub peers: Vec<PeerId>,
}

/// Rolls per-peer ledgers into global counters. Ledgers of disconnected peers
/// are folded into `historical` so totals never go backwards.
#[derive(Debug, Default)]
pub(in crate::libp2p_bitswap) struct StatsAggregator {
    historical: Ledger,
}

impl StatsAggregator {
    pub fn retire(&mut self, session: &PeerSession) {
        self.historical += &session.ledger;
    }

    /// Accounts traffic that was confirmed after its peer went away.
    pub fn historical_mut(&mut self) -> &mut Ledger {
        &mut self.historical
    }

    pub fn snapshot<'a>(
        &self,
        sessions: impl Iterator<Item = &'a PeerSession>,
        local_wantlist: &WantList,
    ) -> BitswapStats {
        let mut total = self.historical;
        let mut peers = vec![];
        for session in sessions {
            total += &session.ledger;
            peers.push(session.peer);
        }
        BitswapStats {
            blocks_sent: total.blocks_sent,
            blocks_received: total.blocks_received,
            data_sent: total.data_sent,
            data_received: total.data_received,
            dup_blks_received: total.dup_blocks_received,
            dup_data_received: total.dup_data_received,
            peers_connected: peers.len(),
            wantlist_size: local_wantlist.len(),
            wantlist: local_wantlist.cids(),
            peers,
        }
    }
}
