// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT
//! Another libp2p
//! bitswap([SPEC](https://github.com/ipfs/specs/blob/main/BITSWAP.md))
//! implementation in Rust.
//!
//! ## Features
//!
//! - Compatible with [`go-bitswap`](https://github.com/ipfs/go-bitswap) wire format
//! - Want-list bookkeeping for the local node and every connected peer
//! - Per-peer ledgers and aggregated statistics
//! - Prometheus metrics
//!
//! ## Usage
//!
//! A [`BitswapEngine`] is bound to a [`BitswapTransport`] and a block store that
//! implements [`BitswapStoreReadWrite`]. It refuses to serve callers until
//! [`BitswapEngine::go_online`] is called, which the network service does once
//! the swarm is listening. The swarm event loop feeds the engine with
//! connection events and inbound messages (see [`handle_event`]) and drains
//! the outbound channel into [`BitswapBehaviour::send_request`].

use std::io::Result as IOResult;

use cid::Cid;

mod internals;
use internals::*;
pub use internals::codec::BitswapRequestResponseCodec;

mod behaviour;
pub use behaviour::*;

mod config;
pub use config::*;

mod engine;
pub use engine::*;

mod error;
pub use error::*;

mod ledger;
pub use ledger::*;

mod message;
pub use message::*;

mod metrics;

mod mode;
pub use mode::*;

mod store;
pub use store::*;

mod transport;
pub use transport::*;

mod wantlist;
pub use wantlist::*;

mod pb {
    include!(concat!(env!("OUT_DIR"), "/proto/mod.rs"));
}
