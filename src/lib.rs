// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! Bitswap block exchange for Forest nodes.
//!
//! The engine lives in [`libp2p_bitswap`]. It is bound to two collaborators:
//! a transport that delivers [`libp2p_bitswap::BitswapMessage`]s to peers and
//! a block store implementing [`libp2p_bitswap::BitswapStoreReadWrite`].
//! [`db::MemoryDB`] is an in-memory store suitable for tests and light nodes.

pub mod db;
pub mod libp2p_bitswap;
pub mod metrics;
