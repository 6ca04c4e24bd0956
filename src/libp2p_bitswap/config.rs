// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_with::{DurationSeconds, serde_as};

use crate::libp2p_bitswap::DEFAULT_PRIORITY;

/// Default timeout of a block fetch.
pub const BITSWAP_TIMEOUT: Duration = Duration::from_secs(30);

/// 2MB Block Size according to the specs at <https://github.com/ipfs/specs/blob/main/BITSWAP.md>
pub const MAX_BUF_SIZE: usize = 1024 * 1024 * 2;

/// Protocols supported by `go-bitswap`, newest first.
pub const DEFAULT_PROTOCOLS: [&str; 4] = [
    "/ipfs/bitswap/1.2.0",
    "/ipfs/bitswap/1.1.0",
    "/ipfs/bitswap/1.0.0",
    "/ipfs/bitswap",
];

/// `bitswap` settings, usually loaded as a table of the daemon configuration.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, smart_default::SmartDefault)]
#[serde(default, rename_all = "kebab-case")]
pub struct BitswapConfig {
    /// Priority of wants registered by block fetches.
    #[default(DEFAULT_PRIORITY)]
    pub default_priority: i32,
    /// Timeout used by [`crate::libp2p_bitswap::BitswapEngine::get_block`].
    #[default(BITSWAP_TIMEOUT)]
    #[serde_as(as = "DurationSeconds<u64>")]
    pub fetch_timeout: Duration,
    /// Ask peers to answer with `DONT_HAVE` when they miss a block.
    #[default(true)]
    pub send_dont_have: bool,
    /// Largest frame accepted from or written to a peer.
    #[default(MAX_BUF_SIZE)]
    pub max_message_size: usize,
    #[default(DEFAULT_PROTOCOLS.iter().map(|p| p.to_string()).collect())]
    pub protocols: Vec<String>,
}
