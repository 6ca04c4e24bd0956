// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use libp2p::PeerId;

use crate::libp2p_bitswap::*;

/// Errors surfaced by [`BitswapEngine`].
///
/// Callers only ever see [`BitswapError::NotOnline`], [`BitswapError::Timeout`]
/// and [`BitswapError::Canceled`]; the remaining kinds are recovered inside the
/// engine and only show up in logs.
#[derive(Debug, thiserror::Error)]
pub enum BitswapError {
    #[error("this action must be run in online mode")]
    NotOnline,
    #[error("timed out waiting for block")]
    Timeout,
    #[error("block request was canceled")]
    Canceled,
    #[error("failed to send bitswap message to {peer}: {source}")]
    Transport {
        peer: PeerId,
        #[source]
        source: anyhow::Error,
    },
    #[error("block {0} not found")]
    NotFound(Cid),
    #[error("block data does not hash to {0}")]
    InvalidBlock(Cid),
    #[error(transparent)]
    Store(anyhow::Error),
}
