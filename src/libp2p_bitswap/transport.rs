// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use libp2p::PeerId;

use crate::libp2p_bitswap::*;

/// Outbound half of the network a [`BitswapEngine`] talks through.
///
/// Implementations must not call back into the engine synchronously; inbound
/// traffic is delivered through [`BitswapEngine::on_peer_message`] and the
/// connection hooks.
pub trait BitswapTransport: Send + Sync + 'static {
    /// Queues `messages` for delivery to `peer` as a single frame.
    fn send(&self, peer: &PeerId, messages: Vec<BitswapMessage>) -> anyhow::Result<()>;
}

/// Channel drained by the swarm event loop, which forwards every item with
/// [`BitswapBehaviour::send_request`].
pub type BitswapOutboundSender = flume::Sender<(PeerId, Vec<BitswapMessage>)>;

impl BitswapTransport for BitswapOutboundSender {
    fn send(&self, peer: &PeerId, messages: Vec<BitswapMessage>) -> anyhow::Result<()> {
        flume::Sender::send(self, (*peer, messages))
            .map_err(|_| anyhow::anyhow!("bitswap outbound channel is closed"))
    }
}
