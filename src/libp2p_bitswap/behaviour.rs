// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use libp2p::{
    StreamProtocol,
    request_response::{self, ProtocolSupport},
};
use tracing::{debug, warn};

use crate::libp2p_bitswap::*;

/// A `go-bitswap` compatible protocol that is built on top of
/// [`request_response::Behaviour`].
pub type BitswapBehaviour = request_response::Behaviour<BitswapRequestResponseCodec>;

/// `libp2p` swarm network behaviour event of `bitswap`
pub type BitswapBehaviourEvent = request_response::Event<Vec<BitswapMessage>, ()>;

/// Creates a [`BitswapBehaviour`] speaking the configured protocols. Invalid
/// protocol names are skipped.
pub fn new_bitswap_behaviour(config: &BitswapConfig) -> BitswapBehaviour {
    let protocols = config
        .protocols
        .iter()
        .filter_map(|name| match StreamProtocol::try_from_owned(name.clone()) {
            Ok(protocol) => Some((protocol, ProtocolSupport::Full)),
            Err(e) => {
                warn!("Skipping invalid bitswap protocol {name}: {e}");
                None
            }
        })
        .collect::<Vec<_>>();
    BitswapBehaviour::with_codec(
        BitswapRequestResponseCodec::new(config.max_message_size),
        protocols,
        request_response::Config::default(),
    )
}

/// Hooks a `bitswap` network event into the engine.
// Note: the engine performs db IO synchronously to reduce complexity
pub fn handle_event<S: BitswapStoreReadWrite, T: BitswapTransport>(
    engine: &BitswapEngine<S, T>,
    behaviour: &mut BitswapBehaviour,
    event: BitswapBehaviourEvent,
) -> anyhow::Result<()> {
    match event {
        request_response::Event::Message {
            peer,
            message:
                request_response::Message::Request {
                    request, channel, ..
                },
            ..
        } => {
            // Close inbound stream immediately since `go-bitswap` does not read this stream.
            // responses will be sent over a new outbound request
            _ = behaviour.send_response(channel, ());
            engine.on_peer_message(peer, request);
        }
        request_response::Event::Message {
            message: request_response::Message::Response { .. },
            ..
        } => {
            // Left empty, see `read_response`
        }
        request_response::Event::OutboundFailure { peer, error, .. } => {
            debug!(%peer, "bitswap outbound failure: {error}");
        }
        request_response::Event::InboundFailure { peer, error, .. } => {
            debug!(%peer, "bitswap inbound failure: {error}");
        }
        _ => {}
    }
    Ok(())
}
