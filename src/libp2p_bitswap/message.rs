// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use multihash_codetable::{Code, MultihashDigest as _};
use protobuf::Message as _;
use tracing::error;

use crate::libp2p_bitswap::{
    pb::bitswap_pb::{self, message::BlockPresenceType},
    prefix::Prefix,
    *,
};

/// Priority `go-bitswap` assigns to wants when the caller does not pick one.
pub const DEFAULT_PRIORITY: i32 = 1;

/// What a want asks for: the block itself, or only whether the peer has it.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum RequestType {
    Have,
    Block,
}

/// A single want-list entry as exchanged on the wire. A request with
/// `cancel` set revokes an earlier want for the same CID.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BitswapRequest {
    pub ty: RequestType,
    pub cid: Cid,
    pub priority: i32,
    pub send_dont_have: bool,
    pub cancel: bool,
}

impl BitswapRequest {
    pub fn new_have(cid: Cid) -> Self {
        Self {
            ty: RequestType::Have,
            cid,
            priority: DEFAULT_PRIORITY,
            send_dont_have: false,
            cancel: false,
        }
    }

    pub fn new_block(cid: Cid) -> Self {
        Self {
            ty: RequestType::Block,
            cid,
            priority: DEFAULT_PRIORITY,
            send_dont_have: false,
            cancel: false,
        }
    }

    pub fn new_cancel(cid: Cid) -> Self {
        Self {
            ty: RequestType::Block,
            cid,
            priority: DEFAULT_PRIORITY,
            send_dont_have: false,
            cancel: true,
        }
    }

    pub fn send_dont_have(mut self, b: bool) -> Self {
        self.send_dont_have = b;
        self
    }

    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum BitswapResponse {
    Have(bool),
    Block(Vec<u8>),
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum BitswapMessage {
    Request(BitswapRequest),
    Response(Cid, BitswapResponse),
}

/// Packs a batch of messages into a single `go-bitswap` protobuf frame.
pub fn messages_to_bytes(messages: &[BitswapMessage]) -> IOResult<Vec<u8>> {
    let mut msg = bitswap_pb::Message::new();
    for message in messages {
        match message {
            BitswapMessage::Request(BitswapRequest {
                ty,
                cid,
                priority,
                send_dont_have,
                cancel,
            }) => {
                let mut entry = bitswap_pb::message::wantlist::Entry::new();
                entry.block = cid.to_bytes();
                entry.priority = *priority;
                entry.cancel = *cancel;
                entry.wantType = (*ty).into();
                entry.sendDontHave = *send_dont_have;
                msg.wantlist.mut_or_insert_default().entries.push(entry);
            }
            BitswapMessage::Response(cid, BitswapResponse::Have(have)) => {
                let mut block_presence = bitswap_pb::message::BlockPresence::new();
                block_presence.cid = cid.to_bytes();
                block_presence.type_ = if *have {
                    BlockPresenceType::Have
                } else {
                    BlockPresenceType::DontHave
                }
                .into();
                msg.blockPresences.push(block_presence);
            }
            BitswapMessage::Response(cid, BitswapResponse::Block(bytes)) => {
                let mut payload = bitswap_pb::message::Block::new();
                payload.prefix = Prefix::from(cid).to_bytes();
                payload.data = bytes.clone();
                msg.payload.push(payload);
            }
        }
    }
    msg.write_to_bytes().map_err(map_io_err)
}

/// Unpacks a `go-bitswap` protobuf frame. Block CIDs are recomputed from the
/// payload prefix and the hashed data, so a decoded block always matches its
/// CID.
pub fn messages_from_bytes(data: &[u8]) -> IOResult<Vec<BitswapMessage>> {
    let pb_msg = bitswap_pb::Message::parse_from_bytes(data).map_err(map_io_err)?;
    let mut parts = vec![];
    for entry in pb_msg.wantlist.unwrap_or_default().entries {
        let cid = Cid::try_from(entry.block).map_err(map_io_err)?;
        let ty = match RequestType::try_from(entry.wantType) {
            Ok(ty) => ty,
            Err(e) => {
                error!("Skipping invalid request type: {e}");
                continue;
            }
        };
        parts.push(BitswapMessage::Request(BitswapRequest {
            ty,
            cid,
            priority: entry.priority,
            send_dont_have: entry.sendDontHave,
            cancel: entry.cancel,
        }));
    }
    // bitswap 1.0.0 only carries `CIDv0` blocks
    for block in pb_msg.blocks {
        let cid = Cid::new_v0(Code::Sha2_256.digest(&block)).map_err(map_io_err)?;
        parts.push(BitswapMessage::Response(cid, BitswapResponse::Block(block)));
    }
    for payload in pb_msg.payload {
        let prefix = Prefix::new(&payload.prefix).map_err(map_io_err)?;
        let cid = prefix.to_cid(&payload.data).map_err(map_io_err)?;
        parts.push(BitswapMessage::Response(
            cid,
            BitswapResponse::Block(payload.data),
        ));
    }
    for presence in pb_msg.blockPresences {
        let cid = Cid::try_from(presence.cid).map_err(map_io_err)?;
        let have = match presence.type_.enum_value() {
            Ok(BlockPresenceType::Have) => true,
            Ok(BlockPresenceType::DontHave) => false,
            Err(e) => {
                error!("Skipping invalid block presence type {e}");
                continue;
            }
        };
        parts.push(BitswapMessage::Response(cid, BitswapResponse::Have(have)));
    }
    Ok(parts)
}
