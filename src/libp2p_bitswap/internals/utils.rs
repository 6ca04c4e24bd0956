// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use protobuf::EnumOrUnknown;

use crate::libp2p_bitswap::{RequestType, pb::bitswap_pb::message::wantlist::WantType};

pub(in crate::libp2p_bitswap) fn map_io_err(
    e: impl Into<Box<dyn std::error::Error + Send + Sync>>,
) -> std::io::Error {
    std::io::Error::other(e)
}

impl TryFrom<EnumOrUnknown<WantType>> for RequestType {
    type Error = anyhow::Error;

    fn try_from(value: EnumOrUnknown<WantType>) -> Result<Self, Self::Error> {
        match value.enum_value() {
            Ok(WantType::Block) => Ok(RequestType::Block),
            Ok(WantType::Have) => Ok(RequestType::Have),
            Err(unknown) => anyhow::bail!("unknown want type {unknown}"),
        }
    }
}

impl From<RequestType> for EnumOrUnknown<WantType> {
    fn from(value: RequestType) -> Self {
        EnumOrUnknown::new(match value {
            RequestType::Block => WantType::Block,
            RequestType::Have => WantType::Have,
        })
    }
}
