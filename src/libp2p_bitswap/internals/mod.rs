// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

pub(in crate::libp2p_bitswap) mod codec;
pub(in crate::libp2p_bitswap) mod prefix;

mod utils;
pub(in crate::libp2p_bitswap) use utils::*;
