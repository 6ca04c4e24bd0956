// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use ahash::HashMap;
use cid::Cid;
use itertools::Itertools as _;
use multihash_codetable::{Code, MultihashDigest as _};
use parking_lot::RwLock;

use crate::libp2p_bitswap::{BitswapStoreRead, BitswapStoreReadWrite};

/// Multicodec of raw binary blocks.
pub const RAW: u64 = 0x55;

/// Block store kept in memory. Nothing survives the process.
#[derive(Debug, Default)]
pub struct MemoryDB {
    blocks: RwLock<HashMap<Cid, Vec<u8>>>,
}

impl MemoryDB {
    /// Stores `block` as a raw block hashed with `blake2b-256` and returns its
    /// CID.
    pub fn put(&self, block: &[u8]) -> Cid {
        let cid = Cid::new_v1(RAW, Code::Blake2b256.digest(block));
        self.put_keyed(&cid, block);
        cid
    }

    pub fn put_keyed(&self, k: &Cid, block: &[u8]) {
        self.blocks.write().insert(*k, block.to_vec());
    }

    pub fn remove(&self, k: &Cid) -> Option<Vec<u8>> {
        self.blocks.write().remove(k)
    }

    pub fn len(&self) -> usize {
        self.blocks.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.read().is_empty()
    }

    pub fn cids(&self) -> Vec<Cid> {
        self.blocks.read().keys().copied().collect_vec()
    }
}

impl BitswapStoreRead for MemoryDB {
    fn contains(&self, cid: &Cid) -> anyhow::Result<bool> {
        Ok(self.blocks.read().contains_key(cid))
    }

    fn get(&self, cid: &Cid) -> anyhow::Result<Option<Vec<u8>>> {
        Ok(self.blocks.read().get(cid).cloned())
    }
}

impl BitswapStoreReadWrite for MemoryDB {
    fn insert(&self, cid: &Cid, data: &[u8]) -> anyhow::Result<()> {
        self.put_keyed(cid, data);
        Ok(())
    }
}
