// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use cid::{Cid, Version, multihash::Multihash};
use multihash_codetable::{Code, MultihashDigest as _};
use unsigned_varint::{decode as varint_decode, encode as varint_encode};

/// Multihash code of the identity "hash", which inlines the data itself.
const IDENTITY: u64 = 0x0;

/// Prefix represents all metadata of a CID, without the actual content.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(in crate::libp2p_bitswap) struct Prefix {
    /// The version of `CID`.
    pub version: Version,
    /// The codec of `CID`.
    pub codec: u64,
    /// The `multihash` type of `CID`.
    pub mh_type: u64,
    /// The `multihash` length of `CID`.
    pub mh_len: usize,
}

impl Prefix {
    /// Create a new prefix from encoded bytes.
    pub fn new(data: &[u8]) -> anyhow::Result<Prefix> {
        let (raw_version, remain) = varint_decode::u64(data)?;
        let version = Version::try_from(raw_version)?;
        let (codec, remain) = varint_decode::u64(remain)?;
        let (mh_type, remain) = varint_decode::u64(remain)?;
        let (mh_len, _remain) = varint_decode::usize(remain)?;
        Ok(Prefix {
            version,
            codec,
            mh_type,
            mh_len,
        })
    }

    /// Convert the prefix to encoded bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut res = Vec::with_capacity(4 * 10);

        let mut buf = varint_encode::u64_buffer();
        res.extend_from_slice(varint_encode::u64(self.version.into(), &mut buf));
        let mut buf = varint_encode::u64_buffer();
        res.extend_from_slice(varint_encode::u64(self.codec, &mut buf));
        let mut buf = varint_encode::u64_buffer();
        res.extend_from_slice(varint_encode::u64(self.mh_type, &mut buf));
        let mut buf = varint_encode::usize_buffer();
        res.extend_from_slice(varint_encode::usize(self.mh_len, &mut buf));

        res
    }

    /// Create a CID out of the prefix and some data that will be hashed
    pub fn to_cid(&self, data: &[u8]) -> anyhow::Result<Cid> {
        let hash = if self.mh_type == IDENTITY {
            anyhow::ensure!(
                data.len() == self.mh_len,
                "identity hash length mismatch: expected {}, got {}",
                self.mh_len,
                data.len()
            );
            Multihash::wrap(IDENTITY, data)?
        } else {
            let code = Code::try_from(self.mh_type)
                .map_err(|_| anyhow::anyhow!("unsupported multihash code {:#x}", self.mh_type))?;
            let hash = code.digest(data);
            if usize::from(hash.size()) == self.mh_len {
                hash
            } else {
                anyhow::ensure!(
                    self.mh_len < usize::from(hash.size()),
                    "invalid multihash length {} for code {:#x}",
                    self.mh_len,
                    self.mh_type
                );
                hash.truncate(self.mh_len as u8)
            }
        };
        Ok(Cid::new(self.version, self.codec, hash)?)
    }
}

impl From<&Cid> for Prefix {
    fn from(cid: &Cid) -> Self {
        Self {
            version: cid.version(),
            codec: cid.codec(),
            mh_type: cid.hash().code(),
            mh_len: cid.hash().size().into(),
        }
    }
}
