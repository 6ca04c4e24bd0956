// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use indexmap::IndexMap;
use itertools::Itertools as _;

use crate::libp2p_bitswap::*;

/// A live want for a single CID.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct WantEntry {
    pub cid: Cid,
    pub priority: i32,
    pub want_type: RequestType,
    pub send_dont_have: bool,
    /// Number of local contexts holding this want. Always `1` for wants
    /// learned from a peer.
    refs: usize,
}

impl WantEntry {
    fn new(cid: Cid, priority: i32, want_type: RequestType, send_dont_have: bool) -> Self {
        Self {
            cid,
            priority,
            want_type,
            send_dont_have,
            refs: 1,
        }
    }

    pub fn refs(&self) -> usize {
        self.refs
    }

    /// The entry as a want request on the wire.
    pub fn to_request(&self) -> BitswapRequest {
        BitswapRequest {
            ty: self.want_type,
            cid: self.cid,
            priority: self.priority,
            send_dont_have: self.send_dont_have,
            cancel: false,
        }
    }
}

/// Insertion ordered set of wants, at most one entry per CID.
///
/// Entries keep their position when they are re-wanted, so listing is stable
/// as long as nothing is added or removed.
#[derive(Clone, Debug, Default)]
pub struct WantList {
    entries: IndexMap<Cid, WantEntry>,
}

impl WantList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a want, or takes another reference on an existing one. Re-wanting
    /// updates the priority, and a block want supersedes a have want.
    ///
    /// Returns `true` if the entry is new.
    pub fn want(&mut self, cid: Cid, priority: i32, want_type: RequestType) -> bool {
        self.want_with(cid, priority, want_type, false)
    }

    pub fn want_with(
        &mut self,
        cid: Cid,
        priority: i32,
        want_type: RequestType,
        send_dont_have: bool,
    ) -> bool {
        match self.entries.get_mut(&cid) {
            Some(entry) => {
                entry.priority = priority;
                entry.refs += 1;
                if want_type == RequestType::Block {
                    entry.want_type = RequestType::Block;
                }
                entry.send_dont_have |= send_dont_have;
                false
            }
            None => {
                self.entries.insert(
                    cid,
                    WantEntry::new(cid, priority, want_type, send_dont_have),
                );
                true
            }
        }
    }

    /// Merges a want-list update received from a peer. A cancel removes the
    /// entry; anything else replaces it, since a peer holds a single want per
    /// CID.
    pub fn apply(&mut self, request: &BitswapRequest) {
        if request.cancel {
            self.remove(&request.cid);
        } else if let Some(entry) = self.entries.get_mut(&request.cid) {
            entry.priority = request.priority;
            entry.want_type = request.ty;
            entry.send_dont_have = request.send_dont_have;
        } else {
            self.entries.insert(
                request.cid,
                WantEntry::new(
                    request.cid,
                    request.priority,
                    request.ty,
                    request.send_dont_have,
                ),
            );
        }
    }

    /// Drops one reference. The entry goes away with its last reference.
    ///
    /// Returns `true` if the entry was removed.
    pub fn release(&mut self, cid: &Cid) -> bool {
        match self.entries.get_mut(cid) {
            Some(entry) if entry.refs > 1 => {
                entry.refs -= 1;
                false
            }
            Some(_) => self.entries.shift_remove(cid).is_some(),
            None => false,
        }
    }

    /// Removes the entry regardless of how many references it holds.
    pub fn remove(&mut self, cid: &Cid) -> Option<WantEntry> {
        self.entries.shift_remove(cid)
    }

    /// Removes the entry only if it asks for `want_type`.
    pub fn remove_type(&mut self, cid: &Cid, want_type: RequestType) -> Option<WantEntry> {
        if self.entries.get(cid)?.want_type == want_type {
            self.remove(cid)
        } else {
            None
        }
    }

    pub fn contains(&self, cid: &Cid) -> bool {
        self.entries.contains_key(cid)
    }

    pub fn get(&self, cid: &Cid) -> Option<&WantEntry> {
        self.entries.get(cid)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear()
    }

    /// CIDs in insertion order.
    pub fn cids(&self) -> Vec<Cid> {
        self.entries.keys().copied().collect()
    }

    /// Entries with the highest priority first, ties in insertion order.
    pub fn sorted_by_priority(&self) -> Vec<&WantEntry> {
        self.entries
            .values()
            .sorted_by(|a, b| b.priority.cmp(&a.priority))
            .collect()
    }
}
