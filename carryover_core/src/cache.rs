// Copyright 2026 the Carryover Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Two-generation item resource cache.
//!
//! The cache maps [`ItemKey`]s to [`ResourceHandle`]s in two generations:
//!
//! - `current` — every key queried during the transaction being built;
//! - `previous` — what `current` held when the last transaction committed.
//!
//! A lookup first checks `current` (same-transaction reuse), then recycles
//! from `previous`, and only then allocates. At commit, whatever was not
//! recycled out of `previous` is evicted into the
//! [`DiscardLedger`] and the generations rotate.
//!
//! # Rollback
//!
//! While a transaction is open the cache keeps a journal: which keys were
//! recycled, which handles were created, which were displaced by a kind
//! change, and a snapshot of every pre-existing handle before its first
//! mutation. [`rollback`](ItemResourceCache::rollback) uses the journal to put
//! both generations back exactly as they were when the transaction began.
//!
//! # Ownership
//!
//! Both maps store [`HandleId`]s into one [`HandleArena`]. Each map entry,
//! and each entry of the displaced list, holds one arena reference; a handle
//! is destroyed only when its last reference is released. At commit, its
//! remote identifier is then handed to the ledger.

use alloc::vec::Vec;

use hashbrown::{HashMap, HashSet};

use crate::handle::{HandleArena, HandleId, ResourceHandle, ResourceKind};
use crate::item::ItemKey;
use crate::ledger::DiscardLedger;

/// How a [`get_or_create`](ItemResourceCache::get_or_create) call was served.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CacheLookup {
    /// Already queried earlier in this transaction.
    Hit,
    /// Moved over from the previous generation.
    Recycled,
    /// Freshly allocated.
    Created,
}

#[derive(Debug, Default)]
struct Journal {
    recycled: Vec<(ItemKey, HandleId)>,
    created: HashSet<HandleId>,
    displaced: Vec<HandleId>,
    snapshots: HashMap<HandleId, ResourceHandle>,
}

impl Journal {
    fn clear(&mut self) {
        self.recycled.clear();
        self.created.clear();
        self.displaced.clear();
        self.snapshots.clear();
    }

    fn is_empty(&self) -> bool {
        self.recycled.is_empty()
            && self.created.is_empty()
            && self.displaced.is_empty()
            && self.snapshots.is_empty()
    }
}

/// The cross-transaction handle cache.
#[derive(Debug, Default)]
pub struct ItemResourceCache {
    arena: HandleArena,
    current: HashMap<ItemKey, HandleId>,
    previous: HashMap<ItemKey, HandleId>,
    journal: Journal,
}

impl ItemResourceCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the handle for `key`, recycling or creating it as needed.
    ///
    /// A handle whose kind differs from `kind` is never returned. A stale
    /// handle in `previous` stays there to be evicted at commit; a stale
    /// handle in `current` is displaced and released at commit.
    pub fn get_or_create(&mut self, key: ItemKey, kind: ResourceKind) -> (HandleId, CacheLookup) {
        if let Some(&id) = self.current.get(&key) {
            if self.kind_of(id) == Some(kind) {
                return (id, CacheLookup::Hit);
            }
            // The map's reference moves to the displaced list.
            self.current.remove(&key);
            self.journal.displaced.push(id);
        } else if let Some(&id) = self.previous.get(&key) {
            if self.kind_of(id) == Some(kind) {
                self.previous.remove(&key);
                self.current.insert(key, id);
                self.journal.recycled.push((key, id));
                return (id, CacheLookup::Recycled);
            }
        }

        let id = self.arena.insert(ResourceHandle::new(kind));
        self.current.insert(key, id);
        self.journal.created.insert(id);
        (id, CacheLookup::Created)
    }

    /// Returns the handle behind `id`.
    #[must_use]
    pub fn handle(&self, id: HandleId) -> Option<&ResourceHandle> {
        self.arena.get(id)
    }

    /// Returns the handle behind `id` for mutation.
    ///
    /// The first mutable access to a handle that existed before the current
    /// transaction records a snapshot so the change can be rolled back.
    pub fn handle_mut(&mut self, id: HandleId) -> Option<&mut ResourceHandle> {
        if !self.journal.created.contains(&id) && !self.journal.snapshots.contains_key(&id) {
            let snapshot = self.arena.get(id)?.clone();
            self.journal.snapshots.insert(id, snapshot);
        }
        self.arena.get_mut(id)
    }

    /// Looks up the handle for `key` in the current generation.
    #[must_use]
    pub fn current(&self, key: ItemKey) -> Option<HandleId> {
        self.current.get(&key).copied()
    }

    /// Looks up the handle for `key` in the previous generation.
    #[must_use]
    pub fn previous(&self, key: ItemKey) -> Option<HandleId> {
        self.previous.get(&key).copied()
    }

    /// Number of entries in the current generation.
    #[must_use]
    pub fn current_len(&self) -> usize {
        self.current.len()
    }

    /// Number of entries in the previous generation.
    #[must_use]
    pub fn previous_len(&self) -> usize {
        self.previous.len()
    }

    /// Number of live handles across both generations.
    #[must_use]
    pub fn live_handles(&self) -> usize {
        self.arena.len()
    }

    /// Returns `true` if a transaction has touched the cache since the last
    /// commit or rollback.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        !self.current.is_empty() || !self.journal.is_empty()
    }

    /// Commits the open transaction.
    ///
    /// Releases displaced handles and every handle left in `previous` into
    /// `ledger`, then makes `current` the new `previous`. Returns the number
    /// of handles evicted.
    pub fn end_transaction(&mut self, ledger: &mut DiscardLedger) -> usize {
        let mut evicted = 0;
        for id in core::mem::take(&mut self.journal.displaced) {
            evicted += usize::from(self.release_into(id, ledger));
        }
        for (_, id) in self.previous.drain() {
            if let Some(handle) = self.arena.release(id) {
                if let Some(remote) = handle.remote_id() {
                    ledger.add(remote);
                }
                evicted += 1;
            }
        }
        core::mem::swap(&mut self.previous, &mut self.current);
        self.journal.clear();
        evicted
    }

    /// Abandons the open transaction.
    ///
    /// Both generations return to their state at transaction start.
    /// Identifiers allocated during the abandoned transaction were only ever
    /// announced in its dropped resource side-table, so they are forgotten
    /// rather than discarded.
    pub fn rollback(&mut self) {
        for &(key, id) in &self.journal.recycled {
            self.arena.retain(id);
            self.previous.insert(key, id);
        }
        for (id, snapshot) in self.journal.snapshots.drain() {
            if let Some(handle) = self.arena.get_mut(id) {
                *handle = snapshot;
            }
        }
        for (_, id) in self.current.drain() {
            self.arena.release(id);
        }
        for id in core::mem::take(&mut self.journal.displaced) {
            self.arena.release(id);
        }
        self.journal.clear();
    }

    /// Releases every handle in both generations into `ledger`.
    ///
    /// Any open transaction is rolled back first. Returns the number of
    /// handles evicted.
    pub fn evict_all(&mut self, ledger: &mut DiscardLedger) -> usize {
        if self.is_dirty() {
            self.rollback();
        }
        let mut evicted = 0;
        for (_, id) in self.previous.drain() {
            if let Some(handle) = self.arena.release(id) {
                if let Some(remote) = handle.remote_id() {
                    ledger.add(remote);
                }
                evicted += 1;
            }
        }
        evicted
    }

    /// Returns both generations as sorted `(key, handle)` lists, for
    /// structural comparison.
    #[must_use]
    pub fn generations(&self) -> (Vec<(ItemKey, ResourceHandle)>, Vec<(ItemKey, ResourceHandle)>) {
        (self.collect(&self.current), self.collect(&self.previous))
    }

    fn collect(&self, map: &HashMap<ItemKey, HandleId>) -> Vec<(ItemKey, ResourceHandle)> {
        let mut out: Vec<_> = map
            .iter()
            .filter_map(|(key, id)| self.arena.get(*id).map(|h| (*key, h.clone())))
            .collect();
        out.sort_by_key(|(key, _)| *key);
        out
    }

    fn kind_of(&self, id: HandleId) -> Option<ResourceKind> {
        self.arena.get(id).map(ResourceHandle::kind)
    }

    fn release_into(&mut self, id: HandleId, ledger: &mut DiscardLedger) -> bool {
        match self.arena.release(id) {
            Some(handle) => {
                if let Some(remote) = handle.remote_id() {
                    ledger.add(remote);
                }
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::ResourceUpdate;
    use crate::handle::{ImageBinding, UpdateForSource};
    use crate::item::FrameId;
    use crate::resource::{IdNamespace, RemoteId, SequentialAllocator};
    use crate::source::{ImageDescriptor, ImageFormat, ImageSource, ImageSourceId};

    const DESC: ImageDescriptor = ImageDescriptor::new(8, 8, ImageFormat::Rgba8);

    fn key(frame: u64) -> ItemKey {
        ItemKey::new(FrameId(frame), 0)
    }

    fn upload(
        cache: &mut ItemResourceCache,
        alloc: &mut SequentialAllocator,
        id: HandleId,
        src: u64,
    ) -> ImageBinding {
        let mut updates: Vec<ResourceUpdate> = Vec::new();
        let source = ImageSource::buffer(ImageSourceId(src), 1, DESC);
        cache
            .handle_mut(id)
            .and_then(ResourceHandle::as_image_mut)
            .and_then(|img| img.update_for_source(&source, alloc, &mut updates))
            .expect("source is ready")
    }

    #[test]
    fn requery_returns_same_handle() {
        let mut cache = ItemResourceCache::new();
        let (a, first) = cache.get_or_create(key(1), ResourceKind::Image);
        let (b, second) = cache.get_or_create(key(1), ResourceKind::Image);
        assert_eq!(a, b);
        assert_eq!(first, CacheLookup::Created);
        assert_eq!(second, CacheLookup::Hit);
    }

    #[test]
    fn composite_key_has_no_partial_matches() {
        let mut cache = ItemResourceCache::new();
        let (a, _) = cache.get_or_create(ItemKey::new(FrameId(1), 0), ResourceKind::Image);
        let (b, _) = cache.get_or_create(ItemKey::new(FrameId(1), 1), ResourceKind::Image);
        let (c, _) = cache.get_or_create(ItemKey::new(FrameId(0), 1), ResourceKind::Image);
        assert_ne!(a, b);
        assert_ne!(b, c);
    }

    #[test]
    fn recycle_across_transactions() {
        let mut cache = ItemResourceCache::new();
        let mut ledger = DiscardLedger::new();
        let mut alloc = SequentialAllocator::new(IdNamespace(0));

        let (id, _) = cache.get_or_create(key(1), ResourceKind::Image);
        let before = upload(&mut cache, &mut alloc, id, 1);
        assert_eq!(cache.end_transaction(&mut ledger), 0);
        assert_eq!(cache.current_len(), 0);
        assert_eq!(cache.previous_len(), 1);

        let (again, how) = cache.get_or_create(key(1), ResourceKind::Image);
        assert_eq!(how, CacheLookup::Recycled);
        assert_eq!(again, id);
        assert_eq!(upload(&mut cache, &mut alloc, again, 1), before);
        assert!(cache.previous(key(1)).is_none(), "moved out of previous");
    }

    #[test]
    fn unrecycled_entries_are_evicted_once() {
        let mut cache = ItemResourceCache::new();
        let mut ledger = DiscardLedger::new();
        let mut alloc = SequentialAllocator::new(IdNamespace(0));

        let (a, _) = cache.get_or_create(key(1), ResourceKind::Image);
        let (b, _) = cache.get_or_create(key(2), ResourceKind::Image);
        upload(&mut cache, &mut alloc, a, 1);
        let ImageBinding::Image(b_key) = upload(&mut cache, &mut alloc, b, 2) else {
            panic!("buffer source binds an image key");
        };
        cache.end_transaction(&mut ledger);

        cache.get_or_create(key(1), ResourceKind::Image);
        assert_eq!(cache.end_transaction(&mut ledger), 1);
        assert_eq!(ledger.pending().images, [b_key]);
        assert_eq!(cache.live_handles(), 1);

        ledger.clear();
        cache.get_or_create(key(1), ResourceKind::Image);
        assert_eq!(cache.end_transaction(&mut ledger), 0);
        assert!(ledger.is_empty(), "evicted only once");
    }

    #[test]
    fn kind_change_is_a_miss() {
        let mut cache = ItemResourceCache::new();
        let mut ledger = DiscardLedger::new();
        let mut alloc = SequentialAllocator::new(IdNamespace(0));

        let (img, _) = cache.get_or_create(key(1), ResourceKind::Image);
        let ImageBinding::Image(img_key) = upload(&mut cache, &mut alloc, img, 1) else {
            panic!("buffer source binds an image key");
        };
        cache.end_transaction(&mut ledger);

        let (anim, how) = cache.get_or_create(key(1), ResourceKind::Animation);
        assert_eq!(how, CacheLookup::Created);
        assert_ne!(anim, img);
        assert_eq!(cache.previous(key(1)), Some(img), "stale handle awaits eviction");

        cache.end_transaction(&mut ledger);
        assert!(ledger.contains(RemoteId::Image(img_key)));
    }

    #[test]
    fn kind_change_within_transaction_displaces() {
        let mut cache = ItemResourceCache::new();
        let mut ledger = DiscardLedger::new();
        let mut alloc = SequentialAllocator::new(IdNamespace(0));

        let (img, _) = cache.get_or_create(key(1), ResourceKind::Image);
        let ImageBinding::Image(img_key) = upload(&mut cache, &mut alloc, img, 1) else {
            panic!("buffer source binds an image key");
        };
        let (anim, _) = cache.get_or_create(key(1), ResourceKind::Animation);
        assert_eq!(cache.current(key(1)), Some(anim));
        assert!(ledger.is_empty(), "nothing released before commit");

        assert_eq!(cache.end_transaction(&mut ledger), 1);
        assert_eq!(ledger.pending().images, [img_key]);
    }

    #[test]
    fn rollback_restores_generations() {
        let mut cache = ItemResourceCache::new();
        let mut ledger = DiscardLedger::new();
        let mut alloc = SequentialAllocator::new(IdNamespace(0));

        let (a, _) = cache.get_or_create(key(1), ResourceKind::Image);
        let (b, _) = cache.get_or_create(key(2), ResourceKind::Image);
        upload(&mut cache, &mut alloc, a, 1);
        upload(&mut cache, &mut alloc, b, 2);
        cache.end_transaction(&mut ledger);
        let before = cache.generations();

        // Recycle and mutate A, create C, then abandon.
        let (a2, _) = cache.get_or_create(key(1), ResourceKind::Image);
        upload(&mut cache, &mut alloc, a2, 7);
        let (c, _) = cache.get_or_create(key(3), ResourceKind::Image);
        let ImageBinding::Image(c_key) = upload(&mut cache, &mut alloc, c, 3) else {
            panic!("buffer source binds an image key");
        };
        cache.rollback();

        assert_eq!(cache.generations(), before);
        assert_eq!(cache.live_handles(), 2);
        assert!(ledger.is_empty(), "fresh key {c_key:?} was never announced");
    }

    #[test]
    fn rollback_after_displacing_recycled_handle() {
        let mut cache = ItemResourceCache::new();
        let mut ledger = DiscardLedger::new();
        let mut alloc = SequentialAllocator::new(IdNamespace(0));

        let (a, _) = cache.get_or_create(key(1), ResourceKind::Image);
        upload(&mut cache, &mut alloc, a, 1);
        cache.end_transaction(&mut ledger);
        let before = cache.generations();

        cache.get_or_create(key(1), ResourceKind::Image);
        cache.get_or_create(key(1), ResourceKind::Animation);
        cache.rollback();

        assert_eq!(cache.generations(), before);
        assert!(ledger.is_empty());
        assert_eq!(cache.previous(key(1)), Some(a));
    }

    #[test]
    fn evict_all_releases_everything() {
        let mut cache = ItemResourceCache::new();
        let mut ledger = DiscardLedger::new();
        let mut alloc = SequentialAllocator::new(IdNamespace(0));

        let (a, _) = cache.get_or_create(key(1), ResourceKind::Image);
        upload(&mut cache, &mut alloc, a, 1);
        cache.end_transaction(&mut ledger);
        let (b, _) = cache.get_or_create(key(2), ResourceKind::Image);
        upload(&mut cache, &mut alloc, b, 2);

        // B was never committed; only A reached the remote side.
        assert_eq!(cache.evict_all(&mut ledger), 1);
        assert_eq!(cache.live_handles(), 0);
        assert_eq!(ledger.len(), 1);
    }
}
