// Copyright 2026 the Carryover Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Reference-counted slot storage for resource handles.

use core::fmt;

use alloc::vec::Vec;

use super::ResourceHandle;

/// A handle to a slot in a [`HandleArena`].
///
/// Contains both a slot index and a generation counter so that stale ids can
/// be detected after a slot is freed and reused.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandleId {
    pub(crate) idx: u32,
    pub(crate) generation: u32,
}

impl HandleId {
    /// Returns the raw slot index (for diagnostics only).
    #[inline]
    #[must_use]
    pub const fn index(self) -> u32 {
        self.idx
    }

    /// Returns the generation counter.
    #[inline]
    #[must_use]
    pub const fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Debug for HandleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HandleId({}@gen{})", self.idx, self.generation)
    }
}

#[derive(Debug)]
struct Slot {
    generation: u32,
    refs: u32,
    handle: Option<ResourceHandle>,
}

/// Slot storage for [`ResourceHandle`]s with explicit reference counts.
///
/// Every map or list that stores a [`HandleId`] holds one reference. A slot is
/// freed, and its handle returned to the caller, only when the last reference
/// is released. Freed slots are recycled through a free list; their
/// generation is bumped so old ids fail lookup.
#[derive(Debug, Default)]
pub struct HandleArena {
    slots: Vec<Slot>,
    free_list: Vec<u32>,
    live: usize,
}

impl HandleArena {
    /// Creates an empty arena.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `handle` with a reference count of one.
    pub fn insert(&mut self, handle: ResourceHandle) -> HandleId {
        self.live += 1;
        if let Some(idx) = self.free_list.pop() {
            let slot = &mut self.slots[idx as usize];
            slot.refs = 1;
            slot.handle = Some(handle);
            HandleId {
                idx,
                generation: slot.generation,
            }
        } else {
            #[expect(
                clippy::cast_possible_truncation,
                reason = "more than u32::MAX live handles is not supported"
            )]
            let idx = self.slots.len() as u32;
            self.slots.push(Slot {
                generation: 0,
                refs: 1,
                handle: Some(handle),
            });
            HandleId { idx, generation: 0 }
        }
    }

    /// Adds a reference to a live handle.
    ///
    /// Returns `false` (and does nothing) if `id` is stale.
    pub fn retain(&mut self, id: HandleId) -> bool {
        match self.slot_mut(id) {
            Some(slot) => {
                slot.refs += 1;
                true
            }
            None => false,
        }
    }

    /// Drops a reference.
    ///
    /// Returns the handle if this was the last reference; the slot is freed.
    /// Returns `None` if references remain or `id` is stale.
    pub fn release(&mut self, id: HandleId) -> Option<ResourceHandle> {
        let slot = self.slot_mut(id)?;
        slot.refs -= 1;
        if slot.refs > 0 {
            return None;
        }
        let handle = slot.handle.take();
        slot.generation = slot.generation.wrapping_add(1);
        self.free_list.push(id.idx);
        self.live -= 1;
        handle
    }

    /// Returns the handle behind `id`, if live.
    #[must_use]
    pub fn get(&self, id: HandleId) -> Option<&ResourceHandle> {
        self.slots
            .get(id.idx as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.handle.as_ref())
    }

    /// Returns the handle behind `id` mutably, if live.
    pub fn get_mut(&mut self, id: HandleId) -> Option<&mut ResourceHandle> {
        self.slot_mut(id).and_then(|slot| slot.handle.as_mut())
    }

    /// Returns the current reference count of `id` (zero if stale).
    #[must_use]
    pub fn ref_count(&self, id: HandleId) -> u32 {
        self.slots
            .get(id.idx as usize)
            .filter(|slot| slot.generation == id.generation && slot.handle.is_some())
            .map_or(0, |slot| slot.refs)
    }

    /// Returns whether `id` refers to a live handle.
    #[must_use]
    pub fn is_alive(&self, id: HandleId) -> bool {
        self.get(id).is_some()
    }

    /// Number of live handles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.live
    }

    /// Returns `true` if no handles are live.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    fn slot_mut(&mut self, id: HandleId) -> Option<&mut Slot> {
        self.slots
            .get_mut(id.idx as usize)
            .filter(|slot| slot.generation == id.generation && slot.handle.is_some())
    }
}
