// Copyright 2026 the Carryover Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Pending discards.
//!
//! [`DiscardLedger`] collects remote identifiers that are no longer
//! referenced. It is decoupled from cache rotation: identifiers only leave
//! the ledger after a [`DiscardBatch`] carrying them was accepted by the
//! [`RemoteChannel`]. An identifier is recorded at most once between flushes.

use alloc::vec::Vec;

use hashbrown::HashSet;

use crate::channel::{ChannelError, RemoteChannel};
use crate::resource::{AnimationId, ImageKey, PipelineId, RemoteId};

/// A discard message for the remote process.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DiscardBatch {
    /// Images to delete.
    pub images: Vec<ImageKey>,
    /// Animations to drop.
    pub animations: Vec<AnimationId>,
    /// Pipelines to remove.
    pub pipelines: Vec<PipelineId>,
}

impl DiscardBatch {
    /// Total number of identifiers in the batch.
    #[must_use]
    pub fn len(&self) -> usize {
        self.images.len() + self.animations.len() + self.pipelines.len()
    }

    /// Returns `true` if the batch carries nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterates over all identifiers, images first.
    pub fn iter(&self) -> impl Iterator<Item = RemoteId> + '_ {
        self.images
            .iter()
            .copied()
            .map(RemoteId::Image)
            .chain(self.animations.iter().copied().map(RemoteId::Animation))
            .chain(self.pipelines.iter().copied().map(RemoteId::Pipeline))
    }
}

/// Ordered, de-duplicated set of identifiers awaiting discard.
#[derive(Debug, Default)]
pub struct DiscardLedger {
    pending: DiscardBatch,
    seen: HashSet<RemoteId>,
}

impl DiscardLedger {
    /// Creates an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty ledger with room for `capacity` identifiers.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            pending: DiscardBatch {
                images: Vec::with_capacity(capacity),
                animations: Vec::new(),
                pipelines: Vec::new(),
            },
            seen: HashSet::with_capacity(capacity),
        }
    }

    /// Records `id` for discard.
    ///
    /// Returns `false` if it is already pending.
    pub fn add(&mut self, id: RemoteId) -> bool {
        if !self.seen.insert(id) {
            return false;
        }
        match id {
            RemoteId::Image(key) => self.pending.images.push(key),
            RemoteId::Animation(animation) => self.pending.animations.push(animation),
            RemoteId::Pipeline(pipeline) => self.pending.pipelines.push(pipeline),
        }
        true
    }

    /// Records an image key for discard.
    pub fn add_image(&mut self, key: ImageKey) -> bool {
        self.add(RemoteId::Image(key))
    }

    /// Records an animation id for discard.
    pub fn add_animation(&mut self, animation: AnimationId) -> bool {
        self.add(RemoteId::Animation(animation))
    }

    /// Returns whether `id` is pending.
    #[must_use]
    pub fn contains(&self, id: RemoteId) -> bool {
        self.seen.contains(&id)
    }

    /// Returns the pending identifiers.
    #[must_use]
    pub fn pending(&self) -> &DiscardBatch {
        &self.pending
    }

    /// Number of pending identifiers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    /// Returns `true` if nothing is pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }

    /// Sends all pending identifiers as one batch.
    ///
    /// The ledger is cleared only if the channel accepts the batch; on error
    /// everything stays pending for the next flush. Returns the number of
    /// identifiers sent. An empty ledger sends nothing.
    pub fn flush<C: RemoteChannel + ?Sized>(&mut self, channel: &mut C) -> Result<usize, ChannelError> {
        if self.is_empty() {
            return Ok(0);
        }
        channel.send_discards(&self.pending)?;
        let sent = self.len();
        self.clear();
        Ok(sent)
    }

    /// Drops every pending identifier without sending.
    ///
    /// Only correct when the remote side is already gone.
    pub fn clear(&mut self) {
        self.pending.images.clear();
        self.pending.animations.clear();
        self.pending.pipelines.clear();
        self.seen.clear();
    }
}
