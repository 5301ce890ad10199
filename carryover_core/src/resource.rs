// Copyright 2026 the Carryover Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Remote resource identifiers and their allocator.
//!
//! Every identifier here names something owned by the remote rendering
//! process. Core code never interprets the values; it only tracks which
//! identifiers are still referenced so that the rest can be discarded.
//!
//! Identifiers are partitioned by [`IdNamespace`] so that several clients of
//! one remote process can allocate without coordinating.

use core::fmt;

/// A per-client partition of the remote identifier space.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct IdNamespace(pub u32);

impl fmt::Debug for IdNamespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "IdNamespace({})", self.0)
    }
}

/// Names an image uploaded to the remote process.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ImageKey {
    /// Allocating client.
    pub namespace: IdNamespace,
    /// Client-local resource index.
    pub resource: u32,
}

impl fmt::Debug for ImageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ImageKey({}:{})", self.namespace.0, self.resource)
    }
}

/// Names a compositor-side animation.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AnimationId(pub u64);

impl fmt::Debug for AnimationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AnimationId({:#x})", self.0)
    }
}

/// Names an externally composited content pipeline (async images, video).
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PipelineId {
    /// Allocating client.
    pub namespace: IdNamespace,
    /// Client-local pipeline index.
    pub index: u32,
}

impl fmt::Debug for PipelineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PipelineId({}:{})", self.namespace.0, self.index)
    }
}

/// Any remote identifier, as tracked by the discard ledger.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RemoteId {
    /// An uploaded image.
    Image(ImageKey),
    /// A compositor animation.
    Animation(AnimationId),
    /// An externally composited pipeline.
    Pipeline(PipelineId),
}

/// Hands out fresh remote identifiers.
///
/// Returned identifiers stay valid until they appear in a discard batch sent
/// over the [`RemoteChannel`](crate::channel::RemoteChannel). Implementations
/// must never return the same identifier twice.
pub trait ResourceAllocator {
    /// Allocates a new image key.
    fn image_key(&mut self) -> ImageKey;

    /// Allocates a new animation id.
    fn animation_id(&mut self) -> AnimationId;

    /// Allocates a new pipeline id.
    fn pipeline_id(&mut self) -> PipelineId;
}

/// Monotonic allocator over a single [`IdNamespace`].
///
/// Animation ids carry the namespace in their upper 32 bits, matching how the
/// remote process keys animations across clients.
#[derive(Clone, Debug)]
pub struct SequentialAllocator {
    namespace: IdNamespace,
    next_image: u32,
    next_animation: u32,
    next_pipeline: u32,
}

impl SequentialAllocator {
    /// Creates an allocator for the given namespace. Counters start at 1.
    #[must_use]
    pub const fn new(namespace: IdNamespace) -> Self {
        Self {
            namespace,
            next_image: 1,
            next_animation: 1,
            next_pipeline: 1,
        }
    }

    /// Returns the namespace this allocator draws from.
    #[must_use]
    pub const fn namespace(&self) -> IdNamespace {
        self.namespace
    }
}

impl ResourceAllocator for SequentialAllocator {
    fn image_key(&mut self) -> ImageKey {
        let key = ImageKey {
            namespace: self.namespace,
            resource: self.next_image,
        };
        self.next_image = self.next_image.wrapping_add(1);
        key
    }

    fn animation_id(&mut self) -> AnimationId {
        let id = AnimationId((u64::from(self.namespace.0) << 32) | u64::from(self.next_animation));
        self.next_animation = self.next_animation.wrapping_add(1);
        id
    }

    fn pipeline_id(&mut self) -> PipelineId {
        let id = PipelineId {
            namespace: self.namespace,
            index: self.next_pipeline,
        };
        self.next_pipeline = self.next_pipeline.wrapping_add(1);
        id
    }
}
