// Copyright 2026 the Carryover Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-item resource handles.
//!
//! A handle owns at most one remote identifier plus the client-side state
//! needed to decide whether the remote resource is stale. Handles come in a
//! finite set of kinds, modelled as the [`ResourceHandle`] sum type; each kind
//! implements [`UpdateForSource`] for its own source type.
//!
//! Handles never release anything on drop. When the cache evicts a handle,
//! its identifier is moved into the
//! [`DiscardLedger`](crate::ledger::DiscardLedger) explicitly.
//!
//! Handles live in a [`HandleArena`] and are addressed by generational
//! [`HandleId`]s, so both cache generations can refer to the same handle
//! without shared pointers.

mod animation;
mod arena;
mod image;

use alloc::vec::Vec;

pub use animation::AnimationData;
pub use arena::{HandleArena, HandleId};
pub use image::{ImageBinding, ImageData};

use crate::command::ResourceUpdate;
use crate::resource::{RemoteId, ResourceAllocator};

/// The kinds of resource a display item can require.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    /// An image (buffer-backed or externally composited).
    Image,
    /// A compositor animation.
    Animation,
}

/// Brings a handle's remote resource in line with its source.
pub trait UpdateForSource {
    /// Source type consumed by this handle kind.
    type Source;
    /// What a successful update yields for the draw command.
    type Binding;

    /// Updates the handle for `source`.
    ///
    /// Resource mutations are appended to `updates` (the command buffer's
    /// side-table). Returns `None` when the source cannot produce content
    /// right now; in that case the handle is left unchanged and the caller
    /// skips the item for this transaction.
    fn update_for_source<A: ResourceAllocator + ?Sized>(
        &mut self,
        source: &Self::Source,
        allocator: &mut A,
        updates: &mut Vec<ResourceUpdate>,
    ) -> Option<Self::Binding>;
}

/// A resource handle of any kind.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ResourceHandle {
    /// Image handle.
    Image(ImageData),
    /// Animation handle.
    Animation(AnimationData),
}

impl ResourceHandle {
    /// Creates an empty handle of the given kind.
    #[must_use]
    pub fn new(kind: ResourceKind) -> Self {
        match kind {
            ResourceKind::Image => Self::Image(ImageData::default()),
            ResourceKind::Animation => Self::Animation(AnimationData::default()),
        }
    }

    /// Returns this handle's kind.
    #[must_use]
    pub const fn kind(&self) -> ResourceKind {
        match self {
            Self::Image(_) => ResourceKind::Image,
            Self::Animation(_) => ResourceKind::Animation,
        }
    }

    /// Returns the remote identifier this handle currently owns.
    #[must_use]
    pub fn remote_id(&self) -> Option<RemoteId> {
        match self {
            Self::Image(data) => data.binding().map(ImageBinding::remote_id),
            Self::Animation(data) => data.animation().map(RemoteId::Animation),
        }
    }

    /// Returns the image data, if this is an image handle.
    #[must_use]
    pub fn as_image(&self) -> Option<&ImageData> {
        match self {
            Self::Image(data) => Some(data),
            Self::Animation(_) => None,
        }
    }

    /// Returns the image data mutably, if this is an image handle.
    pub fn as_image_mut(&mut self) -> Option<&mut ImageData> {
        match self {
            Self::Image(data) => Some(data),
            Self::Animation(_) => None,
        }
    }

    /// Returns the animation data, if this is an animation handle.
    #[must_use]
    pub fn as_animation(&self) -> Option<&AnimationData> {
        match self {
            Self::Animation(data) => Some(data),
            Self::Image(_) => None,
        }
    }

    /// Returns the animation data mutably, if this is an animation handle.
    pub fn as_animation_mut(&mut self) -> Option<&mut AnimationData> {
        match self {
            Self::Animation(data) => Some(data),
            Self::Image(_) => None,
        }
    }
}
