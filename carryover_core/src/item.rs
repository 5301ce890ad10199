// Copyright 2026 the Carryover Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Display items and their identity.
//!
//! A display item is one paintable unit produced by the layout pass. Its
//! [`ItemKey`] pairs the owning frame (layout node) with a small per-frame
//! disambiguator. Keys are *not* content-addressed: the same key across two
//! transactions is assumed to be the same logical item even if its content
//! changed.

use core::fmt;

use kurbo::Rect;

use crate::handle::ResourceKind;
use crate::source::{AnimationSource, ImageSource};

/// Stable identity of a layout node across frames.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FrameId(pub u64);

impl fmt::Debug for FrameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FrameId({})", self.0)
    }
}

/// Composite identity of a display item.
///
/// Hashing and equality cover both fields; there are no partial matches.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ItemKey {
    /// Owning layout node.
    pub frame: FrameId,
    /// Disambiguator for several items painted by one node.
    pub per_frame_key: u32,
}

impl ItemKey {
    /// Creates a key.
    #[inline]
    #[must_use]
    pub const fn new(frame: FrameId, per_frame_key: u32) -> Self {
        Self {
            frame,
            per_frame_key,
        }
    }
}

impl fmt::Debug for ItemKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ItemKey({}/{})", self.frame.0, self.per_frame_key)
    }
}

/// Image sampling filter.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ImageRendering {
    /// Bilinear filtering.
    #[default]
    Auto,
    /// Preserve hard edges when scaling.
    CrispEdges,
    /// Nearest-neighbour sampling.
    Pixelated,
}

/// Kind-specific payload of a display item.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ItemContent {
    /// A solid fill. Needs no remote resource.
    Solid {
        /// Premultiplied RGBA.
        color: [f32; 4],
    },
    /// An image.
    Image {
        /// Where the pixels come from.
        source: ImageSource,
        /// Sampling filter.
        rendering: ImageRendering,
    },
    /// A fill whose property is animated on the compositor.
    Animated {
        /// The animation.
        source: AnimationSource,
        /// Premultiplied RGBA.
        color: [f32; 4],
    },
}

impl ItemContent {
    /// Returns the resource kind this content needs, if any.
    #[must_use]
    pub const fn resource_kind(&self) -> Option<ResourceKind> {
        match self {
            Self::Solid { .. } => None,
            Self::Image { .. } => Some(ResourceKind::Image),
            Self::Animated { .. } => Some(ResourceKind::Animation),
        }
    }
}

/// One paintable unit for a single transaction.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DisplayItem {
    /// Identity.
    pub key: ItemKey,
    /// Bounds in layer space.
    pub bounds: Rect,
    /// Payload.
    pub content: ItemContent,
}

impl DisplayItem {
    /// Creates an item.
    #[must_use]
    pub const fn new(key: ItemKey, bounds: Rect, content: ItemContent) -> Self {
        Self {
            key,
            bounds,
            content,
        }
    }
}

/// Supplies one transaction's worth of display items.
///
/// Implemented by the paint system; see
/// [`TransactionCoordinator::paint`](crate::coordinator::TransactionCoordinator::paint).
pub trait DisplayListProducer {
    /// Items in paint order (back to front).
    fn items(&self) -> &[DisplayItem];

    /// Frames whose visual state changed since the last paint.
    fn mutated_frames(&self) -> &[FrameId];

    /// Returns `true` if the display list must be rebuilt.
    ///
    /// When `false`, the coordinator attempts an empty transaction first.
    fn has_changes(&self) -> bool;
}
