// Copyright 2026 the Carryover Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Command buffers: the ordered draw list for one transaction plus the
//! resource side-table the remote process applies before drawing.

use core::fmt;

use alloc::vec::Vec;

use hashbrown::HashSet;
use kurbo::Rect;

use crate::item::{FrameId, ImageRendering, ItemKey};
use crate::resource::{AnimationId, ImageKey, PipelineId};
use crate::source::{AnimatedProperty, ImageDescriptor, ImageSourceId};

/// Identifies one transaction sent to the remote process.
///
/// Allocated in increasing order by the coordinator, starting at 1.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct TransactionId(pub u64);

impl TransactionId {
    /// Returns the following id.
    #[inline]
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Debug for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TransactionId({})", self.0)
    }
}

/// What a single draw command does.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum DrawOp {
    /// Solid fill.
    Solid {
        /// Premultiplied RGBA.
        color: [f32; 4],
    },
    /// Draw an uploaded image.
    Image {
        /// Remote image.
        key: ImageKey,
        /// Sampling filter.
        rendering: ImageRendering,
    },
    /// Embed an externally composited pipeline.
    Pipeline {
        /// Remote pipeline.
        pipeline: PipelineId,
        /// Sampling filter.
        rendering: ImageRendering,
    },
    /// Solid fill with a compositor-driven property.
    Animated {
        /// Remote animation.
        animation: AnimationId,
        /// Animated property.
        property: AnimatedProperty,
        /// Premultiplied RGBA.
        color: [f32; 4],
    },
}

impl DrawOp {
    /// Returns the image key this command references, if any.
    #[must_use]
    pub const fn image_key(&self) -> Option<ImageKey> {
        match self {
            Self::Image { key, .. } => Some(*key),
            _ => None,
        }
    }
}

/// A single draw command.
///
/// Commands are kept in producer order, which is paint order.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DrawCommand {
    /// The item this command originates from.
    pub item: ItemKey,
    /// Bounds in layer space.
    pub bounds: Rect,
    /// Operation.
    pub op: DrawOp,
}

/// A resource mutation the remote process applies before drawing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ResourceUpdate {
    /// Create an image under a fresh key.
    AddImage {
        /// New key.
        key: ImageKey,
        /// Size and format.
        descriptor: ImageDescriptor,
        /// Producer.
        source: ImageSourceId,
        /// Content generation uploaded.
        generation: u64,
    },
    /// Replace the pixels behind an existing key.
    UpdateImage {
        /// Existing key.
        key: ImageKey,
        /// Size and format.
        descriptor: ImageDescriptor,
        /// Producer.
        source: ImageSourceId,
        /// Content generation uploaded.
        generation: u64,
    },
    /// Delete an image whose handle switched delivery category.
    DeleteImage {
        /// Key to delete.
        key: ImageKey,
    },
    /// Connect a pipeline to an externally composited producer.
    AddPipeline {
        /// New pipeline.
        pipeline: PipelineId,
        /// Producer.
        source: ImageSourceId,
    },
    /// Point an existing pipeline at new producer content.
    UpdatePipeline {
        /// Existing pipeline.
        pipeline: PipelineId,
        /// Producer.
        source: ImageSourceId,
        /// Content generation.
        generation: u64,
    },
    /// Remove a pipeline whose handle switched delivery category.
    RemovePipeline {
        /// Pipeline to remove.
        pipeline: PipelineId,
    },
    /// Install or replace compositor animation keyframes.
    SetAnimation {
        /// Animation.
        animation: AnimationId,
        /// Animated property.
        property: AnimatedProperty,
        /// Keyframe generation.
        generation: u64,
    },
}

/// The message sent to the remote process for one transaction.
#[derive(Clone, Debug, Default)]
pub struct CommandBuffer {
    /// Transaction this buffer belongs to.
    pub transaction: TransactionId,
    /// Whether this is the first paint of the scene.
    pub first_paint: bool,
    /// Resource side-table, applied before `commands`.
    pub resources: Vec<ResourceUpdate>,
    /// Draw commands in paint order.
    pub commands: Vec<DrawCommand>,
    /// Frames with at least one item in the transaction, emitted or skipped.
    pub participants: HashSet<FrameId>,
}

impl CommandBuffer {
    /// Creates an empty buffer for the given transaction.
    #[must_use]
    pub fn new(transaction: TransactionId) -> Self {
        Self {
            transaction,
            ..Self::default()
        }
    }

    /// Creates an empty buffer with room for `capacity` commands.
    #[must_use]
    pub fn with_capacity(transaction: TransactionId, capacity: usize) -> Self {
        Self {
            transaction,
            commands: Vec::with_capacity(capacity),
            ..Self::default()
        }
    }

    /// Appends a draw command.
    pub fn push(&mut self, command: DrawCommand) {
        self.participants.insert(command.item.frame);
        self.commands.push(command);
    }

    /// Records `frame` as taking part without emitting a command.
    ///
    /// A skipped item still ties the buffer to its frame: once that frame
    /// mutates, the buffer must not be replayed.
    pub fn add_participant(&mut self, frame: FrameId) {
        self.participants.insert(frame);
    }

    /// Returns `true` if any of the given frames contributed to this buffer.
    #[must_use]
    pub fn involves_any<'a>(&self, mut frames: impl Iterator<Item = &'a FrameId>) -> bool {
        frames.any(|frame| self.participants.contains(frame))
    }

    /// Returns a copy suitable for re-sending under a new transaction id.
    ///
    /// The resource side-table is omitted because the remote process already
    /// applied it.
    #[must_use]
    pub fn replay(&self, transaction: TransactionId) -> Self {
        Self {
            transaction,
            first_paint: false,
            resources: Vec::new(),
            commands: self.commands.clone(),
            participants: self.participants.clone(),
        }
    }
}
