// Copyright 2026 the Carryover Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A model of the remote process's resource tables.
//!
//! [`RemoteMirror`] applies command buffers and discard batches the way the
//! remote compositor would, and records a [`Violation`] for every message
//! that could not be applied cleanly. A run with no violations and an empty
//! [`unreferenced`](RemoteMirror::unreferenced) set after the final flush
//! neither leaked nor double-freed anything.

use alloc::vec::Vec;

use hashbrown::{HashMap, HashSet};

use carryover_core::command::{CommandBuffer, DrawCommand, DrawOp, ResourceUpdate, TransactionId};
use carryover_core::ledger::DiscardBatch;
use carryover_core::resource::{AnimationId, ImageKey, PipelineId, RemoteId};
use carryover_core::source::{AnimatedProperty, ImageDescriptor, ImageSourceId};

use crate::channel::Message;

/// Something the remote process would have rejected or leaked.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Violation {
    /// A resource was added under an identifier that is already live.
    DuplicateAdd(RemoteId),
    /// A resource was added under an identifier that was already discarded.
    ReusedId(RemoteId),
    /// An update or delete named an identifier that is not live.
    UnknownResource(RemoteId),
    /// A draw command referenced an identifier that is not live.
    DanglingReference {
        /// Transaction carrying the command.
        transaction: TransactionId,
        /// The missing identifier.
        id: RemoteId,
    },
    /// A discard named an identifier that is not live.
    UnknownDiscard(RemoteId),
    /// Transaction ids did not increase.
    OutOfOrder {
        /// Last applied transaction.
        previous: TransactionId,
        /// Offending transaction.
        got: TransactionId,
    },
}

/// Remote-side record of an uploaded image.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ImageRecord {
    /// Producer.
    pub source: ImageSourceId,
    /// Content generation.
    pub generation: u64,
    /// Size and format.
    pub descriptor: ImageDescriptor,
    /// Number of `UpdateImage` messages applied.
    pub updates: u32,
}

/// Remote-side record of an animation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AnimationRecord {
    /// Animated property.
    pub property: AnimatedProperty,
    /// Keyframe generation.
    pub generation: u64,
}

/// Replays messages against remote resource tables.
#[derive(Debug, Default)]
pub struct RemoteMirror {
    images: HashMap<ImageKey, ImageRecord>,
    pipelines: HashMap<PipelineId, ImageSourceId>,
    animations: HashMap<AnimationId, AnimationRecord>,
    retired: HashSet<RemoteId>,
    display_list: Vec<DrawCommand>,
    last_transaction: Option<TransactionId>,
    first_paints: u32,
    violations: Vec<Violation>,
}

impl RemoteMirror {
    /// Creates an empty mirror.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies every message in order.
    pub fn replay<'a>(&mut self, messages: impl IntoIterator<Item = &'a Message>) {
        for message in messages {
            self.apply(message);
        }
    }

    /// Applies one message.
    pub fn apply(&mut self, message: &Message) {
        match message {
            Message::Commands(buffer) => self.apply_commands(buffer),
            Message::Discards(batch) => self.apply_discards(batch),
        }
    }

    /// Applies a command buffer: resource updates first, then the display
    /// list replaces the previous one.
    pub fn apply_commands(&mut self, buffer: &CommandBuffer) {
        if let Some(previous) = self.last_transaction
            && buffer.transaction <= previous
        {
            self.violations.push(Violation::OutOfOrder {
                previous,
                got: buffer.transaction,
            });
        }
        self.last_transaction = Some(buffer.transaction);
        self.first_paints += u32::from(buffer.first_paint);

        for update in &buffer.resources {
            self.apply_update(*update);
        }

        for command in &buffer.commands {
            if let Some(id) = referenced(&command.op)
                && !self.is_live(id)
            {
                self.violations.push(Violation::DanglingReference {
                    transaction: buffer.transaction,
                    id,
                });
            }
        }
        self.display_list.clone_from(&buffer.commands);
    }

    /// Applies a discard batch.
    pub fn apply_discards(&mut self, batch: &DiscardBatch) {
        for id in batch.iter() {
            if self.remove(id) {
                self.retired.insert(id);
            } else {
                self.violations.push(Violation::UnknownDiscard(id));
            }
        }
    }

    /// Violations recorded so far.
    #[must_use]
    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    /// Returns `true` if no violation was recorded.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.violations.is_empty()
    }

    /// The display list from the last applied command buffer.
    #[must_use]
    pub fn display_list(&self) -> &[DrawCommand] {
        &self.display_list
    }

    /// The last applied transaction.
    #[must_use]
    pub fn last_transaction(&self) -> Option<TransactionId> {
        self.last_transaction
    }

    /// Number of command buffers flagged as first paint.
    #[must_use]
    pub fn first_paints(&self) -> u32 {
        self.first_paints
    }

    /// The live image behind `key`.
    #[must_use]
    pub fn image(&self, key: ImageKey) -> Option<&ImageRecord> {
        self.images.get(&key)
    }

    /// The live animation behind `id`.
    #[must_use]
    pub fn animation(&self, id: AnimationId) -> Option<&AnimationRecord> {
        self.animations.get(&id)
    }

    /// The producer connected to a live pipeline.
    #[must_use]
    pub fn pipeline(&self, pipeline: PipelineId) -> Option<ImageSourceId> {
        self.pipelines.get(&pipeline).copied()
    }

    /// Number of live remote resources.
    #[must_use]
    pub fn live_count(&self) -> usize {
        self.images.len() + self.pipelines.len() + self.animations.len()
    }

    /// Returns whether `id` has been discarded.
    #[must_use]
    pub fn is_retired(&self, id: RemoteId) -> bool {
        self.retired.contains(&id)
    }

    /// Live identifiers the current display list does not reference, sorted.
    #[must_use]
    pub fn unreferenced(&self) -> Vec<RemoteId> {
        let referenced: HashSet<RemoteId> =
            self.display_list.iter().filter_map(|c| referenced(&c.op)).collect();
        let mut out: Vec<RemoteId> = self
            .images
            .keys()
            .copied()
            .map(RemoteId::Image)
            .chain(self.pipelines.keys().copied().map(RemoteId::Pipeline))
            .chain(self.animations.keys().copied().map(RemoteId::Animation))
            .filter(|id| !referenced.contains(id))
            .collect();
        out.sort_by_key(sort_key);
        out
    }

    fn apply_update(&mut self, update: ResourceUpdate) {
        match update {
            ResourceUpdate::AddImage {
                key,
                descriptor,
                source,
                generation,
            } => {
                let id = RemoteId::Image(key);
                if self.check_add(id) {
                    self.images.insert(
                        key,
                        ImageRecord {
                            source,
                            generation,
                            descriptor,
                            updates: 0,
                        },
                    );
                }
            }
            ResourceUpdate::UpdateImage {
                key,
                descriptor,
                source,
                generation,
            } => match self.images.get_mut(&key) {
                Some(record) => {
                    record.source = source;
                    record.generation = generation;
                    record.descriptor = descriptor;
                    record.updates += 1;
                }
                None => self
                    .violations
                    .push(Violation::UnknownResource(RemoteId::Image(key))),
            },
            ResourceUpdate::DeleteImage { key } => {
                self.retire_inline(RemoteId::Image(key));
            }
            ResourceUpdate::AddPipeline { pipeline, source } => {
                if self.check_add(RemoteId::Pipeline(pipeline)) {
                    self.pipelines.insert(pipeline, source);
                }
            }
            ResourceUpdate::UpdatePipeline {
                pipeline, source, ..
            } => match self.pipelines.get_mut(&pipeline) {
                Some(current) => *current = source,
                None => self
                    .violations
                    .push(Violation::UnknownResource(RemoteId::Pipeline(pipeline))),
            },
            ResourceUpdate::RemovePipeline { pipeline } => {
                self.retire_inline(RemoteId::Pipeline(pipeline));
            }
            ResourceUpdate::SetAnimation {
                animation,
                property,
                generation,
            } => {
                let id = RemoteId::Animation(animation);
                if self.retired.contains(&id) {
                    self.violations.push(Violation::ReusedId(id));
                    return;
                }
                self.animations.insert(
                    animation,
                    AnimationRecord {
                        property,
                        generation,
                    },
                );
            }
        }
    }

    fn check_add(&mut self, id: RemoteId) -> bool {
        if self.retired.contains(&id) {
            self.violations.push(Violation::ReusedId(id));
            false
        } else if self.is_live(id) {
            self.violations.push(Violation::DuplicateAdd(id));
            false
        } else {
            true
        }
    }

    fn retire_inline(&mut self, id: RemoteId) {
        if self.remove(id) {
            self.retired.insert(id);
        } else {
            self.violations.push(Violation::UnknownResource(id));
        }
    }

    fn remove(&mut self, id: RemoteId) -> bool {
        match id {
            RemoteId::Image(key) => self.images.remove(&key).is_some(),
            RemoteId::Animation(animation) => self.animations.remove(&animation).is_some(),
            RemoteId::Pipeline(pipeline) => self.pipelines.remove(&pipeline).is_some(),
        }
    }

    fn is_live(&self, id: RemoteId) -> bool {
        match id {
            RemoteId::Image(key) => self.images.contains_key(&key),
            RemoteId::Animation(animation) => self.animations.contains_key(&animation),
            RemoteId::Pipeline(pipeline) => self.pipelines.contains_key(&pipeline),
        }
    }
}

fn referenced(op: &DrawOp) -> Option<RemoteId> {
    match *op {
        DrawOp::Solid { .. } => None,
        DrawOp::Image { key, .. } => Some(RemoteId::Image(key)),
        DrawOp::Pipeline { pipeline, .. } => Some(RemoteId::Pipeline(pipeline)),
        DrawOp::Animated { animation, .. } => Some(RemoteId::Animation(animation)),
    }
}

fn sort_key(id: &RemoteId) -> (u8, u64) {
    match *id {
        RemoteId::Image(key) => (0, (u64::from(key.namespace.0) << 32) | u64::from(key.resource)),
        RemoteId::Animation(animation) => (1, animation.0),
        RemoteId::Pipeline(pipeline) => (
            2,
            (u64::from(pipeline.namespace.0) << 32) | u64::from(pipeline.index),
        ),
    }
}
