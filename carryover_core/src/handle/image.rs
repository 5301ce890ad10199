// Copyright 2026 the Carryover Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Image handles.
//!
//! An image handle lazily connects to its source through a delivery adapter:
//! buffer-backed sources get an [`ImageKey`] and are re-uploaded when their
//! content changes; async sources get a [`PipelineId`] that the remote process
//! pulls frames from on its own, so only a change of producer needs an update.
//! The adapter is kept across transactions for as long as the delivery
//! category stays the same.

use alloc::vec::Vec;

use super::UpdateForSource;
use crate::command::ResourceUpdate;
use crate::resource::{ImageKey, PipelineId, RemoteId, ResourceAllocator};
use crate::source::{ImageDelivery, ImageDescriptor, ImageSource, ImageSourceId};

/// The remote resource an image item draws from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ImageBinding {
    /// Buffer-backed image.
    Image(ImageKey),
    /// Externally composited pipeline.
    Pipeline(PipelineId),
}

impl ImageBinding {
    /// Returns the binding as a ledger identifier.
    #[must_use]
    pub const fn remote_id(self) -> RemoteId {
        match self {
            Self::Image(key) => RemoteId::Image(key),
            Self::Pipeline(pipeline) => RemoteId::Pipeline(pipeline),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Adapter {
    Buffer { key: ImageKey },
    Async { pipeline: PipelineId },
}

impl Adapter {
    const fn delivery(self) -> ImageDelivery {
        match self {
            Self::Buffer { .. } => ImageDelivery::Buffer,
            Self::Async { .. } => ImageDelivery::Async,
        }
    }

    const fn binding(self) -> ImageBinding {
        match self {
            Self::Buffer { key } => ImageBinding::Image(key),
            Self::Async { pipeline } => ImageBinding::Pipeline(pipeline),
        }
    }
}

/// What the handle last sent for its source.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Uploaded {
    source: ImageSourceId,
    generation: u64,
    descriptor: ImageDescriptor,
}

/// Client-side state of an image handle.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ImageData {
    adapter: Option<Adapter>,
    uploaded: Option<Uploaded>,
    updates: u32,
}

impl ImageData {
    /// Returns the remote resource this handle owns, if any.
    #[must_use]
    pub fn binding(&self) -> Option<ImageBinding> {
        self.adapter.map(Adapter::binding)
    }

    /// Returns the image key for buffer-backed handles.
    #[must_use]
    pub fn image_key(&self) -> Option<ImageKey> {
        match self.adapter {
            Some(Adapter::Buffer { key }) => Some(key),
            _ => None,
        }
    }

    /// Returns the delivery category of the current adapter.
    #[must_use]
    pub fn delivery(&self) -> Option<ImageDelivery> {
        self.adapter.map(Adapter::delivery)
    }

    /// Returns the source generation last sent to the remote process.
    #[must_use]
    pub fn uploaded_generation(&self) -> Option<u64> {
        self.uploaded.map(|u| u.generation)
    }

    /// Number of resource updates this handle has emitted over its lifetime.
    #[must_use]
    pub fn update_count(&self) -> u32 {
        self.updates
    }

    fn is_current(&self, adapter: Adapter, source: &ImageSource, desc: ImageDescriptor) -> bool {
        let Some(uploaded) = self.uploaded else {
            return false;
        };
        match adapter {
            Adapter::Buffer { .. } => {
                uploaded.source == source.id
                    && uploaded.generation == source.generation
                    && uploaded.descriptor == desc
            }
            // The remote pipeline follows its producer; only a new producer
            // needs reconnecting.
            Adapter::Async { .. } => uploaded.source == source.id,
        }
    }

    fn retire(&mut self, updates: &mut Vec<ResourceUpdate>) {
        match self.adapter.take() {
            Some(Adapter::Buffer { key }) => updates.push(ResourceUpdate::DeleteImage { key }),
            Some(Adapter::Async { pipeline }) => {
                updates.push(ResourceUpdate::RemovePipeline { pipeline });
            }
            None => {}
        }
        self.uploaded = None;
    }
}

impl UpdateForSource for ImageData {
    type Source = ImageSource;
    type Binding = ImageBinding;

    fn update_for_source<A: ResourceAllocator + ?Sized>(
        &mut self,
        source: &ImageSource,
        allocator: &mut A,
        updates: &mut Vec<ResourceUpdate>,
    ) -> Option<ImageBinding> {
        let descriptor = source.descriptor?;

        if let Some(adapter) = self.adapter {
            if adapter.delivery() != source.delivery {
                self.retire(updates);
            } else if self.is_current(adapter, source, descriptor) {
                return Some(adapter.binding());
            }
        }

        let adapter = match self.adapter {
            Some(adapter @ Adapter::Buffer { key }) => {
                updates.push(ResourceUpdate::UpdateImage {
                    key,
                    descriptor,
                    source: source.id,
                    generation: source.generation,
                });
                adapter
            }
            Some(adapter @ Adapter::Async { pipeline }) => {
                updates.push(ResourceUpdate::UpdatePipeline {
                    pipeline,
                    source: source.id,
                    generation: source.generation,
                });
                adapter
            }
            None => match source.delivery {
                ImageDelivery::Buffer => {
                    let key = allocator.image_key();
                    updates.push(ResourceUpdate::AddImage {
                        key,
                        descriptor,
                        source: source.id,
                        generation: source.generation,
                    });
                    Adapter::Buffer { key }
                }
                ImageDelivery::Async => {
                    let pipeline = allocator.pipeline_id();
                    updates.push(ResourceUpdate::AddPipeline {
                        pipeline,
                        source: source.id,
                    });
                    Adapter::Async { pipeline }
                }
            },
        };

        self.adapter = Some(adapter);
        self.uploaded = Some(Uploaded {
            source: source.id,
            generation: source.generation,
            descriptor,
        });
        self.updates += 1;
        Some(adapter.binding())
    }
}
