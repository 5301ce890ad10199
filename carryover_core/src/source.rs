// Copyright 2026 the Carryover Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Content sources referenced by display items.
//!
//! A source describes *what* an item shows, not where it lives remotely.
//! Handles compare the source's identity and generation against what they
//! last uploaded to decide whether an update is needed.

use core::fmt;

/// Stable identity of an image producer (decoder, canvas, video frame queue).
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ImageSourceId(pub u64);

impl fmt::Debug for ImageSourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ImageSourceId({})", self.0)
    }
}

/// Pixel format of uploaded image content.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ImageFormat {
    /// 8-bit premultiplied BGRA.
    #[default]
    Bgra8,
    /// 8-bit premultiplied RGBA.
    Rgba8,
    /// 8-bit single-channel alpha.
    R8,
}

/// Size and format of a ready image.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ImageDescriptor {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Pixel format.
    pub format: ImageFormat,
}

impl ImageDescriptor {
    /// Creates a descriptor.
    #[must_use]
    pub const fn new(width: u32, height: u32, format: ImageFormat) -> Self {
        Self {
            width,
            height,
            format,
        }
    }
}

/// How an image's pixels reach the remote process.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ImageDelivery {
    /// Pixels are uploaded through a shared buffer and named by an
    /// [`ImageKey`](crate::resource::ImageKey).
    #[default]
    Buffer,
    /// Content is composited remotely by its own pipeline (video, async
    /// canvas) and named by a [`PipelineId`](crate::resource::PipelineId).
    Async,
}

/// An image source as seen at paint time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ImageSource {
    /// Producer identity.
    pub id: ImageSourceId,
    /// Content generation; bumps whenever the producer has new pixels.
    pub generation: u64,
    /// Delivery category.
    pub delivery: ImageDelivery,
    /// Current content, or `None` if the producer has nothing to show yet.
    pub descriptor: Option<ImageDescriptor>,
}

impl ImageSource {
    /// Creates a ready, buffer-backed source.
    #[must_use]
    pub const fn buffer(id: ImageSourceId, generation: u64, descriptor: ImageDescriptor) -> Self {
        Self {
            id,
            generation,
            delivery: ImageDelivery::Buffer,
            descriptor: Some(descriptor),
        }
    }

    /// Creates a ready, externally composited source.
    #[must_use]
    pub const fn async_pipeline(
        id: ImageSourceId,
        generation: u64,
        descriptor: ImageDescriptor,
    ) -> Self {
        Self {
            id,
            generation,
            delivery: ImageDelivery::Async,
            descriptor: Some(descriptor),
        }
    }

    /// Creates a source that has no content yet.
    #[must_use]
    pub const fn pending(id: ImageSourceId, delivery: ImageDelivery) -> Self {
        Self {
            id,
            generation: 0,
            delivery,
            descriptor: None,
        }
    }

    /// Returns `true` if the source can currently produce content.
    #[must_use]
    pub const fn is_ready(&self) -> bool {
        self.descriptor.is_some()
    }
}

/// Which layer property a compositor animation drives.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AnimatedProperty {
    /// Opacity animation.
    Opacity,
    /// Transform animation.
    Transform,
}

/// A compositor-side animation as seen at paint time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct AnimationSource {
    /// Animated property.
    pub property: AnimatedProperty,
    /// Bumps whenever keyframes or timing change.
    pub generation: u64,
    /// Number of keyframes; zero means the animation is not ready.
    pub keyframes: u32,
}

impl AnimationSource {
    /// Creates an animation source.
    #[must_use]
    pub const fn new(property: AnimatedProperty, generation: u64, keyframes: u32) -> Self {
        Self {
            property,
            generation,
            keyframes,
        }
    }

    /// Returns `true` if the animation has keyframes to run.
    #[must_use]
    pub const fn is_ready(&self) -> bool {
        self.keyframes > 0
    }
}
