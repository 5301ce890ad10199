// Copyright 2026 the Carryover Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A hand-fed [`DisplayListProducer`].

use alloc::vec::Vec;

use carryover_core::item::{
    DisplayItem, DisplayListProducer, FrameId, ImageRendering, ItemContent, ItemKey,
};
use carryover_core::source::{AnimationSource, ImageSource};
use kurbo::Rect;

/// Height of the row each scripted item occupies.
const ROW: f64 = 10.0;

/// Builds one frame's display list item by item.
///
/// Items are stacked in rows so their bounds differ. [`next_frame`] starts a
/// new frame; until then the producer reports the items pushed since the
/// last call.
///
/// [`next_frame`]: ScriptedProducer::next_frame
#[derive(Clone, Debug)]
pub struct ScriptedProducer {
    items: Vec<DisplayItem>,
    mutated: Vec<FrameId>,
    changed: bool,
}

impl Default for ScriptedProducer {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedProducer {
    /// Creates a producer for the first frame.
    #[must_use]
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            mutated: Vec::new(),
            changed: true,
        }
    }

    /// Clears items and mutated frames for the next frame.
    pub fn next_frame(&mut self) -> &mut Self {
        self.items.clear();
        self.mutated.clear();
        self.changed = true;
        self
    }

    /// Appends an image item.
    pub fn image(&mut self, key: ItemKey, source: ImageSource) -> &mut Self {
        self.push(
            key,
            ItemContent::Image {
                source,
                rendering: ImageRendering::Auto,
            },
        )
    }

    /// Appends a solid fill.
    pub fn solid(&mut self, key: ItemKey, color: [f32; 4]) -> &mut Self {
        self.push(key, ItemContent::Solid { color })
    }

    /// Appends an animated fill.
    pub fn animated(&mut self, key: ItemKey, source: AnimationSource) -> &mut Self {
        self.push(
            key,
            ItemContent::Animated {
                source,
                color: [1.0; 4],
            },
        )
    }

    /// Appends an item with arbitrary content.
    pub fn push(&mut self, key: ItemKey, content: ItemContent) -> &mut Self {
        let top = self.items.len() as f64 * ROW;
        self.items.push(DisplayItem::new(
            key,
            Rect::new(0.0, top, 100.0, top + ROW),
            content,
        ));
        self
    }

    /// Reports `frame` as mutated.
    pub fn mutate(&mut self, frame: FrameId) -> &mut Self {
        self.mutated.push(frame);
        self
    }

    /// Sets whether the producer reports changes.
    ///
    /// A producer without changes lets the coordinator try an empty
    /// transaction.
    pub fn set_changed(&mut self, changed: bool) -> &mut Self {
        self.changed = changed;
        self
    }
}

impl DisplayListProducer for ScriptedProducer {
    fn items(&self) -> &[DisplayItem] {
        &self.items
    }

    fn mutated_frames(&self) -> &[FrameId] {
        &self.mutated
    }

    fn has_changes(&self) -> bool {
        self.changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use carryover_core::source::{ImageDelivery, ImageSourceId};

    #[test]
    fn items_stack_in_rows() {
        let mut producer = ScriptedProducer::new();
        producer
            .solid(ItemKey::new(FrameId(1), 0), [0.0; 4])
            .image(
                ItemKey::new(FrameId(1), 1),
                ImageSource::pending(ImageSourceId(1), ImageDelivery::Buffer),
            );
        let items = producer.items();
        assert_eq!(items.len(), 2);
        assert_eq!(items[1].bounds, Rect::new(0.0, 10.0, 100.0, 20.0));
        assert!(producer.has_changes());

        producer.next_frame().set_changed(false);
        assert!(producer.items().is_empty());
        assert!(!producer.has_changes());
    }
}
