// Copyright 2026 the Carryover Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Compositor animation handles.

use alloc::vec::Vec;

use super::UpdateForSource;
use crate::command::ResourceUpdate;
use crate::resource::{AnimationId, ResourceAllocator};
use crate::source::{AnimatedProperty, AnimationSource};

/// Client-side state of an animation handle.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AnimationData {
    id: Option<AnimationId>,
    sent: Option<(AnimatedProperty, u64)>,
}

impl AnimationData {
    /// Returns the animation id, once allocated.
    #[must_use]
    pub fn animation(&self) -> Option<AnimationId> {
        self.id
    }

    /// Returns the keyframe generation last sent.
    #[must_use]
    pub fn sent_generation(&self) -> Option<u64> {
        self.sent.map(|(_, generation)| generation)
    }
}

impl UpdateForSource for AnimationData {
    type Source = AnimationSource;
    type Binding = AnimationId;

    fn update_for_source<A: ResourceAllocator + ?Sized>(
        &mut self,
        source: &AnimationSource,
        allocator: &mut A,
        updates: &mut Vec<ResourceUpdate>,
    ) -> Option<AnimationId> {
        if !source.is_ready() {
            return None;
        }
        let id = *self.id.get_or_insert_with(|| allocator.animation_id());
        let wanted = (source.property, source.generation);
        if self.sent != Some(wanted) {
            updates.push(ResourceUpdate::SetAnimation {
                animation: id,
                property: source.property,
                generation: source.generation,
            });
            self.sent = Some(wanted);
        }
        Some(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::{IdNamespace, SequentialAllocator};

    #[test]
    fn id_is_stable_across_generations() {
        let mut alloc = SequentialAllocator::new(IdNamespace(2));
        let mut data = AnimationData::default();
        let mut updates = Vec::new();

        let a = data.update_for_source(
            &AnimationSource::new(AnimatedProperty::Opacity, 1, 2),
            &mut alloc,
            &mut updates,
        );
        let b = data.update_for_source(
            &AnimationSource::new(AnimatedProperty::Opacity, 2, 2),
            &mut alloc,
            &mut updates,
        );
        assert_eq!(a, b);
        assert_eq!(updates.len(), 2, "each new generation is sent once");
        assert_eq!(data.sent_generation(), Some(2));

        updates.clear();
        let _ = data.update_for_source(
            &AnimationSource::new(AnimatedProperty::Opacity, 2, 2),
            &mut alloc,
            &mut updates,
        );
        assert!(updates.is_empty());
    }

    #[test]
    fn no_keyframes_is_not_ready() {
        let mut alloc = SequentialAllocator::new(IdNamespace(2));
        let mut data = AnimationData::default();
        let mut updates = Vec::new();

        let got = data.update_for_source(
            &AnimationSource::new(AnimatedProperty::Transform, 1, 0),
            &mut alloc,
            &mut updates,
        );
        assert!(got.is_none());
        assert!(data.animation().is_none(), "nothing allocated");
    }
}
