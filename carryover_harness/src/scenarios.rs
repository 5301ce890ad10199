// Copyright 2026 the Carryover Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! End-to-end transactions checked against the remote mirror.

use alloc::vec::Vec;

use carryover_core::command::TransactionId;
use carryover_core::config::CoordinatorConfig;
use carryover_core::coordinator::{
    PaintOutcome, TransactionCoordinator, TransactionOutcome, TransactionState,
};
use carryover_core::error::{SendStage, TransactionError};
use carryover_core::handle::ResourceHandle;
use carryover_core::item::{DisplayListProducer, FrameId, ItemKey};
use carryover_core::resource::{AnimationId, IdNamespace, ImageKey, RemoteId, SequentialAllocator};
use carryover_core::source::{
    AnimatedProperty, AnimationSource, ImageDelivery, ImageDescriptor, ImageFormat, ImageSource,
    ImageSourceId,
};
use carryover_core::trace::Tracer;

use crate::{FaultToggles, RecordingChannel, RemoteMirror, ScriptedProducer, Violation};

const DESC: ImageDescriptor = ImageDescriptor::new(32, 32, ImageFormat::Bgra8);

type Coordinator = TransactionCoordinator<RecordingChannel, SequentialAllocator>;

struct Rig {
    coordinator: Coordinator,
    mirror: RemoteMirror,
    applied: usize,
}

impl Rig {
    fn new() -> Self {
        Self {
            coordinator: TransactionCoordinator::new(
                CoordinatorConfig::new(),
                RecordingChannel::new(),
                SequentialAllocator::new(IdNamespace(3)),
            ),
            mirror: RemoteMirror::new(),
            applied: 0,
        }
    }

    fn paint(&mut self, producer: &ScriptedProducer) -> Result<PaintOutcome, TransactionError> {
        let result = self.coordinator.paint(producer, &mut Tracer::none());
        self.sync();
        result
    }

    fn sync(&mut self) {
        let messages = self.coordinator.channel().messages();
        self.mirror.replay(&messages[self.applied..]);
        self.applied = messages.len();
    }

    fn faults(&mut self, faults: FaultToggles) {
        self.coordinator.channel_mut().set_faults(faults);
    }

    fn image_key(&self, key: ItemKey) -> Option<ImageKey> {
        let cache = self.coordinator.cache();
        cache
            .previous(key)
            .and_then(|id| cache.handle(id))
            .and_then(ResourceHandle::as_image)
            .and_then(|image| image.image_key())
    }

    fn animation(&self, key: ItemKey) -> Option<AnimationId> {
        let cache = self.coordinator.cache();
        cache
            .previous(key)
            .and_then(|id| cache.handle(id))
            .and_then(ResourceHandle::as_animation)
            .and_then(|animation| animation.animation())
    }

    fn assert_clean(&self) {
        assert!(
            self.mirror.is_consistent(),
            "violations: {:?}",
            self.mirror.violations()
        );
    }
}

fn item(frame: u64) -> ItemKey {
    ItemKey::new(FrameId(frame), 0)
}

fn buffer(src: u64) -> ImageSource {
    ImageSource::buffer(ImageSourceId(src), 1, DESC)
}

const A: u64 = 1;
const B: u64 = 2;

#[test]
fn content_change_updates_existing_key() {
    let mut rig = Rig::new();
    let mut producer = ScriptedProducer::new();
    producer.image(item(A), buffer(1)).image(item(B), buffer(2));
    rig.paint(&producer).unwrap();
    let a_key = rig.image_key(item(A)).unwrap();
    let b_key = rig.image_key(item(B)).unwrap();

    producer
        .next_frame()
        .image(item(A), buffer(1))
        .image(item(B), buffer(3));
    rig.paint(&producer).unwrap();

    assert_eq!(rig.image_key(item(A)), Some(a_key));
    assert_eq!(rig.image_key(item(B)), Some(b_key));
    assert_eq!(rig.mirror.image(a_key).map(|r| r.updates), Some(0));
    let b = rig.mirror.image(b_key).unwrap();
    assert_eq!(b.source, ImageSourceId(3));
    assert_eq!(b.updates, 1);

    assert!(rig.coordinator.ledger().is_empty());
    assert_eq!(rig.coordinator.channel().discard_batches().count(), 0);
    assert!(rig.mirror.unreferenced().is_empty());
    rig.assert_clean();
}

#[test]
fn removed_item_is_discarded_exactly_once() {
    let mut rig = Rig::new();
    let mut producer = ScriptedProducer::new();
    producer.image(item(A), buffer(1)).image(item(B), buffer(2));
    rig.paint(&producer).unwrap();
    let b_key = rig.image_key(item(B)).unwrap();

    producer.next_frame().image(item(A), buffer(1));
    rig.paint(&producer).unwrap();
    producer.next_frame().image(item(A), buffer(1));
    rig.paint(&producer).unwrap();

    let batches: Vec<_> = rig.coordinator.channel().discard_batches().collect();
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].images, [b_key]);
    assert!(rig.mirror.is_retired(RemoteId::Image(b_key)));
    assert_eq!(rig.mirror.live_count(), 1);
    rig.assert_clean();
}

#[test]
fn abandoned_transaction_leaves_no_trace() {
    let mut control = Rig::new();
    let mut rig = Rig::new();
    let mut producer = ScriptedProducer::new();
    producer.image(item(A), buffer(1)).image(item(B), buffer(2));
    control.paint(&producer).unwrap();
    rig.paint(&producer).unwrap();
    let before = rig.coordinator.cache().generations();

    // Abort after A, with A's content changed and a new item allocated.
    let mut tracer = Tracer::none();
    let mut txn = rig.coordinator.begin_transaction(&mut tracer).unwrap();
    producer
        .next_frame()
        .image(item(A), buffer(9))
        .image(item(7), buffer(70));
    for display_item in producer.items() {
        rig.coordinator
            .push_item(&mut txn, display_item, &mut tracer)
            .unwrap();
    }
    rig.coordinator.set_transaction_incomplete(&mut txn).unwrap();
    assert!(matches!(
        rig.coordinator.end_transaction(txn, &mut tracer),
        Ok(TransactionOutcome::Incomplete(_))
    ));
    rig.sync();
    assert_eq!(rig.coordinator.cache().generations(), before);
    assert!(rig.coordinator.ledger().is_empty());

    producer
        .next_frame()
        .image(item(A), buffer(1))
        .image(item(B), buffer(2));
    control.paint(&producer).unwrap();
    rig.paint(&producer).unwrap();

    let expected = control.coordinator.channel().last_commands().unwrap();
    let actual = rig.coordinator.channel().last_commands().unwrap();
    assert_eq!(actual.commands, expected.commands);
    assert_eq!(actual.resources, expected.resources);
    assert!(actual.resources.is_empty());
    assert_eq!(
        rig.coordinator.cache().generations(),
        control.coordinator.cache().generations()
    );
    assert_eq!(rig.coordinator.channel().discard_batches().count(), 0);
    rig.assert_clean();
}

#[test]
fn display_list_follows_item_order() {
    let mut rig = Rig::new();
    let mut producer = ScriptedProducer::new();
    producer
        .solid(item(10), [1.0, 0.0, 0.0, 1.0])
        .image(item(11), buffer(1))
        .animated(item(12), AnimationSource::new(AnimatedProperty::Opacity, 1, 4))
        .image(ItemKey::new(FrameId(10), 1), buffer(2))
        .solid(item(13), [0.0; 4]);
    rig.paint(&producer).unwrap();

    let order: Vec<_> = rig.mirror.display_list().iter().map(|c| c.item).collect();
    let expected = [
        item(10),
        item(11),
        item(12),
        ItemKey::new(FrameId(10), 1),
        item(13),
    ];
    assert_eq!(order, expected);
    rig.assert_clean();
}

#[test]
fn empty_transaction_reuses_display_list() {
    let mut rig = Rig::new();
    let mut producer = ScriptedProducer::new();
    rig.coordinator.set_first_paint();
    producer.image(item(A), buffer(1)).solid(item(B), [0.5; 4]);
    rig.paint(&producer).unwrap();
    let list = rig.mirror.display_list().to_vec();

    producer.set_changed(false).mutate(FrameId(99));
    let outcome = rig.paint(&producer).unwrap();
    assert_eq!(outcome, PaintOutcome::Reused(TransactionId(2)));
    assert_eq!(rig.mirror.display_list(), list.as_slice());
    assert_eq!(rig.mirror.last_transaction(), Some(TransactionId(2)));
    assert_eq!(rig.mirror.first_paints(), 1);

    // A participant changed: reuse is refused and a full build runs.
    producer.set_changed(false).mutate(FrameId(A));
    assert!(matches!(
        rig.paint(&producer).unwrap(),
        PaintOutcome::Built(TransactionOutcome::Committed(_))
    ));
    assert_eq!(rig.coordinator.channel().command_buffers().count(), 3);

    rig.coordinator.did_composite(TransactionId(3));
    assert!(!rig.coordinator.is_composite_pending());
    rig.assert_clean();
}

#[test]
fn kind_change_discards_old_resource() {
    let mut rig = Rig::new();
    let mut producer = ScriptedProducer::new();
    producer.image(item(A), buffer(1));
    rig.paint(&producer).unwrap();
    let key = rig.image_key(item(A)).unwrap();

    producer
        .next_frame()
        .animated(item(A), AnimationSource::new(AnimatedProperty::Transform, 1, 2));
    rig.paint(&producer).unwrap();

    assert!(rig.mirror.is_retired(RemoteId::Image(key)));
    let animation = rig.animation(item(A)).unwrap();
    assert_eq!(
        rig.mirror.animation(animation).map(|r| r.property),
        Some(AnimatedProperty::Transform)
    );
    assert!(rig.mirror.unreferenced().is_empty());
    rig.assert_clean();
}

#[test]
fn animation_generation_bumps_keyframes() {
    let mut rig = Rig::new();
    let mut producer = ScriptedProducer::new();
    let anim = |generation| AnimationSource::new(AnimatedProperty::Opacity, generation, 3);

    producer.animated(item(A), anim(1));
    rig.paint(&producer).unwrap();
    let id = rig.animation(item(A)).unwrap();

    producer.next_frame().animated(item(A), anim(1));
    rig.paint(&producer).unwrap();
    assert!(
        rig.coordinator
            .channel()
            .last_commands()
            .unwrap()
            .resources
            .is_empty()
    );

    producer.next_frame().animated(item(A), anim(2));
    rig.paint(&producer).unwrap();
    assert_eq!(rig.animation(item(A)), Some(id));
    assert_eq!(rig.mirror.animation(id).map(|r| r.generation), Some(2));

    producer.next_frame();
    rig.paint(&producer).unwrap();
    assert_eq!(rig.mirror.live_count(), 0);
    rig.assert_clean();
}

#[test]
fn delivery_switch_replaces_remote_resource() {
    let mut rig = Rig::new();
    let mut producer = ScriptedProducer::new();
    producer.image(item(A), buffer(1));
    rig.paint(&producer).unwrap();
    let key = rig.image_key(item(A)).unwrap();

    producer.next_frame().image(
        item(A),
        ImageSource::async_pipeline(ImageSourceId(1), 1, DESC),
    );
    rig.paint(&producer).unwrap();
    assert!(rig.mirror.is_retired(RemoteId::Image(key)));
    assert_eq!(rig.mirror.live_count(), 1);
    assert!(rig.mirror.unreferenced().is_empty());

    producer.next_frame();
    rig.paint(&producer).unwrap();
    assert_eq!(rig.mirror.live_count(), 0);
    rig.assert_clean();
}

#[test]
fn lost_commands_hold_back_discards() {
    let mut rig = Rig::new();
    let mut producer = ScriptedProducer::new();
    producer.image(item(A), buffer(1)).image(item(B), buffer(2));
    rig.paint(&producer).unwrap();
    let b_key = rig.image_key(item(B)).unwrap();

    rig.faults(FaultToggles {
        fail_commands: true,
        ..FaultToggles::default()
    });
    producer.next_frame().image(item(A), buffer(1));
    let err = rig.paint(&producer).unwrap_err();
    assert!(matches!(
        err,
        TransactionError::Transport {
            stage: SendStage::Commands,
            ..
        }
    ));
    assert!(rig.coordinator.ledger().contains(RemoteId::Image(b_key)));
    assert!(rig.mirror.image(b_key).is_some(), "still shown remotely");

    rig.faults(FaultToggles::default());
    producer.next_frame().image(item(A), buffer(1));
    rig.paint(&producer).unwrap();

    assert_eq!(rig.coordinator.channel().refused(), 1);
    assert!(rig.mirror.is_retired(RemoteId::Image(b_key)));
    assert!(rig.mirror.unreferenced().is_empty());
    rig.assert_clean();
}

#[test]
fn lost_commands_strand_fresh_identifiers() {
    let mut rig = Rig::new();
    let mut producer = ScriptedProducer::new();
    producer.image(item(A), buffer(1));
    rig.paint(&producer).unwrap();

    // C's image is added in the buffer that never arrives.
    rig.faults(FaultToggles {
        fail_commands: true,
        ..FaultToggles::default()
    });
    producer
        .next_frame()
        .image(item(A), buffer(1))
        .image(item(3), buffer(30));
    assert!(rig.paint(&producer).is_err());
    let c_key = rig.image_key(item(3)).unwrap();
    assert!(rig.mirror.image(c_key).is_none());

    rig.faults(FaultToggles::default());
    producer
        .next_frame()
        .image(item(A), buffer(1))
        .image(item(3), buffer(30));
    let PaintOutcome::Built(TransactionOutcome::Committed(summary)) =
        rig.paint(&producer).unwrap()
    else {
        panic!("third frame commits");
    };
    assert_eq!(summary.resource_updates, 0, "handle believes C is uploaded");
    assert_eq!(
        rig.mirror.violations(),
        [Violation::DanglingReference {
            transaction: summary.transaction,
            id: RemoteId::Image(c_key),
        }]
    );
}

#[test]
fn lost_discards_are_retried() {
    let mut rig = Rig::new();
    let mut producer = ScriptedProducer::new();
    producer.image(item(A), buffer(1)).image(item(B), buffer(2));
    rig.paint(&producer).unwrap();
    let b_key = rig.image_key(item(B)).unwrap();

    rig.faults(FaultToggles {
        fail_discards: true,
        ..FaultToggles::default()
    });
    producer.next_frame().image(item(A), buffer(1));
    assert!(matches!(
        rig.paint(&producer),
        Err(TransactionError::Transport {
            stage: SendStage::Discards,
            ..
        })
    ));
    assert_eq!(rig.mirror.unreferenced(), [RemoteId::Image(b_key)]);

    rig.faults(FaultToggles::default());
    producer.next_frame().image(item(A), buffer(1));
    rig.paint(&producer).unwrap();

    assert_eq!(rig.coordinator.channel().discard_batches().count(), 1);
    assert!(rig.mirror.unreferenced().is_empty());
    rig.assert_clean();
}

#[test]
fn destroy_releases_everything() {
    let mut rig = Rig::new();
    let mut producer = ScriptedProducer::new();
    producer
        .image(item(A), buffer(1))
        .image(item(B), ImageSource::async_pipeline(ImageSourceId(2), 1, DESC))
        .animated(item(3), AnimationSource::new(AnimatedProperty::Opacity, 1, 1));
    rig.paint(&producer).unwrap();
    assert_eq!(rig.mirror.live_count(), 3);

    rig.coordinator.destroy(&mut Tracer::none()).unwrap();
    rig.sync();
    assert_eq!(rig.coordinator.state(), TransactionState::Destroyed);
    assert_eq!(rig.mirror.live_count(), 0);
    assert_eq!(
        rig.paint(&producer).unwrap_err(),
        TransactionError::Destroyed
    );
    rig.assert_clean();
}

#[test]
fn randomized_frames_never_leak() {
    let mut rig = Rig::new();
    let mut producer = ScriptedProducer::new();
    let mut seed: u64 = 0x5eed;
    let mut next = move || {
        seed = seed
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);
        seed >> 33
    };

    for _ in 0..60 {
        match next() % 8 {
            // Nothing changed.
            0 => {
                producer.set_changed(false);
                rig.paint(&producer).unwrap();
            }
            // Abandon halfway through.
            1 => {
                let mut tracer = Tracer::none();
                let mut txn = rig.coordinator.begin_transaction(&mut tracer).unwrap();
                producer.next_frame();
                for frame in 0..(next() % 6) {
                    producer.image(item(frame), buffer(next() % 4));
                }
                for display_item in producer.items() {
                    rig.coordinator
                        .push_item(&mut txn, display_item, &mut tracer)
                        .unwrap();
                }
                rig.coordinator.abandon_transaction(txn, &mut tracer).unwrap();
            }
            _ => {
                producer.next_frame();
                for frame in 0..12 {
                    let roll = next() % 10;
                    let key = item(frame);
                    match roll {
                        0..=3 => {}
                        4 => {
                            producer.image(
                                key,
                                ImageSource::pending(ImageSourceId(frame), ImageDelivery::Buffer),
                            );
                        }
                        5 => {
                            producer.image(
                                key,
                                ImageSource::async_pipeline(ImageSourceId(frame), 1, DESC),
                            );
                        }
                        6 => {
                            producer.animated(
                                key,
                                AnimationSource::new(AnimatedProperty::Opacity, next() % 3, 2),
                            );
                        }
                        _ => {
                            producer.image(
                                key,
                                ImageSource::buffer(ImageSourceId(frame), next() % 3, DESC),
                            );
                        }
                    }
                }
                rig.paint(&producer).unwrap();
            }
        }
        rig.assert_clean();
    }

    // Settle on a fully ready frame: every live resource is on screen.
    producer.next_frame();
    for frame in 0..12 {
        producer.image(item(frame), buffer(frame));
    }
    rig.paint(&producer).unwrap();
    assert!(rig.mirror.unreferenced().is_empty());

    rig.coordinator.destroy(&mut Tracer::none()).unwrap();
    rig.sync();
    assert_eq!(rig.mirror.live_count(), 0);
    rig.assert_clean();
}

#[test]
fn recorded_trace_exports_balanced_spans() {
    use carryover_debug::chrome;
    use carryover_debug::recorder::{RecordedEvent, RecorderSink, decode};

    let mut rig = Rig::new();
    let mut producer = ScriptedProducer::new();
    let mut recorder = RecorderSink::new();
    {
        let mut tracer = Tracer::new(&mut recorder);
        producer.image(item(A), buffer(1)).image(item(B), buffer(2));
        rig.coordinator.paint(&producer, &mut tracer).unwrap();
        producer.set_changed(false);
        rig.coordinator.paint(&producer, &mut tracer).unwrap();
        producer.next_frame().image(item(A), buffer(1));
        rig.coordinator.paint(&producer, &mut tracer).unwrap();
    }

    let events: Vec<_> = decode(recorder.as_bytes()).collect();
    assert!(matches!(events[0], RecordedEvent::TransactionBegin(_)));
    assert!(events.iter().any(|e| matches!(
        e,
        RecordedEvent::EmptyTransaction(empty) if empty.reused
    )));
    let flush = events.iter().find_map(|e| match e {
        RecordedEvent::DiscardFlush(flush) => Some(flush),
        _ => None,
    });
    assert_eq!(flush.map(|f| f.discarded), Some(1));

    let mut out = Vec::new();
    chrome::export(recorder.as_bytes(), &mut out).unwrap();
    let parsed: Vec<serde_json::Value> = serde_json::from_slice(&out).unwrap();
    let begins = parsed.iter().filter(|e| e["ph"] == "B").count();
    let ends = parsed.iter().filter(|e| e["ph"] == "E").count();
    assert_eq!(begins, 2);
    assert_eq!(begins, ends);
}
