// Copyright 2026 the Carryover Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Simulated paint loop that exercises the tracing and diagnostics pipeline.
//!
//! Paints 30 synthetic frames through a coordinator backed by a
//! [`RecordingChannel`], recording events to both a
//! [`PrettyPrintSink`](carryover_debug::pretty::PrettyPrintSink) and a
//! [`RecorderSink`](carryover_debug::recorder::RecorderSink), then exports a
//! Chrome trace JSON file.

use std::fs::File;
use std::io::BufWriter;

use carryover_core::config::CoordinatorConfig;
use carryover_core::coordinator::TransactionCoordinator;
use carryover_core::item::{FrameId, ItemKey};
use carryover_core::resource::{IdNamespace, SequentialAllocator};
use carryover_core::source::{
    AnimatedProperty, AnimationSource, ImageDelivery, ImageDescriptor, ImageFormat, ImageSource,
    ImageSourceId,
};
use carryover_core::trace::{
    CommitEvent, DiscardFlushEvent, EmptyTransactionEvent, IncompleteEvent, ItemBoundEvent,
    ItemSkippedEvent, TraceSink, TransactionBeginEvent, Tracer, TransportErrorEvent,
};
use carryover_debug::pretty::PrettyPrintSink;
use carryover_debug::recorder::RecorderSink;
use carryover_harness::{FaultToggles, RecordingChannel, RemoteMirror, ScriptedProducer};

const FRAME_COUNT: u64 = 30;
const DESC: ImageDescriptor = ImageDescriptor::new(256, 256, ImageFormat::Bgra8);

/// Forwards every event to two sinks.
struct Tee<'a> {
    pretty: &'a mut PrettyPrintSink,
    recorder: &'a mut RecorderSink,
}

impl TraceSink for Tee<'_> {
    fn on_transaction_begin(&mut self, e: &TransactionBeginEvent) {
        self.pretty.on_transaction_begin(e);
        self.recorder.on_transaction_begin(e);
    }

    fn on_item_bound(&mut self, e: &ItemBoundEvent) {
        self.pretty.on_item_bound(e);
        self.recorder.on_item_bound(e);
    }

    fn on_item_skipped(&mut self, e: &ItemSkippedEvent) {
        self.pretty.on_item_skipped(e);
        self.recorder.on_item_skipped(e);
    }

    fn on_commit(&mut self, e: &CommitEvent) {
        self.pretty.on_commit(e);
        self.recorder.on_commit(e);
    }

    fn on_incomplete(&mut self, e: &IncompleteEvent) {
        self.pretty.on_incomplete(e);
        self.recorder.on_incomplete(e);
    }

    fn on_empty_transaction(&mut self, e: &EmptyTransactionEvent) {
        self.pretty.on_empty_transaction(e);
        self.recorder.on_empty_transaction(e);
    }

    fn on_discard_flush(&mut self, e: &DiscardFlushEvent) {
        self.pretty.on_discard_flush(e);
        self.recorder.on_discard_flush(e);
    }

    fn on_transport_error(&mut self, e: &TransportErrorEvent) {
        self.pretty.on_transport_error(e);
        self.recorder.on_transport_error(e);
    }
}

fn main() {
    // -- sinks -------------------------------------------------------------
    let mut pretty = PrettyPrintSink::new(Box::new(std::io::stdout()));
    let mut recorder = RecorderSink::new();

    // -- coordinator -------------------------------------------------------
    let mut coordinator = TransactionCoordinator::new(
        CoordinatorConfig::new(),
        RecordingChannel::new(),
        SequentialAllocator::new(IdNamespace(1)),
    );
    coordinator.set_first_paint();
    let mut mirror = RemoteMirror::new();
    let mut applied = 0;
    let mut producer = ScriptedProducer::new();

    // -- simulated loop ----------------------------------------------------
    for frame in 0..FRAME_COUNT {
        let mut tee = Tee {
            pretty: &mut pretty,
            recorder: &mut recorder,
        };
        let mut tracer = Tracer::new(&mut tee);

        if frame % 5 == 4 {
            // Idle frame: nothing changed, the last list is re-sent.
            producer.set_changed(false);
        } else {
            build_frame(&mut producer, frame);
        }

        // One frame loses its command buffer on the way out.
        coordinator.channel_mut().set_faults(FaultToggles {
            fail_commands: frame == 17,
            ..FaultToggles::default()
        });

        if let Err(err) = coordinator.paint(&producer, &mut tracer) {
            println!("frame {frame}: {err}");
        }

        let messages = coordinator.channel().messages();
        mirror.replay(&messages[applied..]);
        applied = messages.len();
        if let Some(sent) = coordinator.last_sent() {
            coordinator.did_composite(sent);
        }
    }

    coordinator
        .destroy(&mut Tracer::new(&mut recorder))
        .expect("final discard batch");
    mirror.replay(&coordinator.channel().messages()[applied..]);
    println!(
        "remote: {} live resources, {} violations",
        mirror.live_count(),
        mirror.violations().len()
    );

    // -- export Chrome trace -----------------------------------------------
    let path = "trace.json";
    let file = File::create(path).expect("failed to create trace.json");
    let mut writer = BufWriter::new(file);
    carryover_debug::chrome::export(recorder.as_bytes(), &mut writer)
        .expect("failed to write Chrome trace");

    println!("Wrote {path} ({FRAME_COUNT} frames)");
}

/// A small scene: a few static images, one that churns content, one that
/// appears late, and a fading overlay.
fn build_frame(producer: &mut ScriptedProducer, frame: u64) {
    let item = |f: u64| ItemKey::new(FrameId(f), 0);
    producer.next_frame();
    producer.solid(item(0), [0.1, 0.1, 0.1, 1.0]);
    for f in 1..4 {
        producer.image(item(f), ImageSource::buffer(ImageSourceId(f), 1, DESC));
    }
    // Video-like content: new generation every frame, same key.
    producer.image(
        item(4),
        ImageSource::buffer(ImageSourceId(4), frame, DESC),
    );
    if frame < 3 {
        producer.image(
            item(5),
            ImageSource::pending(ImageSourceId(5), ImageDelivery::Async),
        );
    } else if frame < 20 {
        producer.image(
            item(5),
            ImageSource::async_pipeline(ImageSourceId(5), 1, DESC),
        );
    }
    if frame % 10 < 6 {
        producer.animated(
            item(6),
            AnimationSource::new(AnimatedProperty::Opacity, frame / 10, 2),
        );
    }
}
