// Copyright 2026 the Carryover Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Human-readable trace output.
//!
//! [`PrettyPrintSink`] implements [`TraceSink`] and writes one line per event
//! to a [`Write`](std::io::Write) destination (default: stderr).

use std::io::Write;

use carryover_core::cache::CacheLookup;
use carryover_core::handle::ResourceKind;
use carryover_core::trace::{
    CommitEvent, DiscardFlushEvent, EmptyTransactionEvent, IncompleteEvent, ItemBoundEvent,
    ItemSkippedEvent, TraceSink, TransactionBeginEvent, TransportErrorEvent,
};

/// Writes human-readable trace lines to a [`Write`](std::io::Write) destination.
pub struct PrettyPrintSink<W: Write = Box<dyn Write>> {
    writer: W,
}

impl<W: Write> std::fmt::Debug for PrettyPrintSink<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrettyPrintSink").finish_non_exhaustive()
    }
}

impl PrettyPrintSink {
    /// Creates a sink that writes to stderr.
    #[must_use]
    pub fn stderr() -> Self {
        Self {
            writer: Box::new(std::io::stderr()),
        }
    }

    /// Creates a sink that writes to a boxed writer.
    #[must_use]
    pub fn new(writer: Box<dyn Write>) -> Self {
        Self { writer }
    }
}

impl<W: Write> PrettyPrintSink<W> {
    /// Creates a sink that writes to the given destination.
    #[must_use]
    pub fn with_writer(writer: W) -> Self {
        Self { writer }
    }

    /// Consumes the sink and returns the destination.
    #[must_use]
    pub fn into_inner(self) -> W {
        self.writer
    }
}

fn kind_name(kind: ResourceKind) -> &'static str {
    match kind {
        ResourceKind::Image => "image",
        ResourceKind::Animation => "animation",
    }
}

fn lookup_name(lookup: CacheLookup) -> &'static str {
    match lookup {
        CacheLookup::Hit => "hit",
        CacheLookup::Recycled => "recycled",
        CacheLookup::Created => "created",
    }
}

impl<W: Write> TraceSink for PrettyPrintSink<W> {
    fn on_transaction_begin(&mut self, e: &TransactionBeginEvent) {
        let _ = writeln!(
            self.writer,
            "[begin] txn={} recyclable={}",
            e.transaction.0, e.recyclable,
        );
    }

    fn on_item_bound(&mut self, e: &ItemBoundEvent) {
        let _ = writeln!(
            self.writer,
            "[bind] txn={} item={:?} {} {}",
            e.transaction.0,
            e.item,
            kind_name(e.kind),
            lookup_name(e.lookup),
        );
    }

    fn on_item_skipped(&mut self, e: &ItemSkippedEvent) {
        let _ = writeln!(
            self.writer,
            "[skip] txn={} item={:?} {} not ready",
            e.transaction.0,
            e.item,
            kind_name(e.kind),
        );
    }

    fn on_commit(&mut self, e: &CommitEvent) {
        let _ = writeln!(
            self.writer,
            "[commit] txn={} commands={} resources={} skipped={} evicted={}",
            e.transaction.0, e.commands, e.resource_updates, e.skipped, e.evicted,
        );
    }

    fn on_incomplete(&mut self, e: &IncompleteEvent) {
        let _ = writeln!(
            self.writer,
            "[incomplete] txn={} dropped={}",
            e.transaction.0, e.commands_dropped,
        );
    }

    fn on_empty_transaction(&mut self, e: &EmptyTransactionEvent) {
        let verdict = if e.reused { "reused" } else { "REBUILD" };
        let _ = writeln!(self.writer, "[empty] txn={} {verdict}", e.transaction.0);
    }

    fn on_discard_flush(&mut self, e: &DiscardFlushEvent) {
        let _ = writeln!(
            self.writer,
            "[discard] txn={} ids={}",
            e.transaction.0, e.discarded,
        );
    }

    fn on_transport_error(&mut self, e: &TransportErrorEvent) {
        let _ = writeln!(
            self.writer,
            "[transport] txn={} FAILED sending {}",
            e.transaction.0, e.stage,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use carryover_core::command::TransactionId;
    use carryover_core::error::SendStage;
    use carryover_core::item::{FrameId, ItemKey};

    fn output(sink: PrettyPrintSink<Vec<u8>>) -> String {
        String::from_utf8(sink.into_inner()).unwrap()
    }

    #[test]
    fn pretty_print_commit() {
        let mut sink = PrettyPrintSink::with_writer(Vec::<u8>::new());
        sink.on_commit(&CommitEvent {
            transaction: TransactionId(4),
            commands: 12,
            resource_updates: 3,
            skipped: 1,
            evicted: 2,
        });
        let output = output(sink);
        assert!(output.contains("[commit]"), "got: {output}");
        assert!(output.contains("txn=4"), "got: {output}");
        assert!(output.contains("evicted=2"), "got: {output}");
    }

    #[test]
    fn pretty_print_item_events() {
        let mut sink = PrettyPrintSink::with_writer(Vec::<u8>::new());
        let item = ItemKey::new(FrameId(7), 1);
        sink.on_item_bound(&ItemBoundEvent {
            transaction: TransactionId(1),
            item,
            kind: ResourceKind::Image,
            lookup: CacheLookup::Recycled,
        });
        sink.on_item_skipped(&ItemSkippedEvent {
            transaction: TransactionId(1),
            item,
            kind: ResourceKind::Animation,
        });
        let output = output(sink);
        let lines: Vec<_> = output.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], "[bind] txn=1 item=ItemKey(7/1) image recycled");
        assert_eq!(lines[1], "[skip] txn=1 item=ItemKey(7/1) animation not ready");
    }

    #[test]
    fn pretty_print_transport_error() {
        let mut sink = PrettyPrintSink::with_writer(Vec::<u8>::new());
        sink.on_transport_error(&TransportErrorEvent {
            transaction: TransactionId(9),
            stage: SendStage::Discards,
        });
        let output = output(sink);
        assert_eq!(output, "[transport] txn=9 FAILED sending discard batch\n");
    }
}
