// Copyright 2026 the Carryover Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Chrome Trace Event Format exporter.
//!
//! [`export`] reads recorded bytes from a [`RecorderSink`](super::recorder::RecorderSink)
//! and writes [Chrome Trace Event Format][format] JSON to the given writer.
//!
//! Recorded events carry no wall-clock time. Each event is placed at its
//! sequence index (one microsecond apart), so the timeline shows ordering and
//! nesting rather than durations. Every transaction is drawn as a `B`/`E`
//! span from its begin event to its commit or incomplete event.
//!
//! [format]: https://docs.google.com/document/d/1CvAClvFfyA5R-PhYUmn5OOQtYMH4h6I0nSsKchNAySU

use std::io::{self, Write};

use serde_json::{Value, json};

use crate::recorder::{RecordedEvent, decode};

/// Exports recorded events as Chrome Trace Event Format JSON.
///
/// The output is a complete JSON array of trace event objects, suitable for
/// loading into `chrome://tracing` or [Perfetto](https://ui.perfetto.dev/).
pub fn export(bytes: &[u8], writer: &mut dyn Write) -> io::Result<()> {
    let mut events: Vec<Value> = Vec::new();

    for (ts, recorded) in decode(bytes).enumerate() {
        let txn = recorded.transaction().0;
        match recorded {
            RecordedEvent::TransactionBegin(e) => {
                events.push(json!({
                    "ph": "B",
                    "name": "Transaction",
                    "cat": "Transaction",
                    "ts": ts,
                    "pid": 0,
                    "tid": 0,
                    "args": {
                        "transaction": txn,
                        "recyclable": e.recyclable,
                    }
                }));
            }
            RecordedEvent::ItemBound(e) => {
                events.push(json!({
                    "ph": "i",
                    "name": "ItemBound",
                    "cat": "Rich",
                    "ts": ts,
                    "pid": 0,
                    "tid": 0,
                    "s": "t",
                    "args": {
                        "transaction": txn,
                        "item": format!("{:?}", e.item),
                        "kind": format!("{:?}", e.kind),
                        "lookup": format!("{:?}", e.lookup),
                    }
                }));
            }
            RecordedEvent::ItemSkipped(e) => {
                events.push(json!({
                    "ph": "i",
                    "name": "ItemSkipped",
                    "cat": "Transaction",
                    "ts": ts,
                    "pid": 0,
                    "tid": 0,
                    "s": "t",
                    "args": {
                        "transaction": txn,
                        "item": format!("{:?}", e.item),
                        "kind": format!("{:?}", e.kind),
                    }
                }));
            }
            RecordedEvent::Commit(e) => {
                events.push(json!({
                    "ph": "E",
                    "name": "Transaction",
                    "cat": "Transaction",
                    "ts": ts,
                    "pid": 0,
                    "tid": 0,
                    "args": {
                        "transaction": txn,
                        "outcome": "committed",
                        "commands": e.commands,
                        "resource_updates": e.resource_updates,
                        "skipped": e.skipped,
                        "evicted": e.evicted,
                    }
                }));
            }
            RecordedEvent::Incomplete(e) => {
                events.push(json!({
                    "ph": "E",
                    "name": "Transaction",
                    "cat": "Transaction",
                    "ts": ts,
                    "pid": 0,
                    "tid": 0,
                    "args": {
                        "transaction": txn,
                        "outcome": "incomplete",
                        "commands_dropped": e.commands_dropped,
                    }
                }));
            }
            RecordedEvent::EmptyTransaction(e) => {
                events.push(json!({
                    "ph": "i",
                    "name": "EmptyTransaction",
                    "cat": "Transaction",
                    "ts": ts,
                    "pid": 0,
                    "tid": 0,
                    "s": "g",
                    "args": {
                        "transaction": txn,
                        "reused": e.reused,
                    }
                }));
            }
            RecordedEvent::DiscardFlush(e) => {
                events.push(json!({
                    "ph": "i",
                    "name": "DiscardFlush",
                    "cat": "Ledger",
                    "ts": ts,
                    "pid": 0,
                    "tid": 0,
                    "s": "t",
                    "args": {
                        "transaction": txn,
                        "discarded": e.discarded,
                    }
                }));
            }
            RecordedEvent::TransportError(e) => {
                events.push(json!({
                    "ph": "i",
                    "name": "TransportError",
                    "cat": "Transport",
                    "ts": ts,
                    "pid": 0,
                    "tid": 0,
                    "s": "g",
                    "args": {
                        "transaction": txn,
                        "stage": e.stage.to_string(),
                    }
                }));
            }
        }
    }

    serde_json::to_writer_pretty(writer, &events)?;
    Ok(())
}
