// Copyright 2026 the Carryover Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Compact binary event recording and decoding.
//!
//! [`RecorderSink`] implements [`TraceSink`] and encodes events into a
//! `Vec<u8>` as fixed-size little-endian records. [`decode`] reads them back
//! as an iterator of [`RecordedEvent`].

use carryover_core::cache::CacheLookup;
use carryover_core::command::TransactionId;
use carryover_core::error::SendStage;
use carryover_core::handle::ResourceKind;
use carryover_core::item::{FrameId, ItemKey};
use carryover_core::trace::{
    CommitEvent, DiscardFlushEvent, EmptyTransactionEvent, IncompleteEvent, ItemBoundEvent,
    ItemSkippedEvent, TraceSink, TransactionBeginEvent, TransportErrorEvent,
};

// ---------------------------------------------------------------------------
// Event type discriminants
// ---------------------------------------------------------------------------

const TAG_TRANSACTION_BEGIN: u8 = 1;
const TAG_ITEM_BOUND: u8 = 2;
const TAG_ITEM_SKIPPED: u8 = 3;
const TAG_COMMIT: u8 = 4;
const TAG_INCOMPLETE: u8 = 5;
const TAG_EMPTY_TRANSACTION: u8 = 6;
const TAG_DISCARD_FLUSH: u8 = 7;
const TAG_TRANSPORT_ERROR: u8 = 8;

// ---------------------------------------------------------------------------
// RecorderSink
// ---------------------------------------------------------------------------

/// A [`TraceSink`] that encodes events into a compact binary buffer.
#[derive(Debug, Default)]
pub struct RecorderSink {
    buf: Vec<u8>,
}

impl RecorderSink {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a view of the recorded bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Consumes the recorder and returns the recorded bytes.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    // -- encoding helpers --------------------------------------------------

    fn write_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    fn write_u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_u64(&mut self, v: u64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_item(&mut self, item: ItemKey) {
        self.write_u64(item.frame.0);
        self.write_u32(item.per_frame_key);
    }

    fn write_kind(&mut self, kind: ResourceKind) {
        self.write_u8(match kind {
            ResourceKind::Image => 0,
            ResourceKind::Animation => 1,
        });
    }

    fn write_lookup(&mut self, lookup: CacheLookup) {
        self.write_u8(match lookup {
            CacheLookup::Hit => 0,
            CacheLookup::Recycled => 1,
            CacheLookup::Created => 2,
        });
    }
}

impl TraceSink for RecorderSink {
    fn on_transaction_begin(&mut self, e: &TransactionBeginEvent) {
        self.write_u8(TAG_TRANSACTION_BEGIN);
        self.write_u64(e.transaction.0);
        self.write_u32(e.recyclable);
    }

    fn on_item_bound(&mut self, e: &ItemBoundEvent) {
        self.write_u8(TAG_ITEM_BOUND);
        self.write_u64(e.transaction.0);
        self.write_item(e.item);
        self.write_kind(e.kind);
        self.write_lookup(e.lookup);
    }

    fn on_item_skipped(&mut self, e: &ItemSkippedEvent) {
        self.write_u8(TAG_ITEM_SKIPPED);
        self.write_u64(e.transaction.0);
        self.write_item(e.item);
        self.write_kind(e.kind);
    }

    fn on_commit(&mut self, e: &CommitEvent) {
        self.write_u8(TAG_COMMIT);
        self.write_u64(e.transaction.0);
        self.write_u32(e.commands);
        self.write_u32(e.resource_updates);
        self.write_u32(e.skipped);
        self.write_u32(e.evicted);
    }

    fn on_incomplete(&mut self, e: &IncompleteEvent) {
        self.write_u8(TAG_INCOMPLETE);
        self.write_u64(e.transaction.0);
        self.write_u32(e.commands_dropped);
    }

    fn on_empty_transaction(&mut self, e: &EmptyTransactionEvent) {
        self.write_u8(TAG_EMPTY_TRANSACTION);
        self.write_u64(e.transaction.0);
        self.write_u8(u8::from(e.reused));
    }

    fn on_discard_flush(&mut self, e: &DiscardFlushEvent) {
        self.write_u8(TAG_DISCARD_FLUSH);
        self.write_u64(e.transaction.0);
        self.write_u32(e.discarded);
    }

    fn on_transport_error(&mut self, e: &TransportErrorEvent) {
        self.write_u8(TAG_TRANSPORT_ERROR);
        self.write_u64(e.transaction.0);
        self.write_u8(match e.stage {
            SendStage::Commands => 0,
            SendStage::Discards => 1,
        });
    }
}

// ---------------------------------------------------------------------------
// Decoder
// ---------------------------------------------------------------------------

/// A decoded event from a binary recording.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RecordedEvent {
    /// A [`TransactionBeginEvent`].
    TransactionBegin(TransactionBeginEvent),
    /// An [`ItemBoundEvent`].
    ItemBound(ItemBoundEvent),
    /// An [`ItemSkippedEvent`].
    ItemSkipped(ItemSkippedEvent),
    /// A [`CommitEvent`].
    Commit(CommitEvent),
    /// An [`IncompleteEvent`].
    Incomplete(IncompleteEvent),
    /// An [`EmptyTransactionEvent`].
    EmptyTransaction(EmptyTransactionEvent),
    /// A [`DiscardFlushEvent`].
    DiscardFlush(DiscardFlushEvent),
    /// A [`TransportErrorEvent`].
    TransportError(TransportErrorEvent),
}

impl RecordedEvent {
    /// The transaction this event belongs to.
    #[must_use]
    pub fn transaction(&self) -> TransactionId {
        match self {
            Self::TransactionBegin(e) => e.transaction,
            Self::ItemBound(e) => e.transaction,
            Self::ItemSkipped(e) => e.transaction,
            Self::Commit(e) => e.transaction,
            Self::Incomplete(e) => e.transaction,
            Self::EmptyTransaction(e) => e.transaction,
            Self::DiscardFlush(e) => e.transaction,
            Self::TransportError(e) => e.transaction,
        }
    }
}

/// Decodes a byte slice produced by [`RecorderSink`] into an iterator of
/// [`RecordedEvent`].
pub fn decode(bytes: &[u8]) -> DecodeIter<'_> {
    DecodeIter {
        data: bytes,
        pos: 0,
    }
}

/// Iterator over decoded events.
#[derive(Debug)]
pub struct DecodeIter<'a> {
    data: &'a [u8],
    pos: usize,
}

impl DecodeIter<'_> {
    fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    fn read_u8(&mut self) -> Option<u8> {
        if self.remaining() < 1 {
            return None;
        }
        let v = self.data[self.pos];
        self.pos += 1;
        Some(v)
    }

    fn read_u32(&mut self) -> Option<u32> {
        if self.remaining() < 4 {
            return None;
        }
        let v = u32::from_le_bytes(self.data[self.pos..self.pos + 4].try_into().ok()?);
        self.pos += 4;
        Some(v)
    }

    fn read_u64(&mut self) -> Option<u64> {
        if self.remaining() < 8 {
            return None;
        }
        let v = u64::from_le_bytes(self.data[self.pos..self.pos + 8].try_into().ok()?);
        self.pos += 8;
        Some(v)
    }

    fn read_transaction(&mut self) -> Option<TransactionId> {
        self.read_u64().map(TransactionId)
    }

    fn read_item(&mut self) -> Option<ItemKey> {
        let frame = FrameId(self.read_u64()?);
        Some(ItemKey::new(frame, self.read_u32()?))
    }

    fn read_kind(&mut self) -> Option<ResourceKind> {
        Some(match self.read_u8()? {
            0 => ResourceKind::Image,
            _ => ResourceKind::Animation,
        })
    }

    fn read_lookup(&mut self) -> Option<CacheLookup> {
        Some(match self.read_u8()? {
            0 => CacheLookup::Hit,
            1 => CacheLookup::Recycled,
            _ => CacheLookup::Created,
        })
    }

    fn decode_transaction_begin(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::TransactionBegin(TransactionBeginEvent {
            transaction: self.read_transaction()?,
            recyclable: self.read_u32()?,
        }))
    }

    fn decode_item_bound(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::ItemBound(ItemBoundEvent {
            transaction: self.read_transaction()?,
            item: self.read_item()?,
            kind: self.read_kind()?,
            lookup: self.read_lookup()?,
        }))
    }

    fn decode_item_skipped(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::ItemSkipped(ItemSkippedEvent {
            transaction: self.read_transaction()?,
            item: self.read_item()?,
            kind: self.read_kind()?,
        }))
    }

    fn decode_commit(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::Commit(CommitEvent {
            transaction: self.read_transaction()?,
            commands: self.read_u32()?,
            resource_updates: self.read_u32()?,
            skipped: self.read_u32()?,
            evicted: self.read_u32()?,
        }))
    }

    fn decode_incomplete(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::Incomplete(IncompleteEvent {
            transaction: self.read_transaction()?,
            commands_dropped: self.read_u32()?,
        }))
    }

    fn decode_empty_transaction(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::EmptyTransaction(EmptyTransactionEvent {
            transaction: self.read_transaction()?,
            reused: self.read_u8()? != 0,
        }))
    }

    fn decode_discard_flush(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::DiscardFlush(DiscardFlushEvent {
            transaction: self.read_transaction()?,
            discarded: self.read_u32()?,
        }))
    }

    fn decode_transport_error(&mut self) -> Option<RecordedEvent> {
        let transaction = self.read_transaction()?;
        let stage = match self.read_u8()? {
            0 => SendStage::Commands,
            _ => SendStage::Discards,
        };
        Some(RecordedEvent::TransportError(TransportErrorEvent {
            transaction,
            stage,
        }))
    }
}

impl Iterator for DecodeIter<'_> {
    type Item = RecordedEvent;

    fn next(&mut self) -> Option<Self::Item> {
        let tag = self.read_u8()?;
        match tag {
            TAG_TRANSACTION_BEGIN => self.decode_transaction_begin(),
            TAG_ITEM_BOUND => self.decode_item_bound(),
            TAG_ITEM_SKIPPED => self.decode_item_skipped(),
            TAG_COMMIT => self.decode_commit(),
            TAG_INCOMPLETE => self.decode_incomplete(),
            TAG_EMPTY_TRANSACTION => self.decode_empty_transaction(),
            TAG_DISCARD_FLUSH => self.decode_discard_flush(),
            TAG_TRANSPORT_ERROR => self.decode_transport_error(),
            _ => None, // unknown tag → stop iteration
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
