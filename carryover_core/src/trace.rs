// Copyright 2026 the Carryover Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tracing and diagnostics for transactions.
//!
//! This module provides a [`TraceSink`] trait with per-event methods that the
//! [`TransactionCoordinator`](crate::coordinator::TransactionCoordinator)
//! calls at each stage. All method bodies default to no-ops, so implementing
//! only the events you care about is fine.
//!
//! [`Tracer`] wraps an optional `&mut dyn TraceSink`. When the `trace` feature
//! is **off**, every `Tracer` method compiles to nothing (zero overhead). When
//! **on**, each method performs a single `Option` branch before dispatching.
//!
//! # Crate features
//!
//! - `trace` — enables the `Tracer` method bodies (one branch per call).
//! - `trace-rich` (implies `trace`) — gates the per-item [`ItemBoundEvent`]
//!   and the corresponding `TraceSink` method.

use crate::command::TransactionId;
use crate::error::SendStage;
use crate::handle::ResourceKind;
use crate::item::ItemKey;

#[cfg(feature = "trace-rich")]
use crate::cache::CacheLookup;

// ---------------------------------------------------------------------------
// Event structs
// ---------------------------------------------------------------------------

/// Emitted when a transaction starts building.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TransactionBeginEvent {
    /// The new transaction.
    pub transaction: TransactionId,
    /// Entries available for recycling.
    pub recyclable: u32,
}

/// Emitted for every resource-backed item (requires `trace-rich`).
#[cfg(feature = "trace-rich")]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ItemBoundEvent {
    /// Transaction being built.
    pub transaction: TransactionId,
    /// The item.
    pub item: ItemKey,
    /// Resource kind requested.
    pub kind: ResourceKind,
    /// How the cache served the request.
    pub lookup: CacheLookup,
}

/// Emitted when an item's source was not ready and no command was emitted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ItemSkippedEvent {
    /// Transaction being built.
    pub transaction: TransactionId,
    /// The skipped item.
    pub item: ItemKey,
    /// Resource kind the item needed.
    pub kind: ResourceKind,
}

/// Emitted when a transaction commits.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CommitEvent {
    /// Committed transaction.
    pub transaction: TransactionId,
    /// Draw commands sent.
    pub commands: u32,
    /// Resource updates sent.
    pub resource_updates: u32,
    /// Items skipped as not ready.
    pub skipped: u32,
    /// Handles evicted by generation rotation.
    pub evicted: u32,
}

/// Emitted when a transaction is abandoned.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IncompleteEvent {
    /// Abandoned transaction.
    pub transaction: TransactionId,
    /// Draw commands thrown away.
    pub commands_dropped: u32,
}

/// Emitted for every empty-transaction attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EmptyTransactionEvent {
    /// The new transaction if reused, otherwise the last built one.
    pub transaction: TransactionId,
    /// Whether the previous command list was re-sent.
    pub reused: bool,
}

/// Emitted after a discard batch was accepted by the channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DiscardFlushEvent {
    /// Transaction the batch follows.
    pub transaction: TransactionId,
    /// Identifiers sent.
    pub discarded: u32,
}

/// Emitted when the channel refuses a message.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TransportErrorEvent {
    /// Transaction being sent.
    pub transaction: TransactionId,
    /// Which message failed.
    pub stage: SendStage,
}

/// Saturating conversion for event counters.
pub(crate) fn count(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

// ---------------------------------------------------------------------------
// TraceSink trait
// ---------------------------------------------------------------------------

/// Receives trace events from the coordinator.
///
/// All methods have default no-op implementations, so you only need to
/// override the events you care about.
pub trait TraceSink {
    /// Called when a transaction starts building.
    fn on_transaction_begin(&mut self, e: &TransactionBeginEvent) {
        _ = e;
    }

    /// Called for each resource-backed item (requires `trace-rich` feature).
    #[cfg(feature = "trace-rich")]
    fn on_item_bound(&mut self, e: &ItemBoundEvent) {
        _ = e;
    }

    /// Called when an item is skipped.
    fn on_item_skipped(&mut self, e: &ItemSkippedEvent) {
        _ = e;
    }

    /// Called when a transaction commits.
    fn on_commit(&mut self, e: &CommitEvent) {
        _ = e;
    }

    /// Called when a transaction is abandoned.
    fn on_incomplete(&mut self, e: &IncompleteEvent) {
        _ = e;
    }

    /// Called for each empty-transaction attempt.
    fn on_empty_transaction(&mut self, e: &EmptyTransactionEvent) {
        _ = e;
    }

    /// Called after a discard batch was sent.
    fn on_discard_flush(&mut self, e: &DiscardFlushEvent) {
        _ = e;
    }

    /// Called when a send fails.
    fn on_transport_error(&mut self, e: &TransportErrorEvent) {
        _ = e;
    }
}

// ---------------------------------------------------------------------------
// NoopSink
// ---------------------------------------------------------------------------

/// A [`TraceSink`] that discards all events.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSink;

impl TraceSink for NoopSink {}

// ---------------------------------------------------------------------------
// Tracer wrapper
// ---------------------------------------------------------------------------

/// Thin wrapper around an optional [`TraceSink`].
///
/// When the `trace` feature is **off**, every method compiles to nothing. When
/// **on**, each method checks the inner `Option` (one branch) before
/// dispatching to the sink.
pub struct Tracer<'a> {
    #[cfg(feature = "trace")]
    sink: Option<&'a mut dyn TraceSink>,
    #[cfg(not(feature = "trace"))]
    _marker: core::marker::PhantomData<&'a mut dyn TraceSink>,
}

impl core::fmt::Debug for Tracer<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Tracer").finish_non_exhaustive()
    }
}

impl<'a> Tracer<'a> {
    /// Creates a tracer that dispatches to the given sink.
    #[inline]
    #[must_use]
    pub fn new(sink: &'a mut dyn TraceSink) -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: Some(sink) }
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = sink;
            Self {
                _marker: core::marker::PhantomData,
            }
        }
    }

    /// Creates a tracer that discards all events.
    #[inline]
    #[must_use]
    pub fn none() -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: None }
        }
        #[cfg(not(feature = "trace"))]
        {
            Self {
                _marker: core::marker::PhantomData,
            }
        }
    }

    /// Emits a [`TransactionBeginEvent`].
    #[inline]
    pub fn transaction_begin(&mut self, e: &TransactionBeginEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_transaction_begin(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits an [`ItemBoundEvent`] (requires `trace-rich` feature).
    #[cfg(feature = "trace-rich")]
    #[inline]
    pub fn item_bound(&mut self, e: &ItemBoundEvent) {
        if let Some(s) = &mut self.sink {
            s.on_item_bound(e);
        }
    }

    /// Emits an [`ItemSkippedEvent`].
    #[inline]
    pub fn item_skipped(&mut self, e: &ItemSkippedEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_item_skipped(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`CommitEvent`].
    #[inline]
    pub fn commit(&mut self, e: &CommitEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_commit(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits an [`IncompleteEvent`].
    #[inline]
    pub fn incomplete(&mut self, e: &IncompleteEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_incomplete(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits an [`EmptyTransactionEvent`].
    #[inline]
    pub fn empty_transaction(&mut self, e: &EmptyTransactionEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_empty_transaction(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`DiscardFlushEvent`].
    #[inline]
    pub fn discard_flush(&mut self, e: &DiscardFlushEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_discard_flush(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`TransportErrorEvent`].
    #[inline]
    pub fn transport_error(&mut self, e: &TransportErrorEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_transport_error(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
