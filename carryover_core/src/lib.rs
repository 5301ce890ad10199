// Copyright 2026 the Carryover Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Cross-frame resource reuse for retained-mode compositing.
//!
//! `carryover_core` binds paint-time display items to remote GPU resources
//! (image keys, animation ids, async pipelines). Frames are usually nearly
//! identical, so resources are recycled from the previous transaction
//! whenever the same item appears again, and everything that disappears is
//! explicitly discarded on the remote process. It is `no_std` compatible
//! (with `alloc`).
//!
//! # Architecture
//!
//! ```text
//!   DisplayListProducer
//!       │ items, mutated frames
//!       ▼
//!   TransactionCoordinator ──► ItemResourceCache::get_or_create()
//!       │                              │
//!       │                              ▼
//!       │                      ResourceHandle::update_for_source()
//!       │                              │ ResourceUpdate
//!       ▼                              ▼
//!   CommandBuffer ─────────────► RemoteChannel::send_commands()
//!       │
//!       ▼ end_transaction
//!   cache rotation ──► DiscardLedger ──► RemoteChannel::send_discards()
//! ```
//!
//! **[`item`]** — Display items, their composite [`ItemKey`](item::ItemKey)
//! identity, and the [`DisplayListProducer`](item::DisplayListProducer) trait.
//!
//! **[`source`]** — Image and animation sources with content generations.
//!
//! **[`resource`]** — Remote identifiers and the
//! [`ResourceAllocator`](resource::ResourceAllocator) that hands them out.
//!
//! **[`handle`]** — Per-item resource handles in a generational arena. Each
//! handle owns at most one remote identifier and decides whether its remote
//! resource is stale.
//!
//! **[`cache`]** — Two-generation item-to-handle cache with a rollback
//! journal for abandoned transactions.
//!
//! **[`ledger`]** — Identifiers awaiting discard, cleared only after the
//! remote side accepted them.
//!
//! **[`command`]** — Command buffers and resource updates.
//!
//! **[`coordinator`]** — The transaction state machine that ties the above
//! together, including empty-transaction reuse.
//!
//! **[`channel`]** — The [`RemoteChannel`](channel::RemoteChannel) transport
//! seam.
//!
//! **[`trace`]** — [`TraceSink`](trace::TraceSink) trait and event types for
//! transaction instrumentation, with zero-overhead
//! [`Tracer`](trace::Tracer) wrapper.
//!
//! # Crate features
//!
//! - `std` (disabled by default): Enables `std` support in dependencies.
//! - `trace` (disabled by default): Enables `Tracer` method bodies (one branch
//!   per call site).
//! - `trace-rich` (disabled by default, implies `trace`): Gates per-item
//!   binding events.

#![no_std]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

extern crate alloc;

pub mod cache;
pub mod channel;
pub mod command;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod handle;
pub mod item;
pub mod ledger;
pub mod resource;
pub mod source;
pub mod trace;
