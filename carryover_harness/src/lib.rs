// Copyright 2026 the Carryover Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Test doubles for driving carryover transactions end to end.
//!
//! - [`RecordingChannel`] — a [`RemoteChannel`](carryover_core::channel::RemoteChannel)
//!   that keeps every accepted message and can be told to refuse them via
//!   [`FaultToggles`].
//! - [`RemoteMirror`] — replays recorded messages against a model of the
//!   remote resource tables and reports [`Violation`]s such as dangling
//!   references, double discards and leaks.
//! - [`ScriptedProducer`] — a [`DisplayListProducer`](carryover_core::item::DisplayListProducer)
//!   fed by hand, one frame at a time.

#![no_std]

extern crate alloc;

mod channel;
mod mirror;
mod producer;

#[cfg(test)]
mod scenarios;

pub use channel::{FaultToggles, Message, RecordingChannel};
pub use mirror::{AnimationRecord, ImageRecord, RemoteMirror, Violation};
pub use producer::ScriptedProducer;
