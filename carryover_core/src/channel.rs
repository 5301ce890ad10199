// Copyright 2026 the Carryover Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Contract for the transport to the remote rendering process.
//!
//! The core sends two kinds of message: a [`CommandBuffer`] per transaction
//! and a [`DiscardBatch`] after it. Neither needs a synchronous reply. The
//! only guarantee the core relies on is FIFO delivery per channel: a discard
//! batch must never be applied before the command buffer sent ahead of it.

use crate::command::CommandBuffer;
use crate::ledger::DiscardBatch;

/// Transport failure reported by a [`RemoteChannel`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ChannelError {
    /// The remote process is gone.
    #[error("remote channel closed")]
    Closed,
    /// The transport refused the message.
    #[error("remote channel rejected message (code {0})")]
    Rejected(u32),
}

/// Sends messages to the remote rendering process.
///
/// Implementations must preserve send order. Retry policy, if any, belongs
/// here rather than in the core.
pub trait RemoteChannel {
    /// Sends one transaction's command buffer.
    fn send_commands(&mut self, buffer: &CommandBuffer) -> Result<(), ChannelError>;

    /// Sends a batch of identifiers to free.
    fn send_discards(&mut self, batch: &DiscardBatch) -> Result<(), ChannelError>;
}

impl<C: RemoteChannel + ?Sized> RemoteChannel for &mut C {
    fn send_commands(&mut self, buffer: &CommandBuffer) -> Result<(), ChannelError> {
        (**self).send_commands(buffer)
    }

    fn send_discards(&mut self, batch: &DiscardBatch) -> Result<(), ChannelError> {
        (**self).send_discards(batch)
    }
}
