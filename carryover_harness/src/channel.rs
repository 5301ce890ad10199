// Copyright 2026 the Carryover Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! An in-memory [`RemoteChannel`] that records every accepted message.

use alloc::vec::Vec;

use carryover_core::channel::{ChannelError, RemoteChannel};
use carryover_core::command::CommandBuffer;
use carryover_core::ledger::DiscardBatch;

/// Runtime fault toggles for transport-failure tests.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FaultToggles {
    /// Command buffers are refused.
    pub fail_commands: bool,
    /// Discard batches are refused.
    pub fail_discards: bool,
}

/// A message accepted by a [`RecordingChannel`].
#[derive(Clone, Debug)]
pub enum Message {
    /// A transaction's command buffer.
    Commands(CommandBuffer),
    /// A discard batch.
    Discards(DiscardBatch),
}

/// Records accepted messages in send order.
///
/// Refused messages are not recorded, only counted.
#[derive(Debug, Default)]
pub struct RecordingChannel {
    log: Vec<Message>,
    faults: FaultToggles,
    refused: u32,
}

impl RecordingChannel {
    /// Creates a channel that accepts everything.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the fault toggles.
    pub fn set_faults(&mut self, faults: FaultToggles) {
        self.faults = faults;
    }

    /// Current fault toggles.
    #[must_use]
    pub fn faults(&self) -> FaultToggles {
        self.faults
    }

    /// Every accepted message, oldest first.
    #[must_use]
    pub fn messages(&self) -> &[Message] {
        &self.log
    }

    /// Removes and returns the accepted messages.
    pub fn take_messages(&mut self) -> Vec<Message> {
        core::mem::take(&mut self.log)
    }

    /// Accepted command buffers, oldest first.
    pub fn command_buffers(&self) -> impl Iterator<Item = &CommandBuffer> + '_ {
        self.log.iter().filter_map(|m| match m {
            Message::Commands(buffer) => Some(buffer),
            Message::Discards(_) => None,
        })
    }

    /// Accepted discard batches, oldest first.
    pub fn discard_batches(&self) -> impl Iterator<Item = &DiscardBatch> + '_ {
        self.log.iter().filter_map(|m| match m {
            Message::Discards(batch) => Some(batch),
            Message::Commands(_) => None,
        })
    }

    /// The most recently accepted command buffer.
    #[must_use]
    pub fn last_commands(&self) -> Option<&CommandBuffer> {
        self.command_buffers().last()
    }

    /// Number of refused messages.
    #[must_use]
    pub fn refused(&self) -> u32 {
        self.refused
    }
}

impl RemoteChannel for RecordingChannel {
    fn send_commands(&mut self, buffer: &CommandBuffer) -> Result<(), ChannelError> {
        if self.faults.fail_commands {
            self.refused += 1;
            return Err(ChannelError::Closed);
        }
        self.log.push(Message::Commands(buffer.clone()));
        Ok(())
    }

    fn send_discards(&mut self, batch: &DiscardBatch) -> Result<(), ChannelError> {
        if self.faults.fail_discards {
            self.refused += 1;
            return Err(ChannelError::Closed);
        }
        self.log.push(Message::Discards(batch.clone()));
        Ok(())
    }
}
