// Copyright 2026 the Carryover Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Coordinator configuration.

/// Configuration for the [`TransactionCoordinator`](crate::coordinator::TransactionCoordinator).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CoordinatorConfig {
    /// Whether unchanged frames may re-send the last built command list
    /// instead of rebuilding it.
    pub empty_transactions: bool,
    /// Initial command capacity of each new command buffer.
    pub command_capacity: usize,
    /// Initial capacity of the discard ledger.
    pub ledger_capacity: usize,
}

impl CoordinatorConfig {
    /// Default configuration: empty transactions enabled.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            empty_transactions: true,
            command_capacity: 64,
            ledger_capacity: 16,
        }
    }

    /// Configuration that always rebuilds.
    ///
    /// Useful when the producer cannot report mutated frames reliably.
    #[must_use]
    pub const fn always_rebuild() -> Self {
        Self {
            empty_transactions: false,
            ..Self::new()
        }
    }
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self::new()
    }
}
