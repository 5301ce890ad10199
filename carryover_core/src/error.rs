// Copyright 2026 the Carryover Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Transaction-level errors.
//!
//! Expected "not ready" conditions are not errors; they surface as `None`
//! from handle updates and as skipped items. The variants here are either
//! integration bugs (invalid state) or transport failures.

use core::fmt;

use crate::channel::ChannelError;
use crate::command::TransactionId;

/// Which message failed to send.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SendStage {
    /// The command buffer.
    Commands,
    /// The discard batch.
    Discards,
}

impl fmt::Display for SendStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Commands => "command buffer",
            Self::Discards => "discard batch",
        })
    }
}

/// Errors from [`TransactionCoordinator`](crate::coordinator::TransactionCoordinator)
/// operations.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum TransactionError {
    /// A transaction was started while another is still building.
    #[error("transaction {0:?} is already building")]
    AlreadyBuilding(TransactionId),
    /// The operation needs a building transaction and there is none.
    #[error("no transaction is building")]
    NotBuilding,
    /// The transaction token does not belong to the building transaction.
    #[error("transaction {got:?} is not the building transaction {expected:?}")]
    StaleTransaction {
        /// The building transaction.
        expected: TransactionId,
        /// The token presented.
        got: TransactionId,
    },
    /// The coordinator was destroyed.
    #[error("coordinator has been destroyed")]
    Destroyed,
    /// A message could not be delivered. Local state is already committed.
    #[error("failed to send {stage} for transaction {transaction:?}")]
    Transport {
        /// Transaction being sent.
        transaction: TransactionId,
        /// Which message failed.
        stage: SendStage,
        /// Underlying channel error.
        #[source]
        source: ChannelError,
    },
}

impl TransactionError {
    /// Returns `true` for integration errors (wrong call order), as opposed to
    /// transport failures.
    #[must_use]
    pub const fn is_invalid_state(&self) -> bool {
        !matches!(self, Self::Transport { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::ToString;

    #[test]
    fn display_messages() {
        let err = TransactionError::Transport {
            transaction: TransactionId(3),
            stage: SendStage::Discards,
            source: ChannelError::Closed,
        };
        assert_eq!(
            err.to_string(),
            "failed to send discard batch for transaction TransactionId(3)"
        );
        assert!(!err.is_invalid_state());
        assert!(TransactionError::NotBuilding.is_invalid_state());
    }
}
