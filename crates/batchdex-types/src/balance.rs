//! Balance tracking types for the epoch token locker model.
//!
//! Every (user, token) pair has a settled balance plus two pending
//! fluxes: a deposit waiting for its batch to elapse and a withdrawal
//! waiting to be claimed.

use serde::{Deserialize, Serialize};

use crate::{Amount, BatchId};

/// An amount pending application at a specific batch.
///
/// `amount == 0` is the canonical "nothing pending" state; the batch id
/// of an empty flux carries no meaning.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flux {
    pub amount: Amount,
    pub batch_id: BatchId,
}

impl Flux {
    #[must_use]
    pub fn new(amount: Amount, batch_id: BatchId) -> Self {
        Self { amount, batch_id }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.amount.is_zero()
    }

    /// Whether this flux was recorded strictly before `current`.
    #[must_use]
    pub fn is_elapsed_at(&self, current: BatchId) -> bool {
        self.batch_id < current
    }
}

/// Ledger record for a single (user, token) pair.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceRecord {
    /// Spendable balance. Grows by deposit roll-forward, shrinks by claims.
    pub settled_balance: Amount,
    /// Deposit awaiting the end of its batch.
    pub pending_deposit: Flux,
    /// Withdrawal requested but not yet claimed.
    pub pending_withdraw: Flux,
}

impl BalanceRecord {
    /// Whether the pending deposit may be rolled into the settled balance.
    #[must_use]
    pub fn deposit_is_claimable(&self, current: BatchId) -> bool {
        !self.pending_deposit.is_empty() && self.pending_deposit.is_elapsed_at(current)
    }
}
