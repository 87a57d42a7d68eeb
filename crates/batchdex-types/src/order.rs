//! Standing orders of the batch exchange.
//!
//! Validity is a window of batch ids, not wall-clock time. Cancelling an
//! order never removes it: it pulls `valid_until` back so the order is
//! already expired in the batch where it was cancelled.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{Amount, BatchId, TokenId};

/// Where an order stands relative to a given batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderStatus {
    /// The batch precedes `valid_from`.
    Scheduled,
    /// `valid_from <= batch <= valid_until`.
    Active,
    /// The window ran out naturally.
    Expired,
    /// The window was cut short by the owner.
    Cancelled,
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Scheduled => write!(f, "SCHEDULED"),
            Self::Active => write!(f, "ACTIVE"),
            Self::Expired => write!(f, "EXPIRED"),
            Self::Cancelled => write!(f, "CANCELLED"),
        }
    }
}

/// A standing limit order: sell up to `remaining_amount` of `sell_token`
/// for `buy_token` at no worse than `price_numerator / price_denominator`
/// units bought per unit sold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub buy_token: TokenId,
    pub sell_token: TokenId,
    pub valid_from: BatchId,
    /// Only ever decreased, by cancellation.
    pub valid_until: BatchId,
    pub price_numerator: Amount,
    pub price_denominator: Amount,
    pub remaining_amount: Amount,
    /// Batch of the first cancellation that cut the window short.
    pub cancelled_at: Option<BatchId>,
}

impl Order {
    #[must_use]
    pub fn status_at(&self, batch: BatchId) -> OrderStatus {
        if self.cancelled_at.is_some_and(|at| batch >= at) {
            OrderStatus::Cancelled
        } else if batch < self.valid_from {
            OrderStatus::Scheduled
        } else if batch > self.valid_until {
            OrderStatus::Expired
        } else {
            OrderStatus::Active
        }
    }

    #[must_use]
    pub fn is_active_at(&self, batch: BatchId) -> bool {
        self.status_at(batch) == OrderStatus::Active
    }

    /// Limit price as a decimal, when both sides of the ratio fit in 64 bits
    /// and the denominator is non-zero.
    #[must_use]
    pub fn limit_price(&self) -> Option<Decimal> {
        let numerator = u64::try_from(self.price_numerator).ok()?;
        let denominator = u64::try_from(self.price_denominator).ok()?;
        Decimal::from(numerator).checked_div(Decimal::from(denominator))
    }
}

/// Test helpers.
#[cfg(any(test, feature = "test-helpers"))]
impl Order {
    pub fn dummy(valid_from: u64, valid_until: u64) -> Self {
        Self {
            buy_token: TokenId(0),
            sell_token: TokenId(1),
            valid_from: BatchId(valid_from),
            valid_until: BatchId(valid_until),
            price_numerator: Amount::from(100u64),
            price_denominator: Amount::from(50u64),
            remaining_amount: Amount::from(50u64),
            cancelled_at: None,
        }
    }
}
