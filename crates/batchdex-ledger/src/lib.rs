//! # batchdex-ledger
//!
//! The state machine of the epoch token locker / batch exchange:
//!
//! 1. **BalanceLedger**: settled balances plus pending deposit and
//!    withdraw fluxes per (user, token), quantized to batch ids
//! 2. **TokenRegistry**: dense token ids with a fixed capacity
//! 3. **OrderBook**: per-user append-only order lists with soft
//!    cancellation
//! 4. **TokenTransfer**: the external wallet capability deposits and
//!    claims move funds through, with an in-memory implementation
//!
//! ## Operation Flow
//!
//! ```text
//! deposit          → roll forward elapsed deposit → add to pending → wallet: user → exchange
//! request_withdraw → roll forward elapsed deposit → overwrite pending withdraw
//! withdraw         → roll forward → checks → min(requested, settled) → wallet: exchange → user
//! ```
//!
//! Every component reads the current batch from its own `EpochClock`
//! handle; none of them keep time themselves.

pub mod balance_ledger;
pub mod order_book;
pub mod token_registry;
pub mod transfer;

pub use balance_ledger::BalanceLedger;
pub use order_book::OrderBook;
pub use token_registry::TokenRegistry;
pub use transfer::{InMemoryWallet, TokenTransfer};
