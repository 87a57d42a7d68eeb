//! # batchdex-types
//!
//! Shared types, errors, configuration and the epoch clock for the
//! **batchdex** exchange ledger simulator.
//!
//! This crate is the leaf dependency of the workspace. It defines:
//!
//! - **Identifiers**: [`BatchId`], [`TokenId`], [`OrderId`], [`TxHash`], plus the
//!   [`UserAddress`], [`TokenAddress`] and [`Amount`] aliases
//! - **Balance model**: [`Flux`], [`BalanceRecord`]
//! - **Order model**: [`Order`], [`OrderStatus`]
//! - **Receipt model**: [`Receipt`], [`OperationKind`]
//! - **Epoch clock**: [`EpochClock`], [`TimeSource`], [`SystemTimeSource`], [`ManualTimeSource`]
//! - **Configuration**: [`ExchangeConfig`], [`SettlementConfig`]
//! - **Errors**: [`BatchdexError`] with `BDX_ERR_` prefix codes
//! - **Constants**: system-wide limits and defaults

pub mod balance;
pub mod config;
pub mod constants;
pub mod epoch;
pub mod error;
pub mod ids;
pub mod order;
pub mod receipt;

#[cfg(any(test, feature = "test-helpers"))]
pub mod fixtures;

pub use balance::*;
pub use config::*;
pub use epoch::*;
pub use error::*;
pub use ids::*;
pub use order::*;
pub use receipt::*;

// Constants are accessed via `batchdex_types::constants::FOO`
// (not re-exported to avoid name collisions).
