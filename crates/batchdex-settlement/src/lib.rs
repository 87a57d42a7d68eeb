//! # batchdex-settlement
//!
//! **Finality side** of the simulator: delayed settlement of accepted
//! operations, and the [`ExchangeService`] that composes the ledger,
//! token registry and order book behind one epoch clock.
//!
//! ## Two-stage results
//!
//! Every mutating call returns a [`PendingSettlement`] right after the
//! ledger accepted it:
//! 1. `submitted().await` resolves once the simulated transaction is sent
//! 2. `settled().await` resolves with the [`Receipt`](batchdex_types::Receipt)
//!
//! Rejected operations fail synchronously and never produce either stage.

pub mod service;
pub mod stub;

pub use service::ExchangeService;
pub use stub::{PendingSettlement, SettlementEvent, SettlementStub};
