//! Top-level exchange service.
//!
//! Owns one epoch clock, the ledger, the token registry, the order book
//! and the wallet, and routes every mutation through the settlement stub.
//!
//! All state sits behind a single `RwLock`: mutations take the write lock
//! for their whole get-or-create, roll-forward, mutate sequence, reads
//! share the read lock. The lock is released before any settlement delay
//! starts, so waiting on a receipt never blocks other callers.

use std::sync::Arc;

use batchdex_ledger::{BalanceLedger, InMemoryWallet, OrderBook, TokenRegistry, TokenTransfer};
use batchdex_types::{
    Amount, BalanceRecord, BatchId, EpochClock, ExchangeConfig, Flux, OperationKind, Order,
    OrderId, Result, TimeSource, TokenAddress, TokenId, UserAddress,
};
use tokio::sync::{RwLock, broadcast};

use crate::stub::{PendingSettlement, SettlementEvent, SettlementStub};

struct ExchangeState<W> {
    ledger: BalanceLedger,
    registry: TokenRegistry,
    book: OrderBook,
    wallet: W,
}

struct Inner<W> {
    config: ExchangeConfig,
    clock: EpochClock,
    state: RwLock<ExchangeState<W>>,
    stub: SettlementStub,
}

/// Cheaply cloneable handle on a simulated batch exchange.
pub struct ExchangeService<W = InMemoryWallet> {
    inner: Arc<Inner<W>>,
}

impl<W> Clone for ExchangeService<W> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<W> ExchangeService<W>
where
    W: TokenTransfer + Send + Sync + 'static,
{
    /// Build an exchange over `time` with an empty ledger and registry.
    ///
    /// # Errors
    /// Returns `Configuration` if `config` does not validate.
    pub fn new(config: ExchangeConfig, time: Arc<dyn TimeSource>, wallet: W) -> Result<Self> {
        config.validate()?;
        let clock = EpochClock::new(config.batch_duration_secs, time);
        let state = ExchangeState {
            ledger: BalanceLedger::new(clock.clone(), config.exchange_account),
            registry: TokenRegistry::new(config.max_tokens),
            book: OrderBook::new(clock.clone()),
            wallet,
        };
        let stub = SettlementStub::new(config.settlement.clone(), clock.clone());

        tracing::info!(
            batch_duration_secs = config.batch_duration_secs,
            max_tokens = config.max_tokens,
            exchange = %config.exchange_account,
            "Exchange service started"
        );
        Ok(Self {
            inner: Arc::new(Inner {
                config,
                clock,
                state: RwLock::new(state),
                stub,
            }),
        })
    }

    /// Build an exchange over the host's wall clock.
    pub fn with_system_clock(config: ExchangeConfig, wallet: W) -> Result<Self> {
        Self::new(config, Arc::new(batchdex_types::SystemTimeSource), wallet)
    }

    #[must_use]
    pub fn config(&self) -> &ExchangeConfig {
        &self.inner.config
    }

    /// Receive settlement progress for every operation from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<SettlementEvent> {
        self.inner.stub.subscribe()
    }

    // ---------------------------------------------------------------------
    // Epoch clock
    // ---------------------------------------------------------------------

    #[must_use]
    pub fn current_batch_id(&self) -> BatchId {
        self.inner.clock.current_batch_id()
    }

    #[must_use]
    pub fn seconds_remaining_in_batch(&self) -> u64 {
        self.inner.clock.seconds_remaining_in_batch()
    }

    #[must_use]
    pub fn batch_duration_secs(&self) -> u64 {
        self.inner.clock.batch_duration_secs()
    }

    #[must_use]
    pub fn fee_denominator(&self) -> u64 {
        self.inner.config.fee_denominator
    }

    // ---------------------------------------------------------------------
    // Balance ledger
    // ---------------------------------------------------------------------

    pub async fn get_balance(&self, user: UserAddress, token: TokenAddress) -> Amount {
        self.inner.state.read().await.ledger.get_balance(user, token)
    }

    pub async fn get_pending_deposit(&self, user: UserAddress, token: TokenAddress) -> Flux {
        self.inner
            .state
            .read()
            .await
            .ledger
            .get_pending_deposit(user, token)
    }

    pub async fn get_pending_withdraw(&self, user: UserAddress, token: TokenAddress) -> Flux {
        self.inner
            .state
            .read()
            .await
            .ledger
            .get_pending_withdraw(user, token)
    }

    pub async fn get_record(&self, user: UserAddress, token: TokenAddress) -> BalanceRecord {
        self.inner.state.read().await.ledger.get_record(user, token)
    }

    pub async fn total_locked(&self, token: TokenAddress) -> Amount {
        self.inner.state.read().await.ledger.total_locked(token)
    }

    /// Deposit `amount`; the settlement value is the batch it was recorded in.
    pub async fn deposit(
        &self,
        user: UserAddress,
        token: TokenAddress,
        amount: Amount,
    ) -> Result<PendingSettlement<BatchId>> {
        let mut state = self.inner.state.write().await;
        self.inner.stub.submit(OperationKind::Deposit, || {
            let ExchangeState { ledger, wallet, .. } = &mut *state;
            ledger.deposit(wallet, user, token, amount)
        })
    }

    pub async fn request_withdraw(
        &self,
        user: UserAddress,
        token: TokenAddress,
        amount: Amount,
    ) -> Result<PendingSettlement<BatchId>> {
        let mut state = self.inner.state.write().await;
        self.inner
            .stub
            .submit(OperationKind::RequestWithdraw, || {
                state.ledger.request_withdraw(user, token, amount)
            })
    }

    /// Claim a requested withdrawal; the settlement value is the amount paid.
    pub async fn withdraw(
        &self,
        user: UserAddress,
        token: TokenAddress,
    ) -> Result<PendingSettlement<Amount>> {
        let mut state = self.inner.state.write().await;
        self.inner.stub.submit(OperationKind::Withdraw, || {
            let ExchangeState { ledger, wallet, .. } = &mut *state;
            ledger.withdraw(wallet, user, token)
        })
    }

    // ---------------------------------------------------------------------
    // Token registry
    // ---------------------------------------------------------------------

    pub async fn register_token(&self, token: TokenAddress) -> Result<PendingSettlement<TokenId>> {
        let mut state = self.inner.state.write().await;
        self.inner
            .stub
            .submit(OperationKind::RegisterToken, || state.registry.register(token))
    }

    pub async fn token_id_for(&self, token: TokenAddress) -> Result<TokenId> {
        self.inner.state.read().await.registry.id_for(token)
    }

    pub async fn token_address_for(&self, id: TokenId) -> Result<TokenAddress> {
        self.inner.state.read().await.registry.address_for(id)
    }

    pub async fn token_count(&self) -> usize {
        self.inner.state.read().await.registry.count()
    }

    // ---------------------------------------------------------------------
    // Order book
    // ---------------------------------------------------------------------

    pub async fn place_order(
        &self,
        user: UserAddress,
        buy_token: TokenId,
        sell_token: TokenId,
        valid_until: BatchId,
        buy_amount: Amount,
        sell_amount: Amount,
    ) -> Result<PendingSettlement<OrderId>> {
        let mut state = self.inner.state.write().await;
        self.inner.stub.submit(OperationKind::PlaceOrder, || {
            Ok(state.book.place_order(
                user,
                buy_token,
                sell_token,
                valid_until,
                buy_amount,
                sell_amount,
            ))
        })
    }

    /// Place an order naming tokens by address.
    ///
    /// # Errors
    /// Returns `TokenNotFound` if either token is unregistered.
    pub async fn place_order_for_tokens(
        &self,
        user: UserAddress,
        buy_token: TokenAddress,
        sell_token: TokenAddress,
        valid_until: BatchId,
        buy_amount: Amount,
        sell_amount: Amount,
    ) -> Result<PendingSettlement<OrderId>> {
        let mut state = self.inner.state.write().await;
        self.inner.stub.submit(OperationKind::PlaceOrder, || {
            let ExchangeState { registry, book, .. } = &mut *state;
            book.place_order_for_tokens(
                registry,
                user,
                buy_token,
                sell_token,
                valid_until,
                buy_amount,
                sell_amount,
            )
        })
    }

    /// Cancel one order; the settlement value says whether it existed.
    pub async fn cancel_order(
        &self,
        user: UserAddress,
        order_id: OrderId,
    ) -> Result<PendingSettlement<bool>> {
        let mut state = self.inner.state.write().await;
        self.inner
            .stub
            .submit(OperationKind::CancelOrder, || {
                Ok(state.book.cancel_order(user, order_id))
            })
    }

    /// Cancel several orders under one receipt.
    pub async fn cancel_orders(
        &self,
        user: UserAddress,
        order_ids: &[OrderId],
    ) -> Result<PendingSettlement<usize>> {
        let mut state = self.inner.state.write().await;
        self.inner
            .stub
            .submit(OperationKind::CancelOrder, || {
                Ok(state.book.cancel_orders(user, order_ids))
            })
    }

    pub async fn get_orders(&self, user: UserAddress) -> Vec<Order> {
        self.inner.state.read().await.book.get_orders(user)
    }

    /// Orders of `user` live in the current batch.
    pub async fn active_orders(&self, user: UserAddress) -> Vec<(OrderId, Order)> {
        let batch = self.current_batch_id();
        self.inner.state.read().await.book.active_orders(user, batch)
    }

    // ---------------------------------------------------------------------
    // Wallet
    // ---------------------------------------------------------------------

    /// Run `f` against the external wallet.
    pub async fn with_wallet<R>(&self, f: impl FnOnce(&W) -> R) -> R {
        f(&self.inner.state.read().await.wallet)
    }

    /// Run `f` against the external wallet, mutably.
    pub async fn with_wallet_mut<R>(&self, f: impl FnOnce(&mut W) -> R) -> R {
        f(&mut self.inner.state.write().await.wallet)
    }
}
