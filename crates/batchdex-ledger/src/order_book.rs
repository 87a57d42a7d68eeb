//! Per-user standing order lists.
//!
//! Each user owns an append-only list; an order's id is its position in
//! that list. Orders are never removed. Cancelling one pulls its
//! `valid_until` back to the batch before the cancellation, which makes
//! it expired from the cancellation batch on.

use std::collections::HashMap;

use batchdex_types::{
    Amount, BatchId, EpochClock, Order, OrderId, Result, TokenAddress, TokenId, UserAddress,
};

use crate::token_registry::TokenRegistry;

/// Per-user order lists; an order's position in its list is its id.
pub struct OrderBook {
    clock: EpochClock,
    orders: HashMap<UserAddress, Vec<Order>>,
}

impl OrderBook {
    #[must_use]
    pub fn new(clock: EpochClock) -> Self {
        Self {
            clock,
            orders: HashMap::new(),
        }
    }

    /// Append an order valid from the current batch through `valid_until`.
    ///
    /// The limit price is `buy_amount / sell_amount` and the whole
    /// `sell_amount` is initially tradable. Token ids are taken as given.
    pub fn place_order(
        &mut self,
        user: UserAddress,
        buy_token: TokenId,
        sell_token: TokenId,
        valid_until: BatchId,
        buy_amount: Amount,
        sell_amount: Amount,
    ) -> OrderId {
        let current = self.clock.current_batch_id();
        let list = self.orders.entry(user).or_default();
        let id = OrderId(list.len());
        list.push(Order {
            buy_token,
            sell_token,
            valid_from: current,
            valid_until,
            price_numerator: buy_amount,
            price_denominator: sell_amount,
            remaining_amount: sell_amount,
            cancelled_at: None,
        });

        tracing::debug!(
            user = %user,
            order = %id,
            buy = %buy_token,
            sell = %sell_token,
            valid_from = current.0,
            valid_until = valid_until.0,
            "Order placed"
        );
        id
    }

    /// Like [`OrderBook::place_order`], resolving token addresses through
    /// `registry` first.
    ///
    /// # Errors
    /// Returns `TokenNotFound` if either token is unregistered.
    #[allow(clippy::too_many_arguments)]
    pub fn place_order_for_tokens(
        &mut self,
        registry: &TokenRegistry,
        user: UserAddress,
        buy_token: TokenAddress,
        sell_token: TokenAddress,
        valid_until: BatchId,
        buy_amount: Amount,
        sell_amount: Amount,
    ) -> Result<OrderId> {
        let buy = registry.id_for(buy_token)?;
        let sell = registry.id_for(sell_token)?;
        Ok(self.place_order(user, buy, sell, valid_until, buy_amount, sell_amount))
    }

    /// Expire `order_id` as of the current batch.
    ///
    /// Unknown ids are ignored. Cancelling never extends a window, so
    /// repeating it, or cancelling an already expired order, changes
    /// nothing. Returns whether the order exists.
    pub fn cancel_order(&mut self, user: UserAddress, order_id: OrderId) -> bool {
        let current = self.clock.current_batch_id();
        let Some(order) = self
            .orders
            .get_mut(&user)
            .and_then(|list| list.get_mut(order_id.0))
        else {
            tracing::debug!(user = %user, order = %order_id, "Cancel of unknown order ignored");
            return false;
        };

        if order.valid_until < current {
            return true;
        }
        // Batch 0 has no predecessor; `cancelled_at` marks the order instead.
        let cutoff = current.prev().unwrap_or(current);
        order.valid_until = order.valid_until.min(cutoff);
        order.cancelled_at.get_or_insert(current);

        tracing::debug!(
            user = %user,
            order = %order_id,
            valid_until = order.valid_until.0,
            "Order cancelled"
        );
        true
    }

    /// Cancel several orders at once. Returns how many ids existed.
    pub fn cancel_orders(&mut self, user: UserAddress, order_ids: &[OrderId]) -> usize {
        order_ids
            .iter()
            .filter(|id| self.cancel_order(user, **id))
            .count()
    }

    /// Every order `user` ever placed, expired and cancelled ones included.
    #[must_use]
    pub fn get_orders(&self, user: UserAddress) -> Vec<Order> {
        self.orders(user).to_vec()
    }

    #[must_use]
    pub fn orders(&self, user: UserAddress) -> &[Order] {
        self.orders.get(&user).map_or(&[], Vec::as_slice)
    }

    /// Orders of `user` that are live in `batch`, with their ids.
    #[must_use]
    pub fn active_orders(&self, user: UserAddress, batch: BatchId) -> Vec<(OrderId, Order)> {
        self.orders(user)
            .iter()
            .enumerate()
            .filter(|(_, order)| order.is_active_at(batch))
            .map(|(idx, order)| (OrderId(idx), order.clone()))
            .collect()
    }

    #[must_use]
    pub fn order_count(&self, user: UserAddress) -> usize {
        self.orders(user).len()
    }
}
