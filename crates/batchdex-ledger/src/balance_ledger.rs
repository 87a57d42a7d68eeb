//! Two-phase balance ledger of the epoch token locker.
//!
//! Tracks per-(user, token) records with a settled balance plus a pending
//! deposit and a pending withdrawal, each stamped with a batch id:
//!
//! - a deposit becomes spendable only once its batch has elapsed, and is
//!   rolled into the settled balance by the next deposit, withdraw request
//!   or claim on the same key;
//! - a withdrawal is requested first and can be claimed only in a later
//!   batch, capped at the settled balance.
//!
//! All mutations are atomic: preconditions and the external transfer are
//! resolved against a copy of the record, which is written back only when
//! everything succeeded.

use std::collections::HashMap;

use alloy_primitives::Address;
use batchdex_types::{
    Amount, BalanceRecord, BatchId, BatchdexError, EpochClock, Flux, Result, TokenAddress,
    UserAddress,
};

use crate::transfer::TokenTransfer;

/// Source of truth for all locked balances.
pub struct BalanceLedger {
    clock: EpochClock,
    /// Account that custodies deposited tokens in the external wallet.
    exchange_account: Address,
    records: HashMap<(UserAddress, TokenAddress), BalanceRecord>,
}

impl BalanceLedger {
    #[must_use]
    pub fn new(clock: EpochClock, exchange_account: Address) -> Self {
        Self {
            clock,
            exchange_account,
            records: HashMap::new(),
        }
    }

    #[must_use]
    pub fn clock(&self) -> &EpochClock {
        &self.clock
    }

    #[must_use]
    pub fn exchange_account(&self) -> Address {
        self.exchange_account
    }

    // ---------------------------------------------------------------------
    // Reads: never fail, absent records read as zero.
    // ---------------------------------------------------------------------

    /// Settled (spendable) balance.
    #[must_use]
    pub fn get_balance(&self, user: UserAddress, token: TokenAddress) -> Amount {
        self.get_record(user, token).settled_balance
    }

    #[must_use]
    pub fn get_pending_deposit(&self, user: UserAddress, token: TokenAddress) -> Flux {
        self.get_record(user, token).pending_deposit
    }

    #[must_use]
    pub fn get_pending_withdraw(&self, user: UserAddress, token: TokenAddress) -> Flux {
        self.get_record(user, token).pending_withdraw
    }

    /// Snapshot of the full record.
    #[must_use]
    pub fn get_record(&self, user: UserAddress, token: TokenAddress) -> BalanceRecord {
        self.records
            .get(&(user, token))
            .copied()
            .unwrap_or_default()
    }

    /// Settled plus pending-deposit amounts of `token` across all users.
    ///
    /// Equals what the exchange account holds of `token` in the external
    /// wallet, as long as nothing else moves funds in or out of it.
    #[must_use]
    pub fn total_locked(&self, token: TokenAddress) -> Amount {
        self.records
            .iter()
            .filter(|((_, t), _)| *t == token)
            .fold(Amount::ZERO, |acc, (_, record)| {
                acc.saturating_add(record.settled_balance)
                    .saturating_add(record.pending_deposit.amount)
            })
    }

    /// Number of (user, token) records ever created.
    #[must_use]
    pub fn record_count(&self) -> usize {
        self.records.len()
    }

    // ---------------------------------------------------------------------
    // Keyed store
    // ---------------------------------------------------------------------

    /// The record for `(user, token)`, inserting an all-zero one if absent.
    ///
    /// This is the only place records come into existence. Deposits and
    /// withdraw requests create them; claims and reads never do.
    pub fn get_or_create(&mut self, user: UserAddress, token: TokenAddress) -> &mut BalanceRecord {
        self.records.entry((user, token)).or_default()
    }

    // ---------------------------------------------------------------------
    // Mutations
    // ---------------------------------------------------------------------

    /// Lock `amount` of `token` for `user`.
    ///
    /// 1. Roll any elapsed pending deposit into the settled balance
    /// 2. Add `amount` to the pending deposit, stamped with the current batch
    /// 3. Move `amount` from the user's wallet to the exchange account
    ///
    /// Returns the batch the deposit was recorded in.
    pub fn deposit<T: TokenTransfer + ?Sized>(
        &mut self,
        transfer: &mut T,
        user: UserAddress,
        token: TokenAddress,
        amount: Amount,
    ) -> Result<BatchId> {
        let current = self.clock.current_batch_id();
        let mut record = self.get_record(user, token);

        roll_forward(&mut record, current)?;
        record.pending_deposit.amount = record
            .pending_deposit
            .amount
            .checked_add(amount)
            .ok_or_else(|| BatchdexError::invalid_state("pending deposit overflow"))?;
        record.pending_deposit.batch_id = current;

        transfer.transfer(user, self.exchange_account, token, amount)?;
        *self.get_or_create(user, token) = record;

        tracing::info!(
            user = %user,
            token = %token,
            amount = %amount,
            batch = current.0,
            pending = %record.pending_deposit.amount,
            "Deposit recorded"
        );
        Ok(current)
    }

    /// Announce a withdrawal of `amount`, claimable from the next batch on.
    ///
    /// Rolls any elapsed pending deposit forward first. A new request
    /// replaces any earlier unclaimed one; amounts do not accumulate and no
    /// balance check happens here.
    pub fn request_withdraw(
        &mut self,
        user: UserAddress,
        token: TokenAddress,
        amount: Amount,
    ) -> Result<BatchId> {
        let current = self.clock.current_batch_id();
        let record = self.get_or_create(user, token);
        roll_forward(record, current)?;
        if !record.pending_withdraw.is_empty() {
            tracing::debug!(
                user = %user,
                token = %token,
                replaced = %record.pending_withdraw.amount,
                "Replacing unclaimed withdraw request"
            );
        }
        record.pending_withdraw = Flux::new(amount, current);

        tracing::info!(
            user = %user,
            token = %token,
            amount = %amount,
            batch = current.0,
            claimable_from = current.next().0,
            "Withdraw requested"
        );
        Ok(current)
    }

    /// Claim a previously requested withdrawal.
    ///
    /// Rolls any elapsed pending deposit forward, then pays out
    /// `min(requested, settled_balance)` to the user's wallet and returns
    /// that amount. A rejected claim leaves the record untouched, roll-forward
    /// included.
    ///
    /// # Errors
    /// - `InvalidState` if nothing was requested or the settled balance is zero
    /// - `NotYetSettled` if the request's batch has not elapsed yet
    pub fn withdraw<T: TokenTransfer + ?Sized>(
        &mut self,
        transfer: &mut T,
        user: UserAddress,
        token: TokenAddress,
    ) -> Result<Amount> {
        let current = self.clock.current_batch_id();
        let mut record = self.get_record(user, token);
        roll_forward(&mut record, current)?;

        if record.pending_withdraw.is_empty() {
            tracing::warn!(user = %user, token = %token, "Withdraw without request");
            return Err(BatchdexError::invalid_state("no pending withdraw request"));
        }
        if record.settled_balance.is_zero() {
            tracing::warn!(user = %user, token = %token, "Withdraw with zero balance");
            return Err(BatchdexError::invalid_state("settled balance is zero"));
        }
        if !record.pending_withdraw.is_elapsed_at(current) {
            tracing::warn!(
                user = %user,
                token = %token,
                requested_in = record.pending_withdraw.batch_id.0,
                current = current.0,
                "Withdraw claimed too early"
            );
            return Err(BatchdexError::NotYetSettled {
                requested_in: record.pending_withdraw.batch_id,
                current,
            });
        }

        let amount = record.pending_withdraw.amount.min(record.settled_balance);
        record.pending_withdraw.amount = Amount::ZERO;
        record.settled_balance = record
            .settled_balance
            .checked_sub(amount)
            .ok_or_else(|| BatchdexError::invalid_state("settled balance underflow"))?;

        transfer.transfer(self.exchange_account, user, token, amount)?;
        *self.get_or_create(user, token) = record;

        tracing::info!(
            user = %user,
            token = %token,
            amount = %amount,
            batch = current.0,
            remaining = %record.settled_balance,
            "Withdraw claimed"
        );
        Ok(amount)
    }
}

/// Move an elapsed pending deposit into the settled balance.
fn roll_forward(record: &mut BalanceRecord, current: BatchId) -> Result<()> {
    if !record.deposit_is_claimable(current) {
        return Ok(());
    }
    let rolled = record.pending_deposit.amount;
    record.settled_balance = record
        .settled_balance
        .checked_add(rolled)
        .ok_or_else(|| BatchdexError::invalid_state("settled balance overflow"))?;
    record.pending_deposit.amount = Amount::ZERO;

    tracing::debug!(
        amount = %rolled,
        from_batch = record.pending_deposit.batch_id.0,
        current = current.0,
        "Rolled pending deposit forward"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use batchdex_types::{
        ErrorKind, ManualTimeSource,
        fixtures::{amount, manual_clock, token, user},
    };

    use super::*;
    use crate::transfer::InMemoryWallet;

    fn exchange() -> Address {
        Address::repeat_byte(0xee)
    }

    fn setup() -> (BalanceLedger, InMemoryWallet, ManualTimeSource) {
        let (clock, time) = manual_clock(0, 300);
        let mut wallet = InMemoryWallet::new();
        wallet.mint(user(1), token(1), amount(1_000)).unwrap();
        (BalanceLedger::new(clock, exchange()), wallet, time)
    }

    #[test]
    fn missing_record_reads_as_zero() {
        let (ledger, _, _) = setup();
        assert_eq!(ledger.get_balance(user(9), token(9)), Amount::ZERO);
        assert!(ledger.get_pending_deposit(user(9), token(9)).is_empty());
        assert!(ledger.get_pending_withdraw(user(9), token(9)).is_empty());
        assert_eq!(ledger.record_count(), 0);
    }

    #[test]
    fn deposit_is_pending_within_its_batch() {
        let (mut ledger, mut wallet, _) = setup();
        let batch = ledger
            .deposit(&mut wallet, user(1), token(1), amount(100))
            .unwrap();
        assert_eq!(batch, BatchId(0));
        assert_eq!(ledger.get_balance(user(1), token(1)), Amount::ZERO);
        assert_eq!(
            ledger.get_pending_deposit(user(1), token(1)),
            Flux::new(amount(100), BatchId(0))
        );
        assert_eq!(wallet.balance_of(user(1), token(1)), amount(900));
        assert_eq!(wallet.balance_of(exchange(), token(1)), amount(100));
    }

    #[test]
    fn reads_do_not_roll_forward() {
        let (mut ledger, mut wallet, time) = setup();
        ledger
            .deposit(&mut wallet, user(1), token(1), amount(100))
            .unwrap();
        time.set(301);
        assert_eq!(ledger.get_balance(user(1), token(1)), Amount::ZERO);
        assert_eq!(ledger.get_pending_deposit(user(1), token(1)).amount, amount(100));
    }

    #[test]
    fn zero_deposit_rolls_forward() {
        let (mut ledger, mut wallet, time) = setup();
        ledger
            .deposit(&mut wallet, user(1), token(1), amount(100))
            .unwrap();
        time.set(301);
        ledger
            .deposit(&mut wallet, user(1), token(1), Amount::ZERO)
            .unwrap();
        assert_eq!(ledger.get_balance(user(1), token(1)), amount(100));
        assert_eq!(
            ledger.get_pending_deposit(user(1), token(1)),
            Flux::new(Amount::ZERO, BatchId(1))
        );
    }

    #[test]
    fn same_batch_deposits_accumulate_without_settling() {
        let (mut ledger, mut wallet, time) = setup();
        ledger
            .deposit(&mut wallet, user(1), token(1), amount(100))
            .unwrap();
        time.set(150);
        ledger
            .deposit(&mut wallet, user(1), token(1), amount(50))
            .unwrap();
        assert_eq!(ledger.get_balance(user(1), token(1)), Amount::ZERO);
        assert_eq!(
            ledger.get_pending_deposit(user(1), token(1)),
            Flux::new(amount(150), BatchId(0))
        );
    }

    #[test]
    fn deposits_across_stale_batches_sum_up() {
        let (mut ledger, mut wallet, time) = setup();
        ledger
            .deposit(&mut wallet, user(1), token(1), amount(100))
            .unwrap();
        time.set(600);
        ledger
            .deposit(&mut wallet, user(1), token(1), amount(30))
            .unwrap();
        // First deposit settled, second one pending in batch 2.
        assert_eq!(ledger.get_balance(user(1), token(1)), amount(100));
        assert_eq!(
            ledger.get_pending_deposit(user(1), token(1)),
            Flux::new(amount(30), BatchId(2))
        );
        time.set(900);
        ledger
            .deposit(&mut wallet, user(1), token(1), Amount::ZERO)
            .unwrap();
        assert_eq!(ledger.get_balance(user(1), token(1)), amount(130));
    }

    #[test]
    fn failed_transfer_leaves_ledger_untouched() {
        let (mut ledger, mut wallet, time) = setup();
        ledger
            .deposit(&mut wallet, user(1), token(1), amount(100))
            .unwrap();
        time.set(301);
        let err = ledger
            .deposit(&mut wallet, user(1), token(1), amount(5_000))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Transfer);
        // Not even the roll-forward was applied.
        assert_eq!(ledger.get_balance(user(1), token(1)), Amount::ZERO);
        assert_eq!(ledger.get_pending_deposit(user(1), token(1)).amount, amount(100));
    }

    #[test]
    fn withdraw_requires_request() {
        let (mut ledger, mut wallet, _) = setup();
        let err = ledger.withdraw(&mut wallet, user(1), token(1)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);
        assert_eq!(ledger.record_count(), 0);
    }

    #[test]
    fn withdraw_requires_settled_balance() {
        let (mut ledger, mut wallet, time) = setup();
        ledger.request_withdraw(user(1), token(1), amount(10)).unwrap();
        time.set(600);
        let err = ledger.withdraw(&mut wallet, user(1), token(1)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);
        assert_eq!(ledger.get_pending_withdraw(user(1), token(1)).amount, amount(10));
    }

    #[test]
    fn withdraw_waits_for_next_batch() {
        let (mut ledger, mut wallet, time) = setup();
        ledger
            .deposit(&mut wallet, user(1), token(1), amount(100))
            .unwrap();
        time.set(300);
        ledger
            .deposit(&mut wallet, user(1), token(1), Amount::ZERO)
            .unwrap();
        ledger.request_withdraw(user(1), token(1), amount(40)).unwrap();

        let err = ledger.withdraw(&mut wallet, user(1), token(1)).unwrap_err();
        assert!(matches!(
            err,
            BatchdexError::NotYetSettled {
                requested_in: BatchId(1),
                current: BatchId(1),
            }
        ));

        time.set(600);
        let paid = ledger.withdraw(&mut wallet, user(1), token(1)).unwrap();
        assert_eq!(paid, amount(40));
        assert_eq!(ledger.get_balance(user(1), token(1)), amount(60));
        assert!(ledger.get_pending_withdraw(user(1), token(1)).is_empty());
        assert_eq!(wallet.balance_of(user(1), token(1)), amount(940));
    }

    #[test]
    fn withdraw_request_rolls_deposit_forward() {
        let (mut ledger, mut wallet, time) = setup();
        ledger
            .deposit(&mut wallet, user(1), token(1), amount(100))
            .unwrap();
        time.set(301);
        ledger
            .request_withdraw(user(1), token(1), amount(40))
            .unwrap();
        assert_eq!(ledger.get_balance(user(1), token(1)), amount(100));
        assert!(ledger.get_pending_deposit(user(1), token(1)).is_empty());

        time.set(601);
        let paid = ledger.withdraw(&mut wallet, user(1), token(1)).unwrap();
        assert_eq!(paid, amount(40));
        assert_eq!(ledger.get_balance(user(1), token(1)), amount(60));
        assert_eq!(wallet.balance_of(user(1), token(1)), amount(940));
    }

    #[test]
    fn claim_rolls_deposit_made_after_request() {
        let (mut ledger, mut wallet, time) = setup();
        ledger
            .request_withdraw(user(1), token(1), amount(30))
            .unwrap();
        ledger
            .deposit(&mut wallet, user(1), token(1), amount(100))
            .unwrap();
        time.set(300);
        let paid = ledger.withdraw(&mut wallet, user(1), token(1)).unwrap();
        assert_eq!(paid, amount(30));
        assert_eq!(ledger.get_balance(user(1), token(1)), amount(70));
        assert!(ledger.get_pending_deposit(user(1), token(1)).is_empty());
    }

    #[test]
    fn rejected_claim_does_not_roll_forward() {
        let (mut ledger, mut wallet, time) = setup();
        ledger
            .deposit(&mut wallet, user(1), token(1), amount(100))
            .unwrap();
        time.set(300);
        let before = ledger.get_record(user(1), token(1));

        let err = ledger.withdraw(&mut wallet, user(1), token(1)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);
        assert_eq!(ledger.get_record(user(1), token(1)), before);
        assert_eq!(ledger.get_balance(user(1), token(1)), Amount::ZERO);
    }

    #[test]
    fn withdraw_caps_at_settled_balance() {
        let (mut ledger, mut wallet, time) = setup();
        ledger
            .deposit(&mut wallet, user(1), token(1), amount(100))
            .unwrap();
        time.set(300);
        ledger
            .deposit(&mut wallet, user(1), token(1), Amount::ZERO)
            .unwrap();
        ledger.request_withdraw(user(1), token(1), amount(200)).unwrap();
        time.set(600);
        let paid = ledger.withdraw(&mut wallet, user(1), token(1)).unwrap();
        assert_eq!(paid, amount(100));
        assert_eq!(ledger.get_balance(user(1), token(1)), Amount::ZERO);
        assert_eq!(wallet.balance_of(exchange(), token(1)), Amount::ZERO);
    }

    #[test]
    fn second_claim_fails_after_payout() {
        let (mut ledger, mut wallet, time) = setup();
        ledger
            .deposit(&mut wallet, user(1), token(1), amount(100))
            .unwrap();
        time.set(300);
        ledger
            .deposit(&mut wallet, user(1), token(1), Amount::ZERO)
            .unwrap();
        ledger.request_withdraw(user(1), token(1), amount(10)).unwrap();
        time.set(600);
        ledger.withdraw(&mut wallet, user(1), token(1)).unwrap();
        let err = ledger.withdraw(&mut wallet, user(1), token(1)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);
    }

    #[test]
    fn new_request_replaces_old_one() {
        let (mut ledger, _, time) = setup();
        ledger.request_withdraw(user(1), token(1), amount(70)).unwrap();
        time.set(900);
        ledger.request_withdraw(user(1), token(1), amount(5)).unwrap();
        assert_eq!(
            ledger.get_pending_withdraw(user(1), token(1)),
            Flux::new(amount(5), BatchId(3))
        );
    }

    #[test]
    fn total_locked_matches_exchange_wallet() {
        let (mut ledger, mut wallet, time) = setup();
        wallet.mint(user(2), token(1), amount(1_000)).unwrap();
        ledger
            .deposit(&mut wallet, user(1), token(1), amount(100))
            .unwrap();
        ledger
            .deposit(&mut wallet, user(2), token(1), amount(250))
            .unwrap();
        time.set(300);
        ledger
            .deposit(&mut wallet, user(1), token(1), Amount::ZERO)
            .unwrap();
        ledger.request_withdraw(user(1), token(1), amount(60)).unwrap();
        time.set(600);
        ledger.withdraw(&mut wallet, user(1), token(1)).unwrap();

        assert_eq!(ledger.total_locked(token(1)), amount(290));
        assert_eq!(
            ledger.total_locked(token(1)),
            wallet.balance_of(exchange(), token(1))
        );
    }

    #[test]
    fn keys_are_independent() {
        let (mut ledger, mut wallet, _) = setup();
        wallet.mint(user(1), token(2), amount(10)).unwrap();
        ledger
            .deposit(&mut wallet, user(1), token(2), amount(10))
            .unwrap();
        assert!(ledger.get_pending_deposit(user(1), token(1)).is_empty());
        assert!(ledger.get_pending_deposit(user(2), token(2)).is_empty());
        assert_eq!(ledger.get_pending_deposit(user(1), token(2)).amount, amount(10));
    }
}
