//! External token-transfer capability.
//!
//! The ledger never holds the underlying asset. Deposits and claims move
//! tokens between the user's wallet and the exchange account through a
//! [`TokenTransfer`] collaborator supplied by the caller.

use std::collections::HashMap;

use alloy_primitives::Address;
use batchdex_types::{Amount, BatchdexError, Result, TokenAddress};

/// Moves `amount` of `token` from one external account to another.
pub trait TokenTransfer {
    fn transfer(
        &mut self,
        from: Address,
        to: Address,
        token: TokenAddress,
        amount: Amount,
    ) -> Result<()>;
}

/// In-memory token balances for external accounts, standing in for the
/// ERC-20 contracts a real deployment would talk to.
#[derive(Debug, Clone, Default)]
pub struct InMemoryWallet {
    balances: HashMap<(Address, TokenAddress), Amount>,
}

impl InMemoryWallet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Credit `owner` with freshly created tokens.
    pub fn mint(&mut self, owner: Address, token: TokenAddress, amount: Amount) -> Result<()> {
        let entry = self.balances.entry((owner, token)).or_default();
        *entry = entry
            .checked_add(amount)
            .ok_or_else(|| BatchdexError::Internal(format!("wallet balance overflow for {owner}")))?;
        Ok(())
    }

    #[must_use]
    pub fn balance_of(&self, owner: Address, token: TokenAddress) -> Amount {
        self.balances
            .get(&(owner, token))
            .copied()
            .unwrap_or_default()
    }
}

impl TokenTransfer for InMemoryWallet {
    fn transfer(
        &mut self,
        from: Address,
        to: Address,
        token: TokenAddress,
        amount: Amount,
    ) -> Result<()> {
        let available = self.balance_of(from, token);
        let remaining = available
            .checked_sub(amount)
            .ok_or(BatchdexError::InsufficientFunds {
                needed: amount,
                available,
            })?;
        if from == to {
            return Ok(());
        }
        let credited = self
            .balance_of(to, token)
            .checked_add(amount)
            .ok_or_else(|| BatchdexError::Internal(format!("wallet balance overflow for {to}")))?;

        self.balances.insert((from, token), remaining);
        self.balances.insert((to, token), credited);
        Ok(())
    }
}
