//! Registry of tradable tokens.
//!
//! Tokens get dense, 0-based ids in registration order. Ids never change
//! once assigned and tokens are never removed, so `id_for` and
//! `address_for` stay mutual inverses for the registry's whole lifetime.

use std::collections::HashMap;

use batchdex_types::{BatchdexError, Result, TokenAddress, TokenId, constants};

/// Bidirectional token address ↔ id mapping with a fixed capacity.
#[derive(Debug, Clone)]
pub struct TokenRegistry {
    /// Addresses in registration order; the index is the token id.
    tokens: Vec<TokenAddress>,
    ids: HashMap<TokenAddress, TokenId>,
    max_tokens: usize,
}

impl TokenRegistry {
    /// Create an empty registry accepting up to `max_tokens` tokens.
    ///
    /// # Panics
    /// Panics if `max_tokens` is zero or exceeds the 16-bit id space.
    pub fn new(max_tokens: usize) -> Self {
        assert!(
            (1..=constants::TOKEN_ID_SPACE).contains(&max_tokens),
            "TokenRegistry max_tokens must be in 1..=65536"
        );
        Self {
            tokens: Vec::new(),
            ids: HashMap::new(),
            max_tokens,
        }
    }

    /// Create a registry pre-populated with `tokens`, in order.
    pub fn with_tokens(
        max_tokens: usize,
        tokens: impl IntoIterator<Item = TokenAddress>,
    ) -> Result<Self> {
        let mut registry = Self::new(max_tokens);
        for token in tokens {
            registry.register(token)?;
        }
        Ok(registry)
    }

    /// Append `token` and assign it the next id.
    ///
    /// # Errors
    /// - `AlreadyRegistered` if the address is already present
    /// - `CapacityExceeded` if the registry is full
    pub fn register(&mut self, token: TokenAddress) -> Result<TokenId> {
        if self.ids.contains_key(&token) {
            return Err(BatchdexError::AlreadyRegistered(token));
        }
        if self.is_full() {
            return Err(BatchdexError::CapacityExceeded {
                max: self.max_tokens,
            });
        }
        let id = u16::try_from(self.tokens.len())
            .map(TokenId)
            .map_err(|_| BatchdexError::Internal("token id space exhausted".to_string()))?;
        self.tokens.push(token);
        self.ids.insert(token, id);

        tracing::info!(token = %token, id = id.0, "Token registered");
        Ok(id)
    }

    pub fn id_for(&self, token: TokenAddress) -> Result<TokenId> {
        self.ids
            .get(&token)
            .copied()
            .ok_or(BatchdexError::TokenNotFound(token))
    }

    pub fn address_for(&self, id: TokenId) -> Result<TokenAddress> {
        self.tokens
            .get(id.index())
            .copied()
            .ok_or(BatchdexError::TokenIdNotFound(id))
    }

    #[must_use]
    pub fn contains(&self, token: TokenAddress) -> bool {
        self.ids.contains_key(&token)
    }

    #[must_use]
    pub fn count(&self) -> usize {
        self.tokens.len()
    }

    #[must_use]
    pub fn max_tokens(&self) -> usize {
        self.max_tokens
    }

    #[must_use]
    pub fn is_full(&self) -> bool {
        self.tokens.len() >= self.max_tokens
    }

    /// Registered tokens in id order.
    pub fn iter(&self) -> impl Iterator<Item = (TokenId, TokenAddress)> + '_ {
        self.tokens
            .iter()
            .zip(0u16..)
            .map(|(token, id)| (TokenId(id), *token))
    }
}
