//! Configuration for the simulated exchange.

use std::time::Duration;

use alloy_primitives::Address;
use serde::{Deserialize, Serialize};

use crate::{BatchdexError, Result, constants};

/// Top-level exchange configuration.
///
/// Missing fields fall back to their defaults when deserialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExchangeConfig {
    /// Length of one batch in seconds.
    pub batch_duration_secs: u64,
    /// Maximum number of tokens the registry accepts.
    pub max_tokens: usize,
    /// Fee denominator of the modeled exchange.
    pub fee_denominator: u64,
    /// Account that holds deposited tokens in the external wallet.
    pub exchange_account: Address,
    /// Simulated mining delays.
    pub settlement: SettlementConfig,
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            batch_duration_secs: constants::DEFAULT_BATCH_DURATION_SECS,
            max_tokens: constants::DEFAULT_MAX_TOKENS,
            fee_denominator: constants::DEFAULT_FEE_DENOMINATOR,
            exchange_account: Address::repeat_byte(0xee),
            settlement: SettlementConfig::default(),
        }
    }
}

impl ExchangeConfig {
    /// Parse and validate a JSON document.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.batch_duration_secs == 0 {
            return Err(BatchdexError::Configuration(
                "batch_duration_secs must be > 0".to_string(),
            ));
        }
        if self.max_tokens == 0 || self.max_tokens > constants::TOKEN_ID_SPACE {
            return Err(BatchdexError::Configuration(format!(
                "max_tokens must be in 1..={}, got {}",
                constants::TOKEN_ID_SPACE,
                self.max_tokens
            )));
        }
        if self.fee_denominator == 0 {
            return Err(BatchdexError::Configuration(
                "fee_denominator must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Delays used by the settlement stub to imitate transaction mining.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SettlementConfig {
    /// Time until the "submitted" notification.
    pub sent_delay_ms: u64,
    /// Time from "submitted" until the receipt resolves.
    pub settle_delay_ms: u64,
}

impl Default for SettlementConfig {
    fn default() -> Self {
        Self {
            sent_delay_ms: constants::DEFAULT_SENT_DELAY_MS,
            settle_delay_ms: constants::DEFAULT_SETTLE_DELAY_MS,
        }
    }
}

impl SettlementConfig {
    /// No artificial delay at all.
    #[must_use]
    pub fn instant() -> Self {
        Self {
            sent_delay_ms: 0,
            settle_delay_ms: 0,
        }
    }

    #[must_use]
    pub fn sent_delay(&self) -> Duration {
        Duration::from_millis(self.sent_delay_ms)
    }

    #[must_use]
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }
}
