//! System-wide constants for the batchdex ledger simulator.

/// Default batch duration in seconds (five minutes).
pub const DEFAULT_BATCH_DURATION_SECS: u64 = 300;

/// Default maximum number of registered tokens.
pub const DEFAULT_MAX_TOKENS: usize = 1000;

/// Hard ceiling on registry size: token ids are 16-bit.
pub const TOKEN_ID_SPACE: usize = 1 << 16;

/// Fee denominator of the modeled exchange (fee = 1 / denominator).
pub const DEFAULT_FEE_DENOMINATOR: u64 = 1000;

/// Default delay before a settlement reports "submitted", in milliseconds.
pub const DEFAULT_SENT_DELAY_MS: u64 = 500;

/// Default delay between "submitted" and "settled", in milliseconds.
pub const DEFAULT_SETTLE_DELAY_MS: u64 = 2000;

/// Capacity of the settlement event broadcast channel.
pub const SETTLEMENT_EVENT_CAPACITY: usize = 1024;

/// Domain tag mixed into every simulated transaction hash.
pub const TX_HASH_DOMAIN: &[u8] = b"batchdex:tx:v1:";
