//! Settlement receipts.
//!
//! Every accepted mutating operation resolves to a [`Receipt`]. Callers
//! should treat it as an opaque acknowledgment; the fields exist for logs
//! and audit trails, not for control flow.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::{BatchId, TxHash, constants};

/// The mutating operation a receipt acknowledges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperationKind {
    Deposit,
    RequestWithdraw,
    Withdraw,
    RegisterToken,
    PlaceOrder,
    CancelOrder,
}

impl OperationKind {
    fn tag(self) -> u8 {
        match self {
            Self::Deposit => 0,
            Self::RequestWithdraw => 1,
            Self::Withdraw => 2,
            Self::RegisterToken => 3,
            Self::PlaceOrder => 4,
            Self::CancelOrder => 5,
        }
    }
}

impl std::fmt::Display for OperationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Deposit => write!(f, "DEPOSIT"),
            Self::RequestWithdraw => write!(f, "REQUEST_WITHDRAW"),
            Self::Withdraw => write!(f, "WITHDRAW"),
            Self::RegisterToken => write!(f, "REGISTER_TOKEN"),
            Self::PlaceOrder => write!(f, "PLACE_ORDER"),
            Self::CancelOrder => write!(f, "CANCEL_ORDER"),
        }
    }
}

/// Acknowledgment that an operation was accepted by the simulated ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    pub tx_hash: TxHash,
    pub operation: OperationKind,
    /// Batch in which the operation was applied.
    pub batch_id: BatchId,
    pub issued_at: DateTime<Utc>,
}

impl Receipt {
    /// Deterministic simulated transaction hash for the `sequence`-th
    /// submission of `operation` in `batch_id`.
    #[must_use]
    pub fn tx_hash_for(operation: OperationKind, batch_id: BatchId, sequence: u64) -> TxHash {
        let mut hasher = Sha256::new();
        hasher.update(constants::TX_HASH_DOMAIN);
        hasher.update([operation.tag()]);
        hasher.update(batch_id.0.to_le_bytes());
        hasher.update(sequence.to_le_bytes());
        let digest = hasher.finalize();
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(&digest);
        TxHash(bytes)
    }
}
