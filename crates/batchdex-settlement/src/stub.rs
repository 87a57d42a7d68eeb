//! Simulated transaction mining.
//!
//! The wrapped operation runs synchronously, so it fails fast and before
//! any delay. On success a deferred task reports the operation in two
//! stages:
//! 1. **Submitted**: after `sent_delay`, the simulated tx hash
//! 2. **Settled**: after a further `settle_delay`, the [`Receipt`]
//!
//! Each submission gets its own task, so a slow settlement never holds
//! up other callers. There is no cancellation and no timeout.

use std::sync::atomic::{AtomicU64, Ordering};

use batchdex_types::{
    BatchdexError, EpochClock, OperationKind, Receipt, Result, SettlementConfig, TxHash,
    constants,
};
use chrono::Utc;
use tokio::sync::{broadcast, oneshot};

/// Progress notification broadcast to subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettlementEvent {
    Submitted {
        tx_hash: TxHash,
        operation: OperationKind,
    },
    Settled(Receipt),
}

/// The immediate result of an accepted operation plus handles on its
/// deferred settlement.
#[derive(Debug)]
pub struct PendingSettlement<T> {
    value: T,
    tx_hash: TxHash,
    submitted: Option<oneshot::Receiver<TxHash>>,
    settled: oneshot::Receiver<Receipt>,
}

impl<T> PendingSettlement<T> {
    /// What the operation returned when it was applied.
    pub fn value(&self) -> &T {
        &self.value
    }

    pub fn tx_hash(&self) -> TxHash {
        self.tx_hash
    }

    /// Wait for the "submitted" stage. Returns immediately once it has
    /// been observed.
    pub async fn submitted(&mut self) -> Result<TxHash> {
        if let Some(rx) = self.submitted.take() {
            rx.await.map_err(|_| BatchdexError::SettlementDropped)?;
        }
        Ok(self.tx_hash)
    }

    /// Wait for the receipt.
    pub async fn settled(self) -> Result<Receipt> {
        self.settled
            .await
            .map_err(|_| BatchdexError::SettlementDropped)
    }

    /// Wait for the receipt and hand back the operation's value with it.
    pub async fn wait(self) -> Result<(T, Receipt)> {
        let receipt = self
            .settled
            .await
            .map_err(|_| BatchdexError::SettlementDropped)?;
        Ok((self.value, receipt))
    }
}

/// Wraps ledger operations in simulated, delayed settlement.
#[derive(Debug)]
pub struct SettlementStub {
    config: SettlementConfig,
    clock: EpochClock,
    sequence: AtomicU64,
    events: broadcast::Sender<SettlementEvent>,
}

impl SettlementStub {
    #[must_use]
    pub fn new(config: SettlementConfig, clock: EpochClock) -> Self {
        let (events, _) = broadcast::channel(constants::SETTLEMENT_EVENT_CAPACITY);
        Self {
            config,
            clock,
            sequence: AtomicU64::new(0),
            events,
        }
    }

    #[must_use]
    pub fn config(&self) -> &SettlementConfig {
        &self.config
    }

    /// Receive every [`SettlementEvent`] emitted from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<SettlementEvent> {
        self.events.subscribe()
    }

    /// Run `apply` now and, if it succeeds, schedule settlement of `operation`.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    /// Whatever `apply` returns; nothing is scheduled in that case.
    pub fn submit<T>(
        &self,
        operation: OperationKind,
        apply: impl FnOnce() -> Result<T>,
    ) -> Result<PendingSettlement<T>> {
        let batch_id = self.clock.current_batch_id();
        let value = apply()?;

        let sequence = self.sequence.fetch_add(1, Ordering::Relaxed);
        let tx_hash = Receipt::tx_hash_for(operation, batch_id, sequence);
        let (submitted_tx, submitted_rx) = oneshot::channel();
        let (settled_tx, settled_rx) = oneshot::channel();
        let events = self.events.clone();
        let sent_delay = self.config.sent_delay();
        let settle_delay = self.config.settle_delay();

        tokio::spawn(async move {
            tokio::time::sleep(sent_delay).await;
            tracing::debug!(tx = %tx_hash, %operation, "Transaction submitted");
            // Send errors only mean nobody is listening.
            let _ = events.send(SettlementEvent::Submitted { tx_hash, operation });
            let _ = submitted_tx.send(tx_hash);

            tokio::time::sleep(settle_delay).await;
            let receipt = Receipt {
                tx_hash,
                operation,
                batch_id,
                issued_at: Utc::now(),
            };
            tracing::info!(
                tx = %tx_hash.short(),
                %operation,
                batch = batch_id.0,
                "Transaction settled"
            );
            let _ = events.send(SettlementEvent::Settled(receipt.clone()));
            let _ = settled_tx.send(receipt);
        });

        Ok(PendingSettlement {
            value,
            tx_hash,
            submitted: Some(submitted_rx),
            settled: settled_rx,
        })
    }
}
