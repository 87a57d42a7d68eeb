//! Epoch clock: maps wall-clock time onto batch ids.
//!
//! Batches are fixed-duration windows counted from the UNIX epoch:
//! `batch = floor(now_secs / batch_duration)`. The clock holds no mutable
//! state of its own; all of it lives in the [`TimeSource`].

use std::{
    fmt,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};

use chrono::Utc;

use crate::BatchId;

/// Source of the current time in whole seconds since the UNIX epoch.
pub trait TimeSource: Send + Sync + fmt::Debug {
    fn now_secs(&self) -> u64;
}

/// Reads the host's wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
    fn now_secs(&self) -> u64 {
        u64::try_from(Utc::now().timestamp()).unwrap_or(0)
    }
}

/// A clock that only moves when told to.
///
/// Clones share the same underlying time, so a test can hand one copy to
/// the exchange and keep another to advance it.
#[derive(Debug, Clone, Default)]
pub struct ManualTimeSource {
    now: Arc<AtomicU64>,
}

impl ManualTimeSource {
    #[must_use]
    pub fn new(start_secs: u64) -> Self {
        Self {
            now: Arc::new(AtomicU64::new(start_secs)),
        }
    }

    pub fn set(&self, secs: u64) {
        self.now.store(secs, Ordering::SeqCst);
    }

    pub fn advance(&self, secs: u64) {
        self.now.fetch_add(secs, Ordering::SeqCst);
    }
}

impl TimeSource for ManualTimeSource {
    fn now_secs(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}

/// Converts time into batch ids using a fixed batch duration.
#[derive(Debug, Clone)]
pub struct EpochClock {
    batch_duration_secs: u64,
    source: Arc<dyn TimeSource>,
}

impl EpochClock {
    /// Create a clock over an arbitrary time source.
    ///
    /// # Panics
    /// Panics if `batch_duration_secs` is zero.
    pub fn new(batch_duration_secs: u64, source: Arc<dyn TimeSource>) -> Self {
        assert!(batch_duration_secs > 0, "batch duration must be > 0");
        Self {
            batch_duration_secs,
            source,
        }
    }

    /// A clock driven by the host's wall clock.
    #[must_use]
    pub fn system(batch_duration_secs: u64) -> Self {
        Self::new(batch_duration_secs, Arc::new(SystemTimeSource))
    }

    #[must_use]
    pub fn batch_duration_secs(&self) -> u64 {
        self.batch_duration_secs
    }

    #[must_use]
    pub fn now_secs(&self) -> u64 {
        self.source.now_secs()
    }

    #[must_use]
    pub fn current_batch_id(&self) -> BatchId {
        self.batch_at(self.now_secs())
    }

    /// Batch containing the instant `secs`.
    #[must_use]
    pub fn batch_at(&self, secs: u64) -> BatchId {
        BatchId(secs / self.batch_duration_secs)
    }

    /// Seconds until the current batch closes, in `1..=batch_duration`.
    #[must_use]
    pub fn seconds_remaining_in_batch(&self) -> u64 {
        self.batch_duration_secs - (self.now_secs() % self.batch_duration_secs)
    }

    /// First second belonging to `batch`.
    #[must_use]
    pub fn batch_start_secs(&self, batch: BatchId) -> u64 {
        batch.0.saturating_mul(self.batch_duration_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manual_clock(start: u64) -> (EpochClock, ManualTimeSource) {
        let source = ManualTimeSource::new(start);
        (EpochClock::new(300, Arc::new(source.clone())), source)
    }

    #[test]
    fn batch_id_is_floor_of_time() {
        let (clock, time) = manual_clock(0);
        assert_eq!(clock.current_batch_id(), BatchId(0));
        time.set(299);
        assert_eq!(clock.current_batch_id(), BatchId(0));
        time.set(300);
        assert_eq!(clock.current_batch_id(), BatchId(1));
        time.set(301);
        assert_eq!(clock.current_batch_id(), BatchId(1));
    }

    #[test]
    fn seconds_remaining_counts_down() {
        let (clock, time) = manual_clock(0);
        assert_eq!(clock.seconds_remaining_in_batch(), 300);
        time.advance(1);
        assert_eq!(clock.seconds_remaining_in_batch(), 299);
        time.set(599);
        assert_eq!(clock.seconds_remaining_in_batch(), 1);
        time.set(600);
        assert_eq!(clock.seconds_remaining_in_batch(), 300);
    }

    #[test]
    fn batch_start_inverts_batch_at() {
        let (clock, _) = manual_clock(0);
        for batch in [0u64, 1, 7, 1_000_000] {
            let start = clock.batch_start_secs(BatchId(batch));
            assert_eq!(clock.batch_at(start), BatchId(batch));
            assert_eq!(clock.batch_at(start + 299), BatchId(batch));
        }
    }

    #[test]
    fn system_clock_is_past_genesis() {
        let clock = EpochClock::system(300);
        assert!(clock.current_batch_id() > BatchId(0));
        let remaining = clock.seconds_remaining_in_batch();
        assert!((1..=300).contains(&remaining));
    }

    #[test]
    fn clones_share_manual_time() {
        let (clock, time) = manual_clock(0);
        let other = clock.clone();
        time.advance(900);
        assert_eq!(other.current_batch_id(), BatchId(3));
    }

    #[test]
    #[should_panic(expected = "batch duration must be > 0")]
    fn zero_duration_panics() {
        let _ = EpochClock::new(0, Arc::new(SystemTimeSource));
    }
}
