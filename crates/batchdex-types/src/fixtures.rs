//! Test fixtures shared across the workspace.

use std::sync::Arc;

use alloy_primitives::Address;
use rand::Rng;

use crate::{Amount, EpochClock, ManualTimeSource, TokenAddress, UserAddress};

fn tagged(tag: u8, n: u8) -> Address {
    let mut bytes = [0u8; 20];
    bytes[0] = tag;
    bytes[19] = n;
    Address::from(bytes)
}

/// Deterministic user address `n`.
pub fn user(n: u8) -> UserAddress {
    tagged(0x11, n)
}

/// Deterministic token address `n`.
pub fn token(n: u8) -> TokenAddress {
    tagged(0x22, n)
}

pub fn random_address<R: Rng>(rng: &mut R) -> Address {
    let bytes: [u8; 20] = rng.r#gen();
    Address::from(bytes)
}

pub fn amount(value: u64) -> Amount {
    Amount::from(value)
}

/// An epoch clock over a manual time source starting at `start_secs`,
/// plus the handle used to move it.
pub fn manual_clock(start_secs: u64, batch_duration_secs: u64) -> (EpochClock, ManualTimeSource) {
    let time = ManualTimeSource::new(start_secs);
    let clock = EpochClock::new(batch_duration_secs, Arc::new(time.clone()));
    (clock, time)
}
