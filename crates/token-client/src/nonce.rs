//! Per-account nonce reservation for the write path.
//!
//! A transaction's nonce fetch, signing, and broadcast all happen while the
//! account's slot is locked, so two concurrent writes from one account can
//! never pick the same nonce even when the node reports the same pending
//! count to both.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use token_abi::Address;
use tracing::debug;

/// Tracks the next nonce this process has reserved for each account.
#[derive(Debug, Default)]
pub struct NonceManager {
    slots: Mutex<HashMap<Address, Arc<Mutex<Option<u64>>>>>,
}

/// Exclusive hold on one account's nonce sequence.
///
/// Dropping the guard without calling [`NonceGuard::commit`] leaves the
/// reservation unchanged.
pub struct NonceGuard<'a> {
    next: MutexGuard<'a, Option<u64>>,
}

impl NonceManager {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, address: &Address) -> Arc<Mutex<Option<u64>>> {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots.entry(*address).or_default().clone()
    }

    /// Runs `f` while holding the account's nonce slot.
    pub fn with_account<T>(&self, address: &Address, f: impl FnOnce(&mut NonceGuard<'_>) -> T) -> T {
        let slot = self.slot(address);
        let next = slot.lock().unwrap_or_else(PoisonError::into_inner);
        let mut guard = NonceGuard { next };
        f(&mut guard)
    }

    /// The next nonce this manager would hand out for `address`, if it has
    /// reserved any.
    pub fn reserved(&self, address: &Address) -> Option<u64> {
        let slot = self.slot(address);
        let next = slot.lock().unwrap_or_else(PoisonError::into_inner);
        *next
    }
}

impl NonceGuard<'_> {
    /// Reconciles the node's pending nonce with the local reservation,
    /// returning the larger of the two.
    pub fn reconcile(&self, network_nonce: u64) -> u64 {
        match *self.next {
            Some(reserved) if reserved > network_nonce => {
                debug!(network_nonce, reserved, "using locally reserved nonce");
                reserved
            }
            _ => network_nonce,
        }
    }

    /// Records that `nonce` was accepted by the network.
    pub fn commit(&mut self, nonce: u64) {
        *self.next = Some(nonce + 1);
    }
}
