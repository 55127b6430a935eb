// src/nonce.rs
//! Per-recipient replay protection.
//!
//! Each identity owns one counter slot. A presented nonce is accepted only if
//! it equals the slot's current value, after which the slot advances by one.
//! Slots are created lazily at zero and never removed or reset.
//!
//! Check-and-advance happens while the slot's lock is held, so two
//! authorizations for the same identity can never both use one value.
//! Different identities lock different slots and never contend.
//!
//! The slot lock is re-entrant: a call that reaches back into the same slot
//! from inside a running unit (for example through an external ledger
//! callback) sees the slot marked in use and fails with
//! [`GateError::NonceInUse`] instead of blocking on itself.

use crate::error::{GateError, Result};
use crate::identity::Identity;
use dashmap::DashMap;
use parking_lot::ReentrantMutex;
use std::cell::RefCell;
use std::sync::Arc;

type Slot = Arc<ReentrantMutex<RefCell<SlotState>>>;

#[derive(Debug, Default)]
struct SlotState {
    nonce: u64,
    in_use: bool,
}

#[derive(Debug, Default)]
pub struct ReplayLedger {
    slots: DashMap<Identity, Slot>,
}

impl ReplayLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current counter for `identity` (zero if never used)
    pub fn current_nonce(&self, identity: &Identity) -> u64 {
        self.slots
            .get(identity)
            .map(|slot| slot.value().clone())
            .map(|slot| slot.lock().borrow().nonce)
            .unwrap_or(0)
    }

    /// Accept `presented` if it matches and advance the counter.
    pub fn consume(&self, identity: &Identity, presented: u64) -> Result<u64> {
        self.consume_with(identity, presented, || Ok(()))
            .map(|()| presented)
    }

    /// Run `unit` under the identity's slot after the nonce check passes; the
    /// counter advances only if `unit` returns `Ok`. On any error the counter
    /// is left untouched.
    pub fn consume_with<T, F>(&self, identity: &Identity, presented: u64, unit: F) -> Result<T>
    where
        F: FnOnce() -> Result<T>,
    {
        let slot = self.slot(identity);
        let guard = slot.lock();

        {
            let mut state = guard.borrow_mut();
            if state.in_use {
                tracing::warn!(recipient = %identity, "re-entrant authorization rejected");
                return Err(GateError::NonceInUse(*identity));
            }
            if presented != state.nonce {
                tracing::warn!(
                    recipient = %identity,
                    expected = state.nonce,
                    presented,
                    "nonce rejected"
                );
                return Err(GateError::InvalidNonce {
                    recipient: *identity,
                    expected: state.nonce,
                    presented,
                });
            }
            state.in_use = true;
        }

        let out = {
            let _busy = InUse(&*guard);
            unit()?
        };

        let mut state = guard.borrow_mut();
        state.nonce += 1;
        tracing::debug!(recipient = %identity, nonce = state.nonce, "nonce advanced");
        Ok(out)
    }

    /// Number of identities that have a slot
    pub fn tracked(&self) -> usize {
        self.slots.len()
    }

    fn slot(&self, identity: &Identity) -> Slot {
        // Clone the Arc out so the map shard is released before we lock the slot
        self.slots
            .entry(*identity)
            .or_insert_with(Slot::default)
            .value()
            .clone()
    }
}

/// Clears the in-use mark when the unit finishes, including by unwinding.
struct InUse<'a>(&'a RefCell<SlotState>);

impl Drop for InUse<'_> {
    fn drop(&mut self) {
        self.0.borrow_mut().in_use = false;
    }
}
