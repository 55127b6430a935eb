// src/treasury.rs
//! Fee treasury.
//!
//! Fees are credited only by the signed-batch verifier and leave only through
//! owner withdrawal. A credit is reserved first and settled once the rest of
//! the submission succeeds, so a failed submission never changes the balance.
//!
//! Withdrawal zeroes the settled balance before calling out to
//! [`NativeTransfer`]; a nested call made from inside the transfer sees an
//! empty treasury. If the transfer fails the amount is put back.

use crate::error::{GateError, Result};
use crate::events::{EventLog, GateEvent};
use crate::identity::Identity;
use crate::ownership::Ownership;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// Moves native value out of the gateway
pub trait NativeTransfer: Send + Sync {
    fn transfer(&self, to: &Identity, amount: u128) -> anyhow::Result<()>;
}

#[derive(Debug, Default, Clone, Copy)]
struct TreasuryState {
    settled: u128,
    /// Reserved by submissions still in progress
    pending: u128,
    /// Drained by a withdrawal whose transfer has not returned yet
    in_flight: u128,
}

impl TreasuryState {
    fn total(&self) -> Option<u128> {
        self.settled
            .checked_add(self.pending)?
            .checked_add(self.in_flight)
    }
}

pub struct FeeTreasury {
    state: Mutex<TreasuryState>,
    ownership: Arc<Ownership>,
    payouts: Arc<dyn NativeTransfer>,
    events: Arc<EventLog>,
}

impl FeeTreasury {
    pub fn new(
        ownership: Arc<Ownership>,
        payouts: Arc<dyn NativeTransfer>,
        events: Arc<EventLog>,
    ) -> Self {
        Self {
            state: Mutex::new(TreasuryState::default()),
            ownership,
            payouts,
            events,
        }
    }

    /// Settled balance available for withdrawal
    pub fn balance(&self) -> u128 {
        self.state.lock().settled
    }

    /// Reserve `amount` for a submission in progress. The reservation is
    /// released when the returned guard is dropped without `commit`.
    pub(crate) fn reserve(&self, amount: u128) -> Result<PendingCredit<'_>> {
        let mut state = self.state.lock();
        let fits = state
            .total()
            .and_then(|total| total.checked_add(amount))
            .is_some();
        if !fits {
            log::error!("Fee credit of {} would overflow treasury", amount);
            return Err(GateError::TreasuryOverflow);
        }
        state.pending += amount;
        Ok(PendingCredit {
            treasury: self,
            amount,
            settled: false,
        })
    }

    /// Send the whole settled balance to the owner. Returns the amount moved;
    /// zero when there was nothing to withdraw.
    pub fn withdraw(&self, caller: &Identity) -> Result<u128> {
        self.ownership.ensure_owner(caller)?;

        let amount = {
            let mut state = self.state.lock();
            let amount = std::mem::take(&mut state.settled);
            state.in_flight += amount;
            amount
        };
        if amount == 0 {
            return Ok(0);
        }

        match self.payouts.transfer(caller, amount) {
            Ok(()) => {
                self.state.lock().in_flight -= amount;
                log::info!("Withdrew {} in fees to {}", amount, caller);
                self.events.emit(GateEvent::FeesWithdrawn {
                    to: *caller,
                    amount,
                });
                Ok(amount)
            }
            Err(e) => {
                let mut state = self.state.lock();
                state.in_flight -= amount;
                state.settled += amount;
                drop(state);
                log::warn!(
                    "Fee transfer of {} to {} failed, balance restored: {:#}",
                    amount,
                    caller,
                    e
                );
                Err(GateError::Transfer(format!("{e:#}")))
            }
        }
    }
}

/// Fee credit awaiting the outcome of its submission
pub struct PendingCredit<'a> {
    treasury: &'a FeeTreasury,
    amount: u128,
    settled: bool,
}

impl PendingCredit<'_> {
    pub fn amount(&self) -> u128 {
        self.amount
    }

    pub fn commit(mut self) {
        let mut state = self.treasury.state.lock();
        state.pending -= self.amount;
        state.settled += self.amount;
        self.settled = true;
    }
}

impl Drop for PendingCredit<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.treasury.state.lock().pending -= self.amount;
        }
    }
}

/// In-process [`NativeTransfer`] that keeps balances in memory.
#[derive(Debug, Default)]
pub struct MemoryPayouts {
    balances: Mutex<HashMap<Identity, u128>>,
    fail_next: Mutex<Option<String>>,
}

impl MemoryPayouts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn balance_of(&self, identity: &Identity) -> u128 {
        self.balances.lock().get(identity).copied().unwrap_or(0)
    }

    /// Make the next transfer fail with `reason`.
    pub fn fail_next(&self, reason: impl Into<String>) {
        *self.fail_next.lock() = Some(reason.into());
    }
}

impl NativeTransfer for MemoryPayouts {
    fn transfer(&self, to: &Identity, amount: u128) -> anyhow::Result<()> {
        if let Some(reason) = self.fail_next.lock().take() {
            anyhow::bail!(reason);
        }
        let mut balances = self.balances.lock();
        let entry = balances.entry(*to).or_insert(0);
        *entry = entry
            .checked_add(amount)
            .ok_or_else(|| anyhow::anyhow!("recipient balance overflow"))?;
        Ok(())
    }
}
