// src/ownership.rs
//! Administrative context shared by the allow-list, the record store adapter
//! and the fee treasury.
//!
//! Exactly one identity owns the gateway at any time. Ownership moves in a
//! single step with no acceptance handshake.

use crate::error::{GateError, Result};
use crate::events::{EventLog, GateEvent};
use crate::identity::Identity;
use parking_lot::RwLock;
use std::sync::Arc;

#[derive(Debug)]
pub struct Ownership {
    owner: RwLock<Identity>,
    events: Arc<EventLog>,
}

impl Ownership {
    pub fn new(owner: Identity, events: Arc<EventLog>) -> Result<Self> {
        if owner.is_zero() {
            return Err(GateError::InvalidConfig("owner must not be the zero identity".into()));
        }
        Ok(Self {
            owner: RwLock::new(owner),
            events,
        })
    }

    pub fn owner(&self) -> Identity {
        *self.owner.read()
    }

    pub fn is_owner(&self, identity: &Identity) -> bool {
        *self.owner.read() == *identity
    }

    pub fn ensure_owner(&self, caller: &Identity) -> Result<()> {
        if self.is_owner(caller) {
            Ok(())
        } else {
            Err(GateError::NotOwner(*caller))
        }
    }

    /// Hand ownership to `new_owner`. The check and the swap happen under one
    /// write lock so two concurrent transfers cannot both succeed.
    pub fn transfer_ownership(&self, caller: &Identity, new_owner: Identity) -> Result<()> {
        if new_owner.is_zero() {
            return Err(GateError::InvalidConfig(
                "new owner must not be the zero identity".into(),
            ));
        }

        let mut owner = self.owner.write();
        if *owner != *caller {
            return Err(GateError::NotOwner(*caller));
        }
        let previous = std::mem::replace(&mut *owner, new_owner);
        drop(owner);

        log::info!("Ownership transferred from {} to {}", previous, new_owner);
        self.events.emit(GateEvent::OwnershipTransferred {
            previous,
            new_owner,
        });
        Ok(())
    }
}
