// src/allowlist.rs
//! Allow-list of identities permitted to submit or revoke record batches.
//!
//! Membership is binary and strict: adding a member twice or removing a
//! non-member is an error rather than a no-op.

use crate::error::{GateError, Result};
use crate::events::{EventLog, GateEvent};
use crate::identity::Identity;
use crate::ownership::Ownership;
use parking_lot::RwLock;
use std::collections::HashSet;
use std::sync::Arc;

pub struct AllowListGate {
    members: RwLock<HashSet<Identity>>,
    ownership: Arc<Ownership>,
    events: Arc<EventLog>,
}

impl AllowListGate {
    pub fn new(ownership: Arc<Ownership>, events: Arc<EventLog>) -> Self {
        Self {
            members: RwLock::new(HashSet::new()),
            ownership,
            events,
        }
    }

    /// Add `identity` to the allow-list (owner only)
    pub fn add_authorized(&self, caller: &Identity, identity: Identity) -> Result<()> {
        self.ownership.ensure_owner(caller)?;

        if !self.members.write().insert(identity) {
            return Err(GateError::AlreadyAuthorized(identity));
        }

        log::info!("Authorized {}", identity);
        self.events.emit(GateEvent::Authorized { identity });
        Ok(())
    }

    /// Remove `identity` from the allow-list (owner only)
    pub fn remove_authorized(&self, caller: &Identity, identity: Identity) -> Result<()> {
        self.ownership.ensure_owner(caller)?;

        if !self.members.write().remove(&identity) {
            return Err(GateError::NotAuthorized(identity));
        }

        log::info!("Deauthorized {}", identity);
        self.events.emit(GateEvent::Deauthorized { identity });
        Ok(())
    }

    pub fn is_authorized(&self, identity: &Identity) -> bool {
        self.members.read().contains(identity)
    }

    /// Number of listed identities
    pub fn len(&self) -> usize {
        self.members.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.read().is_empty()
    }

    /// Register a verifier instance while the gateway is being assembled.
    /// Runs in the administrative context, so no owner check; idempotent.
    pub(crate) fn enroll(&self, identity: Identity) {
        if self.members.write().insert(identity) {
            log::info!("Verifier instance {} enrolled", identity);
            self.events.emit(GateEvent::Authorized { identity });
        }
    }
}
