// src/record_store/mod.rs
//! Thin facade over the external append-only record ledger.
//!
//! The adapter owns no state of its own: it checks that the caller may write
//! (allow-list) or revoke (allow-list or owner) and delegates to a
//! [`RecordLedger`]. Writes are two-phase so a caller can fold the ledger
//! write into a larger unit of work and abort it if a later step fails.

pub mod memory;
pub mod types;

pub use memory::InMemoryLedger;
pub use types::{
    AttestationGroup, BatchRequest, Record, RecordEntry, RevocationEntry, RevocationGroup,
    RevocationRequest, RevocationRequestBuilder,
};

use crate::allowlist::AllowListGate;
use crate::error::{GateError, LedgerError, Result};
use crate::events::{EventLog, GateEvent};
use crate::identity::{Identity, RecordId, SchemaId};
use crate::ownership::Ownership;
use std::sync::Arc;

/// Records written by the ledger but not yet visible
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedWrite {
    pub ticket: u64,
    pub record_ids: Vec<RecordId>,
}

/// Boundary to the external attestation ledger
///
/// Implementations assign globally unique record ids and reject malformed
/// schema references. `stage_write` must not make anything visible; a staged
/// write becomes visible only through `commit_write` and is discarded by
/// `abort_write`. `revoke` is all-or-nothing.
pub trait RecordLedger: Send + Sync {
    fn stage_write(
        &self,
        attester: &Identity,
        groups: &[AttestationGroup],
    ) -> std::result::Result<StagedWrite, LedgerError>;

    fn commit_write(&self, ticket: u64) -> std::result::Result<(), LedgerError>;

    fn abort_write(&self, ticket: u64);

    fn revoke(
        &self,
        revoker: &Identity,
        groups: &[RevocationGroup],
    ) -> std::result::Result<(), LedgerError>;

    fn record(&self, id: &RecordId) -> Option<Record>;

    fn schema_exists(&self, schema: &SchemaId) -> bool;
}

pub struct RecordStoreAdapter {
    /// Identity the ledger sees as attester and revoker for every call
    instance: Identity,
    ledger: Arc<dyn RecordLedger>,
    allow_list: Arc<AllowListGate>,
    ownership: Arc<Ownership>,
    events: Arc<EventLog>,
}

impl RecordStoreAdapter {
    pub fn new(
        instance: Identity,
        ledger: Arc<dyn RecordLedger>,
        allow_list: Arc<AllowListGate>,
        ownership: Arc<Ownership>,
        events: Arc<EventLog>,
    ) -> Self {
        Self {
            instance,
            ledger,
            allow_list,
            ownership,
            events,
        }
    }

    pub fn instance(&self) -> Identity {
        self.instance
    }

    /// Write a batch and commit it immediately.
    pub fn write_batch(&self, caller: &Identity, batch: &BatchRequest) -> Result<Vec<RecordId>> {
        self.stage_batch(caller, batch)?.commit()
    }

    /// Stage a batch. The returned guard aborts the write when dropped
    /// without [`PendingBatch::commit`].
    pub fn stage_batch(&self, caller: &Identity, batch: &BatchRequest) -> Result<PendingBatch<'_>> {
        if !self.allow_list.is_authorized(caller) {
            tracing::warn!(%caller, "write rejected: caller not on allow-list");
            return Err(GateError::Unauthorized(*caller));
        }

        let expected = batch.entry_count();
        if expected == 0 {
            return Err(GateError::EmptyBatch);
        }

        if let Some(group) = batch
            .groups()
            .iter()
            .find(|g| !self.ledger.schema_exists(&g.schema))
        {
            tracing::warn!(schema = %group.schema, "write rejected: unknown schema");
            return Err(LedgerError::UnknownSchema(group.schema).into());
        }

        let staged = self.ledger.stage_write(&self.instance, batch.groups())?;
        if staged.record_ids.len() != expected {
            self.ledger.abort_write(staged.ticket);
            tracing::error!(
                expected,
                returned = staged.record_ids.len(),
                "ledger returned wrong number of record ids"
            );
            return Err(GateError::IncompleteWrite {
                expected,
                returned: staged.record_ids.len(),
            });
        }

        Ok(PendingBatch {
            adapter: self,
            submitter: *caller,
            recipient: batch.first_recipient(),
            ticket: staged.ticket,
            record_ids: staged.record_ids,
            committed: false,
        })
    }

    /// Revoke previously written records. Allowed for listed identities and
    /// for the owner.
    pub fn revoke_batch(&self, caller: &Identity, request: &RevocationRequest) -> Result<()> {
        if !self.allow_list.is_authorized(caller) && !self.ownership.is_owner(caller) {
            tracing::warn!(%caller, "revocation rejected: caller not authorized");
            return Err(GateError::Unauthorized(*caller));
        }

        self.ledger.revoke(&self.instance, request.groups())?;

        let count = request.entry_count();
        tracing::info!(%caller, count, "batch revoked");
        self.events.emit(GateEvent::BatchRevoked {
            revoker: *caller,
            count,
        });
        Ok(())
    }

    pub fn record(&self, id: &RecordId) -> Option<Record> {
        self.ledger.record(id)
    }
}

/// A staged ledger write awaiting commit
pub struct PendingBatch<'a> {
    adapter: &'a RecordStoreAdapter,
    submitter: Identity,
    recipient: Option<Identity>,
    ticket: u64,
    record_ids: Vec<RecordId>,
    committed: bool,
}

impl PendingBatch<'_> {
    pub fn record_ids(&self) -> &[RecordId] {
        &self.record_ids
    }

    /// Make the staged records visible and return their ids.
    pub fn commit(mut self) -> Result<Vec<RecordId>> {
        self.adapter.ledger.commit_write(self.ticket)?;
        self.committed = true;

        let ids = std::mem::take(&mut self.record_ids);
        tracing::info!(
            submitter = %self.submitter,
            count = ids.len(),
            "batch submitted"
        );
        self.adapter.events.emit(GateEvent::BatchSubmitted {
            submitter: self.submitter,
            recipient: self.recipient,
            count: ids.len(),
        });
        Ok(ids)
    }
}

impl Drop for PendingBatch<'_> {
    fn drop(&mut self) {
        if !self.committed {
            tracing::debug!(ticket = self.ticket, "aborting staged write");
            self.adapter.ledger.abort_write(self.ticket);
        }
    }
}
