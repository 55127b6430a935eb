// src/record_store/memory.rs
// In-process RecordLedger: schema registry, records, staged writes.
// Used for development and tests; failure hooks simulate a misbehaving ledger.

use super::types::{AttestationGroup, Record, RevocationGroup};
use super::{RecordLedger, StagedWrite};
use crate::crypto::keccak256_concat;
use crate::error::LedgerError;
use crate::identity::{Identity, RecordId, SchemaId};
use chrono::Utc;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone)]
struct SchemaRecord {
    definition: String,
    revocable: bool,
}

#[derive(Debug, Default)]
struct LedgerState {
    schemas: HashMap<SchemaId, SchemaRecord>,
    records: HashMap<RecordId, Record>,
    staged: HashMap<u64, Vec<Record>>,
    next_ticket: u64,
    /// Mixed into every record id so identical entries still get unique ids
    bump: u64,
    fail_next_stage: Option<LedgerError>,
    fail_next_commit: Option<LedgerError>,
    drop_ids_next_stage: usize,
}

#[derive(Debug, Default)]
pub struct InMemoryLedger {
    state: Mutex<LedgerState>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a schema and return its id. Registering the same definition
    /// twice returns the same id.
    pub fn register_schema(&self, definition: &str, revocable: bool) -> SchemaId {
        let id = SchemaId::new(keccak256_concat(&[
            definition.as_bytes(),
            &[revocable as u8],
        ]));
        self.state
            .lock()
            .schemas
            .entry(id)
            .or_insert_with(|| SchemaRecord {
                definition: definition.to_string(),
                revocable,
            });
        id
    }

    pub fn schema_definition(&self, schema: &SchemaId) -> Option<String> {
        self.state
            .lock()
            .schemas
            .get(schema)
            .map(|s| s.definition.clone())
    }

    /// Committed records
    pub fn record_count(&self) -> usize {
        self.state.lock().records.len()
    }

    /// Writes staged but neither committed nor aborted
    pub fn staged_count(&self) -> usize {
        self.state.lock().staged.len()
    }

    /// Make the next `stage_write` fail with `error`.
    pub fn fail_next_stage(&self, error: LedgerError) {
        self.state.lock().fail_next_stage = Some(error);
    }

    /// Make the next `commit_write` fail with `error`.
    pub fn fail_next_commit(&self, error: LedgerError) {
        self.state.lock().fail_next_commit = Some(error);
    }

    /// Make the next `stage_write` report `n` fewer ids than entries.
    pub fn drop_ids_on_next_stage(&self, n: usize) {
        self.state.lock().drop_ids_next_stage = n;
    }
}

#[allow(clippy::too_many_arguments)]
fn record_id(
    schema: &SchemaId,
    recipient: &Identity,
    attester: &Identity,
    created_at: i64,
    expiration: u64,
    revocable: bool,
    ref_record: &RecordId,
    data: &[u8],
    bump: u64,
) -> RecordId {
    RecordId::new(keccak256_concat(&[
        schema.as_bytes(),
        recipient.as_bytes(),
        attester.as_bytes(),
        &created_at.to_be_bytes(),
        &expiration.to_be_bytes(),
        &[revocable as u8],
        ref_record.as_bytes(),
        data,
        &bump.to_be_bytes(),
    ]))
}

impl RecordLedger for InMemoryLedger {
    fn stage_write(
        &self,
        attester: &Identity,
        groups: &[AttestationGroup],
    ) -> Result<StagedWrite, LedgerError> {
        let mut state = self.state.lock();
        if let Some(err) = state.fail_next_stage.take() {
            return Err(err);
        }

        let now = Utc::now();
        let now_secs = now.timestamp().max(0) as u64;
        let mut staged = Vec::new();

        for group in groups {
            let schema = state
                .schemas
                .get(&group.schema)
                .ok_or(LedgerError::UnknownSchema(group.schema))?;
            let schema_revocable = schema.revocable;

            for entry in &group.entries {
                if entry.revocable && !schema_revocable {
                    return Err(LedgerError::IrrevocableSchema(group.schema));
                }
                if let Some(expiration) = entry.expiration {
                    if expiration <= now_secs {
                        return Err(LedgerError::InvalidExpiration(expiration));
                    }
                }
                if let Some(reference) = entry.ref_record {
                    if !state.records.contains_key(&reference) {
                        return Err(LedgerError::MissingReference(reference));
                    }
                }

                state.bump += 1;
                let id = record_id(
                    &group.schema,
                    &entry.recipient,
                    attester,
                    now.timestamp(),
                    entry.expiration.unwrap_or(0),
                    entry.revocable,
                    &entry.ref_record.unwrap_or(RecordId::ZERO),
                    &entry.data,
                    state.bump,
                );
                staged.push(Record {
                    id,
                    schema: group.schema,
                    attester: *attester,
                    recipient: entry.recipient,
                    created_at: now,
                    expiration: entry.expiration,
                    revoked_at: None,
                    revocable: entry.revocable,
                    ref_record: entry.ref_record,
                    data: entry.data.clone(),
                    value: entry.value,
                });
            }
        }

        let mut record_ids: Vec<RecordId> = staged.iter().map(|r| r.id).collect();
        let dropped = std::mem::take(&mut state.drop_ids_next_stage);
        record_ids.truncate(record_ids.len().saturating_sub(dropped));

        let ticket = state.next_ticket;
        state.next_ticket += 1;
        state.staged.insert(ticket, staged);

        Ok(StagedWrite { ticket, record_ids })
    }

    fn commit_write(&self, ticket: u64) -> Result<(), LedgerError> {
        let mut state = self.state.lock();
        if let Some(err) = state.fail_next_commit.take() {
            return Err(err);
        }
        let records = state
            .staged
            .remove(&ticket)
            .ok_or(LedgerError::UnknownTicket(ticket))?;
        for record in records {
            state.records.insert(record.id, record);
        }
        Ok(())
    }

    fn abort_write(&self, ticket: u64) {
        self.state.lock().staged.remove(&ticket);
    }

    fn revoke(&self, revoker: &Identity, groups: &[RevocationGroup]) -> Result<(), LedgerError> {
        let mut state = self.state.lock();

        // Validate everything before touching any record
        let mut seen = HashSet::new();
        for group in groups {
            if !state.schemas.contains_key(&group.schema) {
                return Err(LedgerError::UnknownSchema(group.schema));
            }
            for entry in &group.entries {
                let record = state
                    .records
                    .get(&entry.record)
                    .ok_or(LedgerError::RecordNotFound(entry.record))?;
                if record.schema != group.schema {
                    return Err(LedgerError::SchemaMismatch(entry.record, record.schema));
                }
                if record.attester != *revoker {
                    return Err(LedgerError::AccessDenied(entry.record));
                }
                if !record.revocable {
                    return Err(LedgerError::Irrevocable(entry.record));
                }
                if record.is_revoked() || !seen.insert(entry.record) {
                    return Err(LedgerError::AlreadyRevoked(entry.record));
                }
            }
        }

        let now = Utc::now();
        for id in seen {
            if let Some(record) = state.records.get_mut(&id) {
                record.revoked_at = Some(now);
            }
        }
        Ok(())
    }

    fn record(&self, id: &RecordId) -> Option<Record> {
        self.state.lock().records.get(id).cloned()
    }

    fn schema_exists(&self, schema: &SchemaId) -> bool {
        self.state.lock().schemas.contains_key(schema)
    }
}
