// src/record_store/types.rs
//! Batch and revocation request shapes shared by the adapter, the verifier
//! and the external ledger.

use crate::error::GateError;
use crate::identity::{Identity, RecordId, SchemaId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One record to be written
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordEntry {
    pub recipient: Identity,
    /// Unix seconds after which the record is considered expired
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiration: Option<u64>,
    pub revocable: bool,
    /// Earlier record this one refers to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ref_record: Option<RecordId>,
    /// Opaque, already-encoded credential payload
    #[serde(with = "hex_bytes")]
    pub data: Vec<u8>,
    #[serde(default)]
    pub value: u128,
}

impl RecordEntry {
    pub fn new(recipient: Identity, data: Vec<u8>) -> Self {
        Self {
            recipient,
            expiration: None,
            revocable: true,
            ref_record: None,
            data,
            value: 0,
        }
    }

    pub fn with_expiration(mut self, unix_secs: u64) -> Self {
        self.expiration = Some(unix_secs);
        self
    }

    pub fn with_revocable(mut self, revocable: bool) -> Self {
        self.revocable = revocable;
        self
    }

    pub fn with_ref(mut self, record: RecordId) -> Self {
        self.ref_record = Some(record);
        self
    }

    pub fn with_value(mut self, value: u128) -> Self {
        self.value = value;
        self
    }
}

/// Entries written under a single schema
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttestationGroup {
    pub schema: SchemaId,
    pub entries: Vec<RecordEntry>,
}

impl AttestationGroup {
    pub fn new(schema: SchemaId, entries: Vec<RecordEntry>) -> Self {
        Self { schema, entries }
    }
}

/// Ordered groups of record writes submitted in one call
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BatchRequest {
    groups: Vec<AttestationGroup>,
}

impl BatchRequest {
    pub fn new(groups: Vec<AttestationGroup>) -> Self {
        Self { groups }
    }

    pub fn groups(&self) -> &[AttestationGroup] {
        &self.groups
    }

    /// Total number of entries across all groups
    pub fn entry_count(&self) -> usize {
        self.groups.iter().map(|g| g.entries.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entry_count() == 0
    }

    /// Recipient of the first entry; the envelope is authorized on its behalf
    pub fn first_recipient(&self) -> Option<Identity> {
        self.groups
            .iter()
            .flat_map(|g| g.entries.iter())
            .next()
            .map(|e| e.recipient)
    }

    /// Pair record ids returned for this batch with the schema they were
    /// written under. Ids are matched positionally; extra ids are ignored.
    pub fn correlate(&self, record_ids: &[RecordId]) -> Vec<(SchemaId, RecordId)> {
        self.groups
            .iter()
            .flat_map(|g| g.entries.iter().map(move |_| g.schema))
            .zip(record_ids.iter().copied())
            .collect()
    }
}

impl From<Vec<AttestationGroup>> for BatchRequest {
    fn from(groups: Vec<AttestationGroup>) -> Self {
        Self::new(groups)
    }
}

/// One record to revoke
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevocationEntry {
    pub record: RecordId,
    #[serde(default)]
    pub value: u128,
}

/// Revocations under a single schema
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevocationGroup {
    pub schema: SchemaId,
    pub entries: Vec<RevocationEntry>,
}

/// Ordered revocation groups with at most one group per schema
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "Vec<RevocationGroup>", into = "Vec<RevocationGroup>")]
pub struct RevocationRequest {
    groups: Vec<RevocationGroup>,
}

impl RevocationRequest {
    /// Build from pre-grouped entries, rejecting repeated schemas.
    pub fn new(groups: Vec<RevocationGroup>) -> Result<Self, GateError> {
        let mut seen = std::collections::HashSet::with_capacity(groups.len());
        for group in &groups {
            if !seen.insert(group.schema) {
                return Err(GateError::DuplicateSchema(group.schema));
            }
        }
        Ok(Self { groups })
    }

    pub fn groups(&self) -> &[RevocationGroup] {
        &self.groups
    }

    pub fn entry_count(&self) -> usize {
        self.groups.iter().map(|g| g.entries.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entry_count() == 0
    }
}

impl TryFrom<Vec<RevocationGroup>> for RevocationRequest {
    type Error = GateError;

    fn try_from(groups: Vec<RevocationGroup>) -> Result<Self, Self::Error> {
        Self::new(groups)
    }
}

impl From<RevocationRequest> for Vec<RevocationGroup> {
    fn from(request: RevocationRequest) -> Self {
        request.groups
    }
}

/// Collects revocations and coalesces them by schema, keeping the order in
/// which schemas were first seen.
#[derive(Debug, Default)]
pub struct RevocationRequestBuilder {
    groups: Vec<RevocationGroup>,
    index: HashMap<SchemaId, usize>,
}

impl RevocationRequestBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn revoke(mut self, schema: SchemaId, record: RecordId) -> Self {
        self.push(schema, RevocationEntry { record, value: 0 });
        self
    }

    pub fn revoke_with_value(mut self, schema: SchemaId, record: RecordId, value: u128) -> Self {
        self.push(schema, RevocationEntry { record, value });
        self
    }

    /// Add every `(schema, record)` pair, e.g. the output of
    /// [`BatchRequest::correlate`].
    pub fn extend<I>(mut self, records: I) -> Self
    where
        I: IntoIterator<Item = (SchemaId, RecordId)>,
    {
        for (schema, record) in records {
            self.push(schema, RevocationEntry { record, value: 0 });
        }
        self
    }

    fn push(&mut self, schema: SchemaId, entry: RevocationEntry) {
        match self.index.get(&schema) {
            Some(&i) => self.groups[i].entries.push(entry),
            None => {
                self.index.insert(schema, self.groups.len());
                self.groups.push(RevocationGroup {
                    schema,
                    entries: vec![entry],
                });
            }
        }
    }

    pub fn build(self) -> RevocationRequest {
        RevocationRequest {
            groups: self.groups,
        }
    }
}

/// A committed record as stored by the ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub id: RecordId,
    pub schema: SchemaId,
    pub attester: Identity,
    pub recipient: Identity,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiration: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revoked_at: Option<DateTime<Utc>>,
    pub revocable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ref_record: Option<RecordId>,
    #[serde(with = "hex_bytes")]
    pub data: Vec<u8>,
    pub value: u128,
}

impl Record {
    pub fn is_revoked(&self) -> bool {
        self.revoked_at.is_some()
    }
}

mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("0x{}", hex::encode(bytes)))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        hex::decode(s.strip_prefix("0x").unwrap_or(&s)).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema(b: u8) -> SchemaId {
        SchemaId::new([b; 32])
    }

    fn record(b: u8) -> RecordId {
        RecordId::new([b; 32])
    }

    fn batch() -> BatchRequest {
        let alice = Identity::new([0xa1; 20]);
        BatchRequest::new(vec![
            AttestationGroup::new(
                schema(1),
                vec![
                    RecordEntry::new(alice, vec![1]),
                    RecordEntry::new(alice, vec![2]),
                ],
            ),
            AttestationGroup::new(schema(2), vec![RecordEntry::new(alice, vec![3])]),
        ])
    }

    #[test]
    fn test_entry_count_and_recipient() {
        let batch = batch();
        assert_eq!(batch.entry_count(), 3);
        assert_eq!(batch.first_recipient(), Some(Identity::new([0xa1; 20])));

        let empty = BatchRequest::new(vec![AttestationGroup::new(schema(1), vec![])]);
        assert!(empty.is_empty());
        assert_eq!(empty.first_recipient(), None);
    }

    #[test]
    fn test_first_recipient_skips_empty_groups() {
        let bob = Identity::new([0xb0; 20]);
        let batch = BatchRequest::new(vec![
            AttestationGroup::new(schema(1), vec![]),
            AttestationGroup::new(schema(2), vec![RecordEntry::new(bob, vec![])]),
        ]);
        assert_eq!(batch.first_recipient(), Some(bob));
    }

    #[test]
    fn test_correlate_pairs_ids_with_schema() {
        let pairs = batch().correlate(&[record(10), record(11), record(12)]);
        assert_eq!(
            pairs,
            vec![
                (schema(1), record(10)),
                (schema(1), record(11)),
                (schema(2), record(12)),
            ]
        );
    }

    #[test]
    fn test_builder_coalesces_by_schema() {
        let request = RevocationRequestBuilder::new()
            .revoke(schema(1), record(1))
            .revoke(schema(2), record(2))
            .revoke_with_value(schema(1), record(3), 7)
            .build();

        assert_eq!(request.groups().len(), 2);
        assert_eq!(request.groups()[0].schema, schema(1));
        assert_eq!(
            request.groups()[0].entries,
            vec![
                RevocationEntry {
                    record: record(1),
                    value: 0
                },
                RevocationEntry {
                    record: record(3),
                    value: 7
                },
            ]
        );
        assert_eq!(request.entry_count(), 3);
    }

    #[test]
    fn test_duplicate_schema_groups_rejected() {
        let group = RevocationGroup {
            schema: schema(1),
            entries: vec![],
        };
        assert_eq!(
            RevocationRequest::new(vec![group.clone(), group.clone()]),
            Err(GateError::DuplicateSchema(schema(1)))
        );

        let json = serde_json::to_string(&vec![group.clone(), group]).unwrap();
        assert!(serde_json::from_str::<RevocationRequest>(&json).is_err());
    }

    #[test]
    fn test_entry_json_uses_hex_payload() {
        let entry = RecordEntry::new(Identity::new([1; 20]), vec![0xde, 0xad]);
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["data"], "0xdead");
        let back: RecordEntry = serde_json::from_value(json).unwrap();
        assert_eq!(back, entry);
    }
}
