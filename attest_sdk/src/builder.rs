use crate::error::{Result, SdkError};
use attest_gate::{AttestationGroup, AuthorizationEnvelope, BatchRequest, RecordEntry, SchemaId};

/// Builder for record batches and the envelopes that authorize them.
///
/// Entries keep the order they were added in; consecutive entries under the
/// same schema share a group.
pub struct BatchRequestBuilder {
    groups: Vec<AttestationGroup>,
    nonce: u64,
    fee: u128,
}

impl BatchRequestBuilder {
    pub fn new() -> Self {
        Self {
            groups: Vec::new(),
            nonce: 0,
            fee: 0,
        }
    }

    pub fn attest(mut self, schema: SchemaId, entry: RecordEntry) -> Self {
        match self.groups.last_mut() {
            Some(group) if group.schema == schema => group.entries.push(entry),
            _ => self.groups.push(AttestationGroup::new(schema, vec![entry])),
        }
        self
    }

    pub fn attest_all(mut self, schema: SchemaId, entries: impl IntoIterator<Item = RecordEntry>) -> Self {
        for entry in entries {
            self = self.attest(schema, entry);
        }
        self
    }

    /// Recipient nonce the envelope will carry
    pub fn nonce(mut self, nonce: u64) -> Self {
        self.nonce = nonce;
        self
    }

    /// Fee the envelope will require, in smallest native units
    pub fn fee(mut self, fee: u128) -> Self {
        self.fee = fee;
        self
    }

    pub fn build(self) -> Result<BatchRequest> {
        let batch = BatchRequest::new(self.groups);
        if batch.is_empty() {
            return Err(SdkError::InvalidConfig("batch has no entries".into()));
        }
        Ok(batch)
    }

    pub fn build_envelope(self) -> Result<AuthorizationEnvelope> {
        let (nonce, fee) = (self.nonce, self.fee);
        Ok(AuthorizationEnvelope::new(self.build()?, nonce, fee))
    }
}

impl Default for BatchRequestBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use attest_gate::Identity;

    fn entry(b: u8) -> RecordEntry {
        RecordEntry::new(Identity::new([0xa1; 20]), vec![b])
    }

    #[test]
    fn test_consecutive_entries_share_group() {
        let s1 = SchemaId::new([1; 32]);
        let s2 = SchemaId::new([2; 32]);
        let batch = BatchRequestBuilder::new()
            .attest(s1, entry(1))
            .attest(s1, entry(2))
            .attest(s2, entry(3))
            .attest(s1, entry(4))
            .build()
            .unwrap();

        let sizes: Vec<(SchemaId, usize)> = batch
            .groups()
            .iter()
            .map(|g| (g.schema, g.entries.len()))
            .collect();
        assert_eq!(sizes, vec![(s1, 2), (s2, 1), (s1, 1)]);
    }

    #[test]
    fn test_envelope_fields() {
        let envelope = BatchRequestBuilder::new()
            .attest_all(SchemaId::new([1; 32]), (0..3).map(entry))
            .nonce(4)
            .fee(1_000)
            .build_envelope()
            .unwrap();
        assert_eq!(envelope.nonce, 4);
        assert_eq!(envelope.fee, 1_000);
        assert_eq!(envelope.batch.entry_count(), 3);
    }

    #[test]
    fn test_empty_batch_refused() {
        assert!(matches!(
            BatchRequestBuilder::new().fee(1).build_envelope(),
            Err(SdkError::InvalidConfig(_))
        ));
    }
}
