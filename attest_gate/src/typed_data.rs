// src/typed_data.rs
//! Structured-data hashing for authorization envelopes.
//!
//! Follows the EIP-712 encoding: every struct is hashed as
//! `keccak256(type_hash || encoded fields)`, dynamic `bytes` and `string`
//! fields are replaced by their hash, arrays by the hash of the concatenated
//! element hashes, and the final digest is
//! `keccak256(0x19 0x01 || domain_separator || struct_hash)`.
//!
//! Everything here is a pure function of its inputs, so off-system signers
//! (see `attest_sdk`) produce byte-identical digests.

use crate::crypto::{keccak256, keccak256_concat};
use crate::identity::Identity;
use crate::record_store::{AttestationGroup, BatchRequest, RecordEntry};
use serde::{Deserialize, Serialize};

pub const DOMAIN_TYPE: &str =
    "EIP712Domain(string name,string version,uint256 chainId,address verifyingContract)";

pub const ENTRY_TYPE: &str = "AttestationRequestData(address recipient,uint64 expirationTime,bool revocable,bytes32 refUID,bytes data,uint256 value)";

pub const GROUP_TYPE: &str = "MultiAttestationRequest(bytes32 schema,AttestationRequestData[] data)";

pub const ENVELOPE_TYPE: &str =
    "AttestationEnvelope(MultiAttestationRequest[] requests,uint256 nonce,uint256 fee)";

/// Signing domain binding an envelope to one verifier deployment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Domain {
    pub name: String,
    pub version: String,
    pub chain_id: u64,
    /// Identity of the verifier instance
    pub verifying_contract: Identity,
}

impl Domain {
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        chain_id: u64,
        verifying_contract: Identity,
    ) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            chain_id,
            verifying_contract,
        }
    }

    pub fn separator(&self) -> [u8; 32] {
        keccak256_concat(&[
            &keccak256(DOMAIN_TYPE.as_bytes()),
            &keccak256(self.name.as_bytes()),
            &keccak256(self.version.as_bytes()),
            &uint_word(self.chain_id as u128),
            &self.verifying_contract.to_word(),
        ])
    }
}

/// The exact message a trusted signer authorizes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationEnvelope {
    pub batch: BatchRequest,
    pub nonce: u64,
    /// Fee the signer requires, in smallest native units
    pub fee: u128,
}

impl AuthorizationEnvelope {
    pub fn new(batch: BatchRequest, nonce: u64, fee: u128) -> Self {
        Self { batch, nonce, fee }
    }

    pub fn struct_hash(&self) -> [u8; 32] {
        let groups: Vec<[u8; 32]> = self.batch.groups().iter().map(group_hash).collect();
        keccak256_concat(&[
            &envelope_type_hash(),
            &hash_words(&groups),
            &uint_word(self.nonce as u128),
            &uint_word(self.fee),
        ])
    }

    /// Digest that is signed and recovered from.
    pub fn digest(&self, domain: &Domain) -> [u8; 32] {
        typed_digest(&domain.separator(), &self.struct_hash())
    }
}

pub fn typed_digest(domain_separator: &[u8; 32], struct_hash: &[u8; 32]) -> [u8; 32] {
    keccak256_concat(&[&[0x19u8, 0x01], domain_separator, struct_hash])
}

pub fn entry_type_hash() -> [u8; 32] {
    keccak256(ENTRY_TYPE.as_bytes())
}

pub fn group_type_hash() -> [u8; 32] {
    keccak256(format!("{GROUP_TYPE}{ENTRY_TYPE}").as_bytes())
}

// Referenced types are appended in alphabetical order.
pub fn envelope_type_hash() -> [u8; 32] {
    keccak256(format!("{ENVELOPE_TYPE}{ENTRY_TYPE}{GROUP_TYPE}").as_bytes())
}

pub fn entry_hash(entry: &RecordEntry) -> [u8; 32] {
    let ref_record = entry
        .ref_record
        .map(|r| *r.as_bytes())
        .unwrap_or([0u8; 32]);
    keccak256_concat(&[
        &entry_type_hash(),
        &entry.recipient.to_word(),
        &uint_word(entry.expiration.unwrap_or(0) as u128),
        &uint_word(entry.revocable as u128),
        &ref_record,
        &keccak256(&entry.data),
        &uint_word(entry.value),
    ])
}

pub fn group_hash(group: &AttestationGroup) -> [u8; 32] {
    let entries: Vec<[u8; 32]> = group.entries.iter().map(entry_hash).collect();
    keccak256_concat(&[
        &group_type_hash(),
        group.schema.as_bytes(),
        &hash_words(&entries),
    ])
}

fn hash_words(words: &[[u8; 32]]) -> [u8; 32] {
    let parts: Vec<&[u8]> = words.iter().map(|w| w.as_slice()).collect();
    keccak256_concat(&parts)
}

fn uint_word(value: u128) -> [u8; 32] {
    let mut word = [0u8; 32];
    word[16..].copy_from_slice(&value.to_be_bytes());
    word
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::{RecordId, SchemaId};

    fn sample_envelope() -> AuthorizationEnvelope {
        let recipient: Identity = "0x00000000000000000000000000000000000000a1"
            .parse()
            .unwrap();
        let batch = BatchRequest::new(vec![AttestationGroup::new(
            SchemaId::new([0x11; 32]),
            vec![RecordEntry::new(recipient, vec![0xde, 0xad, 0xbe, 0xef])],
        )]);
        AuthorizationEnvelope::new(batch, 0, 1_000_000_000_000_000)
    }

    fn sample_domain() -> Domain {
        Domain::new(
            "AttestationGateway",
            "1",
            1,
            "0x00000000000000000000000000000000000000ee"
                .parse()
                .unwrap(),
        )
    }

    #[test]
    fn test_domain_type_hash() {
        assert_eq!(
            hex::encode(keccak256(DOMAIN_TYPE.as_bytes())),
            "8b73c3c69bb8fe3d512ecc4cf759cc79239f7b179b0ffacaa9a75d522b39400f"
        );
    }

    #[test]
    fn test_domain_separator_reference_vector() {
        // "Ether Mail" domain from the EIP-712 reference example
        let domain = Domain::new(
            "Ether Mail",
            "1",
            1,
            "0xCcCCccccCCCCcCCCCCCcCcCccCcCCCcCcccccccC".parse().unwrap(),
        );
        assert_eq!(
            hex::encode(domain.separator()),
            "f2cee375fa42b42143804025fc449deafd50cc031ca257e0b194a650a912090f"
        );
    }

    #[test]
    fn test_envelope_digest_fixture() {
        let envelope = sample_envelope();
        assert_eq!(
            hex::encode(envelope.digest(&sample_domain())),
            "e2c80dd000a8e5f0cae33e9b688ef1a8321e7f42d7f8883f214596602939c9a3"
        );
    }

    #[test]
    fn test_digest_binds_every_field() {
        let domain = sample_domain();
        let base = sample_envelope();
        let digest = base.digest(&domain);

        let mut bumped_nonce = base.clone();
        bumped_nonce.nonce = 1;
        assert_ne!(bumped_nonce.digest(&domain), digest);

        let mut other_fee = base.clone();
        other_fee.fee += 1;
        assert_ne!(other_fee.digest(&domain), digest);

        let mut groups = base.batch.groups().to_vec();
        groups[0].entries[0] = groups[0].entries[0].clone().with_ref(RecordId::new([1; 32]));
        let other_batch = AuthorizationEnvelope::new(BatchRequest::new(groups), 0, base.fee);
        assert_ne!(other_batch.digest(&domain), digest);

        let mut other_domain = domain.clone();
        other_domain.chain_id = 5;
        assert_ne!(base.digest(&other_domain), digest);
    }

    #[test]
    fn test_group_boundaries_change_digest() {
        let r = Identity::new([0xa1; 20]);
        let schema = SchemaId::new([0x11; 32]);
        let one = BatchRequest::new(vec![AttestationGroup::new(
            schema,
            vec![RecordEntry::new(r, vec![1]), RecordEntry::new(r, vec![2])],
        )]);
        let split = BatchRequest::new(vec![
            AttestationGroup::new(schema, vec![RecordEntry::new(r, vec![1])]),
            AttestationGroup::new(schema, vec![RecordEntry::new(r, vec![2])]),
        ]);
        assert_ne!(
            AuthorizationEnvelope::new(one, 0, 0).struct_hash(),
            AuthorizationEnvelope::new(split, 0, 0).struct_hash()
        );
    }

    #[test]
    fn test_uint_word_is_big_endian() {
        let word = uint_word(0x0102);
        assert_eq!(word[30..], [0x01, 0x02]);
        assert!(word[..30].iter().all(|b| *b == 0));
    }
}
