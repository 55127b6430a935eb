use crate::error::{Result, SdkError};
use attest_gate::{sign_digest, AuthorizationEnvelope, Domain, Identity, RecoverableSignature};
use k256::ecdsa::SigningKey;
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Off-system signer producing envelope signatures a gateway will accept
/// when its identity is the configured trusted signer.
pub struct EnvelopeSigner {
    key: SigningKey,
    identity: Identity,
}

impl EnvelopeSigner {
    pub fn new(key: SigningKey) -> Self {
        let identity = Identity::from_verifying_key(key.verifying_key());
        Self { key, identity }
    }

    /// Generate a fresh random key
    pub fn random() -> Self {
        Self::new(SigningKey::random(&mut OsRng))
    }

    /// Load from a 32-byte secp256k1 secret in hex (0x prefix optional)
    pub fn from_key_hex(secret_hex: &str) -> Result<Self> {
        let trimmed = secret_hex.trim();
        let trimmed = trimmed.strip_prefix("0x").unwrap_or(trimmed);
        let bytes = hex::decode(trimmed).map_err(|e| SdkError::InvalidKey(e.to_string()))?;
        if bytes.len() != 32 {
            return Err(SdkError::InvalidKey(format!(
                "expected 32 bytes, got {}",
                bytes.len()
            )));
        }
        let key = SigningKey::from_slice(&bytes)
            .map_err(|_| SdkError::InvalidKey("scalar out of range".into()))?;
        Ok(Self::new(key))
    }

    /// Identity to configure as the gateway's trusted signer
    pub fn identity(&self) -> Identity {
        self.identity
    }

    /// Secret key as 0x-prefixed hex
    pub fn secret_hex(&self) -> String {
        format!("0x{}", hex::encode(self.key.to_bytes()))
    }

    pub fn sign(
        &self,
        envelope: &AuthorizationEnvelope,
        domain: &Domain,
    ) -> Result<RecoverableSignature> {
        Ok(sign_digest(&self.key, &envelope.digest(domain))?)
    }

    /// Sign and bundle the envelope with its signature for a relayer
    pub fn sign_envelope(
        &self,
        envelope: AuthorizationEnvelope,
        domain: &Domain,
    ) -> Result<SignedEnvelope> {
        let signature = self.sign(&envelope, domain)?;
        Ok(SignedEnvelope {
            envelope,
            signature,
        })
    }
}

impl fmt::Debug for EnvelopeSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnvelopeSigner")
            .field("identity", &self.identity)
            .finish_non_exhaustive()
    }
}

/// Envelope plus signature, as handed to whoever submits it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedEnvelope {
    pub envelope: AuthorizationEnvelope,
    pub signature: RecoverableSignature,
}

impl SignedEnvelope {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use attest_gate::{recover_signer, AttestationGroup, BatchRequest, RecordEntry, SchemaId};

    const KEY_ONE: &str = "0x0000000000000000000000000000000000000000000000000000000000000001";

    fn envelope() -> AuthorizationEnvelope {
        let batch = BatchRequest::new(vec![AttestationGroup::new(
            SchemaId::new([3; 32]),
            vec![RecordEntry::new(Identity::new([0xa1; 20]), vec![1, 2, 3])],
        )]);
        AuthorizationEnvelope::new(batch, 0, 10)
    }

    #[test]
    fn test_known_key_identity() {
        let signer = EnvelopeSigner::from_key_hex(KEY_ONE).unwrap();
        assert_eq!(
            signer.identity().to_string(),
            "0x7e5f4552091a69125d5dfcb7b8c2659029395bdf"
        );
        assert_eq!(signer.secret_hex(), KEY_ONE);
    }

    #[test]
    fn test_bad_keys_rejected() {
        assert!(matches!(
            EnvelopeSigner::from_key_hex("zz"),
            Err(SdkError::InvalidKey(_))
        ));
        assert!(matches!(
            EnvelopeSigner::from_key_hex("0x0102"),
            Err(SdkError::InvalidKey(_))
        ));
        // zero is not a valid scalar
        assert!(matches!(
            EnvelopeSigner::from_key_hex(&"00".repeat(32)),
            Err(SdkError::InvalidKey(_))
        ));
    }

    #[test]
    fn test_signature_recovers_to_signer() {
        let signer = EnvelopeSigner::random();
        let domain = Domain::new("AttestationGateway", "1", 1, Identity::new([0xee; 20]));
        let env = envelope();
        let signature = signer.sign(&env, &domain).unwrap();
        assert_eq!(
            recover_signer(&env.digest(&domain), &signature).unwrap(),
            signer.identity()
        );
    }

    #[test]
    fn test_signed_envelope_json() {
        let signer = EnvelopeSigner::from_key_hex(KEY_ONE).unwrap();
        let domain = Domain::new("AttestationGateway", "1", 1, Identity::new([0xee; 20]));
        let signed = signer.sign_envelope(envelope(), &domain).unwrap();

        let json = signed.to_json().unwrap();
        assert!(json.contains("\"signature\": \"0x"));
        assert_eq!(SignedEnvelope::from_json(&json).unwrap(), signed);
    }

    #[test]
    fn test_debug_hides_key() {
        let signer = EnvelopeSigner::from_key_hex(KEY_ONE).unwrap();
        let debug = format!("{:?}", signer);
        assert!(!debug.contains(&KEY_ONE[2..]));
    }
}
