// src/crypto.rs
//! Hashing and secp256k1 signer recovery.
//!
//! Signatures are 65 bytes: `r (32) || s (32) || v (1)` where `v` is the
//! recovery id, either raw (0/1) or offset by 27 (27/28). High-`s` values are
//! rejected during recovery.

use crate::error::{GateError, Result};
use crate::identity::Identity;
use k256::ecdsa::{RecoveryId, Signature, SigningKey, VerifyingKey};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Keccak256 hash
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    use tiny_keccak::{Hasher, Keccak};
    let mut hasher = Keccak::v256();
    hasher.update(data);
    let mut output = [0u8; 32];
    hasher.finalize(&mut output);
    output
}

/// Keccak256 over several slices without concatenating them first.
pub fn keccak256_concat(parts: &[&[u8]]) -> [u8; 32] {
    use tiny_keccak::{Hasher, Keccak};
    let mut hasher = Keccak::v256();
    for part in parts {
        hasher.update(part);
    }
    let mut output = [0u8; 32];
    hasher.finalize(&mut output);
    output
}

/// Recoverable ECDSA signature (`r || s || v`)
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct RecoverableSignature([u8; 65]);

impl RecoverableSignature {
    pub const LEN: usize = 65;

    pub fn from_bytes(bytes: [u8; 65]) -> Self {
        Self(bytes)
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let array: [u8; 65] = bytes
            .try_into()
            .map_err(|_| GateError::InvalidSignature)?;
        Ok(Self(array))
    }

    pub fn as_bytes(&self) -> &[u8; 65] {
        &self.0
    }

    fn recovery_id(&self) -> Result<RecoveryId> {
        let v = match self.0[64] {
            v @ (0 | 1) => v,
            v @ (27 | 28) => v - 27,
            _ => return Err(GateError::InvalidSignature),
        };
        RecoveryId::from_byte(v).ok_or(GateError::InvalidSignature)
    }
}

impl fmt::Display for RecoverableSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for RecoverableSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RecoverableSignature({})", self)
    }
}

impl FromStr for RecoverableSignature {
    type Err = GateError;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(trimmed).map_err(|_| GateError::InvalidSignature)?;
        Self::from_slice(&bytes)
    }
}

impl Serialize for RecoverableSignature {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for RecoverableSignature {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Sign a 32-byte digest, producing a signature with `v` in {27, 28}.
pub fn sign_digest(key: &SigningKey, digest: &[u8; 32]) -> Result<RecoverableSignature> {
    let (signature, recovery_id) = key
        .sign_prehash_recoverable(digest)
        .map_err(|_| GateError::InvalidSignature)?;
    let mut out = [0u8; 65];
    out[..64].copy_from_slice(&signature.to_bytes());
    out[64] = recovery_id.to_byte() + 27;
    Ok(RecoverableSignature(out))
}

/// Recover the identity that produced `signature` over `digest`.
pub fn recover_signer(digest: &[u8; 32], signature: &RecoverableSignature) -> Result<Identity> {
    let recovery_id = signature.recovery_id()?;
    let sig =
        Signature::from_slice(&signature.0[..64]).map_err(|_| GateError::InvalidSignature)?;
    let key = VerifyingKey::recover_from_prehash(digest, &sig, recovery_id)
        .map_err(|_| GateError::InvalidSignature)?;
    Ok(Identity::from_verifying_key(&key))
}
