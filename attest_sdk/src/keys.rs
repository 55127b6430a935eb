// src/keys.rs
use crate::error::{Result, SdkError};
use crate::signer::EnvelopeSigner;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

const SECRETS_DIR: &str = "/run/secrets";

/// Load a secret by checking, in order:
/// 1) Docker secret file at /run/secrets/<name>
/// 2) Environment variable <name>
///
/// Returns `Some(String)` if found, otherwise `None`.
pub fn load_secret(name: &str) -> Option<String> {
    load_secret_from(Path::new(SECRETS_DIR), name)
}

/// Same as [`load_secret`] with a custom secrets directory. A secret file
/// that exists but cannot be read yields `None`; see [`read_secret`].
pub fn load_secret_from(dir: &Path, name: &str) -> Option<String> {
    read_secret(dir, name).ok().flatten()
}

/// Like [`load_secret_from`], but a secret file that exists and cannot be
/// read is an error rather than a fallback to the environment.
pub fn read_secret(dir: &Path, name: &str) -> Result<Option<String>> {
    match fs::read_to_string(dir.join(name)) {
        Ok(s) => {
            let s = s.trim();
            if !s.is_empty() {
                return Ok(Some(s.to_string()));
            }
        }
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => return Err(SdkError::Io(e)),
    }

    match std::env::var(name) {
        Ok(v) if !v.trim().is_empty() => Ok(Some(v.trim().to_string())),
        _ => Ok(None),
    }
}

/// Build the envelope signer from the secret `name`
pub fn signer_from_secret(name: &str) -> Result<EnvelopeSigner> {
    signer_from_secret_in(Path::new(SECRETS_DIR), name)
}

pub fn signer_from_secret_in(dir: &Path, name: &str) -> Result<EnvelopeSigner> {
    let secret =
        read_secret(dir, name)?.ok_or_else(|| SdkError::MissingSecret(name.to_string()))?;
    EnvelopeSigner::from_key_hex(&secret)
}
