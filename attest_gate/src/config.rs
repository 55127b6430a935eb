// src/config.rs
// Gateway configuration: file/env loading and startup validation

use crate::identity::Identity;
use crate::typed_data::Domain;
use anyhow::{Context, Result};
use log::{error, info, warn};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::env;
use std::path::Path;

pub const DEFAULT_DOMAIN_NAME: &str = "AttestationGateway";
pub const DEFAULT_DOMAIN_VERSION: &str = "1";

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayConfig {
    pub domain: Domain,
    pub trusted_signer: Identity,
    pub owner: Identity,
    /// Floor applied to every envelope's fee, in smallest native units
    #[serde(default, with = "amount")]
    pub minimum_fee: u128,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl GatewayConfig {
    pub fn new(domain: Domain, trusted_signer: Identity, owner: Identity) -> Self {
        Self {
            domain,
            trusted_signer,
            owner,
            minimum_fee: 0,
            log_level: default_log_level(),
        }
    }

    pub fn with_minimum_fee(mut self, fee: u128) -> Self {
        self.minimum_fee = fee;
        self
    }

    /// Load configuration from a JSON file
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let config: GatewayConfig = serde_json::from_str(&content)
            .with_context(|| format!("invalid gateway config in {}", path.display()))?;
        Ok(config)
    }

    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
            .with_context(|| format!("failed to write config file {}", path.display()))
    }

    /// Build from `ATTEST_*` environment variables.
    ///
    /// Required: `ATTEST_CHAIN_ID`, `ATTEST_VERIFIER`, `ATTEST_TRUSTED_SIGNER`,
    /// `ATTEST_OWNER`. Optional: `ATTEST_DOMAIN_NAME`, `ATTEST_DOMAIN_VERSION`,
    /// `ATTEST_MINIMUM_FEE` (default 0), `ATTEST_LOG_LEVEL` (default info).
    pub fn from_env() -> Result<Self> {
        let name = env::var("ATTEST_DOMAIN_NAME").unwrap_or_else(|_| DEFAULT_DOMAIN_NAME.into());
        let version =
            env::var("ATTEST_DOMAIN_VERSION").unwrap_or_else(|_| DEFAULT_DOMAIN_VERSION.into());
        let chain_id = required_var("ATTEST_CHAIN_ID")?
            .parse::<u64>()
            .context("ATTEST_CHAIN_ID must be an unsigned integer")?;
        let verifier = parse_identity_var("ATTEST_VERIFIER")?;
        let trusted_signer = parse_identity_var("ATTEST_TRUSTED_SIGNER")?;
        let owner = parse_identity_var("ATTEST_OWNER")?;

        let minimum_fee = match env::var("ATTEST_MINIMUM_FEE") {
            Ok(v) => v
                .parse::<u128>()
                .context("ATTEST_MINIMUM_FEE must be an unsigned integer")?,
            Err(_) => 0,
        };
        let log_level = env::var("ATTEST_LOG_LEVEL").unwrap_or_else(|_| default_log_level());

        Ok(Self {
            domain: Domain::new(name, version, chain_id, verifier),
            trusted_signer,
            owner,
            minimum_fee,
            log_level,
        })
    }

    /// Check the configuration before a gateway is built from it
    pub fn validate(&self) -> ConfigValidation {
        let mut validation = ConfigValidation::new();

        if self.owner.is_zero() {
            validation.add_error("owner is the zero identity".into());
        }
        if self.trusted_signer.is_zero() {
            validation.add_error("trusted_signer is the zero identity".into());
        }
        if self.domain.verifying_contract.is_zero() {
            validation.add_error("domain.verifying_contract is the zero identity".into());
        }
        if self.domain.name.trim().is_empty() {
            validation.add_error("domain.name is empty".into());
        }
        if self.domain.version.trim().is_empty() {
            validation.add_error("domain.version is empty".into());
        }
        if self.domain.chain_id == 0 {
            validation.add_error("domain.chain_id must be non-zero".into());
        }

        if self.trusted_signer == self.owner {
            validation.add_warning(
                "trusted_signer and owner are the same identity - consider separate keys".into(),
            );
        }
        if self.minimum_fee == 0 {
            validation.add_warning("minimum_fee is 0 - envelopes may carry no fee".into());
        }
        if !LOG_LEVELS.contains(&self.log_level.to_lowercase().as_str()) {
            validation.add_warning(format!(
                "unknown log_level '{}' - falling back to info",
                self.log_level
            ));
        }

        validation
    }
}

fn required_var(name: &str) -> Result<String> {
    env::var(name).with_context(|| format!("{} is not set", name))
}

fn parse_identity_var(name: &str) -> Result<Identity> {
    let raw = required_var(name)?;
    raw.trim()
        .parse::<Identity>()
        .with_context(|| format!("{} is not a valid identity: {}", name, raw))
}

/// Validation result for configuration checks
#[derive(Debug, Clone, Default)]
pub struct ConfigValidation {
    pub valid: bool,
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
}

impl ConfigValidation {
    fn new() -> Self {
        Self {
            valid: true,
            warnings: Vec::new(),
            errors: Vec::new(),
        }
    }

    fn add_warning(&mut self, msg: String) {
        self.warnings.push(msg);
    }

    fn add_error(&mut self, msg: String) {
        self.errors.push(msg);
        self.valid = false;
    }

    pub fn print_summary(&self) {
        if !self.warnings.is_empty() {
            warn!("Configuration warnings:");
            for w in &self.warnings {
                warn!(" - {}", w);
            }
        }

        if !self.errors.is_empty() {
            error!("Configuration errors:");
            for e in &self.errors {
                error!(" - {}", e);
            }
        }

        if self.valid && self.warnings.is_empty() {
            info!("Configuration validation passed");
        }
    }
}

// Amounts exceed what JSON numbers carry safely; accept a decimal string or
// a plain number and always write a string.
mod amount {
    use super::*;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(u64),
    }

    pub fn serialize<S: Serializer>(value: &u128, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(value)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u128, D::Error> {
        match Raw::deserialize(deserializer)? {
            Raw::Text(s) => s.trim().parse().map_err(serde::de::Error::custom),
            Raw::Number(n) => Ok(n as u128),
        }
    }
}
