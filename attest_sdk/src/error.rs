use attest_gate::GateError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, SdkError>;

#[derive(Error, Debug)]
pub enum SdkError {
    #[error("Gateway error: {0}")]
    Gate(#[from] GateError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid signing key: {0}")]
    InvalidKey(String),

    #[error("Secret not found: {0}")]
    MissingSecret(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
