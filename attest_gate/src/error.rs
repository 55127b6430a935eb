use crate::identity::{Identity, RecordId, SchemaId};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, GateError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GateError {
    #[error("caller {0} is not the owner")]
    NotOwner(Identity),

    #[error("identity {0} is already authorized")]
    AlreadyAuthorized(Identity),

    #[error("identity {0} is not authorized")]
    NotAuthorized(Identity),

    #[error("caller {0} may not write or revoke records")]
    Unauthorized(Identity),

    #[error("invalid signature")]
    InvalidSignature,

    #[error("invalid nonce for {recipient}: expected {expected}, got {presented}")]
    InvalidNonce {
        recipient: Identity,
        expected: u64,
        presented: u64,
    },

    #[error("an authorization for {0} is already in progress")]
    NonceInUse(Identity),

    #[error("insufficient fee: required {required}, attached {attached}")]
    InsufficientFee { required: u128, attached: u128 },

    #[error("incomplete write: submitted {expected} entries, store returned {returned} ids")]
    IncompleteWrite { expected: usize, returned: usize },

    #[error("batch contains no record entries")]
    EmptyBatch,

    #[error("schema {0} appears in more than one revocation group")]
    DuplicateSchema(SchemaId),

    #[error("treasury balance would overflow")]
    TreasuryOverflow,

    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("transfer failed: {0}")]
    Transfer(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Failures reported by the external record ledger
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("unknown schema {0}")]
    UnknownSchema(SchemaId),

    #[error("record {0} not found")]
    RecordNotFound(RecordId),

    #[error("record {0} belongs to schema {1}")]
    SchemaMismatch(RecordId, SchemaId),

    #[error("schema {0} does not allow revocable records")]
    IrrevocableSchema(SchemaId),

    #[error("record {0} is not revocable")]
    Irrevocable(RecordId),

    #[error("record {0} is already revoked")]
    AlreadyRevoked(RecordId),

    #[error("record {0} was created by another attester")]
    AccessDenied(RecordId),

    #[error("referenced record {0} does not exist")]
    MissingReference(RecordId),

    #[error("expiration {0} is in the past")]
    InvalidExpiration(u64),

    #[error("unknown staged write {0}")]
    UnknownTicket(u64),

    #[error("ledger unavailable: {0}")]
    Unavailable(String),
}
