pub mod allowlist;
pub mod config;
pub mod crypto;
pub mod error;
pub mod events;
pub mod gateway;
pub mod identity;
pub mod logging;
pub mod nonce;
pub mod ownership;
pub mod record_store;
pub mod treasury;
pub mod typed_data;
pub mod verifier;

pub use allowlist::AllowListGate;
pub use config::{ConfigValidation, GatewayConfig};
pub use crypto::{recover_signer, sign_digest, RecoverableSignature};
pub use error::{GateError, LedgerError, Result};
pub use events::{EventLog, EventRecord, GateEvent};
pub use gateway::AttestationGateway;
pub use identity::{Identity, ParseIdError, RecordId, SchemaId};
pub use nonce::ReplayLedger;
pub use ownership::Ownership;
pub use record_store::{
    AttestationGroup, BatchRequest, InMemoryLedger, Record, RecordEntry, RecordLedger,
    RecordStoreAdapter, RevocationRequest, RevocationRequestBuilder,
};
pub use treasury::{FeeTreasury, MemoryPayouts, NativeTransfer};
pub use typed_data::{AuthorizationEnvelope, Domain};
pub use verifier::SignedBatchVerifier;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Smallest units per whole native unit
pub const NATIVE_UNIT: u128 = 1_000_000_000_000_000_000;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::error::{GateError, Result};
    pub use crate::gateway::AttestationGateway;
    pub use crate::identity::{Identity, RecordId, SchemaId};
    pub use crate::record_store::{
        AttestationGroup, BatchRequest, RecordEntry, RevocationRequestBuilder,
    };
    pub use crate::typed_data::{AuthorizationEnvelope, Domain};
    pub use crate::NATIVE_UNIT;
}
