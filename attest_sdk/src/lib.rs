pub mod builder;
pub mod error;
pub mod keys;
pub mod signer;

pub use builder::BatchRequestBuilder;
pub use error::{Result, SdkError};
pub use keys::{load_secret, read_secret, signer_from_secret, signer_from_secret_in};
pub use signer::{EnvelopeSigner, SignedEnvelope};

/// SDK version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::builder::BatchRequestBuilder;
    pub use crate::error::{Result, SdkError};
    pub use crate::signer::{EnvelopeSigner, SignedEnvelope};
    pub use attest_gate::{AuthorizationEnvelope, Domain, Identity, RecordEntry, SchemaId};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
