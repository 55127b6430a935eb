// src/verifier.rs
//! Signed-batch verifier.
//!
//! Accepts a batch authorized off-system by the trusted signer and writes it
//! through the record store adapter under the verifier's own identity. The
//! signature covers the batch, the recipient's nonce and the fee, bound to
//! this verifier's [`Domain`].
//!
//! Nonce consumption, the fee check, the treasury credit and the ledger write
//! run as one unit under the recipient's nonce slot. If any step fails, all
//! of them are rolled back.

use crate::allowlist::AllowListGate;
use crate::crypto::{recover_signer, RecoverableSignature};
use crate::error::{GateError, Result};
use crate::events::{EventLog, GateEvent};
use crate::identity::{Identity, RecordId};
use crate::nonce::ReplayLedger;
use crate::ownership::Ownership;
use crate::record_store::RecordStoreAdapter;
use crate::treasury::FeeTreasury;
use crate::typed_data::{AuthorizationEnvelope, Domain};
use parking_lot::RwLock;
use std::sync::Arc;

pub struct SignedBatchVerifier {
    domain: Domain,
    trusted_signer: Identity,
    minimum_fee: RwLock<u128>,
    nonces: ReplayLedger,
    treasury: Arc<FeeTreasury>,
    store: Arc<RecordStoreAdapter>,
    ownership: Arc<Ownership>,
    events: Arc<EventLog>,
}

impl SignedBatchVerifier {
    /// Build a verifier and enroll its instance identity
    /// (`domain.verifying_contract`) on the allow-list.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        domain: Domain,
        trusted_signer: Identity,
        minimum_fee: u128,
        treasury: Arc<FeeTreasury>,
        store: Arc<RecordStoreAdapter>,
        allow_list: &AllowListGate,
        ownership: Arc<Ownership>,
        events: Arc<EventLog>,
    ) -> Result<Self> {
        if trusted_signer.is_zero() {
            return Err(GateError::InvalidConfig(
                "trusted signer must not be the zero identity".into(),
            ));
        }
        if domain.verifying_contract.is_zero() {
            return Err(GateError::InvalidConfig(
                "verifying contract must not be the zero identity".into(),
            ));
        }

        allow_list.enroll(domain.verifying_contract);
        tracing::info!(
            instance = %domain.verifying_contract,
            signer = %trusted_signer,
            chain_id = domain.chain_id,
            "signed-batch verifier ready"
        );

        Ok(Self {
            domain,
            trusted_signer,
            minimum_fee: RwLock::new(minimum_fee),
            nonces: ReplayLedger::new(),
            treasury,
            store,
            ownership,
            events,
        })
    }

    pub fn domain(&self) -> &Domain {
        &self.domain
    }

    pub fn trusted_signer(&self) -> Identity {
        self.trusted_signer
    }

    pub fn minimum_fee(&self) -> u128 {
        *self.minimum_fee.read()
    }

    pub fn current_nonce(&self, recipient: &Identity) -> u64 {
        self.nonces.current_nonce(recipient)
    }

    /// Fee a submission of `envelope` must attach
    pub fn required_fee(&self, envelope: &AuthorizationEnvelope) -> u128 {
        envelope.fee.max(self.minimum_fee())
    }

    /// Verify `signature` over `envelope` and write the batch.
    ///
    /// Anyone may call this; `caller` is recorded only for logging. The whole
    /// `attached_value` is credited to the treasury on success.
    pub fn verify_and_submit(
        &self,
        caller: &Identity,
        envelope: &AuthorizationEnvelope,
        signature: &RecoverableSignature,
        attached_value: u128,
    ) -> Result<Vec<RecordId>> {
        let digest = envelope.digest(&self.domain);
        let signer = recover_signer(&digest, signature)?;
        if signer != self.trusted_signer {
            tracing::warn!(%caller, %signer, "envelope not signed by trusted signer");
            return Err(GateError::InvalidSignature);
        }

        let recipient = envelope.batch.first_recipient().ok_or(GateError::EmptyBatch)?;
        if envelope
            .batch
            .groups()
            .iter()
            .flat_map(|g| g.entries.iter())
            .any(|e| e.recipient != recipient)
        {
            tracing::debug!(%recipient, "batch spans several recipients; first recipient's nonce is used");
        }

        let required = self.required_fee(envelope);
        let instance = self.domain.verifying_contract;

        let ids = self.nonces.consume_with(&recipient, envelope.nonce, || {
            if attached_value < required {
                return Err(GateError::InsufficientFee {
                    required,
                    attached: attached_value,
                });
            }
            let credit = self.treasury.reserve(attached_value)?;
            let ids = self.store.stage_batch(&instance, &envelope.batch)?.commit()?;
            credit.commit();
            Ok(ids)
        })?;

        tracing::info!(
            %caller,
            %recipient,
            nonce = envelope.nonce,
            fee = attached_value,
            count = ids.len(),
            "signed batch accepted"
        );
        Ok(ids)
    }

    /// Send all collected fees to the owner.
    pub fn withdraw_fees(&self, caller: &Identity) -> Result<u128> {
        self.treasury.withdraw(caller)
    }

    /// Change the floor applied to every envelope's fee (owner only).
    pub fn set_minimum_fee(&self, caller: &Identity, fee: u128) -> Result<()> {
        self.ownership.ensure_owner(caller)?;
        let previous = std::mem::replace(&mut *self.minimum_fee.write(), fee);
        tracing::info!(previous, current = fee, "minimum fee updated");
        self.events.emit(GateEvent::MinimumFeeUpdated {
            previous,
            current: fee,
        });
        Ok(())
    }
}
