// src/gateway.rs
//! Wires the allow-list, record store adapter, verifier and treasury around
//! one shared [`Ownership`] and [`EventLog`].
//!
//! ```ignore
//! let gateway = AttestationGateway::new(config, ledger, payouts)?;
//! gateway.add_authorized(&owner, submitter)?;
//! let ids = gateway.verify_and_submit(&caller, &envelope, &signature, fee)?;
//! ```

use crate::allowlist::AllowListGate;
use crate::config::GatewayConfig;
use crate::crypto::RecoverableSignature;
use crate::error::{GateError, Result};
use crate::events::{EventLog, EventRecord, GateEvent};
use crate::identity::{Identity, RecordId};
use crate::ownership::Ownership;
use crate::record_store::{BatchRequest, Record, RecordLedger, RecordStoreAdapter, RevocationRequest};
use crate::treasury::{FeeTreasury, NativeTransfer};
use crate::typed_data::{AuthorizationEnvelope, Domain};
use crate::verifier::SignedBatchVerifier;
use std::sync::Arc;

pub struct AttestationGateway {
    ownership: Arc<Ownership>,
    allow_list: Arc<AllowListGate>,
    store: Arc<RecordStoreAdapter>,
    treasury: Arc<FeeTreasury>,
    verifier: SignedBatchVerifier,
    events: Arc<EventLog>,
}

impl AttestationGateway {
    /// Build a gateway from a validated configuration. The verifier's
    /// instance identity is `config.domain.verifying_contract`; the ledger
    /// sees it as attester of every record written through this gateway.
    pub fn new(
        config: GatewayConfig,
        ledger: Arc<dyn RecordLedger>,
        payouts: Arc<dyn NativeTransfer>,
    ) -> Result<Self> {
        let validation = config.validate();
        validation.print_summary();
        if !validation.valid {
            return Err(GateError::InvalidConfig(validation.errors.join("; ")));
        }

        let events = Arc::new(EventLog::new());
        let ownership = Arc::new(Ownership::new(config.owner, events.clone())?);
        let allow_list = Arc::new(AllowListGate::new(ownership.clone(), events.clone()));
        let instance = config.domain.verifying_contract;
        let store = Arc::new(RecordStoreAdapter::new(
            instance,
            ledger,
            allow_list.clone(),
            ownership.clone(),
            events.clone(),
        ));
        let treasury = Arc::new(FeeTreasury::new(
            ownership.clone(),
            payouts,
            events.clone(),
        ));
        let verifier = SignedBatchVerifier::new(
            config.domain,
            config.trusted_signer,
            config.minimum_fee,
            treasury.clone(),
            store.clone(),
            &allow_list,
            ownership.clone(),
            events.clone(),
        )?;

        Ok(Self {
            ownership,
            allow_list,
            store,
            treasury,
            verifier,
            events,
        })
    }

    // Administration

    pub fn owner(&self) -> Identity {
        self.ownership.owner()
    }

    pub fn transfer_ownership(&self, caller: &Identity, new_owner: Identity) -> Result<()> {
        self.ownership.transfer_ownership(caller, new_owner)
    }

    pub fn add_authorized(&self, caller: &Identity, identity: Identity) -> Result<()> {
        self.allow_list.add_authorized(caller, identity)
    }

    pub fn remove_authorized(&self, caller: &Identity, identity: Identity) -> Result<()> {
        self.allow_list.remove_authorized(caller, identity)
    }

    pub fn is_authorized(&self, identity: &Identity) -> bool {
        self.allow_list.is_authorized(identity)
    }

    pub fn set_minimum_fee(&self, caller: &Identity, fee: u128) -> Result<()> {
        self.verifier.set_minimum_fee(caller, fee)
    }

    pub fn minimum_fee(&self) -> u128 {
        self.verifier.minimum_fee()
    }

    pub fn withdraw_fees(&self, caller: &Identity) -> Result<u128> {
        self.verifier.withdraw_fees(caller)
    }

    pub fn treasury_balance(&self) -> u128 {
        self.treasury.balance()
    }

    // Submission

    /// Write a batch as an allow-listed caller, without a signed envelope.
    /// No nonce is consumed and no fee is charged.
    pub fn submit_direct(&self, caller: &Identity, batch: &BatchRequest) -> Result<Vec<RecordId>> {
        self.store.write_batch(caller, batch)
    }

    pub fn verify_and_submit(
        &self,
        caller: &Identity,
        envelope: &AuthorizationEnvelope,
        signature: &RecoverableSignature,
        attached_value: u128,
    ) -> Result<Vec<RecordId>> {
        self.verifier
            .verify_and_submit(caller, envelope, signature, attached_value)
    }

    pub fn revoke(&self, caller: &Identity, request: &RevocationRequest) -> Result<()> {
        self.store.revoke_batch(caller, request)
    }

    // Queries

    pub fn current_nonce(&self, recipient: &Identity) -> u64 {
        self.verifier.current_nonce(recipient)
    }

    pub fn required_fee(&self, envelope: &AuthorizationEnvelope) -> u128 {
        self.verifier.required_fee(envelope)
    }

    pub fn domain(&self) -> &Domain {
        self.verifier.domain()
    }

    pub fn trusted_signer(&self) -> Identity {
        self.verifier.trusted_signer()
    }

    pub fn instance(&self) -> Identity {
        self.store.instance()
    }

    pub fn record(&self, id: &RecordId) -> Option<Record> {
        self.store.record(id)
    }

    pub fn events(&self) -> Vec<GateEvent> {
        self.events.events()
    }

    pub fn events_since(&self, sequence: u64) -> Vec<EventRecord> {
        self.events.since(sequence)
    }
}
