// tests/authorization_flow.rs
use attest_gate::prelude::*;
use attest_gate::{
    sign_digest, GateEvent, GatewayConfig, InMemoryLedger, MemoryPayouts, RecoverableSignature,
};
use k256::ecdsa::SigningKey;
use std::sync::Arc;
use std::thread;

const FEE: u128 = NATIVE_UNIT / 1000; // 0.001 native

struct Setup {
    gateway: Arc<AttestationGateway>,
    ledger: Arc<InMemoryLedger>,
    payouts: Arc<MemoryPayouts>,
    signer: SigningKey,
    owner: Identity,
    schema_a: SchemaId,
    schema_b: SchemaId,
}

fn setup() -> Setup {
    let signer = SigningKey::from_slice(&[0x42; 32]).expect("valid key");
    let owner = Identity::new([0x01; 20]);
    let ledger = Arc::new(InMemoryLedger::new());
    let payouts = Arc::new(MemoryPayouts::new());
    let schema_a = ledger.register_schema("string membership", true);
    let schema_b = ledger.register_schema("uint8 level,string course", true);

    let config = GatewayConfig::new(
        Domain::new("AttestationGateway", "1", 31337, Identity::new([0xee; 20])),
        Identity::from_verifying_key(signer.verifying_key()),
        owner,
    )
    .with_minimum_fee(FEE);

    let gateway = AttestationGateway::new(config, ledger.clone(), payouts.clone())
        .expect("gateway builds");

    Setup {
        gateway: Arc::new(gateway),
        ledger,
        payouts,
        signer,
        owner,
        schema_a,
        schema_b,
    }
}

fn sign(s: &Setup, envelope: &AuthorizationEnvelope) -> RecoverableSignature {
    sign_digest(&s.signer, &envelope.digest(s.gateway.domain())).expect("signs")
}

fn entries(recipient: Identity, n: usize) -> Vec<RecordEntry> {
    (0..n)
        .map(|i| RecordEntry::new(recipient, format!("credential-{}", i).into_bytes()))
        .collect()
}

#[test]
fn two_groups_five_records_then_replay() {
    let s = setup();
    let recipient = Identity::new([0xa1; 20]);
    let batch = BatchRequest::new(vec![
        AttestationGroup::new(s.schema_a, entries(recipient, 2)),
        AttestationGroup::new(s.schema_b, entries(recipient, 3)),
    ]);
    let envelope = AuthorizationEnvelope::new(batch, 0, FEE);
    let signature = sign(&s, &envelope);
    let relayer = Identity::new([0x99; 20]);

    let ids = s
        .gateway
        .verify_and_submit(&relayer, &envelope, &signature, FEE)
        .expect("first submission succeeds");
    assert_eq!(ids.len(), 5);
    assert_eq!(s.gateway.current_nonce(&recipient), 1);
    assert_eq!(s.gateway.treasury_balance(), FEE);
    assert_eq!(s.ledger.record_count(), 5);

    let schemas: Vec<SchemaId> = ids
        .iter()
        .map(|id| s.gateway.record(id).expect("record committed").schema)
        .collect();
    assert_eq!(
        schemas,
        vec![s.schema_a, s.schema_a, s.schema_b, s.schema_b, s.schema_b]
    );
    for id in &ids {
        let record = s.gateway.record(id).unwrap();
        assert_eq!(record.attester, s.gateway.instance());
        assert_eq!(record.recipient, recipient);
    }

    let replay = s
        .gateway
        .verify_and_submit(&relayer, &envelope, &signature, FEE);
    assert_eq!(
        replay,
        Err(GateError::InvalidNonce {
            recipient,
            expected: 1,
            presented: 0
        })
    );
    assert_eq!(s.ledger.record_count(), 5);
    assert_eq!(s.gateway.treasury_balance(), FEE);
}

#[test]
fn nonce_counts_successful_submissions() {
    let s = setup();
    let recipient = Identity::new([0xa2; 20]);

    for n in 0..4u64 {
        let batch = BatchRequest::new(vec![AttestationGroup::new(
            s.schema_a,
            entries(recipient, 1),
        )]);
        let envelope = AuthorizationEnvelope::new(batch, n, FEE);
        let signature = sign(&s, &envelope);

        // an underpaid attempt in between must not move the counter
        assert!(s
            .gateway
            .verify_and_submit(&recipient, &envelope, &signature, FEE - 1)
            .is_err());
        s.gateway
            .verify_and_submit(&recipient, &envelope, &signature, FEE)
            .expect("submission succeeds");
    }

    assert_eq!(s.gateway.current_nonce(&recipient), 4);
    assert_eq!(s.gateway.treasury_balance(), 4 * FEE);
}

#[test]
fn withdrawal_pays_owner_exactly() {
    let s = setup();
    for (i, paid) in [FEE, FEE * 3].into_iter().enumerate() {
        let recipient = Identity::new([0xb0 + i as u8; 20]);
        let batch = BatchRequest::new(vec![AttestationGroup::new(
            s.schema_a,
            entries(recipient, 1),
        )]);
        let envelope = AuthorizationEnvelope::new(batch, 0, FEE);
        let signature = sign(&s, &envelope);
        s.gateway
            .verify_and_submit(&recipient, &envelope, &signature, paid)
            .expect("submission succeeds");
    }
    assert_eq!(s.gateway.treasury_balance(), FEE * 4);

    let stranger = Identity::new([0x77; 20]);
    assert_eq!(
        s.gateway.withdraw_fees(&stranger),
        Err(GateError::NotOwner(stranger))
    );

    assert_eq!(s.gateway.withdraw_fees(&s.owner), Ok(FEE * 4));
    assert_eq!(s.gateway.treasury_balance(), 0);
    assert_eq!(s.payouts.balance_of(&s.owner), FEE * 4);

    // nothing left
    assert_eq!(s.gateway.withdraw_fees(&s.owner), Ok(0));
    assert_eq!(s.payouts.balance_of(&s.owner), FEE * 4);
}

#[test]
fn failed_payout_keeps_fees() {
    let s = setup();
    let recipient = Identity::new([0xa3; 20]);
    let batch = BatchRequest::new(vec![AttestationGroup::new(
        s.schema_a,
        entries(recipient, 1),
    )]);
    let envelope = AuthorizationEnvelope::new(batch, 0, FEE);
    let signature = sign(&s, &envelope);
    s.gateway
        .verify_and_submit(&recipient, &envelope, &signature, FEE)
        .unwrap();

    s.payouts.fail_next("owner account frozen");
    assert!(matches!(
        s.gateway.withdraw_fees(&s.owner),
        Err(GateError::Transfer(_))
    ));
    assert_eq!(s.gateway.treasury_balance(), FEE);
}

#[test]
fn concurrent_submissions_for_one_recipient() {
    let s = setup();
    let recipient = Identity::new([0xa4; 20]);
    let batch = BatchRequest::new(vec![AttestationGroup::new(
        s.schema_a,
        entries(recipient, 1),
    )]);
    let envelope = AuthorizationEnvelope::new(batch, 0, FEE);
    let signature = sign(&s, &envelope);

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let gateway = s.gateway.clone();
            let envelope = envelope.clone();
            thread::spawn(move || {
                gateway
                    .verify_and_submit(&recipient, &envelope, &signature, FEE)
                    .is_ok()
            })
        })
        .collect();
    let accepted = handles
        .into_iter()
        .filter_map(|h| h.join().ok())
        .filter(|ok| *ok)
        .count();

    assert_eq!(accepted, 1);
    assert_eq!(s.gateway.current_nonce(&recipient), 1);
    assert_eq!(s.gateway.treasury_balance(), FEE);
    assert_eq!(s.ledger.record_count(), 1);
}

#[test]
fn distinct_recipients_proceed_in_parallel() {
    let s = Arc::new(setup());
    let handles: Vec<_> = (0..6u8)
        .map(|i| {
            let s = s.clone();
            thread::spawn(move || {
                let recipient = Identity::new([0xc0 + i; 20]);
                for n in 0..5u64 {
                    let batch = BatchRequest::new(vec![AttestationGroup::new(
                        s.schema_a,
                        entries(recipient, 1),
                    )]);
                    let envelope = AuthorizationEnvelope::new(batch, n, FEE);
                    let signature = sign(&s, &envelope);
                    s.gateway
                        .verify_and_submit(&recipient, &envelope, &signature, FEE)
                        .expect("in-order submission succeeds");
                }
            })
        })
        .collect();
    for h in handles {
        h.join().expect("worker finished");
    }

    for i in 0..6u8 {
        assert_eq!(s.gateway.current_nonce(&Identity::new([0xc0 + i; 20])), 5);
    }
    assert_eq!(s.gateway.treasury_balance(), 30 * FEE);
    assert_eq!(s.ledger.record_count(), 30);
}

#[test]
fn event_trail_for_signed_submission() {
    let s = setup();
    let recipient = Identity::new([0xa5; 20]);
    let batch = BatchRequest::new(vec![AttestationGroup::new(
        s.schema_b,
        entries(recipient, 2),
    )]);
    let envelope = AuthorizationEnvelope::new(batch, 0, 0);
    let signature = sign(&s, &envelope);
    s.gateway
        .verify_and_submit(&recipient, &envelope, &signature, FEE)
        .unwrap();
    s.gateway.withdraw_fees(&s.owner).unwrap();

    let names: Vec<&str> = s.gateway.events().iter().map(|e| e.name()).collect();
    assert_eq!(names, vec!["authorized", "batch_submitted", "fees_withdrawn"]);
    assert_eq!(
        s.gateway.events()[1],
        GateEvent::BatchSubmitted {
            submitter: s.gateway.instance(),
            recipient: Some(recipient),
            count: 2
        }
    );
}
