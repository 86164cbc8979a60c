//! # Withdrawal Gating
//!
//! The gate as seen after real dispositions, not hand-built gate states.

use super::fixtures::{user, World};
use ac_02_disposition::CodePolicy;
use ac_01_purchase_store::PurchaseStoreApi;
use ac_04_withdrawal_gate::{Authorization, DenialReason, WithdrawalGateApi, WithdrawalOutcome};
use shared_types::{Amount, BalanceLedger, GateError, InMemoryLedger, PurchaseStatus, UserId};

fn funded(u: &UserId, balance: u64) -> World {
    World::with_ledger(
        CodePolicy::Configured,
        InMemoryLedger::new().with_balance(u.clone(), Amount(balance)),
    )
}

#[tokio::test]
async fn test_denials_follow_check_order() {
    let u1 = user(1);
    let w = funded(&u1, 100);
    let gate = &w.gate.withdrawals;

    assert_eq!(
        gate.authorize(&u1, "ABC123", Amount(500)).unwrap(),
        Authorization::Denied(DenialReason::NoCodeIssued)
    );

    let record = w.submit(&u1).await.unwrap();
    assert_eq!(
        gate.authorize(&u1, "ABC123", Amount(10)).unwrap(),
        Authorization::Denied(DenialReason::NoCodeIssued),
        "a pending purchase grants nothing"
    );

    w.approve(record.id(), "ABC123").await.unwrap();
    assert_eq!(
        gate.authorize(&u1, "ABC124", Amount(500)).unwrap(),
        Authorization::Denied(DenialReason::CodeMismatch)
    );
    assert_eq!(
        gate.authorize(&u1, "abc123", Amount(10)).unwrap(),
        Authorization::Denied(DenialReason::CodeMismatch)
    );
    assert_eq!(
        gate.authorize(&u1, "ABC123", Amount(500)).unwrap(),
        Authorization::Denied(DenialReason::InsufficientBalance)
    );
    assert_eq!(
        gate.authorize(&u1, "ABC123", Amount(100)).unwrap(),
        Authorization::Authorized
    );
}

#[tokio::test]
async fn test_revoked_code_stops_withdrawals() {
    let u1 = user(1);
    let w = funded(&u1, 1_000);
    let record = w.submit(&u1).await.unwrap();
    w.approve(record.id(), "ABC123").await.unwrap();

    assert_eq!(
        w.gate
            .withdrawals
            .withdraw(&u1, "ABC123", Amount(100), "w-1")
            .unwrap(),
        WithdrawalOutcome::Debited {
            amount: Amount(100),
            replayed: false
        }
    );

    w.revoke(record.id()).await.unwrap();

    let denied = w
        .gate
        .withdrawals
        .withdraw(&u1, "ABC123", Amount(100), "w-2")
        .unwrap();
    let WithdrawalOutcome::Denied(reason) = denied else {
        panic!("withdrawal after revoke must be denied, got {:?}", denied);
    };
    assert!(matches!(
        reason,
        DenialReason::NoCodeIssued | DenialReason::CodeMismatch
    ));
    assert!(reason.needs_purchase());
    assert_eq!(w.ledger.balance(&u1).unwrap(), Amount(900));
}

#[tokio::test]
async fn test_rejected_purchase_never_opens_the_gate() {
    let u1 = user(1);
    let w = funded(&u1, 1_000);
    let record = w.submit(&u1).await.unwrap();
    w.reject(record.id()).await.unwrap();

    assert_eq!(
        w.gate
            .withdrawals
            .authorize(&u1, "ABC123", Amount(1))
            .unwrap(),
        Authorization::Denied(DenialReason::NoCodeIssued)
    );
}

#[tokio::test]
async fn test_codes_are_per_user() {
    let (u1, u2) = (user(1), user(2));
    let w = World::with_ledger(
        CodePolicy::Configured,
        InMemoryLedger::new()
            .with_balance(u1.clone(), Amount(100))
            .with_balance(u2.clone(), Amount(100)),
    );
    let r1 = w.submit(&u1).await.unwrap();
    w.approve(r1.id(), "USER1CODE").await.unwrap();

    assert_eq!(
        w.gate
            .withdrawals
            .authorize(&u2, "USER1CODE", Amount(1))
            .unwrap(),
        Authorization::Denied(DenialReason::NoCodeIssued)
    );
}

#[tokio::test]
async fn test_revoking_current_approval_restores_older_one() {
    let u1 = user(1);
    let w = funded(&u1, 1_000);
    let first = w.submit(&u1).await.unwrap();
    w.approve(first.id(), "ABC123").await.unwrap();
    let second = w.submit(&u1).await.unwrap();
    w.approve(second.id(), "NEW222").await.unwrap();

    w.revoke(second.id()).await.unwrap();

    assert_eq!(
        w.store().get(first.id()).unwrap().status(),
        PurchaseStatus::Approved
    );
    let gate = w.store().gate_state(&u1).unwrap();
    assert_eq!(gate.access_code(), Some("ABC123"));
    assert!(gate.is_sourced_from(first.id()));
    assert_eq!(
        w.gate
            .withdrawals
            .authorize(&u1, "NEW222", Amount(10))
            .unwrap(),
        Authorization::Denied(DenialReason::CodeMismatch)
    );
    assert!(w
        .gate
        .withdrawals
        .authorize(&u1, "ABC123", Amount(10))
        .unwrap()
        .is_authorized());
    w.assert_invariants(&u1);

    w.revoke(first.id()).await.unwrap();
    assert_eq!(
        w.gate
            .withdrawals
            .authorize(&u1, "ABC123", Amount(10))
            .unwrap(),
        Authorization::Denied(DenialReason::NoCodeIssued)
    );
    w.assert_invariants(&u1);
}

#[tokio::test]
async fn test_revoking_superseded_approval_keeps_current_code() {
    let u1 = user(1);
    let w = funded(&u1, 1_000);
    let first = w.submit(&u1).await.unwrap();
    w.approve(first.id(), "ABC123").await.unwrap();
    let second = w.submit(&u1).await.unwrap();
    w.approve(second.id(), "NEW222").await.unwrap();

    w.revoke(first.id()).await.unwrap();

    assert!(w
        .gate
        .withdrawals
        .authorize(&u1, "NEW222", Amount(10))
        .unwrap()
        .is_authorized());
    w.assert_invariants(&u1);
}

#[tokio::test]
async fn test_withdrawal_reference_is_per_user_and_amount() {
    let (u1, u2) = (user(1), user(2));
    let w = World::with_ledger(
        CodePolicy::Configured,
        InMemoryLedger::new()
            .with_balance(u1.clone(), Amount(1_000))
            .with_balance(u2.clone(), Amount(1_000)),
    );
    let r1 = w.submit(&u1).await.unwrap();
    w.approve(r1.id(), "CODE01").await.unwrap();
    let r2 = w.submit(&u2).await.unwrap();
    w.approve(r2.id(), "CODE02").await.unwrap();
    let gate = &w.gate.withdrawals;

    gate.withdraw(&u1, "CODE01", Amount(300), "w-1").unwrap();
    assert_eq!(
        gate.withdraw(&u2, "CODE02", Amount(400), "w-1").unwrap(),
        WithdrawalOutcome::Debited {
            amount: Amount(400),
            replayed: false
        }
    );
    assert_eq!(w.ledger.balance(&u2).unwrap(), Amount(600));

    let err = gate
        .withdraw(&u1, "CODE01", Amount(500), "w-1")
        .unwrap_err();
    assert!(matches!(err, GateError::InvalidInput(_)));
    assert_eq!(w.ledger.balance(&u1).unwrap(), Amount(700));
}
