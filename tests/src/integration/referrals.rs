//! # Referral Crediting
//!
//! Bonus release on first approval, through the engine's referral port.

use super::fixtures::{op, user, World};
use ac_01_purchase_store::{GateChange, TransitionCommit};
use ac_03_referral_credit::{ReferralConfig, ReferralCreditApi, ReferralOutcome};
use shared_types::{Amount, BalanceLedger, CreditStatus, GateError, IssuedCode};

#[tokio::test]
async fn test_first_approval_credits_referrer() {
    let w = World::new();
    let (u1, u2) = (user(1), user(2));
    w.gate.referrals.register_referral(&u2, &u1).unwrap();

    let record = w.submit(&u1).await.unwrap();
    w.approve(record.id(), "ABC123").await.unwrap();

    let link = w.store().referral(&u1).unwrap().unwrap();
    assert_eq!(link.credit_status, CreditStatus::Confirmed);
    assert_eq!(w.ledger.balance(&u2).unwrap(), Amount(500));
}

#[tokio::test]
async fn test_later_approvals_do_not_credit_again() {
    let w = World::new();
    let (u1, u2) = (user(1), user(2));
    w.gate.referrals.register_referral(&u2, &u1).unwrap();

    let first = w.submit(&u1).await.unwrap();
    w.approve(first.id(), "ABC123").await.unwrap();
    w.revoke(first.id()).await.unwrap();

    let second = w.submit(&u1).await.unwrap();
    w.approve(second.id(), "DEF456").await.unwrap();

    assert_eq!(w.ledger.balance(&u2).unwrap(), Amount(500));
    assert_eq!(w.ledger.entry_count(&u2), 1);
}

#[tokio::test]
async fn test_rejection_does_not_credit() {
    let w = World::new();
    let (u1, u2) = (user(1), user(2));
    w.gate.referrals.register_referral(&u2, &u1).unwrap();

    let record = w.submit(&u1).await.unwrap();
    w.reject(record.id()).await.unwrap();

    let link = w.store().referral(&u1).unwrap().unwrap();
    assert!(link.is_pending());
    assert_eq!(w.ledger.balance(&u2).unwrap(), Amount::ZERO);
}

#[tokio::test]
async fn test_ledger_outage_defers_then_reconciles() {
    let w = World::new();
    let (u1, u2) = (user(1), user(2));
    w.gate.referrals.register_referral(&u2, &u1).unwrap();
    let record = w.submit(&u1).await.unwrap();

    w.ledger.set_unavailable(true);
    let approved = w.approve(record.id(), "ABC123").await.unwrap();
    assert_eq!(approved.issued_code(), Some("ABC123"), "approval is not blocked");
    assert_eq!(w.store().pending_credits().unwrap().len(), 1);

    let report = w.gate.referrals.reconcile().unwrap();
    assert_eq!(report.still_pending, 1);

    w.ledger.set_unavailable(false);
    let report = w.gate.referrals.reconcile().unwrap();
    assert_eq!(report.settled, 1);
    assert!(w.store().pending_credits().unwrap().is_empty());
    assert_eq!(w.ledger.balance(&u2).unwrap(), Amount(500));

    // Nothing left to do; a second pass is a no-op.
    let report = w.gate.referrals.reconcile().unwrap();
    assert_eq!(report.settled + report.discarded + report.still_pending, 0);
    assert_eq!(w.ledger.entry_count(&u2), 1);
}

#[tokio::test]
async fn test_approval_interrupted_before_credit_is_reconciled() {
    let w = World::new();
    let (u1, u2) = (user(1), user(2));
    w.gate.referrals.register_referral(&u2, &u1).unwrap();
    let record = w.submit(&u1).await.unwrap();

    // The approval commits, then the process stops before the credit runs.
    let approved = record
        .approved(IssuedCode::new("ABC123", None), &op(), None, w.store().now())
        .unwrap();
    w.store()
        .commit_transition(TransitionCommit {
            record: approved,
            expected_version: record.version(),
            gate: GateChange::Grant("ABC123".into()),
        })
        .unwrap();
    assert_eq!(w.store().pending_credits().unwrap().len(), 1);
    assert!(w.store().referral(&u1).unwrap().unwrap().is_pending());

    // Within the grace period the entry is left to the approving call.
    assert_eq!(w.gate.referrals.reconcile().unwrap().still_pending, 1);

    w.time.advance(ReferralConfig::default().confirmation_grace_ms);
    let report = w.gate.referrals.reconcile().unwrap();
    assert_eq!(report.settled, 1);
    assert_eq!(w.ledger.balance(&u2).unwrap(), Amount(500));
    assert!(w.store().pending_credits().unwrap().is_empty());
    assert_eq!(
        w.store().referral(&u1).unwrap().unwrap().credit_status,
        CreditStatus::Confirmed
    );
}

#[tokio::test]
async fn test_manual_credit_then_approval() {
    let w = World::new();
    let (u1, u2) = (user(1), user(2));
    w.gate.referrals.register_referral(&u2, &u1).unwrap();

    let manual = w
        .gate
        .referrals
        .manual_credit(&u1, &op(), Some(Amount(250)))
        .unwrap();
    assert_eq!(
        manual,
        ReferralOutcome::Credited {
            referrer_id: u2.clone(),
            amount: Amount(250)
        }
    );

    let record = w.submit(&u1).await.unwrap();
    w.approve(record.id(), "ABC123").await.unwrap();
    assert_eq!(w.ledger.balance(&u2).unwrap(), Amount(250));
}

#[tokio::test]
async fn test_invalid_links_are_refused() {
    let w = World::new();
    let (u1, u2, u3) = (user(1), user(2), user(3));

    assert!(matches!(
        w.gate.referrals.register_referral(&u1, &u1).unwrap_err(),
        GateError::Referral(_)
    ));
    w.gate.referrals.register_referral(&u2, &u1).unwrap();
    assert!(matches!(
        w.gate.referrals.register_referral(&u3, &u1).unwrap_err(),
        GateError::Referral(_)
    ));
}
