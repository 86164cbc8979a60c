//! # Restart Durability
//!
//! State committed on the file-backed store, seen again by a fresh world on
//! the same directory.

use super::fixtures::{user, World};
use ac_01_purchase_store::PurchaseStoreApi;
use ac_03_referral_credit::ReferralCreditApi;
use ac_04_withdrawal_gate::WithdrawalGateApi;
use shared_types::{Amount, BalanceLedger, CreditStatus, InMemoryLedger, PurchaseStatus};
use std::sync::Arc;
use tempfile::TempDir;

#[tokio::test]
async fn test_gate_and_outbox_survive_restart() {
    let dir = TempDir::new().unwrap();
    let (u1, u2) = (user(1), user(2));
    let ledger = Arc::new(InMemoryLedger::new().with_balance(u1.clone(), Amount(1_000)));

    let record_id = {
        let w = World::on_disk(dir.path(), ledger.clone());
        w.gate.referrals.register_referral(&u2, &u1).unwrap();
        let record = w.submit(&u1).await.unwrap();

        ledger.set_unavailable(true);
        w.approve(record.id(), "ABC123").await.unwrap();
        ledger.set_unavailable(false);
        record.id()
    };

    let w = World::on_disk(dir.path(), ledger.clone());
    assert_eq!(
        w.store().get(record_id).unwrap().status(),
        PurchaseStatus::Approved
    );
    assert!(w
        .gate
        .withdrawals
        .authorize(&u1, "ABC123", Amount(100))
        .unwrap()
        .is_authorized());

    // The credit confirmed before the restart is delivered exactly once.
    assert_eq!(w.store().pending_credits().unwrap().len(), 1);
    let report = w.gate.referrals.reconcile().unwrap();
    assert_eq!(report.settled, 1);
    assert_eq!(ledger.balance(&u2).unwrap(), Amount(500));
    assert_eq!(
        w.store().referral(&u1).unwrap().unwrap().credit_status,
        CreditStatus::Confirmed
    );
    w.assert_invariants(&u1);
}
