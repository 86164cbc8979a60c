//! # Concurrent Actors
//!
//! Operators and users racing on the same records. Every race must end in
//! exactly one committed outcome with the invariants intact.

use super::fixtures::{user, World};
use ac_01_purchase_store::PurchaseStoreApi;
use ac_02_disposition::{CodePolicy, DispositionApi};
use ac_03_referral_credit::ReferralCreditApi;
use ac_04_withdrawal_gate::{WithdrawalGateApi, WithdrawalOutcome};
use shared_types::{
    Amount, BalanceLedger, CreditStatus, DispositionAction, GateError, InMemoryLedger,
    PurchaseStatus, TransitionViolation,
};
use std::sync::Arc;
use tokio::sync::Barrier;

const ROUNDS: usize = 25;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_approve_and_reject_one_wins() {
    for _ in 0..ROUNDS {
        let w = Arc::new(World::new());
        let u1 = user(1);
        let id = w.submit(&u1).await.unwrap().id();
        let barrier = Arc::new(Barrier::new(2));

        let approve = {
            let (w, barrier) = (w.clone(), barrier.clone());
            tokio::spawn(async move {
                barrier.wait().await;
                w.approve(id, "ABC123").await
            })
        };
        let reject = {
            let (w, barrier) = (w.clone(), barrier.clone());
            tokio::spawn(async move {
                barrier.wait().await;
                w.reject(id).await
            })
        };
        let results = [approve.await.unwrap(), reject.await.unwrap()];

        let winners: Vec<_> = results.iter().filter_map(|r| r.as_ref().ok()).collect();
        assert_eq!(winners.len(), 1, "exactly one decision commits");
        let loser = results.iter().find_map(|r| r.as_ref().err()).unwrap();
        assert!(matches!(
            loser,
            GateError::InvalidTransition {
                violation: TransitionViolation::IllegalFromState,
                ..
            }
        ));

        let committed = w.store().get(id).unwrap();
        assert_eq!(committed.status(), winners[0].status());
        assert!(matches!(
            committed.status(),
            PurchaseStatus::Approved | PurchaseStatus::Rejected
        ));

        let gate = w.store().gate_state(&u1).unwrap();
        match committed.status() {
            PurchaseStatus::Approved => assert_eq!(gate.access_code(), Some("ABC123")),
            _ => assert_eq!(gate.access_code(), None),
        }
        w.assert_invariants(&u1);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_double_approve_credits_referrer_once() {
    for _ in 0..ROUNDS {
        let w = Arc::new(World::new());
        let (u1, u2) = (user(1), user(2));
        w.gate.referrals.register_referral(&u2, &u1).unwrap();
        let id = w.submit(&u1).await.unwrap().id();
        let barrier = Arc::new(Barrier::new(2));

        let handles: Vec<_> = (0..2)
            .map(|_| {
                let (w, barrier) = (w.clone(), barrier.clone());
                tokio::spawn(async move {
                    barrier.wait().await;
                    w.approve(id, "ABC123").await
                })
            })
            .collect();

        let mut committed = Vec::new();
        for handle in handles {
            committed.push(handle.await.unwrap().unwrap());
        }
        assert_eq!(committed[0], committed[1], "replay returns the committed record");

        let link = w.store().referral(&u1).unwrap().unwrap();
        assert_eq!(link.credit_status, CreditStatus::Confirmed);
        assert_eq!(link.amount_given, Some(Amount(500)));
        assert_eq!(w.ledger.balance(&u2).unwrap(), Amount(500));
        assert_eq!(w.ledger.entry_count(&u2), 1);
        w.assert_invariants(&u1);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_submits_leave_one_pending() {
    let w = Arc::new(World::new());
    let u1 = user(1);
    let barrier = Arc::new(Barrier::new(8));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let (w, barrier, u1) = (w.clone(), barrier.clone(), u1.clone());
            tokio::spawn(async move {
                barrier.wait().await;
                w.submit(&u1).await
            })
        })
        .collect();

    let mut accepted = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => accepted += 1,
            Err(e) => assert!(matches!(e, GateError::AlreadyPending { .. })),
        }
    }
    assert_eq!(accepted, 1);
    assert_eq!(w.store().list_by_status(PurchaseStatus::Pending).unwrap().len(), 1);
    w.assert_invariants(&u1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_user_cancel_races_operator_approve() {
    for _ in 0..ROUNDS {
        let w = Arc::new(World::new());
        let u1 = user(1);
        let id = w.submit(&u1).await.unwrap().id();
        let barrier = Arc::new(Barrier::new(2));

        let approve = {
            let (w, barrier) = (w.clone(), barrier.clone());
            tokio::spawn(async move {
                barrier.wait().await;
                w.approve(id, "ABC123").await
            })
        };
        let cancel = {
            let (w, barrier, u1) = (w.clone(), barrier.clone(), u1.clone());
            tokio::spawn(async move {
                barrier.wait().await;
                w.gate.engine.cancel_by_user(id, &u1).await
            })
        };
        let (approved, cancelled) = (approve.await.unwrap(), cancel.await.unwrap());
        assert_ne!(approved.is_ok(), cancelled.is_ok());
        w.assert_invariants(&u1);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_revoke_races_withdrawal() {
    for _ in 0..ROUNDS {
        let u1 = user(1);
        let w = Arc::new(World::with_ledger(
            CodePolicy::Configured,
            InMemoryLedger::new().with_balance(u1.clone(), Amount(1_000)),
        ));
        let id = w.submit(&u1).await.unwrap().id();
        w.approve(id, "ABC123").await.unwrap();
        let barrier = Arc::new(Barrier::new(2));

        let withdraw = {
            let (w, barrier, u1) = (w.clone(), barrier.clone(), u1.clone());
            tokio::spawn(async move {
                barrier.wait().await;
                w.gate
                    .withdrawals
                    .withdraw(&u1, "ABC123", Amount(100), "w-1")
            })
        };
        let revoke = {
            let (w, barrier) = (w.clone(), barrier.clone());
            tokio::spawn(async move {
                barrier.wait().await;
                w.decide(id, DispositionAction::Revoke, None).await
            })
        };

        let outcome = withdraw.await.unwrap().unwrap();
        revoke.await.unwrap().unwrap();

        // Either the debit went through with the code still valid, or it was
        // refused with no money moved. Never a debit after the revoke.
        let balance = w.ledger.balance(&u1).unwrap();
        match outcome {
            WithdrawalOutcome::Debited { .. } => assert_eq!(balance, Amount(900)),
            WithdrawalOutcome::Denied(_) => assert_eq!(balance, Amount(1_000)),
        }
        assert!(!w
            .gate
            .withdrawals
            .authorize(&u1, "ABC123", Amount(1))
            .unwrap()
            .is_authorized());
        w.assert_invariants(&u1);
    }
}
