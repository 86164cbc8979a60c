//! # Purchase Lifecycle
//!
//! submit -> disposition -> gate state, through the wired engine.

use super::fixtures::{op, user, World};
use ac_01_purchase_store::{LegacyPurchaseRow, PurchaseStoreApi};
use ac_02_disposition::{CodePolicy, DispositionApi};
use shared_types::{
    DispositionAction, GateError, PurchaseStatus, RecordId, TransitionViolation,
};

#[tokio::test]
async fn test_approve_then_reject_is_invalid_transition() {
    let w = World::new();
    let u1 = user(1);

    let record = w.submit(&u1).await.unwrap();
    assert_eq!(record.status(), PurchaseStatus::Pending);

    let approved = w.approve(record.id(), "ABC123").await.unwrap();
    assert_eq!(approved.status(), PurchaseStatus::Approved);
    assert_eq!(approved.issued_code(), Some("ABC123"));
    assert_eq!(
        w.store().gate_state(&u1).unwrap().access_code(),
        Some("ABC123")
    );

    let err = w.reject(record.id()).await.unwrap_err();
    assert!(matches!(
        err,
        GateError::InvalidTransition {
            from: PurchaseStatus::Approved,
            action: DispositionAction::Reject,
            violation: TransitionViolation::IllegalFromState,
            ..
        }
    ));
    assert_eq!(
        w.store().get(record.id()).unwrap().status(),
        PurchaseStatus::Approved
    );
    w.assert_invariants(&u1);
}

#[tokio::test]
async fn test_only_one_open_purchase_per_user() {
    let w = World::new();
    let u1 = user(1);

    let first = w.submit(&u1).await.unwrap();
    let err = w.submit(&u1).await.unwrap_err();
    assert_eq!(
        err,
        GateError::AlreadyPending {
            user_id: u1.clone(),
            existing: first.id()
        }
    );

    // A decided record frees the slot.
    w.reject(first.id()).await.unwrap();
    let second = w.submit(&u1).await.unwrap();
    assert_ne!(second.id(), first.id());
    w.assert_invariants(&u1);
}

#[tokio::test]
async fn test_resubmission_after_approval_keeps_current_code() {
    let w = World::new();
    let u1 = user(1);

    let first = w.submit(&u1).await.unwrap();
    w.approve(first.id(), "FIRST1").await.unwrap();

    let second = w.submit(&u1).await.unwrap();
    let gate = w.store().gate_state(&u1).unwrap();
    assert_eq!(gate.access_code(), Some("FIRST1"));

    w.approve(second.id(), "SECOND").await.unwrap();
    let gate = w.store().gate_state(&u1).unwrap();
    assert_eq!(gate.access_code(), Some("SECOND"));
    assert!(gate.is_sourced_from(second.id()));

    // Revoking the superseded record leaves the current code alone.
    w.revoke(first.id()).await.unwrap();
    assert_eq!(
        w.store().gate_state(&u1).unwrap().access_code(),
        Some("SECOND")
    );
    w.assert_invariants(&u1);
}

#[tokio::test]
async fn test_revoke_nulls_code_and_gate() {
    let w = World::new();
    let u1 = user(1);
    let record = w.submit(&u1).await.unwrap();
    w.approve(record.id(), "ABC123").await.unwrap();

    let revoked = w.revoke(record.id()).await.unwrap();
    assert_eq!(revoked.status(), PurchaseStatus::Cancelled);
    assert_eq!(revoked.issued_code(), None);

    let gate = w.store().gate_state(&u1).unwrap();
    assert_eq!(gate.access_code(), None);
    assert!(!gate.has_purchased());
    w.assert_invariants(&u1);
}

#[tokio::test]
async fn test_replayed_approve_returns_committed_record() {
    let w = World::new();
    let u1 = user(1);
    let record = w.submit(&u1).await.unwrap();

    let first = w.approve(record.id(), "ABC123").await.unwrap();
    let second = w.approve(record.id(), "ABC123").await.unwrap();
    assert_eq!(first, second);

    let err = w.approve(record.id(), "OTHER1").await.unwrap_err();
    assert!(matches!(
        err,
        GateError::InvalidTransition {
            violation: TransitionViolation::ConflictingReplay,
            ..
        }
    ));
}

#[tokio::test]
async fn test_user_cancel_is_owner_only() {
    let w = World::new();
    let (u1, u2) = (user(1), user(2));
    let record = w.submit(&u1).await.unwrap();

    let err = w
        .gate
        .engine
        .cancel_by_user(record.id(), &u2)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        GateError::InvalidTransition {
            violation: TransitionViolation::NotOwner,
            ..
        }
    ));

    let cancelled = w.gate.engine.cancel_by_user(record.id(), &u1).await.unwrap();
    assert_eq!(cancelled.status(), PurchaseStatus::Cancelled);

    // Cancelled is terminal for the operator too.
    assert!(w.approve(record.id(), "ABC123").await.is_err());
    w.assert_invariants(&u1);
}

#[tokio::test]
async fn test_unknown_record() {
    let w = World::new();
    let missing = RecordId::generate();
    assert_eq!(
        w.approve(missing, "ABC123").await.unwrap_err(),
        GateError::NotFound(missing)
    );
}

#[tokio::test]
async fn test_configured_code_is_stamped_once() {
    let w = World::with_policy(CodePolicy::Configured);
    let (u1, u2) = (user(1), user(2));
    w.gate.engine.set_global_code("GLOBAL1", &op()).await.unwrap();

    let r1 = w.submit(&u1).await.unwrap();
    let approved = w
        .decide(r1.id(), DispositionAction::Approve, None)
        .await
        .unwrap();
    assert_eq!(approved.issued_code(), Some("GLOBAL1"));
    assert_eq!(approved.issued().unwrap().config_version, Some(1));

    w.gate.engine.set_global_code("GLOBAL2", &op()).await.unwrap();

    // Historical approval unchanged; new approvals take the new code.
    assert_eq!(w.store().get(r1.id()).unwrap().issued_code(), Some("GLOBAL1"));
    let r2 = w.submit(&u2).await.unwrap();
    let approved = w
        .decide(r2.id(), DispositionAction::Approve, None)
        .await
        .unwrap();
    assert_eq!(approved.issued_code(), Some("GLOBAL2"));
    assert_eq!(approved.issued().unwrap().config_version, Some(2));
}

#[tokio::test]
async fn test_generated_codes_are_per_approval() {
    let w = World::with_policy(CodePolicy::Generated { len: 10 });
    let (u1, u2) = (user(1), user(2));
    let r1 = w.submit(&u1).await.unwrap();
    let r2 = w.submit(&u2).await.unwrap();

    let a1 = w.decide(r1.id(), DispositionAction::Approve, None).await.unwrap();
    let a2 = w.decide(r2.id(), DispositionAction::Approve, None).await.unwrap();
    assert_eq!(a1.issued_code().unwrap().len(), 10);
    assert_ne!(a1.issued_code(), a2.issued_code());
}

#[tokio::test]
async fn test_acknowledge_keeps_status() {
    let w = World::new();
    let u1 = user(1);
    let record = w.submit(&u1).await.unwrap();
    w.reject(record.id()).await.unwrap();

    let acked = w.gate.engine.acknowledge(record.id(), &u1).await.unwrap();
    assert!(acked.acknowledged());
    assert_eq!(acked.status(), PurchaseStatus::Rejected);

    let again = w.gate.engine.acknowledge(record.id(), &u1).await.unwrap();
    assert_eq!(again.version(), acked.version());
}

#[tokio::test]
async fn test_operator_queue_and_history() {
    let w = World::new();
    let (u1, u2, u3) = (user(1), user(2), user(3));
    let r1 = w.submit(&u1).await.unwrap();
    let r2 = w.submit(&u2).await.unwrap();
    let r3 = w.submit(&u3).await.unwrap();
    w.reject(r2.id()).await.unwrap();

    let queue: Vec<_> = w
        .store()
        .list_by_status(PurchaseStatus::Pending)
        .unwrap()
        .iter()
        .map(|r| r.id())
        .collect();
    assert_eq!(queue, vec![r1.id(), r3.id()]);

    let again = w.submit(&u2).await.unwrap();
    let history: Vec<_> = w
        .store()
        .history_for_user(&u2)
        .unwrap()
        .iter()
        .map(|r| r.id())
        .collect();
    assert_eq!(history, vec![again.id(), r2.id()]);
}

#[tokio::test]
async fn test_legacy_rows_enter_the_same_lifecycle() {
    let w = World::new();
    let u1 = user(1);
    let imported = w
        .store()
        .import_legacy(LegacyPurchaseRow {
            id: None,
            user_id: u1.clone(),
            proof: "img://old".into(),
            status: None,
            issued_code: None,
            acknowledged: None,
            created_at: 5,
        })
        .unwrap();
    assert_eq!(imported.status(), PurchaseStatus::Pending);

    // The imported row blocks a second open purchase like any other.
    assert!(matches!(
        w.submit(&u1).await.unwrap_err(),
        GateError::AlreadyPending { .. }
    ));

    w.approve(imported.id(), "LEGACY").await.unwrap();
    assert_eq!(
        w.store().gate_state(&u1).unwrap().access_code(),
        Some("LEGACY")
    );
    w.assert_invariants(&u1);
}

#[tokio::test]
async fn test_replayed_approve_of_imported_row_is_idempotent() {
    let w = World::new();
    let u1 = user(1);
    let imported = w
        .store()
        .import_legacy(LegacyPurchaseRow {
            id: None,
            user_id: u1.clone(),
            proof: "img://old".into(),
            status: Some("approved".into()),
            issued_code: Some("OLD001".into()),
            acknowledged: Some(true),
            created_at: 5,
        })
        .unwrap();

    let replayed = w.approve(imported.id(), "OLD001").await.unwrap();
    assert_eq!(replayed, imported);
    assert!(matches!(
        w.approve(imported.id(), "OTHER1").await.unwrap_err(),
        GateError::InvalidTransition {
            violation: TransitionViolation::ConflictingReplay,
            ..
        }
    ));
    assert!(matches!(
        w.reject(imported.id()).await.unwrap_err(),
        GateError::InvalidTransition {
            violation: TransitionViolation::IllegalFromState,
            ..
        }
    ));
    w.assert_invariants(&u1);
}
