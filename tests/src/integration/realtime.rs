//! # Realtime Status Events
//!
//! What a user's live session and an operator dashboard observe.

use super::fixtures::{user, World};
use ac_02_disposition::DispositionApi;
use shared_bus::{EventFilter, GateEvent};
use shared_types::{DispositionAction, PurchaseStatus};

fn statuses(events: &[GateEvent]) -> Vec<PurchaseStatus> {
    events
        .iter()
        .filter_map(|e| match e {
            GateEvent::PurchaseStatusChanged(change) => Some(change.new_status),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn test_owner_sees_each_transition_in_order() {
    let w = World::new();
    let (u1, u2) = (user(1), user(2));
    let mut session = w.gate.bus.subscribe(EventFilter::for_user(u1.clone()));

    let record = w.submit(&u1).await.unwrap();
    let other = w.submit(&u2).await.unwrap();
    w.approve(record.id(), "ABC123").await.unwrap();
    w.reject(other.id()).await.unwrap();
    w.revoke(record.id()).await.unwrap();

    let mut seen = Vec::new();
    while let Ok(Some(event)) = session.try_recv() {
        assert_eq!(event.recipient(), Some(&u1), "foreign event leaked");
        seen.push(event);
    }
    assert_eq!(
        statuses(&seen),
        vec![
            PurchaseStatus::Pending,
            PurchaseStatus::Approved,
            PurchaseStatus::Cancelled
        ]
    );

    let versions: Vec<u64> = seen
        .iter()
        .filter_map(|e| e.ordering_key().map(|(_, v)| v))
        .collect();
    assert!(versions.windows(2).all(|pair| pair[0] < pair[1]));
}

#[tokio::test]
async fn test_dashboard_sees_every_user() {
    let w = World::new();
    let mut dashboard = w.gate.bus.subscribe(EventFilter::dashboard());

    let r1 = w.submit(&user(1)).await.unwrap();
    let r2 = w.submit(&user(2)).await.unwrap();
    w.reject(r1.id()).await.unwrap();
    w.gate.engine.cancel_by_user(r2.id(), &user(2)).await.unwrap();

    let mut seen = Vec::new();
    while let Ok(Some(event)) = dashboard.try_recv() {
        seen.push(event);
    }
    assert_eq!(statuses(&seen).len(), 4);
}

#[tokio::test]
async fn test_failed_transition_publishes_nothing() {
    let w = World::new();
    let u1 = user(1);
    let record = w.submit(&u1).await.unwrap();
    w.approve(record.id(), "ABC123").await.unwrap();

    let mut session = w.gate.bus.subscribe(EventFilter::for_user(u1.clone()));
    assert!(w
        .decide(record.id(), DispositionAction::Reject, None)
        .await
        .is_err());
    // Replay of the committed approval is silent as well.
    w.approve(record.id(), "ABC123").await.unwrap();

    assert!(matches!(session.try_recv(), Ok(None)));
}
