use chrono::Duration;
use tokio::time::{timeout, Duration as StdDuration};

use follow_up_reminder_cell::*;

use crate::TestHarness;

#[tokio::test]
async fn test_armed_timer_fires_through_event_bus() {
    let harness = TestHarness::new();
    let mut events = harness.service.subscribe();

    let id = harness
        .service
        .create_reminder(harness.request("patient-1", Duration::days(1) + Duration::milliseconds(50), vec![1]))
        .await
        .unwrap();

    let event = timeout(StdDuration::from_secs(2), events.recv())
        .await
        .expect("timer should fire")
        .unwrap();
    assert_eq!(event.reminder.id, id);

    let notifications = harness.service.store().notifications_for(id).await;
    assert!(notifications.iter().all(|n| n.sent && n.sent_at.is_some()));
    assert_eq!(harness.service.scheduler().armed_for(id).await, 0);
    assert_eq!(harness.backend.shown().len(), 1);
}

#[tokio::test]
async fn test_cancelled_timer_never_fires() {
    let harness = TestHarness::new();
    let mut events = harness.service.subscribe();

    let id = harness
        .service
        .create_reminder(harness.request("patient-1", Duration::days(1) + Duration::milliseconds(50), vec![1]))
        .await
        .unwrap();
    harness.service.delete_reminder(id).await.unwrap();

    assert!(timeout(StdDuration::from_millis(300), events.recv()).await.is_err());
    assert!(harness.backend.shown().is_empty());
}
