use chrono::Duration;
use tokio::time::{timeout, Duration as StdDuration};

use follow_up_reminder_cell::*;

use crate::TestHarness;

#[tokio::test]
async fn test_repeated_dispatch_is_idempotent() {
    let harness = TestHarness::new();
    let id = harness
        .service
        .create_reminder(harness.request("patient-1", Duration::days(10), vec![1, 3, 7]))
        .await
        .unwrap();
    let notification = harness.service.store().notifications_for(id).await[0].clone();

    let dispatcher = harness.service.dispatcher();
    assert_eq!(dispatcher.dispatch_notification(notification.id).await, DispatchOutcome::Dispatched);
    let first = harness.service.get_reminder(id).await.unwrap();

    harness.clock.advance(Duration::minutes(5));
    assert_eq!(dispatcher.dispatch_notification(notification.id).await, DispatchOutcome::AlreadySent);
    assert_eq!(dispatcher.dispatch_due(id, notification.days_before).await, DispatchOutcome::AlreadySent);

    let second = harness.service.get_reminder(id).await.unwrap();
    assert_eq!(first.reminder_date, second.reminder_date);
    assert!(second.reminder_sent);

    let shown = harness.backend.shown();
    assert_eq!(shown.len(), 1);
    assert_eq!(shown[0].tag, id.to_string());
}

#[tokio::test]
async fn test_sweep_after_timer_does_not_duplicate() {
    let harness = TestHarness::new();
    let id = harness
        .service
        .create_reminder(harness.request("patient-1", Duration::days(10), vec![1]))
        .await
        .unwrap();
    let notification = harness.service.store().notifications_for(id).await[0].clone();

    harness.clock.advance(Duration::days(9));
    harness.service.dispatcher().dispatch_notification(notification.id).await;
    assert!(harness.service.run_sweep().await.is_empty());
    assert_eq!(harness.backend.shown().len(), 1);
}

#[tokio::test]
async fn test_denied_permission_still_reaches_listeners() {
    let harness = TestHarness::with_permission(NotificationPermission::Denied);
    let mut events = harness.service.subscribe();
    let id = harness
        .service
        .create_reminder(harness.request("patient-1", Duration::days(1), vec![1]))
        .await
        .unwrap();

    assert_eq!(harness.service.dispatcher().dispatch_due(id, 1).await, DispatchOutcome::Dispatched);

    let event = timeout(StdDuration::from_secs(1), events.recv())
        .await
        .expect("event should arrive")
        .unwrap();
    assert_eq!(event.event, FOLLOW_UP_REMINDER_EVENT);
    assert_eq!(event.reminder.id, id);
    assert!(event.reminder.reminder_sent);
    assert!(event.show_popup && event.show_toast);

    assert!(harness.backend.shown().is_empty());
    assert!(harness.service.get_reminder(id).await.unwrap().reminder_sent);
}

#[tokio::test]
async fn test_browser_flag_off_skips_native_channel() {
    let harness = TestHarness::new();
    let mut request = harness.request("patient-1", Duration::days(1), vec![1]);
    if let Some(settings) = request.reminder_settings.as_mut() {
        settings.browser_notifications = false;
    }
    let id = harness.service.create_reminder(request).await.unwrap();

    harness.service.dispatcher().dispatch_due(id, 1).await;
    assert!(harness.backend.shown().is_empty());
}

#[tokio::test]
async fn test_email_and_sms_flags_do_not_break_dispatch() {
    let harness = TestHarness::new();
    let mut request = harness.request("patient-1", Duration::days(1), vec![1]);
    if let Some(settings) = request.reminder_settings.as_mut() {
        settings.email_reminders = true;
        settings.sms_reminders = true;
    }
    let id = harness.service.create_reminder(request).await.unwrap();

    assert_eq!(harness.service.dispatcher().dispatch_due(id, 1).await, DispatchOutcome::Dispatched);
    assert!(harness.service.get_reminder(id).await.unwrap().reminder_sent);
    assert_eq!(harness.backend.shown().len(), 1);
}
