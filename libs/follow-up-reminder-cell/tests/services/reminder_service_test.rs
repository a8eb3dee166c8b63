use assert_matches::assert_matches;
use chrono::Duration;
use uuid::Uuid;

use follow_up_reminder_cell::*;

use crate::TestHarness;

#[tokio::test]
async fn test_creation_arms_every_future_offset() {
    let harness = TestHarness::new();
    let id = harness
        .service
        .create_reminder(harness.request("patient-1", Duration::days(10), vec![1, 3, 7]))
        .await
        .unwrap();

    assert_eq!(harness.service.scheduler().armed_for(id).await, 3);

    let mut fire_times: Vec<_> = harness
        .service
        .store()
        .notifications_for(id)
        .await
        .iter()
        .map(|n| n.scheduled_for)
        .collect();
    fire_times.sort();
    assert_eq!(
        fire_times,
        vec![
            harness.now + Duration::days(3),
            harness.now + Duration::days(7),
            harness.now + Duration::days(9),
        ]
    );

    let reminder = harness.service.get_reminder(id).await.unwrap();
    assert_eq!(reminder.status, ReminderStatus::Upcoming);
    assert!(!reminder.reminder_sent);
}

#[tokio::test]
async fn test_creation_drops_past_offsets() {
    let harness = TestHarness::new();
    let id = harness
        .service
        .create_reminder(harness.request("patient-1", Duration::days(2), vec![1, 3, 7]))
        .await
        .unwrap();

    let notifications = harness.service.store().notifications_for(id).await;
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0].days_before, 1);
    assert_eq!(harness.service.scheduler().armed_for(id).await, 1);
}

#[tokio::test]
async fn test_patient_reminders_in_creation_order() {
    let harness = TestHarness::new();
    let first = harness
        .service
        .create_reminder(harness.request("patient-1", Duration::days(4), vec![1]))
        .await
        .unwrap();
    harness
        .service
        .create_reminder(harness.request("patient-2", Duration::days(4), vec![1]))
        .await
        .unwrap();
    let second = harness
        .service
        .create_reminder(harness.request("patient-1", Duration::days(2), vec![1]))
        .await
        .unwrap();

    let ids: Vec<Uuid> = harness
        .service
        .get_patient_reminders("patient-1")
        .await
        .iter()
        .map(|r| r.id)
        .collect();
    assert_eq!(ids, vec![first, second]);
    assert_eq!(harness.service.get_all_reminders().await.len(), 3);
}

#[tokio::test]
async fn test_invalid_requests_are_rejected() {
    let harness = TestHarness::new();

    let mut bad_date = harness.request("patient-1", Duration::days(4), vec![1]);
    bad_date.follow_up_date = "sometime next week".to_string();
    assert_matches!(
        harness.service.create_reminder(bad_date).await,
        Err(ReminderError::InvalidDate { .. })
    );

    let no_days = harness.request("patient-1", Duration::days(4), vec![]);
    assert_matches!(
        harness.service.create_reminder(no_days).await,
        Err(ReminderError::ValidationError(_))
    );

    assert!(harness.service.get_all_reminders().await.is_empty());
}

#[tokio::test]
async fn test_snooze_resets_firing_state() {
    let harness = TestHarness::new();
    let id = harness
        .service
        .create_reminder(harness.request("patient-1", Duration::days(10), vec![1, 3, 7]))
        .await
        .unwrap();

    let consumed = harness.service.store().notifications_for(id).await[0].id;
    assert_eq!(
        harness.service.dispatcher().dispatch_notification(consumed).await,
        DispatchOutcome::Dispatched
    );
    assert!(harness.service.get_reminder(id).await.unwrap().reminder_sent);

    let snoozed = harness.service.snooze_reminder(id, 24).await.unwrap();
    assert_eq!(snoozed.follow_up_date, harness.now + Duration::hours(24));
    assert!(!snoozed.reminder_sent);

    // The one-day offset lands exactly on "now", so nothing is ahead to arm.
    assert_eq!(harness.service.scheduler().armed_for(id).await, 0);
    assert!(harness.service.store().notifications_for(id).await.is_empty());
    assert_eq!(
        harness.service.dispatcher().dispatch_notification(consumed).await,
        DispatchOutcome::NotificationMissing
    );

    // The sweep still sees it as due tomorrow.
    assert_eq!(harness.service.run_sweep().await, vec![id]);
}

#[tokio::test]
async fn test_snooze_rearms_future_offsets() {
    let harness = TestHarness::new();
    let id = harness
        .service
        .create_reminder(harness.request("patient-1", Duration::days(10), vec![1, 3, 7]))
        .await
        .unwrap();

    harness.service.snooze_reminder(id, 72).await.unwrap();

    let notifications = harness.service.store().notifications_for(id).await;
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0].days_before, 1);
    assert_eq!(notifications[0].scheduled_for, harness.now + Duration::hours(48));
    assert_eq!(harness.service.scheduler().armed_for(id).await, 1);
}

#[tokio::test]
async fn test_snooze_requires_positive_hours() {
    let harness = TestHarness::new();
    let id = harness
        .service
        .create_reminder(harness.request("patient-1", Duration::days(10), vec![1]))
        .await
        .unwrap();

    assert_matches!(
        harness.service.snooze_reminder(id, 0).await,
        Err(ReminderError::ValidationError(_))
    );
}

#[tokio::test]
async fn test_completed_is_terminal() {
    let harness = TestHarness::new();
    let id = harness
        .service
        .create_reminder(harness.request("patient-1", Duration::days(10), vec![1, 3, 7]))
        .await
        .unwrap();

    let completed = harness
        .service
        .update_reminder_status(id, ReminderStatus::Completed)
        .await
        .unwrap();
    assert!(completed.reminder_sent);
    assert_eq!(harness.service.scheduler().armed_for(id).await, 0);

    // Three days out matches a configured offset, but the reminder is done.
    harness.clock.advance(Duration::days(7));
    assert!(harness.service.run_sweep().await.is_empty());
    assert!(harness.backend.shown().is_empty());
}

#[tokio::test]
async fn test_completed_reminder_cannot_be_snoozed() {
    let harness = TestHarness::new();
    let id = harness
        .service
        .create_reminder(harness.request("patient-1", Duration::days(10), vec![1, 3, 7]))
        .await
        .unwrap();
    harness
        .service
        .update_reminder_status(id, ReminderStatus::Completed)
        .await
        .unwrap();

    assert_matches!(
        harness.service.snooze_reminder(id, 48).await,
        Err(ReminderError::ValidationError(_))
    );

    let reminder = harness.service.get_reminder(id).await.unwrap();
    assert!(reminder.reminder_sent);
    assert_eq!(reminder.follow_up_date, harness.now + Duration::days(10));
    assert_eq!(harness.service.scheduler().armed_for(id).await, 0);
}

#[tokio::test]
async fn test_unknown_ids_report_not_found() {
    let harness = TestHarness::new();
    let missing = Uuid::new_v4();

    assert_matches!(
        harness.service.update_reminder_status(missing, ReminderStatus::Completed).await,
        Err(ReminderError::ReminderNotFound(id)) if id == missing
    );
    assert_matches!(
        harness.service.snooze_reminder(missing, 24).await,
        Err(ReminderError::ReminderNotFound(_))
    );
    assert_matches!(
        harness.service.delete_reminder(missing).await,
        Err(ReminderError::ReminderNotFound(_))
    );
    assert_matches!(
        harness.service.get_reminder(missing).await,
        Err(ReminderError::ReminderNotFound(_))
    );
}

#[tokio::test]
async fn test_delete_cancels_timers_and_purges_notifications() {
    let harness = TestHarness::new();
    let id = harness
        .service
        .create_reminder(harness.request("patient-1", Duration::days(10), vec![1, 3, 7]))
        .await
        .unwrap();
    let other = harness
        .service
        .create_reminder(harness.request("patient-1", Duration::days(10), vec![1]))
        .await
        .unwrap();

    harness.service.delete_reminder(id).await.unwrap();

    assert_eq!(harness.service.scheduler().armed_for(id).await, 0);
    assert!(harness.service.store().notifications_for(id).await.is_empty());
    assert_eq!(harness.service.scheduler().armed_for(other).await, 1);
    assert_eq!(harness.service.get_patient_reminders("patient-1").await.len(), 1);
}

#[tokio::test]
async fn test_settings_update_rearms() {
    let harness = TestHarness::new();
    let id = harness
        .service
        .create_reminder(harness.request("patient-1", Duration::days(10), vec![1]))
        .await
        .unwrap();

    let settings = ReminderSettings {
        reminder_days: vec![2, 5],
        ..ReminderSettings::default()
    };
    let updated = harness.service.update_reminder_settings(id, settings).await.unwrap();
    assert_eq!(updated.reminder_settings.reminder_days, vec![2, 5]);

    let mut days: Vec<u32> = harness
        .service
        .store()
        .notifications_for(id)
        .await
        .iter()
        .map(|n| n.days_before)
        .collect();
    days.sort();
    assert_eq!(days, vec![2, 5]);
    assert_eq!(harness.service.scheduler().armed_for(id).await, 2);

    let disabled = ReminderSettings {
        enabled: false,
        ..ReminderSettings::default()
    };
    harness.service.update_reminder_settings(id, disabled).await.unwrap();
    assert_eq!(harness.service.scheduler().armed_for(id).await, 0);
}

#[tokio::test]
async fn test_upcoming_and_overdue_are_inferred() {
    let harness = TestHarness::new();
    let soon = harness
        .service
        .create_reminder(harness.request("patient-1", Duration::days(1), vec![1]))
        .await
        .unwrap();
    let later = harness
        .service
        .create_reminder(harness.request("patient-1", Duration::days(5), vec![1]))
        .await
        .unwrap();

    harness.clock.advance(Duration::days(2));

    let upcoming: Vec<Uuid> = harness.service.get_upcoming_reminders("patient-1").await.iter().map(|r| r.id).collect();
    let overdue: Vec<Uuid> = harness.service.get_overdue_reminders("patient-1").await.iter().map(|r| r.id).collect();
    assert_eq!(upcoming, vec![later]);
    assert_eq!(overdue, vec![soon]);

    // Inference never rewrites the stored status.
    assert_eq!(harness.service.get_reminder(soon).await.unwrap().status, ReminderStatus::Upcoming);
}
