use std::sync::{Arc, Mutex};
use chrono::{DateTime, Duration, SecondsFormat, Utc};

use follow_up_reminder_cell::*;

/// Native backend that keeps every notification it was asked to show.
pub struct RecordingBackend {
    permission: Mutex<NotificationPermission>,
    shown: Mutex<Vec<NativeNotification>>,
}

impl RecordingBackend {
    pub fn new(permission: NotificationPermission) -> Self {
        Self {
            permission: Mutex::new(permission),
            shown: Mutex::new(Vec::new()),
        }
    }

    pub fn shown(&self) -> Vec<NativeNotification> {
        self.shown.lock().unwrap().clone()
    }
}

impl NativeNotificationBackend for RecordingBackend {
    fn permission(&self) -> NotificationPermission {
        *self.permission.lock().unwrap()
    }

    fn request_permission(&self) -> NotificationPermission {
        *self.permission.lock().unwrap()
    }

    fn show(&self, notification: &NativeNotification) -> Result<(), ReminderError> {
        self.shown.lock().unwrap().push(notification.clone());
        Ok(())
    }
}

pub struct TestHarness {
    pub service: Arc<FollowUpReminderService>,
    pub clock: ManualClock,
    pub backend: Arc<RecordingBackend>,
    pub now: DateTime<Utc>,
}

impl TestHarness {
    pub fn new() -> Self {
        Self::with_permission(NotificationPermission::Granted)
    }

    pub fn with_permission(permission: NotificationPermission) -> Self {
        let now = Utc::now();
        let clock = ManualClock::new(now);
        let backend = Arc::new(RecordingBackend::new(permission));
        let service = FollowUpReminderService::with_parts(
            ReminderSchedulerConfig::default(),
            backend.clone(),
            Arc::new(clock.clone()),
        );

        Self {
            service: Arc::new(service),
            clock,
            backend,
            now,
        }
    }

    pub fn request(&self, patient_id: &str, until: Duration, days: Vec<u32>) -> CreateReminderRequest {
        create_test_request(patient_id, self.now + until, days)
    }
}

pub fn create_test_request(patient_id: &str, follow_up: DateTime<Utc>, days: Vec<u32>) -> CreateReminderRequest {
    CreateReminderRequest {
        patient_id: patient_id.to_string(),
        patient_name: "Amara Okafor".to_string(),
        doctor_name: "Dr. Sarah Johnson".to_string(),
        follow_up_date: follow_up.to_rfc3339_opts(SecondsFormat::Nanos, true),
        diagnosis: "Hypertension review".to_string(),
        status: None,
        reminder_settings: Some(ReminderSettings {
            reminder_days: days,
            ..ReminderSettings::default()
        }),
    }
}

// Test modules
mod reminder_service_test;
mod dispatch_test;
mod timer_test;
