use std::sync::{Arc, Mutex};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::broadcast;
use tracing::{debug, info};

use crate::{
    FollowUpReminder, NativeNotification, NotificationPermission, ReminderError, ReminderEvent,
    ReminderSettings,
};

pub type ReminderEventSender = broadcast::Sender<ReminderEvent>;
pub type ReminderEventReceiver = broadcast::Receiver<ReminderEvent>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelKind {
    Browser,
    InAppEvent,
    Email,
    Sms,
}

impl std::fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChannelKind::Browser => write!(f, "browser"),
            ChannelKind::InAppEvent => write!(f, "in_app_event"),
            ChannelKind::Email => write!(f, "email"),
            ChannelKind::Sms => write!(f, "sms"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Delivered,
    Skipped(String),
    Unsupported,
}

/// One way of getting a fired reminder in front of the patient.
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    fn kind(&self) -> ChannelKind;

    fn is_enabled(&self, settings: &ReminderSettings) -> bool;

    async fn deliver(
        &self,
        reminder: &FollowUpReminder,
        now: DateTime<Utc>,
    ) -> Result<DeliveryOutcome, ReminderError>;
}

/// Host-side notification surface with a permission model.
#[cfg_attr(test, mockall::automock)]
pub trait NativeNotificationBackend: Send + Sync {
    fn permission(&self) -> NotificationPermission;

    fn request_permission(&self) -> NotificationPermission;

    fn show(&self, notification: &NativeNotification) -> Result<(), ReminderError>;
}

/// Native backend that records notifications in the structured log.
///
/// Starts at `Default`; the first permission request resolves to the configured answer.
#[derive(Debug)]
pub struct TracingNotificationBackend {
    configured: NotificationPermission,
    current: Mutex<NotificationPermission>,
}

impl TracingNotificationBackend {
    pub fn new(configured: NotificationPermission) -> Self {
        Self {
            configured,
            current: Mutex::new(NotificationPermission::Default),
        }
    }
}

impl NativeNotificationBackend for TracingNotificationBackend {
    fn permission(&self) -> NotificationPermission {
        *self.current.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn request_permission(&self) -> NotificationPermission {
        let mut current = self.current.lock().unwrap_or_else(|e| e.into_inner());
        if *current == NotificationPermission::Default {
            *current = self.configured;
        }
        *current
    }

    fn show(&self, notification: &NativeNotification) -> Result<(), ReminderError> {
        info!(
            tag = %notification.tag,
            title = %notification.title,
            "Native notification: {}", notification.body
        );
        Ok(())
    }
}

pub struct BrowserChannel {
    backend: Arc<dyn NativeNotificationBackend>,
}

impl BrowserChannel {
    pub fn new(backend: Arc<dyn NativeNotificationBackend>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl NotificationChannel for BrowserChannel {
    fn kind(&self) -> ChannelKind {
        ChannelKind::Browser
    }

    fn is_enabled(&self, settings: &ReminderSettings) -> bool {
        settings.browser_notifications
    }

    async fn deliver(
        &self,
        reminder: &FollowUpReminder,
        _now: DateTime<Utc>,
    ) -> Result<DeliveryOutcome, ReminderError> {
        let permission = self.backend.permission();
        if permission != NotificationPermission::Granted {
            return Ok(DeliveryOutcome::Skipped(format!("permission is {:?}", permission)));
        }

        self.backend.show(&NativeNotification::for_reminder(reminder))?;
        Ok(DeliveryOutcome::Delivered)
    }
}

/// Broadcasts fired reminders to in-process listeners (UI streams, toasts, dialogs).
#[derive(Clone)]
pub struct InAppEventChannel {
    sender: ReminderEventSender,
}

impl InAppEventChannel {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> ReminderEventReceiver {
        self.sender.subscribe()
    }
}

#[async_trait]
impl NotificationChannel for InAppEventChannel {
    fn kind(&self) -> ChannelKind {
        ChannelKind::InAppEvent
    }

    // Popup and toast flags travel in the payload; listeners decide.
    fn is_enabled(&self, _settings: &ReminderSettings) -> bool {
        true
    }

    async fn deliver(
        &self,
        reminder: &FollowUpReminder,
        now: DateTime<Utc>,
    ) -> Result<DeliveryOutcome, ReminderError> {
        let event = ReminderEvent::for_reminder(reminder, now);
        match self.sender.send(event) {
            Ok(listeners) => {
                debug!("Reminder event for {} reached {} listeners", reminder.id, listeners);
                Ok(DeliveryOutcome::Delivered)
            }
            Err(_) => Ok(DeliveryOutcome::Skipped("no listeners".to_string())),
        }
    }
}

#[derive(Debug, Default)]
pub struct EmailChannel;

#[async_trait]
impl NotificationChannel for EmailChannel {
    fn kind(&self) -> ChannelKind {
        ChannelKind::Email
    }

    fn is_enabled(&self, settings: &ReminderSettings) -> bool {
        settings.email_reminders
    }

    // TODO: wire an SMTP transport once the clinic picks an email provider.
    async fn deliver(
        &self,
        reminder: &FollowUpReminder,
        _now: DateTime<Utc>,
    ) -> Result<DeliveryOutcome, ReminderError> {
        debug!("Email reminders are not implemented; skipping reminder {}", reminder.id);
        Ok(DeliveryOutcome::Unsupported)
    }
}

#[derive(Debug, Default)]
pub struct SmsChannel;

#[async_trait]
impl NotificationChannel for SmsChannel {
    fn kind(&self) -> ChannelKind {
        ChannelKind::Sms
    }

    fn is_enabled(&self, settings: &ReminderSettings) -> bool {
        settings.sms_reminders
    }

    async fn deliver(
        &self,
        reminder: &FollowUpReminder,
        _now: DateTime<Utc>,
    ) -> Result<DeliveryOutcome, ReminderError> {
        debug!("SMS reminders are not implemented; skipping reminder {}", reminder.id);
        Ok(DeliveryOutcome::Unsupported)
    }
}
