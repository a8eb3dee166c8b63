use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::{FollowUpReminder, SharedClock};
use crate::services::{
    channels::{DeliveryOutcome, NotificationChannel},
    store::ReminderStore,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    Dispatched,
    AlreadySent,
    ReminderCompleted,
    ReminderMissing,
    NotificationMissing,
}

/// Marks reminders sent and hands them to every enabled channel. Fire-and-forget:
/// channel failures are logged and never retried.
#[derive(Clone)]
pub struct ReminderDispatcher {
    store: ReminderStore,
    channels: Arc<Vec<Arc<dyn NotificationChannel>>>,
    clock: SharedClock,
}

impl ReminderDispatcher {
    pub fn new(store: ReminderStore, channels: Vec<Arc<dyn NotificationChannel>>, clock: SharedClock) -> Self {
        Self {
            store,
            channels: Arc::new(channels),
            clock,
        }
    }

    /// Timer path: a single armed notification reached its fire time.
    #[instrument(skip(self))]
    pub async fn dispatch_notification(&self, notification_id: Uuid) -> DispatchOutcome {
        let Some(notification) = self.store.get_notification(notification_id).await else {
            debug!("Notification {} no longer exists", notification_id);
            return DispatchOutcome::NotificationMissing;
        };
        if notification.sent {
            return DispatchOutcome::AlreadySent;
        }

        let Some(reminder) = self.store.get(notification.reminder_id).await else {
            return DispatchOutcome::ReminderMissing;
        };
        if reminder.is_completed() {
            return DispatchOutcome::ReminderCompleted;
        }

        let now = self.clock.now();
        if !self.store.mark_notification_sent(notification_id, now).await {
            return DispatchOutcome::AlreadySent;
        }

        // Another notification for the same follow-up may already have fired.
        let reminder = self
            .store
            .mark_reminder_sent(reminder.id, now)
            .await
            .unwrap_or(reminder);

        info!(
            reminder_id = %reminder.id,
            days_before = notification.days_before,
            "Follow-up reminder notification fired"
        );
        self.deliver(&reminder).await;
        DispatchOutcome::Dispatched
    }

    /// Sweep path: the reminder matched a configured day by date arithmetic.
    #[instrument(skip(self))]
    pub async fn dispatch_due(&self, reminder_id: Uuid, days_before: u32) -> DispatchOutcome {
        let Some(reminder) = self.store.get(reminder_id).await else {
            return DispatchOutcome::ReminderMissing;
        };
        if reminder.is_completed() {
            return DispatchOutcome::ReminderCompleted;
        }

        let now = self.clock.now();
        let Some(reminder) = self.store.mark_reminder_sent(reminder_id, now).await else {
            return DispatchOutcome::AlreadySent;
        };

        if let Some(notification_id) = self.store.mark_pending_sent(reminder_id, days_before, now).await {
            debug!("Sweep consumed pending notification {}", notification_id);
        }

        info!(
            reminder_id = %reminder.id,
            days_before,
            "Follow-up reminder dispatched by sweep"
        );
        self.deliver(&reminder).await;
        DispatchOutcome::Dispatched
    }

    async fn deliver(&self, reminder: &FollowUpReminder) {
        let now = self.clock.now();
        for channel in self.channels.iter() {
            if !channel.is_enabled(&reminder.reminder_settings) {
                continue;
            }

            match channel.deliver(reminder, now).await {
                Ok(DeliveryOutcome::Delivered) => {
                    debug!("Delivered reminder {} via {}", reminder.id, channel.kind());
                }
                Ok(DeliveryOutcome::Skipped(reason)) => {
                    debug!("Skipped {} for reminder {}: {}", channel.kind(), reminder.id, reason);
                }
                Ok(DeliveryOutcome::Unsupported) => {
                    debug!("Channel {} has no transport yet", channel.kind());
                }
                Err(e) => {
                    warn!("Delivery via {} failed for reminder {}: {}", channel.kind(), reminder.id, e);
                }
            }
        }
    }
}
