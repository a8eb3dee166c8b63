use std::collections::HashMap;
use std::sync::Arc;
use chrono::{DateTime, Duration, Utc};
use tokio::sync::Mutex;
use tokio::task::AbortHandle;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::{FollowUpReminder, NotificationType, ReminderNotification, SharedClock};
use crate::services::{dispatcher::ReminderDispatcher, store::ReminderStore};

struct ArmedTimer {
    reminder_id: Uuid,
    handle: AbortHandle,
}

/// Turns a reminder's settings into notification records and one-shot timers.
///
/// Every timer handle is kept so re-arming and deletion cancel outstanding timers
/// instead of leaving stale ones to fire against an outdated follow-up date.
#[derive(Clone)]
pub struct NotificationScheduler {
    store: ReminderStore,
    dispatcher: ReminderDispatcher,
    clock: SharedClock,
    timers: Arc<Mutex<HashMap<Uuid, ArmedTimer>>>,
}

impl NotificationScheduler {
    pub fn new(store: ReminderStore, dispatcher: ReminderDispatcher, clock: SharedClock) -> Self {
        Self {
            store,
            dispatcher,
            clock,
            timers: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Notifications whose fire time is still ahead of `now`. Past offsets are dropped.
    pub fn plan(reminder: &FollowUpReminder, now: DateTime<Utc>) -> Vec<ReminderNotification> {
        let settings = &reminder.reminder_settings;
        if !settings.enabled || reminder.is_completed() {
            return Vec::new();
        }

        let notification_type = if settings.browser_notifications {
            NotificationType::Browser
        } else {
            NotificationType::Popup
        };

        settings
            .distinct_days()
            .into_iter()
            .filter_map(|days_before| {
                let fire_time = reminder.follow_up_date - Duration::days(days_before as i64);
                (fire_time > now).then(|| ReminderNotification {
                    id: Uuid::new_v4(),
                    reminder_id: reminder.id,
                    days_before,
                    notification_type: notification_type.clone(),
                    message: reminder_message(reminder, days_before),
                    scheduled_for: fire_time,
                    sent: false,
                    sent_at: None,
                })
            })
            .collect()
    }

    #[instrument(skip(self, reminder), fields(reminder_id = %reminder.id))]
    pub async fn arm(&self, reminder: &FollowUpReminder) -> usize {
        let now = self.clock.now();
        let notifications = Self::plan(reminder, now);
        if notifications.is_empty() {
            debug!("No future notification times for reminder {}", reminder.id);
            return 0;
        }

        self.store.insert_notifications(notifications.clone()).await;

        let mut timers = self.timers.lock().await;
        for notification in &notifications {
            let delay = (notification.scheduled_for - now).to_std().unwrap_or_default();
            let notification_id = notification.id;
            let dispatcher = self.dispatcher.clone();
            let registry = Arc::clone(&self.timers);

            let handle = tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                registry.lock().await.remove(&notification_id);
                dispatcher.dispatch_notification(notification_id).await;
            });

            debug!(
                "Armed notification {} for {} ({} days before)",
                notification_id, notification.scheduled_for, notification.days_before
            );
            timers.insert(
                notification_id,
                ArmedTimer {
                    reminder_id: reminder.id,
                    handle: handle.abort_handle(),
                },
            );
        }

        info!("Armed {} notifications for reminder {}", notifications.len(), reminder.id);
        notifications.len()
    }

    /// Cancels outstanding timers and drops the reminder's notification records.
    pub async fn disarm(&self, reminder_id: Uuid) -> usize {
        let cancelled = self.cancel(reminder_id).await;
        self.store.remove_notifications_for(reminder_id).await;
        cancelled
    }

    pub async fn cancel(&self, reminder_id: Uuid) -> usize {
        let mut timers = self.timers.lock().await;
        let before = timers.len();
        timers.retain(|_, timer| {
            if timer.reminder_id == reminder_id {
                timer.handle.abort();
                false
            } else {
                true
            }
        });
        let cancelled = before - timers.len();
        if cancelled > 0 {
            debug!("Cancelled {} timers for reminder {}", cancelled, reminder_id);
        }
        cancelled
    }

    pub async fn cancel_all(&self) -> usize {
        let mut timers = self.timers.lock().await;
        let cancelled = timers.len();
        for (_, timer) in timers.drain() {
            timer.handle.abort();
        }
        cancelled
    }

    pub async fn armed_count(&self) -> usize {
        self.timers.lock().await.len()
    }

    pub async fn armed_for(&self, reminder_id: Uuid) -> usize {
        let timers = self.timers.lock().await;
        timers.values().filter(|t| t.reminder_id == reminder_id).count()
    }
}

fn reminder_message(reminder: &FollowUpReminder, days_before: u32) -> String {
    let when = match days_before {
        0 => "today".to_string(),
        1 => "tomorrow".to_string(),
        days => format!("in {} days", days),
    };
    format!(
        "Reminder: your follow-up with {} for {} is {}",
        reminder.doctor_name, reminder.diagnosis, when
    )
}
