use std::sync::Arc;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::{FollowUpReminder, ReminderError, ReminderNotification, ReminderSettings, ReminderStatus};

#[derive(Debug, Default)]
struct StoreState {
    reminders: Vec<FollowUpReminder>,
    notifications: Vec<ReminderNotification>,
}

impl StoreState {
    fn reminder_mut(&mut self, id: Uuid) -> Result<&mut FollowUpReminder, ReminderError> {
        self.reminders
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or(ReminderError::ReminderNotFound(id))
    }
}

/// In-memory reminder records and their pending notifications. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct ReminderStore {
    state: Arc<RwLock<StoreState>>,
}

impl ReminderStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add(&self, reminder: FollowUpReminder) -> Uuid {
        let id = reminder.id;
        let mut state = self.state.write().await;
        state.reminders.push(reminder);
        debug!("Stored follow-up reminder {}", id);
        id
    }

    pub async fn get(&self, id: Uuid) -> Option<FollowUpReminder> {
        let state = self.state.read().await;
        state.reminders.iter().find(|r| r.id == id).cloned()
    }

    pub async fn get_by_patient(&self, patient_id: &str) -> Vec<FollowUpReminder> {
        let state = self.state.read().await;
        state
            .reminders
            .iter()
            .filter(|r| r.patient_id == patient_id)
            .cloned()
            .collect()
    }

    pub async fn list_all(&self) -> Vec<FollowUpReminder> {
        let state = self.state.read().await;
        state.reminders.clone()
    }

    pub async fn len(&self) -> usize {
        self.state.read().await.reminders.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Completing a reminder also marks it sent so nothing fires for it again.
    pub async fn update_status(&self, id: Uuid, status: ReminderStatus) -> Result<FollowUpReminder, ReminderError> {
        let mut state = self.state.write().await;
        let reminder = state.reminder_mut(id)?;
        if status == ReminderStatus::Completed {
            reminder.reminder_sent = true;
        }
        reminder.status = status;
        Ok(reminder.clone())
    }

    pub async fn replace_follow_up(&self, id: Uuid, follow_up_date: DateTime<Utc>) -> Result<FollowUpReminder, ReminderError> {
        let mut state = self.state.write().await;
        let reminder = state.reminder_mut(id)?;
        if reminder.is_completed() {
            return Err(ReminderError::ValidationError(format!(
                "reminder {} is completed and cannot be rescheduled",
                id
            )));
        }
        reminder.follow_up_date = follow_up_date;
        reminder.reminder_sent = false;
        Ok(reminder.clone())
    }

    pub async fn replace_settings(&self, id: Uuid, settings: ReminderSettings) -> Result<FollowUpReminder, ReminderError> {
        let mut state = self.state.write().await;
        let reminder = state.reminder_mut(id)?;
        reminder.reminder_settings = settings;
        Ok(reminder.clone())
    }

    /// Flips the reminder to sent. Returns `None` when it was already sent, completed or gone.
    pub async fn mark_reminder_sent(&self, id: Uuid, now: DateTime<Utc>) -> Option<FollowUpReminder> {
        let mut state = self.state.write().await;
        let reminder = state.reminders.iter_mut().find(|r| r.id == id)?;
        if reminder.reminder_sent || reminder.is_completed() {
            return None;
        }
        reminder.reminder_sent = true;
        reminder.reminder_date = Some(now);
        Some(reminder.clone())
    }

    pub async fn delete(&self, id: Uuid) -> Result<FollowUpReminder, ReminderError> {
        let mut state = self.state.write().await;
        let position = state
            .reminders
            .iter()
            .position(|r| r.id == id)
            .ok_or(ReminderError::ReminderNotFound(id))?;
        let removed = state.reminders.remove(position);
        state.notifications.retain(|n| n.reminder_id != id);
        debug!("Deleted follow-up reminder {} and its notifications", id);
        Ok(removed)
    }

    pub async fn insert_notifications(&self, notifications: Vec<ReminderNotification>) {
        let mut state = self.state.write().await;
        state.notifications.extend(notifications);
    }

    pub async fn get_notification(&self, id: Uuid) -> Option<ReminderNotification> {
        let state = self.state.read().await;
        state.notifications.iter().find(|n| n.id == id).cloned()
    }

    pub async fn notifications_for(&self, reminder_id: Uuid) -> Vec<ReminderNotification> {
        let state = self.state.read().await;
        state
            .notifications
            .iter()
            .filter(|n| n.reminder_id == reminder_id)
            .cloned()
            .collect()
    }

    pub async fn remove_notifications_for(&self, reminder_id: Uuid) -> Vec<ReminderNotification> {
        let mut state = self.state.write().await;
        let (removed, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut state.notifications)
            .into_iter()
            .partition(|n| n.reminder_id == reminder_id);
        state.notifications = kept;
        removed
    }

    /// Marks a single notification sent. Returns `false` if it was already sent or is gone.
    pub async fn mark_notification_sent(&self, id: Uuid, now: DateTime<Utc>) -> bool {
        let mut state = self.state.write().await;
        match state.notifications.iter_mut().find(|n| n.id == id) {
            Some(notification) if !notification.sent => {
                notification.sent = true;
                notification.sent_at = Some(now);
                true
            }
            _ => false,
        }
    }

    /// Marks the pending notification for `days_before` sent, if there is one.
    pub async fn mark_pending_sent(&self, reminder_id: Uuid, days_before: u32, now: DateTime<Utc>) -> Option<Uuid> {
        let mut state = self.state.write().await;
        let notification = state
            .notifications
            .iter_mut()
            .find(|n| n.reminder_id == reminder_id && n.days_before == days_before && !n.sent)?;
        notification.sent = true;
        notification.sent_at = Some(now);
        Some(notification.id)
    }
}
