use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::ReminderError;

pub const FOLLOW_UP_REMINDER_EVENT: &str = "followUpReminder";

const MILLIS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FollowUpReminder {
    pub id: Uuid,
    pub patient_id: String,
    pub patient_name: String,
    pub doctor_name: String,
    pub diagnosis: String,
    pub follow_up_date: DateTime<Utc>,
    pub status: ReminderStatus,
    pub reminder_sent: bool,
    pub reminder_date: Option<DateTime<Utc>>,
    pub reminder_settings: ReminderSettings,
    pub created_at: DateTime<Utc>,
}

impl FollowUpReminder {
    pub fn from_request(request: CreateReminderRequest, now: DateTime<Utc>) -> Result<Self, ReminderError> {
        request.validate()?;
        let follow_up_date = parse_follow_up_date(&request.follow_up_date)?;

        Ok(Self {
            id: Uuid::new_v4(),
            patient_id: request.patient_id,
            patient_name: request.patient_name,
            doctor_name: request.doctor_name,
            diagnosis: request.diagnosis,
            follow_up_date,
            status: request.status.unwrap_or(ReminderStatus::Upcoming),
            reminder_sent: false,
            reminder_date: None,
            reminder_settings: request.reminder_settings.unwrap_or_default(),
            created_at: now,
        })
    }

    /// Whole days left until the follow-up, rounded up. Negative once the date has passed.
    pub fn days_until_follow_up(&self, now: DateTime<Utc>) -> i64 {
        let remaining_ms = (self.follow_up_date - now).num_milliseconds();
        let days = remaining_ms.div_euclid(MILLIS_PER_DAY);
        if remaining_ms.rem_euclid(MILLIS_PER_DAY) > 0 {
            days + 1
        } else {
            days
        }
    }

    /// Read-side inference only; the scheduler never stores `Overdue`.
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.status != ReminderStatus::Completed && self.follow_up_date < now
    }

    pub fn is_completed(&self) -> bool {
        self.status == ReminderStatus::Completed
    }

    /// Due for the sweep when the rounded day count matches one of the configured offsets.
    pub fn due_days_before(&self, now: DateTime<Utc>) -> Option<u32> {
        if self.reminder_sent || self.is_completed() || !self.reminder_settings.enabled {
            return None;
        }

        let days_until = self.days_until_follow_up(now);
        if days_until < 0 {
            return None;
        }

        let days_until = u32::try_from(days_until).ok()?;
        self.reminder_settings
            .reminder_days
            .contains(&days_until)
            .then_some(days_until)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ReminderStatus {
    Upcoming,
    Overdue,
    Completed,
}

impl std::fmt::Display for ReminderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReminderStatus::Upcoming => write!(f, "upcoming"),
            ReminderStatus::Overdue => write!(f, "overdue"),
            ReminderStatus::Completed => write!(f, "completed"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReminderSettings {
    pub enabled: bool,
    pub reminder_days: Vec<u32>,
    pub show_popup: bool,
    pub show_toast: bool,
    pub email_reminders: bool,
    pub sms_reminders: bool,
    pub browser_notifications: bool,
}

impl Default for ReminderSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            reminder_days: vec![1, 3, 7],
            show_popup: true,
            show_toast: true,
            email_reminders: false,
            sms_reminders: false,
            browser_notifications: true,
        }
    }
}

impl ReminderSettings {
    pub fn validate(&self) -> Result<(), ReminderError> {
        if self.enabled && self.reminder_days.is_empty() {
            return Err(ReminderError::ValidationError(
                "reminder_days must contain at least one entry when reminders are enabled".to_string(),
            ));
        }
        if self.reminder_days.iter().any(|days| *days > 365) {
            return Err(ReminderError::ValidationError(
                "reminder_days entries cannot exceed 365".to_string(),
            ));
        }
        Ok(())
    }

    /// Configured offsets, deduplicated, largest first.
    pub fn distinct_days(&self) -> Vec<u32> {
        let mut days = self.reminder_days.clone();
        days.sort_unstable_by(|a, b| b.cmp(a));
        days.dedup();
        days
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReminderNotification {
    pub id: Uuid,
    pub reminder_id: Uuid,
    pub days_before: u32,
    pub notification_type: NotificationType,
    pub message: String,
    pub scheduled_for: DateTime<Utc>,
    pub sent: bool,
    pub sent_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    Popup,
    Toast,
    Email,
    Sms,
    Browser,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateReminderRequest {
    pub patient_id: String,
    pub patient_name: String,
    pub doctor_name: String,
    pub follow_up_date: String,
    pub diagnosis: String,
    pub status: Option<ReminderStatus>,
    pub reminder_settings: Option<ReminderSettings>,
}

impl CreateReminderRequest {
    pub fn validate(&self) -> Result<(), ReminderError> {
        if self.patient_id.trim().is_empty() {
            return Err(ReminderError::ValidationError("patient_id is required".to_string()));
        }
        if self.doctor_name.trim().is_empty() {
            return Err(ReminderError::ValidationError("doctor_name is required".to_string()));
        }
        if let Some(settings) = &self.reminder_settings {
            settings.validate()?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: ReminderStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnoozeRequest {
    pub hours: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReminderEvent {
    pub event: String,
    pub reminder: FollowUpReminder,
    pub show_popup: bool,
    pub show_toast: bool,
    pub emitted_at: DateTime<Utc>,
}

impl ReminderEvent {
    pub fn for_reminder(reminder: &FollowUpReminder, now: DateTime<Utc>) -> Self {
        Self {
            event: FOLLOW_UP_REMINDER_EVENT.to_string(),
            reminder: reminder.clone(),
            show_popup: reminder.reminder_settings.show_popup,
            show_toast: reminder.reminder_settings.show_toast,
            emitted_at: now,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NativeNotification {
    pub title: String,
    pub body: String,
    pub tag: String,
}

impl NativeNotification {
    pub fn for_reminder(reminder: &FollowUpReminder) -> Self {
        Self {
            title: "Follow-up Reminder".to_string(),
            body: format!(
                "Your follow-up appointment with {} is on {}",
                reminder.doctor_name,
                reminder.follow_up_date.format("%A, %B %-d, %Y")
            ),
            tag: reminder.id.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NotificationPermission {
    Default,
    Granted,
    Denied,
}

impl std::str::FromStr for NotificationPermission {
    type Err = ReminderError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "default" | "" => Ok(NotificationPermission::Default),
            "granted" => Ok(NotificationPermission::Granted),
            "denied" => Ok(NotificationPermission::Denied),
            other => Err(ReminderError::ValidationError(format!(
                "unknown notification permission '{}'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ReminderSchedulerConfig {
    pub sweep_interval_seconds: u64,
    pub event_channel_capacity: usize,
    pub native_permission: NotificationPermission,
}

impl Default for ReminderSchedulerConfig {
    fn default() -> Self {
        Self {
            sweep_interval_seconds: 15 * 60,
            event_channel_capacity: 256,
            native_permission: NotificationPermission::Default,
        }
    }
}

impl ReminderSchedulerConfig {
    pub fn from_app_config(config: &shared_config::AppConfig) -> Self {
        let native_permission = config
            .reminder_native_notifications
            .parse()
            .unwrap_or_else(|e| {
                tracing::warn!("Falling back to default notification permission: {}", e);
                NotificationPermission::Default
            });

        Self {
            sweep_interval_seconds: config.reminder_sweep_interval_seconds,
            event_channel_capacity: config.reminder_event_capacity,
            native_permission,
        }
    }
}

pub fn parse_follow_up_date(value: &str) -> Result<DateTime<Utc>, ReminderError> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Ok(parsed.with_timezone(&Utc));
    }

    // Date-only values are taken as midnight UTC.
    chrono::NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map(|date| date.and_time(chrono::NaiveTime::MIN).and_utc())
        .map_err(|e| ReminderError::InvalidDate {
            value: value.to_string(),
            reason: e.to_string(),
        })
}

pub fn snooze_target(now: DateTime<Utc>, hours: i64) -> Result<DateTime<Utc>, ReminderError> {
    if hours <= 0 {
        return Err(ReminderError::ValidationError("snooze hours must be positive".to_string()));
    }
    now.checked_add_signed(Duration::hours(hours))
        .ok_or_else(|| ReminderError::ValidationError("snooze hours out of range".to_string()))
}
