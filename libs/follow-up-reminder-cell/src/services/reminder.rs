use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::time::Duration;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    snooze_target, CreateReminderRequest, FollowUpReminder, NotificationPermission, ReminderError,
    ReminderSchedulerConfig, ReminderSettings, ReminderStatus, SharedClock, SystemClock,
};
use crate::services::{
    channels::{
        BrowserChannel, EmailChannel, InAppEventChannel, NativeNotificationBackend, NotificationChannel,
        ReminderEventReceiver, SmsChannel, TracingNotificationBackend,
    },
    dispatcher::ReminderDispatcher,
    scheduler::NotificationScheduler,
    store::ReminderStore,
    sweep::PeriodicSweep,
};

/// Owner of every reminder, timer and channel for one application instance.
///
/// Constructed once by the composition root and shared behind an `Arc`.
pub struct FollowUpReminderService {
    // Held across every store write and its matching timer change, so timers
    // always reflect the reminder as last written.
    writes: Mutex<()>,
    store: ReminderStore,
    scheduler: NotificationScheduler,
    dispatcher: ReminderDispatcher,
    sweep: PeriodicSweep,
    events: InAppEventChannel,
    native_backend: Arc<dyn NativeNotificationBackend>,
    clock: SharedClock,
}

impl FollowUpReminderService {
    pub fn new(config: ReminderSchedulerConfig) -> Self {
        let backend = Arc::new(TracingNotificationBackend::new(config.native_permission));
        Self::with_parts(config, backend, Arc::new(SystemClock))
    }

    pub fn with_parts(
        config: ReminderSchedulerConfig,
        native_backend: Arc<dyn NativeNotificationBackend>,
        clock: SharedClock,
    ) -> Self {
        let store = ReminderStore::new();
        let events = InAppEventChannel::new(config.event_channel_capacity);

        let channels: Vec<Arc<dyn NotificationChannel>> = vec![
            Arc::new(BrowserChannel::new(Arc::clone(&native_backend))),
            Arc::new(events.clone()),
            Arc::new(EmailChannel),
            Arc::new(SmsChannel),
        ];

        let dispatcher = ReminderDispatcher::new(store.clone(), channels, clock.clone());
        let scheduler = NotificationScheduler::new(store.clone(), dispatcher.clone(), clock.clone());
        let sweep = PeriodicSweep::new(
            store.clone(),
            dispatcher.clone(),
            clock.clone(),
            Duration::from_secs(config.sweep_interval_seconds.max(1)),
        );

        Self {
            writes: Mutex::new(()),
            store,
            scheduler,
            dispatcher,
            sweep,
            events,
            native_backend,
            clock,
        }
    }

    /// Requests native notification permission once and starts the periodic sweep.
    pub async fn start(&self) -> NotificationPermission {
        let permission = self.native_backend.request_permission();
        info!("Native notification permission: {:?}", permission);
        self.sweep.start().await;
        permission
    }

    pub async fn shutdown(&self) -> Result<(), ReminderError> {
        let cancelled = self.scheduler.cancel_all().await;
        self.sweep.shutdown().await?;
        info!("Follow-up reminder service stopped, cancelled {} timers", cancelled);
        Ok(())
    }

    #[instrument(skip(self, request), fields(patient_id = %request.patient_id))]
    pub async fn create_reminder(&self, request: CreateReminderRequest) -> Result<Uuid, ReminderError> {
        let reminder = FollowUpReminder::from_request(request, self.clock.now())?;
        let _guard = self.writes.lock().await;
        let id = self.store.add(reminder.clone()).await;
        let armed = self.scheduler.arm(&reminder).await;
        info!("Created follow-up reminder {} with {} notifications", id, armed);
        Ok(id)
    }

    pub async fn get_reminder(&self, id: Uuid) -> Result<FollowUpReminder, ReminderError> {
        self.store.get(id).await.ok_or(ReminderError::ReminderNotFound(id))
    }

    pub async fn get_patient_reminders(&self, patient_id: &str) -> Vec<FollowUpReminder> {
        self.store.get_by_patient(patient_id).await
    }

    pub async fn get_all_reminders(&self) -> Vec<FollowUpReminder> {
        self.store.list_all().await
    }

    pub async fn get_upcoming_reminders(&self, patient_id: &str) -> Vec<FollowUpReminder> {
        let now = self.clock.now();
        self.store
            .get_by_patient(patient_id)
            .await
            .into_iter()
            .filter(|r| !r.is_completed() && r.follow_up_date >= now)
            .collect()
    }

    pub async fn get_overdue_reminders(&self, patient_id: &str) -> Vec<FollowUpReminder> {
        let now = self.clock.now();
        self.store
            .get_by_patient(patient_id)
            .await
            .into_iter()
            .filter(|r| r.is_overdue(now))
            .collect()
    }

    #[instrument(skip(self))]
    pub async fn update_reminder_status(&self, id: Uuid, status: ReminderStatus) -> Result<FollowUpReminder, ReminderError> {
        let _guard = self.writes.lock().await;
        let updated = self.store.update_status(id, status).await?;
        if updated.is_completed() {
            self.scheduler.cancel(id).await;
        }
        info!("Reminder {} status set to {}", id, updated.status);
        Ok(updated)
    }

    /// Moves the follow-up to `now + hours`, clears the sent flag and re-arms.
    /// Completed reminders cannot be snoozed.
    #[instrument(skip(self))]
    pub async fn snooze_reminder(&self, id: Uuid, hours: i64) -> Result<FollowUpReminder, ReminderError> {
        let target = snooze_target(self.clock.now(), hours)?;
        let _guard = self.writes.lock().await;
        let current = self.get_reminder(id).await?;
        if current.is_completed() {
            return Err(ReminderError::ValidationError(format!(
                "reminder {} is completed and cannot be snoozed",
                id
            )));
        }

        // Old timers must not fire between the date change and the new arming.
        self.scheduler.disarm(id).await;
        let snoozed = self.store.replace_follow_up(id, target).await?;
        let armed = self.scheduler.arm(&snoozed).await;
        info!("Snoozed reminder {} by {}h, {} notifications armed", id, hours, armed);
        Ok(snoozed)
    }

    #[instrument(skip(self, settings))]
    pub async fn update_reminder_settings(
        &self,
        id: Uuid,
        settings: ReminderSettings,
    ) -> Result<FollowUpReminder, ReminderError> {
        settings.validate()?;
        let _guard = self.writes.lock().await;
        self.get_reminder(id).await?;
        self.scheduler.disarm(id).await;
        let updated = self.store.replace_settings(id, settings).await?;
        self.scheduler.arm(&updated).await;
        Ok(updated)
    }

    #[instrument(skip(self))]
    pub async fn delete_reminder(&self, id: Uuid) -> Result<(), ReminderError> {
        let _guard = self.writes.lock().await;
        self.scheduler.cancel(id).await;
        self.store.delete(id).await?;
        info!("Deleted follow-up reminder {}", id);
        Ok(())
    }

    pub async fn run_sweep(&self) -> Vec<Uuid> {
        self.sweep.run_once().await
    }

    pub fn subscribe(&self) -> ReminderEventReceiver {
        self.events.subscribe()
    }

    pub fn store(&self) -> &ReminderStore {
        &self.store
    }

    pub fn scheduler(&self) -> &NotificationScheduler {
        &self.scheduler
    }

    pub fn dispatcher(&self) -> &ReminderDispatcher {
        &self.dispatcher
    }

    pub async fn is_sweep_running(&self) -> bool {
        self.sweep.is_running().await
    }
}

impl Default for FollowUpReminderService {
    fn default() -> Self {
        Self::new(ReminderSchedulerConfig::default())
    }
}
