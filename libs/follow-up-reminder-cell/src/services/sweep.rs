use std::sync::Arc;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{Duration, MissedTickBehavior};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::{ReminderError, SharedClock};
use crate::services::{
    dispatcher::{DispatchOutcome, ReminderDispatcher},
    store::ReminderStore,
};

/// Fallback scan that dispatches due reminders by date arithmetic alone,
/// independent of whether any per-notification timer survived.
#[derive(Clone)]
pub struct PeriodicSweep {
    store: ReminderStore,
    dispatcher: ReminderDispatcher,
    clock: SharedClock,
    interval: Duration,
    shutdown_tx: Arc<watch::Sender<bool>>,
    handle: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl PeriodicSweep {
    pub fn new(store: ReminderStore, dispatcher: ReminderDispatcher, clock: SharedClock, interval: Duration) -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            store,
            dispatcher,
            clock,
            interval,
            shutdown_tx: Arc::new(shutdown_tx),
            handle: Arc::new(Mutex::new(None)),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// One pass over every reminder. Returns the ids that were dispatched.
    #[instrument(skip(self))]
    pub async fn run_once(&self) -> Vec<Uuid> {
        let now = self.clock.now();
        let mut dispatched = Vec::new();

        for reminder in self.store.list_all().await {
            let Some(days_before) = reminder.due_days_before(now) else {
                continue;
            };

            match self.dispatcher.dispatch_due(reminder.id, days_before).await {
                DispatchOutcome::Dispatched => dispatched.push(reminder.id),
                outcome => debug!("Sweep skipped reminder {}: {:?}", reminder.id, outcome),
            }
        }

        if !dispatched.is_empty() {
            info!("Reminder sweep dispatched {} reminders", dispatched.len());
        }
        dispatched
    }

    /// Spawns the recurring sweep. The first pass runs one full interval after start.
    pub async fn start(&self) {
        let mut slot = self.handle.lock().await;
        if slot.as_ref().is_some_and(|h| !h.is_finished()) {
            warn!("Reminder sweep already running");
            return;
        }

        self.shutdown_tx.send_replace(false);
        let sweep = self.clone();
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        *slot = Some(tokio::spawn(async move {
            let start = tokio::time::Instant::now() + sweep.interval;
            let mut ticker = tokio::time::interval_at(start, sweep.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            info!("Reminder sweep started with interval {:?}", sweep.interval);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        sweep.run_once().await;
                    }
                    changed = shutdown_rx.changed() => {
                        if changed.is_err() || *shutdown_rx.borrow() {
                            break;
                        }
                    }
                }
            }

            info!("Reminder sweep stopped");
        }));
    }

    pub async fn shutdown(&self) -> Result<(), ReminderError> {
        self.shutdown_tx.send_replace(true);
        if let Some(handle) = self.handle.lock().await.take() {
            handle
                .await
                .map_err(|e| ReminderError::SchedulerError(format!("sweep task ended abnormally: {}", e)))?;
        }
        Ok(())
    }

    pub async fn is_running(&self) -> bool {
        self.handle
            .lock()
            .await
            .as_ref()
            .is_some_and(|h| !h.is_finished())
    }
}
