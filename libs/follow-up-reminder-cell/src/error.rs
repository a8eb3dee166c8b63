use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum ReminderError {
    #[error("Reminder not found: {0}")]
    ReminderNotFound(Uuid),

    #[error("Invalid follow-up date '{value}': {reason}")]
    InvalidDate { value: String, reason: String },

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Delivery through {channel} failed: {reason}")]
    DeliveryError { channel: String, reason: String },

    #[error("Scheduler error: {0}")]
    SchedulerError(String),
}
