use std::convert::Infallible;
use std::sync::Arc;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        Json,
    },
    Extension,
};
use futures::stream::{self, Stream};
use serde_json::{json, Value};
use tokio::sync::broadcast::error::RecvError;
use tracing::{error, info, warn};
use uuid::Uuid;

use shared_models::{auth::User, error::AppError};

use crate::{
    CreateReminderRequest, FollowUpReminder, FollowUpReminderService, ReminderError, ReminderSettings,
    SnoozeRequest, UpdateStatusRequest, FOLLOW_UP_REMINDER_EVENT,
};

fn to_app_error(e: ReminderError) -> AppError {
    match e {
        ReminderError::ReminderNotFound(_) => AppError::NotFound(e.to_string()),
        ReminderError::ValidationError(_) | ReminderError::InvalidDate { .. } => {
            AppError::ValidationError(e.to_string())
        }
        _ => {
            error!("Follow-up reminder operation failed: {}", e);
            AppError::Internal("Operation failed".to_string())
        }
    }
}

/// Patients may only touch their own reminders; clinic staff see everyone's.
fn ensure_patient_access(user: &User, patient_id: &str) -> Result<(), AppError> {
    if user.has_role("patient") && user.id != patient_id {
        return Err(AppError::Forbidden("Access denied".to_string()));
    }
    Ok(())
}

async fn load_accessible(
    service: &FollowUpReminderService,
    user: &User,
    id: Uuid,
) -> Result<FollowUpReminder, AppError> {
    let reminder = service.get_reminder(id).await.map_err(to_app_error)?;
    ensure_patient_access(user, &reminder.patient_id)?;
    Ok(reminder)
}

/// Create a follow-up reminder and arm its notifications
pub async fn create_reminder(
    State(service): State<Arc<FollowUpReminderService>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateReminderRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    info!("Create follow-up reminder request from user: {}", user.id);
    ensure_patient_access(&user, &request.patient_id)?;

    let id = service.create_reminder(request).await.map_err(to_app_error)?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "id": id
        })),
    ))
}

/// Get one reminder
pub async fn get_reminder(
    State(service): State<Arc<FollowUpReminderService>>,
    Extension(user): Extension<User>,
    Path(id): Path<Uuid>,
) -> Result<Json<FollowUpReminder>, AppError> {
    let reminder = load_accessible(&service, &user, id).await?;
    Ok(Json(reminder))
}

/// List a patient's reminders in creation order
pub async fn get_patient_reminders(
    State(service): State<Arc<FollowUpReminderService>>,
    Extension(user): Extension<User>,
    Path(patient_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    ensure_patient_access(&user, &patient_id)?;
    let reminders = service.get_patient_reminders(&patient_id).await;

    Ok(Json(json!({
        "reminders": reminders,
        "total": reminders.len()
    })))
}

pub async fn get_upcoming_reminders(
    State(service): State<Arc<FollowUpReminderService>>,
    Extension(user): Extension<User>,
    Path(patient_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    ensure_patient_access(&user, &patient_id)?;
    let reminders = service.get_upcoming_reminders(&patient_id).await;

    Ok(Json(json!({
        "reminders": reminders,
        "total": reminders.len()
    })))
}

pub async fn get_overdue_reminders(
    State(service): State<Arc<FollowUpReminderService>>,
    Extension(user): Extension<User>,
    Path(patient_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    ensure_patient_access(&user, &patient_id)?;
    let reminders = service.get_overdue_reminders(&patient_id).await;

    Ok(Json(json!({
        "reminders": reminders,
        "total": reminders.len()
    })))
}

/// Update reminder status (e.g. mark the follow-up completed)
pub async fn update_reminder_status(
    State(service): State<Arc<FollowUpReminderService>>,
    Extension(user): Extension<User>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateStatusRequest>,
) -> Result<Json<FollowUpReminder>, AppError> {
    load_accessible(&service, &user, id).await?;
    info!("Status update for reminder {} to {} by user {}", id, request.status, user.id);

    let updated = service
        .update_reminder_status(id, request.status)
        .await
        .map_err(to_app_error)?;
    Ok(Json(updated))
}

/// Push the follow-up forward by a number of hours
pub async fn snooze_reminder(
    State(service): State<Arc<FollowUpReminderService>>,
    Extension(user): Extension<User>,
    Path(id): Path<Uuid>,
    Json(request): Json<SnoozeRequest>,
) -> Result<Json<FollowUpReminder>, AppError> {
    load_accessible(&service, &user, id).await?;

    let snoozed = service
        .snooze_reminder(id, request.hours)
        .await
        .map_err(to_app_error)?;
    Ok(Json(snoozed))
}

pub async fn update_reminder_settings(
    State(service): State<Arc<FollowUpReminderService>>,
    Extension(user): Extension<User>,
    Path(id): Path<Uuid>,
    Json(settings): Json<ReminderSettings>,
) -> Result<Json<FollowUpReminder>, AppError> {
    load_accessible(&service, &user, id).await?;

    let updated = service
        .update_reminder_settings(id, settings)
        .await
        .map_err(to_app_error)?;
    Ok(Json(updated))
}

pub async fn delete_reminder(
    State(service): State<Arc<FollowUpReminderService>>,
    Extension(user): Extension<User>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    load_accessible(&service, &user, id).await?;
    service.delete_reminder(id).await.map_err(to_app_error)?;

    Ok(Json(json!({
        "success": true,
        "id": id
    })))
}

/// Server-sent stream of fired reminders visible to the caller
pub async fn stream_reminder_events(
    State(service): State<Arc<FollowUpReminderService>>,
    Extension(user): Extension<User>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    info!("Reminder event stream opened by user: {}", user.id);
    let receiver = service.subscribe();

    let events = stream::unfold((receiver, user), |(mut receiver, user)| async move {
        loop {
            match receiver.recv().await {
                Ok(event) => {
                    if user.has_role("patient") && event.reminder.patient_id != user.id {
                        continue;
                    }
                    match serde_json::to_string(&event) {
                        Ok(data) => {
                            let sse = Event::default().event(FOLLOW_UP_REMINDER_EVENT).data(data);
                            return Some((Ok(sse), (receiver, user)));
                        }
                        Err(e) => warn!("Failed to serialize reminder event: {}", e),
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!("Reminder event stream lagged, skipped {} events", skipped);
                }
                Err(RecvError::Closed) => return None,
            }
        }
    });

    Sse::new(events).keep_alive(KeepAlive::default())
}
