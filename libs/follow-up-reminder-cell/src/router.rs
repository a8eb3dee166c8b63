use std::sync::Arc;
use axum::{
    Router,
    routing::{get, post, put},
    middleware,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::FollowUpReminderService;
use crate::handlers;

pub fn create_follow_up_reminder_router(
    config: Arc<AppConfig>,
    service: Arc<FollowUpReminderService>,
) -> Router {
    let protected_routes = Router::new()
        .route("/", post(handlers::create_reminder))
        .route("/events", get(handlers::stream_reminder_events))
        .route("/patients/{patient_id}", get(handlers::get_patient_reminders))
        .route("/patients/{patient_id}/upcoming", get(handlers::get_upcoming_reminders))
        .route("/patients/{patient_id}/overdue", get(handlers::get_overdue_reminders))
        .route("/{id}", get(handlers::get_reminder).delete(handlers::delete_reminder))
        .route("/{id}/status", put(handlers::update_reminder_status))
        .route("/{id}/snooze", post(handlers::snooze_reminder))
        .route("/{id}/settings", put(handlers::update_reminder_settings))
        .layer(middleware::from_fn_with_state(config, auth_middleware));

    Router::new()
        .merge(protected_routes)
        .with_state(service)
}
