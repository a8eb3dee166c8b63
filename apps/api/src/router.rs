use std::sync::Arc;

use axum::{
    Router,
    routing::get,
};

use follow_up_reminder_cell::{create_follow_up_reminder_router, FollowUpReminderService};
use shared_config::AppConfig;

pub fn create_router(state: Arc<AppConfig>, reminders: Arc<FollowUpReminderService>) -> Router {
    Router::new()
        .route("/", get(|| async { "Follow-up reminder API is running!" }))
        .nest("/follow-up-reminders", create_follow_up_reminder_router(state, reminders))
}
