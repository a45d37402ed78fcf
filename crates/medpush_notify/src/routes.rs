use axum::{
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use tracing::info;

use crate::handlers::{
    broadcast_handler, create_notification_handler, delete_notification_handler,
    fan_out_handler, get_feed_handler, health_handler, mark_all_read_handler, mark_read_handler,
    register_token_handler, remove_token_handler, unread_count_handler, NotifyState,
};

/// Create the notification routes
///
/// Paths are relative; the backend nests them under `/api`.
///
/// # Arguments
///
/// * `state` - The wired registry, hub, broadcaster and database client
///
/// # Returns
///
/// An Axum router with the push token, feed, notification and broadcast endpoints
pub fn routes(state: Arc<NotifyState>) -> Router {
    info!("Notification routes initialized");

    Router::new()
        .route(
            "/doctors/{doctor_id}/push-tokens",
            post(register_token_handler).delete(remove_token_handler),
        )
        .route("/doctors/{doctor_id}/notifications", get(get_feed_handler))
        .route(
            "/doctors/{doctor_id}/notifications/unread-count",
            get(unread_count_handler),
        )
        .route(
            "/doctors/{doctor_id}/notifications/read-all",
            post(mark_all_read_handler),
        )
        .route(
            "/doctors/{doctor_id}/notifications/{id}/read",
            post(mark_read_handler),
        )
        .route(
            "/doctors/{doctor_id}/notifications/{id}",
            delete(delete_notification_handler),
        )
        .route("/notifications", post(create_notification_handler))
        .route("/notifications/fan-out", post(fan_out_handler))
        .route("/admin/broadcast", post(broadcast_handler))
        .route("/health", get(health_handler))
        .with_state(state)
}
