// --- File: crates/medpush_notify/src/doc.rs ---
use utoipa::OpenApi;

use crate::enrich::{DoctorSummary, NotificationView, PatientSummary, SectionStatus};
use crate::handlers::{
    BroadcastRequest, BroadcastResponse, CreateNotificationRequest, CreateNotificationResponse,
    FanOutRequest, FanOutResponse, HealthResponse, MarkAllReadResponse, RegisterTokenResponse,
    RemoveTokenRequest, RemoveTokenResponse, UnreadCountResponse,
};
use crate::hub::{Dispatch, FanOut, Feed};
use crate::registry::RegisterToken;
use medpush_common::models::Notification;
use medpush_common::services::DeliveryReport;

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::register_token_handler,
        crate::handlers::remove_token_handler,
        crate::handlers::get_feed_handler,
        crate::handlers::unread_count_handler,
        crate::handlers::mark_all_read_handler,
        crate::handlers::mark_read_handler,
        crate::handlers::delete_notification_handler,
        crate::handlers::create_notification_handler,
        crate::handlers::fan_out_handler,
        crate::handlers::broadcast_handler,
        crate::handlers::health_handler,
    ),
    components(
        schemas(
            RegisterToken,
            RegisterTokenResponse,
            RemoveTokenRequest,
            RemoveTokenResponse,
            Feed,
            NotificationView,
            PatientSummary,
            DoctorSummary,
            SectionStatus,
            Notification,
            UnreadCountResponse,
            MarkAllReadResponse,
            CreateNotificationRequest,
            CreateNotificationResponse,
            FanOutRequest,
            FanOutResponse,
            Dispatch,
            FanOut,
            DeliveryReport,
            BroadcastRequest,
            BroadcastResponse,
            HealthResponse,
        )
    ),
    tags(
        (name = "Push tokens", description = "Device token registration"),
        (name = "Notifications", description = "Notification feed and delivery"),
        (name = "Admin", description = "Broadcast to every registered device"),
        (name = "Health", description = "Service health")
    )
)]
pub struct NotifyApiDoc;
