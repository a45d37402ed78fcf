// --- File: crates/medpush_notify/src/handlers.rs ---
//! HTTP handlers for push tokens, the notification feed and broadcasts
//!
//! There is no ambient "current doctor": the acting doctor is always the
//! `doctor_id` path segment.

use axum::{
    extract::{Json, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::Duration;
use medpush_common::models::Notification;
use medpush_common::services::{DeliveryReport, PushGateway};
use medpush_common::MedpushError;
use medpush_config::AppConfig;
use medpush_db::{
    DbClient, RepositoryFactory, SqlDirectoryRepository, SqlNotificationRepository,
    SqlPushTokenRepository, SqlRepositoryFactory,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, info};

use crate::broadcast::BroadcastCoordinator;
use crate::clock::Clock;
use crate::enrich::Directory;
use crate::error::{BroadcastError, HubError, TokenError};
use crate::hub::{parse_timezone, Feed, NotificationHub};
use crate::registry::{RegisterToken, TokenRegistry};
use crate::store::NotificationStore;

pub type SqlTokenRegistry = TokenRegistry<SqlPushTokenRepository>;
pub type SqlNotificationHub =
    NotificationHub<SqlPushTokenRepository, SqlNotificationRepository, SqlDirectoryRepository>;
pub type SqlBroadcastCoordinator = BroadcastCoordinator<SqlPushTokenRepository>;

/// Shared state for the notification handlers
#[derive(Clone)]
pub struct NotifyState {
    pub registry: Arc<SqlTokenRegistry>,
    pub hub: Arc<SqlNotificationHub>,
    pub broadcaster: Arc<SqlBroadcastCoordinator>,
    pub db: DbClient,
}

impl NotifyState {
    /// Wires the SQL repositories, the gateway and the clock together
    pub fn new(
        config: &AppConfig,
        db: DbClient,
        gateway: Arc<dyn PushGateway>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let factory = SqlRepositoryFactory::new();

        let token_repo: SqlPushTokenRepository = factory.create_repository(db.clone());
        let notification_repo: SqlNotificationRepository = factory.create_repository(db.clone());
        let directory_repo: SqlDirectoryRepository = factory.create_repository(db.clone());

        let registry = Arc::new(TokenRegistry::new(
            token_repo,
            clock.clone(),
            config.push.max_tokens_per_doctor,
        ));

        let hub = NotificationHub::new(
            registry.clone(),
            NotificationStore::new(notification_repo, clock.clone()),
            Directory::new(directory_repo),
            gateway.clone(),
            clock,
        )
        .with_timezone(parse_timezone(&config.feed.timezone))
        .with_page_size(config.feed.page_size);

        let broadcaster = BroadcastCoordinator::new(registry.clone(), gateway)
            .with_batch_size(config.push.batch_size);

        Self {
            registry,
            hub: Arc::new(hub),
            broadcaster: Arc::new(broadcaster),
            db,
        }
    }

    /// How old a token may get before the retention sweep removes it
    pub fn stale_after(config: &AppConfig) -> Duration {
        Duration::days(config.push.stale_after_days)
    }
}

fn error_response(err: impl Into<MedpushError>) -> Response {
    err.into().into_response()
}

/// Response body for token registration
///
/// Registration always answers 200; malformed input only flips `ok`.
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterTokenResponse {
    pub ok: bool,
    pub message: String,
}

#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Debug, Deserialize)]
pub struct RemoveTokenRequest {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub device_id: Option<String>,
}

#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Debug, Serialize, Deserialize)]
pub struct RemoveTokenResponse {
    pub removed: u64,
}

#[cfg_attr(
    feature = "openapi",
    derive(utoipa::IntoParams),
    into_params(parameter_in = Query)
)]
#[derive(Debug, Deserialize)]
pub struct FeedQuery {
    /// 1-based page of older notifications
    pub page: Option<u32>,
}

#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Debug, Serialize, Deserialize)]
pub struct UnreadCountResponse {
    pub unread_count: u64,
}

#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Debug, Serialize, Deserialize)]
pub struct MarkAllReadResponse {
    pub updated_count: u64,
}

#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Debug, Deserialize)]
pub struct CreateNotificationRequest {
    pub recipient_doctor_id: i64,
    #[serde(rename = "type")]
    pub kind: String,
    pub content: String,
    #[serde(default)]
    pub type_id: Option<i64>,
    #[serde(default)]
    pub patient_id: Option<i64>,
    #[serde(default)]
    pub triggering_doctor_id: Option<i64>,
}

/// Response body for a created notification
///
/// The notification is stored even when push delivery was unavailable; in
/// that case `delivery` is absent and `delivery_error` says why.
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Debug, Serialize, Deserialize)]
pub struct CreateNotificationResponse {
    pub notification: Notification,
    pub delivery: Option<DeliveryReport>,
    pub delivery_error: Option<String>,
}

#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Debug, Deserialize)]
pub struct FanOutRequest {
    pub doctor_ids: Vec<i64>,
    #[serde(rename = "type")]
    pub kind: String,
    pub content: String,
    #[serde(default)]
    pub triggering_doctor_id: Option<i64>,
}

#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Debug, Serialize, Deserialize)]
pub struct FanOutResponse {
    pub created: u64,
    pub delivery: Option<DeliveryReport>,
    pub delivery_error: Option<String>,
}

#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Debug, Deserialize)]
pub struct BroadcastRequest {
    pub title: String,
    pub body: String,
}

#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Debug, Serialize, Deserialize)]
pub struct BroadcastResponse {
    pub sent_count: usize,
    pub failed_count: usize,
    pub error: Option<String>,
}

#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub database: String,
}

/// Registers or refreshes a device token
#[axum::debug_handler]
#[cfg_attr(feature = "openapi", utoipa::path(
    post,
    path = "/doctors/{doctor_id}/push-tokens",
    params(("doctor_id" = i64, Path, description = "Doctor owning the device")),
    request_body = RegisterToken,
    responses(
        (status = 200, description = "Registration outcome", body = RegisterTokenResponse),
        (status = 500, description = "Internal Server Error")
    ),
    tag = "Push tokens"
))]
pub async fn register_token_handler(
    State(state): State<Arc<NotifyState>>,
    Path(doctor_id): Path<i64>,
    Json(payload): Json<RegisterToken>,
) -> Response {
    match state.registry.register(doctor_id, payload).await {
        Ok(_) => Json(RegisterTokenResponse {
            ok: true,
            message: "Push token registered".to_string(),
        })
        .into_response(),
        Err(err) if err.is_rejection() => Json(RegisterTokenResponse {
            ok: false,
            message: err.to_string(),
        })
        .into_response(),
        Err(err) => {
            error!("Failed to register push token: {}", err);
            error_response(err)
        }
    }
}

/// Removes device tokens by token and/or device id
#[axum::debug_handler]
#[cfg_attr(feature = "openapi", utoipa::path(
    delete,
    path = "/doctors/{doctor_id}/push-tokens",
    params(("doctor_id" = i64, Path, description = "Doctor owning the device")),
    request_body = RemoveTokenRequest,
    responses(
        (status = 200, description = "Tokens removed", body = RemoveTokenResponse),
        (status = 400, description = "Neither token nor device_id given")
    ),
    tag = "Push tokens"
))]
pub async fn remove_token_handler(
    State(state): State<Arc<NotifyState>>,
    Path(doctor_id): Path<i64>,
    Json(payload): Json<RemoveTokenRequest>,
) -> Response {
    match state
        .registry
        .remove(
            doctor_id,
            payload.token.as_deref(),
            payload.device_id.as_deref(),
        )
        .await
    {
        Ok(removed) => Json(RemoveTokenResponse { removed }).into_response(),
        Err(err @ TokenError::Storage(_)) => {
            error!("Failed to remove push token: {}", err);
            error_response(err)
        }
        Err(err) => error_response(err),
    }
}

/// Returns the feed and marks every unread notification read
#[axum::debug_handler]
#[cfg_attr(feature = "openapi", utoipa::path(
    get,
    path = "/doctors/{doctor_id}/notifications",
    params(
        ("doctor_id" = i64, Path, description = "Doctor whose feed to show"),
        FeedQuery
    ),
    responses(
        (status = 200, description = "Today's notifications and a page of older ones", body = Feed)
    ),
    tag = "Notifications"
))]
pub async fn get_feed_handler(
    State(state): State<Arc<NotifyState>>,
    Path(doctor_id): Path<i64>,
    Query(query): Query<FeedQuery>,
) -> Result<Json<Feed>, MedpushError> {
    debug!("Fetching feed of doctor {} page {:?}", doctor_id, query.page);
    let feed = state
        .hub
        .get_feed(doctor_id, query.page.unwrap_or(1))
        .await?;
    Ok(Json(feed))
}

#[axum::debug_handler]
#[cfg_attr(feature = "openapi", utoipa::path(
    get,
    path = "/doctors/{doctor_id}/notifications/unread-count",
    params(("doctor_id" = i64, Path, description = "Doctor")),
    responses((status = 200, description = "Unread notifications", body = UnreadCountResponse)),
    tag = "Notifications"
))]
pub async fn unread_count_handler(
    State(state): State<Arc<NotifyState>>,
    Path(doctor_id): Path<i64>,
) -> Result<Json<UnreadCountResponse>, MedpushError> {
    let unread_count = state.hub.unread_count(doctor_id).await?;
    Ok(Json(UnreadCountResponse { unread_count }))
}

#[axum::debug_handler]
#[cfg_attr(feature = "openapi", utoipa::path(
    post,
    path = "/doctors/{doctor_id}/notifications/read-all",
    params(("doctor_id" = i64, Path, description = "Doctor")),
    responses((status = 200, description = "Notifications marked read", body = MarkAllReadResponse)),
    tag = "Notifications"
))]
pub async fn mark_all_read_handler(
    State(state): State<Arc<NotifyState>>,
    Path(doctor_id): Path<i64>,
) -> Result<Json<MarkAllReadResponse>, MedpushError> {
    let updated_count = state.hub.mark_all_read(doctor_id).await?;
    Ok(Json(MarkAllReadResponse { updated_count }))
}

#[axum::debug_handler]
#[cfg_attr(feature = "openapi", utoipa::path(
    post,
    path = "/doctors/{doctor_id}/notifications/{id}/read",
    params(
        ("doctor_id" = i64, Path, description = "Doctor"),
        ("id" = i64, Path, description = "Notification")
    ),
    responses(
        (status = 204, description = "Marked read"),
        (status = 403, description = "Notification belongs to another doctor"),
        (status = 404, description = "No such notification")
    ),
    tag = "Notifications"
))]
pub async fn mark_read_handler(
    State(state): State<Arc<NotifyState>>,
    Path((doctor_id, id)): Path<(i64, i64)>,
) -> Result<StatusCode, MedpushError> {
    state.hub.mark_read(doctor_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[axum::debug_handler]
#[cfg_attr(feature = "openapi", utoipa::path(
    delete,
    path = "/doctors/{doctor_id}/notifications/{id}",
    params(
        ("doctor_id" = i64, Path, description = "Doctor"),
        ("id" = i64, Path, description = "Notification")
    ),
    responses(
        (status = 204, description = "Deleted"),
        (status = 403, description = "Notification belongs to another doctor"),
        (status = 404, description = "No such notification")
    ),
    tag = "Notifications"
))]
pub async fn delete_notification_handler(
    State(state): State<Arc<NotifyState>>,
    Path((doctor_id, id)): Path<(i64, i64)>,
) -> Result<StatusCode, MedpushError> {
    state.hub.delete_notification(doctor_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Stores a notification for one doctor and pushes it
#[axum::debug_handler]
#[cfg_attr(feature = "openapi", utoipa::path(
    post,
    path = "/notifications",
    request_body = CreateNotificationRequest,
    responses(
        (status = 201, description = "Notification stored", body = CreateNotificationResponse),
        (status = 500, description = "Internal Server Error")
    ),
    tag = "Notifications"
))]
pub async fn create_notification_handler(
    State(state): State<Arc<NotifyState>>,
    Json(payload): Json<CreateNotificationRequest>,
) -> Response {
    let fields = medpush_common::models::NewNotification::new(
        payload.recipient_doctor_id,
        payload.kind,
        payload.content,
    )
    .with_type_id(payload.type_id)
    .with_patient(payload.patient_id)
    .with_type_doctor(payload.triggering_doctor_id);

    let body = match state.hub.create_and_notify(fields).await {
        Ok(dispatch) => CreateNotificationResponse {
            notification: dispatch.notification,
            delivery: Some(dispatch.delivery),
            delivery_error: None,
        },
        Err(HubError::DeliveryUnavailable {
            notification,
            reason,
        }) => CreateNotificationResponse {
            notification: *notification,
            delivery: None,
            delivery_error: Some(reason),
        },
        Err(err) => {
            error!("Failed to create notification: {}", err);
            return error_response(err);
        }
    };

    (StatusCode::CREATED, Json(body)).into_response()
}

/// Stores one notification per doctor and pushes them in one batch
#[axum::debug_handler]
#[cfg_attr(feature = "openapi", utoipa::path(
    post,
    path = "/notifications/fan-out",
    request_body = FanOutRequest,
    responses(
        (status = 201, description = "Notifications stored", body = FanOutResponse),
        (status = 500, description = "Internal Server Error")
    ),
    tag = "Notifications"
))]
pub async fn fan_out_handler(
    State(state): State<Arc<NotifyState>>,
    Json(payload): Json<FanOutRequest>,
) -> Response {
    let outcome = state
        .hub
        .fan_out_to_role_group(
            &payload.doctor_ids,
            &payload.kind,
            &payload.content,
            payload.triggering_doctor_id,
        )
        .await;

    let body = match outcome {
        Ok(fan_out) => FanOutResponse {
            created: fan_out.created,
            delivery: Some(fan_out.delivery),
            delivery_error: None,
        },
        Err(HubError::FanOutUnavailable { created, reason }) => FanOutResponse {
            created,
            delivery: None,
            delivery_error: Some(reason),
        },
        Err(err) => {
            error!("Failed to fan out notification: {}", err);
            return error_response(err);
        }
    };

    (StatusCode::CREATED, Json(body)).into_response()
}

/// Sends one message to every registered device
#[axum::debug_handler]
#[cfg_attr(feature = "openapi", utoipa::path(
    post,
    path = "/admin/broadcast",
    request_body = BroadcastRequest,
    responses(
        (status = 200, description = "Broadcast delivered", body = BroadcastResponse),
        (status = 400, description = "Title and body exceed the push payload limit"),
        (status = 502, description = "Push gateway unavailable; counts cover the part sent", body = BroadcastResponse)
    ),
    tag = "Admin"
))]
pub async fn broadcast_handler(
    State(state): State<Arc<NotifyState>>,
    Json(payload): Json<BroadcastRequest>,
) -> Response {
    match state
        .broadcaster
        .broadcast_all(&payload.title, &payload.body)
        .await
    {
        Ok(report) => {
            info!("Broadcast {:?} reached {} devices", payload.title, report.sent_count);
            Json(BroadcastResponse {
                sent_count: report.sent_count,
                failed_count: report.failed_count(),
                error: None,
            })
            .into_response()
        }
        Err(BroadcastError::GatewayUnavailable { partial, reason }) => (
            StatusCode::BAD_GATEWAY,
            Json(BroadcastResponse {
                sent_count: partial.sent_count,
                failed_count: partial.failed_count(),
                error: Some(reason),
            }),
        )
            .into_response(),
        Err(err) => {
            error!("Broadcast failed: {}", err);
            error_response(err)
        }
    }
}

#[axum::debug_handler]
#[cfg_attr(feature = "openapi", utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service is up", body = HealthResponse)),
    tag = "Health"
))]
pub async fn health_handler(State(state): State<Arc<NotifyState>>) -> Json<HealthResponse> {
    let database = if state.db.is_healthy().await {
        "ok"
    } else {
        "unavailable"
    };

    Json(HealthResponse {
        status: "ok".to_string(),
        database: database.to_string(),
    })
}
