//! Notification hub
//!
//! Business operations over the store, the token registry and the push
//! gateway. A notification is always persisted before any push is attempted,
//! and a failed push never removes it again.

use crate::clock::Clock;
use crate::enrich::{Directory, NotificationView};
use crate::error::HubError;
use crate::registry::TokenRegistry;
use crate::store::{NotificationStore, Page};
use chrono::{DateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use medpush_common::models::{NewNotification, Notification};
use medpush_common::services::{DeliveryError, DeliveryReport, PushGateway, PushMessage};
use medpush_db::{DirectoryRepository, NotificationRepository, PushTokenRepository};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Default number of older notifications per feed page.
pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// Result of storing and pushing one notification.
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dispatch {
    pub notification: Notification,
    pub delivery: DeliveryReport,
}

/// Result of a fan-out to a group of doctors.
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FanOut {
    pub created: u64,
    pub delivery: DeliveryReport,
}

/// A doctor's feed.
///
/// `unread_count` is the number of notifications that were unread before
/// this fetch marked them read; the records keep the state they were read with.
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feed {
    pub unread_count: u64,
    pub today_records: Vec<NotificationView>,
    pub recent_records: Page<NotificationView>,
}

/// Parses an IANA zone name, falling back to UTC.
pub fn parse_timezone(name: &str) -> Tz {
    name.parse().unwrap_or_else(|_| {
        warn!("Unknown feed timezone {:?}, using UTC", name);
        Tz::UTC
    })
}

/// The instant the calendar day containing `now` starts in `tz`.
pub(crate) fn start_of_day(now: DateTime<Utc>, tz: Tz) -> DateTime<Utc> {
    let midnight = now.with_timezone(&tz).date_naive().and_time(NaiveTime::MIN);
    match tz.from_local_datetime(&midnight).earliest() {
        Some(start) => start.with_timezone(&Utc),
        // Midnight skipped by a DST jump
        None => Utc.from_utc_datetime(&midnight),
    }
}

/// The push shown for a stored notification.
fn push_message(notification: &Notification) -> PushMessage {
    let message = PushMessage::new(&notification.kind, &notification.content)
        .with_data("notification_id", notification.id.to_string())
        .with_data("type", &notification.kind);

    match notification.type_id {
        Some(type_id) => message.with_data("type_id", type_id.to_string()),
        None => message,
    }
}

pub struct NotificationHub<P, N, D> {
    registry: Arc<TokenRegistry<P>>,
    store: NotificationStore<N>,
    directory: Directory<D>,
    gateway: Arc<dyn PushGateway>,
    clock: Arc<dyn Clock>,
    timezone: Tz,
    page_size: u32,
}

impl<P, N, D> NotificationHub<P, N, D>
where
    P: PushTokenRepository,
    N: NotificationRepository,
    D: DirectoryRepository,
{
    pub fn new(
        registry: Arc<TokenRegistry<P>>,
        store: NotificationStore<N>,
        directory: Directory<D>,
        gateway: Arc<dyn PushGateway>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            registry,
            store,
            directory,
            gateway,
            clock,
            timezone: Tz::UTC,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    /// Sets the zone whose calendar day splits "today" from older entries.
    pub fn with_timezone(mut self, timezone: Tz) -> Self {
        self.timezone = timezone;
        self
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn store(&self) -> &NotificationStore<N> {
        &self.store
    }

    /// Stores a notification for one doctor and pushes it to their devices
    ///
    /// Uses a single send when the doctor has exactly one token and a batch
    /// send otherwise. Tokens the gateway rejects are purged.
    ///
    /// # Errors
    ///
    /// * [`HubError::DeliveryUnavailable`] when the gateway or the token
    ///   lookup could not be used; the stored notification travels inside the
    ///   error
    /// * [`HubError::Storage`] when the database fails
    pub async fn create_and_notify(&self, fields: NewNotification) -> Result<Dispatch, HubError> {
        let notification = self.store.create(fields).await?;
        debug!(
            "Stored notification {} for doctor {}",
            notification.id, notification.doctor_id
        );

        let message = push_message(&notification);

        match self.notify_doctors(&[notification.doctor_id], &message).await {
            Ok(delivery) => Ok(Dispatch {
                notification,
                delivery,
            }),
            Err(reason) => Err(HubError::DeliveryUnavailable {
                notification: Box::new(notification),
                reason,
            }),
        }
    }

    /// Stores one notification per doctor in one write and pushes a single
    /// batch to all their tokens
    ///
    /// Duplicate doctor ids are collapsed.
    pub async fn fan_out_to_role_group(
        &self,
        doctor_ids: &[i64],
        kind: &str,
        content: &str,
        triggering_doctor_id: Option<i64>,
    ) -> Result<FanOut, HubError> {
        let recipients: Vec<i64> = doctor_ids
            .iter()
            .copied()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        if recipients.is_empty() {
            return Ok(FanOut {
                created: 0,
                delivery: DeliveryReport::default(),
            });
        }

        let rows = recipients
            .iter()
            .map(|&doctor_id| {
                NewNotification::new(doctor_id, kind, content).with_type_doctor(triggering_doctor_id)
            })
            .collect();
        let created = self.store.bulk_create(rows).await?;
        info!("Fanned out {:?} notification to {} doctors", kind, created);

        let message = PushMessage::new(kind, content).with_data("type", kind);

        match self.notify_doctors(&recipients, &message).await {
            Ok(delivery) => Ok(FanOut { created, delivery }),
            Err(reason) => Err(HubError::FanOutUnavailable { created, reason }),
        }
    }

    /// Builds a doctor's feed and marks all their notifications read
    ///
    /// `today_records` holds everything since the start of the current day,
    /// `recent_records` one page of everything before it.
    pub async fn get_feed(&self, doctor_id: i64, page: u32) -> Result<Feed, HubError> {
        let start_of_today = start_of_day(self.clock.now(), self.timezone);

        let today = self
            .store
            .for_doctor(doctor_id)
            .created_on_or_after(start_of_today)
            .all()
            .await?;
        let recent = self
            .store
            .for_doctor(doctor_id)
            .created_before(start_of_today)
            .paginate(page, self.page_size)
            .await?;

        let unread_count = self.store.mark_all_read(doctor_id).await?;

        let references = self
            .directory
            .load(today.iter().chain(recent.data.iter()))
            .await?;

        Ok(Feed {
            unread_count,
            today_records: today.into_iter().map(|n| references.view(n)).collect(),
            recent_records: recent.map(|n| references.view(n)),
        })
    }

    pub async fn unread_count(&self, doctor_id: i64) -> Result<u64, HubError> {
        Ok(self.store.count_unread(doctor_id).await?)
    }

    pub async fn mark_all_read(&self, doctor_id: i64) -> Result<u64, HubError> {
        let updated = self.store.mark_all_read(doctor_id).await?;
        debug!("Marked {} notifications of doctor {} read", updated, doctor_id);
        Ok(updated)
    }

    /// Marks one of the doctor's notifications read
    ///
    /// # Returns
    ///
    /// Whether it was unread before
    pub async fn mark_read(&self, doctor_id: i64, id: i64) -> Result<bool, HubError> {
        self.owned(doctor_id, id).await?;
        Ok(self.store.mark_read(id).await?)
    }

    /// Deletes one of the doctor's notifications
    pub async fn delete_notification(&self, doctor_id: i64, id: i64) -> Result<bool, HubError> {
        self.owned(doctor_id, id).await?;
        let deleted = self.store.delete(id).await?;
        if deleted {
            info!("Deleted notification {} of doctor {}", id, doctor_id);
        }
        Ok(deleted)
    }

    async fn owned(&self, doctor_id: i64, id: i64) -> Result<Notification, HubError> {
        let notification = self.store.find(id).await?.ok_or(HubError::NotFound(id))?;
        if notification.doctor_id != doctor_id {
            warn!(
                "Doctor {} tried to act on notification {} of doctor {}",
                doctor_id, id, notification.doctor_id
            );
            return Err(HubError::NotOwner { id, doctor_id });
        }
        Ok(notification)
    }

    /// Looks up the doctors' tokens and delivers `message` to them
    ///
    /// Runs after the records are stored, so a failed lookup is reported like
    /// an outage instead of failing the write.
    async fn notify_doctors(
        &self,
        doctor_ids: &[i64],
        message: &PushMessage,
    ) -> Result<DeliveryReport, String> {
        let tokens = match self.registry.tokens_for(doctor_ids).await {
            Ok(tokens) => tokens,
            Err(e) => {
                error!("Failed to look up push tokens: {}", e);
                return Err(format!("push token lookup failed: {}", e));
            }
        };
        self.deliver(&tokens, message).await
    }

    /// Pushes `message` to `tokens` and purges the tokens the gateway rejects
    ///
    /// Returns the outage reason when nothing could be sent at all.
    async fn deliver(&self, tokens: &[String], message: &PushMessage) -> Result<DeliveryReport, String> {
        let outcome = match tokens {
            [] => {
                debug!("No push tokens registered, skipping delivery");
                return Ok(DeliveryReport::default());
            }
            [token] => self
                .gateway
                .send_single(token, message)
                .await
                .map(|()| DeliveryReport {
                    sent_count: 1,
                    ..DeliveryReport::default()
                }),
            _ => self.gateway.send_batch(tokens, message).await,
        };

        let report = match outcome {
            Ok(report) => report,
            Err(DeliveryError::InvalidToken(token)) => DeliveryReport {
                failed_tokens: vec![token],
                ..DeliveryReport::default()
            },
            Err(DeliveryError::Unavailable(reason)) => {
                warn!("Push delivery unavailable: {}", reason);
                return Err(reason);
            }
        };

        // A failed purge is retried the next time the token is rejected
        if let Err(e) = self.registry.purge_invalid(&report.failed_tokens).await {
            error!("Failed to purge invalid push tokens: {}", e);
        }

        Ok(report)
    }
}
