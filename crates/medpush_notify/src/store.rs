//! Notification store
//!
//! CRUD over a doctor's notifications plus the time-window queries the feed
//! is built from.

use crate::clock::Clock;
use chrono::{DateTime, Utc};
use medpush_common::models::{NewNotification, Notification};
use medpush_db::{DbError, NotificationQuery, NotificationRepository};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// One page of an ordered result set.
///
/// `from`/`to` are the 1-based positions of the first and last item on the
/// page, absent when the page is empty.
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub current_page: u32,
    pub per_page: u32,
    pub total: u64,
    pub last_page: u32,
    pub from: Option<u64>,
    pub to: Option<u64>,
}

impl<T> Page<T> {
    fn new(data: Vec<T>, current_page: u32, per_page: u32, total: u64) -> Self {
        let last_page = total.div_ceil(u64::from(per_page)).max(1);
        let offset = u64::from(current_page - 1) * u64::from(per_page);
        let (from, to) = if data.is_empty() {
            (None, None)
        } else {
            (Some(offset + 1), Some(offset + data.len() as u64))
        };

        Self {
            data,
            current_page,
            per_page,
            total,
            last_page: u32::try_from(last_page).unwrap_or(u32::MAX),
            from,
            to,
        }
    }

    /// Transforms every item, keeping the page metadata.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            data: self.data.into_iter().map(f).collect(),
            current_page: self.current_page,
            per_page: self.per_page,
            total: self.total,
            last_page: self.last_page,
            from: self.from,
            to: self.to,
        }
    }
}

pub struct NotificationStore<N> {
    repo: N,
    clock: Arc<dyn Clock>,
}

impl<N: NotificationRepository> NotificationStore<N> {
    pub fn new(repo: N, clock: Arc<dyn Clock>) -> Self {
        Self { repo, clock }
    }

    /// Stores one unread notification stamped with the current time
    pub async fn create(&self, fields: NewNotification) -> Result<Notification, DbError> {
        self.repo.create(fields, self.clock.now()).await
    }

    /// Stores many notifications in one transaction
    ///
    /// # Returns
    ///
    /// The number of rows written
    pub async fn bulk_create(&self, rows: Vec<NewNotification>) -> Result<u64, DbError> {
        self.repo.bulk_create(rows, self.clock.now()).await
    }

    pub async fn find(&self, id: i64) -> Result<Option<Notification>, DbError> {
        self.repo.find(id).await
    }

    /// Starts a query over one doctor's notifications
    pub fn for_doctor(&self, doctor_id: i64) -> DoctorNotifications<'_, N> {
        DoctorNotifications {
            repo: &self.repo,
            query: NotificationQuery::for_doctor(doctor_id),
        }
    }

    pub async fn count_unread(&self, doctor_id: i64) -> Result<u64, DbError> {
        self.repo.count_unread(doctor_id).await
    }

    pub async fn mark_read(&self, id: i64) -> Result<bool, DbError> {
        self.repo.mark_read(id).await
    }

    /// Marks every unread notification of the doctor read
    ///
    /// # Returns
    ///
    /// How many were unread before the call
    pub async fn mark_all_read(&self, doctor_id: i64) -> Result<u64, DbError> {
        self.repo.mark_all_read(doctor_id).await
    }

    pub async fn delete(&self, id: i64) -> Result<bool, DbError> {
        self.repo.delete(id).await
    }
}

/// A query over one doctor's notifications, newest first.
pub struct DoctorNotifications<'a, N> {
    repo: &'a N,
    query: NotificationQuery,
}

impl<N: NotificationRepository> DoctorNotifications<'_, N> {
    pub fn created_before(mut self, at: DateTime<Utc>) -> Self {
        self.query.created_before = Some(at);
        self
    }

    pub fn created_on_or_after(mut self, at: DateTime<Utc>) -> Self {
        self.query.created_on_or_after = Some(at);
        self
    }

    pub async fn all(&self) -> Result<Vec<Notification>, DbError> {
        self.repo.list(&self.query, None, 0).await
    }

    pub async fn count(&self) -> Result<u64, DbError> {
        self.repo.count(&self.query).await
    }

    /// Fetches one page; pages are 1-based and anything below 1 means 1
    pub async fn paginate(&self, page: u32, per_page: u32) -> Result<Page<Notification>, DbError> {
        let page = page.max(1);
        let per_page = per_page.max(1);

        let total = self.repo.count(&self.query).await?;
        let offset = u64::from(page - 1) * u64::from(per_page);
        let data = if offset < total {
            self.repo.list(&self.query, Some(per_page), offset).await?
        } else {
            Vec::new()
        };

        debug!(
            "Paginated notifications of doctor {}: page {} holds {} of {}",
            self.query.doctor_id,
            page,
            data.len(),
            total
        );
        Ok(Page::new(data, page, per_page, total))
    }
}
