//! Repository for notification records

use crate::error::DbError;
use chrono::{DateTime, Utc};
use std::future::Future;

pub use medpush_common::models::{NewNotification, Notification};

/// Filter over one doctor's notifications.
///
/// Results are always ordered by `created_at` descending, newest id first on ties.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationQuery {
    pub doctor_id: i64,
    /// Exclusive upper bound on `created_at`.
    pub created_before: Option<DateTime<Utc>>,
    /// Inclusive lower bound on `created_at`.
    pub created_on_or_after: Option<DateTime<Utc>>,
}

impl NotificationQuery {
    pub fn for_doctor(doctor_id: i64) -> Self {
        Self {
            doctor_id,
            created_before: None,
            created_on_or_after: None,
        }
    }
}

/// Repository for notification records
pub trait NotificationRepository: Send + Sync {
    /// Create the `notifications` table if it doesn't exist
    fn init_schema(&self) -> impl Future<Output = Result<(), DbError>> + Send;

    /// Store one notification, unread
    fn create(
        &self,
        notification: NewNotification,
        created_at: DateTime<Utc>,
    ) -> impl Future<Output = Result<Notification, DbError>> + Send;

    /// Store many notifications in one transaction
    ///
    /// # Returns
    ///
    /// The number of inserted rows
    fn bulk_create(
        &self,
        notifications: Vec<NewNotification>,
        created_at: DateTime<Utc>,
    ) -> impl Future<Output = Result<u64, DbError>> + Send;

    fn find(&self, id: i64) -> impl Future<Output = Result<Option<Notification>, DbError>> + Send;

    /// Notifications matching `query`, newest first, optionally limited
    fn list(
        &self,
        query: &NotificationQuery,
        limit: Option<u32>,
        offset: u64,
    ) -> impl Future<Output = Result<Vec<Notification>, DbError>> + Send;

    /// Number of notifications matching `query`
    fn count(&self, query: &NotificationQuery)
        -> impl Future<Output = Result<u64, DbError>> + Send;

    fn count_unread(&self, doctor_id: i64) -> impl Future<Output = Result<u64, DbError>> + Send;

    /// Mark one notification read
    ///
    /// # Returns
    ///
    /// `true` if the row changed from unread to read
    fn mark_read(&self, id: i64) -> impl Future<Output = Result<bool, DbError>> + Send;

    /// Mark every unread notification of a doctor read in one statement
    ///
    /// # Returns
    ///
    /// The number of rows that were unread before the call
    fn mark_all_read(&self, doctor_id: i64) -> impl Future<Output = Result<u64, DbError>> + Send;

    /// # Returns
    ///
    /// `true` if a row was deleted
    fn delete(&self, id: i64) -> impl Future<Output = Result<bool, DbError>> + Send;
}
