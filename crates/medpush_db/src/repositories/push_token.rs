//! Repository for device push tokens
//!
//! This module defines the storage interface for the push tokens registered
//! by doctors' devices.

use crate::error::DbError;
use chrono::{DateTime, Utc};
use std::future::Future;

pub use medpush_common::models::PushToken;

/// A registration to insert or refresh.
///
/// With a `device_id` the row is keyed by `(doctor_id, device_id)`, without
/// one it is keyed by the token string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenUpsert {
    pub doctor_id: i64,
    pub token: String,
    pub device_id: Option<String>,
    pub device_type: Option<String>,
    pub app_version: Option<String>,
    /// Becomes `updated_at`, and `created_at` for new rows.
    pub at: DateTime<Utc>,
}

/// Repository for device push tokens
pub trait PushTokenRepository: Send + Sync {
    /// Create the `push_tokens` table and its unique indexes if they don't exist
    fn init_schema(&self) -> impl Future<Output = Result<(), DbError>> + Send;

    /// Insert a token or update the row with the same uniqueness key
    ///
    /// Rows of other doctors holding the same token string are deleted in the
    /// same transaction. The write itself is a single statement, so two
    /// concurrent registrations for the same key never produce two rows.
    ///
    /// # Returns
    ///
    /// The stored row after the write
    fn upsert(&self, upsert: TokenUpsert)
        -> impl Future<Output = Result<PushToken, DbError>> + Send;

    /// Delete a doctor's tokens beyond the `max` most recently updated ones
    ///
    /// # Returns
    ///
    /// The number of evicted rows
    fn enforce_limit(
        &self,
        doctor_id: i64,
        max: u32,
    ) -> impl Future<Output = Result<u64, DbError>> + Send;

    /// All tokens of one doctor, most recently updated first
    fn find_by_doctor(
        &self,
        doctor_id: i64,
    ) -> impl Future<Output = Result<Vec<PushToken>, DbError>> + Send;

    /// Distinct token strings registered by any of the given doctors
    fn tokens_for(
        &self,
        doctor_ids: &[i64],
    ) -> impl Future<Output = Result<Vec<String>, DbError>> + Send;

    /// Every distinct token string
    fn all_tokens(&self) -> impl Future<Output = Result<Vec<String>, DbError>> + Send;

    /// Delete a doctor's tokens matching the token and/or device id
    ///
    /// At least one selector is required; when both are given both must match.
    fn remove(
        &self,
        doctor_id: i64,
        token: Option<&str>,
        device_id: Option<&str>,
    ) -> impl Future<Output = Result<u64, DbError>> + Send;

    /// Delete tokens created before `cutoff`
    fn purge_created_before(
        &self,
        cutoff: DateTime<Utc>,
    ) -> impl Future<Output = Result<u64, DbError>> + Send;

    /// Delete every row holding one of the given token strings
    fn purge_tokens(&self, tokens: &[String])
        -> impl Future<Output = Result<u64, DbError>> + Send;
}
