//! Push token registry
//!
//! Single source of truth for which devices of a doctor can receive pushes.
//! Registration validates client input, upserts by the token's uniqueness key
//! and then trims the doctor's tokens to the configured cap, keeping the most
//! recently registered ones.

use crate::clock::Clock;
use crate::error::TokenError;
use chrono::Duration;
use medpush_common::models::PushToken;
use medpush_db::{DbError, PushTokenRepository, TokenUpsert};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

const DEVICE_ID_LEN: std::ops::RangeInclusive<usize> = 10..=50;

/// A device registration as sent by the app.
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegisterToken {
    pub token: String,
    #[serde(default)]
    pub device_id: Option<String>,
    #[serde(default)]
    pub device_type: Option<String>,
    #[serde(default)]
    pub app_version: Option<String>,
}

impl RegisterToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            ..Self::default()
        }
    }

    pub fn with_device(mut self, device_id: impl Into<String>) -> Self {
        self.device_id = Some(device_id.into());
        self
    }

    pub fn with_platform(
        mut self,
        device_type: impl Into<String>,
        app_version: impl Into<String>,
    ) -> Self {
        self.device_type = Some(device_type.into());
        self.app_version = Some(app_version.into());
        self
    }
}

fn is_valid_token(token: &str) -> bool {
    !token.is_empty()
        && token
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, ':' | '_' | '-'))
}

fn is_valid_device_id(device_id: &str) -> bool {
    DEVICE_ID_LEN.contains(&device_id.len())
        && device_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-'))
}

/// Blank optional fields count as absent.
fn present(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

pub struct TokenRegistry<R> {
    repo: R,
    clock: Arc<dyn Clock>,
    max_tokens: u32,
}

impl<R: PushTokenRepository> TokenRegistry<R> {
    pub fn new(repo: R, clock: Arc<dyn Clock>, max_tokens: u32) -> Self {
        Self {
            repo,
            clock,
            max_tokens: max_tokens.max(1),
        }
    }

    /// Registers or refreshes a device token for a doctor
    ///
    /// # Returns
    ///
    /// The stored token row. Repeating the same call only moves `updated_at`.
    ///
    /// # Errors
    ///
    /// * [`TokenError::InvalidTokenFormat`] / [`TokenError::InvalidDeviceIdFormat`]
    ///   when the input is malformed; nothing is written
    /// * [`TokenError::Storage`] when the database fails
    pub async fn register(
        &self,
        doctor_id: i64,
        request: RegisterToken,
    ) -> Result<PushToken, TokenError> {
        if !is_valid_token(&request.token) {
            warn!("Rejected push token registration for doctor {}: invalid token", doctor_id);
            return Err(TokenError::InvalidTokenFormat);
        }

        let device_id = present(request.device_id);
        if let Some(device_id) = &device_id {
            if !is_valid_device_id(device_id) {
                warn!(
                    "Rejected push token registration for doctor {}: invalid device id {:?}",
                    doctor_id, device_id
                );
                return Err(TokenError::InvalidDeviceIdFormat);
            }
        }

        let upsert = TokenUpsert {
            doctor_id,
            token: request.token,
            device_id,
            device_type: present(request.device_type).map(|t| t.to_lowercase()),
            app_version: present(request.app_version),
            at: self.clock.now(),
        };

        let stored = self.repo.upsert(upsert).await?;
        self.enforce_limit(doctor_id).await?;

        info!(
            "Registered push token {} for doctor {} (device {:?})",
            stored.id, doctor_id, stored.device_id
        );
        Ok(stored)
    }

    /// Deletes the doctor's tokens beyond the cap, oldest `updated_at` first
    pub async fn enforce_limit(&self, doctor_id: i64) -> Result<u64, DbError> {
        self.repo.enforce_limit(doctor_id, self.max_tokens).await
    }

    /// Distinct tokens of the given doctors
    pub async fn tokens_for(&self, doctor_ids: &[i64]) -> Result<Vec<String>, DbError> {
        if doctor_ids.is_empty() {
            return Ok(Vec::new());
        }
        self.repo.tokens_for(doctor_ids).await
    }

    pub async fn all_tokens(&self) -> Result<Vec<String>, DbError> {
        self.repo.all_tokens().await
    }

    /// The doctor's token rows, most recently updated first
    pub async fn tokens_of(&self, doctor_id: i64) -> Result<Vec<PushToken>, DbError> {
        self.repo.find_by_doctor(doctor_id).await
    }

    /// Removes the doctor's tokens matching the given selectors
    ///
    /// # Errors
    ///
    /// [`TokenError::MissingSelector`] when neither a token nor a device id is given
    pub async fn remove(
        &self,
        doctor_id: i64,
        token: Option<&str>,
        device_id: Option<&str>,
    ) -> Result<u64, TokenError> {
        let token = token.filter(|t| !t.is_empty());
        let device_id = device_id.filter(|d| !d.is_empty());
        if token.is_none() && device_id.is_none() {
            return Err(TokenError::MissingSelector);
        }

        let removed = self.repo.remove(doctor_id, token, device_id).await?;
        debug!("Removed {} push tokens of doctor {}", removed, doctor_id);
        Ok(removed)
    }

    /// Deletes tokens created longer than `older_than` ago
    pub async fn purge_stale(&self, older_than: Duration) -> Result<u64, DbError> {
        let cutoff = self.clock.now() - older_than;
        let purged = self.repo.purge_created_before(cutoff).await?;
        if purged > 0 {
            info!("Purged {} push tokens created before {}", purged, cutoff);
        }
        Ok(purged)
    }

    /// Deletes tokens the gateway reported as permanently invalid
    pub async fn purge_invalid(&self, tokens: &[String]) -> Result<u64, DbError> {
        if tokens.is_empty() {
            return Ok(0);
        }
        let purged = self.repo.purge_tokens(tokens).await?;
        info!("Purged {} invalid push tokens", purged);
        Ok(purged)
    }
}

#[cfg(test)]
mod validation_tests {
    use super::*;

    #[test]
    fn token_charset() {
        assert!(is_valid_token("fcm:APA91b-x_y"));
        assert!(!is_valid_token(""));
        assert!(!is_valid_token("has space"));
        assert!(!is_valid_token("semi;colon"));
    }

    #[test]
    fn device_id_length_and_charset() {
        assert!(is_valid_device_id("pixel-8-pro"));
        assert!(is_valid_device_id(&"a".repeat(50)));
        assert!(!is_valid_device_id("dev-001"));
        assert!(!is_valid_device_id(&"a".repeat(51)));
        assert!(!is_valid_device_id("device:0001"));
    }
}
