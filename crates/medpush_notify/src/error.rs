//! Error types of the notification core

use medpush_common::models::Notification;
use medpush_common::services::DeliveryReport;
use medpush_common::{external_service_error, forbidden, not_found, validation_error, MedpushError};
use medpush_db::DbError;
use thiserror::Error;

const PUSH_SERVICE: &str = "push";

/// Errors from registering or removing push tokens
#[derive(Debug, Error)]
pub enum TokenError {
    /// The token is empty or contains characters outside `[A-Za-z0-9:_-]`
    #[error("Invalid push token format")]
    InvalidTokenFormat,

    /// The device id is not 10 to 50 characters of `[A-Za-z0-9_-]`
    #[error("Invalid device id format")]
    InvalidDeviceIdFormat,

    /// A removal named neither a token nor a device id
    #[error("Either a token or a device id is required")]
    MissingSelector,

    #[error(transparent)]
    Storage(#[from] DbError),
}

impl TokenError {
    /// Whether the caller sent something malformed.
    pub fn is_rejection(&self) -> bool {
        !matches!(self, TokenError::Storage(_))
    }
}

/// Errors from the notification hub
#[derive(Debug, Error)]
pub enum HubError {
    #[error("Notification {0} not found")]
    NotFound(i64),

    #[error("Notification {id} does not belong to doctor {doctor_id}")]
    NotOwner { id: i64, doctor_id: i64 },

    /// The record was stored but no push could be attempted.
    #[error("Notification {} stored, push delivery unavailable: {reason}", .notification.id)]
    DeliveryUnavailable {
        notification: Box<Notification>,
        reason: String,
    },

    /// The records were stored but no push could be attempted.
    #[error("{created} notifications stored, push delivery unavailable: {reason}")]
    FanOutUnavailable { created: u64, reason: String },

    #[error(transparent)]
    Storage(#[from] DbError),
}

/// Errors from a broadcast to every registered token
#[derive(Debug, Error)]
pub enum BroadcastError {
    /// Title and body are larger than a push payload may be.
    #[error("Broadcast payload of {size} bytes exceeds the {limit} byte limit")]
    PayloadTooLarge { size: usize, limit: usize },

    /// The gateway went away; `partial` covers the chunks sent before that.
    #[error("Push gateway unavailable after {} deliveries: {reason}", .partial.sent_count)]
    GatewayUnavailable {
        partial: DeliveryReport,
        reason: String,
    },

    #[error(transparent)]
    Storage(#[from] DbError),
}

impl From<TokenError> for MedpushError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Storage(db) => db.into(),
            rejection => validation_error(rejection),
        }
    }
}

impl From<HubError> for MedpushError {
    fn from(err: HubError) -> Self {
        match err {
            HubError::NotFound(_) => not_found(err),
            HubError::NotOwner { .. } => forbidden(err),
            HubError::DeliveryUnavailable { .. } | HubError::FanOutUnavailable { .. } => {
                external_service_error(PUSH_SERVICE, err)
            }
            HubError::Storage(db) => db.into(),
        }
    }
}

impl From<BroadcastError> for MedpushError {
    fn from(err: BroadcastError) -> Self {
        match err {
            BroadcastError::PayloadTooLarge { .. } => validation_error(err),
            BroadcastError::GatewayUnavailable { reason, .. } => {
                external_service_error(PUSH_SERVICE, reason)
            }
            BroadcastError::Storage(db) => db.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use medpush_common::HttpStatusCode;

    #[test]
    fn hub_errors_map_to_http_statuses() {
        assert_eq!(MedpushError::from(HubError::NotFound(3)).status_code(), 404);
        assert_eq!(
            MedpushError::from(HubError::NotOwner { id: 3, doctor_id: 9 }).status_code(),
            403
        );
        assert_eq!(
            MedpushError::from(HubError::Storage(DbError::QueryError("x".into()))).status_code(),
            500
        );
    }

    #[test]
    fn token_rejections_are_validation_errors() {
        assert!(TokenError::MissingSelector.is_rejection());
        assert!(!TokenError::Storage(DbError::PoolError("x".into())).is_rejection());
        assert_eq!(MedpushError::from(TokenError::MissingSelector).status_code(), 400);
    }

    #[test]
    fn broadcast_outage_is_a_bad_gateway() {
        let err = BroadcastError::GatewayUnavailable {
            partial: DeliveryReport::default(),
            reason: "connection refused".to_string(),
        };
        assert_eq!(MedpushError::from(err).status_code(), 502);
    }

    #[test]
    fn oversized_broadcast_is_a_validation_error() {
        let err = BroadcastError::PayloadTooLarge {
            size: 5000,
            limit: 4096,
        };
        assert_eq!(MedpushError::from(err).status_code(), 400);
    }
}
