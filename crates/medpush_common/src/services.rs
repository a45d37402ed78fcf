// --- File: crates/medpush_common/src/services.rs ---
//! Service abstractions for external services.
//!
//! The push gateway is the only external sender the notification core talks
//! to. Keeping it behind a trait lets the core run against FCM in production,
//! a disabled gateway when push is not configured, and a recording fake in
//! tests.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;
use tracing::debug;

/// Type alias for a boxed future that returns a Result
pub type BoxFuture<'a, T, E> = Pin<Box<dyn Future<Output = Result<T, E>> + Send + 'a>>;

/// Largest notification plus data payload FCM accepts, in bytes.
pub const MAX_PAYLOAD_BYTES: usize = 4096;

/// A push message as shown on the device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushMessage {
    pub title: String,
    pub body: String,
    /// Custom key-value data delivered to the app alongside the notification.
    #[serde(default)]
    pub data: HashMap<String, String>,
}

impl PushMessage {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            data: HashMap::new(),
        }
    }

    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    /// Bytes of user content the message carries: title, body and every
    /// data key and value.
    pub fn payload_len(&self) -> usize {
        self.title.len()
            + self.body.len()
            + self
                .data
                .iter()
                .map(|(key, value)| key.len() + value.len())
                .sum::<usize>()
    }

    pub fn fits_payload_limit(&self) -> bool {
        self.payload_len() <= MAX_PAYLOAD_BYTES
    }
}

/// Outcome of delivering one message to a set of tokens.
///
/// Partial failure is a normal outcome: tokens the transport rejected as
/// permanently invalid are listed in `failed_tokens` so the caller can purge
/// them; failures that say nothing about the token are only counted.
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryReport {
    pub sent_count: usize,
    pub failed_tokens: Vec<String>,
    pub transient_failures: usize,
}

impl DeliveryReport {
    /// Number of tokens the message did not reach.
    pub fn failed_count(&self) -> usize {
        self.failed_tokens.len() + self.transient_failures
    }

    /// Folds another chunk's report into this one.
    pub fn merge(&mut self, other: DeliveryReport) {
        self.sent_count += other.sent_count;
        self.failed_tokens.extend(other.failed_tokens);
        self.transient_failures += other.transient_failures;
    }
}

/// Errors a push gateway reports instead of a delivery report.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DeliveryError {
    /// The single target token is permanently invalid.
    #[error("push token rejected as invalid: {0}")]
    InvalidToken(String),

    /// The transport could not be reached at all.
    #[error("push gateway unavailable: {0}")]
    Unavailable(String),
}

/// An opaque push sender.
///
/// `send_batch` never fails because some tokens were rejected; it only fails
/// when nothing could be attempted. An empty token list is a successful no-op.
pub trait PushGateway: Send + Sync {
    /// Send a message to exactly one token.
    fn send_single<'a>(
        &'a self,
        token: &'a str,
        message: &'a PushMessage,
    ) -> BoxFuture<'a, (), DeliveryError>;

    /// Send one message to many tokens, reporting per-token failures.
    fn send_batch<'a>(
        &'a self,
        tokens: &'a [String],
        message: &'a PushMessage,
    ) -> BoxFuture<'a, DeliveryReport, DeliveryError>;
}

/// Gateway used when push delivery is not configured.
///
/// Every non-empty send is reported as unavailable, so notifications are still
/// stored while the caller learns that nothing reached a device.
#[derive(Debug, Clone, Default)]
pub struct DisabledGateway;

const DISABLED_REASON: &str = "push delivery disabled";

impl PushGateway for DisabledGateway {
    fn send_single<'a>(
        &'a self,
        token: &'a str,
        _message: &'a PushMessage,
    ) -> BoxFuture<'a, (), DeliveryError> {
        Box::pin(async move {
            debug!("Dropping push to {} - delivery disabled", token);
            Err(DeliveryError::Unavailable(DISABLED_REASON.to_string()))
        })
    }

    fn send_batch<'a>(
        &'a self,
        tokens: &'a [String],
        _message: &'a PushMessage,
    ) -> BoxFuture<'a, DeliveryReport, DeliveryError> {
        Box::pin(async move {
            if tokens.is_empty() {
                return Ok(DeliveryReport::default());
            }
            debug!("Dropping push to {} tokens - delivery disabled", tokens.len());
            Err(DeliveryError::Unavailable(DISABLED_REASON.to_string()))
        })
    }
}
