//! Broadcast to every registered device

use crate::error::BroadcastError;
use crate::registry::TokenRegistry;
use medpush_common::services::{
    DeliveryError, DeliveryReport, PushGateway, PushMessage, MAX_PAYLOAD_BYTES,
};
use medpush_db::PushTokenRepository;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Default number of tokens handed to the gateway per batch.
pub const DEFAULT_BATCH_SIZE: usize = 500;

pub struct BroadcastCoordinator<P> {
    registry: Arc<TokenRegistry<P>>,
    gateway: Arc<dyn PushGateway>,
    batch_size: usize,
}

impl<P: PushTokenRepository> BroadcastCoordinator<P> {
    pub fn new(registry: Arc<TokenRegistry<P>>, gateway: Arc<dyn PushGateway>) -> Self {
        Self {
            registry,
            gateway,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Sends one message to every registered token
    ///
    /// Tokens go out in chunks of the batch size; reports are merged and the
    /// tokens the gateway rejected are purged afterwards. With no tokens
    /// registered nothing is sent and an empty report is returned.
    ///
    /// # Errors
    ///
    /// * [`BroadcastError::PayloadTooLarge`] before anything is sent
    /// * [`BroadcastError::GatewayUnavailable`] when the gateway fails part
    ///   way. Chunks sent before that stay sent and are described by
    ///   `partial`; their rejected tokens are still purged.
    /// * [`BroadcastError::Storage`] only when the tokens cannot be read
    pub async fn broadcast_all(&self, title: &str, body: &str) -> Result<DeliveryReport, BroadcastError> {
        let message = PushMessage::new(title, body);
        if !message.fits_payload_limit() {
            warn!(
                "Broadcast refused: {} payload bytes exceed {}",
                message.payload_len(),
                MAX_PAYLOAD_BYTES
            );
            return Err(BroadcastError::PayloadTooLarge {
                size: message.payload_len(),
                limit: MAX_PAYLOAD_BYTES,
            });
        }

        let tokens = self.registry.all_tokens().await?;
        if tokens.is_empty() {
            info!("Broadcast skipped: no push tokens registered");
            return Ok(DeliveryReport::default());
        }

        let mut report = DeliveryReport::default();
        let mut outage = None;

        for (index, chunk) in tokens.chunks(self.batch_size).enumerate() {
            debug!("Broadcast chunk {} with {} tokens", index + 1, chunk.len());
            match self.gateway.send_batch(chunk, &message).await {
                Ok(chunk_report) => report.merge(chunk_report),
                Err(DeliveryError::InvalidToken(token)) => report.failed_tokens.push(token),
                Err(DeliveryError::Unavailable(reason)) => {
                    warn!(
                        "Push gateway unavailable at broadcast chunk {}: {}",
                        index + 1,
                        reason
                    );
                    outage = Some(reason);
                    break;
                }
            }
        }

        // Deliveries already happened; a failed purge is retried the next
        // time the tokens are rejected
        if let Err(e) = self.registry.purge_invalid(&report.failed_tokens).await {
            error!(
                "Failed to purge {} invalid push tokens after broadcast: {}",
                report.failed_tokens.len(),
                e
            );
        }

        if let Some(reason) = outage {
            return Err(BroadcastError::GatewayUnavailable {
                partial: report,
                reason,
            });
        }

        info!(
            "Broadcast complete: {} sent, {} failed",
            report.sent_count,
            report.failed_count()
        );
        Ok(report)
    }
}
