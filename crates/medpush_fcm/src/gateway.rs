//! [`PushGateway`] implementation over FCM

use crate::client::{FcmMessage, FirebaseClient, FirebaseError};
use futures::stream::{self, StreamExt};
use medpush_common::services::{
    BoxFuture, DeliveryError, DeliveryReport, PushGateway, PushMessage,
};
use tracing::{debug, info, warn};

impl PushGateway for FirebaseClient {
    fn send_single<'a>(
        &'a self,
        token: &'a str,
        message: &'a PushMessage,
    ) -> BoxFuture<'a, (), DeliveryError> {
        Box::pin(async move {
            let fcm_message = FcmMessage::for_token(token, message);
            match self.send_message(&fcm_message).await {
                Ok(_) => Ok(()),
                Err(e) if e.is_invalid_token() => {
                    warn!("FCM rejected token as invalid: {}", e);
                    Err(DeliveryError::InvalidToken(token.to_string()))
                }
                // Nothing to compare against, so the token keeps the benefit of the doubt
                Err(e) => {
                    warn!("FCM delivery failed: {}", e);
                    Err(DeliveryError::Unavailable(e.to_string()))
                }
            }
        })
    }

    fn send_batch<'a>(
        &'a self,
        tokens: &'a [String],
        message: &'a PushMessage,
    ) -> BoxFuture<'a, DeliveryReport, DeliveryError> {
        Box::pin(async move {
            if tokens.is_empty() {
                return Ok(DeliveryReport::default());
            }

            let access_token = self
                .access_token()
                .await
                .map_err(|e| DeliveryError::Unavailable(e.to_string()))?;
            let access_token = access_token.as_str();

            debug!(
                "Sending FCM batch to {} tokens (concurrency {})",
                tokens.len(),
                self.max_concurrency
            );

            let sends: Vec<_> = tokens
                .iter()
                .map(|token| {
                    let fcm_message = FcmMessage::for_token(token, message);
                    async move { (token, self.post_message(access_token, &fcm_message).await) }
                })
                .collect();

            let outcomes: Vec<(&String, Result<String, FirebaseError>)> = stream::iter(sends)
                .buffer_unordered(self.max_concurrency)
                .collect()
                .await;

            let mut report = DeliveryReport::default();
            let mut transport_failures = 0;
            let mut last_transport_error = None;
            let mut unattributed = Vec::new();

            for (token, outcome) in outcomes {
                match outcome {
                    Ok(_) => report.sent_count += 1,
                    Err(e) if e.is_invalid_token() => {
                        debug!("FCM rejected token {}: {}", token, e);
                        report.failed_tokens.push(token.clone());
                    }
                    Err(e) if e.is_unattributed_invalid_argument() => {
                        debug!("FCM rejected the message for token {}: {}", token, e);
                        unattributed.push(token);
                    }
                    Err(e) => {
                        if e.is_transport() {
                            transport_failures += 1;
                            last_transport_error = Some(e.to_string());
                        }
                        report.transient_failures += 1;
                    }
                }
            }

            // Every token got the same payload: if it reached someone, the
            // rejections are about the tokens, otherwise about the payload.
            if report.sent_count > 0 {
                report
                    .failed_tokens
                    .extend(unattributed.into_iter().cloned());
            } else if !unattributed.is_empty() {
                warn!(
                    "FCM rejected the message itself for {} tokens; keeping them",
                    unattributed.len()
                );
                report.transient_failures += unattributed.len();
            }

            if transport_failures == tokens.len() {
                let reason = last_transport_error.unwrap_or_else(|| "FCM unreachable".to_string());
                warn!("FCM unreachable for the whole batch: {}", reason);
                return Err(DeliveryError::Unavailable(reason));
            }

            info!(
                "FCM batch complete: {} sent, {} invalid, {} transient failures",
                report.sent_count,
                report.failed_tokens.len(),
                report.transient_failures
            );
            Ok(report)
        })
    }
}
