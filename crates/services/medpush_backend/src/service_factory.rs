// --- File: crates/services/medpush_backend/src/service_factory.rs ---
//! Service factory implementation.
//!
//! Builds the external services the backend talks to from the configuration.
//! Today that is the push gateway: Firebase Cloud Messaging when it is enabled
//! and configured, otherwise a gateway that reports delivery as unavailable.

use medpush_common::is_firebase_enabled;
use medpush_common::services::{DisabledGateway, PushGateway};
use medpush_config::AppConfig;
use medpush_fcm::FirebaseClient;
use std::sync::Arc;
use tracing::{error, info, warn};

pub struct MedpushServiceFactory {
    push_gateway: Arc<dyn PushGateway>,
}

impl MedpushServiceFactory {
    /// Create a new service factory.
    pub fn new(config: &AppConfig) -> Self {
        Self {
            push_gateway: build_push_gateway(config),
        }
    }

    /// The gateway every notification and broadcast is pushed through.
    pub fn push_gateway(&self) -> Arc<dyn PushGateway> {
        self.push_gateway.clone()
    }
}

fn build_push_gateway(config: &AppConfig) -> Arc<dyn PushGateway> {
    if !is_firebase_enabled(config) {
        warn!("Firebase push delivery is disabled; notifications will only be stored");
        return Arc::new(DisabledGateway);
    }

    let Some(firebase) = config.firebase.as_ref() else {
        return Arc::new(DisabledGateway);
    };

    info!("Initializing Firebase push gateway...");
    match FirebaseClient::new(firebase, &config.push) {
        Ok(client) => {
            info!("Firebase push gateway initialized");
            Arc::new(client)
        }
        Err(e) => {
            error!("Failed to initialize Firebase push gateway: {}", e);
            Arc::new(DisabledGateway)
        }
    }
}
