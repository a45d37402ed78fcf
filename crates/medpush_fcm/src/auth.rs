//! Authentication module for Firebase Cloud Messaging
//!
//! FCM requests carry an OAuth2 bearer token obtained from a service account
//! key. The token is valid for an hour, so [`ServiceAccountTokenProvider`]
//! keeps it for 50 minutes before asking Google for a new one.

use crate::client::FirebaseError;
use medpush_common::services::BoxFuture;
use std::error::Error;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::debug;
use yup_oauth2::{read_service_account_key, ServiceAccountAuthenticator};

const FCM_SCOPE: &str = "https://www.googleapis.com/auth/firebase.messaging";

const TOKEN_REUSE_WINDOW: Duration = Duration::from_secs(50 * 60);

/// Source of bearer tokens for the FCM API.
pub trait AccessTokenProvider: Send + Sync {
    fn access_token(&self) -> BoxFuture<'_, String, FirebaseError>;
}

/// Obtains an OAuth2 access token for Firebase Cloud Messaging
///
/// # Arguments
///
/// * `key_path` - Path to the service account key file
///
/// # Errors
///
/// This function will return an error if:
/// * The service account key file cannot be read
/// * Authentication with Google's OAuth2 service fails
/// * No token is returned from the authentication service
pub async fn get_firebase_auth_token(
    key_path: &Path,
) -> Result<String, Box<dyn Error + Send + Sync>> {
    let sa_key = read_service_account_key(key_path).await?;

    let auth = ServiceAccountAuthenticator::builder(sa_key).build().await?;

    let auth_token = auth.token(&[FCM_SCOPE]).await?;
    let fcm_token = match auth_token.token() {
        Some(token) => token,
        None => {
            return Err("No token available".into());
        }
    };

    Ok(fcm_token.to_string())
}

struct CachedToken {
    value: String,
    fetched_at: Instant,
}

/// Token provider backed by a service account key file.
pub struct ServiceAccountTokenProvider {
    key_path: PathBuf,
    cached: Mutex<Option<CachedToken>>,
}

impl ServiceAccountTokenProvider {
    pub fn new(key_path: impl Into<PathBuf>) -> Self {
        Self {
            key_path: key_path.into(),
            cached: Mutex::new(None),
        }
    }
}

impl AccessTokenProvider for ServiceAccountTokenProvider {
    fn access_token(&self) -> BoxFuture<'_, String, FirebaseError> {
        Box::pin(async move {
            // Held across the refresh so concurrent senders wait for one fetch
            let mut cached = self.cached.lock().await;

            if let Some(token) = cached.as_ref() {
                if token.fetched_at.elapsed() < TOKEN_REUSE_WINDOW {
                    return Ok(token.value.clone());
                }
            }

            debug!("Fetching FCM access token from {}", self.key_path.display());
            let value = get_firebase_auth_token(&self.key_path)
                .await
                .map_err(|e| FirebaseError::AuthError(e.to_string()))?;

            *cached = Some(CachedToken {
                value: value.clone(),
                fetched_at: Instant::now(),
            });
            Ok(value)
        })
    }
}

/// Token provider that always hands out the same token.
#[derive(Debug, Clone)]
pub struct StaticTokenProvider(pub String);

impl AccessTokenProvider for StaticTokenProvider {
    fn access_token(&self) -> BoxFuture<'_, String, FirebaseError> {
        Box::pin(async move { Ok(self.0.clone()) })
    }
}
