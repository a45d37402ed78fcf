//! Firebase Cloud Messaging client module
//!
//! This module talks to the FCM HTTP v1 `messages:send` endpoint. One request
//! carries one message for one registration token.

use crate::auth::{AccessTokenProvider, ServiceAccountTokenProvider};
use medpush_common::create_client;
use medpush_common::services::PushMessage;
use medpush_config::{FirebaseConfig, PushConfig};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// FCM error codes that mean the registration token will never work again.
const INVALID_TOKEN_CODES: [&str; 2] = ["UNREGISTERED", "SENDER_ID_MISMATCH"];

/// Raised for bad tokens and for bad payloads alike; only a field violation
/// on [`TOKEN_FIELD`] pins it on the token.
pub const INVALID_ARGUMENT: &str = "INVALID_ARGUMENT";

const TOKEN_FIELD: &str = "message.token";

/// Errors that can occur when interacting with the Firebase Cloud Messaging API
#[derive(Error, Debug)]
pub enum FirebaseError {
    /// Error during authentication with Firebase
    #[error("Authentication error: {0}")]
    AuthError(String),

    /// Error during HTTP request to Firebase API
    #[error("HTTP request error: {0}")]
    RequestError(#[from] reqwest::Error),

    /// Missing required configuration
    #[error("Missing configuration: {0}")]
    ConfigError(String),

    /// Error returned by the Firebase API
    #[error("Firebase API error ({status}): {message}")]
    ApiError {
        status: u16,
        code: Option<String>,
        message: String,
        /// Whether a field violation names the registration token
        token_field: bool,
    },
}

impl FirebaseError {
    /// Whether FCM rejected the target token itself.
    pub fn is_invalid_token(&self) -> bool {
        match self {
            FirebaseError::ApiError {
                status,
                code,
                token_field,
                ..
            } => {
                *status == 404
                    || *token_field
                    || code
                        .as_deref()
                        .is_some_and(|code| INVALID_TOKEN_CODES.contains(&code))
            }
            _ => false,
        }
    }

    /// An `INVALID_ARGUMENT` that does not say which part of the message was
    /// wrong: either the token or the payload.
    pub fn is_unattributed_invalid_argument(&self) -> bool {
        match self {
            FirebaseError::ApiError {
                code, token_field, ..
            } => !token_field && code.as_deref() == Some(INVALID_ARGUMENT),
            _ => false,
        }
    }

    /// Whether the request never got an answer from FCM.
    pub fn is_transport(&self) -> bool {
        matches!(self, FirebaseError::RequestError(_))
    }
}

/// A message to be sent via Firebase Cloud Messaging
#[derive(Debug, Clone, Serialize)]
pub struct FcmMessage {
    pub message: Message,
}

impl FcmMessage {
    /// Addresses `push` to a single registration token.
    pub fn for_token(token: &str, push: &PushMessage) -> Self {
        Self {
            message: Message {
                token: token.to_string(),
                notification: Some(Notification {
                    title: push.title.clone(),
                    body: push.body.clone(),
                }),
                data: (!push.data.is_empty()).then(|| push.data.clone()),
            },
        }
    }
}

/// The message payload for Firebase Cloud Messaging
#[derive(Debug, Clone, Serialize)]
pub struct Message {
    /// Registration token of the target device
    pub token: String,

    /// Shown by the device; a message without it is data-only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notification: Option<Notification>,

    /// Custom key-value data handed to the app
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<HashMap<String, String>>,
}

/// The notification to be displayed on the user's device
#[derive(Debug, Clone, Serialize)]
pub struct Notification {
    pub title: String,
    pub body: String,
}

/// Response from the Firebase Cloud Messaging API
#[derive(Debug, Deserialize)]
pub struct FcmResponse {
    /// "projects/{project_id}/messages/{message_id}"
    pub name: String,
}

#[derive(Debug, Deserialize)]
struct FcmErrorResponse {
    error: FcmErrorBody,
}

#[derive(Debug, Deserialize)]
struct FcmErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    details: Vec<FcmErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct FcmErrorDetail {
    #[serde(rename = "errorCode")]
    error_code: Option<String>,
    #[serde(rename = "fieldViolations", default)]
    field_violations: Vec<FieldViolation>,
}

#[derive(Debug, Deserialize)]
struct FieldViolation {
    #[serde(default)]
    field: String,
}

/// Turns a non-success FCM response body into an [`FirebaseError::ApiError`].
///
/// The FCM-specific `errorCode` in `details` wins over the generic status.
fn api_error(status: u16, body: &str) -> FirebaseError {
    match serde_json::from_str::<FcmErrorResponse>(body) {
        Ok(parsed) => {
            let details = parsed.error.details;
            let token_field = details.iter().any(|detail| {
                detail
                    .field_violations
                    .iter()
                    .any(|violation| violation.field == TOKEN_FIELD)
            });
            let code = details
                .into_iter()
                .find_map(|detail| detail.error_code)
                .or(parsed.error.status);
            FirebaseError::ApiError {
                status,
                code,
                message: parsed.error.message,
                token_field,
            }
        }
        Err(_) => FirebaseError::ApiError {
            status,
            code: None,
            message: body.to_string(),
            token_field: false,
        },
    }
}

/// Client for the Firebase Cloud Messaging HTTP v1 API
pub struct FirebaseClient {
    client: Client,
    endpoint: String,
    auth: Arc<dyn AccessTokenProvider>,
    pub(crate) max_concurrency: usize,
}

impl FirebaseClient {
    /// Creates a client authenticating with the configured service account key
    ///
    /// # Errors
    ///
    /// Returns [`FirebaseError::ConfigError`] when `project_id` or `key_path`
    /// is missing, or a request error when the HTTP client cannot be built.
    pub fn new(config: &FirebaseConfig, push: &PushConfig) -> Result<Self, FirebaseError> {
        let key_path = config.key_path.as_deref().ok_or_else(|| {
            FirebaseError::ConfigError("Missing key_path in FirebaseConfig".to_string())
        })?;

        let auth = Arc::new(ServiceAccountTokenProvider::new(key_path));
        Self::with_token_provider(config, push, auth)
    }

    /// Creates a client with a custom source of access tokens
    pub fn with_token_provider(
        config: &FirebaseConfig,
        push: &PushConfig,
        auth: Arc<dyn AccessTokenProvider>,
    ) -> Result<Self, FirebaseError> {
        let project_id = config.project_id.as_deref().ok_or_else(|| {
            FirebaseError::ConfigError("Missing project_id in FirebaseConfig".to_string())
        })?;

        let endpoint = format!(
            "{}/v1/projects/{}/messages:send",
            config.api_base_url.trim_end_matches('/'),
            project_id
        );

        Ok(Self {
            client: create_client(push.request_timeout_secs, false)?,
            endpoint,
            auth,
            max_concurrency: push.max_concurrency.max(1),
        })
    }

    /// Sends a push notification message via Firebase Cloud Messaging
    ///
    /// # Returns
    ///
    /// The message name FCM assigned on success
    ///
    /// # Errors
    ///
    /// This method will return an error if:
    /// * No access token can be obtained
    /// * The HTTP request fails
    /// * The FCM API returns an error response
    pub async fn send_message(&self, message: &FcmMessage) -> Result<String, FirebaseError> {
        let access_token = self.auth.access_token().await?;
        self.post_message(&access_token, message).await
    }

    pub(crate) async fn access_token(&self) -> Result<String, FirebaseError> {
        self.auth.access_token().await
    }

    pub(crate) async fn post_message(
        &self,
        access_token: &str,
        message: &FcmMessage,
    ) -> Result<String, FirebaseError> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(access_token)
            .json(message)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await?;
            return Err(api_error(status.as_u16(), &error_text));
        }

        let fcm_response: FcmResponse = response.json().await?;
        debug!("FCM accepted message {}", fcm_response.name);
        Ok(fcm_response.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unregistered_detail_marks_token_invalid() {
        let body = r#"{
            "error": {
                "code": 404,
                "message": "Requested entity was not found.",
                "status": "NOT_FOUND",
                "details": [{
                    "@type": "type.googleapis.com/google.firebase.fcm.v1.FcmError",
                    "errorCode": "UNREGISTERED"
                }]
            }
        }"#;

        let err = api_error(404, body);
        match &err {
            FirebaseError::ApiError { code, message, .. } => {
                assert_eq!(code.as_deref(), Some("UNREGISTERED"));
                assert_eq!(message, "Requested entity was not found.");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(err.is_invalid_token());
    }

    #[test]
    fn invalid_argument_blames_the_token_only_through_a_field_violation() {
        let token_body = r#"{
            "error": {
                "code": 400,
                "message": "The registration token is not a valid FCM registration token",
                "status": "INVALID_ARGUMENT",
                "details": [
                    {
                        "@type": "type.googleapis.com/google.firebase.fcm.v1.FcmError",
                        "errorCode": "INVALID_ARGUMENT"
                    },
                    {
                        "@type": "type.googleapis.com/google.rpc.BadRequest",
                        "fieldViolations": [{
                            "field": "message.token",
                            "description": "Invalid registration token"
                        }]
                    }
                ]
            }
        }"#;
        let err = api_error(400, token_body);
        assert!(err.is_invalid_token());
        assert!(!err.is_unattributed_invalid_argument());

        let payload_body = r#"{
            "error": {
                "code": 400,
                "message": "Message is too big",
                "status": "INVALID_ARGUMENT",
                "details": [{
                    "@type": "type.googleapis.com/google.firebase.fcm.v1.FcmError",
                    "errorCode": "INVALID_ARGUMENT"
                }]
            }
        }"#;
        let err = api_error(400, payload_body);
        assert!(!err.is_invalid_token());
        assert!(err.is_unattributed_invalid_argument());
    }

    #[test]
    fn server_errors_are_not_token_errors() {
        let err = api_error(503, r#"{"error":{"message":"busy","status":"UNAVAILABLE"}}"#);
        assert!(!err.is_invalid_token());
        assert!(!err.is_transport());

        let garbled = api_error(500, "<html>oops</html>");
        assert!(matches!(
            garbled,
            FirebaseError::ApiError { code: None, .. }
        ));
    }

    #[test]
    fn message_data_is_omitted_when_empty() {
        let plain = FcmMessage::for_token("tok", &PushMessage::new("Other", "Test"));
        let json = serde_json::to_value(&plain).unwrap();
        assert_eq!(json["message"]["token"], "tok");
        assert!(json["message"].get("data").is_none());

        let with_data = FcmMessage::for_token(
            "tok",
            &PushMessage::new("Other", "Test").with_data("notification_id", "7"),
        );
        let json = serde_json::to_value(&with_data).unwrap();
        assert_eq!(json["message"]["data"]["notification_id"], "7");
    }

    #[test]
    fn client_requires_project_id() {
        let config = FirebaseConfig {
            project_id: None,
            key_path: Some("key.json".to_string()),
            api_base_url: "https://fcm.googleapis.com".to_string(),
        };
        let result = FirebaseClient::new(&config, &PushConfig::default());
        assert!(matches!(result, Err(FirebaseError::ConfigError(_))));
    }
}
