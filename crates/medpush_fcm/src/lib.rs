//! Firebase Cloud Messaging push gateway for medpush
//!
//! This crate sends push notifications through the FCM HTTP v1 API and plugs
//! into the notification core as a [`PushGateway`](medpush_common::services::PushGateway).
//!
//! # Features
//!
//! - Authentication with a service account key, with the access token reused
//!   for most of its lifetime
//! - Single sends that tell an invalid token apart from an unreachable transport
//! - Batch sends with bounded concurrency, reporting the tokens FCM rejected
//!
//! # Example
//!
//! ```rust,no_run
//! use medpush_config::AppConfig;
//! use medpush_fcm::FirebaseClient;
//!
//! fn build_gateway(config: &AppConfig) -> Option<FirebaseClient> {
//!     let firebase = config.firebase.as_ref()?;
//!     FirebaseClient::new(firebase, &config.push).ok()
//! }
//! ```

pub mod auth;
pub mod client;
mod gateway;

pub use auth::{AccessTokenProvider, ServiceAccountTokenProvider, StaticTokenProvider};
pub use client::{FcmMessage, FirebaseClient, FirebaseError, Message, Notification};
