//! Push-notification core for medpush
//!
//! - [`TokenRegistry`]: per-device push tokens of each doctor, validated,
//!   de-duplicated and capped
//! - [`NotificationStore`]: persisted notifications and the feed queries
//! - [`NotificationHub`]: creating and pushing notifications, the feed with its
//!   read-on-fetch reset, per-record read/delete
//! - [`BroadcastCoordinator`]: one message to every registered device in
//!   gateway-sized chunks
//!
//! Push delivery goes through the [`PushGateway`](medpush_common::services::PushGateway)
//! trait; persistence through the repository traits of `medpush-db`.
//!
//! # Example
//!
//! ```rust,no_run
//! use medpush_common::services::DisabledGateway;
//! use medpush_config::AppConfig;
//! use medpush_db::DbClient;
//! use medpush_notify::{routes, NotifyState, SystemClock};
//! use std::sync::Arc;
//!
//! async fn setup_app(config: &AppConfig, db: DbClient) -> axum::Router {
//!     let state = NotifyState::new(config, db, Arc::new(DisabledGateway), Arc::new(SystemClock));
//!     routes(Arc::new(state))
//! }
//! ```

pub mod broadcast;
pub mod clock;
#[cfg(feature = "openapi")]
pub mod doc;
pub mod enrich;
pub mod error;
pub mod handlers;
pub mod hub;
pub mod registry;
pub mod retention;
pub mod routes;
pub mod store;

#[cfg(test)]
mod store_test;
#[cfg(test)]
mod test_support;

pub use broadcast::BroadcastCoordinator;
pub use clock::{Clock, ManualClock, SystemClock};
pub use enrich::{Directory, NotificationView};
pub use error::{BroadcastError, HubError, TokenError};
pub use handlers::NotifyState;
pub use hub::{Dispatch, FanOut, Feed, NotificationHub};
pub use registry::{RegisterToken, TokenRegistry};
pub use retention::{run_retention_pass, spawn_retention_sweep};
pub use routes::routes;
pub use store::{NotificationStore, Page};

#[cfg(feature = "openapi")]
pub mod openapi {
    pub use crate::doc::NotifyApiDoc;
}
