//! Database integration for medpush
//!
//! This crate owns every table the push subsystem touches. The repositories
//! run on a SQLx SQLite pool; an in-memory database is used by the test
//! suites.
//!
//! # Repositories
//!
//! - [`PushTokenRepository`]: device push tokens per doctor
//! - [`NotificationRepository`]: the notification records of each doctor
//! - [`DirectoryRepository`]: read-only doctor and patient fields used to
//!   enrich the feed
//!
//! # Example
//!
//! ```rust,no_run
//! use medpush_db::{DbClient, PushTokenRepository, SqlPushTokenRepository};
//!
//! async fn setup_db() -> Result<SqlPushTokenRepository, Box<dyn std::error::Error>> {
//!     let db_client = DbClient::from_url("sqlite::memory:").await?;
//!     let tokens = SqlPushTokenRepository::new(db_client);
//!     tokens.init_schema().await?;
//!     Ok(tokens)
//! }
//! ```

pub mod client;
pub mod error;
pub mod factory;
pub mod repositories;
pub mod repository;
pub mod time;

// Re-export the client, factory, and repository traits for ease of use
pub use client::DbClient;
pub use error::DbError;
pub use factory::DbClientFactory;
pub use repository::RepositoryFactory;

// Re-export the repositories module components for ease of use
pub use repositories::{
    DirectoryRepository, NotificationQuery, NotificationRepository, PushTokenRepository,
    SqlDirectoryRepository, SqlNotificationRepository, SqlPushTokenRepository,
    SqlRepositoryFactory, TokenUpsert,
};
