//! Repository modules for database access
//!
//! Each entity has a trait describing its storage operations and a SQL
//! implementation over [`DbClient`](crate::DbClient).

pub mod directory;
pub mod directory_sql;
pub mod factory;
pub mod notification;
pub mod notification_sql;
pub mod push_token;
pub mod push_token_sql;

#[cfg(test)]
mod directory_sql_test;
#[cfg(test)]
mod push_token_sql_test;

pub use directory::{DirectoryRepository, DoctorProfile, PatientRecord};
pub use directory_sql::SqlDirectoryRepository;
pub use factory::SqlRepositoryFactory;
pub use notification::{NewNotification, Notification, NotificationQuery, NotificationRepository};
pub use notification_sql::SqlNotificationRepository;
pub use push_token::{PushToken, PushTokenRepository, TokenUpsert};
pub use push_token_sql::SqlPushTokenRepository;
