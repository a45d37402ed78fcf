// --- File: crates/services/medpush_backend/src/app_state.rs ---
use medpush_config::AppConfig;
use medpush_db::{
    DbClient, DbError, DirectoryRepository, NotificationRepository, PushTokenRepository,
    RepositoryFactory, SqlDirectoryRepository, SqlNotificationRepository, SqlPushTokenRepository,
    SqlRepositoryFactory,
};
use medpush_notify::{NotifyState, SystemClock};
use std::sync::Arc;
use tracing::info;

use crate::service_factory::MedpushServiceFactory;

/// Application state that is shared across all routes.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub notify: Arc<NotifyState>,
}

impl AppState {
    /// Wires the notification core to the database and the configured push gateway.
    pub fn new(config: Arc<AppConfig>, db: DbClient, services: &MedpushServiceFactory) -> Self {
        let notify = NotifyState::new(&config, db, services.push_gateway(), Arc::new(SystemClock));

        Self {
            config,
            notify: Arc::new(notify),
        }
    }

    /// How often the token retention sweep runs
    pub fn retention_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.config.push.retention_interval_secs)
    }
}

/// Creates the push token and notification tables, and the directory tables
/// for local setups, if they don't exist.
pub async fn prepare_database(db: &DbClient) -> Result<(), DbError> {
    let factory = SqlRepositoryFactory::new();

    let tokens: SqlPushTokenRepository = factory.create_repository(db.clone());
    let notifications: SqlNotificationRepository = factory.create_repository(db.clone());
    let directory: SqlDirectoryRepository = factory.create_repository(db.clone());

    tokens.init_schema().await?;
    notifications.init_schema().await?;
    directory.init_schema().await?;

    info!("Database schema ready on {}", db);
    Ok(())
}
