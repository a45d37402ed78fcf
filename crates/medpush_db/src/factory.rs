//! Factory for creating database clients

use crate::client::DbClient;
use crate::error::DbError;
use medpush_config::AppConfig;
use tracing::{debug, info};

/// Creates the [`DbClient`] the services share.
#[derive(Debug, Clone, Default)]
pub struct DbClientFactory;

impl DbClientFactory {
    pub fn new() -> Self {
        Self
    }

    /// Connects to the database named in the `[database]` section
    ///
    /// # Errors
    ///
    /// * [`DbError::ConfigError`] when the section or its URL is missing
    /// * [`DbError::PoolError`] when the connection fails
    pub async fn from_app_config(&self, config: &AppConfig) -> Result<DbClient, DbError> {
        debug!("Creating database client from application configuration");
        let client = DbClient::new(config).await?;
        info!("Connected to the notification database");
        Ok(client)
    }
}
