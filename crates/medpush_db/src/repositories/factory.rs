//! Factory for creating the SQL repositories

use crate::repositories::{SqlDirectoryRepository, SqlNotificationRepository, SqlPushTokenRepository};
use crate::{DbClient, RepositoryFactory};

/// Creates every SQL repository from a shared [`DbClient`].
#[derive(Debug, Clone, Default)]
pub struct SqlRepositoryFactory;

impl SqlRepositoryFactory {
    pub fn new() -> Self {
        Self
    }
}

impl RepositoryFactory<SqlPushTokenRepository, DbClient> for SqlRepositoryFactory {
    fn create_repository(&self, db_client: DbClient) -> SqlPushTokenRepository {
        SqlPushTokenRepository::new(db_client)
    }
}

impl RepositoryFactory<SqlNotificationRepository, DbClient> for SqlRepositoryFactory {
    fn create_repository(&self, db_client: DbClient) -> SqlNotificationRepository {
        SqlNotificationRepository::new(db_client)
    }
}

impl RepositoryFactory<SqlDirectoryRepository, DbClient> for SqlRepositoryFactory {
    fn create_repository(&self, db_client: DbClient) -> SqlDirectoryRepository {
        SqlDirectoryRepository::new(db_client)
    }
}
