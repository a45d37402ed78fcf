//! SQL implementation of the push token repository

use crate::error::DbError;
use crate::repositories::push_token::{PushToken, PushTokenRepository, TokenUpsert};
use crate::time::{from_millis, placeholders, to_millis};
use crate::DbClient;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use tracing::{debug, error, info};

/// Upper bound on the number of tokens in one `IN (...)` delete.
const PURGE_CHUNK_SIZE: usize = 500;

const TOKEN_COLUMNS: &str =
    "id, token, doctor_id, device_id, device_type, app_version, created_at, updated_at";

/// SQL implementation of the push token repository
#[derive(Debug, Clone)]
pub struct SqlPushTokenRepository {
    db_client: DbClient,
}

impl SqlPushTokenRepository {
    pub fn new(db_client: DbClient) -> Self {
        Self { db_client }
    }
}

fn token_from_row(row: &SqliteRow) -> Result<PushToken, DbError> {
    Ok(PushToken {
        id: row.try_get("id")?,
        token: row.try_get("token")?,
        doctor_id: row.try_get("doctor_id")?,
        device_id: row.try_get("device_id")?,
        device_type: row.try_get("device_type")?,
        app_version: row.try_get("app_version")?,
        created_at: from_millis(row.try_get("created_at")?)?,
        updated_at: from_millis(row.try_get("updated_at")?)?,
    })
}

fn query_error(context: &str, e: sqlx::Error) -> DbError {
    error!("{}: {}", context, e);
    DbError::QueryError(e.to_string())
}

impl PushTokenRepository for SqlPushTokenRepository {
    async fn init_schema(&self) -> Result<(), DbError> {
        debug!("Initializing push token schema");

        let statements = [
            r#"
            CREATE TABLE IF NOT EXISTS push_tokens (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                token TEXT NOT NULL,
                doctor_id INTEGER NOT NULL,
                device_id TEXT,
                device_type TEXT,
                app_version TEXT,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
            )
            "#,
            // NULL device ids never collide here; legacy rows are keyed below
            "CREATE UNIQUE INDEX IF NOT EXISTS push_tokens_doctor_device ON push_tokens (doctor_id, device_id)",
            "CREATE UNIQUE INDEX IF NOT EXISTS push_tokens_legacy_token ON push_tokens (token) WHERE device_id IS NULL",
            "CREATE INDEX IF NOT EXISTS push_tokens_doctor_updated ON push_tokens (doctor_id, updated_at)",
            "CREATE INDEX IF NOT EXISTS push_tokens_created ON push_tokens (created_at)",
        ];

        for statement in statements {
            self.db_client.execute(statement).await?;
        }

        info!("Push token schema initialized successfully");
        Ok(())
    }

    async fn upsert(&self, upsert: TokenUpsert) -> Result<PushToken, DbError> {
        debug!(
            "Upserting push token for doctor {} (device {:?})",
            upsert.doctor_id, upsert.device_id
        );

        let at = to_millis(upsert.at);
        let mut tx = self.db_client.begin().await?;

        // The same token under another doctor means the device changed hands.
        // A legacy row is reassigned by the upsert below, so only device rows go.
        let handover = match upsert.device_id {
            Some(_) => "DELETE FROM push_tokens WHERE token = $1 AND doctor_id <> $2",
            None => {
                "DELETE FROM push_tokens WHERE token = $1 AND doctor_id <> $2 AND device_id IS NOT NULL"
            }
        };
        let handed_over = sqlx::query(handover)
            .bind(&upsert.token)
            .bind(upsert.doctor_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| query_error("Failed to release push token of previous owner", e))?
            .rows_affected();
        if handed_over > 0 {
            info!(
                "Push token moved to doctor {}; dropped {} rows of other doctors",
                upsert.doctor_id, handed_over
            );
        }

        let row = match &upsert.device_id {
            Some(device_id) => {
                let query = format!(
                    r#"
                    INSERT INTO push_tokens (token, doctor_id, device_id, device_type, app_version, created_at, updated_at)
                    VALUES ($1, $2, $3, $4, $5, $6, $7)
                    ON CONFLICT (doctor_id, device_id) DO UPDATE SET
                        token = excluded.token,
                        device_type = COALESCE(excluded.device_type, push_tokens.device_type),
                        app_version = COALESCE(excluded.app_version, push_tokens.app_version),
                        updated_at = excluded.updated_at
                    RETURNING {}
                    "#,
                    TOKEN_COLUMNS
                );

                sqlx::query(&query)
                    .bind(&upsert.token)
                    .bind(upsert.doctor_id)
                    .bind(device_id)
                    .bind(&upsert.device_type)
                    .bind(&upsert.app_version)
                    .bind(at)
                    .bind(at)
                    .fetch_one(&mut *tx)
                    .await
                    .map_err(|e| query_error("Failed to upsert device push token", e))?
            }
            None => {
                let query = format!(
                    r#"
                    INSERT INTO push_tokens (token, doctor_id, device_id, device_type, app_version, created_at, updated_at)
                    VALUES ($1, $2, NULL, $3, $4, $5, $6)
                    ON CONFLICT (token) WHERE device_id IS NULL DO UPDATE SET
                        doctor_id = excluded.doctor_id,
                        device_type = COALESCE(excluded.device_type, push_tokens.device_type),
                        app_version = COALESCE(excluded.app_version, push_tokens.app_version),
                        updated_at = excluded.updated_at
                    RETURNING {}
                    "#,
                    TOKEN_COLUMNS
                );

                sqlx::query(&query)
                    .bind(&upsert.token)
                    .bind(upsert.doctor_id)
                    .bind(&upsert.device_type)
                    .bind(&upsert.app_version)
                    .bind(at)
                    .bind(at)
                    .fetch_one(&mut *tx)
                    .await
                    .map_err(|e| query_error("Failed to upsert legacy push token", e))?
            }
        };

        let stored = token_from_row(&row)?;
        tx.commit()
            .await
            .map_err(|e| DbError::TransactionError(e.to_string()))?;
        Ok(stored)
    }

    async fn enforce_limit(&self, doctor_id: i64, max: u32) -> Result<u64, DbError> {
        let query = r#"
            DELETE FROM push_tokens
            WHERE doctor_id = $1
              AND id NOT IN (
                  SELECT id FROM push_tokens
                  WHERE doctor_id = $2
                  ORDER BY updated_at DESC, id DESC
                  LIMIT $3
              )
        "#;

        let result = sqlx::query(query)
            .bind(doctor_id)
            .bind(doctor_id)
            .bind(i64::from(max))
            .execute(self.db_client.pool())
            .await
            .map_err(|e| query_error("Failed to evict push tokens", e))?;

        let evicted = result.rows_affected();
        if evicted > 0 {
            info!("Evicted {} push tokens of doctor {}", evicted, doctor_id);
        }
        Ok(evicted)
    }

    async fn find_by_doctor(&self, doctor_id: i64) -> Result<Vec<PushToken>, DbError> {
        debug!("Finding push tokens for doctor: {}", doctor_id);

        let query = format!(
            "SELECT {} FROM push_tokens WHERE doctor_id = $1 ORDER BY updated_at DESC, id DESC",
            TOKEN_COLUMNS
        );

        let rows = sqlx::query(&query)
            .bind(doctor_id)
            .fetch_all(self.db_client.pool())
            .await
            .map_err(|e| query_error("Failed to find push tokens", e))?;

        rows.iter().map(token_from_row).collect()
    }

    async fn tokens_for(&self, doctor_ids: &[i64]) -> Result<Vec<String>, DbError> {
        if doctor_ids.is_empty() {
            return Ok(Vec::new());
        }
        debug!("Collecting push tokens for {} doctors", doctor_ids.len());

        let query = format!(
            "SELECT DISTINCT token FROM push_tokens WHERE doctor_id IN ({}) ORDER BY token",
            placeholders(1, doctor_ids.len())
        );

        let mut statement = sqlx::query(&query);
        for doctor_id in doctor_ids {
            statement = statement.bind(*doctor_id);
        }

        let rows = statement
            .fetch_all(self.db_client.pool())
            .await
            .map_err(|e| query_error("Failed to collect push tokens", e))?;

        rows.iter()
            .map(|row| row.try_get::<String, _>("token").map_err(DbError::from))
            .collect()
    }

    async fn all_tokens(&self) -> Result<Vec<String>, DbError> {
        debug!("Collecting every push token");

        let rows = sqlx::query("SELECT DISTINCT token FROM push_tokens ORDER BY token")
            .fetch_all(self.db_client.pool())
            .await
            .map_err(|e| query_error("Failed to collect push tokens", e))?;

        rows.iter()
            .map(|row| row.try_get::<String, _>("token").map_err(DbError::from))
            .collect()
    }

    async fn remove(
        &self,
        doctor_id: i64,
        token: Option<&str>,
        device_id: Option<&str>,
    ) -> Result<u64, DbError> {
        if token.is_none() && device_id.is_none() {
            return Err(DbError::QueryError(
                "token removal needs a token or a device id".to_string(),
            ));
        }

        let mut query = String::from("DELETE FROM push_tokens WHERE doctor_id = $1");
        let mut next = 2;
        if token.is_some() {
            query.push_str(&format!(" AND token = ${}", next));
            next += 1;
        }
        if device_id.is_some() {
            query.push_str(&format!(" AND device_id = ${}", next));
        }

        let mut statement = sqlx::query(&query).bind(doctor_id);
        if let Some(token) = token {
            statement = statement.bind(token);
        }
        if let Some(device_id) = device_id {
            statement = statement.bind(device_id);
        }

        let result = statement
            .execute(self.db_client.pool())
            .await
            .map_err(|e| query_error("Failed to remove push token", e))?;

        Ok(result.rows_affected())
    }

    async fn purge_created_before(&self, cutoff: DateTime<Utc>) -> Result<u64, DbError> {
        let result = sqlx::query("DELETE FROM push_tokens WHERE created_at < $1")
            .bind(to_millis(cutoff))
            .execute(self.db_client.pool())
            .await
            .map_err(|e| query_error("Failed to purge stale push tokens", e))?;

        Ok(result.rows_affected())
    }

    async fn purge_tokens(&self, tokens: &[String]) -> Result<u64, DbError> {
        let mut purged = 0;

        for chunk in tokens.chunks(PURGE_CHUNK_SIZE) {
            let query = format!(
                "DELETE FROM push_tokens WHERE token IN ({})",
                placeholders(1, chunk.len())
            );

            let mut statement = sqlx::query(&query);
            for token in chunk {
                statement = statement.bind(token);
            }

            let result = statement
                .execute(self.db_client.pool())
                .await
                .map_err(|e| query_error("Failed to purge invalid push tokens", e))?;
            purged += result.rows_affected();
        }

        Ok(purged)
    }
}
