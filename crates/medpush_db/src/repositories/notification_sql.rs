//! SQL implementation of the notification repository

use crate::error::DbError;
use crate::repositories::notification::{
    NewNotification, Notification, NotificationQuery, NotificationRepository,
};
use crate::time::{from_millis, to_millis};
use crate::DbClient;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use tracing::{debug, error, info};

/// Rows per multi-row INSERT in `bulk_create`.
const INSERT_CHUNK_SIZE: usize = 100;

const NOTIFICATION_COLUMNS: &str =
    "id, doctor_id, read, content, type, type_id, patient_id, type_doctor_id, created_at";

/// SQL implementation of the notification repository
#[derive(Debug, Clone)]
pub struct SqlNotificationRepository {
    db_client: DbClient,
}

impl SqlNotificationRepository {
    pub fn new(db_client: DbClient) -> Self {
        Self { db_client }
    }
}

fn notification_from_row(row: &SqliteRow) -> Result<Notification, DbError> {
    let read: i64 = row.try_get("read")?;
    Ok(Notification {
        id: row.try_get("id")?,
        doctor_id: row.try_get("doctor_id")?,
        read: read != 0,
        content: row.try_get("content")?,
        kind: row.try_get("type")?,
        type_id: row.try_get("type_id")?,
        patient_id: row.try_get("patient_id")?,
        type_doctor_id: row.try_get("type_doctor_id")?,
        created_at: from_millis(row.try_get("created_at")?)?,
    })
}

fn query_error(context: &str, e: sqlx::Error) -> DbError {
    error!("{}: {}", context, e);
    DbError::QueryError(e.to_string())
}

/// Builds the WHERE clause of `query`; every bound value is an integer.
fn where_clause(query: &NotificationQuery) -> (String, Vec<i64>) {
    let mut clause = String::from("WHERE doctor_id = $1");
    let mut params = vec![query.doctor_id];

    if let Some(before) = query.created_before {
        params.push(to_millis(before));
        clause.push_str(&format!(" AND created_at < ${}", params.len()));
    }
    if let Some(from) = query.created_on_or_after {
        params.push(to_millis(from));
        clause.push_str(&format!(" AND created_at >= ${}", params.len()));
    }

    (clause, params)
}

impl NotificationRepository for SqlNotificationRepository {
    async fn init_schema(&self) -> Result<(), DbError> {
        debug!("Initializing notification schema");

        let statements = [
            r#"
            CREATE TABLE IF NOT EXISTS notifications (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                doctor_id INTEGER NOT NULL,
                read INTEGER NOT NULL DEFAULT 0,
                content TEXT NOT NULL,
                type TEXT NOT NULL,
                type_id INTEGER,
                patient_id INTEGER,
                type_doctor_id INTEGER,
                created_at INTEGER NOT NULL
            )
            "#,
            "CREATE INDEX IF NOT EXISTS notifications_doctor_created ON notifications (doctor_id, created_at)",
            "CREATE INDEX IF NOT EXISTS notifications_doctor_read ON notifications (doctor_id, read)",
        ];

        for statement in statements {
            self.db_client.execute(statement).await?;
        }

        info!("Notification schema initialized successfully");
        Ok(())
    }

    async fn create(
        &self,
        notification: NewNotification,
        created_at: DateTime<Utc>,
    ) -> Result<Notification, DbError> {
        debug!(
            "Creating {} notification for doctor {}",
            notification.kind, notification.doctor_id
        );

        let query = format!(
            r#"
            INSERT INTO notifications (doctor_id, read, content, type, type_id, patient_id, type_doctor_id, created_at)
            VALUES ($1, 0, $2, $3, $4, $5, $6, $7)
            RETURNING {}
            "#,
            NOTIFICATION_COLUMNS
        );

        let row = sqlx::query(&query)
            .bind(notification.doctor_id)
            .bind(&notification.content)
            .bind(&notification.kind)
            .bind(notification.type_id)
            .bind(notification.patient_id)
            .bind(notification.type_doctor_id)
            .bind(to_millis(created_at))
            .fetch_one(self.db_client.pool())
            .await
            .map_err(|e| query_error("Failed to insert notification", e))?;

        notification_from_row(&row)
    }

    async fn bulk_create(
        &self,
        notifications: Vec<NewNotification>,
        created_at: DateTime<Utc>,
    ) -> Result<u64, DbError> {
        if notifications.is_empty() {
            return Ok(0);
        }
        debug!("Bulk inserting {} notifications", notifications.len());

        let created_at = to_millis(created_at);
        let mut tx = self.db_client.begin().await?;
        let mut inserted = 0;

        for chunk in notifications.chunks(INSERT_CHUNK_SIZE) {
            let values = (0..chunk.len())
                .map(|i| {
                    let base = i * 7;
                    format!(
                        "(${}, 0, ${}, ${}, ${}, ${}, ${}, ${})",
                        base + 1,
                        base + 2,
                        base + 3,
                        base + 4,
                        base + 5,
                        base + 6,
                        base + 7
                    )
                })
                .collect::<Vec<_>>()
                .join(", ");

            let query = format!(
                "INSERT INTO notifications (doctor_id, read, content, type, type_id, patient_id, type_doctor_id, created_at) VALUES {}",
                values
            );

            let mut statement = sqlx::query(&query);
            for notification in chunk {
                statement = statement
                    .bind(notification.doctor_id)
                    .bind(&notification.content)
                    .bind(&notification.kind)
                    .bind(notification.type_id)
                    .bind(notification.patient_id)
                    .bind(notification.type_doctor_id)
                    .bind(created_at);
            }

            let result = statement
                .execute(&mut *tx)
                .await
                .map_err(|e| query_error("Failed to bulk insert notifications", e))?;
            inserted += result.rows_affected();
        }

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionError(e.to_string()))?;

        info!("Inserted {} notifications", inserted);
        Ok(inserted)
    }

    async fn find(&self, id: i64) -> Result<Option<Notification>, DbError> {
        let query = format!(
            "SELECT {} FROM notifications WHERE id = $1",
            NOTIFICATION_COLUMNS
        );

        let row = sqlx::query(&query)
            .bind(id)
            .fetch_optional(self.db_client.pool())
            .await
            .map_err(|e| query_error("Failed to find notification", e))?;

        row.as_ref().map(notification_from_row).transpose()
    }

    async fn list(
        &self,
        query: &NotificationQuery,
        limit: Option<u32>,
        offset: u64,
    ) -> Result<Vec<Notification>, DbError> {
        debug!("Listing notifications: {:?}", query);

        let (clause, params) = where_clause(query);
        let mut sql = format!(
            "SELECT {} FROM notifications {} ORDER BY created_at DESC, id DESC",
            NOTIFICATION_COLUMNS, clause
        );
        if let Some(limit) = limit {
            sql.push_str(&format!(" LIMIT {} OFFSET {}", limit, offset));
        }

        let mut statement = sqlx::query(&sql);
        for param in params {
            statement = statement.bind(param);
        }

        let rows = statement
            .fetch_all(self.db_client.pool())
            .await
            .map_err(|e| query_error("Failed to list notifications", e))?;

        rows.iter().map(notification_from_row).collect()
    }

    async fn count(&self, query: &NotificationQuery) -> Result<u64, DbError> {
        let (clause, params) = where_clause(query);
        let sql = format!("SELECT COUNT(*) AS total FROM notifications {}", clause);

        let mut statement = sqlx::query(&sql);
        for param in params {
            statement = statement.bind(param);
        }

        let row = statement
            .fetch_one(self.db_client.pool())
            .await
            .map_err(|e| query_error("Failed to count notifications", e))?;

        let total: i64 = row.try_get("total")?;
        Ok(total.max(0) as u64)
    }

    async fn count_unread(&self, doctor_id: i64) -> Result<u64, DbError> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS total FROM notifications WHERE doctor_id = $1 AND read = 0",
        )
        .bind(doctor_id)
        .fetch_one(self.db_client.pool())
        .await
        .map_err(|e| query_error("Failed to count unread notifications", e))?;

        let total: i64 = row.try_get("total")?;
        Ok(total.max(0) as u64)
    }

    async fn mark_read(&self, id: i64) -> Result<bool, DbError> {
        let result = sqlx::query("UPDATE notifications SET read = 1 WHERE id = $1 AND read = 0")
            .bind(id)
            .execute(self.db_client.pool())
            .await
            .map_err(|e| query_error("Failed to mark notification read", e))?;

        Ok(result.rows_affected() > 0)
    }

    async fn mark_all_read(&self, doctor_id: i64) -> Result<u64, DbError> {
        let result =
            sqlx::query("UPDATE notifications SET read = 1 WHERE doctor_id = $1 AND read = 0")
                .bind(doctor_id)
                .execute(self.db_client.pool())
                .await
                .map_err(|e| query_error("Failed to mark notifications read", e))?;

        Ok(result.rows_affected())
    }

    async fn delete(&self, id: i64) -> Result<bool, DbError> {
        let result = sqlx::query("DELETE FROM notifications WHERE id = $1")
            .bind(id)
            .execute(self.db_client.pool())
            .await
            .map_err(|e| query_error("Failed to delete notification", e))?;

        Ok(result.rows_affected() > 0)
    }
}
