//! SQL implementation of the directory repository

use crate::error::DbError;
use crate::repositories::directory::{DirectoryRepository, DoctorProfile, PatientRecord};
use crate::time::placeholders;
use crate::DbClient;
use sqlx::Row;
use tracing::{debug, error, info};

/// SQL implementation of the directory repository
#[derive(Debug, Clone)]
pub struct SqlDirectoryRepository {
    db_client: DbClient,
}

impl SqlDirectoryRepository {
    pub fn new(db_client: DbClient) -> Self {
        Self { db_client }
    }
}

fn query_error(context: &str, e: sqlx::Error) -> DbError {
    error!("{}: {}", context, e);
    DbError::QueryError(e.to_string())
}

impl DirectoryRepository for SqlDirectoryRepository {
    async fn init_schema(&self) -> Result<(), DbError> {
        debug!("Initializing directory schema");

        let statements = [
            r#"
            CREATE TABLE IF NOT EXISTS doctors (
                id INTEGER PRIMARY KEY,
                name TEXT,
                image TEXT
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS patients (
                id INTEGER PRIMARY KEY,
                doctor_id INTEGER,
                name TEXT,
                hospital TEXT,
                governorate TEXT
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS patient_sections (
                patient_id INTEGER PRIMARY KEY,
                submit_status INTEGER NOT NULL DEFAULT 0,
                outcome_status INTEGER NOT NULL DEFAULT 0
            )
            "#,
        ];

        for statement in statements {
            self.db_client.execute(statement).await?;
        }

        info!("Directory schema initialized successfully");
        Ok(())
    }

    async fn doctors_by_ids(&self, ids: &[i64]) -> Result<Vec<DoctorProfile>, DbError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        debug!("Fetching {} doctor profiles", ids.len());

        let query = format!(
            "SELECT id, name, image FROM doctors WHERE id IN ({})",
            placeholders(1, ids.len())
        );
        let mut statement = sqlx::query(&query);
        for id in ids {
            statement = statement.bind(*id);
        }

        let rows = statement
            .fetch_all(self.db_client.pool())
            .await
            .map_err(|e| query_error("Failed to fetch doctors", e))?;

        rows.iter()
            .map(|row| -> Result<DoctorProfile, DbError> {
                Ok(DoctorProfile {
                    id: row.try_get("id")?,
                    name: row.try_get("name")?,
                    image: row.try_get("image")?,
                })
            })
            .collect()
    }

    async fn patients_by_ids(&self, ids: &[i64]) -> Result<Vec<PatientRecord>, DbError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        debug!("Fetching {} patients", ids.len());

        let query = format!(
            r#"
            SELECT p.id, p.doctor_id, p.name, p.hospital, p.governorate,
                   s.submit_status, s.outcome_status
            FROM patients p
            LEFT JOIN patient_sections s ON s.patient_id = p.id
            WHERE p.id IN ({})
            "#,
            placeholders(1, ids.len())
        );
        let mut statement = sqlx::query(&query);
        for id in ids {
            statement = statement.bind(*id);
        }

        let rows = statement
            .fetch_all(self.db_client.pool())
            .await
            .map_err(|e| query_error("Failed to fetch patients", e))?;

        rows.iter()
            .map(|row| -> Result<PatientRecord, DbError> {
                let submit_status: Option<i64> = row.try_get("submit_status")?;
                let outcome_status: Option<i64> = row.try_get("outcome_status")?;
                Ok(PatientRecord {
                    id: row.try_get("id")?,
                    doctor_id: row.try_get("doctor_id")?,
                    name: row.try_get("name")?,
                    hospital: row.try_get("hospital")?,
                    governorate: row.try_get("governorate")?,
                    submit_status: submit_status.unwrap_or(0) != 0,
                    outcome_status: outcome_status.unwrap_or(0) != 0,
                })
            })
            .collect()
    }

    async fn save_doctor(&self, doctor: DoctorProfile) -> Result<(), DbError> {
        sqlx::query("INSERT OR REPLACE INTO doctors (id, name, image) VALUES ($1, $2, $3)")
            .bind(doctor.id)
            .bind(&doctor.name)
            .bind(&doctor.image)
            .execute(self.db_client.pool())
            .await
            .map_err(|e| query_error("Failed to save doctor", e))?;
        Ok(())
    }

    async fn save_patient(&self, patient: PatientRecord) -> Result<(), DbError> {
        let mut tx = self.db_client.begin().await?;

        sqlx::query(
            "INSERT OR REPLACE INTO patients (id, doctor_id, name, hospital, governorate) VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(patient.id)
        .bind(patient.doctor_id)
        .bind(&patient.name)
        .bind(&patient.hospital)
        .bind(&patient.governorate)
        .execute(&mut *tx)
        .await
        .map_err(|e| query_error("Failed to save patient", e))?;

        sqlx::query(
            "INSERT OR REPLACE INTO patient_sections (patient_id, submit_status, outcome_status) VALUES ($1, $2, $3)",
        )
        .bind(patient.id)
        .bind(i64::from(patient.submit_status))
        .bind(i64::from(patient.outcome_status))
        .execute(&mut *tx)
        .await
        .map_err(|e| query_error("Failed to save patient sections", e))?;

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionError(e.to_string()))
    }
}
