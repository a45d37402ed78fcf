//! Read access to the doctor and patient records owned by other subsystems
//!
//! The notification feed only needs a handful of display fields, fetched in
//! one query per entity kind.

use crate::error::DbError;
use std::future::Future;

pub use medpush_common::models::{DoctorProfile, PatientRecord};

/// Repository for the doctor/patient directory
pub trait DirectoryRepository: Send + Sync {
    /// Create the directory tables if they don't exist
    ///
    /// Production databases already have them; this is for local setups and tests.
    fn init_schema(&self) -> impl Future<Output = Result<(), DbError>> + Send;

    /// Profiles for the given ids; unknown ids are skipped
    fn doctors_by_ids(
        &self,
        ids: &[i64],
    ) -> impl Future<Output = Result<Vec<DoctorProfile>, DbError>> + Send;

    /// Patients for the given ids, with their section status flags
    fn patients_by_ids(
        &self,
        ids: &[i64],
    ) -> impl Future<Output = Result<Vec<PatientRecord>, DbError>> + Send;

    /// Insert or replace a doctor profile
    fn save_doctor(&self, doctor: DoctorProfile)
        -> impl Future<Output = Result<(), DbError>> + Send;

    /// Insert or replace a patient and its section flags
    fn save_patient(
        &self,
        patient: PatientRecord,
    ) -> impl Future<Output = Result<(), DbError>> + Send;
}
